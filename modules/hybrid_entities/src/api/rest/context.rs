//! Caller identity taken from request headers

use super::error::Problem;
use crate::contract::RequestContext;
use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode};
use uuid::Uuid;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Extractor producing the `RequestContext` of the caller
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let tenant_id = header(TENANT_HEADER)
            .ok_or_else(|| missing_header(TENANT_HEADER))?
            .parse::<Uuid>()
            .map_err(|_| {
                Problem::new(StatusCode::BAD_REQUEST, "Invalid Header")
                    .with_detail(format!("{} must be a UUID", TENANT_HEADER))
            })?;
        let actor = header(USER_HEADER).ok_or_else(|| missing_header(USER_HEADER))?;

        Ok(Caller(RequestContext::new(tenant_id, actor)))
    }
}

fn missing_header(name: &str) -> Problem {
    Problem::new(StatusCode::BAD_REQUEST, "Missing Header")
        .with_detail(format!("{} header is required", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Caller, Problem> {
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_headers_build_context() {
        let tenant = Uuid::new_v4();
        let request = Request::builder()
            .header("X-Tenant-Id", tenant.to_string())
            .header("X-User-Id", "ana")
            .body(())
            .unwrap();

        let Caller(ctx) = extract(request).await.unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.actor, "ana");
    }

    #[tokio::test]
    async fn test_missing_or_invalid_headers_rejected() {
        let no_user = Request::builder()
            .header("X-Tenant-Id", Uuid::new_v4().to_string())
            .body(())
            .unwrap();
        let problem = extract(no_user).await.unwrap_err();
        assert_eq!(problem.status, 400);

        let bad_tenant = Request::builder()
            .header("X-Tenant-Id", "acme")
            .header("X-User-Id", "ana")
            .body(())
            .unwrap();
        let problem = extract(bad_tenant).await.unwrap_err();
        assert_eq!(problem.title, "Invalid Header");
    }
}
