//! Route registration and the OpenAPI document

use super::error::Problem;
use super::{dto::*, handlers};
use crate::contract::{AgentFields, ClientFields};
use crate::domain::{CatalogService, HybridEntityService, StaticFields};
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, Parameter, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use utoipa::openapi::{ContentBuilder, Ref, Required, Response, ResponseBuilder};
use utoipa::{Modify, OpenApi};

pub const AGENTS_PATH: &str = "/api/Agentes";
pub const CLIENTS_PATH: &str = "/api/Clientes";
pub const SCHEMAS_PATH: &str = "/api/EsquemasPersonalizados";
pub const DYNAMIC_PATH: &str = "/api/EntidadesDinamicas";

/// OpenAPI document; hybrid entity routes are added by `HybridPaths`
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CRM hybrid entities API",
        description = "Every operation requires the X-Tenant-Id and X-User-Id headers.",
        license(name = "Apache-2.0")
    ),
    paths(
        handlers::create_schema,
        handlers::get_schema,
        handlers::update_schema,
        handlers::delete_schema,
        handlers::list_schemas_by_type,
        handlers::resolve_schema,
        handlers::render_form,
        handlers::list_dynamic_entities,
        handlers::get_dynamic_entity,
        handlers::create_dynamic_entity,
        handlers::update_dynamic_entity,
        handlers::delete_dynamic_entity
    ),
    modifiers(&HybridPaths),
    components(schemas(
        Problem,
        MessageResponse,
        SearchBody,
        SchemaDto,
        UpsertSchemaRequest,
        RenderFormRequest,
        DynamicEntityDto,
        CreateDynamicEntityRequest,
        UpdateDynamicEntityRequest
    )),
    tags(
        (name = "Agentes", description = "Sales agents"),
        (name = "Clientes", description = "Clients"),
        (name = "EsquemasPersonalizados", description = "Custom schemas"),
        (name = "EntidadesDinamicas", description = "Dynamic records")
    )
)]
pub struct ApiDoc;

/// Documents the generic hybrid handlers once per mounted entity type
pub struct HybridPaths;

impl Modify for HybridPaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        for (base, tag) in [(AGENTS_PATH, "Agentes"), (CLIENTS_PATH, "Clientes")] {
            let item = format!("{}/{{id}}", base);
            let paths = &mut openapi.paths;

            paths.add_path_operation(
                base,
                vec![HttpMethod::Get],
                hybrid_operation(tag, "list", "Page of active records, newest first")
                    .parameter(query_param("page", "1-based page number"))
                    .parameter(query_param("pageSize", "Items per page"))
                    .parameter(query_param("tipoEntidadId", "Restrict to one schema")),
            );
            paths.add_path_operation(
                base,
                vec![HttpMethod::Post],
                hybrid_operation(tag, "create", "Create a record with optional dynamic values")
                    .request_body(Some(json_body()))
                    .response("201", Response::new("Created record")),
            );
            paths.add_path_operation(
                format!("{}/filtros", base),
                vec![HttpMethod::Get],
                hybrid_operation(tag, "filter_fields", "Static and schema fields usable in searches")
                    .parameter(query_param("tipoEntidadId", "Schema whose fields to include")),
            );
            paths.add_path_operation(
                format!("{}/buscar", base),
                vec![HttpMethod::Post],
                hybrid_operation(tag, "search", "Page of records matching a filter chain")
                    .request_body(Some(json_body())),
            );
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Get],
                hybrid_operation(tag, "get", "Record with schema and dynamic values")
                    .parameter(id_param()),
            );
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Put],
                hybrid_operation(tag, "update", "Replace static fields and merge dynamic values")
                    .parameter(id_param())
                    .request_body(Some(json_body())),
            );
            paths.add_path_operation(
                &item,
                vec![HttpMethod::Delete],
                hybrid_operation(tag, "delete", "Soft delete a record")
                    .parameter(id_param()),
            );
        }
    }
}

fn hybrid_operation(tag: &str, action: &str, summary: &str) -> OperationBuilder {
    OperationBuilder::new()
        .tag(tag)
        .operation_id(Some(format!("{}_{}", action, tag.to_lowercase())))
        .summary(Some(summary))
        .response("200", Response::new("OK"))
        .response(
            "400",
            ResponseBuilder::new()
                .description("Problem Details")
                .content(
                    "application/problem+json",
                    ContentBuilder::new().schema(Some(Ref::from_schema_name("Problem"))).build(),
                )
                .build(),
        )
}

fn json_body() -> RequestBody {
    RequestBodyBuilder::new()
        .required(Some(Required::True))
        .content("application/json", ContentBuilder::new().build())
        .build()
}

fn query_param(name: &str, description: &str) -> Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .build()
}

fn id_param() -> Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some("Record id"))
        .build()
}

/// Services the REST surface dispatches to
#[derive(Clone)]
pub struct RestServices {
    pub agents: Arc<HybridEntityService<AgentFields>>,
    pub clients: Arc<HybridEntityService<ClientFields>>,
    pub catalog: Arc<CatalogService>,
}

/// Register all REST routes
pub fn register_routes(router: Router, services: RestServices) -> Router {
    router
        .merge(hybrid_routes(AGENTS_PATH, services.agents))
        .merge(hybrid_routes(CLIENTS_PATH, services.clients))
        .merge(catalog_routes(services.catalog))
        .route("/api/openapi.json", get(openapi_json))
}

/// CRUD, filter and search routes of one hybrid entity type
fn hybrid_routes<F: StaticFields>(base: &str, service: Arc<HybridEntityService<F>>) -> Router {
    Router::new()
        .route(
            base,
            get(handlers::list_hybrid::<F>).post(handlers::create_hybrid::<F>),
        )
        .route(
            &format!("{}/filtros", base),
            get(handlers::filter_fields::<F>),
        )
        .route(
            &format!("{}/buscar", base),
            post(handlers::search_hybrid::<F>),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(handlers::get_hybrid::<F>)
                .put(handlers::update_hybrid::<F>)
                .delete(handlers::delete_hybrid::<F>),
        )
        .layer(Extension(service))
}

fn catalog_routes(service: Arc<CatalogService>) -> Router {
    Router::new()
        // Schema endpoints
        .route(SCHEMAS_PATH, post(handlers::create_schema))
        .route(
            &format!("{}/{{id}}", SCHEMAS_PATH),
            get(handlers::get_schema)
                .put(handlers::update_schema)
                .delete(handlers::delete_schema),
        )
        .route(
            &format!("{}/tipo/{{entidad_tipo}}", SCHEMAS_PATH),
            get(handlers::list_schemas_by_type),
        )
        .route(
            &format!("{}/resolver/{{entidad_tipo}}", SCHEMAS_PATH),
            get(handlers::resolve_schema),
        )
        .route(
            &format!("{}/{{id}}/formulario", SCHEMAS_PATH),
            post(handlers::render_form),
        )
        // Dynamic entity endpoints
        .route(DYNAMIC_PATH, post(handlers::create_dynamic_entity))
        .route(
            &format!("{}/esquema/{{esquema_id}}", DYNAMIC_PATH),
            get(handlers::list_dynamic_entities),
        )
        .route(
            &format!("{}/{{id}}", DYNAMIC_PATH),
            get(handlers::get_dynamic_entity)
                .put(handlers::update_dynamic_entity)
                .delete(handlers::delete_dynamic_entity),
        )
        .layer(Extension(service))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
