//! HTTP request handlers - thin layer that delegates to domain services

use super::context::Caller;
use super::dto::*;
use super::error::Problem;
use crate::contract::SchemaDraft;
use crate::domain::{CatalogService, FilterField, FormNode, HybridEntityService, StaticFields};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

const DELETED_MESSAGE: &str = "Registro eliminado correctamente";

// ===== Hybrid Entity Handlers =====

/// List one page of hybrid entities
pub async fn list_hybrid<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedResponse<HybridDto<F>>>, Problem> {
    let page = service.list(&ctx, &query.into()).await?;
    Ok(Json(page.into()))
}

/// Get one hybrid entity
pub async fn get_hybrid<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<HybridDto<F>>, Problem> {
    let view = service.get(&ctx, id).await?;
    Ok(Json(view.into()))
}

/// Create a hybrid entity
pub async fn create_hybrid<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Json(req): Json<CreateHybridRequest<F>>,
) -> Result<(StatusCode, Json<HybridDto<F>>), Problem> {
    let view = service.create(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// Update a hybrid entity
pub async fn update_hybrid<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateHybridRequest<F>>,
) -> Result<Json<HybridDto<F>>, Problem> {
    let view = service.update(&ctx, id, req.into()).await?;
    Ok(Json(view.into()))
}

/// Soft delete a hybrid entity
pub async fn delete_hybrid<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, Problem> {
    service.delete(&ctx, id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE.to_string(),
    }))
}

/// Filterable fields of the entity type, optionally with a schema's fields
pub async fn filter_fields<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Query(query): Query<FilterFieldsQuery>,
) -> Result<Json<Vec<FilterField>>, Problem> {
    let fields = service.filter_fields(&ctx, query.tipo_entidad_id).await?;
    Ok(Json(fields))
}

/// Paginated list filtered by a clause chain
pub async fn search_hybrid<F: StaticFields>(
    Extension(service): Extension<Arc<HybridEntityService<F>>>,
    Caller(ctx): Caller,
    Json(body): Json<SearchBody>,
) -> Result<Json<PagedResponse<HybridDto<F>>>, Problem> {
    let page = service.search(&ctx, &body.into()).await?;
    Ok(Json(page.into()))
}

// ===== Schema Handlers =====

#[utoipa::path(
    post,
    path = "/api/EsquemasPersonalizados",
    request_body = UpsertSchemaRequest,
    responses(
        (status = CREATED, body = SchemaDto),
        (status = BAD_REQUEST, body = Problem),
        (status = CONFLICT, body = Problem)
    ),
    tag = "EsquemasPersonalizados"
)]
pub async fn create_schema(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Json(req): Json<UpsertSchemaRequest>,
) -> Result<(StatusCode, Json<SchemaDto>), Problem> {
    let draft = SchemaDraft::try_from(req)?;
    let schema = service.create_schema(&ctx, draft).await?;
    Ok((StatusCode::CREATED, Json(schema.into())))
}

#[utoipa::path(
    get,
    path = "/api/EsquemasPersonalizados/{id}",
    params(("id" = Uuid, Path, description = "Schema id")),
    responses((status = OK, body = SchemaDto), (status = NOT_FOUND, body = Problem)),
    tag = "EsquemasPersonalizados"
)]
pub async fn get_schema(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SchemaDto>, Problem> {
    let schema = service.get_schema(&ctx, id).await?;
    Ok(Json(schema.into()))
}

#[utoipa::path(
    put,
    path = "/api/EsquemasPersonalizados/{id}",
    params(("id" = Uuid, Path, description = "Schema id")),
    request_body = UpsertSchemaRequest,
    responses(
        (status = OK, body = SchemaDto),
        (status = BAD_REQUEST, body = Problem),
        (status = NOT_FOUND, body = Problem),
        (status = CONFLICT, body = Problem)
    ),
    tag = "EsquemasPersonalizados"
)]
pub async fn update_schema(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpsertSchemaRequest>,
) -> Result<Json<SchemaDto>, Problem> {
    let draft = SchemaDraft::try_from(req)?;
    let schema = service.update_schema(&ctx, id, draft).await?;
    Ok(Json(schema.into()))
}

#[utoipa::path(
    delete,
    path = "/api/EsquemasPersonalizados/{id}",
    params(("id" = Uuid, Path, description = "Schema id")),
    responses((status = OK, body = MessageResponse), (status = NOT_FOUND, body = Problem)),
    tag = "EsquemasPersonalizados"
)]
pub async fn delete_schema(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, Problem> {
    service.delete_schema(&ctx, id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE.to_string(),
    }))
}

/// Active schemas of an entity-type token
#[utoipa::path(
    get,
    path = "/api/EsquemasPersonalizados/tipo/{entidad_tipo}",
    params(("entidad_tipo" = String, Path, description = "Entity-type token, e.g. agentes")),
    responses((status = OK, body = Vec<SchemaDto>)),
    tag = "EsquemasPersonalizados"
)]
pub async fn list_schemas_by_type(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(entity_type): Path<String>,
) -> Result<Json<Vec<SchemaDto>>, Problem> {
    let schemas = service.list_schemas_by_type(&ctx, &entity_type).await?;
    Ok(Json(schemas.into_iter().map(Into::into).collect()))
}

/// Resolve the schema for an entity-type token and optional sub-type
#[utoipa::path(
    get,
    path = "/api/EsquemasPersonalizados/resolver/{entidad_tipo}",
    params(
        ("entidad_tipo" = String, Path, description = "Entity-type token, e.g. agentes"),
        ResolveQuery
    ),
    responses((status = OK, body = SchemaDto), (status = NOT_FOUND, body = Problem)),
    tag = "EsquemasPersonalizados"
)]
pub async fn resolve_schema(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(entity_type): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<SchemaDto>, Problem> {
    let sub_type = query.sub_tipo.unwrap_or_default();
    let schema = service.resolve_schema(&ctx, &entity_type, &sub_type).await?;
    Ok(Json(schema.into()))
}

/// Render the form tree of a schema
#[utoipa::path(
    post,
    path = "/api/EsquemasPersonalizados/{id}/formulario",
    params(("id" = Uuid, Path, description = "Schema id")),
    request_body = RenderFormRequest,
    responses(
        (status = OK, description = "Form nodes in field order"),
        (status = BAD_REQUEST, body = Problem),
        (status = NOT_FOUND, body = Problem)
    ),
    tag = "EsquemasPersonalizados"
)]
pub async fn render_form(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<RenderFormRequest>,
) -> Result<Json<Vec<FormNode>>, Problem> {
    let nodes = service.render_form(&ctx, id, req.valores).await?;
    Ok(Json(nodes))
}

// ===== Dynamic Entity Handlers =====

#[utoipa::path(
    get,
    path = "/api/EntidadesDinamicas/esquema/{esquema_id}",
    params(("esquema_id" = Uuid, Path, description = "Schema id")),
    responses((status = OK, body = Vec<DynamicEntityDto>), (status = NOT_FOUND, body = Problem)),
    tag = "EntidadesDinamicas"
)]
pub async fn list_dynamic_entities(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(schema_id): Path<Uuid>,
) -> Result<Json<Vec<DynamicEntityDto>>, Problem> {
    let entities = service.list_dynamic_entities(&ctx, schema_id).await?;
    Ok(Json(entities.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/EntidadesDinamicas/{id}",
    params(("id" = Uuid, Path, description = "Dynamic record id")),
    responses((status = OK, body = DynamicEntityDto), (status = NOT_FOUND, body = Problem)),
    tag = "EntidadesDinamicas"
)]
pub async fn get_dynamic_entity(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DynamicEntityDto>, Problem> {
    let entity = service.get_dynamic_entity(&ctx, id).await?;
    Ok(Json(entity.into()))
}

#[utoipa::path(
    post,
    path = "/api/EntidadesDinamicas",
    request_body = CreateDynamicEntityRequest,
    responses((status = CREATED, body = DynamicEntityDto), (status = BAD_REQUEST, body = Problem)),
    tag = "EntidadesDinamicas"
)]
pub async fn create_dynamic_entity(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Json(req): Json<CreateDynamicEntityRequest>,
) -> Result<(StatusCode, Json<DynamicEntityDto>), Problem> {
    let entity = service
        .create_dynamic_entity(&ctx, req.esquema_id, req.datos)
        .await?;
    Ok((StatusCode::CREATED, Json(entity.into())))
}

#[utoipa::path(
    put,
    path = "/api/EntidadesDinamicas/{id}",
    params(("id" = Uuid, Path, description = "Dynamic record id")),
    request_body = UpdateDynamicEntityRequest,
    responses(
        (status = OK, body = DynamicEntityDto),
        (status = BAD_REQUEST, body = Problem),
        (status = NOT_FOUND, body = Problem)
    ),
    tag = "EntidadesDinamicas"
)]
pub async fn update_dynamic_entity(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDynamicEntityRequest>,
) -> Result<Json<DynamicEntityDto>, Problem> {
    let entity = service.update_dynamic_entity(&ctx, id, req.datos).await?;
    Ok(Json(entity.into()))
}

#[utoipa::path(
    delete,
    path = "/api/EntidadesDinamicas/{id}",
    params(("id" = Uuid, Path, description = "Dynamic record id")),
    responses((status = OK, body = MessageResponse), (status = NOT_FOUND, body = Problem)),
    tag = "EntidadesDinamicas"
)]
pub async fn delete_dynamic_entity(
    Extension(service): Extension<Arc<CatalogService>>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, Problem> {
    service.delete_dynamic_entity(&ctx, id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE.to_string(),
    }))
}
