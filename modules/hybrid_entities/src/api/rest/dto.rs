//! REST DTOs with serde derives for HTTP API
//!
//! Bodies are camelCase JSON. Hybrid entity DTOs are generic over the static
//! field set, which is flattened into the top-level object.

use crate::contract::DynamicData;
use crate::domain::FilterClause;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ===== Shared DTOs =====

/// One page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Plain confirmation message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Registro eliminado correctamente")]
    pub message: String,
}

// ===== Hybrid Entity DTOs =====

/// List query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Items per page
    pub page_size: Option<u64>,
    /// Restrict to records created against this schema
    pub tipo_entidad_id: Option<Uuid>,
}

/// Query parameters of the filter field listing
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FilterFieldsQuery {
    pub tipo_entidad_id: Option<Uuid>,
}

/// Hybrid entity response: static fields plus schema and dynamic values
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridDto<F> {
    pub id: Uuid,
    pub tipo_entidad_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub esquema_nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entidad_dinamica_id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: F,
    pub datos_dinamicos: Option<DynamicData>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Create request: schema reference, static fields and optional dynamic values
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHybridRequest<F> {
    pub tipo_entidad_id: Uuid,
    #[serde(flatten)]
    pub fields: F,
    #[serde(default)]
    pub datos_dinamicos: Option<DynamicData>,
}

/// Update request: static fields are replaced as a whole
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHybridRequest<F> {
    #[serde(flatten)]
    pub fields: F,
    #[serde(default)]
    pub datos_dinamicos: Option<DynamicData>,
}

/// Filtered search request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub tipo_entidad_id: Option<Uuid>,
    /// Flat clause chain, evaluated left to right
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub filtros: Vec<FilterClause>,
}

// ===== Schema DTOs =====

/// Custom schema response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDto {
    pub id: Uuid,
    #[schema(example = "Agente")]
    pub entidad_tipo: String,
    #[schema(example = "Visitador")]
    pub sub_tipo: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    /// Ordered field tree
    #[schema(value_type = Vec<Object>)]
    pub campos: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Schema create / update request
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSchemaRequest {
    /// Entity-type token; normalized to its canonical tag
    #[schema(example = "agentes")]
    pub entidad_tipo: String,
    pub sub_tipo: String,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub campos: serde_json::Value,
}

/// Query of the resolution endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    #[serde(default)]
    pub sub_tipo: Option<String>,
}

/// Values to render a form over
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderFormRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub valores: DynamicData,
}

// ===== Dynamic Entity DTOs =====

/// Dynamic record response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DynamicEntityDto {
    pub id: Uuid,
    pub esquema_id: Uuid,
    #[schema(value_type = Object)]
    pub datos: DynamicData,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDynamicEntityRequest {
    pub esquema_id: Uuid,
    #[schema(value_type = Object)]
    pub datos: DynamicData,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDynamicEntityRequest {
    #[schema(value_type = Object)]
    pub datos: DynamicData,
}
