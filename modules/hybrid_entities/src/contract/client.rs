//! Native client trait for inter-module communication
//!
//! Other modules use this trait to resolve schemas and read or write dynamic
//! records without going through HTTP.

use super::{
    error::EntityError,
    model::{CustomSchema, DynamicData, DynamicEntity, RequestContext},
};
use async_trait::async_trait;
use uuid::Uuid;

/// Schema catalog API for inter-module communication
#[async_trait]
pub trait CatalogApi: Send + Sync {
    // ===== Schema Operations =====

    /// Resolve the schema for an entity-type token and sub-type
    async fn resolve_schema(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        sub_type: &str,
    ) -> Result<CustomSchema, EntityError>;

    /// Get an active schema by id
    async fn get_schema(&self, ctx: &RequestContext, id: Uuid)
        -> Result<CustomSchema, EntityError>;

    /// List active schemas of an entity type
    async fn list_schemas(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
    ) -> Result<Vec<CustomSchema>, EntityError>;

    // ===== Dynamic Entity Operations =====

    /// Get a dynamic record
    async fn get_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<DynamicEntity, EntityError>;

    /// Create a dynamic record for a schema
    async fn create_dynamic_entity(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError>;

    /// Replace the values of a dynamic record
    async fn update_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError>;
}
