//! Native client implementation - wraps the catalog service for in-process calls

use crate::contract::{
    CatalogApi, CustomSchema, DynamicData, DynamicEntity, EntityError, RequestContext,
};
use crate::domain::CatalogService;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Native client that calls the catalog service directly
///
/// Used by other modules for in-process communication without HTTP overhead.
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<CatalogService>,
}

impl NativeClient {
    /// Create a new native client
    pub fn new(service: Arc<CatalogService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CatalogApi for NativeClient {
    async fn resolve_schema(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        sub_type: &str,
    ) -> Result<CustomSchema, EntityError> {
        self.service.resolve_schema(ctx, entity_type, sub_type).await
    }

    async fn get_schema(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<CustomSchema, EntityError> {
        self.service.get_schema(ctx, id).await
    }

    async fn list_schemas(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
    ) -> Result<Vec<CustomSchema>, EntityError> {
        self.service.list_schemas_by_type(ctx, entity_type).await
    }

    async fn get_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<DynamicEntity, EntityError> {
        self.service.get_dynamic_entity(ctx, id).await
    }

    async fn create_dynamic_entity(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError> {
        self.service.create_dynamic_entity(ctx, schema_id, data).await
    }

    async fn update_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError> {
        self.service.update_dynamic_entity(ctx, id, data).await
    }
}
