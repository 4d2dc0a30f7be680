//! Repository traits for data access
//!
//! These traits define the interface for data access operations.
//! Implementations are in infra/storage/repositories.rs

use crate::contract::{CustomSchema, DynamicEntity, HybridRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository for custom schema definitions
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// Create a new schema
    async fn create(&self, schema: &CustomSchema) -> Result<CustomSchema>;

    /// Find an active schema by id
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CustomSchema>>;

    /// Find schemas by id regardless of status
    async fn find_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<CustomSchema>>;

    /// Find a schema by its unique key regardless of status; sub-types compare case-insensitively
    async fn find_by_key(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        sub_type: &str,
    ) -> Result<Option<CustomSchema>>;

    /// List active schemas of a canonical entity type, ordered by name
    async fn list_by_entity_type(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
    ) -> Result<Vec<CustomSchema>>;

    /// Update a schema
    async fn update(&self, schema: &CustomSchema) -> Result<CustomSchema>;

    /// Deactivate a schema; false when it was missing or already inactive
    async fn deactivate(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Repository for dynamic entity records
#[async_trait]
pub trait DynamicEntityRepository: Send + Sync {
    /// Create a new dynamic record
    async fn create(&self, entity: &DynamicEntity) -> Result<DynamicEntity>;

    /// Find an active dynamic record
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DynamicEntity>>;

    /// Find active dynamic records by id
    async fn find_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<DynamicEntity>>;

    /// List active dynamic records of a schema, oldest first
    async fn list_by_schema(&self, tenant_id: Uuid, schema_id: Uuid)
        -> Result<Vec<DynamicEntity>>;

    /// Update a dynamic record in place
    async fn update(&self, entity: &DynamicEntity) -> Result<DynamicEntity>;

    /// Soft delete; false when it was missing or already deleted
    async fn soft_delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Repository for one hybrid entity type, injected per static field set
#[async_trait]
pub trait HybridRepository<F>: Send + Sync
where
    F: Send + Sync + 'static,
{
    /// One page of active records, newest first, plus the total count
    async fn page(
        &self,
        tenant_id: Uuid,
        schema_id: Option<Uuid>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<HybridRecord<F>>, u64)>;

    /// All active records in page order
    async fn list_all(
        &self,
        tenant_id: Uuid,
        schema_id: Option<Uuid>,
    ) -> Result<Vec<HybridRecord<F>>>;

    /// Find an active record
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<HybridRecord<F>>>;

    /// Insert a new record
    async fn create(&self, record: &HybridRecord<F>) -> Result<HybridRecord<F>>;

    /// Update a record in place
    async fn update(&self, record: &HybridRecord<F>) -> Result<HybridRecord<F>>;

    /// Soft delete; false when it was missing or already deleted
    async fn soft_delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}
