//! SeaORM repository implementations

use crate::contract::{AgentFields, ClientFields, CustomSchema, DynamicEntity, HybridRecord};
use crate::domain::repository::{DynamicEntityRepository, HybridRepository, SchemaRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    prelude::Expr, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use super::entity::{agent, client, custom_schema, dynamic_entity};
use super::mapper::sub_type_key;

// ===== Schema Repository =====

pub struct SeaOrmSchemaRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmSchemaRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SchemaRepository for SeaOrmSchemaRepository {
    async fn create(&self, schema: &CustomSchema) -> Result<CustomSchema> {
        let active: custom_schema::ActiveModel = schema.try_into()?;

        let result = custom_schema::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;

        result.try_into()
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CustomSchema>> {
        let result = custom_schema::Entity::find_by_id(id)
            .filter(custom_schema::Column::TenantId.eq(tenant_id))
            .filter(custom_schema::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;

        result.map(TryInto::try_into).transpose()
    }

    async fn find_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<CustomSchema>> {
        let results = custom_schema::Entity::find()
            .filter(custom_schema::Column::TenantId.eq(tenant_id))
            .filter(custom_schema::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.db)
            .await?;

        results.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_by_key(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        sub_type: &str,
    ) -> Result<Option<CustomSchema>> {
        let result = custom_schema::Entity::find()
            .filter(custom_schema::Column::TenantId.eq(tenant_id))
            .filter(custom_schema::Column::EntityType.eq(entity_type))
            .filter(custom_schema::Column::SubTypeKey.eq(sub_type_key(sub_type)))
            .one(&*self.db)
            .await?;

        result.map(TryInto::try_into).transpose()
    }

    async fn list_by_entity_type(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
    ) -> Result<Vec<CustomSchema>> {
        let results = custom_schema::Entity::find()
            .filter(custom_schema::Column::TenantId.eq(tenant_id))
            .filter(custom_schema::Column::EntityType.eq(entity_type))
            .filter(custom_schema::Column::IsActive.eq(true))
            .order_by_asc(custom_schema::Column::Name)
            .order_by_asc(custom_schema::Column::Id)
            .all(&*self.db)
            .await?;

        results.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, schema: &CustomSchema) -> Result<CustomSchema> {
        let active: custom_schema::ActiveModel = schema.try_into()?;

        let result = custom_schema::Entity::update(active)
            .filter(custom_schema::Column::TenantId.eq(schema.tenant_id))
            .exec(&*self.db)
            .await?;

        result.try_into()
    }

    async fn deactivate(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = custom_schema::Entity::update_many()
            .col_expr(custom_schema::Column::IsActive, Expr::value(false))
            .col_expr(custom_schema::Column::UpdatedAt, Expr::value(at))
            .col_expr(custom_schema::Column::UpdatedBy, Expr::value(actor))
            .filter(custom_schema::Column::Id.eq(id))
            .filter(custom_schema::Column::TenantId.eq(tenant_id))
            .filter(custom_schema::Column::IsActive.eq(true))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

// ===== Dynamic Entity Repository =====

pub struct SeaOrmDynamicEntityRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDynamicEntityRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DynamicEntityRepository for SeaOrmDynamicEntityRepository {
    async fn create(&self, entity: &DynamicEntity) -> Result<DynamicEntity> {
        let active: dynamic_entity::ActiveModel = entity.into();

        let result = dynamic_entity::Entity::insert(active)
            .exec_with_returning(&*self.db)
            .await?;

        result.try_into()
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DynamicEntity>> {
        let result = dynamic_entity::Entity::find_by_id(id)
            .filter(dynamic_entity::Column::TenantId.eq(tenant_id))
            .filter(dynamic_entity::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;

        result.map(TryInto::try_into).transpose()
    }

    async fn find_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<DynamicEntity>> {
        let results = dynamic_entity::Entity::find()
            .filter(dynamic_entity::Column::TenantId.eq(tenant_id))
            .filter(dynamic_entity::Column::Id.is_in(ids.iter().copied()))
            .filter(dynamic_entity::Column::IsActive.eq(true))
            .all(&*self.db)
            .await?;

        results.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_by_schema(
        &self,
        tenant_id: Uuid,
        schema_id: Uuid,
    ) -> Result<Vec<DynamicEntity>> {
        let results = dynamic_entity::Entity::find()
            .filter(dynamic_entity::Column::TenantId.eq(tenant_id))
            .filter(dynamic_entity::Column::SchemaId.eq(schema_id))
            .filter(dynamic_entity::Column::IsActive.eq(true))
            .order_by_asc(dynamic_entity::Column::CreatedAt)
            .order_by_asc(dynamic_entity::Column::Id)
            .all(&*self.db)
            .await?;

        results.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, entity: &DynamicEntity) -> Result<DynamicEntity> {
        let active: dynamic_entity::ActiveModel = entity.into();

        let result = dynamic_entity::Entity::update(active)
            .filter(dynamic_entity::Column::TenantId.eq(entity.tenant_id))
            .exec(&*self.db)
            .await?;

        result.try_into()
    }

    async fn soft_delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = dynamic_entity::Entity::update_many()
            .col_expr(dynamic_entity::Column::IsActive, Expr::value(false))
            .col_expr(dynamic_entity::Column::UpdatedAt, Expr::value(at))
            .col_expr(dynamic_entity::Column::UpdatedBy, Expr::value(actor))
            .filter(dynamic_entity::Column::Id.eq(id))
            .filter(dynamic_entity::Column::TenantId.eq(tenant_id))
            .filter(dynamic_entity::Column::IsActive.eq(true))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

// ===== Hybrid Entity Repositories =====

/// Implements `HybridRepository` for one static field set over its table
macro_rules! hybrid_repository {
    ($name:ident, $fields:ty, $table:ident) => {
        pub struct $name {
            db: Arc<DatabaseConnection>,
        }

        impl $name {
            pub fn new(db: Arc<DatabaseConnection>) -> Self {
                Self { db }
            }

            fn active(tenant_id: Uuid, schema_id: Option<Uuid>) -> sea_orm::Select<$table::Entity> {
                let mut query = $table::Entity::find()
                    .filter($table::Column::TenantId.eq(tenant_id))
                    .filter($table::Column::IsActive.eq(true));
                if let Some(schema_id) = schema_id {
                    query = query.filter($table::Column::SchemaId.eq(schema_id));
                }
                query
                    .order_by_desc($table::Column::CreatedAt)
                    .order_by_asc($table::Column::Id)
            }
        }

        #[async_trait]
        impl HybridRepository<$fields> for $name {
            async fn page(
                &self,
                tenant_id: Uuid,
                schema_id: Option<Uuid>,
                page: u64,
                page_size: u64,
            ) -> Result<(Vec<HybridRecord<$fields>>, u64)> {
                let paginator = Self::active(tenant_id, schema_id).paginate(&*self.db, page_size);
                let total = paginator.num_items().await?;
                let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

                Ok((rows.into_iter().map(Into::into).collect(), total))
            }

            async fn list_all(
                &self,
                tenant_id: Uuid,
                schema_id: Option<Uuid>,
            ) -> Result<Vec<HybridRecord<$fields>>> {
                let rows = Self::active(tenant_id, schema_id).all(&*self.db).await?;

                Ok(rows.into_iter().map(Into::into).collect())
            }

            async fn find_by_id(
                &self,
                tenant_id: Uuid,
                id: Uuid,
            ) -> Result<Option<HybridRecord<$fields>>> {
                let result = $table::Entity::find_by_id(id)
                    .filter($table::Column::TenantId.eq(tenant_id))
                    .filter($table::Column::IsActive.eq(true))
                    .one(&*self.db)
                    .await?;

                Ok(result.map(Into::into))
            }

            async fn create(&self, record: &HybridRecord<$fields>) -> Result<HybridRecord<$fields>> {
                let active: $table::ActiveModel = record.into();

                let result = $table::Entity::insert(active)
                    .exec_with_returning(&*self.db)
                    .await?;

                Ok(result.into())
            }

            async fn update(&self, record: &HybridRecord<$fields>) -> Result<HybridRecord<$fields>> {
                let active: $table::ActiveModel = record.into();

                let result = $table::Entity::update(active)
                    .filter($table::Column::TenantId.eq(record.tenant_id))
                    .exec(&*self.db)
                    .await?;

                Ok(result.into())
            }

            async fn soft_delete(
                &self,
                tenant_id: Uuid,
                id: Uuid,
                actor: &str,
                at: DateTime<Utc>,
            ) -> Result<bool> {
                let result = $table::Entity::update_many()
                    .col_expr($table::Column::IsActive, Expr::value(false))
                    .col_expr($table::Column::UpdatedAt, Expr::value(at))
                    .col_expr($table::Column::UpdatedBy, Expr::value(actor))
                    .filter($table::Column::Id.eq(id))
                    .filter($table::Column::TenantId.eq(tenant_id))
                    .filter($table::Column::IsActive.eq(true))
                    .exec(&*self.db)
                    .await?;

                Ok(result.rows_affected > 0)
            }
        }
    };
}

hybrid_repository!(SeaOrmAgentRepository, AgentFields, agent);
hybrid_repository!(SeaOrmClientRepository, ClientFields, client);
