//! Generic CRUD for hybrid entities
//!
//! A hybrid entity keeps its fixed attributes in its own table and its
//! schema-defined attributes in an optional linked dynamic record. One
//! `HybridEntityService<F>` serves every entity type; the type-specific bits
//! come from the `StaticFields` implementation of `F`.

use super::events::{publish_or_log, AuditAction, AuditEvent, AuditPublisher};
use super::filter::{derive_filter_fields, FilterBuilder, FilterClause, FilterField, StaticFieldConfig};
use super::repository::{DynamicEntityRepository, HybridRepository, SchemaRepository};
use super::validation::check_dynamic_payload;
use super::infra_error;
use crate::config::Config;
use crate::contract::{
    Audit, CustomSchema, DynamicData, DynamicEntity, EntityError, HybridRecord, HybridUpdate,
    HybridView, NewHybrid, Page, PageRequest, RequestContext,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

/// Capabilities a static field set contributes to the generic service
pub trait StaticFields:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Canonical entity-type tag schemas must carry
    const ENTITY_TYPE: &'static str;

    /// Type-specific validation run before every write
    fn validate(&self) -> Result<(), EntityError> {
        Ok(())
    }

    /// Static columns offered to the filter builder
    fn filter_fields() -> &'static [StaticFieldConfig];
}

/// Filtered list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub schema_id: Option<Uuid>,
    pub clauses: Vec<FilterClause>,
}

/// CRUD service for one hybrid entity type
pub struct HybridEntityService<F: StaticFields> {
    records: Arc<dyn HybridRepository<F>>,
    schemas: Arc<dyn SchemaRepository>,
    dynamic: Arc<dyn DynamicEntityRepository>,
    audit: Arc<dyn AuditPublisher>,
    config: Config,
}

impl<F: StaticFields> HybridEntityService<F> {
    pub fn new(
        records: Arc<dyn HybridRepository<F>>,
        schemas: Arc<dyn SchemaRepository>,
        dynamic: Arc<dyn DynamicEntityRepository>,
        audit: Arc<dyn AuditPublisher>,
        config: Config,
    ) -> Self {
        Self {
            records,
            schemas,
            dynamic,
            audit,
            config,
        }
    }

    /// One page of active records, newest first
    pub async fn list(
        &self,
        ctx: &RequestContext,
        request: &PageRequest,
    ) -> Result<Page<HybridView<F>>, EntityError> {
        let (page, page_size) = self.paging(request.page, request.page_size)?;

        let (records, total) = self
            .records
            .page(ctx.tenant_id, request.schema_id, page, page_size)
            .await
            .map_err(|e| infra_error(F::ENTITY_TYPE, "page", e))?;

        let views = self.enrich(ctx, records).await?;
        Ok(Page::new(views, total, page, page_size))
    }

    /// Get one active record with its schema and dynamic values
    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<HybridView<F>, EntityError> {
        let record = self.load(ctx, id).await?;
        let mut views = self.enrich(ctx, vec![record]).await?;
        views
            .pop()
            .ok_or_else(|| EntityError::not_found(F::ENTITY_TYPE, id))
    }

    /// Create a record, creating and linking a dynamic record first when values are sent
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: NewHybrid<F>,
    ) -> Result<HybridView<F>, EntityError> {
        input.fields.validate()?;
        let schema = self.matching_schema(ctx, input.schema_id).await?;
        let now = Utc::now();

        let dynamic_entity_id = match input.dynamic_data.filter(|data| !data.is_empty()) {
            Some(data) => Some(self.create_dynamic(ctx, &schema, data).await?.id),
            None => None,
        };

        let record = HybridRecord {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            schema_id: schema.id,
            dynamic_entity_id,
            fields: input.fields,
            is_active: true,
            audit: Audit::created(&ctx.actor, now),
        };
        let created = match self.records.create(&record).await {
            Ok(created) => created,
            Err(e) => {
                if let Some(dynamic_id) = dynamic_entity_id {
                    self.discard_dynamic(ctx, dynamic_id).await;
                }
                return Err(infra_error(F::ENTITY_TYPE, record.id, e));
            }
        };

        tracing::info!(
            entity = F::ENTITY_TYPE,
            id = %created.id,
            tenant_id = %ctx.tenant_id,
            dynamic_entity_id = ?created.dynamic_entity_id,
            "Hybrid entity created"
        );
        publish_or_log(
            self.audit.as_ref(),
            AuditEvent::new(F::ENTITY_TYPE, created.id, ctx.tenant_id, AuditAction::Created, &ctx.actor)
                .with_dynamic_entity(created.dynamic_entity_id),
        )
        .await;

        self.get(ctx, created.id).await
    }

    /// Replace the static fields and update or lazily create the dynamic record
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: HybridUpdate<F>,
    ) -> Result<HybridView<F>, EntityError> {
        input.fields.validate()?;
        let mut record = self.load(ctx, id).await?;
        let now = Utc::now();

        let mut created_dynamic = None;
        if let Some(data) = input.dynamic_data.filter(|data| !data.is_empty()) {
            let schema = self.matching_schema(ctx, record.schema_id).await?;
            let linked = match record.dynamic_entity_id {
                Some(dynamic_id) => self
                    .dynamic
                    .find_by_id(ctx.tenant_id, dynamic_id)
                    .await
                    .map_err(|e| infra_error("dynamic_entity", dynamic_id, e))?,
                None => None,
            };

            match linked {
                Some(mut existing) => {
                    check_dynamic_payload(
                        &schema.fields,
                        &data,
                        self.config.strict_dynamic_fields,
                        self.config.max_dynamic_payload_bytes,
                    )?;
                    existing.data = data;
                    existing.audit.touch(&ctx.actor, now);
                    self.dynamic
                        .update(&existing)
                        .await
                        .map_err(|e| infra_error("dynamic_entity", existing.id, e))?;
                }
                None => {
                    let created = self.create_dynamic(ctx, &schema, data).await?;
                    record.dynamic_entity_id = Some(created.id);
                    created_dynamic = Some(created.id);
                }
            }
        }

        record.fields = input.fields;
        record.audit.touch(&ctx.actor, now);
        if let Err(e) = self.records.update(&record).await {
            if let Some(dynamic_id) = created_dynamic {
                self.discard_dynamic(ctx, dynamic_id).await;
            }
            return Err(infra_error(F::ENTITY_TYPE, id, e));
        }

        tracing::info!(
            entity = F::ENTITY_TYPE,
            id = %id,
            tenant_id = %ctx.tenant_id,
            "Hybrid entity updated"
        );
        publish_or_log(
            self.audit.as_ref(),
            AuditEvent::new(F::ENTITY_TYPE, id, ctx.tenant_id, AuditAction::Updated, &ctx.actor)
                .with_dynamic_entity(record.dynamic_entity_id),
        )
        .await;

        self.get(ctx, id).await
    }

    /// Soft delete a record; its dynamic record is left untouched
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), EntityError> {
        let deleted = self
            .records
            .soft_delete(ctx.tenant_id, id, &ctx.actor, Utc::now())
            .await
            .map_err(|e| infra_error(F::ENTITY_TYPE, id, e))?;
        if !deleted {
            return Err(EntityError::not_found(F::ENTITY_TYPE, id));
        }

        tracing::info!(entity = F::ENTITY_TYPE, id = %id, tenant_id = %ctx.tenant_id, "Hybrid entity deleted");
        publish_or_log(
            self.audit.as_ref(),
            AuditEvent::new(F::ENTITY_TYPE, id, ctx.tenant_id, AuditAction::Deleted, &ctx.actor),
        )
        .await;
        Ok(())
    }

    /// Filterable fields: static columns plus the fields of the given schema
    pub async fn filter_fields(
        &self,
        ctx: &RequestContext,
        schema_id: Option<Uuid>,
    ) -> Result<Vec<FilterField>, EntityError> {
        let schema_fields = match schema_id {
            Some(schema_id) => self.matching_schema(ctx, schema_id).await?.fields,
            None => Vec::new(),
        };
        Ok(derive_filter_fields(F::filter_fields(), &schema_fields))
    }

    /// Apply a clause chain over every active record, then cut one page
    pub async fn search(
        &self,
        ctx: &RequestContext,
        request: &SearchRequest,
    ) -> Result<Page<HybridView<F>>, EntityError> {
        let (page, page_size) = self.paging(request.page, request.page_size)?;

        let mut builder = FilterBuilder::new(self.filter_fields(ctx, request.schema_id).await?);
        for clause in &request.clauses {
            builder.add_clause(clause.clone())?;
        }
        let chain = builder.build();

        let records = self
            .records
            .list_all(ctx.tenant_id, request.schema_id)
            .await
            .map_err(|e| infra_error(F::ENTITY_TYPE, "list_all", e))?;
        let views = self.enrich(ctx, records).await?;

        let empty = DynamicData::new();
        let mut matched = Vec::with_capacity(views.len());
        for view in views {
            let statics = static_values(&view.record.fields)?;
            if chain.matches(&statics, view.dynamic_data.as_ref().unwrap_or(&empty)) {
                matched.push(view);
            }
        }

        Ok(Page::from_vec(matched, page, page_size))
    }

    // ===== Helper Methods =====

    fn paging(&self, page: Option<u64>, page_size: Option<u64>) -> Result<(u64, u64), EntityError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(self.config.default_page_size);
        if page == 0 {
            return Err(EntityError::validation("page must be at least 1"));
        }
        if page_size == 0 {
            return Err(EntityError::validation("pageSize must be greater than 0"));
        }
        let page_size = page_size.min(self.config.max_page_size.max(1));

        // Row offsets are bound as signed 64-bit integers
        let offset = (page - 1).checked_mul(page_size);
        if !matches!(offset, Some(offset) if offset <= i64::MAX as u64) {
            return Err(EntityError::validation(format!("page {} is out of range", page)));
        }
        Ok((page, page_size))
    }

    /// Soft-delete a dynamic record whose owning row was never written
    async fn discard_dynamic(&self, ctx: &RequestContext, id: Uuid) {
        if let Err(e) = self
            .dynamic
            .soft_delete(ctx.tenant_id, id, &ctx.actor, Utc::now())
            .await
        {
            tracing::error!(
                entity = F::ENTITY_TYPE,
                dynamic_entity_id = %id,
                error = %e,
                "Failed to discard orphaned dynamic entity"
            );
        }
    }

    async fn load(&self, ctx: &RequestContext, id: Uuid) -> Result<HybridRecord<F>, EntityError> {
        self.records
            .find_by_id(ctx.tenant_id, id)
            .await
            .map_err(|e| infra_error(F::ENTITY_TYPE, id, e))?
            .ok_or_else(|| EntityError::not_found(F::ENTITY_TYPE, id))
    }

    /// Active schema of this entity type; anything else is a validation error
    async fn matching_schema(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
    ) -> Result<CustomSchema, EntityError> {
        let schema = self
            .schemas
            .find_by_id(ctx.tenant_id, schema_id)
            .await
            .map_err(|e| infra_error("schema", schema_id, e))?
            .ok_or_else(|| {
                EntityError::validation(format!("schema {} does not exist or is inactive", schema_id))
            })?;

        if schema.entity_type != F::ENTITY_TYPE {
            return Err(EntityError::validation(format!(
                "schema {} belongs to entity type '{}', expected '{}'",
                schema_id,
                schema.entity_type,
                F::ENTITY_TYPE
            )));
        }
        Ok(schema)
    }

    async fn create_dynamic(
        &self,
        ctx: &RequestContext,
        schema: &CustomSchema,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError> {
        check_dynamic_payload(
            &schema.fields,
            &data,
            self.config.strict_dynamic_fields,
            self.config.max_dynamic_payload_bytes,
        )?;

        let entity = DynamicEntity {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            schema_id: schema.id,
            data,
            is_active: true,
            audit: Audit::created(&ctx.actor, Utc::now()),
        };
        self.dynamic
            .create(&entity)
            .await
            .map_err(|e| infra_error("dynamic_entity", entity.id, e))
    }

    /// Attach schema names and dynamic values, fetching each side in one batch
    async fn enrich(
        &self,
        ctx: &RequestContext,
        records: Vec<HybridRecord<F>>,
    ) -> Result<Vec<HybridView<F>>, EntityError> {
        let schema_ids: Vec<Uuid> = records
            .iter()
            .map(|r| r.schema_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let dynamic_ids: Vec<Uuid> = records
            .iter()
            .filter_map(|r| r.dynamic_entity_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let schemas: HashMap<Uuid, CustomSchema> = if schema_ids.is_empty() {
            HashMap::new()
        } else {
            self.schemas
                .find_by_ids(ctx.tenant_id, &schema_ids)
                .await
                .map_err(|e| infra_error("schema", "batch", e))?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };
        let mut dynamic: HashMap<Uuid, DynamicData> = if dynamic_ids.is_empty() {
            HashMap::new()
        } else {
            self.dynamic
                .find_by_ids(ctx.tenant_id, &dynamic_ids)
                .await
                .map_err(|e| infra_error("dynamic_entity", "batch", e))?
                .into_iter()
                .map(|d| (d.id, d.data))
                .collect()
        };

        Ok(records
            .into_iter()
            .map(|record| {
                let schema = schemas.get(&record.schema_id);
                let dynamic_data = record
                    .dynamic_entity_id
                    .and_then(|id| dynamic.remove(&id));
                HybridView {
                    schema_name: schema.map(|s| s.name.clone()),
                    schema_sub_type: schema.map(|s| s.sub_type.clone()),
                    dynamic_data,
                    record,
                }
            })
            .collect())
    }
}

fn static_values<F: Serialize>(fields: &F) -> Result<DynamicData, EntityError> {
    match serde_json::to_value(fields) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Ok(DynamicData::new()),
        Err(e) => Err(infra_error("static_fields", "serialize", e.into())),
    }
}
