//! Domain service - schema catalog and dynamic record orchestration

use super::events::{publish_or_log, AuditAction, AuditEvent, AuditPublisher};
use super::form::{load_options, FormNode, FormState, OptionLookup};
use super::infra_error;
use super::repository::{DynamicEntityRepository, SchemaRepository};
use super::resolver::{normalize_entity_type, select_schema};
use super::validation::{check_dynamic_payload, validate_field_tree};
use crate::config::Config;
use crate::contract::{
    Audit, CustomSchema, DynamicData, DynamicEntity, EntityError, RequestContext, SchemaDraft,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

const SCHEMA: &str = "schema";
const DYNAMIC_ENTITY: &str = "dynamic_entity";

/// Domain service for custom schemas and the dynamic records built on them
pub struct CatalogService {
    schemas: Arc<dyn SchemaRepository>,
    dynamic: Arc<dyn DynamicEntityRepository>,
    audit: Arc<dyn AuditPublisher>,
    lookup: Arc<dyn OptionLookup>,
    config: Config,
}

impl CatalogService {
    /// Create a new service instance
    pub fn new(
        schemas: Arc<dyn SchemaRepository>,
        dynamic: Arc<dyn DynamicEntityRepository>,
        audit: Arc<dyn AuditPublisher>,
        lookup: Arc<dyn OptionLookup>,
        config: Config,
    ) -> Self {
        Self {
            schemas,
            dynamic,
            audit,
            lookup,
            config,
        }
    }

    // ===== Schema Operations =====

    /// Register a schema; the (entity type, sub-type) pair must be new for the tenant
    pub async fn create_schema(
        &self,
        ctx: &RequestContext,
        draft: SchemaDraft,
    ) -> Result<CustomSchema, EntityError> {
        let draft = normalize_draft(draft)?;
        self.ensure_key_free(ctx, &draft.entity_type, &draft.sub_type, None)
            .await?;

        let schema = CustomSchema {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            entity_type: draft.entity_type,
            sub_type: draft.sub_type,
            name: draft.name,
            description: draft.description,
            fields: draft.fields,
            is_active: true,
            audit: Audit::created(&ctx.actor, Utc::now()),
        };
        let created = self
            .schemas
            .create(&schema)
            .await
            .map_err(|e| infra_error(SCHEMA, schema.id, e))?;

        tracing::info!(
            id = %created.id,
            tenant_id = %ctx.tenant_id,
            entity_type = %created.entity_type,
            sub_type = %created.sub_type,
            "Schema created"
        );
        self.publish(SCHEMA, created.id, ctx, AuditAction::Created).await;
        Ok(created)
    }

    /// Get an active schema
    pub async fn get_schema(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<CustomSchema, EntityError> {
        self.schemas
            .find_by_id(ctx.tenant_id, id)
            .await
            .map_err(|e| infra_error(SCHEMA, id, e))?
            .ok_or_else(|| EntityError::not_found(SCHEMA, id))
    }

    /// List the active schemas of an entity-type token ("agentes", "Cliente", ...)
    pub async fn list_schemas_by_type(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
    ) -> Result<Vec<CustomSchema>, EntityError> {
        let canonical = normalize_entity_type(entity_type);
        self.schemas
            .list_by_entity_type(ctx.tenant_id, &canonical)
            .await
            .map_err(|e| infra_error(SCHEMA, &canonical, e))
    }

    /// Replace a schema definition
    pub async fn update_schema(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        draft: SchemaDraft,
    ) -> Result<CustomSchema, EntityError> {
        let mut schema = self.get_schema(ctx, id).await?;
        let draft = normalize_draft(draft)?;
        if draft.entity_type != schema.entity_type || draft.sub_type != schema.sub_type {
            self.ensure_key_free(ctx, &draft.entity_type, &draft.sub_type, Some(id))
                .await?;
        }

        schema.entity_type = draft.entity_type;
        schema.sub_type = draft.sub_type;
        schema.name = draft.name;
        schema.description = draft.description;
        schema.fields = draft.fields;
        schema.audit.touch(&ctx.actor, Utc::now());

        let updated = self
            .schemas
            .update(&schema)
            .await
            .map_err(|e| infra_error(SCHEMA, id, e))?;

        tracing::info!(id = %id, tenant_id = %ctx.tenant_id, "Schema updated");
        self.publish(SCHEMA, id, ctx, AuditAction::Updated).await;
        Ok(updated)
    }

    /// Deactivate a schema; records created against it keep their link
    pub async fn delete_schema(&self, ctx: &RequestContext, id: Uuid) -> Result<(), EntityError> {
        let deactivated = self
            .schemas
            .deactivate(ctx.tenant_id, id, &ctx.actor, Utc::now())
            .await
            .map_err(|e| infra_error(SCHEMA, id, e))?;
        if !deactivated {
            return Err(EntityError::not_found(SCHEMA, id));
        }

        tracing::info!(id = %id, tenant_id = %ctx.tenant_id, "Schema deactivated");
        self.publish(SCHEMA, id, ctx, AuditAction::Deleted).await;
        Ok(())
    }

    /// Resolve the schema for a caller-supplied entity-type token and sub-type
    pub async fn resolve_schema(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        sub_type: &str,
    ) -> Result<CustomSchema, EntityError> {
        let canonical = normalize_entity_type(entity_type);
        let candidates = self
            .schemas
            .list_by_entity_type(ctx.tenant_id, &canonical)
            .await
            .map_err(|e| infra_error(SCHEMA, &canonical, e))?;

        match select_schema(&candidates, sub_type) {
            Some(schema) => {
                tracing::debug!(
                    entity_type = %canonical,
                    sub_type,
                    schema_id = %schema.id,
                    "Schema resolved"
                );
                Ok(schema.clone())
            }
            None => Err(EntityError::not_found(
                SCHEMA,
                format!("{}/{}", canonical, sub_type),
            )),
        }
    }

    /// Render the form tree of a schema over the given values, with lookup options loaded
    pub async fn render_form(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
        values: DynamicData,
    ) -> Result<Vec<FormNode>, EntityError> {
        let schema = self.get_schema(ctx, schema_id).await?;
        let state = FormState::new(schema.fields, values);
        let mut nodes = state.render();
        load_options(&mut nodes, self.lookup.as_ref()).await;
        Ok(nodes)
    }

    // ===== Dynamic Entity Operations =====

    /// List the active dynamic records of a schema
    pub async fn list_dynamic_entities(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
    ) -> Result<Vec<DynamicEntity>, EntityError> {
        self.get_schema(ctx, schema_id).await?;
        self.dynamic
            .list_by_schema(ctx.tenant_id, schema_id)
            .await
            .map_err(|e| infra_error(DYNAMIC_ENTITY, schema_id, e))
    }

    /// Get an active dynamic record
    pub async fn get_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<DynamicEntity, EntityError> {
        self.dynamic
            .find_by_id(ctx.tenant_id, id)
            .await
            .map_err(|e| infra_error(DYNAMIC_ENTITY, id, e))?
            .ok_or_else(|| EntityError::not_found(DYNAMIC_ENTITY, id))
    }

    /// Create a standalone dynamic record for a schema
    pub async fn create_dynamic_entity(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError> {
        let schema = self.referenced_schema(ctx, schema_id).await?;
        self.check_payload(&schema, &data)?;

        let entity = DynamicEntity {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            schema_id,
            data,
            is_active: true,
            audit: Audit::created(&ctx.actor, Utc::now()),
        };
        let created = self
            .dynamic
            .create(&entity)
            .await
            .map_err(|e| infra_error(DYNAMIC_ENTITY, entity.id, e))?;

        tracing::info!(id = %created.id, schema_id = %schema_id, "Dynamic entity created");
        self.publish(DYNAMIC_ENTITY, created.id, ctx, AuditAction::Created)
            .await;
        Ok(created)
    }

    /// Replace the values of a dynamic record
    pub async fn update_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        data: DynamicData,
    ) -> Result<DynamicEntity, EntityError> {
        let mut entity = self.get_dynamic_entity(ctx, id).await?;
        let schema = self.referenced_schema(ctx, entity.schema_id).await?;
        self.check_payload(&schema, &data)?;

        entity.data = data;
        entity.audit.touch(&ctx.actor, Utc::now());
        let updated = self
            .dynamic
            .update(&entity)
            .await
            .map_err(|e| infra_error(DYNAMIC_ENTITY, id, e))?;

        tracing::info!(id = %id, "Dynamic entity updated");
        self.publish(DYNAMIC_ENTITY, id, ctx, AuditAction::Updated).await;
        Ok(updated)
    }

    /// Soft delete a dynamic record
    pub async fn delete_dynamic_entity(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), EntityError> {
        let deleted = self
            .dynamic
            .soft_delete(ctx.tenant_id, id, &ctx.actor, Utc::now())
            .await
            .map_err(|e| infra_error(DYNAMIC_ENTITY, id, e))?;
        if !deleted {
            return Err(EntityError::not_found(DYNAMIC_ENTITY, id));
        }

        tracing::info!(id = %id, "Dynamic entity deleted");
        self.publish(DYNAMIC_ENTITY, id, ctx, AuditAction::Deleted).await;
        Ok(())
    }

    // ===== Helper Methods =====

    async fn ensure_key_free(
        &self,
        ctx: &RequestContext,
        entity_type: &str,
        sub_type: &str,
        current: Option<Uuid>,
    ) -> Result<(), EntityError> {
        let existing = self
            .schemas
            .find_by_key(ctx.tenant_id, entity_type, sub_type)
            .await
            .map_err(|e| infra_error(SCHEMA, format!("{}/{}", entity_type, sub_type), e))?;

        match existing {
            Some(other) if Some(other.id) != current => Err(EntityError::Conflict {
                reason: format!(
                    "A schema for {} / {} already exists: {}",
                    entity_type, sub_type, other.id
                ),
            }),
            _ => Ok(()),
        }
    }

    /// Schema referenced by a write; missing or inactive is a validation error
    async fn referenced_schema(
        &self,
        ctx: &RequestContext,
        schema_id: Uuid,
    ) -> Result<CustomSchema, EntityError> {
        match self.get_schema(ctx, schema_id).await {
            Err(EntityError::NotFound { .. }) => Err(EntityError::validation(format!(
                "schema {} does not exist or is inactive",
                schema_id
            ))),
            other => other,
        }
    }

    fn check_payload(&self, schema: &CustomSchema, data: &DynamicData) -> Result<(), EntityError> {
        check_dynamic_payload(
            &schema.fields,
            data,
            self.config.strict_dynamic_fields,
            self.config.max_dynamic_payload_bytes,
        )
    }

    async fn publish(&self, entity: &str, id: Uuid, ctx: &RequestContext, action: AuditAction) {
        publish_or_log(
            self.audit.as_ref(),
            AuditEvent::new(entity, id, ctx.tenant_id, action, &ctx.actor),
        )
        .await;
    }
}

fn normalize_draft(draft: SchemaDraft) -> Result<SchemaDraft, EntityError> {
    let entity_type = normalize_entity_type(&draft.entity_type);
    if entity_type.is_empty() {
        return Err(EntityError::validation("entity type is required"));
    }
    let sub_type = draft.sub_type.trim().to_string();
    if sub_type.is_empty() {
        return Err(EntityError::validation("sub-type is required"));
    }
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(EntityError::validation("schema name is required"));
    }
    validate_field_tree(&draft.fields)?;

    Ok(SchemaDraft {
        entity_type,
        sub_type,
        name,
        description: draft.description.filter(|d| !d.trim().is_empty()),
        fields: draft.fields,
    })
}
