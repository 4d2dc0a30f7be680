//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity::{agent, client, custom_schema, dynamic_entity};
use crate::contract::{
    AgentFields, Audit, ClientFields, CustomSchema, DynamicData, DynamicEntity, FieldDefinition,
    HybridRecord,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use serde_json::Value;

fn audit(
    created_at: DateTime<Utc>,
    created_by: String,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
) -> Audit {
    Audit {
        created_at,
        created_by,
        updated_at,
        updated_by,
    }
}

// ===== Custom Schema Conversions =====

impl TryFrom<custom_schema::Model> for CustomSchema {
    type Error = anyhow::Error;

    fn try_from(entity: custom_schema::Model) -> Result<Self, Self::Error> {
        let fields: Vec<FieldDefinition> = serde_json::from_value(entity.fields)
            .with_context(|| format!("corrupt field tree in schema {}", entity.id))?;

        Ok(Self {
            id: entity.id,
            tenant_id: entity.tenant_id,
            entity_type: entity.entity_type,
            sub_type: entity.sub_type,
            name: entity.name,
            description: entity.description,
            fields,
            is_active: entity.is_active,
            audit: audit(
                entity.created_at,
                entity.created_by,
                entity.updated_at,
                entity.updated_by,
            ),
        })
    }
}

/// Stored form of a sub-type in the schema key
pub fn sub_type_key(sub_type: &str) -> String {
    sub_type.trim().to_lowercase()
}

impl TryFrom<&CustomSchema> for custom_schema::ActiveModel {
    type Error = anyhow::Error;

    fn try_from(model: &CustomSchema) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Set(model.id),
            tenant_id: Set(model.tenant_id),
            entity_type: Set(model.entity_type.clone()),
            sub_type: Set(model.sub_type.clone()),
            sub_type_key: Set(sub_type_key(&model.sub_type)),
            name: Set(model.name.clone()),
            description: Set(model.description.clone()),
            fields: Set(serde_json::to_value(&model.fields)?),
            is_active: Set(model.is_active),
            created_at: Set(model.audit.created_at),
            created_by: Set(model.audit.created_by.clone()),
            updated_at: Set(model.audit.updated_at),
            updated_by: Set(model.audit.updated_by.clone()),
        })
    }
}

// ===== Dynamic Entity Conversions =====

impl TryFrom<dynamic_entity::Model> for DynamicEntity {
    type Error = anyhow::Error;

    fn try_from(entity: dynamic_entity::Model) -> Result<Self, Self::Error> {
        let data: DynamicData = match entity.data {
            Value::Object(map) => map,
            Value::Null => DynamicData::new(),
            other => anyhow::bail!(
                "dynamic entity {} holds a non-object payload: {}",
                entity.id,
                other
            ),
        };

        Ok(Self {
            id: entity.id,
            tenant_id: entity.tenant_id,
            schema_id: entity.schema_id,
            data,
            is_active: entity.is_active,
            audit: audit(
                entity.created_at,
                entity.created_by,
                entity.updated_at,
                entity.updated_by,
            ),
        })
    }
}

impl From<&DynamicEntity> for dynamic_entity::ActiveModel {
    fn from(model: &DynamicEntity) -> Self {
        Self {
            id: Set(model.id),
            tenant_id: Set(model.tenant_id),
            schema_id: Set(model.schema_id),
            data: Set(Value::Object(model.data.clone())),
            is_active: Set(model.is_active),
            created_at: Set(model.audit.created_at),
            created_by: Set(model.audit.created_by.clone()),
            updated_at: Set(model.audit.updated_at),
            updated_by: Set(model.audit.updated_by.clone()),
        }
    }
}

// ===== Hybrid Entity Conversions =====

impl From<agent::Model> for HybridRecord<AgentFields> {
    fn from(entity: agent::Model) -> Self {
        Self {
            id: entity.id,
            tenant_id: entity.tenant_id,
            schema_id: entity.schema_id,
            dynamic_entity_id: entity.dynamic_entity_id,
            fields: AgentFields {
                code: entity.code,
                name: entity.name,
                email: entity.email,
                phone: entity.phone,
                territory: entity.territory,
            },
            is_active: entity.is_active,
            audit: audit(
                entity.created_at,
                entity.created_by,
                entity.updated_at,
                entity.updated_by,
            ),
        }
    }
}

impl From<&HybridRecord<AgentFields>> for agent::ActiveModel {
    fn from(model: &HybridRecord<AgentFields>) -> Self {
        Self {
            id: Set(model.id),
            tenant_id: Set(model.tenant_id),
            schema_id: Set(model.schema_id),
            dynamic_entity_id: Set(model.dynamic_entity_id),
            code: Set(model.fields.code.clone()),
            name: Set(model.fields.name.clone()),
            email: Set(model.fields.email.clone()),
            phone: Set(model.fields.phone.clone()),
            territory: Set(model.fields.territory.clone()),
            is_active: Set(model.is_active),
            created_at: Set(model.audit.created_at),
            created_by: Set(model.audit.created_by.clone()),
            updated_at: Set(model.audit.updated_at),
            updated_by: Set(model.audit.updated_by.clone()),
        }
    }
}

impl From<client::Model> for HybridRecord<ClientFields> {
    fn from(entity: client::Model) -> Self {
        Self {
            id: entity.id,
            tenant_id: entity.tenant_id,
            schema_id: entity.schema_id,
            dynamic_entity_id: entity.dynamic_entity_id,
            fields: ClientFields {
                name: entity.name,
                tax_id: entity.tax_id,
                email: entity.email,
                phone: entity.phone,
                city: entity.city,
            },
            is_active: entity.is_active,
            audit: audit(
                entity.created_at,
                entity.created_by,
                entity.updated_at,
                entity.updated_by,
            ),
        }
    }
}

impl From<&HybridRecord<ClientFields>> for client::ActiveModel {
    fn from(model: &HybridRecord<ClientFields>) -> Self {
        Self {
            id: Set(model.id),
            tenant_id: Set(model.tenant_id),
            schema_id: Set(model.schema_id),
            dynamic_entity_id: Set(model.dynamic_entity_id),
            name: Set(model.fields.name.clone()),
            tax_id: Set(model.fields.tax_id.clone()),
            email: Set(model.fields.email.clone()),
            phone: Set(model.fields.phone.clone()),
            city: Set(model.fields.city.clone()),
            is_active: Set(model.is_active),
            created_at: Set(model.audit.created_at),
            created_by: Set(model.audit.created_by.clone()),
            updated_at: Set(model.audit.updated_at),
            updated_by: Set(model.audit.updated_by.clone()),
        }
    }
}
