//! Contract models for the hybrid entity service
//!
//! These models are transport-agnostic and used for inter-module communication.
//! The schema field tree and the static field sets carry serde derives because
//! they are persisted and exchanged as JSON documents as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Dynamic field values keyed by field name
pub type DynamicData = Map<String, Value>;

/// Identity of the caller, threaded through every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Tenant that owns every record touched by the operation
    pub tenant_id: Uuid,
    /// Actor recorded in audit columns
    pub actor: String,
}

impl RequestContext {
    pub fn new(tenant_id: Uuid, actor: impl Into<String>) -> Self {
        Self {
            tenant_id,
            actor: actor.into(),
        }
    }
}

/// Creation and modification stamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Audit {
    /// Stamps for a record created now by `actor`
    pub fn created(actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by: actor.to_string(),
            updated_at: None,
            updated_by: None,
        }
    }

    /// Record a modification
    pub fn touch(&mut self, actor: &str, at: DateTime<Utc>) {
        self.updated_at = Some(at);
        self.updated_by = Some(actor.to_string());
    }
}

// ===== Schema definitions =====

/// Custom schema describing the dynamic fields of one entity type / sub-type
#[derive(Debug, Clone, PartialEq)]
pub struct CustomSchema {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Canonical entity-type tag (e.g. "Agente")
    pub entity_type: String,
    /// Sub-type tag (e.g. "Visitador")
    pub sub_type: String,
    pub name: String,
    pub description: Option<String>,
    /// Ordered field tree
    pub fields: Vec<FieldDefinition>,
    pub is_active: bool,
    pub audit: Audit,
}

/// Schema data supplied by callers on create / update
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDraft {
    pub entity_type: String,
    pub sub_type: String,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutHints>,
}

/// Semantic field kind; groups and repeaters own nested field lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Textarea,
    Checkbox,
    Address,
    Select {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<FieldOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_source: Option<String>,
    },
    #[serde(rename = "multiselect")]
    MultiSelect {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<FieldOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_source: Option<String>,
    },
    Fieldset {
        fields: Vec<FieldDefinition>,
    },
    Repeater {
        fields: Vec<FieldDefinition>,
        #[serde(default)]
        min_items: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
}

impl FieldKind {
    /// Wire name of the kind
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Textarea => "textarea",
            Self::Checkbox => "checkbox",
            Self::Address => "address",
            Self::Select { .. } => "select",
            Self::MultiSelect { .. } => "multiselect",
            Self::Fieldset { .. } => "fieldset",
            Self::Repeater { .. } => "repeater",
        }
    }
}

/// Static option of a select field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: Value,
    pub label: String,
}

/// Presentation hints, opaque to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

// ===== Dynamic entities =====

/// Generic record holding schema-defined values
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub schema_id: Uuid,
    pub data: DynamicData,
    pub is_active: bool,
    pub audit: Audit,
}

// ===== Hybrid entities =====

/// Business object with fixed columns and an optional dynamic record
#[derive(Debug, Clone, PartialEq)]
pub struct HybridRecord<F> {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Schema the record was created against (`tipoEntidadId`)
    pub schema_id: Uuid,
    /// Linked dynamic record, created lazily
    pub dynamic_entity_id: Option<Uuid>,
    pub fields: F,
    pub is_active: bool,
    pub audit: Audit,
}

/// Hybrid record merged with its related data
#[derive(Debug, Clone, PartialEq)]
pub struct HybridView<F> {
    pub record: HybridRecord<F>,
    pub schema_name: Option<String>,
    pub schema_sub_type: Option<String>,
    pub dynamic_data: Option<DynamicData>,
}

/// Create input for a hybrid entity
#[derive(Debug, Clone, PartialEq)]
pub struct NewHybrid<F> {
    pub schema_id: Uuid,
    pub fields: F,
    pub dynamic_data: Option<DynamicData>,
}

/// Update input for a hybrid entity; static fields are replaced as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct HybridUpdate<F> {
    pub fields: F,
    pub dynamic_data: Option<DynamicData>,
}

/// Static columns of a sales agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFields {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub territory: Option<String>,
}

/// Static columns of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFields {
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

// ===== Pagination =====

/// List request; missing values fall back to configuration defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Restrict to records created against this schema
    pub schema_id: Option<Uuid>,
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: u64, page: u64, page_size: u64) -> Self {
        Self {
            items,
            total_items,
            total_pages: total_items.div_ceil(page_size.max(1)),
            current_page: page,
        }
    }

    /// Cut one page out of an already ordered, complete result set
    pub fn from_vec(all: Vec<T>, page: u64, page_size: u64) -> Self {
        let total = all.len() as u64;
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        let items = all
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .collect();
        Self::new(items, total, page, page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            current_page: self.current_page,
        }
    }
}
