//! Domain layer - business logic and services

pub mod entities;
pub mod events;
pub mod filter;
pub mod form;
pub mod hybrid;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod validation;

pub use events::{AuditAction, AuditEvent, AuditPublisher, NoOpAuditPublisher, TracingAuditPublisher};
pub use filter::{
    Connector, FieldOrigin, FilterBuilder, FilterChain, FilterClause, FilterField, FilterOperator,
    FilterValueType, StaticFieldConfig,
};
pub use form::{FieldPath, FormError, FormNode, FormState, OptionLookup, OptionsState};
pub use hybrid::{HybridEntityService, SearchRequest, StaticFields};
pub use repository::{DynamicEntityRepository, HybridRepository, SchemaRepository};
pub use service::CatalogService;

use crate::contract::EntityError;
use std::fmt::Display;

/// Log a repository failure with its context and hide it behind `Internal`
pub(crate) fn infra_error(entity: &str, id: impl Display, error: anyhow::Error) -> EntityError {
    tracing::error!(entity, id = %id, error = %error, "Repository operation failed");
    EntityError::Internal
}
