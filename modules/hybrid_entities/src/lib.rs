//! Hybrid Entities Module
//!
//! CRM business objects that combine fixed relational columns with
//! tenant-defined custom fields. Custom fields are described by schemas per
//! entity type and sub-type and stored in a linked dynamic record.

// Public exports
pub mod contract;
pub use contract::{
    AgentFields, CatalogApi, ClientFields, CustomSchema, DynamicEntity, EntityError,
    FieldDefinition, FieldKind, RequestContext,
};

pub mod config;
pub use config::Config;

pub mod module;
pub use module::HybridEntitiesModule;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
