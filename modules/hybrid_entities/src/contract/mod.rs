//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client trait.

pub mod client;
pub mod error;
pub mod model;

pub use client::CatalogApi;
pub use error::EntityError;
pub use model::{
    AgentFields, Audit, ClientFields, CustomSchema, DynamicData, DynamicEntity,
    FieldDefinition, FieldKind, FieldOption, HybridRecord, HybridUpdate, HybridView,
    LayoutHints, NewHybrid, Page, PageRequest, RequestContext, SchemaDraft,
};
