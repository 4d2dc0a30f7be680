//! Contract error types for the hybrid entity service
//!
//! These errors are transport-agnostic and used for inter-module communication.

use thiserror::Error;

/// Hybrid entity service domain errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Record missing, soft-deleted, or a schema that does not resolve
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource type (schema, dynamic_entity, Agente, ...)
        resource: String,
        /// Resource identifier
        id: String,
    },
    /// Invalid input or a referenced schema that is missing or mismatched
    #[error("Validation error: {message}")]
    Validation {
        /// Validation error message
        message: String,
    },
    /// Dynamic values do not conform to the schema
    #[error("Dynamic field validation failed: {}", errors.join(", "))]
    DynamicFieldValidation {
        /// Validation errors
        errors: Vec<String>,
    },
    /// Uniqueness violation
    #[error("Conflict: {reason}")]
    Conflict {
        /// Conflict reason
        reason: String,
    },
    /// Persistence failure, already logged
    #[error("Internal error")]
    Internal,
}

impl EntityError {
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
