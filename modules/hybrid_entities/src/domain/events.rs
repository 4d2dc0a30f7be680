//! Audit events for hybrid entities, dynamic records and schemas
//!
//! Every mutation produces one event carrying the actor and the timestamp.
//! Publishing is best effort: failures are logged by the caller and never
//! fail the operation that produced the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of mutation being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

/// Audit event for one mutated record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Entity name ("Agente", "schema", "dynamic_entity", ...)
    pub entity: String,
    /// Identifier of the mutated record
    pub entity_id: Uuid,
    /// Tenant owning the record
    pub tenant_id: Uuid,
    pub action: AuditAction,
    /// Actor taken from the request context
    pub actor: String,
    /// Dynamic record linked to a hybrid entity, if any
    pub dynamic_entity_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        entity: impl Into<String>,
        entity_id: Uuid,
        tenant_id: Uuid,
        action: AuditAction,
        actor: &str,
    ) -> Self {
        Self {
            entity: entity.into(),
            entity_id,
            tenant_id,
            action,
            actor: actor.to_string(),
            dynamic_entity_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_dynamic_entity(mut self, dynamic_entity_id: Option<Uuid>) -> Self {
        self.dynamic_entity_id = dynamic_entity_id;
        self
    }
}

/// Audit publisher trait
#[async_trait::async_trait]
pub trait AuditPublisher: Send + Sync {
    /// Publish an audit event
    async fn publish(&self, event: AuditEvent) -> anyhow::Result<()>;
}

/// Publish an event, logging instead of failing
pub async fn publish_or_log(publisher: &dyn AuditPublisher, event: AuditEvent) {
    let entity = event.entity.clone();
    let entity_id = event.entity_id;
    if let Err(e) = publisher.publish(event).await {
        tracing::warn!(entity = %entity, id = %entity_id, error = %e, "Failed to publish audit event");
    }
}

/// No-op publisher for testing or when auditing is disabled
pub struct NoOpAuditPublisher;

#[async_trait::async_trait]
impl AuditPublisher for NoOpAuditPublisher {
    async fn publish(&self, _event: AuditEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publisher writing audit events to the `audit` tracing target
pub struct TracingAuditPublisher;

#[async_trait::async_trait]
impl AuditPublisher for TracingAuditPublisher {
    async fn publish(&self, event: AuditEvent) -> anyhow::Result<()> {
        tracing::info!(
            target: "audit",
            entity = %event.entity,
            entity_id = %event.entity_id,
            tenant_id = %event.tenant_id,
            action = ?event.action,
            actor = %event.actor,
            dynamic_entity_id = ?event.dynamic_entity_id,
            timestamp = %event.timestamp,
            "entity mutated"
        );
        Ok(())
    }
}
