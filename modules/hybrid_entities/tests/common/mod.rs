//! Common test utilities: in-memory repositories, fixtures and output helpers

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hybrid_entities::contract::{
    Audit, CustomSchema, DynamicEntity, FieldDefinition, FieldOption, HybridRecord,
    RequestContext, SchemaDraft,
};
use hybrid_entities::domain::{
    AuditEvent, AuditPublisher, CatalogService, DynamicEntityRepository, HybridEntityService,
    HybridRepository, OptionLookup, SchemaRepository, StaticFields,
};
use hybrid_entities::Config;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}

pub fn print_json(label: &str, value: &Value) {
    println!("   {}: {}", label, serde_json::to_string_pretty(value).unwrap());
}

/// Caller identity used by most tests
pub fn ctx(tenant_id: Uuid) -> RequestContext {
    RequestContext::new(tenant_id, "maria.perez")
}

// ===== Fixtures =====

/// Field tree of the "Visitador" agent sub-type
pub fn visitador_fields() -> Vec<FieldDefinition> {
    serde_json::from_value(json!([
        { "name": "zona", "label": "Zona", "type": "select", "required": true,
          "options": [
            { "value": "N", "label": "Norte" },
            { "value": "S", "label": "Sur" }
          ] },
        { "name": "visitasMes", "label": "Visitas por mes", "type": "number" },
        { "name": "activo", "label": "Activo", "type": "checkbox" },
        { "name": "direccion", "label": "Dirección", "type": "fieldset", "fields": [
            { "name": "ciudad", "label": "Ciudad", "type": "text" },
            { "name": "estado", "label": "Estado", "type": "text" }
        ] },
        { "name": "contactos", "label": "Contactos", "type": "repeater", "maxItems": 2, "fields": [
            { "name": "telefono", "label": "Teléfono", "type": "text", "required": true }
        ] }
    ]))
    .unwrap()
}

/// Field tree of the "Farmacia" client sub-type, with a lookup-backed select
pub fn farmacia_fields() -> Vec<FieldDefinition> {
    serde_json::from_value(json!([
        { "name": "cadena", "label": "Cadena", "type": "text", "required": true },
        { "name": "especialidad", "label": "Especialidad", "type": "select",
          "dataSource": "especialidades" }
    ]))
    .unwrap()
}

pub fn draft(entity_type: &str, sub_type: &str, fields: Vec<FieldDefinition>) -> SchemaDraft {
    SchemaDraft {
        entity_type: entity_type.to_string(),
        sub_type: sub_type.to_string(),
        name: format!("{} {}", entity_type, sub_type),
        description: None,
        fields,
    }
}

// ===== Mock repositories =====

pub mod mocks {
    use super::*;

    #[derive(Clone, Default)]
    pub struct MockSchemaRepo {
        data: Arc<RwLock<HashMap<Uuid, CustomSchema>>>,
    }

    impl MockSchemaRepo {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count(&self) -> usize {
            self.data.read().len()
        }

        pub fn get(&self, id: Uuid) -> Option<CustomSchema> {
            self.data.read().get(&id).cloned()
        }

        pub fn insert(&self, schema: CustomSchema) {
            self.data.write().insert(schema.id, schema);
        }
    }

    #[async_trait]
    impl SchemaRepository for MockSchemaRepo {
        async fn create(&self, schema: &CustomSchema) -> Result<CustomSchema> {
            self.data.write().insert(schema.id, schema.clone());
            Ok(schema.clone())
        }

        async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CustomSchema>> {
            Ok(self
                .data
                .read()
                .get(&id)
                .filter(|s| s.tenant_id == tenant_id && s.is_active)
                .cloned())
        }

        async fn find_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<CustomSchema>> {
            let data = self.data.read();
            Ok(ids
                .iter()
                .filter_map(|id| data.get(id))
                .filter(|s| s.tenant_id == tenant_id)
                .cloned()
                .collect())
        }

        async fn find_by_key(
            &self,
            tenant_id: Uuid,
            entity_type: &str,
            sub_type: &str,
        ) -> Result<Option<CustomSchema>> {
            Ok(self
                .data
                .read()
                .values()
                .find(|s| {
                    s.tenant_id == tenant_id
                        && s.entity_type == entity_type
                        && s.sub_type.to_lowercase() == sub_type.trim().to_lowercase()
                })
                .cloned())
        }

        async fn list_by_entity_type(
            &self,
            tenant_id: Uuid,
            entity_type: &str,
        ) -> Result<Vec<CustomSchema>> {
            let mut schemas: Vec<CustomSchema> = self
                .data
                .read()
                .values()
                .filter(|s| s.tenant_id == tenant_id && s.is_active && s.entity_type == entity_type)
                .cloned()
                .collect();
            schemas.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(schemas)
        }

        async fn update(&self, schema: &CustomSchema) -> Result<CustomSchema> {
            let mut data = self.data.write();
            match data.get_mut(&schema.id) {
                Some(existing) if existing.tenant_id == schema.tenant_id => {
                    *existing = schema.clone();
                    Ok(schema.clone())
                }
                _ => Err(anyhow!("schema {} not found", schema.id)),
            }
        }

        async fn deactivate(
            &self,
            tenant_id: Uuid,
            id: Uuid,
            actor: &str,
            at: DateTime<Utc>,
        ) -> Result<bool> {
            let mut data = self.data.write();
            match data.get_mut(&id) {
                Some(schema) if schema.tenant_id == tenant_id && schema.is_active => {
                    schema.is_active = false;
                    schema.audit.touch(actor, at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    #[derive(Clone, Default)]
    pub struct MockDynamicRepo {
        data: Arc<RwLock<HashMap<Uuid, DynamicEntity>>>,
    }

    impl MockDynamicRepo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Rows including soft-deleted ones
        pub fn count(&self) -> usize {
            self.data.read().len()
        }

        pub fn get(&self, id: Uuid) -> Option<DynamicEntity> {
            self.data.read().get(&id).cloned()
        }

        pub fn all(&self) -> Vec<DynamicEntity> {
            self.data.read().values().cloned().collect()
        }

        pub fn print_state(&self, context: &str) {
            let data = self.data.read();
            println!("\n========== DynamicEntityRepository State: {} ==========", context);
            println!("Total records: {}", data.len());
            for entity in data.values() {
                println!(
                    "  {} schema={} active={} data={}",
                    entity.id,
                    entity.schema_id,
                    entity.is_active,
                    Value::Object(entity.data.clone())
                );
            }
        }
    }

    #[async_trait]
    impl DynamicEntityRepository for MockDynamicRepo {
        async fn create(&self, entity: &DynamicEntity) -> Result<DynamicEntity> {
            self.data.write().insert(entity.id, entity.clone());
            Ok(entity.clone())
        }

        async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DynamicEntity>> {
            Ok(self
                .data
                .read()
                .get(&id)
                .filter(|e| e.tenant_id == tenant_id && e.is_active)
                .cloned())
        }

        async fn find_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<DynamicEntity>> {
            let data = self.data.read();
            Ok(ids
                .iter()
                .filter_map(|id| data.get(id))
                .filter(|e| e.tenant_id == tenant_id && e.is_active)
                .cloned()
                .collect())
        }

        async fn list_by_schema(
            &self,
            tenant_id: Uuid,
            schema_id: Uuid,
        ) -> Result<Vec<DynamicEntity>> {
            let mut entities: Vec<DynamicEntity> = self
                .data
                .read()
                .values()
                .filter(|e| e.tenant_id == tenant_id && e.is_active && e.schema_id == schema_id)
                .cloned()
                .collect();
            entities.sort_by_key(|e| e.audit.created_at);
            Ok(entities)
        }

        async fn update(&self, entity: &DynamicEntity) -> Result<DynamicEntity> {
            let mut data = self.data.write();
            match data.get_mut(&entity.id) {
                Some(existing) if existing.tenant_id == entity.tenant_id => {
                    *existing = entity.clone();
                    Ok(entity.clone())
                }
                _ => Err(anyhow!("dynamic entity {} not found", entity.id)),
            }
        }

        async fn soft_delete(
            &self,
            tenant_id: Uuid,
            id: Uuid,
            actor: &str,
            at: DateTime<Utc>,
        ) -> Result<bool> {
            let mut data = self.data.write();
            match data.get_mut(&id) {
                Some(entity) if entity.tenant_id == tenant_id && entity.is_active => {
                    entity.is_active = false;
                    entity.audit.touch(actor, at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    pub struct MockHybridRepo<F> {
        data: Arc<RwLock<HashMap<Uuid, HybridRecord<F>>>>,
        fail_inserts: Arc<AtomicBool>,
    }

    impl<F> Clone for MockHybridRepo<F> {
        fn clone(&self) -> Self {
            Self {
                data: self.data.clone(),
                fail_inserts: self.fail_inserts.clone(),
            }
        }
    }

    impl<F: Clone> MockHybridRepo<F> {
        pub fn new() -> Self {
            Self {
                data: Arc::new(RwLock::new(HashMap::new())),
                fail_inserts: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Make subsequent inserts fail like a broken connection
        pub fn fail_inserts(&self, fail: bool) {
            self.fail_inserts.store(fail, Ordering::SeqCst);
        }

        pub fn get(&self, id: Uuid) -> Option<HybridRecord<F>> {
            self.data.read().get(&id).cloned()
        }

        fn active(&self, tenant_id: Uuid, schema_id: Option<Uuid>) -> Vec<HybridRecord<F>> {
            let mut records: Vec<HybridRecord<F>> = self
                .data
                .read()
                .values()
                .filter(|r| r.tenant_id == tenant_id && r.is_active)
                .filter(|r| schema_id.is_none_or(|s| r.schema_id == s))
                .cloned()
                .collect();
            records.sort_by(|a, b| {
                b.audit
                    .created_at
                    .cmp(&a.audit.created_at)
                    .then(a.id.cmp(&b.id))
            });
            records
        }
    }

    #[async_trait]
    impl<F: Clone + Send + Sync + 'static> HybridRepository<F> for MockHybridRepo<F> {
        async fn page(
            &self,
            tenant_id: Uuid,
            schema_id: Option<Uuid>,
            page: u64,
            page_size: u64,
        ) -> Result<(Vec<HybridRecord<F>>, u64)> {
            let all = self.active(tenant_id, schema_id);
            let total = all.len() as u64;
            let items = all
                .into_iter()
                .skip(((page - 1) * page_size) as usize)
                .take(page_size as usize)
                .collect();
            Ok((items, total))
        }

        async fn list_all(
            &self,
            tenant_id: Uuid,
            schema_id: Option<Uuid>,
        ) -> Result<Vec<HybridRecord<F>>> {
            Ok(self.active(tenant_id, schema_id))
        }

        async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<HybridRecord<F>>> {
            Ok(self
                .data
                .read()
                .get(&id)
                .filter(|r| r.tenant_id == tenant_id && r.is_active)
                .cloned())
        }

        async fn create(&self, record: &HybridRecord<F>) -> Result<HybridRecord<F>> {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(anyhow!("connection reset while inserting {}", record.id));
            }
            self.data.write().insert(record.id, record.clone());
            Ok(record.clone())
        }

        async fn update(&self, record: &HybridRecord<F>) -> Result<HybridRecord<F>> {
            let mut data = self.data.write();
            match data.get_mut(&record.id) {
                Some(existing) if existing.tenant_id == record.tenant_id => {
                    *existing = record.clone();
                    Ok(record.clone())
                }
                _ => Err(anyhow!("record {} not found", record.id)),
            }
        }

        async fn soft_delete(
            &self,
            tenant_id: Uuid,
            id: Uuid,
            actor: &str,
            at: DateTime<Utc>,
        ) -> Result<bool> {
            let mut data = self.data.write();
            match data.get_mut(&id) {
                Some(record) if record.tenant_id == tenant_id && record.is_active => {
                    record.is_active = false;
                    record.audit.touch(actor, at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    /// Publisher keeping every event in memory
    #[derive(Clone, Default)]
    pub struct RecordingPublisher {
        events: Arc<RwLock<Vec<AuditEvent>>>,
    }

    impl RecordingPublisher {
        pub fn events(&self) -> Vec<AuditEvent> {
            self.events.read().clone()
        }
    }

    #[async_trait]
    impl AuditPublisher for RecordingPublisher {
        async fn publish(&self, event: AuditEvent) -> Result<()> {
            self.events.write().push(event);
            Ok(())
        }
    }

    /// Lookup with fixed tables; unknown tables fail
    #[derive(Clone, Default)]
    pub struct StaticLookup {
        tables: HashMap<String, Vec<FieldOption>>,
    }

    impl StaticLookup {
        pub fn with_table(mut self, name: &str, options: &[(&str, &str)]) -> Self {
            self.tables.insert(
                name.to_string(),
                options
                    .iter()
                    .map(|(value, label)| FieldOption {
                        value: json!(value),
                        label: label.to_string(),
                    })
                    .collect(),
            );
            self
        }
    }

    #[async_trait]
    impl OptionLookup for StaticLookup {
        async fn fetch_options(&self, source: &str) -> Result<Vec<FieldOption>> {
            self.tables
                .get(source)
                .cloned()
                .ok_or_else(|| anyhow!("lookup table '{}' is unavailable", source))
        }
    }
}

use mocks::*;

/// Services wired over shared in-memory repositories
pub struct TestHarness {
    pub schemas: MockSchemaRepo,
    pub dynamic: MockDynamicRepo,
    pub audit: RecordingPublisher,
    pub catalog: Arc<CatalogService>,
}

impl TestHarness {
    pub fn new(config: Config) -> Self {
        let schemas = MockSchemaRepo::new();
        let dynamic = MockDynamicRepo::new();
        let audit = RecordingPublisher::default();
        let lookup = StaticLookup::default()
            .with_table("especialidades", &[("CAR", "Cardiología"), ("PED", "Pediatría")]);
        let catalog = Arc::new(CatalogService::new(
            Arc::new(schemas.clone()),
            Arc::new(dynamic.clone()),
            Arc::new(audit.clone()),
            Arc::new(lookup),
            config,
        ));
        Self {
            schemas,
            dynamic,
            audit,
            catalog,
        }
    }

    /// Hybrid service for `F` sharing this harness' schema and dynamic stores
    pub fn hybrid<F: StaticFields>(
        &self,
        config: Config,
    ) -> (HybridEntityService<F>, MockHybridRepo<F>) {
        let records = MockHybridRepo::<F>::new();
        let service = HybridEntityService::new(
            Arc::new(records.clone()),
            Arc::new(self.schemas.clone()),
            Arc::new(self.dynamic.clone()),
            Arc::new(self.audit.clone()),
            config,
        );
        (service, records)
    }

    /// Insert a schema directly, bypassing service validation
    pub fn seed_schema(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        sub_type: &str,
        fields: Vec<FieldDefinition>,
    ) -> CustomSchema {
        let schema = CustomSchema {
            id: Uuid::new_v4(),
            tenant_id,
            entity_type: entity_type.to_string(),
            sub_type: sub_type.to_string(),
            name: format!("{} {}", entity_type, sub_type),
            description: None,
            fields,
            is_active: true,
            audit: Audit::created("seed", Utc::now()),
        };
        self.schemas.insert(schema.clone());
        schema
    }
}
