//! Module wiring: repositories, services, migrations and REST registration

use crate::api::native::NativeClient;
use crate::api::rest::{register_routes, RestServices};
use crate::config::Config;
use crate::contract::{AgentFields, CatalogApi, ClientFields};
use crate::domain::{AuditPublisher, CatalogService, HybridEntityService, TracingAuditPublisher};
use crate::infra::lookup::ConfigOptionLookup;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::repositories::{
    SeaOrmAgentRepository, SeaOrmClientRepository, SeaOrmDynamicEntityRepository,
    SeaOrmSchemaRepository,
};
use anyhow::Result;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

/// Hybrid entities module
pub struct HybridEntitiesModule {
    config: Config,
    catalog: Arc<CatalogService>,
    agents: Arc<HybridEntityService<AgentFields>>,
    clients: Arc<HybridEntityService<ClientFields>>,
}

impl HybridEntitiesModule {
    /// Build the module over a database connection, auditing to the `audit` log target
    pub fn init(db: Arc<DatabaseConnection>, config: Config) -> Self {
        Self::with_audit(db, config, Arc::new(TracingAuditPublisher))
    }

    /// Build the module with a custom audit publisher
    pub fn with_audit(
        db: Arc<DatabaseConnection>,
        config: Config,
        audit: Arc<dyn AuditPublisher>,
    ) -> Self {
        let schemas = Arc::new(SeaOrmSchemaRepository::new(db.clone()));
        let dynamic = Arc::new(SeaOrmDynamicEntityRepository::new(db.clone()));
        let lookup = Arc::new(ConfigOptionLookup::new(config.lookups.clone()));

        let catalog = Arc::new(CatalogService::new(
            schemas.clone(),
            dynamic.clone(),
            audit.clone(),
            lookup,
            config.clone(),
        ));
        let agents = Arc::new(HybridEntityService::new(
            Arc::new(SeaOrmAgentRepository::new(db.clone())),
            schemas.clone(),
            dynamic.clone(),
            audit.clone(),
            config.clone(),
        ));
        let clients = Arc::new(HybridEntityService::new(
            Arc::new(SeaOrmClientRepository::new(db)),
            schemas,
            dynamic,
            audit,
            config.clone(),
        ));

        tracing::info!(
            default_page_size = config.default_page_size,
            max_page_size = config.max_page_size,
            strict_dynamic_fields = config.strict_dynamic_fields,
            lookup_tables = config.lookups.len(),
            "Hybrid entities module initialized"
        );

        Self {
            config,
            catalog,
            agents,
            clients,
        }
    }

    /// Apply pending database migrations
    pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None).await?;
        tracing::info!("Hybrid entities migrations completed");
        Ok(())
    }

    /// Add the module's REST routes to a router
    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        tracing::info!("Registering hybrid entities REST routes");
        register_routes(
            router,
            RestServices {
                agents: self.agents.clone(),
                clients: self.clients.clone(),
                catalog: self.catalog.clone(),
            },
        )
    }

    /// In-process client for other modules
    pub fn client(&self) -> Arc<dyn CatalogApi> {
        Arc::new(NativeClient::new(self.catalog.clone()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> Arc<CatalogService> {
        self.catalog.clone()
    }

    pub fn agents(&self) -> Arc<HybridEntityService<AgentFields>> {
        self.agents.clone()
    }

    pub fn clients(&self) -> Arc<HybridEntityService<ClientFields>> {
        self.clients.clone()
    }
}
