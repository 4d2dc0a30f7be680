//! Database migrations for hybrid entities

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_custom_schemas::Migration),
            Box::new(m20250301_000002_create_dynamic_entities::Migration),
            Box::new(m20250301_000003_create_hybrid_tables::Migration),
        ]
    }
}

/// Identifiers of tables referenced across migrations
#[derive(DeriveIden)]
enum CustomSchemas {
    Table,
    Id,
    TenantId,
    EntityType,
    SubType,
    SubTypeKey,
    Name,
    Description,
    Fields,
}

#[derive(DeriveIden)]
enum DynamicEntities {
    Table,
    Id,
    TenantId,
    SchemaId,
    Data,
}

/// Audit and soft-delete columns shared by every table
fn audit_columns(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Alias::new("is_active"))
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(Alias::new("created_at"))
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(ColumnDef::new(Alias::new("created_by")).string().not_null())
        .col(ColumnDef::new(Alias::new("updated_at")).timestamp_with_time_zone())
        .col(ColumnDef::new(Alias::new("updated_by")).string())
}

mod m20250301_000001_create_custom_schemas {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_custom_schemas"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(CustomSchemas::Table)
                .if_not_exists()
                .col(ColumnDef::new(CustomSchemas::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(CustomSchemas::TenantId).uuid().not_null())
                .col(ColumnDef::new(CustomSchemas::EntityType).string().not_null())
                .col(ColumnDef::new(CustomSchemas::SubType).string().not_null())
                .col(ColumnDef::new(CustomSchemas::SubTypeKey).string().not_null())
                .col(ColumnDef::new(CustomSchemas::Name).string().not_null())
                .col(ColumnDef::new(CustomSchemas::Description).text())
                .col(ColumnDef::new(CustomSchemas::Fields).json().not_null());
            manager.create_table(audit_columns(&mut table).to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("ux_custom_schemas_tenant_type_sub_type")
                        .table(CustomSchemas::Table)
                        .col(CustomSchemas::TenantId)
                        .col(CustomSchemas::EntityType)
                        .col(CustomSchemas::SubTypeKey)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomSchemas::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000002_create_dynamic_entities {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_dynamic_entities"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(DynamicEntities::Table)
                .if_not_exists()
                .col(ColumnDef::new(DynamicEntities::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(DynamicEntities::TenantId).uuid().not_null())
                .col(ColumnDef::new(DynamicEntities::SchemaId).uuid().not_null())
                .col(ColumnDef::new(DynamicEntities::Data).json().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_dynamic_entities_schema")
                        .from(DynamicEntities::Table, DynamicEntities::SchemaId)
                        .to(CustomSchemas::Table, CustomSchemas::Id)
                        .on_delete(ForeignKeyAction::Restrict)
                        .on_update(ForeignKeyAction::Cascade),
                );
            manager.create_table(audit_columns(&mut table).to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_dynamic_entities_tenant_schema")
                        .table(DynamicEntities::Table)
                        .col(DynamicEntities::TenantId)
                        .col(DynamicEntities::SchemaId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DynamicEntities::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000003_create_hybrid_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_hybrid_tables"
        }
    }

    #[derive(DeriveIden)]
    enum Agents {
        Table,
        Id,
        TenantId,
        SchemaId,
        DynamicEntityId,
        Code,
        Name,
        Email,
        Phone,
        Territory,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
        TenantId,
        SchemaId,
        DynamicEntityId,
        Name,
        TaxId,
        Email,
        Phone,
        City,
        CreatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut agents = Table::create();
            agents
                .table(Agents::Table)
                .if_not_exists()
                .col(ColumnDef::new(Agents::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Agents::TenantId).uuid().not_null())
                .col(ColumnDef::new(Agents::SchemaId).uuid().not_null())
                .col(ColumnDef::new(Agents::DynamicEntityId).uuid())
                .col(ColumnDef::new(Agents::Code).string().not_null())
                .col(ColumnDef::new(Agents::Name).string().not_null())
                .col(ColumnDef::new(Agents::Email).string())
                .col(ColumnDef::new(Agents::Phone).string())
                .col(ColumnDef::new(Agents::Territory).string())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_agents_schema")
                        .from(Agents::Table, Agents::SchemaId)
                        .to(CustomSchemas::Table, CustomSchemas::Id)
                        .on_delete(ForeignKeyAction::Restrict),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_agents_dynamic_entity")
                        .from(Agents::Table, Agents::DynamicEntityId)
                        .to(DynamicEntities::Table, DynamicEntities::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                );
            manager.create_table(audit_columns(&mut agents).to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_agents_tenant_created")
                        .table(Agents::Table)
                        .col(Agents::TenantId)
                        .col(Agents::CreatedAt)
                        .to_owned(),
                )
                .await?;

            let mut clients = Table::create();
            clients
                .table(Clients::Table)
                .if_not_exists()
                .col(ColumnDef::new(Clients::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Clients::TenantId).uuid().not_null())
                .col(ColumnDef::new(Clients::SchemaId).uuid().not_null())
                .col(ColumnDef::new(Clients::DynamicEntityId).uuid())
                .col(ColumnDef::new(Clients::Name).string().not_null())
                .col(ColumnDef::new(Clients::TaxId).string())
                .col(ColumnDef::new(Clients::Email).string())
                .col(ColumnDef::new(Clients::Phone).string())
                .col(ColumnDef::new(Clients::City).string())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_clients_schema")
                        .from(Clients::Table, Clients::SchemaId)
                        .to(CustomSchemas::Table, CustomSchemas::Id)
                        .on_delete(ForeignKeyAction::Restrict),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_clients_dynamic_entity")
                        .from(Clients::Table, Clients::DynamicEntityId)
                        .to(DynamicEntities::Table, DynamicEntities::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                );
            manager.create_table(audit_columns(&mut clients).to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_clients_tenant_created")
                        .table(Clients::Table)
                        .col(Clients::TenantId)
                        .col(Clients::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Agents::Table).to_owned())
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_migration_names_are_unique() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let unique: HashSet<&String> = names.iter().collect();

        assert_eq!(unique.len(), names.len(), "duplicate migration names: {:?}", names);
        assert!(names.iter().all(|name| name.starts_with("m2025")));
    }
}
