//! SeaORM entities for database tables

/// Custom schema definitions
pub mod custom_schema {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "custom_schemas")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        /// Canonical entity-type tag
        pub entity_type: String,
        pub sub_type: String,
        /// Lowercased sub-type backing the unique key
        pub sub_type_key: String,
        pub name: String,
        pub description: Option<String>,
        /// Field tree as JSON
        pub fields: Json,
        pub is_active: bool,
        pub created_at: DateTimeUtc,
        pub created_by: String,
        pub updated_at: Option<DateTimeUtc>,
        pub updated_by: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::dynamic_entity::Entity")]
        DynamicEntities,
    }

    impl Related<super::dynamic_entity::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::DynamicEntities.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Dynamic records holding schema-defined values
pub mod dynamic_entity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "dynamic_entities")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub schema_id: Uuid,
        /// Values keyed by field name
        pub data: Json,
        pub is_active: bool,
        pub created_at: DateTimeUtc,
        pub created_by: String,
        pub updated_at: Option<DateTimeUtc>,
        pub updated_by: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::custom_schema::Entity",
            from = "Column::SchemaId",
            to = "super::custom_schema::Column::Id"
        )]
        CustomSchema,
    }

    impl Related<super::custom_schema::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::CustomSchema.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Sales agents
pub mod agent {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "agents")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub schema_id: Uuid,
        pub dynamic_entity_id: Option<Uuid>,
        pub code: String,
        pub name: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub territory: Option<String>,
        pub is_active: bool,
        pub created_at: DateTimeUtc,
        pub created_by: String,
        pub updated_at: Option<DateTimeUtc>,
        pub updated_by: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Clients (pharmacies, hospitals, physicians)
pub mod client {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "clients")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub schema_id: Uuid,
        pub dynamic_entity_id: Option<Uuid>,
        pub name: String,
        pub tax_id: Option<String>,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub city: Option<String>,
        pub is_active: bool,
        pub created_at: DateTimeUtc,
        pub created_by: String,
        pub updated_at: Option<DateTimeUtc>,
        pub updated_by: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
