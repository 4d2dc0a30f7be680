//! Mapper implementations for converting between DTOs and contract models
//!
//! This module contains all From/Into implementations for bidirectional
//! conversion between REST DTOs and transport-agnostic contract models.

use super::dto::*;
use crate::contract::{
    CustomSchema, DynamicEntity, EntityError, FieldDefinition, HybridUpdate, HybridView,
    NewHybrid, Page, PageRequest, SchemaDraft,
};
use crate::domain::SearchRequest;

// ===== Paging conversions =====

impl<T, U: From<T>> From<Page<T>> for PagedResponse<U> {
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.items.into_iter().map(U::from).collect(),
            total_items: page.total_items,
            total_pages: page.total_pages,
            current_page: page.current_page,
        }
    }
}

impl From<ListQuery> for PageRequest {
    fn from(query: ListQuery) -> Self {
        Self {
            page: query.page,
            page_size: query.page_size,
            schema_id: query.tipo_entidad_id,
        }
    }
}

impl From<SearchBody> for SearchRequest {
    fn from(body: SearchBody) -> Self {
        Self {
            page: body.page,
            page_size: body.page_size,
            schema_id: body.tipo_entidad_id,
            clauses: body.filtros,
        }
    }
}

// ===== Hybrid entity conversions =====

impl<F> From<HybridView<F>> for HybridDto<F> {
    fn from(view: HybridView<F>) -> Self {
        let record = view.record;
        Self {
            id: record.id,
            tipo_entidad_id: record.schema_id,
            esquema_nombre: view.schema_name,
            sub_tipo: view.schema_sub_type,
            entidad_dinamica_id: record.dynamic_entity_id,
            fields: record.fields,
            datos_dinamicos: view.dynamic_data,
            created_at: record.audit.created_at,
            created_by: record.audit.created_by,
            updated_at: record.audit.updated_at,
            updated_by: record.audit.updated_by,
        }
    }
}

impl<F> From<CreateHybridRequest<F>> for NewHybrid<F> {
    fn from(req: CreateHybridRequest<F>) -> Self {
        Self {
            schema_id: req.tipo_entidad_id,
            fields: req.fields,
            dynamic_data: req.datos_dinamicos,
        }
    }
}

impl<F> From<UpdateHybridRequest<F>> for HybridUpdate<F> {
    fn from(req: UpdateHybridRequest<F>) -> Self {
        Self {
            fields: req.fields,
            dynamic_data: req.datos_dinamicos,
        }
    }
}

// ===== Schema conversions =====

impl From<CustomSchema> for SchemaDto {
    fn from(schema: CustomSchema) -> Self {
        Self {
            id: schema.id,
            entidad_tipo: schema.entity_type,
            sub_tipo: schema.sub_type,
            nombre: schema.name,
            descripcion: schema.description,
            campos: serde_json::to_value(&schema.fields).unwrap_or_default(),
            is_active: schema.is_active,
            created_at: schema.audit.created_at,
            created_by: schema.audit.created_by,
            updated_at: schema.audit.updated_at,
            updated_by: schema.audit.updated_by,
        }
    }
}

impl TryFrom<UpsertSchemaRequest> for SchemaDraft {
    type Error = EntityError;

    fn try_from(req: UpsertSchemaRequest) -> Result<Self, Self::Error> {
        let fields: Vec<FieldDefinition> = serde_json::from_value(req.campos)
            .map_err(|e| EntityError::validation(format!("invalid field tree: {}", e)))?;

        Ok(Self {
            entity_type: req.entidad_tipo,
            sub_type: req.sub_tipo,
            name: req.nombre,
            description: req.descripcion,
            fields,
        })
    }
}

// ===== Dynamic entity conversions =====

impl From<DynamicEntity> for DynamicEntityDto {
    fn from(entity: DynamicEntity) -> Self {
        Self {
            id: entity.id,
            esquema_id: entity.schema_id,
            datos: entity.data,
            is_active: entity.is_active,
            created_at: entity.audit.created_at,
            created_by: entity.audit.created_by,
            updated_at: entity.audit.updated_at,
            updated_by: entity.audit.updated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{AgentFields, Audit, HybridRecord};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_create_request_flattens_static_fields() {
        let schema_id = Uuid::new_v4();
        let req: CreateHybridRequest<AgentFields> = serde_json::from_value(json!({
            "tipoEntidadId": schema_id,
            "code": "AG-7",
            "name": "Luis",
            "datosDinamicos": { "cedula": "V-1" }
        }))
        .unwrap();

        let input: NewHybrid<AgentFields> = req.into();
        assert_eq!(input.schema_id, schema_id);
        assert_eq!(input.fields.code, "AG-7");
        assert_eq!(input.fields.email, None);
        assert_eq!(input.dynamic_data.unwrap()["cedula"], "V-1");
    }

    #[test]
    fn test_hybrid_dto_wire_shape() {
        let view = HybridView {
            record: HybridRecord {
                id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                schema_id: Uuid::new_v4(),
                dynamic_entity_id: None,
                fields: AgentFields {
                    code: "AG-1".to_string(),
                    name: "Ana".to_string(),
                    email: None,
                    phone: None,
                    territory: Some("Centro".to_string()),
                },
                is_active: true,
                audit: Audit::created("ana", chrono::Utc::now()),
            },
            schema_name: Some("Visitador médico".to_string()),
            schema_sub_type: Some("Visitador".to_string()),
            dynamic_data: None,
        };

        let body = serde_json::to_value(HybridDto::from(view)).unwrap();
        assert_eq!(body["code"], "AG-1");
        assert_eq!(body["territory"], "Centro");
        assert_eq!(body["esquemaNombre"], "Visitador médico");
        assert!(body.get("entidadDinamicaId").is_none());
        assert!(body["datosDinamicos"].is_null());
    }

    #[test]
    fn test_bad_field_tree_is_validation_error() {
        let req = UpsertSchemaRequest {
            entidad_tipo: "agentes".to_string(),
            sub_tipo: "Visitador".to_string(),
            nombre: "Visitador".to_string(),
            descripcion: None,
            campos: json!([{ "name": "x", "label": "X", "type": "color" }]),
        };
        assert!(matches!(
            SchemaDraft::try_from(req),
            Err(EntityError::Validation { .. })
        ));
    }
}
