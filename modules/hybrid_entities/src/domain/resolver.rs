//! Entity-type normalization and schema selection

use crate::contract::CustomSchema;

/// Canonical entity-type tags keyed by the URL segments callers use
const ENTITY_TYPE_ALIASES: &[(&str, &str)] = &[
    ("agente", "Agente"),
    ("agentes", "Agente"),
    ("agent", "Agente"),
    ("agents", "Agente"),
    ("cliente", "Cliente"),
    ("clientes", "Cliente"),
    ("client", "Cliente"),
    ("clients", "Cliente"),
    ("relacion", "Relacion"),
    ("relaciones", "Relacion"),
    ("interaccion", "Interaccion"),
    ("interacciones", "Interaccion"),
    ("cita", "Cita"),
    ("citas", "Cita"),
    ("producto", "Producto"),
    ("productos", "Producto"),
];

/// Map a caller-supplied type token to the canonical entity-type tag
///
/// Unknown tokens are title-cased ("farmacia" -> "Farmacia").
pub fn normalize_entity_type(token: &str) -> String {
    let token = token.trim();
    let lowered = token.to_lowercase();
    if let Some((_, canonical)) = ENTITY_TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
    {
        return (*canonical).to_string();
    }

    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Pick a schema for a sub-type among the schemas of one entity type
///
/// Order: exact sub-type (case-insensitive), then sub-type contained in the
/// schema name (case-insensitive), then the only schema when exactly one exists.
pub fn select_schema<'a>(schemas: &'a [CustomSchema], sub_type: &str) -> Option<&'a CustomSchema> {
    let wanted = sub_type.trim().to_lowercase();

    if !wanted.is_empty() {
        if let Some(schema) = schemas
            .iter()
            .find(|s| s.sub_type.to_lowercase() == wanted)
        {
            return Some(schema);
        }

        if let Some(schema) = schemas
            .iter()
            .find(|s| s.name.to_lowercase().contains(&wanted))
        {
            return Some(schema);
        }
    }

    match schemas {
        [only] => Some(only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Audit, FieldDefinition, FieldKind};
    use uuid::Uuid;

    fn schema(sub_type: &str, name: &str) -> CustomSchema {
        CustomSchema {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            entity_type: "Agente".to_string(),
            sub_type: sub_type.to_string(),
            name: name.to_string(),
            description: None,
            fields: vec![FieldDefinition {
                name: "x".to_string(),
                label: "X".to_string(),
                kind: FieldKind::Text,
                required: false,
                layout: None,
            }],
            is_active: true,
            audit: Audit::created("test", chrono::Utc::now()),
        }
    }

    #[test]
    fn test_normalize_known_tokens() {
        assert_eq!(normalize_entity_type("agentes"), "Agente");
        assert_eq!(normalize_entity_type("Clientes"), "Cliente");
        assert_eq!(normalize_entity_type(" CITAS "), "Cita");
        assert_eq!(normalize_entity_type("agent"), "Agente");
    }

    #[test]
    fn test_normalize_falls_back_to_title_case() {
        assert_eq!(normalize_entity_type("farmacia"), "Farmacia");
        assert_eq!(normalize_entity_type("HOSPITAL"), "Hospital");
        assert_eq!(normalize_entity_type(""), "");
    }

    #[test]
    fn test_exact_sub_type_wins() {
        let schemas = vec![
            schema("Supervisor", "Agente supervisor"),
            schema("Visitador", "Visitador médico"),
        ];

        let picked = select_schema(&schemas, "visitador").unwrap();
        assert_eq!(picked.id, schemas[1].id);
    }

    #[test]
    fn test_exact_match_preferred_over_earlier_substring() {
        let schemas = vec![
            schema("Regional", "Visitador regional"),
            schema("Visitador", "Básico"),
        ];

        let picked = select_schema(&schemas, "Visitador").unwrap();
        assert_eq!(picked.id, schemas[1].id);
    }

    #[test]
    fn test_substring_of_name() {
        let schemas = vec![
            schema("SUP", "Agente supervisor"),
            schema("VIS", "Visitador médico"),
        ];

        let picked = select_schema(&schemas, "médico").unwrap();
        assert_eq!(picked.id, schemas[1].id);
    }

    #[test]
    fn test_single_schema_fallback() {
        let schemas = vec![schema("Visitador", "Visitador médico")];

        let picked = select_schema(&schemas, "gerente").unwrap();
        assert_eq!(picked.id, schemas[0].id);

        let picked = select_schema(&schemas, "").unwrap();
        assert_eq!(picked.id, schemas[0].id);
    }

    #[test]
    fn test_nothing_resolves() {
        let schemas = vec![schema("A", "Uno"), schema("B", "Dos")];
        assert!(select_schema(&schemas, "gerente").is_none());
        assert!(select_schema(&[], "gerente").is_none());
    }
}
