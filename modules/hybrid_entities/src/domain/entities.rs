//! Static field sets of the concrete hybrid entity types

use super::filter::{FilterValueType, StaticFieldConfig};
use super::hybrid::StaticFields;
use crate::contract::{AgentFields, ClientFields, EntityError};

const AGENT_FILTER_FIELDS: &[StaticFieldConfig] = &[
    StaticFieldConfig {
        key: "code",
        label: "Código",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "name",
        label: "Nombre",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "email",
        label: "Correo",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "phone",
        label: "Teléfono",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "territory",
        label: "Territorio",
        value_type: FilterValueType::Text,
    },
];

const CLIENT_FILTER_FIELDS: &[StaticFieldConfig] = &[
    StaticFieldConfig {
        key: "name",
        label: "Nombre",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "taxId",
        label: "RIF",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "email",
        label: "Correo",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "phone",
        label: "Teléfono",
        value_type: FilterValueType::Text,
    },
    StaticFieldConfig {
        key: "city",
        label: "Ciudad",
        value_type: FilterValueType::Text,
    },
];

impl StaticFields for AgentFields {
    const ENTITY_TYPE: &'static str = "Agente";

    fn validate(&self) -> Result<(), EntityError> {
        require("code", &self.code)?;
        require("name", &self.name)?;
        check_email(self.email.as_deref())
    }

    fn filter_fields() -> &'static [StaticFieldConfig] {
        AGENT_FILTER_FIELDS
    }
}

impl StaticFields for ClientFields {
    const ENTITY_TYPE: &'static str = "Cliente";

    fn validate(&self) -> Result<(), EntityError> {
        require("name", &self.name)?;
        check_email(self.email.as_deref())
    }

    fn filter_fields() -> &'static [StaticFieldConfig] {
        CLIENT_FILTER_FIELDS
    }
}

fn require(field: &str, value: &str) -> Result<(), EntityError> {
    if value.trim().is_empty() {
        return Err(EntityError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn check_email(email: Option<&str>) -> Result<(), EntityError> {
    match email.map(str::trim) {
        Some(e) if !e.is_empty() && !e.contains('@') => Err(EntityError::validation(format!(
            "email '{}' is not a valid address",
            e
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentFields {
        AgentFields {
            code: "AG-001".to_string(),
            name: "Ana Pérez".to_string(),
            email: Some("ana@example.com".to_string()),
            phone: None,
            territory: Some("Centro".to_string()),
        }
    }

    #[test]
    fn test_agent_requires_code_and_name() {
        assert!(agent().validate().is_ok());

        let mut missing_code = agent();
        missing_code.code = "  ".to_string();
        assert_eq!(
            missing_code.validate(),
            Err(EntityError::validation("code is required"))
        );
    }

    #[test]
    fn test_email_shape_checked() {
        let mut bad = agent();
        bad.email = Some("ana.example.com".to_string());
        assert!(bad.validate().is_err());

        let mut blank = agent();
        blank.email = Some(String::new());
        assert!(blank.validate().is_ok());
    }

    #[test]
    fn test_client_filter_keys_match_serialized_fields() {
        let client = ClientFields {
            name: "Farmacia Sol".to_string(),
            tax_id: Some("J-1234".to_string()),
            email: None,
            phone: None,
            city: None,
        };
        let value = serde_json::to_value(&client).unwrap();
        for config in ClientFields::filter_fields() {
            assert!(value.get(config.key).is_some(), "missing key {}", config.key);
        }
        assert_eq!(ClientFields::ENTITY_TYPE, "Cliente");
    }
}
