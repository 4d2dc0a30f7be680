//! Validation of schema definitions and of dynamic values
//!
//! Dynamic values are checked on every write: the schema field tree is
//! compiled into a JSON Schema document which is then applied with the
//! `jsonschema` validator.

use crate::contract::{DynamicData, EntityError, FieldDefinition, FieldKind, FieldOption};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Validate a schema field tree
///
/// Rules:
/// - names are identifiers (letter or `_` first, then alphanumerics or `_`)
/// - names are unique within one level
/// - select / multiselect carry static options or a data source
/// - fieldsets and repeaters have at least one child
/// - repeater bounds satisfy `0 < max_items` and `min_items <= max_items`
pub fn validate_field_tree(fields: &[FieldDefinition]) -> Result<(), EntityError> {
    if fields.is_empty() {
        return Err(EntityError::validation("schema must declare at least one field"));
    }
    let mut errors = Vec::new();
    check_level(fields, "", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EntityError::validation(errors.join("; ")))
    }
}

fn check_level(fields: &[FieldDefinition], prefix: &str, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for field in fields {
        let path = format!("{}{}", prefix, field.name);

        if !is_identifier(&field.name) {
            errors.push(format!("field name '{}' is not a valid identifier", path));
        }
        if !seen.insert(field.name.as_str()) {
            errors.push(format!("duplicate field name '{}'", path));
        }

        match &field.kind {
            FieldKind::Select {
                options,
                data_source,
            }
            | FieldKind::MultiSelect {
                options,
                data_source,
            } => {
                if options.is_empty() && data_source.as_deref().is_none_or(str::is_empty) {
                    errors.push(format!(
                        "field '{}' needs static options or a data source",
                        path
                    ));
                }
            }
            FieldKind::Fieldset { fields } => {
                if fields.is_empty() {
                    errors.push(format!("fieldset '{}' has no fields", path));
                }
                check_level(fields, &format!("{}.", path), errors);
            }
            FieldKind::Repeater {
                fields,
                min_items,
                max_items,
            } => {
                if fields.is_empty() {
                    errors.push(format!("repeater '{}' has no fields", path));
                }
                if let Some(max) = max_items {
                    if *max == 0 {
                        errors.push(format!("repeater '{}' must allow at least one item", path));
                    } else if min_items > max {
                        errors.push(format!(
                            "repeater '{}' has minItems {} greater than maxItems {}",
                            path, min_items, max
                        ));
                    }
                }
                check_level(fields, &format!("{}[].", path), errors);
            }
            _ => {}
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Compile a field tree into a JSON Schema for an object of dynamic values
pub fn to_json_schema(fields: &[FieldDefinition], strict: bool) -> Value {
    let mut schema = object_schema(fields, strict);
    if let Value::Object(map) = &mut schema {
        map.insert(
            "$schema".to_string(),
            json!("https://json-schema.org/draft/2020-12/schema"),
        );
    }
    schema
}

fn object_schema(fields: &[FieldDefinition], strict: bool) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        let mut property = field_schema(&field.kind, strict);
        if field.required {
            required.push(json!(field.name));
        } else {
            allow_null(&mut property);
        }
        properties.insert(field.name.clone(), property);
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    if strict {
        schema.insert("additionalProperties".to_string(), json!(false));
    }
    Value::Object(schema)
}

fn field_schema(kind: &FieldKind, strict: bool) -> Value {
    match kind {
        FieldKind::Text | FieldKind::Textarea => json!({ "type": "string" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Date => json!({ "type": "string", "format": "date" }),
        FieldKind::Checkbox => json!({ "type": "boolean" }),
        FieldKind::Address => json!({ "type": ["string", "object"] }),
        FieldKind::Select { options, .. } => option_schema(options),
        FieldKind::MultiSelect { options, .. } => {
            json!({ "type": "array", "items": option_schema(options) })
        }
        FieldKind::Fieldset { fields } => object_schema(fields, strict),
        FieldKind::Repeater {
            fields,
            min_items,
            max_items,
        } => {
            let mut schema = Map::new();
            schema.insert("type".to_string(), json!("array"));
            schema.insert("items".to_string(), object_schema(fields, strict));
            if *min_items > 0 {
                schema.insert("minItems".to_string(), json!(min_items));
            }
            if let Some(max) = max_items {
                schema.insert("maxItems".to_string(), json!(max));
            }
            Value::Object(schema)
        }
    }
}

/// Static options restrict the value; lookup-backed fields accept any scalar
fn option_schema(options: &[FieldOption]) -> Value {
    if options.is_empty() {
        json!({ "type": ["string", "number", "integer"] })
    } else {
        let values: Vec<Value> = options.iter().map(|o| o.value.clone()).collect();
        json!({ "enum": values })
    }
}

fn allow_null(property: &mut Value) {
    let Value::Object(map) = property else {
        return;
    };
    if let Some(Value::Array(values)) = map.get_mut("enum") {
        values.push(Value::Null);
        return;
    }
    match map.get_mut("type") {
        Some(Value::String(t)) => {
            let single = std::mem::take(t);
            map.insert("type".to_string(), json!([single, "null"]));
        }
        Some(Value::Array(types)) => types.push(json!("null")),
        _ => {}
    }
}

/// Validate dynamic values against the schema field tree
pub fn validate_dynamic_data(
    fields: &[FieldDefinition],
    data: &DynamicData,
    strict: bool,
) -> Result<(), EntityError> {
    let schema = to_json_schema(fields, strict);
    validate_against_schema(&Value::Object(data.clone()), &schema)
}

/// Size and schema checks applied to every dynamic payload before it is stored
pub fn check_dynamic_payload(
    fields: &[FieldDefinition],
    data: &DynamicData,
    strict: bool,
    max_bytes: usize,
) -> Result<(), EntityError> {
    let size = serde_json::to_vec(data)
        .map(|bytes| bytes.len())
        .map_err(|e| EntityError::validation(format!("dynamic data is not serializable: {}", e)))?;
    if size > max_bytes {
        return Err(EntityError::validation(format!(
            "dynamic data is {} bytes, limit is {}",
            size, max_bytes
        )));
    }
    validate_dynamic_data(fields, data, strict)
}

/// Validate a value against a JSON Schema, asserting `format` keywords
pub fn validate_against_schema(data: &Value, schema: &Value) -> Result<(), EntityError> {
    let validator = jsonschema::options()
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| EntityError::Validation {
            message: format!("Invalid JSON Schema: {}", e),
        })?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{}: {}", path, error)
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EntityError::DynamicFieldValidation { errors })
    }
}
