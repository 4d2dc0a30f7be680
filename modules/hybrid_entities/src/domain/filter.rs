//! Filter builder for hybrid entity lists
//!
//! Filterable fields come from the entity's static columns plus the schema's
//! dynamic fields. Clauses form a flat chain: each clause after the first is
//! joined to the running result by AND or OR, evaluated left to right.

use crate::contract::{DynamicData, EntityError, FieldDefinition, FieldKind, FieldOption};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// Inferred value type of a filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterValueType {
    Text,
    Number,
    Date,
    Select,
    MultiSelect,
    Boolean,
}

/// Comparison operator of a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Contains,
    Eq,
    Neq,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    In,
    NotIn,
}

impl FilterValueType {
    /// Operators legal for the value type
    pub fn operators(self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            Self::Text => &[Contains, Eq, Neq, StartsWith, EndsWith, IsNull, IsNotNull],
            Self::Number => &[Eq, Neq, Gt, Gte, Lt, Lte, Between, IsNull],
            Self::Date => &[Eq, Between, Gte, Lte],
            Self::Select => &[Eq, Neq, In, IsNull, IsNotNull],
            Self::MultiSelect => &[In, NotIn],
            Self::Boolean => &[Eq],
        }
    }

    fn from_kind(kind: &FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Text | FieldKind::Textarea | FieldKind::Address => Some(Self::Text),
            FieldKind::Number => Some(Self::Number),
            FieldKind::Date => Some(Self::Date),
            FieldKind::Select { .. } => Some(Self::Select),
            FieldKind::MultiSelect { .. } => Some(Self::MultiSelect),
            FieldKind::Checkbox => Some(Self::Boolean),
            FieldKind::Fieldset { .. } | FieldKind::Repeater { .. } => None,
        }
    }
}

impl FilterOperator {
    fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

/// Where a filterable field lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldOrigin {
    /// Static column of the hybrid entity
    Static,
    /// Key of the linked dynamic record
    Dynamic,
}

/// Static column exposed to filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticFieldConfig {
    /// Key in the serialized static fields
    pub key: &'static str,
    pub label: &'static str,
    pub value_type: FilterValueType,
}

/// Field offered by the filter builder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    /// Dotted key; fieldset children are `parent.child`
    pub key: String,
    pub label: String,
    pub origin: FieldOrigin,
    pub value_type: FilterValueType,
    pub operators: Vec<FilterOperator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

/// Derive the filterable fields of an entity type
///
/// Repeaters are not filterable; fieldsets are flattened.
pub fn derive_filter_fields(
    static_fields: &[StaticFieldConfig],
    schema_fields: &[FieldDefinition],
) -> Vec<FilterField> {
    let mut out: Vec<FilterField> = static_fields
        .iter()
        .map(|config| FilterField {
            key: config.key.to_string(),
            label: config.label.to_string(),
            origin: FieldOrigin::Static,
            value_type: config.value_type,
            operators: config.value_type.operators().to_vec(),
            options: Vec::new(),
        })
        .collect();
    collect_dynamic(schema_fields, "", "", &mut out);
    out
}

fn collect_dynamic(fields: &[FieldDefinition], key_prefix: &str, label_prefix: &str, out: &mut Vec<FilterField>) {
    for field in fields {
        let key = format!("{}{}", key_prefix, field.name);
        let label = format!("{}{}", label_prefix, field.label);
        if let FieldKind::Fieldset { fields: children } = &field.kind {
            collect_dynamic(children, &format!("{}.", key), &format!("{} / ", label), out);
            continue;
        }
        let Some(value_type) = FilterValueType::from_kind(&field.kind) else {
            continue;
        };
        let options = match &field.kind {
            FieldKind::Select { options, .. } | FieldKind::MultiSelect { options, .. } => {
                options.clone()
            }
            _ => Vec::new(),
        };
        out.push(FilterField {
            key,
            label,
            origin: FieldOrigin::Dynamic,
            value_type,
            operators: value_type.operators().to_vec(),
            options,
        });
    }
}

/// Logical connector to the previous clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
}

/// One filter clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Option<Value>,
    /// Upper bound of `between`
    #[serde(default)]
    pub value_to: Option<Value>,
    /// Ignored on the first clause; defaults to AND elsewhere
    #[serde(default)]
    pub connector: Option<Connector>,
}

/// Errors raised while building a filter chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("field '{0}' is not filterable")]
    UnknownField(String),
    #[error("operator {operator:?} is not allowed on field '{field}'")]
    IllegalOperator {
        field: String,
        operator: FilterOperator,
    },
    #[error("clause on field '{0}' needs a value")]
    MissingValue(String),
    #[error("range clause on field '{0}' needs a second value")]
    MissingRangeEnd(String),
    #[error("clause {0} does not exist")]
    NoSuchClause(usize),
}

impl From<FilterError> for EntityError {
    fn from(error: FilterError) -> Self {
        EntityError::validation(error.to_string())
    }
}

/// Ordered list of active clauses over a known field set
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBuilder {
    fields: Vec<FilterField>,
    clauses: Vec<FilterClause>,
}

impl FilterBuilder {
    pub fn new(fields: Vec<FilterField>) -> Self {
        Self {
            fields,
            clauses: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Append a clause, returning its index
    pub fn add_clause(&mut self, mut clause: FilterClause) -> Result<usize, FilterError> {
        let field = self
            .fields
            .iter()
            .find(|f| f.key == clause.field)
            .ok_or_else(|| FilterError::UnknownField(clause.field.clone()))?;

        if !field.operators.contains(&clause.operator) {
            return Err(FilterError::IllegalOperator {
                field: clause.field,
                operator: clause.operator,
            });
        }
        if clause.operator.takes_value() && clause.value.as_ref().is_none_or(Value::is_null) {
            return Err(FilterError::MissingValue(clause.field));
        }
        if clause.operator == FilterOperator::Between
            && clause.value_to.as_ref().is_none_or(Value::is_null)
        {
            return Err(FilterError::MissingRangeEnd(clause.field));
        }

        clause.connector = if self.clauses.is_empty() {
            None
        } else {
            Some(clause.connector.unwrap_or(Connector::And))
        };
        self.clauses.push(clause);
        Ok(self.clauses.len() - 1)
    }

    /// Change the connector of a clause; the first clause keeps none
    pub fn set_connector(&mut self, index: usize, connector: Connector) -> Result<(), FilterError> {
        let clause = self
            .clauses
            .get_mut(index)
            .ok_or(FilterError::NoSuchClause(index))?;
        if index > 0 {
            clause.connector = Some(connector);
        }
        Ok(())
    }

    /// Remove a clause; a new head clause loses its connector
    pub fn remove_clause(&mut self, index: usize) -> Result<FilterClause, FilterError> {
        if index >= self.clauses.len() {
            return Err(FilterError::NoSuchClause(index));
        }
        let removed = self.clauses.remove(index);
        if let Some(head) = self.clauses.first_mut() {
            head.connector = None;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.clauses.clear();
    }

    /// Freeze the clauses into an evaluable chain
    pub fn build(&self) -> FilterChain {
        let clauses = self
            .clauses
            .iter()
            .filter_map(|clause| {
                self.fields
                    .iter()
                    .find(|f| f.key == clause.field)
                    .map(|f| (clause.clone(), f.origin, f.value_type))
            })
            .collect();
        FilterChain { clauses }
    }
}

/// Evaluable flat clause chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    clauses: Vec<(FilterClause, FieldOrigin, FilterValueType)>,
}

impl FilterChain {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the chain against a record's static and dynamic values
    pub fn matches(&self, static_values: &DynamicData, dynamic_values: &DynamicData) -> bool {
        let mut result: Option<bool> = None;
        for (clause, origin, value_type) in &self.clauses {
            let source = match origin {
                FieldOrigin::Static => static_values,
                FieldOrigin::Dynamic => dynamic_values,
            };
            let hit = evaluate(clause, *value_type, lookup(source, &clause.field));
            result = Some(match (result, clause.connector) {
                (None, _) => hit,
                (Some(acc), Some(Connector::Or)) => acc || hit,
                (Some(acc), _) => acc && hit,
            });
        }
        result.unwrap_or(true)
    }
}

fn lookup<'v>(values: &'v DynamicData, key: &str) -> Option<&'v Value> {
    let mut parts = key.split('.');
    let mut current = values.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

fn evaluate(clause: &FilterClause, value_type: FilterValueType, actual: Option<&Value>) -> bool {
    use FilterOperator::*;

    let expected = clause.value.as_ref().unwrap_or(&Value::Null);
    match clause.operator {
        IsNull => is_blank(actual),
        IsNotNull => !is_blank(actual),
        _ if is_blank(actual) => matches!(clause.operator, Neq | NotIn),
        Eq => actual.is_some_and(|a| loose_eq(a, expected, value_type)),
        Neq => !actual.is_some_and(|a| loose_eq(a, expected, value_type)),
        Contains => text_test(actual, expected, |a, e| a.contains(e)),
        StartsWith => text_test(actual, expected, |a, e| a.starts_with(e)),
        EndsWith => text_test(actual, expected, |a, e| a.ends_with(e)),
        Gt => compare(actual, expected, value_type) == Some(Ordering::Greater),
        Gte => matches!(
            compare(actual, expected, value_type),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Lt => compare(actual, expected, value_type) == Some(Ordering::Less),
        Lte => matches!(
            compare(actual, expected, value_type),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Between => {
            let upper = clause.value_to.as_ref().unwrap_or(&Value::Null);
            matches!(
                compare(actual, expected, value_type),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare(actual, upper, value_type),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
        In => any_in(actual, expected, value_type),
        NotIn => !any_in(actual, expected, value_type),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_lowercase().parse().ok(),
        _ => None,
    }
}

fn loose_eq(actual: &Value, expected: &Value, value_type: FilterValueType) -> bool {
    match value_type {
        FilterValueType::Number => match (as_number(actual), as_number(expected)) {
            (Some(a), Some(e)) => a == e,
            _ => false,
        },
        FilterValueType::Date => match (as_date(actual), as_date(expected)) {
            (Some(a), Some(e)) => a == e,
            _ => false,
        },
        FilterValueType::Boolean => match (as_bool(actual), as_bool(expected)) {
            (Some(a), Some(e)) => a == e,
            _ => false,
        },
        _ => match (as_text(actual), as_text(expected)) {
            (Some(a), Some(e)) => a == e,
            _ => false,
        },
    }
}

fn text_test(actual: Option<&Value>, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.and_then(as_text), as_text(expected)) {
        (Some(a), Some(e)) => test(&a, &e),
        _ => false,
    }
}

fn compare(actual: Option<&Value>, expected: &Value, value_type: FilterValueType) -> Option<Ordering> {
    let actual = actual?;
    match value_type {
        FilterValueType::Date => as_date(actual)?.partial_cmp(&as_date(expected)?),
        _ => as_number(actual)?.partial_cmp(&as_number(expected)?),
    }
}

fn any_in(actual: Option<&Value>, expected: &Value, value_type: FilterValueType) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let candidates: &[Value] = match expected {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    };
    let present: &[Value] = match actual {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    };
    present
        .iter()
        .any(|a| candidates.iter().any(|e| loose_eq(a, e, value_type)))
}
