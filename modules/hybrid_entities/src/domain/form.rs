//! Form tree walker over a schema field tree
//!
//! `FormState` owns a dynamic value map and edits it through field paths.
//! `render` turns the field tree plus the current values into a `FormNode`
//! tree any front end can draw. Select fields backed by a lookup table start
//! in the `Loading` state until `load_options` fetches them.

use crate::contract::{DynamicData, EntityError, FieldDefinition, FieldKind, FieldOption, LayoutHints};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Address of a value inside the form, e.g. `contactos[1].telefono`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Parse the dotted / indexed notation produced by `Display`
    pub fn parse(raw: &str) -> Result<Self, FormError> {
        let invalid = || FormError::InvalidPath(raw.to_string());
        let mut path = Self::root();
        for part in raw.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if name.is_empty() || name.contains(']') {
                return Err(invalid());
            }
            path = path.key(name);
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(invalid)?;
                if !rest.starts_with('[') {
                    return Err(invalid());
                }
                let index: usize = rest[1..close].parse().map_err(|_| invalid())?;
                path = path.index(index);
                rest = &rest[close + 1..];
            }
        }
        Ok(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Errors raised while editing form values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("invalid field path '{0}'")]
    InvalidPath(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("'{0}' is a group and does not hold a single value")]
    NotAValue(String),
    #[error("'{0}' is not a repeater")]
    NotARepeater(String),
    #[error("item {index} does not exist in '{path}'")]
    NoSuchItem { path: String, index: usize },
    #[error("repeater '{path}' already holds the maximum of {max} items")]
    MaxItemsReached { path: String, max: usize },
    #[error("repeater '{path}' cannot hold fewer than {min} items")]
    MinItemsReached { path: String, min: usize },
}

impl From<FormError> for EntityError {
    fn from(error: FormError) -> Self {
        EntityError::validation(error.to_string())
    }
}

/// State of the options of a select field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum OptionsState {
    /// Options declared in the schema
    Static { options: Vec<FieldOption> },
    /// Waiting for the named lookup table
    Loading { source: String },
    /// Fetched from the lookup table; empty when the fetch failed
    Loaded {
        source: String,
        options: Vec<FieldOption>,
    },
}

/// Rendered form element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FormNode {
    Input {
        path: String,
        name: String,
        label: String,
        #[serde(rename = "type")]
        field_type: String,
        required: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        layout: Option<LayoutHints>,
        value: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<OptionsState>,
    },
    Group {
        path: String,
        name: String,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        layout: Option<LayoutHints>,
        children: Vec<FormNode>,
    },
    Repeater {
        path: String,
        name: String,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        layout: Option<LayoutHints>,
        min_items: usize,
        max_items: Option<usize>,
        can_add: bool,
        can_remove: bool,
        items: Vec<Vec<FormNode>>,
    },
}

/// Source of options for lookup-backed select fields
#[async_trait]
pub trait OptionLookup: Send + Sync {
    /// Fetch the options of a named lookup table
    async fn fetch_options(&self, source: &str) -> anyhow::Result<Vec<FieldOption>>;
}

/// Value map being edited against a field tree
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    fields: Vec<FieldDefinition>,
    values: DynamicData,
}

impl FormState {
    /// Wrap existing values; missing groups and repeaters are seeded
    pub fn new(fields: Vec<FieldDefinition>, mut values: DynamicData) -> Self {
        seed(&fields, &mut values);
        Self { fields, values }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn values(&self) -> &DynamicData {
        &self.values
    }

    pub fn into_values(self) -> DynamicData {
        self.values
    }

    /// Set the value of one primitive field
    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError> {
        let display = path.to_string();
        with_target(&self.fields, &mut self.values, path.segments(), &display, |field, parent| {
            if matches!(field.kind, FieldKind::Fieldset { .. } | FieldKind::Repeater { .. }) {
                return Err(FormError::NotAValue(display.clone()));
            }
            parent.insert(field.name.clone(), value);
            Ok(())
        })
    }

    /// Append an item to a repeater, returning the new item count
    pub fn add_item(&mut self, path: &FieldPath) -> Result<usize, FormError> {
        let display = path.to_string();
        with_target(&self.fields, &mut self.values, path.segments(), &display, |field, parent| {
            let FieldKind::Repeater {
                fields, max_items, ..
            } = &field.kind
            else {
                return Err(FormError::NotARepeater(display.clone()));
            };
            let items = array_slot(parent, &field.name)
                .ok_or_else(|| FormError::InvalidPath(display.clone()))?;
            if let Some(max) = max_items {
                if items.len() >= *max {
                    return Err(FormError::MaxItemsReached {
                        path: display.clone(),
                        max: *max,
                    });
                }
            }
            items.push(new_item(fields));
            Ok(items.len())
        })
    }

    /// Remove one repeater item, returning the new item count
    ///
    /// Rejected once the repeater holds `min_items` items.
    pub fn remove_item(&mut self, path: &FieldPath, index: usize) -> Result<usize, FormError> {
        let display = path.to_string();
        with_target(&self.fields, &mut self.values, path.segments(), &display, |field, parent| {
            let FieldKind::Repeater { min_items, .. } = &field.kind else {
                return Err(FormError::NotARepeater(display.clone()));
            };
            let items = array_slot(parent, &field.name)
                .ok_or_else(|| FormError::InvalidPath(display.clone()))?;
            if index >= items.len() {
                return Err(FormError::NoSuchItem {
                    path: display.clone(),
                    index,
                });
            }
            if items.len() <= *min_items {
                return Err(FormError::MinItemsReached {
                    path: display.clone(),
                    min: *min_items,
                });
            }
            items.remove(index);
            Ok(items.len())
        })
    }

    /// Render the field tree with the current values
    pub fn render(&self) -> Vec<FormNode> {
        render_level(&self.fields, &self.values, &FieldPath::root())
    }
}

fn with_target<R, Op>(
    fields: &[FieldDefinition],
    map: &mut DynamicData,
    segments: &[PathSegment],
    display: &str,
    op: Op,
) -> Result<R, FormError>
where
    Op: FnOnce(&FieldDefinition, &mut DynamicData) -> Result<R, FormError>,
{
    let Some((PathSegment::Key(key), rest)) = segments.split_first() else {
        return Err(FormError::InvalidPath(display.to_string()));
    };
    let field = fields
        .iter()
        .find(|f| &f.name == key)
        .ok_or_else(|| FormError::UnknownField(display.to_string()))?;

    if rest.is_empty() {
        return op(field, map);
    }

    match &field.kind {
        FieldKind::Fieldset { fields: children } => {
            let child = object_slot(map, key)
                .ok_or_else(|| FormError::InvalidPath(display.to_string()))?;
            with_target(children, child, rest, display, op)
        }
        FieldKind::Repeater {
            fields: children, ..
        } => {
            let Some((PathSegment::Index(index), rest)) = rest.split_first() else {
                return Err(FormError::InvalidPath(display.to_string()));
            };
            if rest.is_empty() {
                return Err(FormError::InvalidPath(display.to_string()));
            }
            let item = array_slot(map, key)
                .and_then(|items| items.get_mut(*index))
                .ok_or_else(|| FormError::NoSuchItem {
                    path: display.to_string(),
                    index: *index,
                })?;
            if !item.is_object() {
                *item = Value::Object(Map::new());
            }
            let child = item
                .as_object_mut()
                .ok_or_else(|| FormError::InvalidPath(display.to_string()))?;
            with_target(children, child, rest, display, op)
        }
        _ => Err(FormError::InvalidPath(display.to_string())),
    }
}

fn object_slot<'m>(map: &'m mut DynamicData, key: &str) -> Option<&'m mut DynamicData> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

fn array_slot<'m>(map: &'m mut DynamicData, key: &str) -> Option<&'m mut Vec<Value>> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
}

fn new_item(fields: &[FieldDefinition]) -> Value {
    let mut item = Map::new();
    seed(fields, &mut item);
    Value::Object(item)
}

fn seed(fields: &[FieldDefinition], values: &mut DynamicData) {
    for field in fields {
        match &field.kind {
            FieldKind::Fieldset { fields: children } => {
                if let Some(child) = object_slot(values, &field.name) {
                    seed(children, child);
                }
            }
            FieldKind::Repeater {
                fields: children,
                min_items,
                ..
            } => {
                if let Some(items) = array_slot(values, &field.name) {
                    for item in items.iter_mut() {
                        if let Value::Object(child) = item {
                            seed(children, child);
                        }
                    }
                    while items.len() < *min_items {
                        items.push(new_item(children));
                    }
                }
            }
            _ => {}
        }
    }
}

fn render_level(fields: &[FieldDefinition], values: &DynamicData, base: &FieldPath) -> Vec<FormNode> {
    fields
        .iter()
        .map(|field| {
            let path = base.clone().key(field.name.clone());
            let value = values.get(&field.name);
            match &field.kind {
                FieldKind::Fieldset { fields: children } => {
                    let empty = Map::new();
                    let nested = value.and_then(Value::as_object).unwrap_or(&empty);
                    FormNode::Group {
                        path: path.to_string(),
                        name: field.name.clone(),
                        label: field.label.clone(),
                        layout: field.layout.clone(),
                        children: render_level(children, nested, &path),
                    }
                }
                FieldKind::Repeater {
                    fields: children,
                    min_items,
                    max_items,
                } => {
                    let empty = Map::new();
                    let items: Vec<Vec<FormNode>> = value
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .enumerate()
                                .map(|(i, item)| {
                                    let nested = item.as_object().unwrap_or(&empty);
                                    render_level(children, nested, &path.clone().index(i))
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    let count = items.len();
                    FormNode::Repeater {
                        path: path.to_string(),
                        name: field.name.clone(),
                        label: field.label.clone(),
                        layout: field.layout.clone(),
                        min_items: *min_items,
                        max_items: *max_items,
                        can_add: max_items.is_none_or(|max| count < max),
                        can_remove: count > *min_items,
                        items,
                    }
                }
                kind => FormNode::Input {
                    path: path.to_string(),
                    name: field.name.clone(),
                    label: field.label.clone(),
                    field_type: kind.type_name().to_string(),
                    required: field.required,
                    layout: field.layout.clone(),
                    value: value.cloned().unwrap_or(Value::Null),
                    options: options_state(kind),
                },
            }
        })
        .collect()
}

fn options_state(kind: &FieldKind) -> Option<OptionsState> {
    match kind {
        FieldKind::Select {
            options,
            data_source,
        }
        | FieldKind::MultiSelect {
            options,
            data_source,
        } => Some(match data_source {
            Some(source) if !source.is_empty() => OptionsState::Loading {
                source: source.clone(),
            },
            _ => OptionsState::Static {
                options: options.clone(),
            },
        }),
        _ => None,
    }
}

/// Resolve every `Loading` option state by querying the lookup
///
/// Each field triggers its own fetch; a failed fetch leaves the field with
/// no options.
pub async fn load_options(nodes: &mut [FormNode], lookup: &dyn OptionLookup) {
    let mut pending = Vec::new();
    pending_options(nodes, &mut pending);

    for state in pending {
        let OptionsState::Loading { source } = state else {
            continue;
        };
        let source = source.clone();
        let options = match lookup.fetch_options(&source).await {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Lookup fetch failed");
                Vec::new()
            }
        };
        *state = OptionsState::Loaded { source, options };
    }
}

fn pending_options<'a>(nodes: &'a mut [FormNode], out: &mut Vec<&'a mut OptionsState>) {
    for node in nodes {
        match node {
            FormNode::Input {
                options: Some(state @ OptionsState::Loading { .. }),
                ..
            } => out.push(state),
            FormNode::Group { children, .. } => pending_options(children, out),
            FormNode::Repeater { items, .. } => {
                for item in items {
                    pending_options(item, out);
                }
            }
            FormNode::Input { .. } => {}
        }
    }
}
