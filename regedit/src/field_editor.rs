//! Field editors created by a script factory function.

use crate::{
    resolver::Resolved,
    shape::{expect_callable, mismatch, CallSnafu, Fields, InvalidSnafu, ShapeError},
};
use regedit_script::{Unit, Value};
use snafu::ResultExt;
use std::collections::BTreeMap;

/// A registry field as handed to the factory. Only a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Registry value type such as `REG_SZ`.
    pub kind: String,
    pub data: String,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            data: data.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Map(BTreeMap::from([
            ("name".to_string(), Value::from(self.name.as_str())),
            ("type".to_string(), Value::from(self.kind.as_str())),
            ("data".to_string(), Value::from(self.data.as_str())),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub family: String,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorKind {
    /// Shows and stores field data unchanged.
    Plain,
    /// Converts data with `set_filter` for display and back with `get_filter` on commit.
    Filtered { get_filter: Value, set_filter: Value },
}

const DESCRIPTOR_KEYS: &[&str] = &[
    "kind",
    "get_filter",
    "set_filter",
    "font",
    "normal_bg",
    "disabled_bg",
];

const FILTER_ARITY: usize = 1;

/// An editor for one field.
#[derive(Debug, Clone)]
pub struct FieldEditor {
    pub kind: EditorKind,
    pub font: Option<Font>,
    pub normal_bg: Option<String>,
    pub disabled_bg: Option<String>,
    unit: Unit,
}

impl FieldEditor {
    fn from_value(value: &Value, unit: Unit) -> Result<Self, ShapeError> {
        let fields = Fields::new(value, "field editor")?;
        fields.deny_unknown(DESCRIPTOR_KEYS)?;

        let get_filter = fields.optional_callable("get_filter", FILTER_ARITY)?;
        let set_filter = fields.optional_callable("set_filter", FILTER_ARITY)?;
        let kind = match fields.required_str("kind")? {
            "plain" if get_filter.is_none() && set_filter.is_none() => EditorKind::Plain,
            "plain" => {
                return InvalidSnafu {
                    context: fields.context(),
                    message: "a plain editor takes no filters",
                }
                .fail()
            },
            "filtered" => match (get_filter, set_filter) {
                (Some(get_filter), Some(set_filter)) => EditorKind::Filtered {
                    get_filter: get_filter.clone(),
                    set_filter: set_filter.clone(),
                },
                _ => {
                    return InvalidSnafu {
                        context: fields.context(),
                        message: "a filtered editor needs both `get_filter` and `set_filter`",
                    }
                    .fail()
                },
            },
            other => {
                return InvalidSnafu {
                    context: fields.context(),
                    message: format!("unknown editor kind `{other}`, expected plain or filtered"),
                }
                .fail()
            },
        };

        let font = match fields.get("font") {
            None => None,
            Some(font) => {
                let font = Fields::new(font, "field editor font")?;
                font.deny_unknown(&["family", "size"])?;
                Some(Font {
                    family: font.required_str("family")?.to_string(),
                    size: font.optional_count("size")?,
                })
            },
        };

        Ok(Self {
            kind,
            font,
            normal_bg: fields.optional_str("normal_bg")?.map(str::to_string),
            disabled_bg: fields.optional_str("disabled_bg")?.map(str::to_string),
            unit,
        })
    }

    /// Editor text for stored field data.
    pub fn display(&self, data: &str) -> Result<String, ShapeError> {
        match &self.kind {
            EditorKind::Plain => Ok(data.to_string()),
            EditorKind::Filtered { set_filter, .. } => self.filter(set_filter, "set_filter", data),
        }
    }

    /// Field data for edited text.
    pub fn commit(&self, text: &str) -> Result<String, ShapeError> {
        match &self.kind {
            EditorKind::Plain => Ok(text.to_string()),
            EditorKind::Filtered { get_filter, .. } => self.filter(get_filter, "get_filter", text),
        }
    }

    fn filter(&self, filter: &Value, name: &str, text: &str) -> Result<String, ShapeError> {
        let context = format!("field editor `{name}` from {}", self.unit.name());
        match filter.call(vec![Value::from(text)]) {
            Ok(Value::String(s)) => Ok(s),
            Ok(other) => mismatch(context, "a string", &other),
            Err(source) => Err(source).context(CallSnafu { context }),
        }
    }
}

/// A resolved factory function that creates an editor per field.
#[derive(Debug, Clone)]
pub struct FieldEditorFactory {
    unit: Unit,
    function: Value,
}

impl FieldEditorFactory {
    pub const ARITY: usize = 1;

    pub fn from_resolved(resolved: Resolved) -> Result<Self, ShapeError> {
        expect_callable(&resolved.value, Self::ARITY, "field editor factory")?;
        Ok(Self {
            unit: resolved.unit,
            function: resolved.value,
        })
    }

    pub fn create(&self, field: &Field) -> Result<FieldEditor, ShapeError> {
        tracing::debug!(field = %field.name, kind = %field.kind, "creating field editor");
        let descriptor = self
            .function
            .call(vec![field.to_value()])
            .context(CallSnafu {
                context: "field editor factory",
            })?;
        FieldEditor::from_value(&descriptor, self.unit.clone())
    }
}
