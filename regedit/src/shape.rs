//! Shape checks shared by the consumers of resolved configuration objects.

use crate::menu::MenuError;
use regedit_script::{EvalError, Value};
use snafu::Snafu;
use std::collections::BTreeMap;

/// A resolved value does not have the shape its consumer expects.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ShapeError {
    #[snafu(display("{context}: expected {expected}, found a {found}"))]
    Mismatch {
        context: String,
        expected: String,
        found: &'static str,
    },

    #[snafu(display("{context}: missing required key `{key}`"))]
    MissingKey { context: String, key: String },

    #[snafu(display("{context}: unknown key `{key}`"))]
    UnknownKey { context: String, key: String },

    #[snafu(display("{context}: {message}"))]
    Invalid { context: String, message: String },

    #[snafu(display("{context}: {source}"))]
    Menu { context: String, source: MenuError },

    /// Script code inside a callable failed while the consumer ran it.
    #[snafu(display("{context}: {source}"))]
    Call { context: String, source: EvalError },
}

impl ShapeError {
    /// Whether the failure came from running script code rather than from its result.
    pub fn is_call(&self) -> bool {
        matches!(self, ShapeError::Call { .. })
    }
}

pub(crate) fn mismatch<T>(
    context: impl Into<String>,
    expected: impl Into<String>,
    found: &Value,
) -> Result<T, ShapeError> {
    MismatchSnafu {
        context,
        expected,
        found: found.type_name(),
    }
    .fail()
}

/// Check that `value` is callable with exactly `arity` arguments.
pub(crate) fn expect_callable(
    value: &Value,
    arity: usize,
    context: &str,
) -> Result<(), ShapeError> {
    if !value.is_callable() {
        return mismatch(context, format!("a function of {arity} argument(s)"), value);
    }
    if !value.accepts_args(arity) {
        return InvalidSnafu {
            context,
            message: format!("function must take exactly {arity} argument(s)"),
        }
        .fail();
    }
    Ok(())
}

/// Typed access to the keys of a map value. `nil` counts as absent.
pub(crate) struct Fields<'a> {
    context: String,
    map: &'a BTreeMap<String, Value>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(value: &'a Value, context: impl Into<String>) -> Result<Self, ShapeError> {
        let context = context.into();
        match value {
            Value::Map(map) => Ok(Self { context, map }),
            other => mismatch(context, "a map", other),
        }
    }

    pub(crate) fn context(&self) -> &str {
        &self.context
    }

    pub(crate) fn deny_unknown(&self, allowed: &[&str]) -> Result<(), ShapeError> {
        match self.map.keys().find(|key| !allowed.contains(&key.as_str())) {
            Some(key) => UnknownKeySnafu {
                context: self.context.clone(),
                key: key.clone(),
            }
            .fail(),
            None => Ok(()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !matches!(value, Value::Nil))
    }

    fn key_context(&self, key: &str) -> String {
        format!("{} key `{key}`", self.context)
    }

    pub(crate) fn required(&self, key: &str) -> Result<&'a Value, ShapeError> {
        self.get(key).ok_or_else(|| {
            MissingKeySnafu {
                context: self.context.clone(),
                key,
            }
            .build()
        })
    }

    pub(crate) fn required_str(&self, key: &str) -> Result<&'a str, ShapeError> {
        let value = self.required(key)?;
        value
            .as_str()
            .map_or_else(|| mismatch(self.key_context(key), "a string", value), Ok)
    }

    pub(crate) fn optional_str(&self, key: &str) -> Result<Option<&'a str>, ShapeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => mismatch(self.key_context(key), "a string", other),
        }
    }

    pub(crate) fn optional_bool(&self, key: &str) -> Result<Option<bool>, ShapeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => mismatch(self.key_context(key), "a bool", other),
        }
    }

    pub(crate) fn optional_number(&self, key: &str) -> Result<Option<f64>, ShapeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) => mismatch(self.key_context(key), "a number", other),
        }
    }

    /// A number that must be a non-negative integer, such as a size or an index.
    pub(crate) fn optional_count(&self, key: &str) -> Result<Option<u32>, ShapeError> {
        match self.optional_number(key)? {
            None => Ok(None),
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => {
                Ok(Some(n as u32))
            },
            Some(n) => InvalidSnafu {
                context: self.key_context(key),
                message: format!("expected a non-negative whole number, found {n}"),
            }
            .fail(),
        }
    }

    pub(crate) fn optional_callable(
        &self,
        key: &str,
        arity: usize,
    ) -> Result<Option<&'a Value>, ShapeError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => {
                expect_callable(value, arity, &self.key_context(key))?;
                Ok(Some(value))
            },
        }
    }
}
