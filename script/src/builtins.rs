//! Functions every unit can call without declaring them.
//!
//! A unit binding with the same name shadows the builtin.

use crate::{
    ast::Span,
    error::{EvalError, TypeSnafu},
    eval::Interpreter,
    value::Value,
};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Split,
    Join,
    Lower,
    Upper,
    Replace,
    Contains,
    Keys,
    Get,
    Map,
    Str,
    Print,
    Env,
}

impl Builtin {
    pub const ALL: &'static [Builtin] = &[
        Builtin::Len,
        Builtin::Split,
        Builtin::Join,
        Builtin::Lower,
        Builtin::Upper,
        Builtin::Replace,
        Builtin::Contains,
        Builtin::Keys,
        Builtin::Get,
        Builtin::Map,
        Builtin::Str,
        Builtin::Print,
        Builtin::Env,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Split => "split",
            Builtin::Join => "join",
            Builtin::Lower => "lower",
            Builtin::Upper => "upper",
            Builtin::Replace => "replace",
            Builtin::Contains => "contains",
            Builtin::Keys => "keys",
            Builtin::Get => "get",
            Builtin::Map => "map",
            Builtin::Str => "str",
            Builtin::Print => "print",
            Builtin::Env => "env",
        }
    }

    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Builtin::Len
            | Builtin::Lower
            | Builtin::Upper
            | Builtin::Keys
            | Builtin::Str
            | Builtin::Env => 1..=1,
            Builtin::Split | Builtin::Join | Builtin::Contains | Builtin::Map => 2..=2,
            Builtin::Replace => 3..=3,
            Builtin::Get => 2..=3,
            Builtin::Print => 0..=usize::MAX,
        }
    }

    pub(crate) fn call(
        self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, EvalError> {
        match self {
            Builtin::Len => match &args[0] {
                Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::List(items) => Ok(Value::Number(items.len() as f64)),
                Value::Map(map) => Ok(Value::Number(map.len() as f64)),
                other => mismatch(self, "a string, list or map", other, span),
            },
            Builtin::Split => {
                let text = string(self, &args[0], &span)?;
                let sep = string(self, &args[1], &span)?;
                if sep.is_empty() {
                    return TypeSnafu {
                        message: "`split` separator must not be empty".to_string(),
                        span,
                    }
                    .fail();
                }
                Ok(Value::List(
                    text.split(sep).map(|part| Value::String(part.to_string())).collect(),
                ))
            },
            Builtin::Join => {
                let Value::List(items) = &args[0] else {
                    return mismatch(self, "a list", &args[0], span);
                };
                let sep = string(self, &args[1], &span)?;
                let parts = items
                    .iter()
                    .map(|item| string(self, item, &span))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::String(parts.join(sep)))
            },
            Builtin::Lower => Ok(Value::String(string(self, &args[0], &span)?.to_lowercase())),
            Builtin::Upper => Ok(Value::String(string(self, &args[0], &span)?.to_uppercase())),
            Builtin::Replace => {
                let text = string(self, &args[0], &span)?;
                let from = string(self, &args[1], &span)?;
                let to = string(self, &args[2], &span)?;
                Ok(Value::String(text.replace(from, to)))
            },
            Builtin::Contains => match (&args[0], &args[1]) {
                (Value::String(s), Value::String(needle)) => {
                    Ok(Value::Bool(s.contains(needle.as_str())))
                },
                (Value::List(items), needle) => Ok(Value::Bool(items.contains(needle))),
                (Value::Map(map), Value::String(key)) => Ok(Value::Bool(map.contains_key(key))),
                (haystack, _) => mismatch(self, "a string, list or map", haystack, span),
            },
            Builtin::Keys => {
                let Value::Map(map) = &args[0] else {
                    return mismatch(self, "a map", &args[0], span);
                };
                Ok(Value::List(map.keys().map(|k| Value::String(k.clone())).collect()))
            },
            Builtin::Get => {
                let Value::Map(map) = &args[0] else {
                    return mismatch(self, "a map", &args[0], span);
                };
                let key = string(self, &args[1], &span)?;
                let fallback = args.get(2).cloned().unwrap_or(Value::Nil);
                Ok(map.get(key).cloned().unwrap_or(fallback))
            },
            Builtin::Map => {
                let Value::List(items) = &args[0] else {
                    return mismatch(self, "a list", &args[0], span);
                };
                let function = &args[1];
                items
                    .iter()
                    .map(|item| interpreter.call_value(function, vec![item.clone()], span.clone()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            },
            Builtin::Str => Ok(Value::String(args[0].to_string())),
            Builtin::Print => {
                let line = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::info!(target: "regedit_script::print", "{line}");
                Ok(Value::Nil)
            },
            Builtin::Env => {
                let name = string(self, &args[0], &span)?;
                Ok(std::env::var(name).map(Value::String).unwrap_or(Value::Nil))
            },
        }
    }
}

fn string<'v>(builtin: Builtin, value: &'v Value, span: &Span) -> Result<&'v str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => mismatch(builtin, "a string", other, span.clone()),
    }
}

fn mismatch<T>(
    builtin: Builtin,
    expected: &str,
    found: &Value,
    span: Span,
) -> Result<T, EvalError> {
    TypeSnafu {
        message: format!(
            "`{}` expects {expected}, got a {}",
            builtin.name(),
            found.type_name()
        ),
        span,
    }
    .fail()
}
