use crate::{
    ast::FnDecl,
    builtins::Builtin,
    error::{EvalError, UnitDroppedSnafu},
    eval::{Interpreter, Namespace},
};
use std::{
    collections::BTreeMap,
    fmt,
    rc::{Rc, Weak},
};

/// A runtime value produced by a script.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Function(Function),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    /// Whether calling this value with `count` arguments passes the arity check.
    pub fn accepts_args(&self, count: usize) -> bool {
        match self {
            Value::Function(function) => function.decl.params.len() == count,
            Value::Builtin(builtin) => builtin.arity().contains(&count),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Call a function value from host code.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, EvalError> {
        Interpreter::new().call_value(self, args, 0..0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            },
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            },
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            },
            Value::Function(function) => write!(f, "<fn {}>", function.name()),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}

/// A function declared in a unit.
///
/// Holds only a weak link back to the unit's namespace, so a unit and the functions it
/// exports do not keep each other alive. Whoever calls the function must keep the
/// [`crate::Unit`] around.
#[derive(Clone)]
pub struct Function {
    pub(crate) decl: Rc<FnDecl>,
    pub(crate) namespace: Weak<Namespace>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.decl.name.node
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    pub(crate) fn namespace(&self) -> Result<Rc<Namespace>, EvalError> {
        self.namespace.upgrade().ok_or_else(|| {
            UnitDroppedSnafu {
                name: self.name().to_string(),
            }
            .build()
        })
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.decl, &other.decl) && Weak::ptr_eq(&self.namespace, &other.namespace)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish()
    }
}
