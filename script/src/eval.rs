use crate::{
    ast::{BinaryOp, Expr, Item, Script, Span, Spanned},
    builtins::Builtin,
    error::{
        AritySnafu, DuplicateBindingSnafu, EvalError, MissingKeySnafu, NotCallableSnafu,
        RecursionLimitSnafu, TypeSnafu, UnknownNameSnafu,
    },
    value::{Function, Value},
};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use std::{cell::RefCell, rc::Rc};

/// Deepest nesting of script function calls before evaluation gives up.
pub const MAX_CALL_DEPTH: usize = 128;

/// Top-level bindings of one unit.
///
/// Filled once while the unit loads and read-only afterwards.
#[derive(Debug, Default)]
pub(crate) struct Namespace {
    values: RefCell<FxHashMap<SmolStr, Value>>,
}

impl Namespace {
    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.values.borrow().get(name).cloned()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.borrow().keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    fn define(&self, name: SmolStr, value: Value) {
        self.values.borrow_mut().insert(name, value);
    }
}

/// Evaluate a parsed script into a fresh namespace.
///
/// Functions are hoisted. `let` items run in source order, so a function called
/// during loading only sees the bindings defined above the call site.
pub(crate) fn evaluate(script: &Script) -> Result<Rc<Namespace>, EvalError> {
    let mut seen = FxHashSet::default();
    for item in &script.items {
        let name = item.node.name();
        if !seen.insert(name.node.clone()) {
            return DuplicateBindingSnafu {
                name: name.node.to_string(),
                span: name.span.clone(),
            }
            .fail();
        }
    }

    let namespace = Rc::new(Namespace::default());

    for item in &script.items {
        if let Item::Fn(decl) = &item.node {
            let function = Function {
                decl: Rc::new(decl.clone()),
                namespace: Rc::downgrade(&namespace),
            };
            namespace.define(decl.name.node.clone(), Value::Function(function));
        }
    }

    let mut interpreter = Interpreter::new();
    for item in &script.items {
        if let Item::Let(decl) = &item.node {
            let env = Env {
                namespace: &namespace,
                locals: None,
            };
            let value = interpreter.eval(&decl.value, &env)?;
            tracing::trace!(name = %decl.name.node, "bound");
            namespace.define(decl.name.node.clone(), value);
        }
    }

    Ok(namespace)
}

struct Env<'a> {
    namespace: &'a Namespace,
    locals: Option<&'a FxHashMap<SmolStr, Value>>,
}

impl Env<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.locals.and_then(|locals| locals.get(name)) {
            return Some(value.clone());
        }
        self.namespace
            .get(name)
            .or_else(|| Builtin::lookup(name).map(Value::Builtin))
    }
}

pub(crate) struct Interpreter {
    depth: usize,
}

impl Interpreter {
    pub(crate) fn new() -> Self {
        Self { depth: 0 }
    }

    fn eval(&mut self, expr: &Spanned<Expr>, env: &Env<'_>) -> Result<Value, EvalError> {
        match &expr.node {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item, env))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = std::collections::BTreeMap::new();
                for (key, value) in entries {
                    let value = self.eval(value, env)?;
                    map.insert(key.node.clone(), value);
                }
                Ok(Value::Map(map))
            },
            Expr::Var(name) => env.lookup(name).ok_or_else(|| {
                UnknownNameSnafu {
                    name: name.to_string(),
                    span: expr.span.clone(),
                }
                .build()
            }),
            Expr::Call { callee, args } => {
                let callee = self.eval(callee, env)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_value(&callee, args, expr.span.clone())
            },
            Expr::Field { target, name } => match self.eval(target, env)? {
                Value::Map(mut map) => map.remove(name.node.as_str()).ok_or_else(|| {
                    MissingKeySnafu {
                        key: name.node.to_string(),
                        span: name.span.clone(),
                    }
                    .build()
                }),
                other => TypeSnafu {
                    message: format!(
                        "cannot read field `{}` of a {}",
                        name.node,
                        other.type_name()
                    ),
                    span: expr.span.clone(),
                }
                .fail(),
            },
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner, env)?.is_truthy())),
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    if !self.eval(left, env)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval(right, env)?.is_truthy()))
                },
                BinaryOp::Or => {
                    if self.eval(left, env)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval(right, env)?.is_truthy()))
                },
                BinaryOp::Eq => Ok(Value::Bool(self.eval(left, env)? == self.eval(right, env)?)),
                BinaryOp::Ne => Ok(Value::Bool(self.eval(left, env)? != self.eval(right, env)?)),
                BinaryOp::Add => {
                    let left = self.eval(left, env)?;
                    let right = self.eval(right, env)?;
                    add(left, right, expr.span.clone())
                },
            },
            Expr::If {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.eval(then_expr, env)
                } else {
                    self.eval(else_expr, env)
                }
            },
        }
    }

    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, EvalError> {
        match callee {
            Value::Function(function) => {
                if args.len() != function.arity() {
                    return AritySnafu {
                        name: function.name().to_string(),
                        expected: function.arity().to_string(),
                        found: args.len(),
                        span,
                    }
                    .fail();
                }
                if self.depth >= MAX_CALL_DEPTH {
                    return RecursionLimitSnafu {
                        limit: MAX_CALL_DEPTH,
                        span,
                    }
                    .fail();
                }

                let namespace = function.namespace()?;
                let locals: FxHashMap<SmolStr, Value> = function
                    .decl
                    .params
                    .iter()
                    .map(|param| param.node.clone())
                    .zip(args)
                    .collect();
                let env = Env {
                    namespace: &namespace,
                    locals: Some(&locals),
                };

                self.depth += 1;
                let result = self.eval(&function.decl.body, &env);
                self.depth -= 1;
                result
            },
            Value::Builtin(builtin) => {
                let arity = builtin.arity();
                if !arity.contains(&args.len()) {
                    let expected = match (*arity.start(), *arity.end()) {
                        (start, end) if start == end => start.to_string(),
                        (start, usize::MAX) => format!("at least {start}"),
                        (start, end) => format!("{start} to {end}"),
                    };
                    return AritySnafu {
                        name: builtin.name().to_string(),
                        expected,
                        found: args.len(),
                        span,
                    }
                    .fail();
                }
                builtin.call(self, args, span)
            },
            other => NotCallableSnafu {
                found: other.type_name(),
                span,
            }
            .fail(),
        }
    }
}

fn add(left: Value, right: Value, span: Span) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        },
        (Value::Map(mut a), Value::Map(b)) => {
            a.extend(b);
            Ok(Value::Map(a))
        },
        (left, right) => TypeSnafu {
            message: format!("cannot add {} and {}", left.type_name(), right.type_name()),
            span,
        }
        .fail(),
    }
}
