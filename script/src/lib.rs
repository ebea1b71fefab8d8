//! The configuration script language.
//!
//! A script is a list of `let` and `fn` items:
//!
//! ```text
//! # comments run to the end of the line
//! let PREFIX = r"HKEY_CURRENT_USER\Software";
//! let MENU_CONFIG = [
//!     { pid: "/", id: "Software", type: "menu" },
//!     { pid: "/Software", id: PREFIX },
//! ];
//! fn semicolon_to_newline(text) = join(split(text, ";"), "\n");
//! ```
//!
//! Loading a script gives a [`Unit`], whose namespace maps every top-level name to its
//! [`Value`].

mod ast;
mod builtins;
mod error;
mod eval;
mod parser;
mod unit;
mod value;

pub use ast::{BinaryOp, Expr, FnDecl, Item, LetDecl, Script, Span, Spanned};
pub use builtins::Builtin;
pub use error::{format_errors, line_col, EvalError, LoadError, ParseError};
pub use eval::MAX_CALL_DEPTH;
pub use parser::MAX_NESTING;
pub use unit::Unit;
pub use value::{Function, Value};

pub fn parse(source: &str) -> (Option<Script>, Vec<ParseError>) {
    parser::parse(source)
}
