use crate::ast::Span;
use ariadne::{Color, Label, Report, ReportKind, Source};
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

pub fn format_errors(source: &str, errors: &[ParseError]) -> String {
    let mut output = Vec::new();

    for error in errors {
        Report::build(ReportKind::Error, (), error.span.start)
            .with_message(&error.message)
            .with_label(Label::new(error.span.clone()).with_color(Color::Red))
            .finish()
            .write(Source::from(source), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

/// 1-based line and column of a span offset. Spans count chars, not bytes.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for c in source.chars().take(offset) {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Failure while evaluating script code.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EvalError {
    #[snafu(display("unknown name `{name}`"))]
    UnknownName { name: String, span: Span },

    #[snafu(display("`{name}` is defined more than once"))]
    DuplicateBinding { name: String, span: Span },

    #[snafu(display("`{name}` expects {expected} argument(s), got {found}"))]
    Arity {
        name: String,
        expected: String,
        found: usize,
        span: Span,
    },

    #[snafu(display("{message}"))]
    Type { message: String, span: Span },

    #[snafu(display("a {found} value is not callable"))]
    NotCallable { found: &'static str, span: Span },

    #[snafu(display("map has no key `{key}`"))]
    MissingKey { key: String, span: Span },

    #[snafu(display("call depth exceeded the limit of {limit}"))]
    RecursionLimit { limit: usize, span: Span },

    #[snafu(display("function `{name}` outlived the unit that defined it"))]
    UnitDropped { name: String },
}

impl EvalError {
    pub fn span(&self) -> Option<Span> {
        match self {
            EvalError::UnknownName { span, .. }
            | EvalError::DuplicateBinding { span, .. }
            | EvalError::Arity { span, .. }
            | EvalError::Type { span, .. }
            | EvalError::NotCallable { span, .. }
            | EvalError::MissingKey { span, .. }
            | EvalError::RecursionLimit { span, .. } => Some(span.clone()),
            EvalError::UnitDropped { .. } => None,
        }
    }
}

/// Failure while turning a file or source text into a [`crate::Unit`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {name}:\n{report}"))]
    Parse {
        name: String,
        errors: Vec<ParseError>,
        report: String,
    },

    #[snafu(display("failed to evaluate {name} at {line}:{column}: {source}"))]
    Eval {
        name: String,
        line: usize,
        column: usize,
        source: EvalError,
    },
}
