use crate::{
    error::{format_errors, line_col, LoadError, ParseSnafu, ReadSnafu},
    eval::{self, Namespace},
    parser,
    value::Value,
};
use snafu::ResultExt;
use std::{fmt, fs, path::Path, rc::Rc};

/// One loaded script and the namespace its top-level items produced.
///
/// Every load starts from an empty namespace; units never see each other's bindings.
/// Cloning is cheap and shares the namespace.
#[derive(Clone)]
pub struct Unit {
    name: Rc<str>,
    namespace: Rc<Namespace>,
}

impl Unit {
    /// Read and evaluate the script at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = fs::read_to_string(path).context(ReadSnafu { path })?;
        Self::from_source(path.display().to_string(), &source)
    }

    /// Evaluate script text. `name` only shows up in diagnostics.
    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self, LoadError> {
        let name = name.into();
        tracing::debug!(unit = %name, "loading script unit");

        let (script, errors) = parser::parse(source);
        let script = match script {
            Some(script) if errors.is_empty() => script,
            _ => {
                return ParseSnafu {
                    report: format_errors(source, &errors),
                    errors,
                    name,
                }
                .fail()
            },
        };

        let namespace = eval::evaluate(&script).map_err(|source_error| {
            let (line, column) = source_error
                .span()
                .map(|span| line_col(source, span.start))
                .unwrap_or((0, 0));
            LoadError::Eval {
                name: name.clone(),
                line,
                column,
                source: source_error,
            }
        })?;

        Ok(Self {
            name: name.into(),
            namespace,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an exported binding.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.namespace.get(name)
    }

    /// Names of all top-level bindings, sorted.
    pub fn exports(&self) -> Vec<String> {
        self.namespace.names()
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("exports", &self.exports())
            .finish()
    }
}
