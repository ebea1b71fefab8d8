//! Resolve `path::name` references to values bound in script units.

use crate::{
    reference::{ConfigReference, ReferenceError},
    shape::ShapeError,
};
use regedit_script::{LoadError, Unit, Value};
use snafu::{OptionExt, ResultExt, Snafu};
use std::{fmt, path::Path};

/// The three pluggable configuration objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Menu,
    Ui,
    FieldEditor,
}

impl ConfigKind {
    pub const ALL: [ConfigKind; 3] = [ConfigKind::Menu, ConfigKind::Ui, ConfigKind::FieldEditor];

    /// Name used after `builtin:` in references.
    pub fn unit_name(self) -> &'static str {
        match self {
            ConfigKind::Menu => "menu",
            ConfigKind::Ui => "ui",
            ConfigKind::FieldEditor => "field_editor",
        }
    }

    pub fn from_unit_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.unit_name() == name)
    }

    /// Attribute the built-in unit exports for this kind.
    pub fn default_name(self) -> &'static str {
        match self {
            ConfigKind::Menu => "MENU_CONFIG",
            ConfigKind::Ui => "configure_ui",
            ConfigKind::FieldEditor => "field_editor_factory",
        }
    }

    pub fn default_source(self) -> &'static str {
        match self {
            ConfigKind::Menu => include_str!("../defaults/menu.conf"),
            ConfigKind::Ui => include_str!("../defaults/ui.conf"),
            ConfigKind::FieldEditor => include_str!("../defaults/field_editor.conf"),
        }
    }

    pub fn default_reference(self) -> ConfigReference {
        ConfigReference {
            path: format!("{}{}", crate::reference::BUILTIN_PREFIX, self.unit_name()),
            name: self.default_name().to_string(),
        }
    }

    /// Command line flag that overrides this object.
    pub fn flag(self) -> &'static str {
        match self {
            ConfigKind::Menu => "--menu-conf",
            ConfigKind::Ui => "--ui-conf",
            ConfigKind::FieldEditor => "--field-editor",
        }
    }

    /// Command line flag that prints the built-in source.
    pub fn dump_flag(self) -> &'static str {
        match self {
            ConfigKind::Menu => "--menu-conf-default",
            ConfigKind::Ui => "--ui-conf-default",
            ConfigKind::FieldEditor => "--field-editor-default",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

/// Built-in default source text for `kind`, verbatim.
pub fn dump_default(kind: ConfigKind) -> &'static str {
    kind.default_source()
}

/// Failure categories reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedReference,
    ScriptLoad,
    AttributeNotFound,
    ConfigurationShape,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::MalformedReference => "MalformedReferenceError",
            ErrorKind::ScriptLoad => "ScriptLoadError",
            ErrorKind::AttributeNotFound => "AttributeNotFoundError",
            ErrorKind::ConfigurationShape => "ConfigurationShapeError",
        })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ResolveError {
    #[snafu(display("{source}"))]
    MalformedReference { source: ReferenceError },

    #[snafu(display("{source}"))]
    ScriptLoad { source: LoadError },

    #[snafu(display(
        "unknown builtin unit `{name}`, expected one of: menu, ui, field_editor"
    ))]
    UnknownBuiltin { name: String },

    #[snafu(display("`{name}` is not defined in {unit}, {}", describe_exports(exports)))]
    AttributeNotFound {
        name: String,
        unit: String,
        exports: Vec<String>,
    },

    #[snafu(display("{source}"))]
    ConfigurationShape { source: ShapeError },
}

fn describe_exports(exports: &[String]) -> String {
    if exports.is_empty() {
        "which defines nothing".to_string()
    } else {
        format!("which defines: {}", exports.join(", "))
    }
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::MalformedReference { .. } => ErrorKind::MalformedReference,
            ResolveError::ScriptLoad { .. } | ResolveError::UnknownBuiltin { .. } => {
                ErrorKind::ScriptLoad
            },
            ResolveError::AttributeNotFound { .. } => ErrorKind::AttributeNotFound,
            ResolveError::ConfigurationShape { source } if source.is_call() => {
                ErrorKind::ScriptLoad
            },
            ResolveError::ConfigurationShape { .. } => ErrorKind::ConfigurationShape,
        }
    }
}

/// A resolved value along with the unit that defined it.
///
/// Functions in `value` can only be called while `unit` is alive.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub reference: ConfigReference,
    pub unit: Unit,
    pub value: Value,
}

/// Parse and resolve a reference string.
pub fn resolve(reference: &str) -> Result<Resolved, ResolveError> {
    let reference = ConfigReference::parse(reference).context(MalformedReferenceSnafu)?;
    resolve_reference(reference)
}

/// Load the unit `reference` points at and look up its attribute.
pub fn resolve_reference(reference: ConfigReference) -> Result<Resolved, ResolveError> {
    tracing::info!(%reference, "resolving configuration reference");

    let unit = load_unit(&reference)?;
    let value = unit.get(&reference.name).with_context(|| AttributeNotFoundSnafu {
        name: reference.name.clone(),
        unit: unit.name(),
        exports: unit.exports(),
    })?;

    tracing::debug!(%reference, kind = value.type_name(), "resolved");
    Ok(Resolved {
        reference,
        unit,
        value,
    })
}

fn load_unit(reference: &ConfigReference) -> Result<Unit, ResolveError> {
    match reference.builtin() {
        Some(name) => {
            let kind = ConfigKind::from_unit_name(name).context(UnknownBuiltinSnafu { name })?;
            tracing::debug!(unit = name, "loading builtin unit");
            Unit::from_source(&reference.path, kind.default_source()).context(ScriptLoadSnafu)
        },
        None => {
            tracing::debug!(path = %reference.path, "loading unit from file");
            Unit::load(Path::new(&reference.path)).context(ScriptLoadSnafu)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn builtin_defaults_resolve() {
        for kind in ConfigKind::ALL {
            let resolved = resolve_reference(kind.default_reference()).unwrap();
            assert_eq!(resolved.reference.name, kind.default_name());
            assert_eq!(
                resolved.unit.get(kind.default_name()),
                Some(resolved.value.clone())
            );
        }
    }

    #[test]
    fn default_references() {
        assert_eq!(
            ConfigKind::Menu.default_reference().to_string(),
            "builtin:menu::MENU_CONFIG"
        );
        assert_eq!(
            ConfigKind::Ui.default_reference().to_string(),
            "builtin:ui::configure_ui"
        );
        assert_eq!(
            ConfigKind::FieldEditor.default_reference().to_string(),
            "builtin:field_editor::field_editor_factory"
        );
    }

    #[test]
    fn returns_the_bound_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("menu.conf");
        fs::write(&path, r#"let MENU_CONFIG = [{ pid: "/", id: "Hive", type: "menu" }];"#)
            .unwrap();

        let resolved = resolve(&format!("{}::MENU_CONFIG", path.display())).unwrap();
        let entries = resolved.value.as_list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].as_map().unwrap()["id"],
            Value::from("Hive")
        );
    }

    #[test]
    fn malformed_references() {
        for input in ["menu.conf", "::MENU_CONFIG", "menu.conf::", "a::b::c"] {
            let err = resolve(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedReference, "{input}");
        }
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let reference = format!("{}::MENU_CONFIG", dir.path().join("missing.conf").display());
        let err = resolve(&reference).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptLoad);
        assert_eq!(err.kind().to_string(), "ScriptLoadError");
    }

    #[test]
    fn evaluation_failure_is_a_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.conf");
        fs::write(&path, "let X = nope;").unwrap();
        let err = resolve(&format!("{}::X", path.display())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptLoad);
        assert!(err.to_string().contains("unknown name `nope`"));
    }

    #[test]
    fn unknown_builtin() {
        let err = resolve("builtin:toolbar::TOOLBAR").unwrap_err();
        assert!(matches!(err, ResolveError::UnknownBuiltin { ref name } if name == "toolbar"));
        assert_eq!(err.kind(), ErrorKind::ScriptLoad);
    }

    #[test]
    fn missing_attribute_lists_exports() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ui.conf");
        fs::write(&path, "let A = 1; fn b(x) = x;").unwrap();

        let err = resolve(&format!("{}::configure_ui", path.display())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeNotFound);
        let message = err.to_string();
        assert!(message.contains("`configure_ui`"), "{message}");
        assert!(message.contains("which defines: A, b"), "{message}");
    }

    #[test]
    fn empty_unit_defines_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.conf");
        fs::write(&path, "# nothing here\n").unwrap();
        let err = resolve(&format!("{}::X", path.display())).unwrap_err();
        assert!(err.to_string().ends_with("which defines nothing"));
    }

    #[test]
    fn dumps_are_verbatim() {
        for kind in ConfigKind::ALL {
            let text = dump_default(kind);
            assert!(text.contains(kind.default_name()));
            assert!(regedit_script::parse(text).1.is_empty());
        }
    }

    #[test]
    fn each_resolution_loads_a_fresh_unit() {
        let first = resolve("builtin:menu::MENU_CONFIG").unwrap();
        let second = resolve("builtin:menu::MENU_CONFIG").unwrap();
        assert_eq!(first.value, second.value);
        drop(first);
        assert!(second.unit.get("MENU_CONFIG").is_some());
    }
}
