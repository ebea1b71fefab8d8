//! `path::name` references to configuration objects.

use snafu::{ensure, Snafu};
use std::{fmt, str::FromStr};

pub const SEPARATOR: &str = "::";

/// Path prefix naming a unit compiled into the binary instead of a file.
pub const BUILTIN_PREFIX: &str = "builtin:";

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ReferenceError {
    #[snafu(display("expected `<path>::<name>`, found no `::` separator"))]
    MissingSeparator,

    #[snafu(display("expected exactly one `::` separator, found {count}"))]
    MultipleSeparators { count: usize },

    #[snafu(display("script path before `::` is empty"))]
    EmptyPath,

    #[snafu(display("attribute name after `::` is empty"))]
    EmptyName,
}

/// Where a configuration object lives: a script unit and a name bound inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigReference {
    pub path: String,
    pub name: String,
}

impl ConfigReference {
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        // Overlapping, so `a:::b` counts twice.
        let count = reference
            .as_bytes()
            .windows(SEPARATOR.len())
            .filter(|window| *window == SEPARATOR.as_bytes())
            .count();
        ensure!(count > 0, MissingSeparatorSnafu);
        ensure!(count == 1, MultipleSeparatorsSnafu { count });

        let (path, name) = reference
            .split_once(SEPARATOR)
            .ok_or(ReferenceError::MissingSeparator)?;
        let (path, name) = (path.trim(), name.trim());
        ensure!(!path.is_empty(), EmptyPathSnafu);
        ensure!(!name.is_empty(), EmptyNameSnafu);

        Ok(Self {
            path: path.to_string(),
            name: name.to_string(),
        })
    }

    /// The unit name after `builtin:`, if this points at a compiled-in unit.
    pub fn builtin(&self) -> Option<&str> {
        self.path.strip_prefix(BUILTIN_PREFIX)
    }
}

impl FromStr for ConfigReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.path, self.name)
    }
}
