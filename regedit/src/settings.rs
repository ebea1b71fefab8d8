//! App settings loaded from `config.toml`.
//!
//! Each key holds a `path::name` reference that replaces a built-in configuration object.
//! Priority for every object: command line flag > settings file > built-in default.

use crate::resolver::ConfigKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "aoikregistryeditor";
pub const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Menu configuration reference, like `--menu-conf`.
    pub menu_conf: Option<String>,

    /// UI configurator reference, like `--ui-conf`.
    pub ui_conf: Option<String>,

    /// Field editor factory reference, like `--field-editor`.
    pub field_editor: Option<String>,
}

impl Settings {
    /// Read and deserialize a TOML settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Load settings with priority: CLI override > discovered path > empty settings.
    ///
    /// A discovered path that does not exist yields empty settings.
    pub fn load_with_overrides(
        cli_override: Option<&Path>,
        discovered_path: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = cli_override {
            return Self::load(path);
        }
        match discovered_path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config_dir>/aoikregistryeditor/config.toml`, if the platform has a config dir.
    pub fn discover() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    pub fn reference(&self, kind: ConfigKind) -> Option<&str> {
        match kind {
            ConfigKind::Menu => self.menu_conf.as_deref(),
            ConfigKind::Ui => self.ui_conf.as_deref(),
            ConfigKind::FieldEditor => self.field_editor.as_deref(),
        }
    }
}
