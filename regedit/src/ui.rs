//! UI configurator: a script function that customizes the editor window.

use crate::{
    menu::{apply_specs, specs_from_value, MenuSpec, MenuTree, TOP_MENU_ID},
    resolver::Resolved,
    shape::{expect_callable, mismatch, CallSnafu, Fields, InvalidSnafu, ShapeError},
};
use regedit_script::{Unit, Value};
use snafu::ResultExt;
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Widget style names a configurator can customize.
pub const WIDGETS: &[&str] = &[
    "TFrame",
    "TLabelframe",
    "TLabelframe.Label",
    "TLabel",
    "TRadiobutton",
    "StatusBar",
];

/// What the configurator gets to see about the editor being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiContext {
    pub title: String,
    pub menus: Vec<String>,
    pub widgets: Vec<String>,
}

impl UiContext {
    pub fn new(title: impl Into<String>, menu_tree: &MenuTree) -> Self {
        Self {
            title: title.into(),
            menus: menu_tree.children(TOP_MENU_ID).to_vec(),
            widgets: WIDGETS.iter().map(|w| w.to_string()).collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Map(BTreeMap::from([
            ("title".to_string(), Value::from(self.title.as_str())),
            ("menus".to_string(), Value::from(self.menus.clone())),
            ("widgets".to_string(), Value::from(self.widgets.clone())),
        ]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Geometry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected geometry as `WIDTHxHEIGHT`, found `{s}`");
        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| invalid())?,
            height: height.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Style name to property name to value.
pub type Styles = BTreeMap<String, BTreeMap<String, String>>;

/// The checked result of a UI configurator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSettings {
    pub title: String,
    pub geometry: Geometry,
    pub background: String,
    pub padding: u32,
    pub status_bar_height: u32,
    pub styles: Styles,
    pub menus: Vec<MenuSpec>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            title: "AoikRegistryEditor".to_string(),
            geometry: Geometry {
                width: 1280,
                height: 720,
            },
            background: "white smoke".to_string(),
            padding: 10,
            status_bar_height: 20,
            styles: Styles::new(),
            menus: Vec::new(),
        }
    }
}

const SETTINGS_KEYS: &[&str] = &[
    "title",
    "geometry",
    "background",
    "padding",
    "status_bar_height",
    "styles",
    "menus",
];

impl UiSettings {
    const CONTEXT: &'static str = "UI config";

    /// Check a configurator's return value. Absent keys keep their defaults.
    pub fn from_value(value: &Value) -> Result<Self, ShapeError> {
        let fields = Fields::new(value, Self::CONTEXT)?;
        fields.deny_unknown(SETTINGS_KEYS)?;

        let mut settings = Self::default();
        if let Some(title) = fields.optional_str("title")? {
            settings.title = title.to_string();
        }
        if let Some(geometry) = fields.optional_str("geometry")? {
            settings.geometry = geometry.parse().map_err(|message| {
                InvalidSnafu {
                    context: format!("{} key `geometry`", Self::CONTEXT),
                    message,
                }
                .build()
            })?;
        }
        if let Some(background) = fields.optional_str("background")? {
            settings.background = background.to_string();
        }
        if let Some(padding) = fields.optional_count("padding")? {
            settings.padding = padding;
        }
        if let Some(height) = fields.optional_count("status_bar_height")? {
            settings.status_bar_height = height;
        }
        if let Some(styles) = fields.get("styles") {
            settings.styles = styles_from_value(styles)?;
        }
        if let Some(menus) = fields.get("menus") {
            settings.menus = specs_from_value(menus, "UI config menus")?;
        }
        Ok(settings)
    }

    /// Add the configurator's menu entries to a tree built from the menu config.
    pub fn apply_menus(&self, menu_tree: &mut MenuTree) -> Result<(), ShapeError> {
        apply_specs(menu_tree, &self.menus, "UI config menus")
    }
}

fn styles_from_value(value: &Value) -> Result<Styles, ShapeError> {
    let Value::Map(styles) = value else {
        return mismatch("UI config key `styles`", "a map of styles", value);
    };

    let mut out = Styles::new();
    for (name, properties) in styles {
        let context = format!("UI style `{name}`");
        let Value::Map(properties) = properties else {
            return mismatch(context, "a map of properties", properties);
        };
        let mut checked = BTreeMap::new();
        for (key, value) in properties {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(_) | Value::Bool(_) => value.to_string(),
                other => return mismatch(format!("{context} property `{key}`"), "a string", other),
            };
            checked.insert(key.clone(), text);
        }
        out.insert(name.clone(), checked);
    }
    Ok(out)
}

/// A resolved UI configuration function.
#[derive(Debug, Clone)]
pub struct UiConfigurator {
    unit: Unit,
    function: Value,
}

impl UiConfigurator {
    pub const ARITY: usize = 1;

    pub fn from_resolved(resolved: Resolved) -> Result<Self, ShapeError> {
        expect_callable(&resolved.value, Self::ARITY, "UI configurator")?;
        Ok(Self {
            unit: resolved.unit,
            function: resolved.value,
        })
    }

    pub fn configure(&self, context: &UiContext) -> Result<UiSettings, ShapeError> {
        tracing::debug!(unit = self.unit.name(), "calling UI configurator");
        let value = self
            .function
            .call(vec![context.to_value()])
            .context(CallSnafu {
                context: "UI configurator",
            })?;
        UiSettings::from_value(&value)
    }
}
