//! Menu configuration and the menu tree built from it.
//!
//! Items are addressed by full IDs built from their parent's ID: `/File` is the
//! `File` menu on the top menu `/`, and `/File/Exit` is a command inside it.

use crate::shape::{mismatch, Fields, InvalidSnafu, MenuSnafu, ShapeError};
use regedit_script::Value;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::collections::HashMap;

pub const TOP_MENU_ID: &str = "/";
pub const ID_SEP: char = '/';

/// Separates a registry key path from the field to select, as in `KEY->FIELD`.
pub const FIELD_POINTER: &str = "->";

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum MenuError {
    #[snafu(display("item ID exists: `{id}`"))]
    DuplicateId { id: String },

    #[snafu(display("item ID does not refer to a menu: `{id}`"))]
    NotAMenu { id: String },

    #[snafu(display("item ID not found: `{id}`"))]
    NotFound { id: String },

    #[snafu(display("item index {index} is not valid, expected 0..={max}"))]
    BadIndex { index: usize, max: usize },

    #[snafu(display("the top menu cannot be removed"))]
    RemoveTop,
}

/// What a command item does when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// Navigate to a registry key, optionally selecting one of its fields.
    OpenKey {
        key_path: String,
        field: Option<String>,
    },
    Exit,
}

impl CommandAction {
    /// Parse a key path that may carry a `->FIELD` suffix.
    pub fn open_key(key: &str) -> Self {
        match key.split_once(FIELD_POINTER) {
            Some((key_path, field)) => CommandAction::OpenKey {
                key_path: key_path.to_string(),
                field: Some(field.to_string()),
            },
            None => CommandAction::OpenKey {
                key_path: key.to_string(),
                field: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItemKind {
    Menu,
    Command(CommandAction),
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub pid: String,
    pub label: Option<String>,
    pub kind: MenuItemKind,
}

/// Arguments for [`MenuTree::insert`].
#[derive(Debug, Clone)]
pub struct NewItem<'a> {
    pub pid: &'a str,
    pub id: &'a str,
    pub id_is_full: bool,
    pub label: Option<&'a str>,
    pub index: Option<usize>,
    pub kind: MenuItemKind,
}

impl<'a> NewItem<'a> {
    pub fn new(pid: &'a str, id: &'a str, kind: MenuItemKind) -> Self {
        Self {
            pid,
            id,
            id_is_full: false,
            label: None,
            index: None,
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MenuTree {
    items: HashMap<String, MenuItem>,
    children: HashMap<String, Vec<String>>,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuTree {
    pub fn new() -> Self {
        let top = MenuItem {
            id: TOP_MENU_ID.to_string(),
            pid: String::new(),
            label: None,
            kind: MenuItemKind::Menu,
        };
        Self {
            items: HashMap::from([(TOP_MENU_ID.to_string(), top)]),
            children: HashMap::from([(TOP_MENU_ID.to_string(), Vec::new())]),
        }
    }

    /// Full ID of a relative `id` under `pid`, e.g. `Exit` under `/File` is `/File/Exit`.
    pub fn full_id(pid: &str, id: &str) -> String {
        if pid == TOP_MENU_ID {
            format!("{TOP_MENU_ID}{id}")
        } else {
            format!("{pid}{ID_SEP}{id}")
        }
    }

    /// Last `/`-separated part of a full ID.
    pub fn default_label(full_id: &str) -> &str {
        full_id
            .rsplit_once(ID_SEP)
            .map_or(full_id, |(_, label)| label)
    }

    /// Add an item under an existing menu, returning its full ID.
    pub fn insert(&mut self, item: NewItem<'_>) -> Result<String, MenuError> {
        ensure!(self.is_menu(item.pid), NotAMenuSnafu { id: item.pid });

        let full_id = if item.id_is_full {
            item.id.to_string()
        } else {
            Self::full_id(item.pid, item.id)
        };
        ensure!(
            !self.items.contains_key(&full_id),
            DuplicateIdSnafu { id: full_id }
        );

        let siblings = self.children.entry(item.pid.to_string()).or_default();
        let index = item.index.unwrap_or(siblings.len());
        ensure!(
            index <= siblings.len(),
            BadIndexSnafu {
                index,
                max: siblings.len()
            }
        );

        let label = match &item.kind {
            MenuItemKind::Menu => Some(item.label.unwrap_or(item.id).to_string()),
            MenuItemKind::Command(_) => Some(
                item.label
                    .unwrap_or_else(|| Self::default_label(&full_id))
                    .to_string(),
            ),
            MenuItemKind::Separator => None,
        };

        siblings.insert(index, full_id.clone());
        if item.kind == MenuItemKind::Menu {
            self.children.insert(full_id.clone(), Vec::new());
        }
        self.items.insert(
            full_id.clone(),
            MenuItem {
                id: full_id.clone(),
                pid: item.pid.to_string(),
                label,
                kind: item.kind,
            },
        );

        tracing::trace!(id = %full_id, index, "menu item added");
        Ok(full_id)
    }

    pub fn add_menu(&mut self, pid: &str, id: &str) -> Result<String, MenuError> {
        self.insert(NewItem::new(pid, id, MenuItemKind::Menu))
    }

    pub fn add_command(
        &mut self,
        pid: &str,
        id: &str,
        action: CommandAction,
    ) -> Result<String, MenuError> {
        self.insert(NewItem::new(pid, id, MenuItemKind::Command(action)))
    }

    pub fn add_separator(&mut self, pid: &str, id: &str) -> Result<String, MenuError> {
        self.insert(NewItem::new(pid, id, MenuItemKind::Separator))
    }

    /// Remove an item. Removing a menu removes everything under it.
    pub fn remove_item(&mut self, id: &str) -> Result<MenuItem, MenuError> {
        ensure!(id != TOP_MENU_ID, RemoveTopSnafu);
        let item = self.items.remove(id).context(NotFoundSnafu { id })?;

        if let Some(siblings) = self.children.get_mut(&item.pid) {
            siblings.retain(|sibling| sibling != id);
        }
        if let Some(children) = self.children.remove(id) {
            for child in children {
                self.remove_descendant(&child);
            }
        }
        Ok(item)
    }

    fn remove_descendant(&mut self, id: &str) {
        self.items.remove(id);
        if let Some(children) = self.children.remove(id) {
            for child in children {
                self.remove_descendant(&child);
            }
        }
    }

    pub fn item(&self, id: &str) -> Option<&MenuItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn is_menu(&self, id: &str) -> bool {
        self.items
            .get(id)
            .is_some_and(|item| item.kind == MenuItemKind::Menu)
    }

    /// Full IDs of a menu's children in display order.
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of items, not counting the top menu.
    pub fn len(&self) -> usize {
        self.items.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indented text rendering of the whole tree, two spaces per level.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(TOP_MENU_ID, 0, &mut out);
        out
    }

    fn write_outline(&self, id: &str, depth: usize, out: &mut String) {
        for child in self.children(id) {
            let Some(item) = self.items.get(child) else {
                continue;
            };
            out.push_str(&"  ".repeat(depth));
            match &item.kind {
                MenuItemKind::Separator => out.push_str("---"),
                _ => out.push_str(item.label.as_deref().unwrap_or_default()),
            }
            out.push('\n');
            if item.kind == MenuItemKind::Menu {
                self.write_outline(child, depth + 1, out);
            }
        }
    }
}

const SPEC_KEYS: &[&str] = &[
    "pid",
    "id",
    "type",
    "id_is_full",
    "label",
    "key",
    "index",
    "action",
];

/// One checked menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSpec {
    pub pid: String,
    pub id: String,
    pub id_is_full: bool,
    pub label: Option<String>,
    pub index: Option<usize>,
    pub kind: MenuItemKind,
}

impl MenuSpec {
    pub fn from_value(value: &Value, context: &str) -> Result<Self, ShapeError> {
        let fields = Fields::new(value, context)?;
        fields.deny_unknown(SPEC_KEYS)?;

        let pid = fields.required_str("pid")?;
        let id = fields.required_str("id")?;
        let label = fields.optional_str("label")?;
        let key = fields.optional_str("key")?;
        let action = fields.optional_str("action")?;
        let invalid = |message: String| {
            InvalidSnafu {
                context: fields.context(),
                message,
            }
            .fail()
        };

        let kind = match fields.optional_str("type")?.unwrap_or("command") {
            "command" => MenuItemKind::Command(match action {
                None => CommandAction::open_key(key.unwrap_or(id)),
                Some("exit") if key.is_none() => CommandAction::Exit,
                Some("exit") => return invalid("`key` and `action` are exclusive".to_string()),
                Some(other) => return invalid(format!("unknown action `{other}`")),
            }),
            kind @ ("menu" | "separator") => {
                if key.is_some() || action.is_some() {
                    return invalid(format!("a {kind} takes no `key` or `action`"));
                }
                if kind == "menu" {
                    MenuItemKind::Menu
                } else {
                    MenuItemKind::Separator
                }
            },
            other => return invalid(format!("unknown item type `{other}`")),
        };

        Ok(Self {
            pid: pid.to_string(),
            id: id.to_string(),
            id_is_full: fields.optional_bool("id_is_full")?.unwrap_or(false),
            label: label.map(str::to_string),
            index: fields.optional_count("index")?.map(|i| i as usize),
            kind,
        })
    }

    pub fn as_new_item(&self) -> NewItem<'_> {
        NewItem {
            pid: &self.pid,
            id: &self.id,
            id_is_full: self.id_is_full,
            label: self.label.as_deref(),
            index: self.index,
            kind: self.kind.clone(),
        }
    }
}

/// Parse a list of menu entry maps.
pub(crate) fn specs_from_value(value: &Value, context: &str) -> Result<Vec<MenuSpec>, ShapeError> {
    let Value::List(entries) = value else {
        return mismatch(context, "a list of menu entries", value);
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| MenuSpec::from_value(entry, &format!("{context} entry {i}")))
        .collect()
}

/// Insert checked entries into `tree` in order.
pub(crate) fn apply_specs(
    tree: &mut MenuTree,
    specs: &[MenuSpec],
    context: &str,
) -> Result<(), ShapeError> {
    for (i, spec) in specs.iter().enumerate() {
        tree.insert(spec.as_new_item()).context(MenuSnafu {
            context: format!("{context} entry {i} (`{}`)", spec.id),
        })?;
    }
    Ok(())
}

/// The resolved menu configuration: entries to build the menu tree from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    pub entries: Vec<MenuSpec>,
}

impl MenuConfig {
    pub fn from_value(value: &Value) -> Result<Self, ShapeError> {
        Ok(Self {
            entries: specs_from_value(value, "menu config")?,
        })
    }

    pub fn build(&self) -> Result<MenuTree, ShapeError> {
        let mut tree = MenuTree::new();
        apply_specs(&mut tree, &self.entries, "menu config")?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regedit_script::Unit;

    fn menu_value(source: &str) -> Value {
        let unit = Unit::from_source("test", source).unwrap();
        unit.get("MENU_CONFIG").unwrap()
    }

    #[test]
    fn full_ids() {
        assert_eq!(MenuTree::full_id("/", "File"), "/File");
        assert_eq!(MenuTree::full_id("/File", "Exit"), "/File/Exit");
        assert_eq!(MenuTree::default_label("/File/Exit"), "Exit");
        assert_eq!(MenuTree::default_label("Exit"), "Exit");
    }

    #[test]
    fn builds_nested_menus() {
        let mut tree = MenuTree::new();
        assert_eq!(tree.add_menu("/", "Hive").unwrap(), "/Hive");
        let id = tree
            .add_command("/Hive", "HKEY_USERS", CommandAction::open_key("HKEY_USERS"))
            .unwrap();
        assert_eq!(id, "/Hive/HKEY_USERS");
        assert_eq!(tree.children("/"), ["/Hive".to_string()]);
        assert_eq!(tree.children("/Hive"), ["/Hive/HKEY_USERS".to_string()]);
        assert_eq!(tree.len(), 2);
        assert!(tree.is_menu("/Hive"));
        assert!(!tree.is_menu("/Hive/HKEY_USERS"));
    }

    #[test]
    fn rejects_duplicates_and_non_menu_parents() {
        let mut tree = MenuTree::new();
        tree.add_menu("/", "Hive").unwrap();
        tree.add_separator("/Hive", "Sep").unwrap();

        assert_eq!(
            tree.add_menu("/", "Hive"),
            Err(MenuError::DuplicateId {
                id: "/Hive".to_string()
            })
        );
        assert_eq!(
            tree.add_menu("/Hive/Sep", "Inner"),
            Err(MenuError::NotAMenu {
                id: "/Hive/Sep".to_string()
            })
        );
        assert_eq!(
            tree.add_menu("/Nowhere", "Inner"),
            Err(MenuError::NotAMenu {
                id: "/Nowhere".to_string()
            })
        );
    }

    #[test]
    fn inserts_at_index() {
        let mut tree = MenuTree::new();
        tree.add_menu("/", "Hive").unwrap();
        tree.add_menu("/", "Environment").unwrap();
        let mut file = NewItem::new("/", "File", MenuItemKind::Menu);
        file.index = Some(0);
        tree.insert(file).unwrap();
        assert_eq!(tree.children("/"), ["/File", "/Hive", "/Environment"]);

        let mut late = NewItem::new("/", "Late", MenuItemKind::Menu);
        late.index = Some(9);
        assert_eq!(
            tree.insert(late),
            Err(MenuError::BadIndex { index: 9, max: 3 })
        );
    }

    #[test]
    fn removes_recursively() {
        let mut tree = MenuTree::new();
        tree.add_menu("/", "A").unwrap();
        tree.add_menu("/A", "B").unwrap();
        tree.add_separator("/A/B", "Sep").unwrap();
        tree.add_menu("/", "C").unwrap();

        let removed = tree.remove_item("/A").unwrap();
        assert_eq!(removed.id, "/A");
        assert!(!tree.contains("/A/B"));
        assert!(!tree.contains("/A/B/Sep"));
        assert_eq!(tree.children("/"), ["/C"]);
        assert_eq!(tree.len(), 1);

        assert_eq!(tree.remove_item("/"), Err(MenuError::RemoveTop));
        assert_eq!(
            tree.remove_item("/A"),
            Err(MenuError::NotFound {
                id: "/A".to_string()
            })
        );
    }

    #[test]
    fn field_pointer_splits_key() {
        assert_eq!(
            CommandAction::open_key(r"HKEY_CURRENT_USER\Environment->PATH"),
            CommandAction::OpenKey {
                key_path: r"HKEY_CURRENT_USER\Environment".to_string(),
                field: Some("PATH".to_string()),
            }
        );
    }

    #[test]
    fn spec_defaults() {
        let config = MenuConfig::from_value(&menu_value(
            r#"
            let MENU_CONFIG = [
                { pid: "/", id: "Environment", type: "menu" },
                { pid: "/Environment", id: r"HKEY_CURRENT_USER\Environment->PATH" },
                { pid: "/Environment", id: "Root", key: "", label: "The root" },
            ];
            "#,
        ))
        .unwrap();

        let tree = config.build().unwrap();
        let menu = tree.item("/Environment").unwrap();
        assert_eq!(menu.label.as_deref(), Some("Environment"));

        let path = tree
            .item(r"/Environment/HKEY_CURRENT_USER\Environment->PATH")
            .unwrap();
        assert_eq!(
            path.label.as_deref(),
            Some(r"HKEY_CURRENT_USER\Environment->PATH")
        );
        assert_eq!(
            path.kind,
            MenuItemKind::Command(CommandAction::OpenKey {
                key_path: r"HKEY_CURRENT_USER\Environment".to_string(),
                field: Some("PATH".to_string()),
            })
        );

        let root = tree.item("/Environment/Root").unwrap();
        assert_eq!(root.label.as_deref(), Some("The root"));
        assert_eq!(
            root.kind,
            MenuItemKind::Command(CommandAction::OpenKey {
                key_path: String::new(),
                field: None,
            })
        );
    }

    #[test]
    fn full_ids_in_specs() {
        let config = MenuConfig::from_value(&menu_value(
            r#"
            let MENU_CONFIG = [
                { pid: "/", id: "Tools", type: "menu" },
                { pid: "/Tools", id: "/Tools/Exit", id_is_full: true, action: "exit" },
            ];
            "#,
        ))
        .unwrap();
        let tree = config.build().unwrap();
        assert_eq!(
            tree.item("/Tools/Exit").unwrap().kind,
            MenuItemKind::Command(CommandAction::Exit)
        );
    }

    #[test]
    fn menu_config_must_be_a_list() {
        let err = MenuConfig::from_value(&Value::from("nope")).unwrap_err();
        assert!(matches!(err, ShapeError::Mismatch { .. }));
    }

    #[test]
    fn entries_must_be_maps_with_required_keys() {
        let err = MenuConfig::from_value(&menu_value("let MENU_CONFIG = [1];")).unwrap_err();
        assert!(err.to_string().contains("menu config entry 0"));

        let value = menu_value(r#"let MENU_CONFIG = [{ pid: "/" }];"#);
        let err = MenuConfig::from_value(&value).unwrap_err();
        assert!(matches!(err, ShapeError::MissingKey { ref key, .. } if key == "id"));
    }

    #[test]
    fn unknown_keys_and_types_rejected() {
        let err = MenuConfig::from_value(&menu_value(
            r#"let MENU_CONFIG = [{ pid: "/", id: "x", lable: "typo" }];"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ShapeError::UnknownKey { ref key, .. } if key == "lable"));

        let err = MenuConfig::from_value(&menu_value(
            r#"let MENU_CONFIG = [{ pid: "/", id: "x", type: "button" }];"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("unknown item type `button`"));
    }

    #[test]
    fn tree_errors_name_the_entry() {
        let config = MenuConfig::from_value(&menu_value(
            r#"
            let MENU_CONFIG = [
                { pid: "/", id: "Hive", type: "menu" },
                { pid: "/", id: "Hive", type: "menu" },
            ];
            "#,
        ))
        .unwrap();
        let err = config.build().unwrap_err();
        assert!(matches!(err, ShapeError::Menu { .. }));
        assert!(err.to_string().contains("entry 1 (`Hive`)"));
    }

    #[test]
    fn outline_rendering() {
        let mut tree = MenuTree::new();
        tree.add_menu("/", "Hive").unwrap();
        tree.add_command("/Hive", "HKEY_USERS", CommandAction::open_key("HKEY_USERS"))
            .unwrap();
        tree.add_separator("/Hive", "Sep").unwrap();
        tree.add_menu("/", "File").unwrap();
        tree.add_command("/File", "Exit", CommandAction::Exit).unwrap();

        assert_eq!(
            tree.outline(),
            "Hive\n  HKEY_USERS\n  ---\nFile\n  Exit\n"
        );
    }
}
