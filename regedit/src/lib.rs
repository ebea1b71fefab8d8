//! Pluggable configuration for a customizable registry editor.
//!
//! The editor takes three configuration objects, each from a script unit named by a
//! `path::name` reference:
//!
//! - the menu configuration, a list of menu entries ([`MenuConfig`]),
//! - the UI configurator, a function customizing the window ([`UiConfigurator`]),
//! - the field editor factory, a function creating editors per field ([`FieldEditorFactory`]).
//!
//! Each has a built-in default that can be dumped with [`dump_default`], edited, and loaded
//! back with [`resolve`].

pub mod field_editor;
pub mod menu;
pub mod reference;
pub mod resolver;
pub mod settings;
mod shape;
pub mod startup;
pub mod ui;

pub use field_editor::{Field, FieldEditor, FieldEditorFactory};
pub use menu::{MenuConfig, MenuError, MenuTree};
pub use reference::{ConfigReference, ReferenceError};
pub use resolver::{
    dump_default, resolve, resolve_reference, ConfigKind, ErrorKind, ResolveError, Resolved,
};
pub use settings::Settings;
pub use shape::ShapeError;
pub use startup::{Frontend, Options, Outcome, Startup, StartupError, TextFrontend};
pub use ui::{UiConfigurator, UiContext, UiSettings};
