//! Startup: resolve the three configuration objects and hand them to a frontend.

use crate::{
    field_editor::FieldEditorFactory,
    menu::{MenuConfig, MenuTree},
    resolver::{self, ConfigKind, ConfigurationShapeSnafu, ErrorKind, ResolveError, Resolved},
    settings::Settings,
    shape::ShapeError,
    ui::{UiConfigurator, UiContext, UiSettings},
};
use snafu::{ResultExt, Snafu};
use std::{fmt, io};

/// Startup steps, reported with the error that stopped startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PrintDefaultMenuConfig,
    PrintDefaultUiConfig,
    PrintDefaultFieldEditor,
    LoadFieldEditorFactory,
    LoadMenuConfig,
    CreateMenuTree,
    LoadUiConfigurator,
    CallUiConfigurator,
    RunFrontend,
}

impl Step {
    pub fn title(self) -> &'static str {
        match self {
            Step::PrintDefaultMenuConfig => "Print default menu config module",
            Step::PrintDefaultUiConfig => "Print default UI config module",
            Step::PrintDefaultFieldEditor => "Print default field editor factory config module",
            Step::LoadFieldEditorFactory => "Load field editor factory",
            Step::LoadMenuConfig => "Load menu config",
            Step::CreateMenuTree => "Create menu tree",
            Step::LoadUiConfigurator => "Load UI config function",
            Step::CallUiConfigurator => "Call UI config function",
            Step::RunFrontend => "Run frontend",
        }
    }

    fn dump(kind: ConfigKind) -> Self {
        match kind {
            ConfigKind::Menu => Step::PrintDefaultMenuConfig,
            ConfigKind::Ui => Step::PrintDefaultUiConfig,
            ConfigKind::FieldEditor => Step::PrintDefaultFieldEditor,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Snafu)]
pub enum StartupError {
    #[snafu(display("{flag} \"{reference}\": {}: {source}", source.kind()))]
    Resolve {
        step: Step,
        flag: &'static str,
        reference: String,
        source: ResolveError,
    },

    #[snafu(display("frontend failed: {source}"))]
    Frontend { step: Step, source: io::Error },
}

impl StartupError {
    pub fn step(&self) -> Step {
        match self {
            StartupError::Resolve { step, .. } | StartupError::Frontend { step, .. } => *step,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StartupError::Resolve { source, .. } => Some(source.kind()),
            StartupError::Frontend { .. } => None,
        }
    }
}

/// What the user asked for on the command line, plus the loaded settings file.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub menu_conf: Option<String>,
    pub ui_conf: Option<String>,
    pub field_editor: Option<String>,
    pub menu_conf_default: bool,
    pub ui_conf_default: bool,
    pub field_editor_default: bool,
    pub settings: Settings,
}

impl Options {
    /// The first requested dump, in menu, UI, field editor order.
    pub fn dump_requested(&self) -> Option<ConfigKind> {
        [
            (self.menu_conf_default, ConfigKind::Menu),
            (self.ui_conf_default, ConfigKind::Ui),
            (self.field_editor_default, ConfigKind::FieldEditor),
        ]
        .into_iter()
        .find_map(|(requested, kind)| requested.then_some(kind))
    }

    /// Reference for `kind`: flag, then settings file, then the built-in default.
    pub fn reference(&self, kind: ConfigKind) -> String {
        let flag = match kind {
            ConfigKind::Menu => self.menu_conf.as_deref(),
            ConfigKind::Ui => self.ui_conf.as_deref(),
            ConfigKind::FieldEditor => self.field_editor.as_deref(),
        };
        flag.or_else(|| self.settings.reference(kind))
            .map_or_else(|| kind.default_reference().to_string(), str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Built-in source text to print instead of starting the editor.
    Dump(&'static str),
    Ran,
}

/// Everything a frontend needs to build the editor.
#[derive(Debug)]
pub struct EditorSetup {
    pub menu_tree: MenuTree,
    pub ui: UiSettings,
    pub field_editors: FieldEditorFactory,
}

pub trait Frontend {
    fn run(&mut self, setup: EditorSetup) -> io::Result<()>;
}

/// Prints the window title, geometry and menu outline.
pub struct TextFrontend<W> {
    out: W,
}

impl<W: io::Write> TextFrontend<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> Frontend for TextFrontend<W> {
    fn run(&mut self, setup: EditorSetup) -> io::Result<()> {
        writeln!(self.out, "{}", setup.ui.title)?;
        writeln!(self.out, "{}", setup.ui.geometry)?;
        writeln!(self.out)?;
        write!(self.out, "{}", setup.menu_tree.outline())?;
        self.out.flush()
    }
}

pub struct Startup {
    options: Options,
}

impl Startup {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn run(&self, frontend: &mut dyn Frontend) -> Result<Outcome, StartupError> {
        if let Some(kind) = self.options.dump_requested() {
            tracing::debug!(step = %Step::dump(kind), "dumping default");
            return Ok(Outcome::Dump(resolver::dump_default(kind)));
        }

        let (step, kind) = (Step::LoadFieldEditorFactory, ConfigKind::FieldEditor);
        let resolved = self.resolve(step, kind)?;
        let reference = resolved.reference.to_string();
        let field_editors =
            shaped(FieldEditorFactory::from_resolved(resolved), step, kind, &reference)?;

        let (step, kind) = (Step::LoadMenuConfig, ConfigKind::Menu);
        let resolved = self.resolve(step, kind)?;
        let reference = resolved.reference.to_string();
        let menu_config = shaped(MenuConfig::from_value(&resolved.value), step, kind, &reference)?;
        let mut menu_tree = shaped(menu_config.build(), Step::CreateMenuTree, kind, &reference)?;

        let (step, kind) = (Step::LoadUiConfigurator, ConfigKind::Ui);
        let resolved = self.resolve(step, kind)?;
        let reference = resolved.reference.to_string();
        let configurator = shaped(UiConfigurator::from_resolved(resolved), step, kind, &reference)?;

        let step = Step::CallUiConfigurator;
        let context = UiContext::new(UiSettings::default().title, &menu_tree);
        let ui = shaped(configurator.configure(&context), step, kind, &reference)?;
        shaped(ui.apply_menus(&mut menu_tree), step, kind, &reference)?;

        tracing::info!(items = menu_tree.len(), title = %ui.title, "editor configured");
        frontend
            .run(EditorSetup {
                menu_tree,
                ui,
                field_editors,
            })
            .context(FrontendSnafu {
                step: Step::RunFrontend,
            })?;
        Ok(Outcome::Ran)
    }

    fn resolve(&self, step: Step, kind: ConfigKind) -> Result<Resolved, StartupError> {
        let reference = self.options.reference(kind);
        tracing::debug!(%step, flag = kind.flag(), %reference);
        resolver::resolve(&reference).context(ResolveSnafu {
            step,
            flag: kind.flag(),
            reference,
        })
    }
}

fn shaped<T>(
    result: Result<T, ShapeError>,
    step: Step,
    kind: ConfigKind,
    reference: &str,
) -> Result<T, StartupError> {
    result
        .context(ConfigurationShapeSnafu)
        .context(ResolveSnafu {
            step,
            flag: kind.flag(),
            reference,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field_editor::Field, menu::MenuItemKind};
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recording {
        setup: Option<EditorSetup>,
    }

    impl Frontend for Recording {
        fn run(&mut self, setup: EditorSetup) -> io::Result<()> {
            self.setup = Some(setup);
            Ok(())
        }
    }

    fn run(options: Options) -> (Result<Outcome, StartupError>, Option<EditorSetup>) {
        let mut frontend = Recording::default();
        let result = Startup::new(options).run(&mut frontend);
        (result, frontend.setup)
    }

    #[test]
    fn dump_precedence() {
        let options = Options {
            ui_conf_default: true,
            field_editor_default: true,
            ..Options::default()
        };
        assert_eq!(
            run(options).0.unwrap(),
            Outcome::Dump(resolver::dump_default(ConfigKind::Ui))
        );

        let options = Options {
            menu_conf_default: true,
            ui_conf_default: true,
            menu_conf: Some("not a reference".to_string()),
            ..Options::default()
        };
        let (result, setup) = run(options);
        assert_eq!(
            result.unwrap(),
            Outcome::Dump(resolver::dump_default(ConfigKind::Menu))
        );
        assert!(setup.is_none());
    }

    #[test]
    fn defaults_build_the_editor() {
        let (result, setup) = run(Options::default());
        assert_eq!(result.unwrap(), Outcome::Ran);

        let setup = setup.unwrap();
        assert_eq!(setup.ui.title, "AoikRegistryEditor");
        assert_eq!(setup.ui.geometry.to_string(), "1280x720");
        assert_eq!(
            setup.menu_tree.children("/"),
            ["/File", "/Hive", "/Environment", "/File Types"]
        );
        assert_eq!(
            setup.menu_tree.item("/File/Exit").unwrap().kind,
            MenuItemKind::Command(crate::menu::CommandAction::Exit)
        );

        let editor = setup
            .field_editors
            .create(&Field::new("PATH", "REG_SZ", "a;b"))
            .unwrap();
        assert_eq!(editor.display("a;b").unwrap(), "a\nb");
    }

    #[test]
    fn reference_precedence() {
        let options = Options {
            menu_conf: Some("cli.conf::MENU_CONFIG".to_string()),
            settings: Settings {
                menu_conf: Some("file.conf::MENU_CONFIG".to_string()),
                ui_conf: Some("file.conf::configure_ui".to_string()),
                field_editor: None,
            },
            ..Options::default()
        };
        assert_eq!(options.reference(ConfigKind::Menu), "cli.conf::MENU_CONFIG");
        assert_eq!(options.reference(ConfigKind::Ui), "file.conf::configure_ui");
        assert_eq!(
            options.reference(ConfigKind::FieldEditor),
            "builtin:field_editor::field_editor_factory"
        );
    }

    #[test]
    fn malformed_override_stops_at_its_step() {
        let options = Options {
            ui_conf: Some("ui.conf".to_string()),
            ..Options::default()
        };
        let err = run(options).0.unwrap_err();
        assert_eq!(err.step(), Step::LoadUiConfigurator);
        assert_eq!(err.kind(), Some(ErrorKind::MalformedReference));
        assert!(err.to_string().starts_with("--ui-conf \"ui.conf\": MalformedReferenceError: "));
    }

    #[test]
    fn field_editor_loads_first() {
        let options = Options {
            menu_conf: Some("missing.conf::MENU_CONFIG".to_string()),
            field_editor: Some("missing.conf::field_editor_factory".to_string()),
            ..Options::default()
        };
        let err = run(options).0.unwrap_err();
        assert_eq!(err.step(), Step::LoadFieldEditorFactory);
        assert_eq!(err.kind(), Some(ErrorKind::ScriptLoad));
    }

    #[test]
    fn shape_errors_name_the_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("menu.conf");
        fs::write(&path, "let MENU_CONFIG = { pid: \"/\" };").unwrap();

        let reference = format!("{}::MENU_CONFIG", path.display());
        let options = Options {
            menu_conf: Some(reference.clone()),
            ..Options::default()
        };
        let err = run(options).0.unwrap_err();
        assert_eq!(err.step(), Step::LoadMenuConfig);
        assert_eq!(err.kind(), Some(ErrorKind::ConfigurationShape));
        assert!(err
            .to_string()
            .starts_with(&format!("--menu-conf \"{reference}\": ConfigurationShapeError: ")));
    }

    #[test]
    fn ui_menus_conflicting_with_menu_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ui.conf");
        fs::write(
            &path,
            r#"fn configure_ui(info) = { menus: [{ pid: "/", id: "Hive", type: "menu" }] };"#,
        )
        .unwrap();

        let options = Options {
            ui_conf: Some(format!("{}::configure_ui", path.display())),
            ..Options::default()
        };
        let err = run(options).0.unwrap_err();
        assert_eq!(err.step(), Step::CallUiConfigurator);
        assert_eq!(err.kind(), Some(ErrorKind::ConfigurationShape));
        assert!(err.to_string().contains("item ID exists: `/Hive`"));
    }

    #[test]
    fn text_frontend_output() {
        let mut frontend = TextFrontend::new(Vec::new());
        let result = Startup::new(Options::default()).run(&mut frontend).unwrap();
        assert_eq!(result, Outcome::Ran);

        let out = String::from_utf8(frontend.into_inner()).unwrap();
        assert!(out.starts_with("AoikRegistryEditor\n1280x720\n\nFile\n  Exit\nHive\n"));
    }
}
