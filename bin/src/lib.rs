//! Command line entry point for `aoikregistryeditor`.

use clap::Parser;
use regedit::{Options, Outcome, Settings, Startup, TextFrontend};
use std::{
    fmt::Display,
    io::Write,
    path::{Path, PathBuf},
};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Registry editor with pluggable menu, UI and field editor configuration.
///
/// Configuration objects are given as `<script path>::<name>`. Dump a default with its
/// `--*-default` flag, edit it, then pass it back with the matching flag.
#[derive(Debug, Parser)]
#[command(name = "aoikregistryeditor", author, version, about, long_about = None)]
pub struct Cli {
    /// Print the default menu configuration and exit.
    #[arg(long)]
    pub menu_conf_default: bool,

    /// Menu configuration, e.g. `menu.conf::MENU_CONFIG`.
    #[arg(short = 'm', long, value_name = "PATH::NAME")]
    pub menu_conf: Option<String>,

    /// Print the default UI configuration and exit.
    #[arg(long)]
    pub ui_conf_default: bool,

    /// UI configuration function, e.g. `ui.conf::configure_ui`.
    #[arg(short = 'u', long, value_name = "PATH::NAME")]
    pub ui_conf: Option<String>,

    /// Print the default field editor factory and exit.
    #[arg(long)]
    pub field_editor_default: bool,

    /// Field editor factory function, e.g. `field_editor.conf::field_editor_factory`.
    #[arg(short = 'f', long, value_name = "PATH::NAME")]
    pub field_editor: Option<String>,

    /// App settings file. Defaults to `<config dir>/aoikregistryeditor/config.toml`.
    #[arg(long, env = "AOIK_REGEDIT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file, or a directory to create the log file in.
    #[arg(long, env = "AOIK_REGEDIT_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Run the editor, writing dumps and frontend output to `out` and diagnostics to `err`.
///
/// Returns the process exit code. Dumps do not read the settings file.
pub fn run(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    let mut options = Options {
        menu_conf: cli.menu_conf,
        ui_conf: cli.ui_conf,
        field_editor: cli.field_editor,
        menu_conf_default: cli.menu_conf_default,
        ui_conf_default: cli.ui_conf_default,
        field_editor_default: cli.field_editor_default,
        settings: Settings::default(),
    };

    if options.dump_requested().is_none() {
        options.settings = match load_settings(cli.config.as_deref()) {
            Ok(settings) => settings,
            Err(e) => {
                report(err, "Load app settings", &format!("{e:#}"));
                return EXIT_FAILURE;
            },
        };
    }

    let mut frontend = TextFrontend::new(&mut *out);
    let outcome = Startup::new(options).run(&mut frontend);
    match outcome {
        Ok(Outcome::Dump(text)) => {
            if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
                report(err, "Print default config", &e);
                return EXIT_FAILURE;
            }
            EXIT_OK
        },
        Ok(Outcome::Ran) => EXIT_OK,
        Err(e) => {
            tracing::error!(step = %e.step(), "{e}");
            report(err, e.step().title(), &e);
            EXIT_FAILURE
        },
    }
}

fn load_settings(cli_override: Option<&Path>) -> anyhow::Result<Settings> {
    let discovered = Settings::discover();
    Settings::load_with_overrides(cli_override, discovered.as_deref())
}

/// Write a `# Error` block.
fn report(err: &mut dyn Write, title: &str, detail: &dyn Display) {
    // A failed write to the error stream has nowhere left to be reported.
    let _ = writeln!(err, "# Error: {title}\n---\n{detail}\n---");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Run with an empty settings file so the user's own settings never leak in.
    fn run_args(args: &[&str]) -> (i32, String, String) {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let mut argv = vec!["aoikregistryeditor", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();

        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = run(cli, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from([
            "aoikregistryeditor",
            "-m",
            "a::B",
            "-u",
            "c::d",
            "-f",
            "e::f",
        ])
        .unwrap();
        assert_eq!(cli.menu_conf.as_deref(), Some("a::B"));
        assert_eq!(cli.ui_conf.as_deref(), Some("c::d"));
        assert_eq!(cli.field_editor.as_deref(), Some("e::f"));
    }

    #[test]
    fn dumps_print_verbatim() {
        let (code, out, err) = run_args(&["--field-editor-default"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(
            out,
            regedit::dump_default(regedit::ConfigKind::FieldEditor)
        );
        assert!(err.is_empty());
    }

    #[test]
    fn normal_run_prints_outline() {
        let (code, out, _) = run_args(&[]);
        assert_eq!(code, EXIT_OK);
        assert!(out.starts_with("AoikRegistryEditor\n1280x720\n"));
        assert!(out.contains("\nFile\n  Exit\n"));
    }

    #[test]
    fn diagnostic_format() {
        let (code, out, err) = run_args(&["--menu-conf", "menu_config"]);
        assert_eq!(code, EXIT_FAILURE);
        assert!(out.is_empty());
        assert!(
            err.starts_with(concat!(
                "# Error: Load menu config\n---\n",
                "--menu-conf \"menu_config\": MalformedReferenceError: ",
            )),
            "{err}"
        );
        assert!(err.ends_with("\n---\n"));
    }

    #[test]
    fn dumps_skip_settings() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "menu = 1\n").unwrap();
        let cli = Cli::try_parse_from([
            "aoikregistryeditor",
            "--config",
            config.to_str().unwrap(),
            "--menu-conf-default",
        ])
        .unwrap();

        let (mut out, mut err) = (Vec::new(), Vec::new());
        assert_eq!(run(cli, &mut out, &mut err), EXIT_OK);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            regedit::dump_default(regedit::ConfigKind::Menu)
        );
        assert!(err.is_empty());
    }

    #[test]
    fn missing_settings_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let cli = Cli::try_parse_from([
            "aoikregistryeditor",
            "--config",
            missing.to_str().unwrap(),
        ])
        .unwrap();

        let (mut out, mut err) = (Vec::new(), Vec::new());
        assert_eq!(run(cli, &mut out, &mut err), EXIT_FAILURE);
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("# Error: Load app settings\n"));
        assert!(err.contains("missing.toml"));
    }
}
