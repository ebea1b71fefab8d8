//! Loading units from disk.

use regedit_script::{LoadError, Unit, Value};
use tempfile::tempdir;

#[test]
fn loads_unit_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("field_editor.conf");
    std::fs::write(
        &path,
        r#"
        fn newline_to_semicolon(text) = join(split(text, "\n"), ";");
        let DEFAULT_FONT = { family: "Consolas", size: 16 };
        "#,
    )
    .unwrap();

    let unit = Unit::load(&path).unwrap();
    assert_eq!(unit.name(), path.display().to_string());
    assert_eq!(unit.exports(), vec!["DEFAULT_FONT", "newline_to_semicolon"]);

    let f = unit.get("newline_to_semicolon").unwrap();
    assert_eq!(
        f.call(vec![Value::from("a\nb")]).unwrap(),
        Value::from("a;b")
    );
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let err = Unit::load(&dir.path().join("missing.conf")).unwrap_err();
    assert!(matches!(err, LoadError::Read { .. }));
    assert!(err.to_string().contains("missing.conf"));
}

#[test]
fn syntax_errors_are_rendered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.conf");
    std::fs::write(&path, "let X = [1, 2;\n").unwrap();

    let err = Unit::load(&path).unwrap_err();
    match &err {
        LoadError::Parse { errors, report, .. } => {
            assert!(!errors.is_empty());
            assert!(!report.is_empty());
        },
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn print_has_no_effect_on_bindings() {
    let unit = Unit::from_source("inline", r#"let X = print("loading", 1); let Y = 2;"#).unwrap();
    assert_eq!(unit.get("X"), Some(Value::Nil));
    assert_eq!(unit.get("Y"), Some(Value::Number(2.0)));
}

#[test]
fn env_reads_process_environment() {
    let unit = Unit::from_source(
        "inline",
        r#"let X = env("REGEDIT_SCRIPT_TEST_SURELY_UNSET_VARIABLE");"#,
    )
    .unwrap();
    assert_eq!(unit.get("X"), Some(Value::Nil));
}
