use std::io::Write;

use chrono::NaiveDate;
use eta_cli::load_settings;
use eta_core::config::ConfigError;
use pretty_assertions::assert_eq;

#[test]
fn settings_load_from_a_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[database]
connection_string = "eta.db"

[logging]
level = "warn"
file = "eta.log"

[[connectors]]
company = "Axentor"
client_id = "abc"
is_default = true
signature_start_date = "2026-03-01"
"#
    )
    .unwrap();

    let settings = load_settings(Some(file.path())).unwrap();
    assert_eq!(settings.database.backend, "sqlite");
    assert_eq!(settings.database.connection_string, "eta.db");
    assert_eq!(settings.logging.file.as_deref(), Some("eta.log"));
    assert_eq!(
        settings
            .default_connector("Axentor")
            .unwrap()
            .signature_start_date,
        NaiveDate::from_ymd_opt(2026, 3, 1)
    );
}

#[test]
fn unknown_environment_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[connectors]]
company = "Axentor"
client_id = "abc"
environment = "staging"
"#
    )
    .unwrap();

    assert!(matches!(
        load_settings(Some(file.path())),
        Err(ConfigError::Parse(_))
    ));
}
