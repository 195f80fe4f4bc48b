use super::*;

#[test]
fn defaults_match_the_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(10));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert!(settings.database.url.is_none());
    assert_eq!(settings.aggregation.deadline, Duration::from_secs(10));
    assert!(!settings.aggregation.cancel_on_failure);
    assert_eq!(settings.realtime.relay_capacity.get(), DEFAULT_RELAY_CAPACITY);
    assert!(settings.cors.allowed_origins.is_empty());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.aggregation.cancel_on_failure = Some(false);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        aggregation_cancel_on_failure: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(settings.aggregation.cancel_on_failure);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn cli_cors_origins_replace_the_configured_list() {
    let mut raw = RawSettings::default();
    raw.cors.allowed_origins = Some(vec!["http://old.example".to_string()]);
    let overrides = ServeOverrides {
        cors_allowed_origins: vec!["https://app.example/".to_string()],
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cors.allowed_origins, vec!["https://app.example"]);
}

#[test]
fn migrate_only_overrides_the_database_url() {
    let mut raw = RawSettings::default();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("  postgres://localhost/recipes  ".to_string()),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://localhost/recipes")
    );
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_deadline_is_rejected() {
    let mut raw = RawSettings::default();
    raw.aggregation.deadline_ms = Some(0);

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "aggregation.deadline_ms"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn zero_client_buffer_is_rejected() {
    let mut raw = RawSettings::default();
    raw.realtime.client_buffer = Some(0);

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "realtime.client_buffer"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn origins_without_scheme_are_rejected() {
    let mut raw = RawSettings::default();
    raw.cors.allowed_origins = Some(vec!["localhost:5173".to_string()]);

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "cors.allowed_origins"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));
}

#[test]
fn serve_is_the_default_command() {
    let args = CliArgs::try_parse_from(["recipebox"]).expect("parse");
    assert!(args.command.is_none());

    let args = CliArgs::try_parse_from(["recipebox", "serve", "--server-port", "8080"])
        .expect("parse");
    match args.command {
        Some(Command::Serve(serve)) => assert_eq!(serve.overrides.server_port, Some(8080)),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
#[serial_test::serial]
fn environment_overrides_file_values() {
    let vars = [
        ("RECIPEBOX__AGGREGATION__DEADLINE_MS", "2500"),
        ("RECIPEBOX__REALTIME__CLIENT_BUFFER", "16"),
        (
            "RECIPEBOX__CORS__ALLOWED_ORIGINS",
            "https://a.example,https://b.example/",
        ),
    ];
    // SAFETY: serialized with every other test that touches the environment.
    unsafe {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
    }

    let cli = CliArgs::try_parse_from(["recipebox"]).expect("parse");
    let result = load(&cli);

    unsafe {
        for (key, _) in vars {
            std::env::remove_var(key);
        }
    }

    let settings = result.expect("valid settings");
    assert_eq!(settings.aggregation.deadline, Duration::from_millis(2500));
    assert_eq!(settings.realtime.client_buffer.get(), 16);
    assert_eq!(
        settings.cors.allowed_origins,
        vec!["https://a.example", "https://b.example"]
    );
}
