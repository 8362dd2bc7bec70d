use std::time::Duration;

use clap::Parser;

use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.api.base_url, DEFAULT_API_URL);
    assert_eq!(settings.api.timeout, Duration::from_secs(30));
    assert_eq!(settings.retry, RetryPolicy::default());
    assert_eq!(settings.media.limits, UploadLimits::default());
    assert_eq!(settings.media.timeout, settings.api.timeout);
    assert!(!settings.media.is_configured());
    assert_eq!(
        settings.session.file.as_deref(),
        Some(std::path::Path::new(DEFAULT_SESSION_FILE))
    );
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("https://file.example/api".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = GlobalOverrides {
        api_url: Some("https://cli.example/api".to_string()),
        log_level: Some("debug".to_string()),
        timeout_seconds: Some(5),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.api.base_url, "https://cli.example/api");
    assert_eq!(settings.api.timeout, Duration::from_secs(5));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_retry_policy_is_rejected() {
    let mut raw = RawSettings::default();
    raw.retry.max_attempts = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid { key: "retry", .. })
    ));

    let mut raw = RawSettings::default();
    raw.retry.backoff_multiplier = Some(0.5);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn retry_policy_reads_custom_values() {
    let mut raw = RawSettings::default();
    raw.retry.max_attempts = Some(5);
    raw.retry.base_delay_ms = Some(100);
    raw.retry.backoff_multiplier = Some(3.0);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.retry.max_attempts(), 5);
    assert_eq!(settings.retry.delay_for(1), Duration::from_millis(300));
}

#[test]
fn media_host_needs_url_and_preset() {
    let mut raw = RawSettings::default();
    raw.media.upload_url = Some("https://media.example/upload".to_string());
    raw.media.upload_preset = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.media.is_configured());

    let mut raw = RawSettings::default();
    raw.media.upload_url = Some("https://media.example/upload".to_string());
    raw.media.upload_preset = Some("portfolio".to_string());
    raw.media.gallery_max_bytes = Some(2_097_152);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.media.is_configured());
    assert_eq!(settings.media.limits.gallery_max_bytes, 2_097_152);
}

#[test]
fn malformed_urls_are_rejected() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("not a url".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "api.base_url",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.media.upload_url = Some("::".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn in_memory_session_has_no_file() {
    let mut raw = RawSettings::default();
    raw.session.in_memory = Some(true);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.session.file.is_none());
}

#[test]
fn parse_create_arguments() {
    let args = CliArgs::parse_from([
        "folio",
        "create",
        "project",
        "--input",
        "/tmp/project.json",
        "--image",
        "/tmp/a.png",
        "--image",
        "/tmp/b.png",
    ]);

    match args.command {
        Command::Create(create) => {
            assert_eq!(create.kind, KindArg::Project);
            assert_eq!(create.input, std::path::Path::new("/tmp/project.json"));
            assert_eq!(create.images.len(), 2);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_delete_with_global_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "delete",
        "quote",
        "q1",
        "--yes",
        "--api-url",
        "https://example.com/api",
    ]);

    assert_eq!(
        args.overrides.api_url.as_deref(),
        Some("https://example.com/api")
    );
    match args.command {
        Command::Delete(delete) => {
            assert_eq!(delete.kind, KindArg::Quote);
            assert_eq!(delete.id, "q1");
            assert!(delete.yes);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_upload_arguments() {
    let args = CliArgs::parse_from([
        "folio",
        "upload",
        "--document",
        "--folder",
        "resumes",
        "--tag",
        "cv",
        "/tmp/cv.pdf",
    ]);

    match args.command {
        Command::Upload(upload) => {
            assert!(upload.document);
            assert_eq!(upload.folder.as_deref(), Some("resumes"));
            assert_eq!(upload.tags, vec!["cv".to_string()]);
            assert_eq!(upload.files.len(), 1);
        }
        _ => panic!("wrong command parsed"),
    }
}
