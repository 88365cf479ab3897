use super::*;
use figment::Jail;

#[test]
fn test_settings_validation() {
    let settings = Settings::default();
    assert!(settings.validate().is_ok());

    let mut invalid = settings.clone();
    invalid.log_level = "userauth=loud".to_string();
    assert!(invalid.validate().is_err());

    let mut directives = settings.clone();
    directives.log_level = "info,tower_http=debug".to_string();
    assert!(directives.validate().is_ok());

    let mut invalid = settings.clone();
    invalid.session_name = "  ".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.session_name = "my session".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.hasher.r = 0;
    assert!(invalid.validate().is_err());
}

#[test]
fn test_session_duration() {
    let mut settings = Settings::default();
    assert_eq!(settings.session_duration(), None);

    settings.session_duration_secs = 60;
    assert_eq!(settings.session_duration(), Some(Duration::from_secs(60)));
}

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|_jail| {
        let settings = Settings::load().map_err(|e| e.to_string())?;
        assert_eq!(settings, Settings::default());
        Ok(())
    });
}

#[test]
fn test_load_settings() {
    Jail::expect_with(|jail| {
        jail.create_file(
            DEFAULT_CONFIG_FILE,
            r#"
            bind_addr = "0.0.0.0:8080"
            data_file = "test_data/users.jsonl"
            log_level = "debug"
            session_name = "_my_session_id"
            auth_type = "basic_auth"

            [hasher]
            log_n = 10
            "#,
        )?;

        // Environment variable takes precedence
        jail.set_env("USERAUTH_LOG_LEVEL", "warn");
        jail.set_env("USERAUTH_SESSION_DURATION_SECS", "120");
        jail.set_env("USERAUTH_HASHER__P", "2");

        let settings = Settings::load().map_err(|e| e.to_string())?;
        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(settings.data_file, PathBuf::from("test_data/users.jsonl"));
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.session_name, "_my_session_id");
        assert_eq!(settings.auth_type, AuthType::BasicAuth);
        assert_eq!(settings.session_duration(), Some(Duration::from_secs(120)));
        assert_eq!(
            settings.hasher,
            HasherSettings {
                log_n: 10,
                r: 8,
                p: 2
            }
        );
        Ok(())
    });
}

#[test]
fn test_unknown_auth_type_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("USERAUTH_AUTH_TYPE", "magic");
        assert!(matches!(Settings::load(), Err(ConfigError::Load(_))));
        Ok(())
    });
}
