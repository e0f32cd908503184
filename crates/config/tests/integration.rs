//! Integration tests for config

#[cfg(test)]
mod tests {
    use hotswap_config::*;
    use hotswap_errors::{ConfigError, Error, SigningError};
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[paths]
root_dir = "/data/app"

[security]
public_key = "RWQf6LRCGA9i53mlYecO4IzT51TGPpvWucNSCh1CBM0QTaLn73Y7GFO3"

[progress]
frame_interval_ms = 33

[runtime]
debug_mode = true
entry_file_name = "main.jsbundle"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.paths.root_dir, Some(PathBuf::from("/data/app")));
        assert_eq!(config.progress.frame_interval_ms, 33);
        assert!(config.progress.notify);
        assert!(config.runtime.debug_mode);
        assert!(!config.runtime.test_configuration);
        assert_eq!(config.runtime.entry_file_name, "main.jsbundle");
        assert_eq!(config.network.timeout, 300);
        assert_eq!(
            config.db_path().unwrap(),
            PathBuf::from("/data/app/hotswap.sqlite")
        );
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[runtime\ndebug_mode = ").unwrap();
        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.progress.frame_interval_ms, 16);
        assert_eq!(config.runtime.entry_file_name, "index.bundle");
        assert!(config.security.public_key.is_none());
    }

    #[test]
    fn test_merge_vars() {
        let mut config = Config::default();
        config
            .merge_vars(lookup(&[
                ("HOTSWAP_ROOT", "/tmp/hotswap"),
                ("HOTSWAP_DEBUG", "yes"),
                ("HOTSWAP_TEST_CONFIGURATION", "1"),
                ("HOTSWAP_APP_VERSION", "2.0.0"),
                ("HOTSWAP_FRAME_INTERVAL_MS", "8"),
            ]))
            .unwrap();

        assert_eq!(config.root_dir().unwrap(), PathBuf::from("/tmp/hotswap"));
        assert!(config.runtime.debug_mode);
        assert!(config.runtime.test_configuration);
        assert_eq!(config.runtime.app_version_override.as_deref(), Some("2.0.0"));
        assert_eq!(config.frame_interval().as_millis(), 8);
    }

    #[test]
    fn test_merge_vars_rejects_bad_values() {
        let mut config = Config::default();
        let err = config
            .merge_vars(lookup(&[("HOTSWAP_DEBUG", "sometimes")]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { .. })
        ));

        let err = config
            .merge_vars(lookup(&[("HOTSWAP_FRAME_INTERVAL_MS", "fast")]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_public_key_resolution() {
        let mut config = Config::default();
        assert!(config.public_key().await.unwrap().is_none());

        config.security.public_key = Some("   ".into());
        let err = config.public_key().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Signing(SigningError::InvalidPublicKey(_))
        ));

        let mut key_file = NamedTempFile::new().unwrap();
        writeln!(key_file, "RWQkey").unwrap();
        config.security.public_key = None;
        config.security.public_key_path = Some(key_file.path().to_path_buf());
        assert_eq!(
            config.public_key().await.unwrap().as_deref().map(str::trim),
            Some("RWQkey")
        );
    }
}
