#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::cluster::ClusterOptions;
    use crate::engine::{EngineConfig, StrategyChoice};
    use crate::error::{Error, OptionsError};

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("spotmap_{}_{name}", std::process::id()));
        fs::write(&path, contents).expect("Failed to write config file");
        path
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.max_entities, 500);
        assert_eq!(config.background_threshold, 200);
        assert_eq!(config.strategy, StrategyChoice::Hierarchical);
        assert_eq!(config.options, ClusterOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{"maxEntities": 20, "strategy": "auto", "options": {"radius": 80}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_entities, 20);
        assert_eq!(config.strategy, StrategyChoice::Auto);
        assert_eq!(config.options.radius, 80);
        assert_eq!(config.options.max_zoom, 16);
        assert_eq!(config.debounce_ms, 100);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EngineConfig {
            max_entities: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(OptionsError::InvalidOptions(_))));

        let config = EngineConfig {
            options: ClusterOptions {
                min_zoom: 10,
                max_zoom: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let path = temp_file("config_ok.json", r#"{"debounceMs": 0, "backgroundThreshold": 10}"#);
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.debounce(), Duration::ZERO);
        assert_eq!(config.background_threshold, 10);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_from_json_file_errors() {
        let missing = std::env::temp_dir().join("spotmap_no_such_config.json");
        assert!(matches!(EngineConfig::from_json_file(&missing), Err(Error::Config { .. })));

        let path = temp_file("config_bad.json", "{not json");
        assert!(matches!(EngineConfig::from_json_file(&path), Err(Error::Config { .. })));
        fs::remove_file(&path).ok();

        let path = temp_file("config_invalid.json", r#"{"options": {"minPoints": 1}}"#);
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(Error::Options(OptionsError::InvalidOptions(_)))
        ));
        fs::remove_file(&path).ok();
    }
}
