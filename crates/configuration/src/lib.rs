use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalysisSettings, AnnualizationBasis, Config, CorrelationSettings, DataSettings,
    DetectionSettings, DetectorKind, LoggingSettings, ReturnKind, ServerSettings,
};

/// Prefix of environment variables that override file settings,
/// e.g. `BREAKPOINT__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "BREAKPOINT";

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. See [`load_config_from`].
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads and validates the configuration from `path` plus environment overrides.
///
/// A missing file is not an error: every section has defaults, so an empty
/// environment yields `Config::default()`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.detection.min_segment_length, 5);
        assert_eq!(config.correlation.window_before_months, 3);
        assert_eq!(config.analysis.annualization, AnnualizationBasis::TradingDays);
        assert_eq!(config.analysis.returns, ReturnKind::Simple);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let file = write_toml(
            r#"
            [detection]
            min_segment_length = 10
            max_points = 4

            [analysis]
            annualization = "calendar_days"
            returns = "log"
            "#,
        );

        let config = load_config_from(file.path()).unwrap();

        assert_eq!(config.detection.min_segment_length, 10);
        assert_eq!(config.detection.max_points, Some(4));
        assert_eq!(config.detection.significance, 0.99);
        assert_eq!(config.analysis.annualization.periods_per_year(), 365.0);
        assert_eq!(config.analysis.returns, ReturnKind::Log);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn invalid_detection_settings_are_rejected() {
        let file = write_toml(
            r#"
            [detection]
            significance = 1.5
            "#,
        );

        let err = load_config_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn tracing_writes_to_the_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSettings {
            directory: Some(dir.path().to_path_buf()),
            ansi: false,
            ..Default::default()
        };

        let guard = init_tracing(&settings).unwrap();
        assert!(guard.is_some());
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(files.iter().any(|name| name.starts_with("breakpoint.log")), "{files:?}");

        // A second global subscriber cannot be installed.
        let err = init_tracing(&LoggingSettings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::LoggingError(_)));
    }

    #[test]
    fn zero_max_points_is_rejected() {
        let mut config = Config::default();
        config.detection.max_points = Some(0);
        assert!(config.validate().is_err());
    }
}
