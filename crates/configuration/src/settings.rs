use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section may be omitted from `config.toml`; omitted sections fall back to
/// their `Default` implementation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub detection: DetectionSettings,
    pub analysis: AnalysisSettings,
    pub correlation: CorrelationSettings,
    pub logging: LoggingSettings,
}

/// Contains parameters for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    /// 5000 matches the port the dashboard expects.
    pub port: u16,
    /// Maximum accepted request body, in megabytes (bounds CSV uploads).
    pub body_limit_mb: usize,
}

/// Where the price series and event catalog are read from at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub prices_path: PathBuf,
    pub events_path: Option<PathBuf>,
    /// Sort by date and drop duplicate dates before handing points to the store.
    /// When `false`, unordered input is rejected by the store instead.
    pub normalize: bool,
    /// An explicit `chrono` format for the price file's date column. When absent,
    /// ISO dates and the Brent dataset's formats ("20-May-87", "Apr 22, 2020") are tried.
    pub date_format: Option<String>,
}

/// Parameters for change-point detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub detector: DetectorKind,
    /// Minimum number of observations on each side of a break.
    pub min_segment_length: usize,
    /// Confidence a candidate must reach before the series is split at it.
    pub significance: f64,
    /// Upper bound on the number of change points returned by default.
    pub max_points: Option<usize>,
    /// Candidates below this confidence are discarded.
    pub min_confidence: f64,
}

/// Parameters for period statistics.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub annualization: AnnualizationBasis,
    pub returns: ReturnKind,
}

/// Parameters for event windows and change-point/event matching.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    pub window_before_months: u32,
    pub window_after_months: u32,
    /// A change point is attributed to an event at most this many days away.
    pub match_window_days: u32,
}

/// Parameters for the tracing subscriber.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    pub ansi: bool,
}

/// Selects the change-point detection strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    BinarySegmentation,
}

/// Number of return periods per year used to annualize volatility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum AnnualizationBasis {
    /// 252 trading days per year.
    #[default]
    TradingDays,
    /// 365 calendar days per year.
    CalendarDays,
}

impl AnnualizationBasis {
    pub fn periods_per_year(&self) -> f64 {
        match self {
            AnnualizationBasis::TradingDays => 252.0,
            AnnualizationBasis::CalendarDays => 365.0,
        }
    }
}

/// How periodic returns are computed from consecutive prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// `(p_t - p_{t-1}) / p_{t-1}`
    #[default]
    Simple,
    /// `ln(p_t / p_{t-1})`
    Log,
}

// --- Default Implementations ---

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            body_limit_mb: 50,
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            prices_path: PathBuf::from("data/sample_prices.csv"),
            events_path: Some(PathBuf::from("data/events.csv")),
            normalize: true,
            date_format: None,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            min_segment_length: 5,
            significance: 0.99,
            max_points: None,
            min_confidence: 0.0,
        }
    }
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            window_before_months: 3,
            window_after_months: 3,
            match_window_days: 30,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "breakpoint.log".to_string(),
            ansi: true,
        }
    }
}

impl Config {
    /// Rejects settings that would make the engine misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let detection = &self.detection;
        if detection.min_segment_length < 2 {
            return Err(ConfigError::ValidationError(
                "detection.min_segment_length must be at least 2".to_string(),
            ));
        }
        if !(detection.significance > 0.0 && detection.significance <= 1.0) {
            return Err(ConfigError::ValidationError(
                "detection.significance must be in (0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&detection.min_confidence) {
            return Err(ConfigError::ValidationError(
                "detection.min_confidence must be in [0, 1]".to_string(),
            ));
        }
        if detection.max_points == Some(0) {
            return Err(ConfigError::ValidationError(
                "detection.max_points must be positive when set".to_string(),
            ));
        }
        if self.server.body_limit_mb == 0 {
            return Err(ConfigError::ValidationError(
                "server.body_limit_mb must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
