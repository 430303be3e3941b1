//! Configuration for the rotation engine.
//!
//! Resolution order:
//! 1. Hardcoded defaults (per environment)
//! 2. Config file (`CARDSCAN_CONFIG` env var, then `./config/cardscan`)
//! 3. `CARDSCAN_*` environment variable overrides (highest priority)
//!
//! The resolved [`RotationConfig`] is constructed once at process start and
//! passed by value into the store and scheduler; there is no process-wide
//! singleton.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

/// Deployment environment, selecting rotation defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Production,
}

impl Environment {
    /// Default rotation granularity for this environment.
    pub fn default_granularity(self) -> RotationGranularity {
        match self {
            Environment::Dev => RotationGranularity::Weekly,
            Environment::Production => RotationGranularity::Daily,
        }
    }

    /// Default retention window in days for this environment.
    pub fn default_retention_days(self) -> u32 {
        match self {
            Environment::Dev => 30,
            Environment::Production => 7,
        }
    }
}

/// Rotation period unit. Chosen once per process lifetime; drives both
/// bucket naming and the scheduler's trigger cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationGranularity {
    Daily,
    Weekly,
    Monthly,
}

impl RotationGranularity {
    /// Minimum length of one period in days (months counted at their
    /// longest). Used to warn when retention is shorter than one period.
    pub fn period_days(self) -> u32 {
        match self {
            RotationGranularity::Daily => 1,
            RotationGranularity::Weekly => 7,
            RotationGranularity::Monthly => 31,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RotationGranularity::Daily => "daily",
            RotationGranularity::Weekly => "weekly",
            RotationGranularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RotationGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output category: each owns a root directory of period buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCategory {
    /// Operational log files.
    Logs,
    /// Saved response payloads.
    Responses,
}

impl OutputCategory {
    /// All categories, in sweep order.
    pub const ALL: [OutputCategory; 2] = [OutputCategory::Logs, OutputCategory::Responses];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputCategory::Logs => "logs",
            OutputCategory::Responses => "responses",
        }
    }
}

impl fmt::Display for OutputCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw settings as deserialized from files and environment variables.
/// Optional fields fall back to the environment's defaults on [`resolve`].
///
/// [`resolve`]: RotationSettings::resolve
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RotationSettings {
    pub environment: Environment,

    /// Explicit granularity override; defaults per environment when absent.
    #[serde(default)]
    pub granularity: Option<RotationGranularity>,

    /// Retention window for log buckets, in days.
    #[serde(default)]
    pub keep_log_days: Option<u32>,

    /// Retention window for response buckets, in days.
    #[serde(default)]
    pub keep_response_days: Option<u32>,

    pub log_root: PathBuf,
    pub response_root: PathBuf,
}

impl RotationSettings {
    /// Apply the environment defaults table to produce a resolved config.
    pub fn resolve(self) -> RotationConfig {
        let environment = self.environment;
        RotationConfig {
            environment,
            granularity: self
                .granularity
                .unwrap_or_else(|| environment.default_granularity()),
            keep_log_days: self
                .keep_log_days
                .unwrap_or_else(|| environment.default_retention_days()),
            keep_response_days: self
                .keep_response_days
                .unwrap_or_else(|| environment.default_retention_days()),
            log_root: self.log_root,
            response_root: self.response_root,
        }
    }
}

/// Resolved, immutable rotation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RotationConfig {
    pub environment: Environment,
    pub granularity: RotationGranularity,
    pub keep_log_days: u32,
    pub keep_response_days: u32,
    pub log_root: PathBuf,
    pub response_root: PathBuf,
}

impl RotationConfig {
    /// Load configuration from defaults, optional config file, and
    /// `CARDSCAN_*` environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("environment", "dev")?
            .set_default("log_root", "logs")?
            .set_default("response_root", "responses")?;

        if let Ok(config_path) = std::env::var("CARDSCAN_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/cardscan").required(false))
            .add_source(
                config::Environment::with_prefix("CARDSCAN")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: RotationSettings = builder.build()?.try_deserialize()?;
        let config = settings.resolve();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: RotationSettings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        let config = settings.resolve();
        config.validate()?;
        Ok(config)
    }

    /// Build a config from the environment defaults table with the standard
    /// `logs/` and `responses/` roots.
    pub fn for_environment(environment: Environment) -> Self {
        RotationSettings {
            environment,
            granularity: None,
            keep_log_days: None,
            keep_response_days: None,
            log_root: PathBuf::from("logs"),
            response_root: PathBuf::from("responses"),
        }
        .resolve()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_root == self.response_root {
            return Err(ConfigError::Message(
                "log_root and response_root must be distinct directories".to_string(),
            ));
        }
        if self.log_root.as_os_str().is_empty() || self.response_root.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "category root paths must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Root directory for a category.
    pub fn root(&self, category: OutputCategory) -> &Path {
        match category {
            OutputCategory::Logs => &self.log_root,
            OutputCategory::Responses => &self.response_root,
        }
    }

    /// Retention window in days for a category.
    pub fn retention_days(&self, category: OutputCategory) -> u32 {
        match category {
            OutputCategory::Logs => self.keep_log_days,
            OutputCategory::Responses => self.keep_response_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_environment_defaults_table() {
        assert_eq!(
            Environment::Dev.default_granularity(),
            RotationGranularity::Weekly
        );
        assert_eq!(Environment::Dev.default_retention_days(), 30);
        assert_eq!(
            Environment::Production.default_granularity(),
            RotationGranularity::Daily
        );
        assert_eq!(Environment::Production.default_retention_days(), 7);
    }

    #[test]
    fn test_for_environment_dev() {
        let config = RotationConfig::for_environment(Environment::Dev);
        assert_eq!(config.granularity, RotationGranularity::Weekly);
        assert_eq!(config.keep_log_days, 30);
        assert_eq!(config.keep_response_days, 30);
        assert_eq!(config.root(OutputCategory::Logs), Path::new("logs"));
        assert_eq!(
            config.root(OutputCategory::Responses),
            Path::new("responses")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_environment_production() {
        let config = RotationConfig::for_environment(Environment::Production);
        assert_eq!(config.granularity, RotationGranularity::Daily);
        assert_eq!(config.retention_days(OutputCategory::Logs), 7);
        assert_eq!(config.retention_days(OutputCategory::Responses), 7);
    }

    #[test]
    fn test_explicit_override_beats_environment_default() {
        let config = RotationSettings {
            environment: Environment::Production,
            granularity: Some(RotationGranularity::Monthly),
            keep_log_days: Some(90),
            keep_response_days: None,
            log_root: PathBuf::from("logs"),
            response_root: PathBuf::from("responses"),
        }
        .resolve();

        assert_eq!(config.granularity, RotationGranularity::Monthly);
        assert_eq!(config.keep_log_days, 90);
        // Unset fields still fall back to the environment default.
        assert_eq!(config.keep_response_days, 7);
    }

    #[test]
    fn test_validation_rejects_shared_root() {
        let mut config = RotationConfig::for_environment(Environment::Dev);
        config.response_root = config.log_root.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardscan.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "environment = \"production\"\n\
             granularity = \"monthly\"\n\
             keep_log_days = 14\n\
             log_root = \"/var/cardscan/logs\"\n\
             response_root = \"/var/cardscan/responses\""
        )
        .unwrap();

        let config = RotationConfig::from_file(&path).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.granularity, RotationGranularity::Monthly);
        assert_eq!(config.keep_log_days, 14);
        // Absent retention falls back to the production default.
        assert_eq!(config.keep_response_days, 7);
    }

    #[test]
    fn test_period_days() {
        assert_eq!(RotationGranularity::Daily.period_days(), 1);
        assert_eq!(RotationGranularity::Weekly.period_days(), 7);
        assert_eq!(RotationGranularity::Monthly.period_days(), 31);
    }
}
