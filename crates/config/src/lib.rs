//! Configuration for the General Assembly engine
//!
//! A node reads an [`AssemblyConfig`] from a YAML file, or builds one from
//! `ICN_*` environment variables when no file is present. All durations are
//! in seconds.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const DAY: u64 = 86_400;
const WEEK: u64 = 7 * DAY;

/// Environment variable naming the configuration file
pub const CONFIG_FILE_ENV: &str = "ICN_ASSEMBLY_CONFIG";
/// Configuration file used when [`CONFIG_FILE_ENV`] is unset
pub const DEFAULT_CONFIG_FILE: &str = "assembly.yaml";

/// Errors that can occur in configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidEnvVar(String, String),

    #[error("Failed to read file: {0}")]
    FileReadError(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Timing rules for scheduling GAs and booking voting slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How far ahead a regular GA may be scheduled
    pub timespan_ga: u64,
    /// How far ahead an extraordinary GA may be scheduled
    pub timespan_ega: u64,
    /// A regular GA must start strictly later than now plus this
    pub closest_future_ga: u64,
    /// An extraordinary GA must start strictly later than now plus this
    pub closest_future_ega: u64,
    /// Minimum gap around a regular GA
    pub min_interval_ga: u64,
    /// Minimum gap around an extraordinary GA
    pub min_interval_ega: u64,
    /// Gap that must hold between any two GAs, whatever their category
    pub min_interval_cross: u64,
    /// Length of one proposal or election voting slot
    pub voting_duration: u64,
    /// Pause between consecutive voting slots
    pub inter_proposal_gap: u64,
    /// Duration given to extraordinary GAs convened by proposal
    pub extraordinary_ga_duration: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            timespan_ga: 104 * WEEK,
            timespan_ega: 26 * WEEK,
            closest_future_ga: 4 * WEEK,
            closest_future_ega: WEEK,
            min_interval_ga: 13 * WEEK,
            min_interval_ega: 2 * WEEK,
            min_interval_cross: DAY,
            voting_duration: 3_600,
            inter_proposal_gap: 300,
            extraordinary_ga_duration: DAY,
        }
    }
}

impl TimingConfig {
    /// Check that the rules can admit at least one GA
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("timespan_ga", self.timespan_ga),
            ("timespan_ega", self.timespan_ega),
            ("voting_duration", self.voting_duration),
            ("extraordinary_ga_duration", self.extraordinary_ga_duration),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
        }
        if self.closest_future_ga >= self.timespan_ga {
            return Err(ConfigError::Invalid(
                "closest_future_ga must be below timespan_ga".to_string(),
            ));
        }
        if self.closest_future_ega >= self.timespan_ega {
            return Err(ConfigError::Invalid(
                "closest_future_ega must be below timespan_ega".to_string(),
            ));
        }
        Ok(())
    }
}

/// Node-level configuration for a General Assembly host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Directory holding persisted state
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Identity allowed to conclude elections and apply statute updates
    pub operator: String,
    /// Identity of the proposal collaborator relaying member actions
    pub proposal_gateway: String,
    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_data_dir() -> String {
    "/var/lib/icn/assembly".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AssemblyConfig {
    /// Load from the file named by `ICN_ASSEMBLY_CONFIG` (or `assembly.yaml`)
    /// when it exists, otherwise from environment variables
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        if Path::new(&path).exists() {
            return Self::from_file(&path);
        }
        Self::from_env()
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("{}: {}", path.display(), e)))?;
        let config: AssemblyConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded assembly configuration from {}", path.display());
        Ok(config)
    }

    /// Build configuration from `ICN_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ConfigError::EnvVarNotFound(key.to_string()))
        };
        let seconds = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(v) => v
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
                None => Ok(default),
            }
        };

        let defaults = TimingConfig::default();
        let timing = TimingConfig {
            timespan_ga: seconds("ICN_TIMESPAN_GA", defaults.timespan_ga)?,
            timespan_ega: seconds("ICN_TIMESPAN_EGA", defaults.timespan_ega)?,
            closest_future_ga: seconds("ICN_CLOSEST_FUTURE_GA", defaults.closest_future_ga)?,
            closest_future_ega: seconds("ICN_CLOSEST_FUTURE_EGA", defaults.closest_future_ega)?,
            min_interval_ga: seconds("ICN_MIN_INTERVAL_GA", defaults.min_interval_ga)?,
            min_interval_ega: seconds("ICN_MIN_INTERVAL_EGA", defaults.min_interval_ega)?,
            min_interval_cross: seconds("ICN_MIN_INTERVAL_CROSS", defaults.min_interval_cross)?,
            voting_duration: seconds("ICN_VOTING_DURATION", defaults.voting_duration)?,
            inter_proposal_gap: seconds("ICN_INTER_PROPOSAL_GAP", defaults.inter_proposal_gap)?,
            extraordinary_ga_duration: seconds(
                "ICN_EXTRAORDINARY_GA_DURATION",
                defaults.extraordinary_ga_duration,
            )?,
        };

        let config = AssemblyConfig {
            data_dir: lookup("ICN_DATA_DIR").unwrap_or_else(default_data_dir),
            log_level: lookup("ICN_LOG_LEVEL").unwrap_or_else(default_log_level),
            operator: required("ICN_OPERATOR")?,
            proposal_gateway: required("ICN_PROPOSAL_GATEWAY")?,
            timing,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate identities and timing rules
    pub fn validate(&self) -> Result<()> {
        if self.operator.trim().is_empty() {
            return Err(ConfigError::Invalid("operator identity is empty".to_string()));
        }
        if self.proposal_gateway.trim().is_empty() {
            return Err(ConfigError::Invalid("proposal gateway identity is empty".to_string()));
        }
        self.timing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_env() {
        let config = AssemblyConfig::from_lookup(lookup_from(&[
            ("ICN_OPERATOR", "did:icn:operator"),
            ("ICN_PROPOSAL_GATEWAY", "did:icn:proposals"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, "/var/lib/icn/assembly");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.timing.min_interval_ga, 13 * WEEK);
    }

    #[test]
    fn test_env_overrides_and_errors() {
        let config = AssemblyConfig::from_lookup(lookup_from(&[
            ("ICN_OPERATOR", "op"),
            ("ICN_PROPOSAL_GATEWAY", "gw"),
            ("ICN_VOTING_DURATION", "600"),
        ]))
        .unwrap();
        assert_eq!(config.timing.voting_duration, 600);

        let missing = AssemblyConfig::from_lookup(lookup_from(&[("ICN_OPERATOR", "op")]));
        assert!(matches!(missing, Err(ConfigError::EnvVarNotFound(ref k)) if k == "ICN_PROPOSAL_GATEWAY"));

        let bad = AssemblyConfig::from_lookup(lookup_from(&[
            ("ICN_OPERATOR", "op"),
            ("ICN_PROPOSAL_GATEWAY", "gw"),
            ("ICN_MIN_INTERVAL_GA", "soon"),
        ]));
        assert!(matches!(bad, Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn test_from_file_with_partial_timing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "operator: did:icn:operator\nproposal_gateway: did:icn:proposals\ntiming:\n  voting_duration: 1800\n"
        )
        .unwrap();

        let config = AssemblyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timing.voting_duration, 1800);
        assert_eq!(config.timing.inter_proposal_gap, 300);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_unusable_timing() {
        let timing = TimingConfig {
            closest_future_ga: 10,
            timespan_ga: 10,
            ..TimingConfig::default()
        };
        assert!(timing.validate().is_err());

        let timing = TimingConfig {
            voting_duration: 0,
            ..TimingConfig::default()
        };
        assert!(matches!(timing.validate(), Err(ConfigError::Invalid(_))));
    }
}
