//! Warden configuration.
//!
//! Every section has defaults, so an empty JSON object is a valid
//! configuration. Durations are written as human-readable strings (`"5m"`,
//! `"32d"`); plain integers are read as seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_policy::validate_name;
use warden_token::TtlLimits;

use crate::error::{Error, Result};

const DAY: u64 = 24 * 60 * 60;

/// Limits for ordinary tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// TTL when a request names none.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Upper bound for any token TTL.
    #[serde(with = "humantime_serde")]
    pub max_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(32 * DAY),
            max_ttl: Duration::from_secs(32 * DAY),
        }
    }
}

/// Limits for wrapping tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrappingConfig {
    /// Wrap TTL when a request asks for wrapping without naming one.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Upper bound for any wrap TTL.
    #[serde(with = "humantime_serde")]
    pub max_ttl: Duration,
}

impl Default for WrappingConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            max_ttl: Duration::from_secs(DAY),
        }
    }
}

/// Background expiry sweeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Whether the sweeper task runs.
    pub enabled: bool,
    /// Time between passes.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
        }
    }
}

/// The AppRole mount enabled at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppRoleConfig {
    /// Mount name.
    pub mount: String,
    /// TTL of login tokens for roles that do not set one.
    #[serde(with = "humantime_serde")]
    pub default_token_ttl: Duration,
}

impl Default for AppRoleConfig {
    fn default() -> Self {
        Self {
            mount: "approle".to_string(),
            default_token_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Where state lives on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the store snapshot and barrier key. `None` keeps state
    /// in memory.
    pub data_dir: Option<PathBuf>,
}

/// Log output settings for binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Token limits.
    pub token: TokenConfig,
    /// Wrapping limits.
    pub wrapping: WrappingConfig,
    /// Background sweeping.
    pub sweep: SweepConfig,
    /// Startup AppRole mount.
    pub approle: AppRoleConfig,
    /// Storage location.
    pub storage: StorageConfig,
    /// Logging.
    pub log: LogConfig,
}

impl WardenConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::from_json(&content)
    }

    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| Error::config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = Some(dir.into());
        self
    }

    /// Sets the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep.interval = interval;
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        check_limits("token", self.token.default_ttl, self.token.max_ttl)?;
        check_limits("wrapping", self.wrapping.default_ttl, self.wrapping.max_ttl)?;
        if self.sweep.interval.is_zero() {
            return Err(Error::config("sweep.interval must be positive"));
        }
        if self.approle.default_token_ttl.is_zero() {
            return Err(Error::config("approle.default_token_ttl must be positive"));
        }
        validate_name(&self.approle.mount)
            .map_err(|e| Error::config(format!("approle.mount: {e}")))?;
        Ok(())
    }

    /// Token limits as the registry takes them.
    #[must_use]
    pub fn token_limits(&self) -> TtlLimits {
        TtlLimits::new(self.token.default_ttl, self.token.max_ttl)
    }

    /// Wrapping limits as the wrapping engine takes them.
    #[must_use]
    pub fn wrapping_limits(&self) -> TtlLimits {
        TtlLimits::new(self.wrapping.default_ttl, self.wrapping.max_ttl)
    }
}

fn check_limits(section: &str, default_ttl: Duration, max_ttl: Duration) -> Result<()> {
    if default_ttl.is_zero() || max_ttl.is_zero() {
        return Err(Error::config(format!("{section} TTLs must be positive")));
    }
    if default_ttl > max_ttl {
        return Err(Error::config(format!(
            "{section}.default_ttl cannot exceed {section}.max_ttl"
        )));
    }
    Ok(())
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => humantime::parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_are_valid() {
        let config = WardenConfig::default();
        config.validate().expect("valid");
        assert_eq!(config.wrapping.default_ttl, Duration::from_secs(300));
        assert_eq!(config.approle.mount, "approle");
        assert!(config.sweep.enabled);
    }

    #[test]
    fn empty_object_takes_defaults() {
        let config = WardenConfig::from_json("{}").expect("parse");
        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn durations_parse_from_text_and_seconds() {
        let config = WardenConfig::from_json(
            r#"{"wrapping": {"default_ttl": "2m", "max_ttl": 7200}, "sweep": {"interval": "30s"}}"#,
        )
        .expect("parse");
        assert_eq!(config.wrapping.default_ttl, Duration::from_secs(120));
        assert_eq!(config.wrapping.max_ttl, Duration::from_secs(7200));
        assert_eq!(config.sweep.interval, Duration::from_secs(30));
    }

    #[test]
    fn serializes_durations_as_text() {
        let json = serde_json::to_value(WardenConfig::default()).expect("serialize");
        assert_eq!(json["wrapping"]["default_ttl"], "5m");
        assert_eq!(json["sweep"]["interval"], "1m");
    }

    #[test_case(r#"{"token": {"default_ttl": "2d", "max_ttl": "1d"}}"# ; "default above max")]
    #[test_case(r#"{"wrapping": {"max_ttl": 0}}"# ; "zero max")]
    #[test_case(r#"{"sweep": {"interval": "0s"}}"# ; "zero interval")]
    #[test_case(r#"{"approle": {"mount": "bad mount"}}"# ; "bad mount")]
    #[test_case(r#"{"wrapping": {"default_ttl": "soon"}}"# ; "unparseable duration")]
    fn rejects(json: &str) {
        let err = WardenConfig::from_json(json).expect_err("should be rejected");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warden.json");
        std::fs::write(&path, r#"{"log": {"level": "debug", "json": true}}"#).expect("write");

        let config = WardenConfig::from_file(&path).expect("load");
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);

        let err = WardenConfig::from_file(dir.path().join("missing.json")).expect_err("missing");
        assert!(matches!(err, Error::File { .. }));
    }
}
