//! Application configuration.
//!
//! Economy tuning lives in a TOML file under the platform config
//! directory; any value can be overridden with a `TAPMINT_`-prefixed
//! environment variable (for example `TAPMINT_CONVERSION_RATE=500`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

/// Points awarded per accepted tap.
pub const DEFAULT_POINTS_PER_TAP: u64 = 1;
/// Points consumed per token when converting.
pub const DEFAULT_CONVERSION_RATE: u64 = 1_000;
/// Base points for the daily reward, before the streak multiplier.
pub const DEFAULT_DAILY_BONUS_POINTS: u64 = 100;
/// Maximum accepted taps per second.
pub const DEFAULT_TAP_LIMIT_PER_SECOND: u32 = 10;

/// Hard ceiling on the tap limit; keeps the per-tap interval at least 1 ms.
const MAX_TAP_LIMIT_PER_SECOND: u32 = 1_000;

const ENV_PREFIX: &str = "TAPMINT";

const DEFAULT_CONFIG_TOML: &str = "\
# tapmint configuration.
#
# Environment variables prefixed with TAPMINT_ override any value in
# this file, e.g. TAPMINT_CONVERSION_RATE=500.

# Points awarded per accepted tap.
points_per_tap = 1

# Points consumed per token when converting points to tokens.
conversion_rate = 1000

# Base points for the daily reward, before the streak multiplier.
daily_bonus_points = 100

# Maximum accepted taps per second.
tap_limit_per_second = 10

# Where state.json lives. Defaults to this file's directory.
# data_dir = \"/somewhere/else\"

# Fix the lucky-tap draws to a seed for reproducible sessions.
# luck_seed = 42
";

/// Economy and storage settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Points awarded per accepted tap.
    pub points_per_tap: u64,
    /// Points consumed per token when converting.
    pub conversion_rate: u64,
    /// Base points for the daily reward, before the streak multiplier.
    pub daily_bonus_points: u64,
    /// Maximum accepted taps per second.
    pub tap_limit_per_second: u32,
    /// Directory holding `state.json`; the config directory when unset.
    pub data_dir: Option<PathBuf>,
    /// Seed for the lucky-tap draws; OS entropy when unset.
    pub luck_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            points_per_tap: DEFAULT_POINTS_PER_TAP,
            conversion_rate: DEFAULT_CONVERSION_RATE,
            daily_bonus_points: DEFAULT_DAILY_BONUS_POINTS,
            tap_limit_per_second: DEFAULT_TAP_LIMIT_PER_SECOND,
            data_dir: None,
            luck_seed: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the default file path plus the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Loads configuration from `path` plus the environment.
    ///
    /// A missing file is fine; every field has a default.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to read configuration sources")?;
        let config: AppConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.points_per_tap == 0 {
            bail!("points_per_tap must be at least 1");
        }
        if self.conversion_rate == 0 {
            bail!("conversion_rate must be at least 1");
        }
        if self.tap_limit_per_second == 0 || self.tap_limit_per_second > MAX_TAP_LIMIT_PER_SECOND {
            bail!(
                "tap_limit_per_second must be between 1 and {MAX_TAP_LIMIT_PER_SECOND}, got {}",
                self.tap_limit_per_second
            );
        }
        Ok(())
    }

    /// Minimum milliseconds between accepted taps.
    pub fn min_tap_interval_ms(&self) -> i64 {
        (1_000 / u64::from(self.tap_limit_per_second)) as i64
    }

    /// Directory the state file lives in.
    pub fn state_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => config_dir(),
        }
    }
}

/// The application's directory under the platform config root.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tapmint")
}

/// Default path of the configuration file itself.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Writes a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("nope.toml"))?;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.min_tap_interval_ms(), 100);
        Ok(())
    }

    #[test]
    fn partial_file_overrides_only_named_fields() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "conversion_rate = 500\ntap_limit_per_second = 4\n")?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.conversion_rate, 500);
        assert_eq!(config.tap_limit_per_second, 4);
        assert_eq!(config.points_per_tap, DEFAULT_POINTS_PER_TAP);
        assert_eq!(config.daily_bonus_points, DEFAULT_DAILY_BONUS_POINTS);
        assert_eq!(config.min_tap_interval_ms(), 250);
        Ok(())
    }

    #[test]
    fn zero_conversion_rate_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "conversion_rate = 0\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn zero_points_per_tap_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "points_per_tap = 0\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn absurd_tap_limit_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "tap_limit_per_second = 5000\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn default_config_is_written_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tapmint").join("config.toml");
        write_default_config(&path)?;
        let written = fs::read_to_string(&path)?;
        assert!(written.contains("conversion_rate = 1000"));

        // A second call must not clobber user edits.
        fs::write(&path, "conversion_rate = 250\n")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "conversion_rate = 250\n");
        Ok(())
    }

    #[test]
    fn data_dir_steers_state_location() {
        let mut config = AppConfig::default();
        assert_eq!(config.state_dir(), config_dir());
        config.data_dir = Some(PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.state_dir(), PathBuf::from("/tmp/elsewhere"));
    }
}
