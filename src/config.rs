use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::input::{CommandInterpreter, KeyBindings, KeymapError};
use crate::scheduler::{
    Chances, ScheduleConfig, DEFAULT_SUPPRESSION_THRESHOLD, DEFAULT_TICK_PERIOD,
};

pub const DEFAULT_BIND: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000));
pub const DEFAULT_MAX_PEERS: usize = 256;

/// Top-level config, loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerSection,
    pub schedule: ScheduleSection,
    pub keys: KeyBindings,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Upgrades beyond this many connected peers are refused.
    pub max_peers: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            max_peers: DEFAULT_MAX_PEERS,
        }
    }
}

/// `[schedule]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    pub tick_ms: u64,
    pub suppression_threshold: u32,
    pub chances: Chances,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_PERIOD.as_millis() as u64,
            suppression_threshold: DEFAULT_SUPPRESSION_THRESHOLD,
            chances: Chances::default(),
        }
    }
}

impl ScheduleSection {
    pub fn to_schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            period: Duration::from_millis(self.tick_ms),
            suppression_threshold: self.suppression_threshold,
            chances: self.chances,
        }
    }
}

impl Config {
    /// Load config from a TOML file path. Returns None if file doesn't exist.
    ///
    /// Not validated here; command-line overrides may still replace values.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Some(config))
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.tick_ms == 0 {
            return Err(ConfigError::Invalid("schedule.tick_ms must be > 0".into()));
        }
        let chances = &self.schedule.chances;
        for (name, value) in [
            ("wiggle", chances.wiggle),
            ("click", chances.click),
            ("capitalize", chances.capitalize),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "schedule.chances.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.server.max_peers == 0 {
            return Err(ConfigError::Invalid("server.max_peers must be > 0".into()));
        }
        self.interpreter()?;
        Ok(())
    }

    /// Build the key table for this config.
    pub fn interpreter(&self) -> Result<CommandInterpreter, ConfigError> {
        Ok(CommandInterpreter::new(self.keys.clone())?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)
    }
}

/// `$XDG_CONFIG_HOME/pester/config.toml` or the platform equivalent.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pester").join("config.toml"))
}

/// Errors that can occur when loading config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[source] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid key bindings: {0}")]
    Keys(#[from] KeymapError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(DEFAULT_BIND.to_string(), "0.0.0.0:3000");
        assert_eq!(config.server.max_peers, 256);
        assert_eq!(config.schedule.tick_ms, 1000);
        assert_eq!(config.schedule.suppression_threshold, 10);
        assert_eq!(config.keys.wiggle, 'w');
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            bind = "127.0.0.1:4000"
            max_peers = 8

            [schedule]
            tick_ms = 250
            suppression_threshold = 3

            [schedule.chances]
            wiggle = 0.5
            click = 0.0
            capitalize = 1.0

            [keys]
            wiggle = "m"
            rickroll = "x"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.bind.port(), 4000);
        assert_eq!(config.server.max_peers, 8);

        let schedule = config.schedule.to_schedule();
        assert_eq!(schedule.period, Duration::from_millis(250));
        assert_eq!(schedule.suppression_threshold, 3);
        assert_eq!(schedule.chances.wiggle, 0.5);
        assert_eq!(schedule.chances.capitalize, 1.0);

        assert_eq!(config.keys.wiggle, 'm');
        assert_eq!(config.keys.rickroll, 'x');
        assert_eq!(config.keys.click, 'r');
    }

    #[test]
    fn partial_chances_keep_defaults() {
        let config: Config = toml::from_str("[schedule.chances]\nclick = 0.9\n").unwrap();
        assert_eq!(config.schedule.chances.click, 0.9);
        assert_eq!(config.schedule.chances.wiggle, 0.4);
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(toml::from_str::<Config>("[server]\nport = 3000\n").is_err());
        assert!(toml::from_str::<Config>("[keys]\nquit = \"q\"\n").is_err());
    }

    #[test]
    fn out_of_range_chance_rejected() {
        let config: Config = toml::from_str("[schedule.chances]\nwiggle = 1.5\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_tick_rejected() {
        let config: Config = toml::from_str("[schedule]\ntick_ms = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let config: Config = toml::from_str("[keys]\nsleep = \"w\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Keys(_))));
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Config::load(&path).unwrap().is_none());
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schedule]\ntick_ms = 50").unwrap();
        let config = Config::load(file.path()).unwrap().unwrap();
        assert_eq!(config.schedule.tick_ms, 50);
    }

    #[test]
    fn load_leaves_validation_to_caller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nmax_peers = 0").unwrap();
        let config = Config::load(file.path()).unwrap().unwrap();
        assert_eq!(config.server.max_peers, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schedule").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn toml_output_parses_back() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("[schedule.chances]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn default_path_ends_with_pester() {
        if let Some(path) = default_path() {
            assert!(path.ends_with("pester/config.toml"));
        }
    }
}
