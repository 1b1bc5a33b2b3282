//! Relay configuration.
//!
//! Loaded from an optional TOML file; every key has a default so an empty file (or no
//! file at all) gives a working relay on `127.0.0.1:8080`.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::usecase::RelayPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,

    /// Record and broadcast a `system` message when a participant disconnects
    pub announce_leave: bool,

    /// Joins of the same client within this window after its join time are not replayed
    pub rejoin_window_ms: i64,

    /// Delay between the `session_end` notice and the forced close of remaining sockets
    pub close_grace_period_ms: u64,

    /// Upper bound on the body of a chat message, in characters
    pub max_message_length: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let policy = RelayPolicy::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            announce_leave: policy.announce_leave,
            rejoin_window_ms: policy.rejoin_window_ms,
            close_grace_period_ms: policy.close_grace_period.as_millis() as u64,
            max_message_length: policy.max_message_length,
        }
    }
}

impl RelayConfig {
    /// Load config from `path`, or return defaults if no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rejoin_window_ms < 0 {
            return Err(ConfigError::Invalid(
                "rejoin_window_ms must not be negative".to_string(),
            ));
        }
        if self.max_message_length == 0 {
            return Err(ConfigError::Invalid(
                "max_message_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> RelayPolicy {
        RelayPolicy {
            announce_leave: self.announce_leave,
            rejoin_window_ms: self.rejoin_window_ms,
            close_grace_period: Duration::from_millis(self.close_grace_period_ms),
            max_message_length: self.max_message_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        // テスト項目: 空の設定ファイルはデフォルト値になる
        // given (前提条件):
        let content = "";

        // when (操作):
        let config = RelayConfig::from_toml(content).unwrap();

        // then (期待する結果):
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.policy(), RelayPolicy::default());
    }

    #[test]
    fn test_partial_file_overrides_given_keys() {
        // テスト項目: 指定したキーだけが上書きされる
        // given (前提条件):
        let content = r#"
            port = 9000
            announce_leave = true
            close_grace_period_ms = 500
        "#;

        // when (操作):
        let config = RelayConfig::from_toml(content).unwrap();

        // then (期待する結果):
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        let policy = config.policy();
        assert!(policy.announce_leave);
        assert_eq!(policy.close_grace_period, Duration::from_millis(500));
        assert_eq!(policy.rejoin_window_ms, 1000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        // テスト項目: 負の rejoin_window_ms や 0 の max_message_length はエラー
        assert!(matches!(
            RelayConfig::from_toml("rejoin_window_ms = -1"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RelayConfig::from_toml("max_message_length = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        // テスト項目: 型の合わない値はパースエラー
        let result = RelayConfig::from_toml("port = \"eighty\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_without_path_gives_defaults() {
        // テスト項目: パス未指定ならデフォルト値
        assert_eq!(RelayConfig::load(None).unwrap(), RelayConfig::default());
    }
}
