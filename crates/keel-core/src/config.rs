//! Service settings: built-in defaults, an optional TOML file, then
//! `KEEL_*` environment variable overrides, layered with figment.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Prefix for environment variable overrides (`KEEL_PORT`, `KEEL_LOG_LEVEL`, ...).
pub const ENV_PREFIX: &str = "KEEL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to load settings: {0}")]
    Load(String),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: String, value: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    /// Name of the environment this process runs in (free text).
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    /// Origins allowed by CORS. The environment form is comma-separated.
    #[serde(deserialize_with = "list_or_csv")]
    pub cors_origins: Vec<String>,
    /// Default tracing filter directive; `RUST_LOG` takes precedence.
    pub log_level: String,
    /// `json` or `text`.
    pub log_format: String,
    pub enable_metrics: bool,
    /// TTL for cached host probe results.
    pub metrics_cache_ttl_secs: u64,
    pub cache_cleanup_interval_secs: u64,
    /// Number of response-time samples kept for the rolling average.
    pub response_time_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Keel Deployment Tracker".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "production".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            enable_metrics: true,
            metrics_cache_ttl_secs: 5,
            cache_cleanup_interval_secs: 60,
            response_time_window: 1000,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            // Toml::file skips missing files; an explicit path must exist.
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        let settings: Settings = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, value: &str| ConfigError::Invalid {
            name: name.to_string(),
            value: value.to_string(),
        };

        // The API is nested under the prefix, which cannot be the root.
        if !self.api_prefix.starts_with('/') || self.api_prefix.len() < 2 {
            return Err(invalid("api_prefix", &self.api_prefix));
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            return Err(invalid("log_format", &self.log_format));
        }
        Ok(())
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accept either a list or a single comma-separated string.
fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(csv) => csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_service_conventions() {
        let s = Settings::default();
        assert_eq!(s.port, 8000);
        assert_eq!(s.api_prefix, "/api/v1");
        assert_eq!(s.response_time_window, 1000);
        assert!(s.enable_metrics);
    }

    #[test]
    fn load_without_file_or_env_gives_defaults() {
        Jail::expect_with(|_jail| {
            assert_eq!(Settings::load(None).unwrap(), Settings::default());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_fields() {
        Jail::expect_with(|jail| {
            jail.set_env("KEEL_PORT", "9001");
            jail.set_env("KEEL_LOG_FORMAT", "text");
            jail.set_env("KEEL_CORS_ORIGINS", "https://a.example, https://b.example");
            jail.set_env("KEEL_ENABLE_METRICS", "false");

            let s = Settings::load(None).unwrap();
            assert_eq!(s.port, 9001);
            assert_eq!(s.log_format, "text");
            assert_eq!(s.cors_origins, vec!["https://a.example", "https://b.example"]);
            assert!(!s.enable_metrics);
            Ok(())
        });
    }

    #[test]
    fn env_rejects_bad_port() {
        Jail::expect_with(|jail| {
            jail.set_env("KEEL_PORT", "eighty");
            let err = Settings::load(None).unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)), "{err}");
            Ok(())
        });
    }

    #[test]
    fn env_rejects_unknown_log_format() {
        Jail::expect_with(|jail| {
            jail.set_env("KEEL_LOG_FORMAT", "xml");
            assert!(matches!(
                Settings::load(None),
                Err(ConfigError::Invalid { ref name, .. }) if name == "log_format"
            ));
            Ok(())
        });
    }

    #[test]
    fn file_fills_missing_fields_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "keel.toml",
                "port = 8100\nenvironment = \"staging\"\ncors_origins = [\"https://c.example\"]\n",
            )?;

            let s = Settings::load(Some(Path::new("keel.toml"))).unwrap();
            assert_eq!(s.port, 8100);
            assert_eq!(s.environment, "staging");
            assert_eq!(s.cors_origins, vec!["https://c.example"]);
            assert_eq!(s.api_prefix, "/api/v1");
            Ok(())
        });
    }

    #[test]
    fn env_wins_over_file() {
        Jail::expect_with(|jail| {
            jail.create_file("keel.toml", "port = 8100\nlog_level = \"debug\"\n")?;
            jail.set_env("KEEL_PORT", "8200");

            let s = Settings::load(Some(Path::new("keel.toml"))).unwrap();
            assert_eq!(s.port, 8200);
            assert_eq!(s.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_load_error() {
        Jail::expect_with(|jail| {
            jail.create_file("keel.toml", "port = = 1")?;
            assert!(matches!(
                Settings::load(Some(Path::new("keel.toml"))),
                Err(ConfigError::Load(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Settings::load(Some(Path::new("/nonexistent/keel.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn validate_rejects_root_prefix_and_unknown_format() {
        assert!(Settings::default().validate().is_ok());

        let root = Settings {
            api_prefix: "/".to_string(),
            ..Settings::default()
        };
        assert!(matches!(root.validate(), Err(ConfigError::Invalid { .. })));

        let yaml = Settings {
            log_format: "yaml".to_string(),
            ..Settings::default()
        };
        assert!(yaml.validate().is_err());
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let s = Settings::default();
        assert_eq!(s.bind_address(), "0.0.0.0:8000");
    }
}
