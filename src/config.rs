//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::plans::HttpGeneratorConfig;
use crate::store::AutoSaveConfig;
use crate::store::libsql_backend::settings_keys;

/// Which plan generator backs the generation step.
#[derive(Debug, Clone)]
pub enum GeneratorBackend {
    /// Local deterministic templates.
    Template,
    /// Remote plan service.
    Http(HttpGeneratorConfig),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// libSQL database file. `None` keeps snapshots in memory.
    pub db_path: Option<PathBuf>,
    /// User the stored snapshot and profile belong to.
    pub user_id: String,
    pub autosave: AutoSaveConfig,
    pub generator: GeneratorBackend,
    /// Directory for the daily rolling log file, if any.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: None,
            user_id: settings_keys::DEFAULT_USER.to_string(),
            autosave: AutoSaveConfig::default(),
            generator: GeneratorBackend::Template,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Read `FITFLOW_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&var, "FITFLOW_PORT", defaults.port)?;
        let db_path = var("FITFLOW_DB_PATH").map(PathBuf::from);
        let user_id = var("FITFLOW_USER_ID").unwrap_or(defaults.user_id);
        let log_dir = var("FITFLOW_LOG_DIR").map(PathBuf::from);

        let debounce_ms: u64 = parse_or(
            &var,
            "FITFLOW_AUTOSAVE_DEBOUNCE_MS",
            defaults.autosave.debounce.as_millis() as u64,
        )?;
        let max_retries = parse_or(&var, "FITFLOW_SAVE_RETRIES", defaults.autosave.max_retries)?;
        let autosave = AutoSaveConfig {
            debounce: Duration::from_millis(debounce_ms),
            max_retries,
            ..defaults.autosave
        };

        let generator = match var("FITFLOW_PLAN_ENDPOINT") {
            Some(endpoint) => {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        key: "FITFLOW_PLAN_ENDPOINT".to_string(),
                        message: format!("expected an http(s) URL, got {endpoint:?}"),
                    });
                }
                let timeout_secs: u64 = parse_or(&var, "FITFLOW_PLAN_TIMEOUT_SECS", 30)?;
                let mut http = HttpGeneratorConfig::new(endpoint);
                http.timeout = Duration::from_secs(timeout_secs);
                http.api_key = var("FITFLOW_PLAN_API_KEY").map(SecretString::from);
                GeneratorBackend::Http(http)
            }
            None => GeneratorBackend::Template,
        };

        Ok(Self {
            port,
            db_path,
            user_id,
            autosave,
            generator,
            log_dir,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.db_path.is_none());
        assert_eq!(config.user_id, "default");
        assert_eq!(config.autosave.debounce, Duration::from_millis(500));
        assert_eq!(config.autosave.max_retries, 0);
        assert!(matches!(config.generator, GeneratorBackend::Template));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("FITFLOW_PORT", "9090"),
            ("FITFLOW_DB_PATH", "/tmp/fitflow.db"),
            ("FITFLOW_USER_ID", "alice"),
            ("FITFLOW_AUTOSAVE_DEBOUNCE_MS", "50"),
            ("FITFLOW_SAVE_RETRIES", "3"),
            ("FITFLOW_LOG_DIR", "/var/log/fitflow"),
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/fitflow.db")));
        assert_eq!(config.user_id, "alice");
        assert_eq!(config.autosave.debounce, Duration::from_millis(50));
        assert_eq!(config.autosave.max_retries, 3);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/fitflow")));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("FITFLOW_PORT", "  "), ("FITFLOW_USER_ID", "")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.user_id, "default");
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config(&[("FITFLOW_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FITFLOW_PORT"));

        let err = config(&[("FITFLOW_SAVE_RETRIES", "-1")]).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FITFLOW_SAVE_RETRIES")
        );
    }

    #[test]
    fn plan_endpoint_selects_http_generator() {
        let config = config(&[
            ("FITFLOW_PLAN_ENDPOINT", "https://plans.example.com/v1/plans"),
            ("FITFLOW_PLAN_API_KEY", "sk-test"),
            ("FITFLOW_PLAN_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        let GeneratorBackend::Http(http) = config.generator else {
            panic!("expected http generator");
        };
        assert_eq!(http.endpoint, "https://plans.example.com/v1/plans");
        assert_eq!(http.timeout, Duration::from_secs(5));
        assert_eq!(http.api_key.unwrap().expose_secret(), "sk-test");
    }

    #[test]
    fn plan_endpoint_must_be_http() {
        let err = config(&[("FITFLOW_PLAN_ENDPOINT", "ftp://plans")]).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FITFLOW_PLAN_ENDPOINT")
        );
    }
}
