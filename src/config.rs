//! Client configuration loading: a JSON file with environment overrides.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::live::LiveConfig;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RINGSIDE_CONFIG_PATH";
/// Environment variable overriding the REST base URL.
const API_URL_ENV: &str = "RINGSIDE_API_URL";
/// Environment variable overriding the live channel endpoint.
const WS_URL_ENV: &str = "RINGSIDE_WS_URL";
/// Environment variable selecting a file for the persisted session.
const STORAGE_PATH_ENV: &str = "RINGSIDE_STORAGE_PATH";

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
/// Immutable runtime configuration shared across the client.
pub struct ClientConfig {
    /// Backend origin; REST calls go to `{api_base_url}/api`.
    #[validate(url)]
    pub api_base_url: String,
    /// Live channel handshake endpoint.
    #[validate(url)]
    pub ws_url: String,
    /// Per-request timeout for REST calls.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "request_timeout_ms")]
    #[validate(custom(function = "validate_non_zero"))]
    pub request_timeout: Duration,
    /// Client-side bound on the live channel handshake.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "connect_timeout_ms")]
    #[validate(custom(function = "validate_non_zero"))]
    pub connect_timeout: Duration,
    /// Delay before reconnecting a dropped live channel; zero disables reconnection.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "reconnect_delay_ms")]
    pub reconnect_delay: Duration,
    /// Heartbeat interval we expect from the broker; zero disables.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "heartbeat_incoming_ms")]
    pub heartbeat_incoming: Duration,
    /// Heartbeat interval we offer to the broker; zero disables.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "heartbeat_outgoing_ms")]
    pub heartbeat_outgoing: Duration,
    /// File holding the persisted session. `None` keeps it in memory.
    pub storage_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Load the configuration from disk and the environment, falling back to defaults.
    pub fn load() -> Self {
        let mut config = Self::load_from(&resolve_config_path());
        config.apply_overrides(|name| env::var(name).ok());
        if let Err(err) = config.validate() {
            warn!(error = %err, "environment overrides are invalid; using built-in defaults");
            return Self::default();
        }
        config
    }

    /// Read and validate the JSON file at `path`, falling back to defaults on any problem.
    pub fn load_from(path: &PathBuf) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        info!(path = %path.display(), "loaded client config");
                        config
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "config failed validation; falling back to defaults"
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = lookup(API_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV) {
            self.ws_url = url;
        }
        if let Some(path) = lookup(STORAGE_PATH_ENV) {
            self.storage_path = Some(PathBuf::from(path));
        }
    }

    /// Settings consumed by the live channel.
    pub fn live(&self) -> LiveConfig {
        LiveConfig {
            url: self.ws_url.clone(),
            connect_timeout: self.connect_timeout,
            reconnect_delay: self.reconnect_delay,
            heartbeat_incoming: self.heartbeat_incoming,
            heartbeat_outgoing: self.heartbeat_outgoing,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081".into(),
            ws_url: "ws://localhost:8081/ws/websocket".into(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
            heartbeat_incoming: Duration::from_secs(4),
            heartbeat_outgoing: Duration::from_secs(4),
            storage_path: None,
        }
    }
}

fn validate_non_zero(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        let mut err = ValidationError::new("duration_zero");
        err.message = Some("duration must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"api_base_url": "https://fights.example.org", "connect_timeout_ms": 2500}"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://fights.example.org");
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.ws_url, "ws://localhost:8081/ws/websocket");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeouts_and_bad_urls_fail_validation() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"request_timeout_ms": 0}"#).unwrap();
        assert!(config.validate().is_err());

        let config: ClientConfig = serde_json::from_str(r#"{"ws_url": "not a url"}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut config = ClientConfig::default();
        config.apply_overrides(|name| match name {
            API_URL_ENV => Some("http://10.0.0.5:8081".into()),
            WS_URL_ENV => Some("   ".into()),
            STORAGE_PATH_ENV => Some("/tmp/ringside-session.json".into()),
            _ => None,
        });

        assert_eq!(config.api_base_url, "http://10.0.0.5:8081");
        assert_eq!(config.ws_url, ClientConfig::default().ws_url);
        assert_eq!(
            config.storage_path,
            Some(PathBuf::from("/tmp/ringside-session.json"))
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = env::temp_dir().join("ringside-does-not-exist/client.json");
        assert_eq!(ClientConfig::load_from(&path), ClientConfig::default());
    }
}
