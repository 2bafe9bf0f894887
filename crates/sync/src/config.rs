//! Session configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; with none set the session runs in degraded
//! mode with a locally generated visitor id.
//!
//! - `VIVA_PROVIDER_CONFIG` - JSON connection descriptor for the hosted
//!   identity/document provider, e.g. `{"apiKey": "...", "projectId": "..."}`
//! - `VIVA_APP_ID` - Application namespace for stored documents (default: `default-app-id`)
//! - `VIVA_INITIAL_AUTH_TOKEN` - Pre-issued custom sign-in token
//! - `VIVA_WATCH_INTERVAL_SECS` - Polling interval of the hosted document watch (default: 2)
//! - `VIVA_NOTIFICATION_TTL_MS` - How long a notification stays visible (default: 3000)
//! - `VIVA_STATE_FILE` - Where the signed-in visitor is saved between runs
//!   (default: `$HOME/.viva/session.json`)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Application namespace used when `VIVA_APP_ID` is unset.
pub const DEFAULT_APP_ID: &str = "default-app-id";

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 2;
const DEFAULT_NOTIFICATION_TTL_MS: u64 = 3000;

const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid provider descriptor: {0}")]
    InvalidProvider(String),
}

/// Synchronizer configuration.
#[derive(Clone)]
pub struct SessionConfig {
    /// Raw provider connection descriptor. `None` selects degraded mode.
    pub provider: Option<SecretString>,
    /// Namespace under which favorites documents are stored.
    pub app_id: String,
    /// Custom token tried before anonymous sign-in.
    pub initial_auth_token: Option<SecretString>,
    /// Polling interval for hosted document watches.
    pub watch_interval: Duration,
    /// Lifetime of a posted notification.
    pub notification_ttl: Duration,
    /// File that keeps the signed-in visitor across runs. `None` keeps the
    /// identity for the lifetime of the session only.
    pub state_file: Option<PathBuf>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<SecretString>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SessionConfig")
            .field("provider", &redact(&self.provider))
            .field("app_id", &self.app_id)
            .field("initial_auth_token", &redact(&self.initial_auth_token))
            .field("watch_interval", &self.watch_interval)
            .field("notification_ttl", &self.notification_ttl)
            .field("state_file", &self.state_file)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider: None,
            app_id: DEFAULT_APP_ID.to_string(),
            initial_auth_token: None,
            watch_interval: Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS),
            notification_ttl: Duration::from_millis(DEFAULT_NOTIFICATION_TTL_MS),
            state_file: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a numeric variable is not a valid number. A
    /// malformed provider descriptor is not an error here; it is detected at
    /// connect time and selects degraded mode.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`SessionConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let watch_interval = Duration::from_secs(parse_u64(
            "VIVA_WATCH_INTERVAL_SECS",
            non_empty("VIVA_WATCH_INTERVAL_SECS"),
            DEFAULT_WATCH_INTERVAL_SECS,
        )?);
        if watch_interval.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "VIVA_WATCH_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            provider: non_empty("VIVA_PROVIDER_CONFIG").map(SecretString::from),
            app_id: non_empty("VIVA_APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            initial_auth_token: non_empty("VIVA_INITIAL_AUTH_TOKEN").map(SecretString::from),
            watch_interval,
            notification_ttl: Duration::from_millis(parse_u64(
                "VIVA_NOTIFICATION_TTL_MS",
                non_empty("VIVA_NOTIFICATION_TTL_MS"),
                DEFAULT_NOTIFICATION_TTL_MS,
            )?),
            state_file: non_empty("VIVA_STATE_FILE")
                .map(PathBuf::from)
                .or_else(|| non_empty("HOME").map(|home| default_state_file(&home))),
        })
    }
}

/// Connection settings for the hosted provider, parsed from the descriptor.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: SecretString,
    pub project_id: String,
    /// Identity Toolkit base URL (overridable for emulators).
    pub identity_endpoint: String,
    /// Firestore REST base URL (overridable for emulators).
    pub firestore_endpoint: String,
    /// Secure Token base URL, used to restore a saved sign-in.
    pub token_endpoint: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("firestore_endpoint", &self.firestore_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    api_key: Option<String>,
    project_id: Option<String>,
    identity_endpoint: Option<String>,
    firestore_endpoint: Option<String>,
    token_endpoint: Option<String>,
}

impl ProviderConfig {
    /// Parse the JSON descriptor. Unknown keys (`authDomain`, `appId`, ...)
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProvider`] for malformed JSON or a
    /// missing/blank `apiKey` or `projectId`.
    pub fn parse(descriptor: &SecretString) -> Result<Self, ConfigError> {
        let raw: RawDescriptor = serde_json::from_str(descriptor.expose_secret())
            .map_err(|e| ConfigError::InvalidProvider(e.to_string()))?;

        let required = |value: Option<String>, key: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::InvalidProvider(format!("missing {key}")))
        };

        Ok(Self {
            api_key: SecretString::from(required(raw.api_key, "apiKey")?),
            project_id: required(raw.project_id, "projectId")?,
            identity_endpoint: raw
                .identity_endpoint
                .unwrap_or_else(|| DEFAULT_IDENTITY_ENDPOINT.to_string()),
            firestore_endpoint: raw
                .firestore_endpoint
                .unwrap_or_else(|| DEFAULT_FIRESTORE_ENDPOINT.to_string()),
            token_endpoint: raw
                .token_endpoint
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_state_file(home: &str) -> PathBuf {
    PathBuf::from(home).join(".viva").join("session.json")
}

fn parse_u64(key: &str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    value.map_or(Ok(default), |v| {
        v.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.provider.is_none());
        assert!(config.initial_auth_token.is_none());
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.watch_interval, Duration::from_secs(2));
        assert_eq!(config.notification_ttl, Duration::from_millis(3000));
        assert!(config.state_file.is_none());
    }

    #[test]
    fn test_state_file_location() {
        let config = SessionConfig::from_lookup(lookup(&[("HOME", "/home/ana")])).unwrap();
        assert_eq!(
            config.state_file.unwrap(),
            PathBuf::from("/home/ana/.viva/session.json")
        );

        let config = SessionConfig::from_lookup(lookup(&[
            ("HOME", "/home/ana"),
            ("VIVA_STATE_FILE", "/tmp/viva.json"),
        ]))
        .unwrap();
        assert_eq!(config.state_file.unwrap(), PathBuf::from("/tmp/viva.json"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("VIVA_PROVIDER_CONFIG", "  "),
            ("VIVA_APP_ID", ""),
        ]))
        .unwrap();
        assert!(config.provider.is_none());
        assert_eq!(config.app_id, DEFAULT_APP_ID);
    }

    #[test]
    fn test_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("VIVA_PROVIDER_CONFIG", r#"{"apiKey":"k","projectId":"p"}"#),
            ("VIVA_APP_ID", "vivamais-prod"),
            ("VIVA_INITIAL_AUTH_TOKEN", "tok"),
            ("VIVA_WATCH_INTERVAL_SECS", "5"),
            ("VIVA_NOTIFICATION_TTL_MS", "1500"),
        ]))
        .unwrap();
        assert!(config.provider.is_some());
        assert_eq!(config.app_id, "vivamais-prod");
        assert_eq!(config.watch_interval, Duration::from_secs(5));
        assert_eq!(config.notification_ttl, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_numbers() {
        let result = SessionConfig::from_lookup(lookup(&[("VIVA_WATCH_INTERVAL_SECS", "soon")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));

        let zero = SessionConfig::from_lookup(lookup(&[("VIVA_WATCH_INTERVAL_SECS", "0")]));
        assert!(zero.is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("VIVA_PROVIDER_CONFIG", r#"{"apiKey":"super_secret_api_key"}"#),
            ("VIVA_INITIAL_AUTH_TOKEN", "super_secret_token"),
        ]))
        .unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key"));
        assert!(!debug_output.contains("super_secret_token"));
    }

    #[test]
    fn test_provider_parse() {
        let descriptor = SecretString::from(
            r#"{"apiKey":"AIza-key","authDomain":"x.firebaseapp.com","projectId":"viva-mais"}"#,
        );
        let provider = ProviderConfig::parse(&descriptor).unwrap();
        assert_eq!(provider.project_id, "viva-mais");
        assert_eq!(provider.api_key.expose_secret(), "AIza-key");
        assert_eq!(provider.firestore_endpoint, DEFAULT_FIRESTORE_ENDPOINT);
        assert_eq!(provider.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert!(!format!("{provider:?}").contains("AIza-key"));
    }

    #[test]
    fn test_provider_parse_errors() {
        for bad in ["not json", r#"{"projectId":"p"}"#, r#"{"apiKey":"k","projectId":" "}"#] {
            let result = ProviderConfig::parse(&SecretString::from(bad));
            assert!(
                matches!(result, Err(ConfigError::InvalidProvider(_))),
                "{bad}"
            );
        }
    }
}
