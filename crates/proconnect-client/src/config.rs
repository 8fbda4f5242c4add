//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the core can run with zero configuration
//! against an in-process store.

use std::sync::Arc;
use std::time::Duration;

use proconnect_shared::constants::MAX_MESSAGE_LEN;
use proconnect_store::{MemoryStore, RealtimeStore, RestConfig, RestStore, StoreError};
use tracing::{info, warn};

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the hosted realtime database.
    /// Env: `PROCONNECT_DATABASE_URL`
    /// Default: none (in-process store).
    pub database_url: Option<String>,

    /// Token appended as `auth=` to every REST request.
    /// Env: `PROCONNECT_AUTH_TOKEN`
    pub auth_token: Option<String>,

    /// Timeout for one-shot store requests.
    /// Env: `PROCONNECT_REQUEST_TIMEOUT_SECS`
    /// Default: 15 s
    pub request_timeout: Duration,

    /// Longest accepted chat message, in characters.
    /// Env: `PROCONNECT_MAX_MESSAGE_LEN`
    /// Default: 500
    pub max_message_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            request_timeout: Duration::from_secs(15),
            max_message_len: MAX_MESSAGE_LEN,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("PROCONNECT_DATABASE_URL") {
            let url = url.trim();
            if !url.is_empty() {
                config.database_url = Some(url.to_string());
            }
        }

        if let Some(token) = lookup("PROCONNECT_AUTH_TOKEN") {
            if !token.is_empty() {
                config.auth_token = Some(token);
            }
        }

        if let Some(val) = lookup("PROCONNECT_REQUEST_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(
                    value = %val,
                    "Invalid PROCONNECT_REQUEST_TIMEOUT_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("PROCONNECT_MAX_MESSAGE_LEN") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_message_len = n,
                _ => warn!(value = %val, "Invalid PROCONNECT_MAX_MESSAGE_LEN, using default"),
            }
        }

        config
    }

    /// Build the store this configuration points at.
    pub fn connect_store(&self) -> Result<Arc<dyn RealtimeStore>, StoreError> {
        match &self.database_url {
            Some(url) => {
                let store = RestStore::new(RestConfig {
                    base_url: url.clone(),
                    auth_token: self.auth_token.clone(),
                    request_timeout: self.request_timeout,
                })?;
                Ok(Arc::new(store))
            }
            None => {
                info!("No PROCONNECT_DATABASE_URL set, using in-process store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.max_message_len, 500);
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("PROCONNECT_DATABASE_URL", " https://demo.example.com "),
            ("PROCONNECT_AUTH_TOKEN", "tok"),
            ("PROCONNECT_REQUEST_TIMEOUT_SECS", "3"),
            ("PROCONNECT_MAX_MESSAGE_LEN", "120"),
        ]);
        assert_eq!(config.database_url.as_deref(), Some("https://demo.example.com"));
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_message_len, 120);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[
            ("PROCONNECT_DATABASE_URL", "   "),
            ("PROCONNECT_REQUEST_TIMEOUT_SECS", "soon"),
            ("PROCONNECT_MAX_MESSAGE_LEN", "0"),
        ]);
        assert_eq!(config, ClientConfig::default());
    }

    #[tokio::test]
    async fn test_connect_store_without_url_is_in_memory() {
        let store = ClientConfig::default().connect_store().unwrap();
        let path = proconnect_store::StorePath::parse("users/u1/name").unwrap();
        store.write(&path, serde_json::json!("Ada")).await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), Some(serde_json::json!("Ada")));
    }

    #[test]
    fn test_connect_store_rejects_bad_url() {
        let config = ClientConfig {
            database_url: Some("not a url".into()),
            ..ClientConfig::default()
        };
        assert!(matches!(config.connect_store(), Err(StoreError::InvalidUrl(_))));
    }
}
