//! Client configuration.
//!
//! Endpoints and timeouts are read from environment variables with the
//! defaults from [`notesense_core::defaults`]:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `NOTESENSE_API_URL` | `http://localhost:8080/api` |
//! | `NOTESENSE_AUTH_URL` | `http://localhost:8080` |
//! | `NOTESENSE_FILES_URL` | `http://localhost:8080` |
//! | `NOTESENSE_TIMEOUT_SECS` | `30` |
//! | `NOTESENSE_CREDENTIALS` | `$HOME/.config/notesense/credentials.json` |

use std::env;
use std::path::PathBuf;

use notesense_core::defaults;
use notesense_core::{Error, Result};
use tracing::debug;

/// Endpoints and timeouts for the NoteSense HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the notes API; note routes live under `{api_url}/notes`.
    pub api_url: String,
    /// Base URL of `/login`, `/signup` and `/logout`.
    pub auth_url: String,
    /// Base URL of the `/files` upload service.
    pub files_url: String,
    /// Timeout for note and auth requests.
    pub timeout_secs: u64,
    /// Timeout for attachment uploads.
    pub upload_timeout_secs: u64,
    /// Where the session credential is persisted. `None` keeps it in memory.
    pub credentials_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::API_URL.to_string(),
            auth_url: defaults::AUTH_URL.to_string(),
            files_url: defaults::FILES_URL.to_string(),
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            upload_timeout_secs: defaults::UPLOAD_TIMEOUT_SECS,
            credentials_path: default_credentials_path(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let fallback = Self::default();

        let api_url = env_url(defaults::ENV_API_URL).unwrap_or(fallback.api_url);
        let auth_url = env_url(defaults::ENV_AUTH_URL).unwrap_or(fallback.auth_url);
        let files_url = env_url(defaults::ENV_FILES_URL).unwrap_or(fallback.files_url);
        let timeout_secs = env::var(defaults::ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback.timeout_secs);

        let config = Self {
            api_url,
            auth_url,
            files_url,
            timeout_secs,
            upload_timeout_secs: fallback.upload_timeout_secs,
            credentials_path: fallback.credentials_path,
        };
        debug!(
            api_url = %config.api_url,
            auth_url = %config.auth_url,
            files_url = %config.files_url,
            timeout_secs = config.timeout_secs,
            "Loaded client config"
        );
        config
    }

    /// All three services behind one origin, as the stock server deploys
    /// them: notes under `{base}/api`, auth and files at the root.
    pub fn for_server(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            api_url: format!("{base}/api"),
            auth_url: base.to_string(),
            files_url: base.to_string(),
            credentials_path: None,
            ..Self::default()
        }
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api_url", &self.api_url),
            ("auth_url", &self.auth_url),
            ("files_url", &self.files_url),
        ] {
            if url.is_empty() {
                return Err(Error::Config(format!("{name} cannot be empty")));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }
        if self.upload_timeout_secs == 0 {
            return Err(Error::Config(
                "upload_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_url(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

/// `NOTESENSE_CREDENTIALS`, else `$HOME/.config/notesense/credentials.json`.
pub fn default_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(defaults::ENV_CREDENTIALS) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("notesense")
            .join("credentials.json")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:8080/api");
        assert_eq!(config.auth_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_server_layout() {
        let config = ClientConfig::for_server("http://127.0.0.1:9000/");
        assert_eq!(config.api_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.auth_url, "http://127.0.0.1:9000");
        assert_eq!(config.files_url, "http://127.0.0.1:9000");
        assert!(config.credentials_path.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = ClientConfig {
            api_url: "localhost:8080/api".to_string(),
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("api_url"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig {
            timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
