//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOCKCOUNT_API_URL` - Base URL of the inventory REST API
//! - `SUPABASE_URL` - Auth provider project URL
//! - `SUPABASE_ANON_KEY` - Auth provider public (anon) key
//!
//! ## Optional
//! - `STOCKCOUNT_STATE_DIR` - Directory for store snapshots (default: .stockcount)
//! - `STOCKCOUNT_HTTP_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `STOCKCOUNT_UNWRAP_FOUND` - Treat HTTP 422 with a `found` payload as success (default: true)
//! - `STOCKCOUNT_PAGE_SIZE` - Page size used by list fetches (default: 20)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STATE_DIR: &str = ".stockcount";
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Values that show up when `.env.example` is copied without editing.
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "changeme", "placeholder", "xxx"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Inventory REST API settings
    pub api: ApiConfig,
    /// Auth provider settings
    pub auth: AuthConfig,
    /// Where store snapshots are written
    pub state_dir: PathBuf,
    /// Page size for list fetches
    pub page_size: u32,
}

/// Inventory REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Optional per-request timeout
    pub timeout: Option<Duration>,
    /// Decode `found` out of HTTP 422 responses as a successful payload
    pub unwrap_found: bool,
}

impl ApiConfig {
    /// Configuration with defaults for everything but the base URL.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: None,
            unwrap_found: true,
        }
    }
}

/// Auth provider configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: Url,
    /// Public anon key sent as the `apikey` header
    pub anon_key: SecretString,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let api = ApiConfig {
            base_url: env.url("STOCKCOUNT_API_URL")?,
            timeout: env
                .parsed::<u64>("STOCKCOUNT_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            unwrap_found: env.flag("STOCKCOUNT_UNWRAP_FOUND", true)?,
        };

        let anon_key = env.required("SUPABASE_ANON_KEY")?;
        reject_placeholder(&anon_key, "SUPABASE_ANON_KEY")?;
        let auth = AuthConfig {
            url: env.url("SUPABASE_URL")?,
            anon_key: SecretString::from(anon_key),
        };

        let state_dir = PathBuf::from(env.or_default("STOCKCOUNT_STATE_DIR", DEFAULT_STATE_DIR));
        let page_size = env
            .parsed::<u32>("STOCKCOUNT_PAGE_SIZE")?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOCKCOUNT_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api,
            auth,
            state_dir,
            page_size,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        let raw = self.required(key)?;
        let url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        Ok(url)
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got {other}"),
            )),
        }
    }
}

fn reject_placeholder(value: &str, key: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    if PLACEHOLDER_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
    {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "looks like a placeholder value".to_string(),
        ));
    }
    Ok(())
}
