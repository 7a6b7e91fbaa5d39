//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `RECRAFT_HOST` - Bind address (default: 127.0.0.1)
//! - `RECRAFT_PORT` - Listen port (default: 3000)
//! - `RECRAFT_DATA_DIR` - Document store directory (default: data)
//! - `RECRAFT_UPLOAD_DIR` - Uploaded files directory (default: uploads)
//! - `RECRAFT_CORS_ORIGIN` - Allowed browser origin (default: <http://localhost:5173>)
//! - `SERVICEABILITY_API_URL` - Remote pincode lookup service; the built-in
//!   rule is used when unset
//! - `SERVICEABILITY_API_TOKEN` - Bearer token for the lookup service
//! - `SERVICEABILITY_TIMEOUT_SECS` - Lookup timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_LENGTH: usize = 16;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SERVICEABILITY_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory holding one JSON document per collection
    pub data_dir: PathBuf,
    /// Directory uploaded files are written to
    pub upload_dir: PathBuf,
    /// Browser origin allowed by CORS
    pub cors_origin: String,
    /// Pickup serviceability lookup
    pub serviceability: ServiceabilityConfig,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Pickup serviceability lookup configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ServiceabilityConfig {
    /// Base URL of a remote lookup service; `None` selects the built-in rule
    pub api_url: Option<Url>,
    /// Bearer token sent to the remote service
    pub api_token: Option<SecretString>,
    /// Request timeout for remote lookups
    pub timeout: Duration,
}

impl Default for ServiceabilityConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_SERVICEABILITY_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for ServiceabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceabilityConfig")
            .field("api_url", &self.api_url.as_ref().map(Url::as_str))
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Sentry configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or if the lookup
    /// token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("RECRAFT_HOST", "127.0.0.1")?;
        let port = parse_env("RECRAFT_PORT", "3000")?;
        let data_dir = PathBuf::from(get_env_or_default("RECRAFT_DATA_DIR", "data"));
        let upload_dir = PathBuf::from(get_env_or_default("RECRAFT_UPLOAD_DIR", "uploads"));
        let cors_origin = get_env_or_default("RECRAFT_CORS_ORIGIN", "http://localhost:5173");

        Ok(Self {
            host,
            port,
            data_dir,
            upload_dir,
            cors_origin,
            serviceability: ServiceabilityConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Defaults for a server rooted at `data_dir`, with uploads inside it.
    ///
    /// Used by tests and tools that do not read the environment.
    #[must_use]
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            upload_dir: data_dir.join("uploads"),
            data_dir,
            cors_origin: "http://localhost:5173".to_owned(),
            serviceability: ServiceabilityConfig::default(),
            sentry: SentryConfig::default(),
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ServiceabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_url = get_optional_env("SERVICEABILITY_API_URL")
            .map(|raw| parse_base_url("SERVICEABILITY_API_URL", &raw))
            .transpose()?;
        let api_token = get_optional_env("SERVICEABILITY_API_TOKEN")
            .map(|raw| validated_token("SERVICEABILITY_API_TOKEN", raw))
            .transpose()?;
        let timeout_secs: u64 = parse_env(
            "SERVICEABILITY_TIMEOUT_SECS",
            &DEFAULT_SERVICEABILITY_TIMEOUT_SECS.to_string(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SERVICEABILITY_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            api_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate in `0.0..=1.0`.
fn parse_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

/// Parse an absolute `http`/`https` base URL.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL with a host".to_string(),
        ));
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

/// Validate an API token's length and strength.
fn validated_token(var_name: &str, value: String) -> Result<SecretString, ConfigError> {
    let token = SecretString::from(value);
    let exposed = token.expose_secret();
    if exposed.len() < MIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_TOKEN_LENGTH} characters (got {})",
                exposed.len()
            ),
        ));
    }
    validate_secret_strength(exposed, var_name)?;
    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validated_token() {
        assert!(validated_token("TOKEN", "aB3$xY9!".to_owned()).is_err());
        assert!(validated_token("TOKEN", "aB3$xY9!mK2@nL5#pQ7&rT0*".to_owned()).is_ok());
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("URL", "https://pickup.example.in").is_ok());
        assert!(parse_base_url("URL", "ftp://pickup.example.in").is_err());
        assert!(parse_base_url("URL", "not a url").is_err());
    }

    #[test]
    fn test_local_defaults() {
        let config = StorefrontConfig::local("/tmp/recraft");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/recraft/uploads"));
        assert!(config.serviceability.api_url.is_none());
        assert_eq!(config.serviceability.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_serviceability_debug_redacts_token() {
        let config = ServiceabilityConfig {
            api_url: Some(Url::parse("https://pickup.recraft.in").unwrap()),
            api_token: Some(SecretString::from("super_secret_lookup_token")),
            timeout: Duration::from_secs(5),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("pickup.recraft.in"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_lookup_token"));
    }
}
