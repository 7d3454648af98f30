//! Application configuration loading from config.toml and the environment
//!
//! Non-secret settings (bind address, storefront currency, shipping
//! countries, media locations, seed categories) live in `config.toml`;
//! every field has a default so a missing file or a partial file still
//! yields a usable configuration. Secrets are only ever read from
//! environment variables (usually via `.env`).

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Checkout and storefront settings
    pub store: StoreConfig,
    /// Image storage settings
    pub media: MediaConfig,
    /// Session token settings
    pub auth: AuthConfig,
    /// Rows inserted on first start
    pub seed: SeedConfig,
    /// Secrets loaded from the environment, never from the file
    #[serde(skip)]
    pub secrets: Secrets,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API binds to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Checkout and storefront settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Lowercase ISO currency code used for checkout sessions
    pub currency: String,
    /// Public site URL; checkout success and cancel URLs are built from it
    pub site_url: String,
    /// Two-letter country codes accepted for shipping
    pub shipping_countries: Vec<String>,
    /// Minutes before an unpaid hosted checkout session expires
    pub checkout_expiry_minutes: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            site_url: "http://localhost:3000".to_string(),
            shipping_countries: vec!["US".to_string(), "CA".to_string()],
            checkout_expiry_minutes: 30,
        }
    }
}

/// Image storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory uploaded images are written to and served from
    pub assets_dir: PathBuf,
    /// Public base URL of the image CDN, if images are served from one
    pub cdn_url: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            cdn_url: None,
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session token lifetime in hours
    pub token_lifetime_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime_hours: 24,
        }
    }
}

/// Rows inserted on first start
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Category names created when missing
    pub categories: Vec<String>,
}

/// Secrets read from environment variables
#[derive(Clone, Default)]
pub struct Secrets {
    /// HS256 key for session tokens (`JWT_SECRET`)
    pub jwt_secret: String,
    /// Payment provider API key (`STRIPE_SECRET_KEY`)
    pub stripe_secret_key: String,
    /// Webhook signing secret (`STRIPE_WEBHOOK_SECRET`)
    pub stripe_webhook_secret: String,
}

impl Secrets {
    /// Reads all secrets from the environment.
    ///
    /// # Errors
    /// Returns `Error::EnvVar` when any of the variables is missing.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            jwt_secret: std::env::var("JWT_SECRET")?,
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")?,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"<redacted>")
            .field("stripe_secret_key", &"<redacted>")
            .field("stripe_webhook_secret", &"<redacted>")
            .finish()
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns `Error::Config` if the TOML syntax is invalid or a field has the
/// wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    validate(&config)?;
    Ok(config)
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist. Secrets are not loaded here.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("{} not found, using default configuration", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads ./config.toml and the environment secrets.
pub fn load_app_configuration() -> Result<AppConfig> {
    let mut config = load_config("config.toml")?;
    config.secrets = Secrets::from_env()?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.store.currency.len() != 3 {
        return Err(Error::Config {
            message: format!("store.currency must be a 3-letter code, got '{}'", config.store.currency),
        });
    }
    if config.store.checkout_expiry_minutes < 30 {
        return Err(Error::Config {
            message: "store.checkout_expiry_minutes must be at least 30".to_string(),
        });
    }
    if config.auth.token_lifetime_hours <= 0 {
        return Err(Error::Config {
            message: "auth.token_lifetime_hours must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_address = "127.0.0.1:8080"

            [store]
            currency = "eur"
            site_url = "https://shop.example"
            shipping_countries = ["DE", "FR"]
            checkout_expiry_minutes = 45

            [media]
            assets_dir = "/srv/assets"
            cdn_url = "https://cdn.example"

            [seed]
            categories = ["Figurines", "Tools"]
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.store.currency, "eur");
        assert_eq!(config.store.shipping_countries, vec!["DE", "FR"]);
        assert_eq!(config.store.checkout_expiry_minutes, 45);
        assert_eq!(config.media.assets_dir, PathBuf::from("/srv/assets"));
        assert_eq!(config.media.cdn_url.as_deref(), Some("https://cdn.example"));
        assert_eq!(config.seed.categories.len(), 2);
        // Sections not present fall back to defaults
        assert_eq!(config.auth.token_lifetime_hours, 24);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.store.currency, "usd");
        assert_eq!(config.store.checkout_expiry_minutes, 30);
        assert!(config.seed.categories.is_empty());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(parse_config("[store]\ncurrency = \"dollars\"").is_err());
        assert!(parse_config("[store]\ncheckout_expiry_minutes = 5").is_err());
        assert!(parse_config("[auth]\ntoken_lifetime_hours = 0").is_err());
        assert!(parse_config("[server\n").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let secrets = Secrets {
            jwt_secret: "supersecret".to_string(),
            ..Secrets::default()
        };
        assert!(!format!("{secrets:?}").contains("supersecret"));
    }
}
