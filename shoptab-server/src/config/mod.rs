//! Configuration module for shoptab-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables. Configuration is loaded once at startup and
//! never mutated afterwards.

pub mod file;

pub use file::FileConfig;

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("AIRTABLE_TOKEN environment variable not set")]
    MissingAirtableToken,

    #[error("SHOPIFY_WEBHOOK_SECRET environment variable not set")]
    MissingWebhookSecret,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            config.server.listen = listen;
        }

        self.validate(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let ids = [
            ("airtable.base_id", &config.airtable.base_id),
            ("airtable.customers_table", &config.airtable.customers_table),
            ("airtable.orders_table", &config.airtable.orders_table),
            ("airtable.products_table", &config.airtable.products_table),
        ];
        for (name, value) in ids {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{name} is empty")));
            }
        }
        Ok(())
    }
}

/// Get the Airtable bearer token from the environment.
pub fn get_airtable_token() -> Result<String, ConfigError> {
    std::env::var("AIRTABLE_TOKEN").map_err(|_| ConfigError::MissingAirtableToken)
}

/// Get the webhook shared secret from the environment.
pub fn get_webhook_secret() -> Result<String, ConfigError> {
    std::env::var("SHOPIFY_WEBHOOK_SECRET").map_err(|_| ConfigError::MissingWebhookSecret)
}
