//! TOML file configuration structures.
//!
//! These structs directly map to the `shoptab-config.toml` file format.
//! Secrets (the Airtable bearer token and the webhook shared secret) are
//! deliberately absent: they are read from the environment.

use serde::Deserialize;
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub airtable: AirtableConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Airtable base and table identifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct AirtableConfig {
    /// The base (workspace) identifier, e.g. "appXXXXXXXXXXXXXX".
    pub base_id: String,
    pub customers_table: String,
    pub orders_table: String,
    pub products_table: String,
}
