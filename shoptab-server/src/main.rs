//! Shoptab Server
//!
//! A single-tenant bridge relaying Shopify order and fulfillment webhooks
//! into an Airtable base.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_airtable_token, get_webhook_secret};
use server::{build_router, run_server};
use shoptab_airtable::AirtableClient;
use shoptab_core::reconciler::Reconciler;
use shoptab_core::store::{AirtableStore, StoreTables};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Shoptab - Shopify to Airtable webhook bridge
#[derive(Parser, Debug)]
#[command(name = "shoptab-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./shoptab-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting shoptab-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let loader = ConfigLoader::new(&args.config, args.listen);
    let config = loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Secrets come from the environment, never from the config file
    let token = get_airtable_token().map_err(|e| {
        tracing::error!("AIRTABLE_TOKEN environment variable not set");
        e
    })?;
    let webhook_secret = get_webhook_secret().map_err(|e| {
        tracing::error!("SHOPIFY_WEBHOOK_SECRET environment variable not set");
        e
    })?;

    // Wire the store and reconciler once; everything downstream borrows
    // this state, there are no process-wide globals.
    let client = AirtableClient::new(token, config.airtable.base_id.clone());
    let store = AirtableStore::new(
        client,
        StoreTables {
            customers: config.airtable.customers_table.clone(),
            orders: config.airtable.orders_table.clone(),
            products: config.airtable.products_table.clone(),
        },
    );
    let state = AppState::new(Reconciler::new(store), webhook_secret.into_bytes());

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", config.server.listen);
    run_server(router, config.server.listen).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
