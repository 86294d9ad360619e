//! OTA Server - staged over-the-air bundle distribution
//!
//! Architecture:
//! - SeaORM for the release catalog (SQLite)
//! - Axum for the JSON update endpoint and signed artifact URLs
//! - Deterministic per-device rollout buckets, no server-side assignment
//! - Tokio for async runtime

mod auth;
mod config;
mod entity;
mod error;
mod ota;
mod plugins;
mod prelude;
mod state;
mod storage;
mod sv;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, plugins::App, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "ota_server=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting OTA Server v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env()?;
  let app = Arc::new(AppState::new(config).await?);

  App::new()
    .register(plugins::server::Plugin)
    .register(plugins::janitor::Janitor)
    .run(app)
    .await;

  Ok(())
}
