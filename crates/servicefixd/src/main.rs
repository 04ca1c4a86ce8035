//! ServiceFix daemon - appliance-repair dispatch over Telegram.
//!
//! Customers book tickets, the administrator triages and assigns them,
//! technicians receive and work the jobs.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use servicefix_common::db::Db;
use servicefix_common::refdata::RefData;

use servicefixd::config::Config;
use servicefixd::engine::Engine;
use servicefixd::telegram::TelegramTransport;
use servicefixd::transport::Transport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("ServiceFix daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    config.validate().context("invalid configuration")?;

    let db = Db::open(&config.db_path)
        .await
        .context("failed to open the ticket store")?;

    let refdata = match &config.refdata_path {
        Some(path) => RefData::load(path)
            .with_context(|| format!("failed to load reference data from {}", path.display()))?,
        None => RefData::builtin(),
    };
    info!(
        "Reference data: {} districts, {} complaint categories",
        refdata.districts.len(),
        refdata.complaints.len()
    );

    let transport = Arc::new(
        TelegramTransport::new(config.bot_token.clone(), config.poll_timeout_secs)
            .context("failed to build the Telegram client")?,
    );
    let engine = Engine::new(
        db,
        transport.clone() as Arc<dyn Transport>,
        Arc::new(refdata),
        config.admin_chat_id,
    );

    info!("ServiceFix daemon ready, polling for updates");

    tokio::select! {
        result = transport.run(&engine) => {
            result.context("transport loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down gracefully");
        }
    }

    Ok(())
}
