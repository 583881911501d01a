//! Thames Water Consumption Importer
//!
//! Logs into a Thames Water account through a WebDriver-controlled browser,
//! downloads hourly smart meter readings into a local time-series store and
//! ships the compacted blocks to a content-addressed bucket.
//!
//! # Run
//!
//! Each invocation is a single pass:
//! - **Login**: retried until it succeeds or the process is signalled
//! - **Import**: only days newer than what the store already holds
//! - **Compaction**: head samples are cut into fixed-duration blocks
//! - **Shipping**: blocks not yet in the bucket are uploaded by hash
//!
//! SIGTERM and SIGINT cancel whatever step is in flight; the store keeps every
//! day committed before the signal.

mod app;
mod auth;
mod config;
mod error;
mod importer;
mod model;
mod persistence;
mod readings;
mod shipper;
mod tsdb;

#[cfg(test)]
mod test_utils;

use crate::app::App;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Application entry point.
///
/// Loads configuration, wires the run together and exits with status 1 on
/// the first fatal error.
#[tokio::main]
async fn main() {
    let app_config = config::load_app_config().expect("Failed to load AppConfig");
    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level())
        .init();

    let thames_config =
        config::load_thames_water_config().expect("Failed to load ThamesWaterConfig");
    let chrome_config = config::load_chrome_config().expect("Failed to load ChromeConfig");
    let tsdb_config = config::load_tsdb_config().expect("Failed to load TsdbConfig");
    let bucket_config = config::load_bucket_config().expect("Failed to load BucketConfig");

    let app = match App::from_config(&thames_config, &chrome_config, &tsdb_config, &bucket_config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Failed to set up importer: {:#}", anyhow::Error::from(e));
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));
    tracing::info!("Running... Press Ctrl-C or send SIGTERM to terminate.");

    if let Err(e) = app.run(&cancel).await {
        tracing::error!("Import failed: {:#}", anyhow::Error::from(e));
        std::process::exit(1);
    }
}

/// Cancels `cancel` on SIGTERM or SIGINT.
///
/// Returns without cancelling if the token is cancelled elsewhere first.
async fn cancel_on_signal(cancel: CancellationToken) {
    let mut sig_term = match signal(SignalKind::terminate()) {
        Ok(sig_term) => sig_term,
        Err(e) => {
            tracing::error!("Failed to register SIGTERM handler: {:?}", e);
            return;
        }
    };

    tokio::select! {
        // Handle SIGTERM for graceful shutdown in containers
        _ = sig_term.recv() => {
            tracing::info!("Received SIGTERM. Exiting...");
        }
        // Handle Ctrl-C for manual termination
        _ = ctrl_c() => {
            tracing::info!("Received SIGINT. Exiting...");
        }
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}
