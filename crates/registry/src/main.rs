//! `student-registry`: service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging (and OTLP export when configured).
//! 3. Resolve the field encryption key and build the [`Cipher`].
//! 4. Open the [`StudentStore`].
//! 5. Build the [`Registrar`] and the Axum router, then serve HTTP.

mod config;
mod crypto;
mod registration;
mod roster;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use crypto::Cipher;
use registration::{LogNotifier, Registrar};
use server::state::AppState;
use store::StudentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        persistent_db = cfg.database_path.is_some(),
        "student-registry starting"
    );

    // -----------------------------------------------------------------------
    // 3. Encryption key
    // -----------------------------------------------------------------------
    let key = crypto::key::resolve(cfg.encryption_key.as_deref())
        .context("encryption key configuration is invalid")?;
    let cipher = Arc::new(Cipher::new(&key.material));
    let key_source = key.source;
    drop(key);

    // -----------------------------------------------------------------------
    // 4. Store
    // -----------------------------------------------------------------------
    let store = StudentStore::open(cfg.database_path.as_deref())
        .context("failed to open student store")?;
    info!(students = store.count()?, "student store ready");

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let registrar = Arc::new(Registrar::new(
        cipher.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        cfg.mail_from.clone(),
    ));
    let state = AppState::new(registrar, cipher, store, key_source);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
