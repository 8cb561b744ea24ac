//! taller-server: the workshop backend.
//!
//! Wires the resource descriptors, the reports service and the `usuarios`
//! hooks into an [`AxumApp`] that authenticates with JWT bearer tokens.

pub mod config;
pub mod db;
pub mod hooks;
pub mod services;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use taller_auth::{JwtOptions, JwtVerifier};
use taller_axum::{axum, AxumApp};
use taller_core::{RequestParams, TallerApp};
use taller_sql::Store;

/// Configure from the environment, connect, migrate and assemble.
pub async fn build() -> Result<AxumApp<Value, RequestParams>> {
    let app: TallerApp<Value, RequestParams> = TallerApp::new();
    config::configure(&app);

    let store = db::connect(&app.config_snapshot()).await?;
    db::migrate(store.as_ref()).await?;

    build_with_store(app, store)
}

/// Assemble on an already configured app and migrated store.
///
/// Fails when the JWT secret is missing or too short.
pub fn build_with_store(
    app: TallerApp<Value, RequestParams>,
    store: Arc<dyn Store>,
) -> Result<AxumApp<Value, RequestParams>> {
    let cfg = app.config_snapshot();
    let options = JwtOptions::from_config(&cfg).map_err(|e| anyhow!("invalid auth configuration: {e}"))?;
    let verifier = JwtVerifier::new(options).map_err(|e| anyhow!("invalid auth configuration: {e}"))?;

    hooks::global_hooks(&app);

    let ax = axum(app, Arc::new(verifier));
    let ax = services::configure(ax, store, &cfg)?;
    Ok(ax.use_get("/health", || async { "ok" }))
}
