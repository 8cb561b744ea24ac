//! Store selection by `database.url` and schema bootstrap.

use std::sync::Arc;

use anyhow::{bail, Result};
use taller_core::TallerConfigSnapshot;
use taller_sql::{Dialect, Store};

pub const SQLITE_SCHEMA: &str = include_str!("../schema/sqlite.sql");
pub const POSTGRES_SCHEMA: &str = include_str!("../schema/postgres.sql");

pub async fn connect(cfg: &TallerConfigSnapshot) -> Result<Arc<dyn Store>> {
    let Some(url) = cfg.get("database.url") else {
        bail!("database.url is not configured");
    };

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let max = cfg.get_u64("database.max_connections").unwrap_or(10) as u32;
        return connect_postgres(url, max).await;
    }
    if url.starts_with("sqlite:") {
        return connect_sqlite(url).await;
    }
    bail!("unsupported database.url scheme: {url}")
}

#[cfg(feature = "postgres")]
async fn connect_postgres(url: &str, max: u32) -> Result<Arc<dyn Store>> {
    let store = taller_sql::PostgresStore::connect(url, max).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_url: &str, _max: u32) -> Result<Arc<dyn Store>> {
    bail!("postgres support is not compiled in (enable the `postgres` feature)")
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(url: &str) -> Result<Arc<dyn Store>> {
    let store = taller_sql::SqliteStore::connect(url).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(_url: &str) -> Result<Arc<dyn Store>> {
    bail!("sqlite support is not compiled in (enable the `sqlite` feature)")
}

/// Create missing tables. Scripts are idempotent.
pub async fn migrate(store: &dyn Store) -> Result<()> {
    let script = match store.dialect() {
        Dialect::Sqlite => SQLITE_SCHEMA,
        Dialect::Postgres => POSTGRES_SCHEMA,
    };
    store.execute_script(script).await?;
    tracing::info!(dialect = ?store.dialect(), "schema ready");
    Ok(())
}
