//! SQLite store.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::dialect::{Dialect, Statement};
use crate::store::{Store, StoreError, StoreResult};
use crate::value::{Row, SqlValue};

/// SQLite implementation of [`Store`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` with foreign keys enforced.
    ///
    /// In-memory databases live as long as their connection, so the pool is
    /// pinned to one connection that never expires.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(opts).await?
        };

        Ok(Self { pool })
    }

    pub async fn memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut q: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for p in params {
        q = match p {
            SqlValue::Null => q.bind(None::<String>),
            SqlValue::Bool(b) => q.bind(*b),
            SqlValue::Int(i) => q.bind(*i),
            SqlValue::Float(f) => q.bind(*f),
            SqlValue::Text(s) => q.bind(s.clone()),
        };
    }
    q
}

fn decode_row(row: &SqliteRow) -> StoreResult<Row> {
    let mut out = Row::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let name = col.name().to_string();
        let decode_err = |e: sqlx::Error| StoreError::Decode {
            column: col.name().to_string(),
            message: e.to_string(),
        };

        let raw = row.try_get_raw(idx).map_err(decode_err)?;
        // Dispatch on the storage class of the value, not the declared type.
        let storage = if raw.is_null() {
            "NULL".to_string()
        } else {
            raw.type_info().name().to_ascii_uppercase()
        };

        let value = match storage.as_str() {
            "NULL" => Value::Null,
            "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
                Value::from(row.try_get_unchecked::<i64, _>(idx).map_err(decode_err)?)
            }
            "REAL" | "NUMERIC" | "FLOAT" | "DOUBLE" => {
                let f = row.try_get_unchecked::<f64, _>(idx).map_err(decode_err)?;
                Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            }
            "BLOB" => Value::Null,
            _ => Value::String(row.try_get_unchecked::<String, _>(idx).map_err(decode_err)?),
        };
        out.insert(name, value);
    }
    Ok(out)
}

#[async_trait]
impl Store for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, stmt: &Statement) -> StoreResult<Vec<Row>> {
        tracing::trace!(sql = %stmt.sql, params = stmt.params.len(), "sqlite fetch");
        let rows = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_script(&self, script: &str) -> StoreResult<()> {
        sqlx::raw_sql(script).execute(&self.pool).await?;
        Ok(())
    }
}
