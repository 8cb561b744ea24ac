//! Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::dialect::{Dialect, Statement};
use crate::store::{Store, StoreError, StoreResult};
use crate::value::{Row, SqlValue};

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
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

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn decode_row(row: &PgRow) -> StoreResult<Row> {
    let mut out = Row::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let decode_err = |e: sqlx::Error| StoreError::Decode {
            column: col.name().to_string(),
            message: e.to_string(),
        };

        let raw = row.try_get_raw(idx).map_err(decode_err)?;
        if raw.is_null() {
            out.insert(col.name().to_string(), Value::Null);
            continue;
        }

        let value = match col.type_info().name() {
            "BOOL" => Value::Bool(row.try_get::<bool, _>(idx).map_err(decode_err)?),
            "INT2" => Value::from(row.try_get::<i16, _>(idx).map_err(decode_err)?),
            "INT4" => Value::from(row.try_get::<i32, _>(idx).map_err(decode_err)?),
            "INT8" => Value::from(row.try_get::<i64, _>(idx).map_err(decode_err)?),
            "FLOAT4" => float(f64::from(row.try_get::<f32, _>(idx).map_err(decode_err)?)),
            "FLOAT8" => float(row.try_get::<f64, _>(idx).map_err(decode_err)?),
            "NUMERIC" => {
                let d = row.try_get::<Decimal, _>(idx).map_err(decode_err)?;
                d.to_string().parse::<f64>().map(float).unwrap_or(Value::String(d.to_string()))
            }
            "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx).map_err(decode_err)?.to_string()),
            "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx).map_err(decode_err)?.to_string()),
            "TIMESTAMP" => Value::String(row.try_get::<NaiveDateTime, _>(idx).map_err(decode_err)?.to_string()),
            "TIMESTAMPTZ" => Value::String(row.try_get::<DateTime<Utc>, _>(idx).map_err(decode_err)?.to_rfc3339()),
            "JSON" | "JSONB" => row.try_get::<Value, _>(idx).map_err(decode_err)?,
            _ => Value::String(row.try_get_unchecked::<String, _>(idx).map_err(decode_err)?),
        };
        out.insert(col.name().to_string(), value);
    }
    Ok(out)
}

#[async_trait]
impl Store for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch_all(&self, stmt: &Statement) -> StoreResult<Vec<Row>> {
        tracing::trace!(sql = %stmt.sql, params = stmt.params.len(), "postgres fetch");
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
