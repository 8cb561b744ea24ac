//! Bound parameter values and per-field coercion from JSON.

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Number, Value};
use taller_core::TallerError;

/// A value bound to a positional placeholder. Never spliced into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// Declared column type. Drives coercion, placeholder casts and row decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM` or `HH:MM:SS`
    Time,
    /// Stored as canonical JSON text.
    Json,
}

fn invalid(field: &str, expected: &str) -> TallerError {
    TallerError::bad_request(format!("El campo '{field}' debe ser {expected}"))
}

impl FieldKind {
    /// Coerce a request value for `field` into a bindable value.
    pub fn coerce(self, field: &str, value: &Value) -> Result<SqlValue, TallerError> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }

        match self {
            FieldKind::Text => Ok(match value {
                Value::String(s) => SqlValue::Text(s.clone()),
                Value::Number(n) => SqlValue::Text(n.to_string()),
                Value::Bool(b) => SqlValue::Text(b.to_string()),
                other => SqlValue::Text(other.to_string()),
            }),
            FieldKind::Integer => match value {
                Value::Number(n) => n.as_i64().map(SqlValue::Int),
                Value::String(s) => s.trim().parse::<i64>().ok().map(SqlValue::Int),
                _ => None,
            }
            .ok_or_else(|| invalid(field, "un número entero")),
            FieldKind::Decimal => match value {
                Value::Number(n) => n.as_f64().map(SqlValue::Float),
                Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(SqlValue::Float),
                _ => None,
            }
            .ok_or_else(|| invalid(field, "un número")),
            FieldKind::Boolean => match value {
                Value::Bool(b) => Some(SqlValue::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Some(SqlValue::Bool(false)),
                    Some(1) => Some(SqlValue::Bool(true)),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(SqlValue::Bool(true)),
                    "false" | "0" => Some(SqlValue::Bool(false)),
                    _ => None,
                },
                _ => None,
            }
            .ok_or_else(|| invalid(field, "verdadero o falso")),
            FieldKind::Date => value
                .as_str()
                .map(str::trim)
                .filter(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .map(|s| SqlValue::Text(s.to_string()))
                .ok_or_else(|| invalid(field, "una fecha YYYY-MM-DD")),
            FieldKind::Time => value
                .as_str()
                .map(str::trim)
                .filter(|s| {
                    NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok() || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
                })
                .map(|s| SqlValue::Text(s.to_string()))
                .ok_or_else(|| invalid(field, "una hora HH:MM")),
            // serde_json serializes object keys in sorted order.
            FieldKind::Json => Ok(SqlValue::Text(value.to_string())),
        }
    }

    /// Turn a decoded column value into its API shape.
    ///
    /// SQLite has no boolean or JSON types: `0/1` and JSON text are mapped back
    /// here.
    pub fn normalize(self, value: Value) -> Value {
        match (self, value) {
            (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(i) => Value::Bool(i != 0),
                None => Value::Number(n),
            },
            (FieldKind::Json, Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
            (FieldKind::Decimal, Value::String(s)) => s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(s)),
            (_, v) => v,
        }
    }
}

/// A decoded row: column name to JSON value, in column order.
pub type Row = Map<String, Value>;
