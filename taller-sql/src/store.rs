//! The parameterized-execute interface services talk to.

use async_trait::async_trait;
use taller_core::TallerError;
use thiserror::Error;

use crate::dialect::{Dialect, Statement};
use crate::value::Row;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store failures, classified before they reach the service layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("not null constraint violated: {0}")]
    NotNullViolation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("could not decode column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation(db.message().to_string()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation(db.message().to_string())
            }
            sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::NotNullViolation) => {
                StoreError::NotNullViolation(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

impl From<StoreError> for TallerError {
    fn from(err: StoreError) -> Self {
        let base = match &err {
            StoreError::UniqueViolation(_) => TallerError::conflict("Ya existe un registro con esos datos"),
            StoreError::ForeignKeyViolation(_) => {
                TallerError::conflict("El registro está relacionado con otros registros")
            }
            StoreError::NotNullViolation(_) => TallerError::bad_request("Faltan campos requeridos"),
            StoreError::Database(msg) => TallerError::internal(msg.clone()),
            StoreError::Decode { .. } => TallerError::internal(err.to_string()),
        };
        base.with_source(err.into())
    }
}

/// Executes parameterized statements and hands rows back in order.
///
/// Implementations never see request input except as bound parameters.
#[async_trait]
pub trait Store: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run one statement and return every row it produced (including
    /// `RETURNING` rows).
    async fn fetch_all(&self, stmt: &Statement) -> StoreResult<Vec<Row>>;

    async fn fetch_optional(&self, stmt: &Statement) -> StoreResult<Option<Row>> {
        Ok(self.fetch_all(stmt).await?.into_iter().next())
    }

    /// Run a multi-statement script without parameters (schema setup).
    async fn execute_script(&self, script: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use taller_core::ErrorKind;

    #[test]
    fn constraint_violations_are_conflicts() {
        let err = TallerError::from(StoreError::UniqueViolation("UNIQUE failed: cotizaciones.codigo".into()));
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.source.is_some());

        let err = TallerError::from(StoreError::ForeignKeyViolation("FOREIGN KEY constraint failed".into()));
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn not_null_violation_is_a_bad_request() {
        let err = TallerError::from(StoreError::NotNullViolation("NOT NULL constraint failed: citas.fecha".into()));
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert_eq!(err.message, "Faltan campos requeridos");
        assert!(!err.message.contains("citas.fecha"));
    }

    #[test]
    fn other_failures_are_internal_with_message() {
        let err = TallerError::from(StoreError::Database("no such table: citas".into()));
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "no such table: citas");
    }
}
