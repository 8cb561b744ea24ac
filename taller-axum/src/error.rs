use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use taller_core::TallerError;

use crate::envelope::ErrorEnvelope;

/// Anything a handler can fail with, rendered as the error envelope.
#[derive(Debug)]
pub struct TallerAxumError(pub anyhow::Error);

impl From<anyhow::Error> for TallerAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<TallerError> for TallerAxumError {
    fn from(e: TallerError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for TallerAxumError {
    fn into_response(self) -> Response {
        let err = TallerError::normalize(self.0);
        let status = StatusCode::from_u16(err.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %err.message, source = ?err.source, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %err.message, "request rejected");
        }

        // The message survives; the source chain stays in the log.
        let safe = err.sanitize_for_client();
        (status, Json(ErrorEnvelope::new(safe.message))).into_response()
    }
}
