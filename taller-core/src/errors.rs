//! # Errors
//!
//! A structured error with a fixed status-code mapping:
//! - consistent status codes + names
//! - can be carried through `anyhow::Error` (for the hook pipeline)
//! - transport-agnostic (the HTTP crate decides how to serialize)
//!
//! "Row absent" and "row owned by another tenant" are both `NotFound`.
//! There is intentionally no `Forbidden` kind.

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for core APIs.
pub type TallerResult<T> = std::result::Result<T, AnyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,        // 400
    Unauthenticated,   // 401
    InvalidCredential, // 401
    NotFound,          // 404
    MethodNotAllowed,  // 405
    Conflict,          // 409
    Internal,          // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::InvalidCredential => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Unauthenticated => "Unauthenticated",
            ErrorKind::InvalidCredential => "InvalidCredential",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Internal => "Internal",
        }
    }
}

/// A structured error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct TallerError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl TallerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Convert into `anyhow::Error` so it flows through the hook pipeline.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `TallerError` anywhere in an `anyhow` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&TallerError> {
        err.chain().find_map(|e| e.downcast_ref::<TallerError>())
    }

    /// Turn any error into a TallerError:
    /// - if it already is one, keep it (lossless)
    /// - otherwise wrap as Internal, surfacing the message
    pub fn normalize(err: AnyError) -> TallerError {
        if TallerError::from_anyhow(&err).is_none() {
            return TallerError::internal(err.to_string()).with_source(err);
        }
        match err.downcast::<TallerError>() {
            Ok(taller) => taller,
            // Wrapped by anyhow context: keep kind and message, drop the wrapper.
            Err(other) => {
                let (kind, message) = TallerError::from_anyhow(&other)
                    .map(|e| (e.kind, e.message.clone()))
                    .unwrap_or((ErrorKind::Internal, other.to_string()));
                TallerError::new(kind, message).with_source(other)
            }
        }
    }

    /// A version suitable for returning to clients: the inner `source`
    /// (driver messages, stack details) is dropped.
    pub fn sanitize_for_client(&self) -> TallerError {
        TallerError {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, msg)
    }
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredential, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl fmt::Display for TallerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for TallerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with TallerError".
#[macro_export]
macro_rules! bail_taller {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::TallerError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::TallerError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}
