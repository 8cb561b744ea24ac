//! taller-axum: Axum adapter for the workshop backend.
//!
//! Builds REST routers from [`taller_core`] services, authenticates every
//! request through a [`taller_auth::CredentialVerifier`], and renders results
//! and failures in the JSON envelope.

pub mod app;
pub mod envelope;
pub mod middlewares;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::TallerAxumError;
pub use state::TallerAxumState;

pub use app::{axum, AxumApp};
pub use envelope::{Envelope, ErrorEnvelope};
