//! taller-auth: bearer credential verification for the workshop backend.
//!
//! A [`CredentialVerifier`] turns an `Authorization` header into a
//! [`taller_core::TenantContext`]. Password hooks keep plaintext and
//! hashes out of service payloads and responses.

pub mod core;
pub mod error;
pub mod hooks;
pub mod jwt;
pub mod options;
pub mod password;

pub use crate::core::{extract_bearer_token, principal_from_claims, CredentialVerifier};
pub use error::AuthError;
pub use hooks::{HashPasswordHook, ProtectHook};
pub use jwt::JwtVerifier;
pub use options::{ClaimNames, JwtAlgorithm, JwtOptions};
pub use password::PasswordHasher;
