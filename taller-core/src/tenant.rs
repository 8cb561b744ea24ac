//! Core multi-tenant types.
//!
//! A tenant is a workshop (`taller`). The only way to obtain a
//! [`TenantContext`] outside of tests is through a verified credential,
//! so every service call downstream is scoped by construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a workshop. Matches the integer `taller_id` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub i64);

impl TenantId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated actor behind a request.
///
/// Rebuilt on every request from the signed credential; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: String,
    pub tenant_id: TenantId,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
            tenant_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

/// Context carried with every service operation.
///
/// Passed into services and hooks so that all data access is explicitly
/// tenant-aware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub principal: Principal,
}

impl TenantContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            tenant_id: principal.tenant_id,
            principal,
        }
    }

    /// The raw tenant id, as bound into scoped statements.
    pub fn tenant(&self) -> i64 {
        self.tenant_id.0
    }
}

impl From<Principal> for TenantContext {
    fn from(principal: Principal) -> Self {
        Self::new(principal)
    }
}
