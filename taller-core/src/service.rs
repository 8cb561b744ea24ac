use anyhow::Result;
use async_trait::async_trait;

use crate::errors::TallerError;
use crate::tenant::TenantContext;

/// Standard service methods.
///
/// `Related` lists a child resource under one parent record
/// (`/clientes/5/vehiculos`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Update,
    Remove,
    Related,
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Update => "update",
            ServiceMethodKind::Remove => "remove",
            ServiceMethodKind::Related => "related",
        }
    }
}

/// Capabilities describe which methods a service exposes to the outside
/// world. The HTTP adapter answers 405 for anything not listed.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    /// Full CRUD plus related listings.
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Update, Remove, Related],
        }
    }

    pub fn read_only() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: ServiceMethodKind) -> bool {
        self.allowed_methods.contains(&method)
    }
}

fn not_allowed<T>(method: ServiceMethodKind) -> Result<T> {
    Err(TallerError::method_not_allowed(format!("Método no permitido: {}", method.as_str())).into_anyhow())
}

/// Core service trait.
///
/// - `find`    → list/query many
/// - `get`     → fetch one by id
/// - `create`  → create one
/// - `update`  → partial update of one
/// - `remove`  → delete one
/// - `related` → list a child resource under one record
///
/// Ids arrive as raw path segments; each service decides how to parse them.
/// All methods default to `MethodNotAllowed`, so a service overrides only
/// what it supports.
#[async_trait]
pub trait TallerService<R, P = ()>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _ctx: &TenantContext, _params: P) -> Result<Vec<R>> {
        not_allowed(ServiceMethodKind::Find)
    }

    async fn get(&self, _ctx: &TenantContext, _id: &str, _params: P) -> Result<R> {
        not_allowed(ServiceMethodKind::Get)
    }

    async fn create(&self, _ctx: &TenantContext, _data: R, _params: P) -> Result<R> {
        not_allowed(ServiceMethodKind::Create)
    }

    async fn update(&self, _ctx: &TenantContext, _id: &str, _data: R, _params: P) -> Result<R> {
        not_allowed(ServiceMethodKind::Update)
    }

    async fn remove(&self, _ctx: &TenantContext, _id: &str, _params: P) -> Result<R> {
        not_allowed(ServiceMethodKind::Remove)
    }

    async fn related(
        &self,
        _ctx: &TenantContext,
        _id: &str,
        _relation: &str,
        _params: P,
    ) -> Result<Vec<R>> {
        not_allowed(ServiceMethodKind::Related)
    }
}
