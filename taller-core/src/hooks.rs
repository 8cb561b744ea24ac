use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::TallerConfigSnapshot;
use crate::service::ServiceMethodKind;
use crate::tenant::TenantContext;

/// Output of a service call as seen by after hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum HookResult<R> {
    One(R),
    Many(Vec<R>),
}

/// Context passed to hooks.
///
/// R = record type
/// P = params type (filters, query options, etc.)
#[derive(Debug)]
pub struct HookContext<R, P> {
    pub tenant: TenantContext,
    pub service_name: String,
    pub method: ServiceMethodKind,
    pub params: P,
    pub id: Option<String>,
    pub data: Option<R>,              // input payload (create/update)
    pub result: Option<HookResult<R>>, // output (after hooks)
    pub error: Option<anyhow::Error>, // error (error hooks)
    pub config: TallerConfigSnapshot,
}

impl<R, P> HookContext<R, P> {
    pub fn new(
        tenant: TenantContext,
        service_name: impl Into<String>,
        method: ServiceMethodKind,
        params: P,
        config: TallerConfigSnapshot,
    ) -> Self {
        Self {
            tenant,
            service_name: service_name.into(),
            method,
            params,
            id: None,
            data: None,
            result: None,
            error: None,
            config,
        }
    }
}

#[async_trait]
pub trait TallerBeforeHook<R, P>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

#[async_trait]
pub trait TallerAfterHook<R, P>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

/// Error hooks observe `ctx.error`. Clearing it recovers the call.
#[async_trait]
pub trait TallerErrorHook<R, P>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R, P>) -> Result<()>;
}

type ByMethod<H> = HashMap<ServiceMethodKind, Vec<Arc<H>>>;

/// Hooks registered for the whole app or for one service.
pub struct ServiceHooks<R, P> {
    pub(crate) before_all: Vec<Arc<dyn TallerBeforeHook<R, P>>>,
    pub(crate) before_by_method: ByMethod<dyn TallerBeforeHook<R, P>>,
    pub(crate) after_all: Vec<Arc<dyn TallerAfterHook<R, P>>>,
    pub(crate) after_by_method: ByMethod<dyn TallerAfterHook<R, P>>,
    pub(crate) error_all: Vec<Arc<dyn TallerErrorHook<R, P>>>,
}

impl<R, P> Default for ServiceHooks<R, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> ServiceHooks<R, P> {
    pub fn new() -> Self {
        Self {
            before_all: Vec::new(),
            before_by_method: HashMap::new(),
            after_all: Vec::new(),
            after_by_method: HashMap::new(),
            error_all: Vec::new(),
        }
    }

    pub fn before_all(&mut self, hook: Arc<dyn TallerBeforeHook<R, P>>) -> &mut Self {
        self.before_all.push(hook);
        self
    }

    pub fn before(&mut self, method: ServiceMethodKind, hook: Arc<dyn TallerBeforeHook<R, P>>) -> &mut Self {
        self.before_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn before_create(&mut self, hook: Arc<dyn TallerBeforeHook<R, P>>) -> &mut Self {
        self.before(ServiceMethodKind::Create, hook)
    }

    pub fn before_update(&mut self, hook: Arc<dyn TallerBeforeHook<R, P>>) -> &mut Self {
        self.before(ServiceMethodKind::Update, hook)
    }

    pub fn after_all(&mut self, hook: Arc<dyn TallerAfterHook<R, P>>) -> &mut Self {
        self.after_all.push(hook);
        self
    }

    pub fn after(&mut self, method: ServiceMethodKind, hook: Arc<dyn TallerAfterHook<R, P>>) -> &mut Self {
        self.after_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn error_all(&mut self, hook: Arc<dyn TallerErrorHook<R, P>>) -> &mut Self {
        self.error_all.push(hook);
        self
    }
}

/// `*_all` hooks first, then the method-specific ones.
pub(crate) fn collect_method_hooks<H: ?Sized>(
    all: &[Arc<H>],
    by_method: &ByMethod<H>,
    method: &ServiceMethodKind,
) -> Vec<Arc<H>> {
    let mut out: Vec<Arc<H>> = all.to_vec();
    if let Some(v) = by_method.get(method) {
        out.extend(v.iter().cloned());
    }
    out
}
