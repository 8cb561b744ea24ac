use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};

use crate::errors::TallerError;
use crate::hooks::collect_method_hooks;
use crate::{
    HookContext, HookResult, ServiceHooks, ServiceMethodKind, TallerConfig, TallerConfigSnapshot,
    TallerService, TallerServiceRegistry, TenantContext,
};

struct TallerAppInner<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    registry: RwLock<TallerServiceRegistry<R, P>>,
    global_hooks: RwLock<ServiceHooks<R, P>>,
    service_hooks: RwLock<HashMap<String, ServiceHooks<R, P>>>,
    config: RwLock<TallerConfig>,
}

// A panicking hook must not take the whole registry down with it.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Central application container.
///
/// Transport-agnostic. Holds:
/// - service registry
/// - app hooks
/// - per-service hooks
/// - config
pub struct TallerApp<R, P = ()>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    inner: Arc<TallerAppInner<R, P>>,
}

impl<R, P> Default for TallerApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> Clone for TallerApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, P> TallerApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TallerAppInner {
                registry: RwLock::new(TallerServiceRegistry::new()),
                global_hooks: RwLock::new(ServiceHooks::new()),
                service_hooks: RwLock::new(HashMap::new()),
                config: RwLock::new(TallerConfig::new()),
            }),
        }
    }

    pub fn register_service<S>(&self, name: S, service: Arc<dyn TallerService<R, P>>)
    where
        S: Into<String>,
    {
        write(&self.inner.registry).register(name, service);
    }

    pub fn service_names(&self) -> Vec<String> {
        read(&self.inner.registry).names()
    }

    /// Hooks that run for every service.
    pub fn hooks<F>(&self, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut g = write(&self.inner.global_hooks);
        f(&mut g);
    }

    pub(crate) fn configure_service_hooks<F>(&self, service_name: &str, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut map = write(&self.inner.service_hooks);
        let hooks = map.entry(service_name.to_string()).or_default();
        f(hooks);
    }

    /// Look up a registered service. Unknown names are `NotFound`.
    pub fn service(&self, name: &str) -> Result<ServiceHandle<R, P>> {
        let svc = read(&self.inner.registry)
            .get(name)
            .cloned()
            .ok_or_else(|| TallerError::not_found(format!("Recurso no encontrado: {name}")).into_anyhow())?;

        Ok(ServiceHandle {
            app: self.clone(),
            name: name.to_string(),
            service: svc,
        })
    }

    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        write(&self.inner.config).set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        read(&self.inner.config).get(key).map(|v| v.to_string())
    }

    pub fn load_env(&self, prefix: &str) {
        write(&self.inner.config).load_env(prefix);
    }

    pub fn config_snapshot(&self) -> TallerConfigSnapshot {
        read(&self.inner.config).snapshot()
    }
}

/// What the pipeline should invoke on the service.
enum Call {
    Find,
    Get(String),
    Create,
    Update(String),
    Remove(String),
    Related(String, String),
}

impl Call {
    fn method(&self) -> ServiceMethodKind {
        match self {
            Call::Find => ServiceMethodKind::Find,
            Call::Get(_) => ServiceMethodKind::Get,
            Call::Create => ServiceMethodKind::Create,
            Call::Update(_) => ServiceMethodKind::Update,
            Call::Remove(_) => ServiceMethodKind::Remove,
            Call::Related(..) => ServiceMethodKind::Related,
        }
    }

    fn id(&self) -> Option<String> {
        match self {
            Call::Find | Call::Create => None,
            Call::Get(id) | Call::Update(id) | Call::Remove(id) | Call::Related(id, _) => Some(id.clone()),
        }
    }
}

pub struct ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    app: TallerApp<R, P>,
    name: String,
    service: Arc<dyn TallerService<R, P>>,
}

impl<R, P> ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        self.app.configure_service_hooks(&self.name, f);
        self
    }

    pub fn inner(&self) -> &Arc<dyn TallerService<R, P>> {
        &self.service
    }

    pub fn allows(&self, method: ServiceMethodKind) -> bool {
        self.service.capabilities().allows(method)
    }
}

// ──────────────────────────────────────────────────────────────
// Pipeline: before → service call → after, error hooks on failure
// ──────────────────────────────────────────────────────────────

impl<R, P> ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Sync + Clone + 'static,
{
    async fn invoke(&self, call: &Call, ctx: &mut HookContext<R, P>) -> Result<()> {
        let svc = self.service.as_ref();
        let result = match call {
            Call::Find => HookResult::Many(svc.find(&ctx.tenant, ctx.params.clone()).await?),
            Call::Get(id) => HookResult::One(svc.get(&ctx.tenant, id, ctx.params.clone()).await?),
            Call::Create => {
                let data = ctx
                    .data
                    .take()
                    .ok_or_else(|| anyhow!("create() requires ctx.data"))?;
                HookResult::One(svc.create(&ctx.tenant, data, ctx.params.clone()).await?)
            }
            Call::Update(id) => {
                let data = ctx
                    .data
                    .take()
                    .ok_or_else(|| anyhow!("update() requires ctx.data"))?;
                HookResult::One(svc.update(&ctx.tenant, id, data, ctx.params.clone()).await?)
            }
            Call::Remove(id) => HookResult::One(svc.remove(&ctx.tenant, id, ctx.params.clone()).await?),
            Call::Related(id, relation) => {
                HookResult::Many(svc.related(&ctx.tenant, id, relation, ctx.params.clone()).await?)
            }
        };
        ctx.result = Some(result);
        Ok(())
    }

    async fn run_stages(&self, call: &Call, ctx: &mut HookContext<R, P>) -> Result<()> {
        let method = call.method();
        let (before, after) = {
            let g = read(&self.app.inner.global_hooks);
            let map = read(&self.app.inner.service_hooks);
            let mut before = collect_method_hooks(&g.before_all, &g.before_by_method, &method);
            let mut after = collect_method_hooks(&g.after_all, &g.after_by_method, &method);
            if let Some(h) = map.get(&self.name) {
                before.extend(collect_method_hooks(&h.before_all, &h.before_by_method, &method));
                after.extend(collect_method_hooks(&h.after_all, &h.after_by_method, &method));
            }
            (before, after)
        };

        for h in &before {
            h.run(ctx).await?;
        }

        self.invoke(call, ctx).await?;

        for h in &after {
            h.run(ctx).await?;
        }

        Ok(())
    }

    async fn run_pipeline(&self, call: Call, tenant: TenantContext, params: P, data: Option<R>) -> Result<HookResult<R>> {
        let method = call.method();
        if !self.allows(method) {
            return Err(
                TallerError::method_not_allowed(format!("Método no permitido: {}", method.as_str())).into_anyhow(),
            );
        }

        let mut ctx = HookContext::new(tenant, self.name.clone(), method, params, self.app.config_snapshot());
        ctx.id = call.id();
        ctx.data = data;

        if let Err(e) = self.run_stages(&call, &mut ctx).await {
            ctx.error = Some(e);

            let error_hooks = {
                let g = read(&self.app.inner.global_hooks);
                let map = read(&self.app.inner.service_hooks);
                let mut hooks = g.error_all.clone();
                if let Some(h) = map.get(&self.name) {
                    hooks.extend(h.error_all.iter().cloned());
                }
                hooks
            };

            for h in &error_hooks {
                let _ = h.run(&mut ctx).await;
            }

            if let Some(err) = ctx.error.take() {
                return Err(err);
            }
        }

        ctx.result
            .take()
            .ok_or_else(|| anyhow!("{}() produced no result", method.as_str()))
    }

    pub async fn find(&self, tenant: TenantContext, params: P) -> Result<Vec<R>> {
        match self.run_pipeline(Call::Find, tenant, params, None).await? {
            HookResult::Many(v) => Ok(v),
            HookResult::One(_) => Err(anyhow!("find() produced HookResult::One unexpectedly")),
        }
    }

    pub async fn get(&self, tenant: TenantContext, id: &str, params: P) -> Result<R> {
        match self.run_pipeline(Call::Get(id.to_string()), tenant, params, None).await? {
            HookResult::One(v) => Ok(v),
            HookResult::Many(_) => Err(anyhow!("get() produced HookResult::Many unexpectedly")),
        }
    }

    pub async fn create(&self, tenant: TenantContext, data: R, params: P) -> Result<R> {
        match self.run_pipeline(Call::Create, tenant, params, Some(data)).await? {
            HookResult::One(v) => Ok(v),
            HookResult::Many(_) => Err(anyhow!("create() produced HookResult::Many unexpectedly")),
        }
    }

    pub async fn update(&self, tenant: TenantContext, id: &str, data: R, params: P) -> Result<R> {
        match self
            .run_pipeline(Call::Update(id.to_string()), tenant, params, Some(data))
            .await?
        {
            HookResult::One(v) => Ok(v),
            HookResult::Many(_) => Err(anyhow!("update() produced HookResult::Many unexpectedly")),
        }
    }

    pub async fn remove(&self, tenant: TenantContext, id: &str, params: P) -> Result<R> {
        match self.run_pipeline(Call::Remove(id.to_string()), tenant, params, None).await? {
            HookResult::One(v) => Ok(v),
            HookResult::Many(_) => Err(anyhow!("remove() produced HookResult::Many unexpectedly")),
        }
    }

    pub async fn related(&self, tenant: TenantContext, id: &str, relation: &str, params: P) -> Result<Vec<R>> {
        match self
            .run_pipeline(Call::Related(id.to_string(), relation.to_string()), tenant, params, None)
            .await?
        {
            HookResult::Many(v) => Ok(v),
            HookResult::One(_) => Err(anyhow!("related() produced HookResult::One unexpectedly")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::hooks::{TallerAfterHook, TallerBeforeHook, TallerErrorHook};
    use crate::{ErrorKind, Principal, ServiceCapabilities, TenantId};

    struct Echo;

    #[async_trait]
    impl TallerService<String, ()> for Echo {
        fn capabilities(&self) -> ServiceCapabilities {
            ServiceCapabilities::from_methods(vec![ServiceMethodKind::Get, ServiceMethodKind::Create])
        }

        async fn get(&self, ctx: &TenantContext, id: &str, _params: ()) -> Result<String> {
            if id == "missing" {
                return Err(TallerError::not_found("Registro no encontrado").into_anyhow());
            }
            Ok(format!("{}:{id}", ctx.tenant()))
        }

        async fn create(&self, _ctx: &TenantContext, data: String, _params: ()) -> Result<String> {
            Ok(data)
        }
    }

    struct Upper;

    #[async_trait]
    impl TallerBeforeHook<String, ()> for Upper {
        async fn run(&self, ctx: &mut HookContext<String, ()>) -> Result<()> {
            if let Some(d) = ctx.data.take() {
                ctx.data = Some(d.to_uppercase());
            }
            Ok(())
        }
    }

    struct Suffix;

    #[async_trait]
    impl TallerAfterHook<String, ()> for Suffix {
        async fn run(&self, ctx: &mut HookContext<String, ()>) -> Result<()> {
            if let Some(HookResult::One(v)) = ctx.result.take() {
                ctx.result = Some(HookResult::One(format!("{v}!")));
            }
            Ok(())
        }
    }

    struct CountErrors(Arc<AtomicUsize>);

    #[async_trait]
    impl TallerErrorHook<String, ()> for CountErrors {
        async fn run(&self, _ctx: &mut HookContext<String, ()>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn tenant(id: i64) -> TenantContext {
        TenantContext::new(Principal::new("1", "admin", TenantId(id)))
    }

    fn app() -> TallerApp<String, ()> {
        let app = TallerApp::new();
        app.register_service("echo", Arc::new(Echo));
        app
    }

    #[tokio::test]
    async fn before_and_after_hooks_wrap_the_call() {
        let app = app();
        let handle = app.service("echo").unwrap().hooks(|h| {
            h.before_create(Arc::new(Upper));
            h.after_all(Arc::new(Suffix));
        });

        let out = handle.create(tenant(1), "hola".to_string(), ()).await.unwrap();
        assert_eq!(out, "HOLA!");

        let out = handle.get(tenant(9), "4", ()).await.unwrap();
        assert_eq!(out, "9:4!");
    }

    #[tokio::test]
    async fn error_hooks_see_failures() {
        let app = app();
        let seen = Arc::new(AtomicUsize::new(0));
        app.hooks(|h| {
            h.error_all(Arc::new(CountErrors(Arc::clone(&seen))));
        });

        let err = app.service("echo").unwrap().get(tenant(1), "missing", ()).await.unwrap_err();
        assert_eq!(TallerError::from_anyhow(&err).unwrap().kind, ErrorKind::NotFound);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undeclared_methods_are_not_allowed() {
        let app = app();
        let err = app.service("echo").unwrap().find(tenant(1), ()).await.unwrap_err();
        assert_eq!(TallerError::from_anyhow(&err).unwrap().kind, ErrorKind::MethodNotAllowed);
    }

    #[test]
    fn unknown_service_is_not_found() {
        let err = app().service("nope").err().unwrap();
        assert_eq!(TallerError::from_anyhow(&err).unwrap().kind, ErrorKind::NotFound);
    }
}
