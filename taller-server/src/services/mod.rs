use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use taller_auth::PasswordHasher;
use taller_axum::AxumApp;
use taller_core::{RequestParams, TallerConfigSnapshot, TallerService};
use taller_sql::{Pagination, ScopedResourceService, Store};

pub mod reportes;
pub mod resources;
pub mod usuarios;

pub use reportes::ReportesService;

pub const API_PREFIX: &str = "/api";

fn pagination(cfg: &TallerConfigSnapshot) -> Pagination {
    let defaults = Pagination::default();
    Pagination {
        default: cfg.get_u64("paginate.default").map(|n| n as i64).unwrap_or(defaults.default),
        max: cfg.get_u64("paginate.max").map(|n| n as i64).unwrap_or(defaults.max),
    }
}

fn hasher(cfg: &TallerConfigSnapshot) -> PasswordHasher {
    match cfg.get_u64("auth.bcrypt.cost") {
        Some(cost) => PasswordHasher::with_cost(cost as u32),
        None => PasswordHasher::default(),
    }
}

/// Mount every resource under `/api/<name>` and attach per-service hooks.
pub fn configure(
    ax: AxumApp<Value, RequestParams>,
    store: Arc<dyn Store>,
    cfg: &TallerConfigSnapshot,
) -> Result<AxumApp<Value, RequestParams>> {
    let page = pagination(cfg);

    let mut ax = ax;
    for desc in resources::ALL {
        let svc: Arc<dyn TallerService<Value, RequestParams>> =
            Arc::new(ScopedResourceService::new(*desc, Arc::clone(&store)).with_pagination(page));
        ax = ax.use_service(&format!("{API_PREFIX}/{}", desc.name), svc);
    }
    ax = ax.use_service(&format!("{API_PREFIX}/reportes"), Arc::new(ReportesService::new(store)));

    let hasher = hasher(cfg);
    ax.app()
        .service(resources::USUARIOS.name)?
        .hooks(|h| usuarios::register_hooks(h, hasher));

    tracing::debug!(services = ?ax.app().service_names(), "services mounted");
    Ok(ax)
}
