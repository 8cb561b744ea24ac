//! Startup configuration: defaults first, then `TALLER__SECTION__KEY`
//! environment overrides (`TALLER__HTTP__PORT` → `http.port`).

use serde_json::Value;
use taller_core::{RequestParams, TallerApp};

pub const ENV_PREFIX: &str = "TALLER__";

pub const DEFAULTS: &[(&str, &str)] = &[
    ("http.host", "127.0.0.1"),
    ("http.port", "3030"),
    ("database.url", "sqlite://taller.db?mode=rwc"),
    ("database.max_connections", "10"),
    ("auth.jwt.algorithm", "HS256"),
    ("auth.jwt.leeway", "30"),
    ("auth.claims.tenant", "taller_id"),
    ("auth.claims.subject", "sub"),
    ("auth.claims.role", "rol"),
    ("paginate.default", "50"),
    ("paginate.max", "200"),
];

pub fn apply_defaults(app: &TallerApp<Value, RequestParams>) {
    for (key, value) in DEFAULTS {
        app.set(*key, *value);
    }
}

/// Defaults plus the process environment.
pub fn configure(app: &TallerApp<Value, RequestParams>) {
    apply_defaults(app);
    app.load_env(ENV_PREFIX);
}
