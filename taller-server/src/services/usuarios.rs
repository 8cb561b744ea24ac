//! Hooks for `usuarios`: plaintext passwords are hashed on the way in and
//! the stored hash never leaves the service.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use taller_auth::{HashPasswordHook, PasswordHasher, ProtectHook};
use taller_core::{HookContext, RequestParams, ServiceHooks, TallerBeforeHook, TallerError};

/// New users must bring a password.
pub struct RequirePassword;

#[async_trait]
impl TallerBeforeHook<Value, RequestParams> for RequirePassword {
    async fn run(&self, ctx: &mut HookContext<Value, RequestParams>) -> Result<()> {
        let present = ctx
            .data
            .as_ref()
            .and_then(|d| d.get("password"))
            .is_some_and(|p| !p.is_null());
        if !present {
            return Err(TallerError::bad_request("Faltan campos requeridos: password").into_anyhow());
        }
        Ok(())
    }
}

pub fn register_hooks(hooks: &mut ServiceHooks<Value, RequestParams>, hasher: PasswordHasher) {
    let hash = Arc::new(HashPasswordHook::new("password", "password_hash", hasher));
    hooks
        .before_create(Arc::new(RequirePassword))
        .before_create(hash.clone())
        .before_update(hash)
        .after_all(Arc::new(ProtectHook::from_fields(&["password_hash"])));
}
