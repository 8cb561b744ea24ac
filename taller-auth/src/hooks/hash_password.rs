// Hash password hook.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use taller_core::errors::TallerError;
use taller_core::hooks::TallerBeforeHook;
use taller_core::HookContext;

use crate::password::PasswordHasher;

/// Replaces a plaintext `password` field with its bcrypt hash.
///
/// A caller-supplied hash field is always discarded, so the stored hash can
/// only come from this hook.
pub struct HashPasswordHook {
    pub field: String,
    pub hash_field: String,
    hasher: PasswordHasher,
}

impl Default for HashPasswordHook {
    fn default() -> Self {
        Self::new("password", "password_hash", PasswordHasher::default())
    }
}

impl HashPasswordHook {
    pub fn new(field: impl Into<String>, hash_field: impl Into<String>, hasher: PasswordHasher) -> Self {
        Self {
            field: field.into(),
            hash_field: hash_field.into(),
            hasher,
        }
    }

    async fn hash_one(&self, v: Value) -> Result<Value> {
        let mut map = match v {
            Value::Object(map) => map,
            other => return Ok(other),
        };

        map.remove(&self.hash_field);

        let Some(pw) = map.remove(&self.field) else {
            return Ok(Value::Object(map));
        };

        let pw = match pw {
            Value::String(s) => s,
            Value::Null => return Ok(Value::Object(map)),
            _ => return Err(TallerError::bad_request("La contraseña debe ser texto").into_anyhow()),
        };

        if pw.trim().is_empty() {
            return Err(TallerError::bad_request("La contraseña no puede estar vacía").into_anyhow());
        }

        let hashed = self.hasher.hash(&pw).await?;
        map.insert(self.hash_field.clone(), Value::String(hashed));
        Ok(Value::Object(map))
    }
}

#[async_trait]
impl<P> TallerBeforeHook<Value, P> for HashPasswordHook
where
    P: Send + Sync + 'static,
{
    async fn run(&self, ctx: &mut HookContext<Value, P>) -> Result<()> {
        let Some(data) = ctx.data.take() else {
            return Ok(());
        };
        ctx.data = Some(self.hash_one(data).await?);
        Ok(())
    }
}
