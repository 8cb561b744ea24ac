// Protect hook.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use taller_core::hooks::TallerAfterHook;
use taller_core::{HookContext, HookResult};

/// Strips fields from every record a service returns.
pub struct ProtectHook {
    fields: HashSet<String>,
}

impl ProtectHook {
    pub fn from_fields(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn strip_one(&self, mut v: Value) -> Value {
        if let Value::Object(map) = &mut v {
            for f in &self.fields {
                map.remove(f);
            }
        }
        v
    }
}

#[async_trait]
impl<P> TallerAfterHook<Value, P> for ProtectHook
where
    P: Send + Sync + 'static,
{
    async fn run(&self, ctx: &mut HookContext<Value, P>) -> Result<()> {
        let Some(res) = ctx.result.take() else {
            return Ok(());
        };

        ctx.result = Some(match res {
            HookResult::One(v) => HookResult::One(self.strip_one(v)),
            HookResult::Many(vs) => HookResult::Many(vs.into_iter().map(|v| self.strip_one(v)).collect()),
        });

        Ok(())
    }
}
