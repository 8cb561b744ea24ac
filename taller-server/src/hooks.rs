use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use taller_core::{HookContext, RequestParams, TallerApp, TallerBeforeHook, TallerError, TallerErrorHook};

pub struct LogCall;

#[async_trait]
impl TallerBeforeHook<Value, RequestParams> for LogCall {
    async fn run(&self, ctx: &mut HookContext<Value, RequestParams>) -> Result<()> {
        tracing::debug!(
            service = %ctx.service_name,
            method = ctx.method.as_str(),
            tenant = ctx.tenant.tenant(),
            request_id = ctx.params.request_id.as_deref().unwrap_or("-"),
            "service call"
        );
        Ok(())
    }
}

/// Client errors at debug, everything else at error.
pub struct LogError;

#[async_trait]
impl TallerErrorHook<Value, RequestParams> for LogError {
    async fn run(&self, ctx: &mut HookContext<Value, RequestParams>) -> Result<()> {
        let Some(err) = &ctx.error else {
            return Ok(());
        };
        let code = TallerError::from_anyhow(err).map(|e| e.code()).unwrap_or(500);
        if code >= 500 {
            tracing::error!(
                service = %ctx.service_name,
                method = ctx.method.as_str(),
                tenant = ctx.tenant.tenant(),
                error = %err,
                "service call failed"
            );
        } else {
            tracing::debug!(
                service = %ctx.service_name,
                method = ctx.method.as_str(),
                tenant = ctx.tenant.tenant(),
                code,
                error = %err,
                "service call rejected"
            );
        }
        Ok(())
    }
}

pub fn global_hooks(app: &TallerApp<Value, RequestParams>) {
    app.hooks(|h| {
        h.before_all(Arc::new(LogCall));
        h.error_all(Arc::new(LogError));
    });
}
