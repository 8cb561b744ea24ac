use std::collections::HashMap;

/// Transport-neutral request parameters handed to services.
///
/// Only query-string filters and request metadata live here. Tenant
/// identity never does; it travels in [`crate::TenantContext`].
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    pub provider: String,
    pub query: HashMap<String, String>,
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
}

impl RequestParams {
    /// Parameters for in-process calls (no transport).
    pub fn internal() -> Self {
        Self::default()
    }

    pub fn with_query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.insert(key.into(), value.into());
        self
    }

    /// A trimmed, non-empty query value.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
