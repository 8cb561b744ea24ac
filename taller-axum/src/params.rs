use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::Uri;
use taller_core::RequestParams;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Default)]
pub struct RestParams {
    pub provider: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub method: String,
    pub path: String,
    pub raw_query: Option<String>,
}

impl RestParams {
    /// The `authorization` header is never copied; credentials stop at the
    /// verifier.
    pub fn from_parts(
        provider: &str,
        headers: &HeaderMap,
        query: HashMap<String, String>,
        method: &str,
        uri: &Uri,
    ) -> Self {
        let mut out = Self {
            provider: provider.to_string(),
            headers: HashMap::new(),
            query,
            method: method.to_string(),
            path: uri.path().to_string(),
            raw_query: uri.query().map(|s| s.to_string()),
        };

        for (k, v) in headers.iter() {
            if k == axum::http::header::AUTHORIZATION {
                continue;
            }
            if let Ok(s) = v.to_str() {
                out.headers.insert(k.to_string(), s.to_string());
            }
        }

        out
    }
}

pub trait FromRestParams: Sized {
    fn from_rest_params(params: RestParams) -> Self;
}

impl FromRestParams for RestParams {
    fn from_rest_params(params: RestParams) -> Self {
        params
    }
}

impl FromRestParams for () {
    fn from_rest_params(_params: RestParams) -> Self {}
}

impl FromRestParams for RequestParams {
    fn from_rest_params(mut params: RestParams) -> Self {
        let request_id = params.headers.remove(REQUEST_ID_HEADER);
        RequestParams {
            provider: params.provider,
            query: params.query,
            method: params.method,
            path: params.path,
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn credentials_do_not_reach_service_params() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-1"));
        let uri: Uri = "/api/citas?estado=abierta".parse().unwrap();

        let mut query = HashMap::new();
        query.insert("estado".to_string(), "abierta".to_string());
        let rest = RestParams::from_parts("rest", &headers, query, "GET", &uri);
        assert!(!rest.headers.contains_key("authorization"));
        assert_eq!(rest.raw_query.as_deref(), Some("estado=abierta"));

        let params = RequestParams::from_rest_params(rest);
        assert_eq!(params.request_id.as_deref(), Some("req-1"));
        assert_eq!(params.path, "/api/citas");
        assert_eq!(params.query_value("estado"), Some("abierta"));
    }
}
