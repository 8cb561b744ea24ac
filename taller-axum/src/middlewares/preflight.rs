//! CORS preflight short-circuit.
//!
//! `OPTIONS` on any path is answered `200` with an empty body before
//! authentication or routing sees it. The CORS headers themselves are set
//! by the response-header layers around this one.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

#[derive(Debug, Clone, Copy, Default)]
pub struct PreflightLayer;

impl<S> Layer<S> for PreflightLayer {
    type Service = Preflight<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Preflight { inner }
    }
}

#[derive(Debug, Clone)]
pub struct Preflight<S> {
    inner: S,
}

impl<S> Service<Request> for Preflight<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        if req.method() == Method::OPTIONS {
            return Box::pin(async { Ok(StatusCode::OK.into_response()) });
        }
        Box::pin(self.inner.call(req))
    }
}
