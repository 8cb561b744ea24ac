use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use taller_auth::CredentialVerifier;
use taller_core::{TallerApp, TallerError, TallerService};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middlewares::PreflightLayer;
use crate::params::{FromRestParams, REQUEST_ID_HEADER};
use crate::rest;
use crate::{TallerAxumError, TallerAxumState};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

pub struct AxumApp<R, P = ()>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub state: TallerAxumState<R, P>,
    pub router: Router<()>,
}

impl<R, P> Clone for AxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl<R, P> AxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    pub fn new(app: TallerApp<R, P>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            state: TallerAxumState::new(app, verifier),
            router: Router::new(),
        }
    }

    pub fn app(&self) -> &TallerApp<R, P> {
        &self.state.app
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    /// An unauthenticated GET endpoint, e.g. a health probe.
    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Register `service` under the last segment of `path` (`/api/citas` →
    /// `citas`) and mount its REST routes at `path`.
    pub fn use_service(mut self, path: &str, service: Arc<dyn TallerService<R, P>>) -> Self
    where
        R: Serialize + DeserializeOwned,
        P: FromRestParams,
    {
        let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
        self.state.app.register_service(name, service);

        let service_name = Arc::new(name.to_string());
        let router = rest::service_router(service_name, self.state.clone());

        self.router = self.router.nest(path, router);
        self
    }

    /// The finished router: unknown paths answer 404, preflights 200, and
    /// every response carries the CORS headers and an `x-request-id`.
    pub fn into_router(self) -> Router {
        let request_id = header::HeaderName::from_static(REQUEST_ID_HEADER);

        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!("request", method = %req.method(), uri = %req.uri(), request_id)
            }))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static(ALLOW_ORIGIN),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOW_METHODS),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOW_HEADERS),
            ))
            .layer(PreflightLayer);

        self.router.fallback(unknown_route).layer(layers)
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

async fn unknown_route() -> TallerAxumError {
    TallerError::not_found("Recurso no encontrado").into()
}

pub fn axum<R, P>(app: TallerApp<R, P>, verifier: Arc<dyn CredentialVerifier>) -> AxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + Clone + 'static,
{
    AxumApp::new(app, verifier)
}
