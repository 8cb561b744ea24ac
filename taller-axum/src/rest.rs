//! REST routes for one registered service.
//!
//! | method | path                 | service call |
//! |--------|----------------------|--------------|
//! | GET    | `/`                  | `find`       |
//! | POST   | `/`                  | `create`     |
//! | GET    | `/{id}`              | `get`        |
//! | PUT    | `/{id}`              | `update`     |
//! | DELETE | `/{id}`              | `remove`     |
//! | GET    | `/{id}/{relation}`   | `related`    |
//!
//! Every handler authenticates first; the tenant comes from the verified
//! credential only.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{OriginalUri, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use taller_core::{TallerError, TenantContext};

use crate::{
    envelope::Envelope,
    params::{FromRestParams, RestParams},
    TallerAxumError, TallerAxumState,
};

type QueryMap = Query<HashMap<String, String>>;

fn map_json_rejection(rejection: JsonRejection) -> TallerAxumError {
    tracing::debug!(reason = %rejection.body_text(), "request body rejected");
    TallerError::bad_request("El cuerpo de la solicitud no es JSON válido").into()
}

/// Resolve the caller's tenant from `Authorization: Bearer <token>`.
pub fn authenticate<R, P>(state: &TallerAxumState<R, P>, headers: &HeaderMap) -> Result<TenantContext, TallerAxumError>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    state.verifier.authenticate(header).map_err(|err| {
        tracing::debug!(reason = %err, "credential rejected");
        TallerAxumError::from(TallerError::from(err))
    })
}

fn params_of<P: FromRestParams>(headers: &HeaderMap, query: HashMap<String, String>, method: &str, uri: &axum::http::Uri) -> P {
    P::from_rest_params(RestParams::from_parts("rest", headers, query, method, uri))
}

fn ok<T: Serialize>(status: StatusCode, body: Envelope<T>) -> Response {
    (status, Json(body)).into_response()
}

pub async fn method_not_allowed(method: Method) -> TallerAxumError {
    TallerError::method_not_allowed(format!("Método no permitido: {method}")).into()
}

pub fn service_router<R, P>(service_name: Arc<String>, state: TallerAxumState<R, P>) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    Router::new()
        .route(
            "/",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<TallerAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): QueryMap,
                      OriginalUri(uri): OriginalUri| async move {
                    let tenant = authenticate(&state, &headers)?;
                    let params = params_of::<P>(&headers, query, "GET", &uri);

                    let svc = state.app.service(&service_name)?;
                    let res = svc.find(tenant, params).await?;
                    Ok::<_, TallerAxumError>(ok(StatusCode::OK, Envelope::many(res)))
                }
            })
            .post({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<TallerAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): QueryMap,
                      OriginalUri(uri): OriginalUri,
                      data: Result<Json<R>, JsonRejection>| async move {
                    let tenant = authenticate(&state, &headers)?;
                    let Json(data) = data.map_err(map_json_rejection)?;
                    let params = params_of::<P>(&headers, query, "POST", &uri);

                    let svc = state.app.service(&service_name)?;
                    let res = svc.create(tenant, data, params).await?;
                    Ok::<_, TallerAxumError>(ok(StatusCode::CREATED, Envelope::one(res)))
                }
            })
            .fallback(method_not_allowed),
        )
        .route(
            "/{id}",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<TallerAxumState<R, P>>,
                      headers: HeaderMap,
                      Path(id): Path<String>,
                      Query(query): QueryMap,
                      OriginalUri(uri): OriginalUri| async move {
                    let tenant = authenticate(&state, &headers)?;
                    let params = params_of::<P>(&headers, query, "GET", &uri);

                    let svc = state.app.service(&service_name)?;
                    let res = svc.get(tenant, &id, params).await?;
                    Ok::<_, TallerAxumError>(ok(StatusCode::OK, Envelope::one(res)))
                }
            })
            .put({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<TallerAxumState<R, P>>,
                      headers: HeaderMap,
                      Path(id): Path<String>,
                      Query(query): QueryMap,
                      OriginalUri(uri): OriginalUri,
                      data: Result<Json<R>, JsonRejection>| async move {
                    let tenant = authenticate(&state, &headers)?;
                    let Json(data) = data.map_err(map_json_rejection)?;
                    let params = params_of::<P>(&headers, query, "PUT", &uri);

                    let svc = state.app.service(&service_name)?;
                    let res = svc.update(tenant, &id, data, params).await?;
                    Ok::<_, TallerAxumError>(ok(StatusCode::OK, Envelope::one(res)))
                }
            })
            .delete({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<TallerAxumState<R, P>>,
                      headers: HeaderMap,
                      Path(id): Path<String>,
                      Query(query): QueryMap,
                      OriginalUri(uri): OriginalUri| async move {
                    let tenant = authenticate(&state, &headers)?;
                    let params = params_of::<P>(&headers, query, "DELETE", &uri);

                    let svc = state.app.service(&service_name)?;
                    let res = svc.remove(tenant, &id, params).await?;
                    Ok::<_, TallerAxumError>(ok(StatusCode::OK, Envelope::one(res)))
                }
            })
            .fallback(method_not_allowed),
        )
        .route(
            "/{id}/{relation}",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<TallerAxumState<R, P>>,
                      headers: HeaderMap,
                      Path((id, relation)): Path<(String, String)>,
                      Query(query): QueryMap,
                      OriginalUri(uri): OriginalUri| async move {
                    let tenant = authenticate(&state, &headers)?;
                    let params = params_of::<P>(&headers, query, "GET", &uri);

                    let svc = state.app.service(&service_name)?;
                    let res = svc.related(tenant, &id, &relation, params).await?;
                    Ok::<_, TallerAxumError>(ok(StatusCode::OK, Envelope::many(res)))
                }
            })
            .fallback(method_not_allowed),
        )
        .with_state(state)
}
