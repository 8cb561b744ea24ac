//! Read-only tenant summary behind `GET /reportes`.
//!
//! Each figure is an aggregate over one resource's own ownership chain, so
//! a report can never count another tenant's rows.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use taller_core::{RequestParams, ServiceCapabilities, TallerError, TallerService, TenantContext};
use taller_sql::{FieldKind, ResourceDescriptor, ScopedQuery, Statement, Store};

use super::resources::{CITAS, CLIENTES, COTIZACIONES, ORDENES, VEHICULOS};

/// Optional `fecha_desde` / `fecha_hasta` bounds.
#[derive(Debug, Clone, Default)]
struct Window {
    desde: Option<String>,
    hasta: Option<String>,
}

impl Window {
    fn from_params(params: &RequestParams) -> Result<Self> {
        let read = |name: &str| -> Result<Option<String>> {
            params
                .query_value(name)
                .map(|raw| {
                    FieldKind::Date
                        .coerce(name, &Value::String(raw.to_string()))
                        .map(|_| raw.to_string())
                        .map_err(TallerError::into_anyhow)
                })
                .transpose()
        };
        Ok(Self {
            desde: read("fecha_desde")?,
            hasta: read("fecha_hasta")?,
        })
    }
}

pub struct ReportesService {
    store: Arc<dyn Store>,
}

impl ReportesService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn query(&self, desc: &'static ResourceDescriptor) -> ScopedQuery<'static> {
        ScopedQuery::new(desc, self.store.dialect())
    }

    async fn scalar(&self, stmt: Statement) -> Result<Value> {
        let row = self.store.fetch_optional(&stmt).await.map_err(TallerError::from)?;
        Ok(row.and_then(|mut r| r.remove("total")).unwrap_or(Value::Null))
    }

    async fn count(&self, desc: &'static ResourceDescriptor, tenant: &TenantContext) -> Result<i64> {
        let stmt = self.query(desc).aggregate(tenant, "COUNT(*) AS total", None, |_| Vec::new());
        Ok(as_i64(&self.scalar(stmt).await?))
    }

    /// `{estado: count}` for one resource, optionally bounded on `date_column`.
    async fn by_estado(
        &self,
        desc: &'static ResourceDescriptor,
        tenant: &TenantContext,
        date_column: Option<&'static str>,
        window: &Window,
    ) -> Result<Map<String, Value>> {
        let stmt = self.query(desc).aggregate(
            tenant,
            "t.estado AS estado, COUNT(*) AS total",
            Some("t.estado"),
            |params| bounds(params, date_column, window),
        );
        let rows = self.store.fetch_all(&stmt).await.map_err(TallerError::from)?;

        let mut out = Map::new();
        for row in rows {
            let estado = match row.get("estado") {
                Some(Value::String(s)) => s.clone(),
                _ => continue,
            };
            out.insert(estado, json!(row.get("total").map(as_i64).unwrap_or(0)));
        }
        Ok(out)
    }

    async fn summary(&self, tenant: &TenantContext, window: &Window) -> Result<Value> {
        let clientes = self.count(&CLIENTES, tenant).await?;
        let vehiculos = self.count(&VEHICULOS, tenant).await?;
        let citas = self.by_estado(&CITAS, tenant, Some("t.fecha"), window).await?;
        let ordenes = self.by_estado(&ORDENES, tenant, Some("t.fecha_ingreso"), window).await?;
        let cotizaciones = self.by_estado(&COTIZACIONES, tenant, None, window).await?;

        let stmt = self
            .query(&COTIZACIONES)
            .aggregate(tenant, "COALESCE(SUM(t.total), 0) AS total", None, |_| Vec::new());
        let total_cotizado = as_f64(&self.scalar(stmt).await?);

        Ok(json!({
            "clientes": clientes,
            "vehiculos": vehiculos,
            "citas_por_estado": citas,
            "ordenes_por_estado": ordenes,
            "cotizaciones_por_estado": cotizaciones,
            "total_cotizado": total_cotizado,
            "fecha_desde": window.desde,
            "fecha_hasta": window.hasta,
        }))
    }
}

fn bounds(params: &mut taller_sql::ParamList, column: Option<&'static str>, window: &Window) -> Vec<String> {
    let Some(column) = column else {
        return Vec::new();
    };
    let mut clauses = Vec::new();
    if let Some(desde) = &window.desde {
        let ph = params.push(desde.clone().into(), Some(FieldKind::Date));
        clauses.push(format!("{column} >= {ph}"));
    }
    if let Some(hasta) = &window.hasta {
        let ph = params.push(hasta.clone().into(), Some(FieldKind::Date));
        clauses.push(format!("{column} <= {ph}"));
    }
    clauses
}

fn as_i64(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

// Postgres returns NUMERIC sums, SQLite REAL or INTEGER.
fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[async_trait]
impl TallerService<Value, RequestParams> for ReportesService {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::read_only()
    }

    async fn find(&self, ctx: &TenantContext, params: RequestParams) -> Result<Vec<Value>> {
        let window = Window::from_params(&params)?;
        Ok(vec![self.summary(ctx, &window).await?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_shapes_are_read_leniently() {
        assert_eq!(as_i64(&json!(3)), 3);
        assert_eq!(as_i64(&json!("4")), 4);
        assert_eq!(as_f64(&json!("12.50")), 12.5);
        assert_eq!(as_f64(&Value::Null), 0.0);
    }

    #[test]
    fn malformed_window_is_rejected() {
        let params = RequestParams::internal().with_query("fecha_desde", "ayer");
        let err = Window::from_params(&params).unwrap_err();
        assert_eq!(TallerError::from_anyhow(&err).unwrap().code(), 400);
    }

    #[test]
    fn bounds_only_apply_with_a_date_column() {
        let window = Window {
            desde: Some("2024-01-01".into()),
            hasta: Some("2024-01-31".into()),
        };
        let mut params = taller_sql::ParamList::new(taller_sql::Dialect::Postgres);
        assert!(bounds(&mut params, None, &window).is_empty());
        assert_eq!(
            bounds(&mut params, Some("t.fecha"), &window),
            vec!["t.fecha >= $1::date".to_string(), "t.fecha <= $2::date".to_string()]
        );
    }
}
