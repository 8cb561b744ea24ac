//! The generic tenant-scoped resource service.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use taller_core::{bail_taller, RequestParams, ServiceCapabilities, TallerError, TallerService, TenantContext};

use crate::descriptor::ResourceDescriptor;
use crate::query::{Pagination, ScopedQuery};
use crate::store::Store;
use crate::update;
use crate::value::{FieldKind, Row, SqlValue};

/// Path identifiers are integers; anything else is a bad request.
pub fn parse_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) => Ok(id),
        Err(_) => bail_taller!(bad_request, "Identificador inválido: {}", raw),
    }
}

fn body_object(data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        _ => bail_taller!(bad_request, "El cuerpo debe ser un objeto JSON"),
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// One resource backed by a [`Store`], described by a static
/// [`ResourceDescriptor`].
///
/// Preconditions (target ownership, every payload reference, natural keys)
/// run before the mutating statement, and that statement repeats the
/// ownership predicate itself.
pub struct ScopedResourceService {
    desc: &'static ResourceDescriptor,
    store: Arc<dyn Store>,
    pagination: Pagination,
}

impl ScopedResourceService {
    pub fn new(desc: &'static ResourceDescriptor, store: Arc<dyn Store>) -> Self {
        Self {
            desc,
            store,
            pagination: Pagination::default(),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.desc
    }

    fn query(&self) -> ScopedQuery<'static> {
        ScopedQuery::new(self.desc, self.store.dialect())
    }

    fn row_to_value(&self, desc: &ResourceDescriptor, row: Row) -> Value {
        let mut out = Map::with_capacity(row.len());
        for (col, v) in row {
            let v = match desc.kind_of(&col) {
                Some(kind) => kind.normalize(v),
                None => v,
            };
            out.insert(col, v);
        }
        Value::Object(out)
    }

    /// Ownership pre-check on `desc`; a miss is that resource's 404.
    async fn ensure_owned(&self, desc: &'static ResourceDescriptor, id: i64, tenant: &TenantContext) -> Result<()> {
        let stmt = ScopedQuery::new(desc, self.store.dialect()).exists(id, tenant);
        if self.store.fetch_optional(&stmt).await.map_err(TallerError::from)?.is_none() {
            bail_taller!(not_found, desc.not_found);
        }
        Ok(())
    }

    /// Every reference present in the payload must resolve under the
    /// caller's tenant through the target's own chain.
    async fn ensure_references(&self, data: &Map<String, Value>, tenant: &TenantContext) -> Result<()> {
        for r in self.desc.references {
            let Some(raw) = data.get(r.field) else {
                continue;
            };
            match FieldKind::Integer.coerce(r.field, raw)? {
                SqlValue::Int(id) => self.ensure_owned(r.target, id, tenant).await?,
                _ => continue,
            }
        }
        Ok(())
    }

    /// Natural-key pre-check. Keys not fully present in `data` are skipped.
    async fn ensure_unique(&self, data: &Map<String, Value>, tenant: &TenantContext, exclude: Option<i64>) -> Result<()> {
        for key in self.desc.unique_keys {
            let mut values = Vec::with_capacity(key.fields.len());
            for field in key.fields {
                let kind = self.desc.kind_of(field).unwrap_or(FieldKind::Text);
                match data.get(*field).map(|v| kind.coerce(field, v)).transpose()? {
                    Some(v) if !v.is_null() => values.push(v),
                    _ => break,
                }
            }
            if values.len() != key.fields.len() {
                continue;
            }

            let stmt = self.query().unique_probe(key, &values, tenant, exclude);
            if self.store.fetch_optional(&stmt).await.map_err(TallerError::from)?.is_some() {
                bail_taller!(bad_request, key.message);
            }
        }
        Ok(())
    }

    fn apply_defaults(&self, data: &mut Map<String, Value>) {
        for (field, default) in self.desc.defaults {
            if is_blank(data.get(*field)) {
                data.insert(field.to_string(), default.to_json());
            }
        }
    }

    fn check_required(&self, data: &Map<String, Value>) -> Result<()> {
        let missing: Vec<&str> = self
            .desc
            .required
            .iter()
            .copied()
            .filter(|f| is_blank(data.get(*f)))
            .collect();
        if !missing.is_empty() {
            bail_taller!(bad_request, "Faltan campos requeridos: {}", missing.join(", "));
        }
        Ok(())
    }

    /// A row written with `RETURNING *` lacks the chain projections; read it
    /// back through the scoped select so writes answer with the GET shape.
    async fn with_projections(&self, row: Row, tenant: &TenantContext) -> Result<Value> {
        if self.desc.projections.is_empty() {
            return Ok(self.row_to_value(self.desc, row));
        }
        let id = match row.get("id") {
            Some(Value::Number(n)) => n.as_i64(),
            _ => None,
        };
        let Some(id) = id else {
            return Ok(self.row_to_value(self.desc, row));
        };
        let stmt = self.query().select_one(id, tenant);
        match self.store.fetch_optional(&stmt).await.map_err(TallerError::from)? {
            Some(full) => Ok(self.row_to_value(self.desc, full)),
            None => bail_taller!(not_found, self.desc.not_found),
        }
    }

    async fn list(
        &self,
        desc: &'static ResourceDescriptor,
        tenant: &TenantContext,
        params: &RequestParams,
        parent: Option<(&str, i64)>,
    ) -> Result<Vec<Value>> {
        let page = self.pagination.page(params)?;
        let stmt = ScopedQuery::new(desc, self.store.dialect()).select_many(tenant, params, page, parent)?;
        let rows = self.store.fetch_all(&stmt).await.map_err(TallerError::from)?;
        Ok(rows.into_iter().map(|r| self.row_to_value(desc, r)).collect())
    }
}

#[async_trait]
impl TallerService<Value, RequestParams> for ScopedResourceService {
    fn capabilities(&self) -> ServiceCapabilities {
        self.desc.capabilities()
    }

    async fn find(&self, ctx: &TenantContext, params: RequestParams) -> Result<Vec<Value>> {
        self.list(self.desc, ctx, &params, None).await
    }

    async fn get(&self, ctx: &TenantContext, id: &str, _params: RequestParams) -> Result<Value> {
        let id = parse_id(id)?;
        let stmt = self.query().select_one(id, ctx);
        match self.store.fetch_optional(&stmt).await.map_err(TallerError::from)? {
            Some(row) => Ok(self.row_to_value(self.desc, row)),
            None => bail_taller!(not_found, self.desc.not_found),
        }
    }

    async fn create(&self, ctx: &TenantContext, data: Value, _params: RequestParams) -> Result<Value> {
        let mut data = body_object(data)?;
        self.apply_defaults(&mut data);
        self.check_required(&data)?;

        let mut values = Vec::new();
        for f in self.desc.insertable() {
            let Some(v) = data.get(f.name) else {
                continue;
            };
            let value = f.kind.coerce(f.name, v)?;
            // Leave NOT NULL columns to their store default.
            if value.is_null() && !self.desc.accepts_null(f) {
                continue;
            }
            values.push((f.name, f.kind, value));
        }
        if values.is_empty() {
            bail_taller!(bad_request, "No se proporcionaron campos para crear");
        }

        self.ensure_references(&data, ctx).await?;
        self.ensure_unique(&data, ctx, None).await?;

        let stmt = self.query().insert(ctx, values);
        let row = self
            .store
            .fetch_optional(&stmt)
            .await
            .map_err(TallerError::from)?
            .ok_or_else(|| TallerError::internal("El registro no fue creado").into_anyhow())?;

        tracing::debug!(resource = self.desc.name, tenant = ctx.tenant(), "record created");
        self.with_projections(row, ctx).await
    }

    async fn update(&self, ctx: &TenantContext, id: &str, data: Value, _params: RequestParams) -> Result<Value> {
        let id = parse_id(id)?;
        let data = body_object(data)?;

        let q = self.query();
        let mut params = q.params();
        let set = update::compile(self.desc.policy, &self.desc.updatable(), &data, &mut params)
            .map_err(TallerError::from)?;

        self.ensure_owned(self.desc, id, ctx).await?;
        self.ensure_references(&data, ctx).await?;
        self.ensure_unique(&data, ctx, Some(id)).await?;

        let stmt = q.update(id, ctx, &set, params);
        match self.store.fetch_optional(&stmt).await.map_err(TallerError::from)? {
            Some(row) => self.with_projections(row, ctx).await,
            // Deleted or reassigned between the pre-check and the update.
            None => bail_taller!(not_found, self.desc.not_found),
        }
    }

    async fn remove(&self, ctx: &TenantContext, id: &str, _params: RequestParams) -> Result<Value> {
        let id = parse_id(id)?;
        let stmt = self.query().delete(id, ctx);
        match self.store.fetch_optional(&stmt).await.map_err(TallerError::from)? {
            Some(row) => Ok(self.row_to_value(self.desc, row)),
            None => bail_taller!(not_found, self.desc.not_found),
        }
    }

    async fn related(
        &self,
        ctx: &TenantContext,
        id: &str,
        relation: &str,
        params: RequestParams,
    ) -> Result<Vec<Value>> {
        let Some(route) = self.desc.child(relation) else {
            bail_taller!(not_found, "Recurso no encontrado: {}/{}", self.desc.name, relation);
        };
        let id = parse_id(id)?;
        self.ensure_owned(self.desc, id, ctx).await?;
        self.list(route.child, ctx, &params, Some((route.column, id))).await
    }
}
