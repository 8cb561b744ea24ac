//! Tenant-scoped statement builder.
//!
//! Every statement produced here carries the resource's full ownership
//! chain with the tenant id bound as a parameter. There is no code path
//! that emits an unscoped read, update or delete.

use taller_core::{RequestParams, TallerError, TenantContext};

use crate::descriptor::{ResourceDescriptor, UniqueKey, BASE_ALIAS};
use crate::dialect::{Dialect, ParamList, Statement};
use crate::update::CompiledUpdate;
use crate::value::{FieldKind, SqlValue};

/// Page window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Page-size bounds, usually from `paginate.default` / `paginate.max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub default: i64,
    pub max: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { default: 50, max: 200 }
    }
}

impl Pagination {
    /// Read `limit`/`offset` from the query string, clamped to the bounds.
    pub fn page(&self, params: &RequestParams) -> Result<Page, TallerError> {
        let parse = |name: &str| -> Result<Option<i64>, TallerError> {
            params
                .query_value(name)
                .map(|v| {
                    v.parse::<i64>()
                        .ok()
                        .filter(|n| *n >= 0)
                        .ok_or_else(|| TallerError::bad_request(format!("Parámetro '{name}' inválido")))
                })
                .transpose()
        };

        let limit = parse("limit")?.unwrap_or(self.default).clamp(1, self.max.max(1));
        let offset = parse("offset")?.unwrap_or(0);
        Ok(Page { limit, offset })
    }
}

/// Builds statements for one resource in one dialect.
#[derive(Debug, Clone, Copy)]
pub struct ScopedQuery<'a> {
    desc: &'a ResourceDescriptor,
    dialect: Dialect,
}

impl<'a> ScopedQuery<'a> {
    pub fn new(desc: &'a ResourceDescriptor, dialect: Dialect) -> Self {
        Self { desc, dialect }
    }

    pub fn descriptor(&self) -> &'a ResourceDescriptor {
        self.desc
    }

    pub fn params(&self) -> ParamList {
        ParamList::new(self.dialect)
    }

    fn from_clause(&self) -> String {
        self.desc.ownership.from_clause(self.desc.table)
    }

    /// `<tenant column> = $n`
    pub fn tenant_predicate(&self, tenant: &TenantContext, params: &mut ParamList) -> String {
        let ph = params.push(SqlValue::Int(tenant.tenant()), Some(FieldKind::Integer));
        format!("{} = {ph}", self.desc.ownership.tenant_column)
    }

    fn projection(&self) -> String {
        let mut cols = vec![format!("{BASE_ALIAS}.*")];
        for p in self.desc.projections {
            cols.push(format!("{} AS {}", p.expr, p.alias));
        }
        cols.join(", ")
    }

    /// `SELECT ... WHERE t.id = $1 AND <chain> = $2`
    pub fn select_one(&self, id: i64, tenant: &TenantContext) -> Statement {
        let mut params = self.params();
        let id_ph = params.push(SqlValue::Int(id), Some(FieldKind::Integer));
        let tenant_pred = self.tenant_predicate(tenant, &mut params);
        let sql = format!(
            "SELECT {} FROM {} WHERE {BASE_ALIAS}.id = {id_ph} AND {tenant_pred}",
            self.projection(),
            self.from_clause(),
        );
        params.finish(sql)
    }

    /// Ownership pre-check: one row iff `id` exists under this tenant.
    pub fn exists(&self, id: i64, tenant: &TenantContext) -> Statement {
        let mut params = self.params();
        let id_ph = params.push(SqlValue::Int(id), Some(FieldKind::Integer));
        let tenant_pred = self.tenant_predicate(tenant, &mut params);
        let sql = format!(
            "SELECT {BASE_ALIAS}.id FROM {} WHERE {BASE_ALIAS}.id = {id_ph} AND {tenant_pred}",
            self.from_clause(),
        );
        params.finish(sql)
    }

    /// List rows of this tenant with the caller's filters layered on top.
    ///
    /// `parent` adds `AND <column> = $n` for related listings.
    pub fn select_many(
        &self,
        tenant: &TenantContext,
        query: &RequestParams,
        page: Page,
        parent: Option<(&str, i64)>,
    ) -> Result<Statement, TallerError> {
        let mut params = self.params();
        let mut clauses = vec![self.tenant_predicate(tenant, &mut params)];

        if let Some((column, id)) = parent {
            let ph = params.push(SqlValue::Int(id), Some(FieldKind::Integer));
            clauses.push(format!("{column} = {ph}"));
        }

        for f in self.desc.filters {
            let Some(raw) = query.query_value(f.param) else {
                continue;
            };
            let value = f.kind.coerce(f.param, &serde_json::Value::String(raw.to_string()))?;
            let ph = params.push(value, Some(f.kind));
            clauses.push(format!("{} {} {ph}", f.column, f.op.as_sql()));
        }

        if let Some(term) = query.query_value("search") {
            if !self.desc.search_columns.is_empty() {
                let ph = params.push(SqlValue::Text(format!("%{}%", term.to_lowercase())), None);
                let ors = self
                    .desc
                    .search_columns
                    .iter()
                    .map(|c| format!("LOWER(CAST({c} AS TEXT)) LIKE {ph}"))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                clauses.push(format!("({ors})"));
            }
        }

        let limit_ph = params.push(SqlValue::Int(page.limit), Some(FieldKind::Integer));
        let offset_ph = params.push(SqlValue::Int(page.offset), Some(FieldKind::Integer));

        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT {limit_ph} OFFSET {offset_ph}",
            self.projection(),
            self.from_clause(),
            clauses.join(" AND "),
            self.desc.order_by,
        );
        Ok(params.finish(sql))
    }

    /// `INSERT ... RETURNING *`. Columns must come from the descriptor.
    ///
    /// A directly owned resource gets its tenant column from `tenant`.
    pub fn insert(&self, tenant: &TenantContext, values: Vec<(&'static str, FieldKind, SqlValue)>) -> Statement {
        let mut params = self.params();
        let mut columns = Vec::with_capacity(values.len() + 1);
        let mut placeholders = Vec::with_capacity(values.len() + 1);

        for (column, kind, value) in values {
            columns.push(column);
            placeholders.push(params.push(value, Some(kind)));
        }
        if let Some(owned) = self.desc.ownership.owned_column() {
            columns.push(owned);
            placeholders.push(params.push(SqlValue::Int(tenant.tenant()), Some(FieldKind::Integer)));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.desc.table,
            columns.join(", "),
            placeholders.join(", "),
        );
        params.finish(sql)
    }

    /// `id IN (SELECT t.id FROM <chain> WHERE <tenant>)`
    fn scoped_ids(&self, tenant: &TenantContext, params: &mut ParamList) -> String {
        let tenant_pred = self.tenant_predicate(tenant, params);
        format!(
            "id IN (SELECT {BASE_ALIAS}.id FROM {} WHERE {tenant_pred})",
            self.from_clause()
        )
    }

    /// Finish an update whose `SET` values are already in `params`.
    pub fn update(&self, id: i64, tenant: &TenantContext, set: &CompiledUpdate, mut params: ParamList) -> Statement {
        let id_ph = params.push(SqlValue::Int(id), Some(FieldKind::Integer));
        let scoped = self.scoped_ids(tenant, &mut params);
        let sql = format!(
            "UPDATE {} SET {} WHERE id = {id_ph} AND {scoped} RETURNING *",
            self.desc.table, set.set_clause,
        );
        params.finish(sql)
    }

    /// `DELETE ... WHERE id = $1 AND id IN (<scoped ids>) RETURNING *`
    pub fn delete(&self, id: i64, tenant: &TenantContext) -> Statement {
        let mut params = self.params();
        let id_ph = params.push(SqlValue::Int(id), Some(FieldKind::Integer));
        let scoped = self.scoped_ids(tenant, &mut params);
        let sql = format!("DELETE FROM {} WHERE id = {id_ph} AND {scoped} RETURNING *", self.desc.table);
        params.finish(sql)
    }

    /// Look for another row of this tenant with the same natural key.
    pub fn unique_probe(
        &self,
        key: &UniqueKey,
        values: &[SqlValue],
        tenant: &TenantContext,
        exclude_id: Option<i64>,
    ) -> Statement {
        let mut params = self.params();
        let mut clauses = vec![self.tenant_predicate(tenant, &mut params)];
        for (field, value) in key.fields.iter().zip(values) {
            let ph = params.push(value.clone(), self.desc.kind_of(field));
            clauses.push(format!("{BASE_ALIAS}.{field} = {ph}"));
        }
        if let Some(id) = exclude_id {
            let ph = params.push(SqlValue::Int(id), Some(FieldKind::Integer));
            clauses.push(format!("{BASE_ALIAS}.id <> {ph}"));
        }
        let sql = format!(
            "SELECT {BASE_ALIAS}.id FROM {} WHERE {} LIMIT 1",
            self.from_clause(),
            clauses.join(" AND "),
        );
        params.finish(sql)
    }

    /// Scoped aggregate: `SELECT <select> FROM <chain> WHERE <tenant> [AND extra] [GROUP BY]`.
    ///
    /// `select`, `extra` and `group_by` must be code-defined; values for
    /// `extra` go through `bind`.
    pub fn aggregate(
        &self,
        tenant: &TenantContext,
        select: &str,
        group_by: Option<&str>,
        bind: impl FnOnce(&mut ParamList) -> Vec<String>,
    ) -> Statement {
        let mut params = self.params();
        let mut clauses = vec![self.tenant_predicate(tenant, &mut params)];
        clauses.extend(bind(&mut params));
        let mut sql = format!("SELECT {select} FROM {} WHERE {}", self.from_clause(), clauses.join(" AND "));
        if let Some(g) = group_by {
            sql.push_str(&format!(" GROUP BY {g} ORDER BY {g}"));
        }
        params.finish(sql)
    }
}

#[cfg(test)]
mod tests {
    use taller_core::{Principal, TenantId};

    use super::*;
    use crate::descriptor::{
        FieldSpec, FilterOp, FilterSpec, JoinStep, OwnershipChain, Projection, UpdatePolicy, CRUD,
    };
    use crate::update::compile_update;

    const CITA_CHAIN: &[JoinStep] = &[
        JoinStep {
            table: "vehiculos",
            alias: "v",
            on: "v.id = t.vehiculo_id",
        },
        JoinStep {
            table: "clientes",
            alias: "c",
            on: "c.id = v.cliente_id",
        },
    ];

    static CITAS: ResourceDescriptor = ResourceDescriptor {
        name: "citas",
        table: "citas",
        fields: &[
            FieldSpec::rw("vehiculo_id", FieldKind::Integer),
            FieldSpec::rw("fecha", FieldKind::Date),
            FieldSpec::rw("estado", FieldKind::Text),
        ],
        ownership: OwnershipChain::through(CITA_CHAIN, "c.taller_id"),
        references: &[],
        filters: &[
            FilterSpec::eq("estado", "t.estado", FieldKind::Text),
            FilterSpec::range("fecha_desde", "t.fecha", FilterOp::Gte, FieldKind::Date),
        ],
        search_columns: &["c.nombre", "v.placa"],
        projections: &[Projection {
            expr: "v.placa",
            alias: "vehiculo_placa",
        }],
        order_by: "t.fecha DESC, t.id DESC",
        defaults: &[],
        required: &[],
        unique_keys: &[],
        children: &[],
        policy: UpdatePolicy::AllowList,
        not_found: "Cita no encontrada",
        methods: CRUD,
    };

    static CLIENTES: ResourceDescriptor = ResourceDescriptor {
        name: "clientes",
        table: "clientes",
        fields: &[FieldSpec::rw("nombre", FieldKind::Text)],
        ownership: OwnershipChain::direct(),
        references: &[],
        filters: &[],
        search_columns: &[],
        projections: &[],
        order_by: "t.id",
        defaults: &[],
        required: &[],
        unique_keys: &[],
        children: &[],
        policy: UpdatePolicy::AllowList,
        not_found: "Cliente no encontrado",
        methods: CRUD,
    };

    fn tenant(id: i64) -> TenantContext {
        TenantContext::new(Principal::new("1", "admin", TenantId(id)))
    }

    const JOINED: &str = "citas t JOIN vehiculos v ON v.id = t.vehiculo_id JOIN clientes c ON c.id = v.cliente_id";

    #[test]
    fn read_one_applies_full_chain() {
        let stmt = ScopedQuery::new(&CITAS, Dialect::Sqlite).select_one(7, &tenant(2));
        assert_eq!(
            stmt.sql,
            format!("SELECT t.*, v.placa AS vehiculo_placa FROM {JOINED} WHERE t.id = $1 AND c.taller_id = $2")
        );
        assert_eq!(stmt.params, vec![SqlValue::Int(7), SqlValue::Int(2)]);
    }

    #[test]
    fn read_many_binds_every_filter() {
        let query = RequestParams::internal()
            .with_query("estado", "pendiente")
            .with_query("fecha_desde", "2024-01-01")
            .with_query("search", "ABC")
            .with_query("ignored", "x");
        let stmt = ScopedQuery::new(&CITAS, Dialect::Postgres)
            .select_many(&tenant(2), &query, Page { limit: 10, offset: 0 }, None)
            .unwrap();

        assert_eq!(
            stmt.sql,
            format!(
                "SELECT t.*, v.placa AS vehiculo_placa FROM {JOINED} WHERE c.taller_id = $1::bigint \
                 AND t.estado = $2 AND t.fecha >= $3::date \
                 AND (LOWER(CAST(c.nombre AS TEXT)) LIKE $4 OR LOWER(CAST(v.placa AS TEXT)) LIKE $4) \
                 ORDER BY t.fecha DESC, t.id DESC LIMIT $5::bigint OFFSET $6::bigint"
            )
        );
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Int(2),
                SqlValue::Text("pendiente".into()),
                SqlValue::Text("2024-01-01".into()),
                SqlValue::Text("%abc%".into()),
                SqlValue::Int(10),
                SqlValue::Int(0),
            ]
        );
    }

    #[test]
    fn bad_filter_value_is_bad_request() {
        let query = RequestParams::internal().with_query("fecha_desde", "mañana");
        let err = ScopedQuery::new(&CITAS, Dialect::Sqlite)
            .select_many(&tenant(1), &query, Page { limit: 10, offset: 0 }, None)
            .unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn delete_repeats_the_chain() {
        let stmt = ScopedQuery::new(&CITAS, Dialect::Sqlite).delete(7, &tenant(2));
        assert_eq!(
            stmt.sql,
            format!("DELETE FROM citas WHERE id = $1 AND id IN (SELECT t.id FROM {JOINED} WHERE c.taller_id = $2) RETURNING *")
        );
    }

    #[test]
    fn update_numbers_after_set_values() {
        let q = ScopedQuery::new(&CITAS, Dialect::Sqlite);
        let mut params = q.params();
        let body = serde_json::json!({"estado": "cerrada"});
        let set = compile_update(&CITAS.updatable(), body.as_object().unwrap(), &mut params).unwrap();
        let stmt = q.update(7, &tenant(2), &set, params);
        assert_eq!(
            stmt.sql,
            format!(
                "UPDATE citas SET estado = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 \
                 AND id IN (SELECT t.id FROM {JOINED} WHERE c.taller_id = $3) RETURNING *"
            )
        );
        assert_eq!(
            stmt.params,
            vec![SqlValue::Text("cerrada".into()), SqlValue::Int(7), SqlValue::Int(2)]
        );
    }

    #[test]
    fn insert_takes_tenant_from_context_for_direct_resources() {
        let stmt = ScopedQuery::new(&CLIENTES, Dialect::Sqlite).insert(
            &tenant(4),
            vec![("nombre", FieldKind::Text, SqlValue::Text("Ana".into()))],
        );
        assert_eq!(stmt.sql, "INSERT INTO clientes (nombre, taller_id) VALUES ($1, $2) RETURNING *");
        assert_eq!(stmt.params, vec![SqlValue::Text("Ana".into()), SqlValue::Int(4)]);

        let stmt = ScopedQuery::new(&CITAS, Dialect::Sqlite).insert(
            &tenant(4),
            vec![("vehiculo_id", FieldKind::Integer, SqlValue::Int(3))],
        );
        assert_eq!(stmt.sql, "INSERT INTO citas (vehiculo_id) VALUES ($1) RETURNING *");
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { default: 20, max: 100 };
        assert_eq!(p.page(&RequestParams::internal()).unwrap(), Page { limit: 20, offset: 0 });
        let q = RequestParams::internal().with_query("limit", "5000").with_query("offset", "40");
        assert_eq!(p.page(&q).unwrap(), Page { limit: 100, offset: 40 });
        let q = RequestParams::internal().with_query("limit", "-1");
        assert!(p.page(&q).is_err());
    }
}
