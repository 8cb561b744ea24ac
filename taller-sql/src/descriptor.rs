//! Static per-resource descriptors.
//!
//! Every table name, column name and join below is code-defined. Request
//! input only ever selects among these entries; it never contributes SQL
//! text.

use std::fmt;

use serde_json::Value;
use taller_core::{ServiceCapabilities, ServiceMethodKind};

use crate::value::FieldKind;

/// Alias of the resource's own table in every generated statement.
pub const BASE_ALIAS: &str = "t";

/// One writable (or readable-only) column of a resource.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub insert: bool,
    pub update: bool,
    /// Whether an explicit `null` may be written.
    pub nullable: bool,
}

impl FieldSpec {
    /// Settable on create and update.
    pub const fn rw(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            insert: true,
            update: true,
            nullable: true,
        }
    }

    /// Settable on create only.
    pub const fn create_only(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            insert: true,
            update: false,
            nullable: true,
        }
    }

    /// Returned by reads, never written through the API.
    pub const fn read_only(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            insert: false,
            update: false,
            nullable: true,
        }
    }

    /// Backed by a `NOT NULL` column; the store default applies when omitted.
    pub const fn not_null(self) -> Self {
        Self { nullable: false, ..self }
    }
}

/// `JOIN <table> <alias> ON <on>`
#[derive(Debug, Clone, Copy)]
pub struct JoinStep {
    pub table: &'static str,
    pub alias: &'static str,
    pub on: &'static str,
}

/// Joins from a resource's table to the column holding its tenant id.
#[derive(Debug, Clone, Copy)]
pub struct OwnershipChain {
    pub joins: &'static [JoinStep],
    /// Qualified, e.g. `t.taller_id` or `c.taller_id`.
    pub tenant_column: &'static str,
}

impl OwnershipChain {
    pub const fn direct() -> Self {
        Self {
            joins: &[],
            tenant_column: "t.taller_id",
        }
    }

    pub const fn through(joins: &'static [JoinStep], tenant_column: &'static str) -> Self {
        Self { joins, tenant_column }
    }

    /// The resource's own tenant column, when it carries one.
    pub fn owned_column(&self) -> Option<&'static str> {
        if self.joins.is_empty() {
            self.tenant_column.strip_prefix("t.")
        } else {
            None
        }
    }

    /// `<table> t JOIN ... ON ...`
    pub fn from_clause(&self, table: &str) -> String {
        let mut out = format!("{table} {BASE_ALIAS}");
        for j in self.joins {
            out.push_str(&format!(" JOIN {} {} ON {}", j.table, j.alias, j.on));
        }
        out
    }
}

/// A payload column referencing another tenant-owned resource.
#[derive(Clone, Copy)]
pub struct Reference {
    pub field: &'static str,
    pub target: &'static ResourceDescriptor,
}

// Descriptors reference each other in cycles; print names only.
impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("field", &self.field)
            .field("target", &self.target.name)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }
}

/// `?<param>=value` becomes `AND <column> <op> $n`.
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    pub param: &'static str,
    pub column: &'static str,
    pub op: FilterOp,
    pub kind: FieldKind,
}

impl FilterSpec {
    pub const fn eq(param: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            param,
            column,
            op: FilterOp::Eq,
            kind,
        }
    }

    pub const fn range(param: &'static str, column: &'static str, op: FilterOp, kind: FieldKind) -> Self {
        Self { param, column, op, kind }
    }
}

/// Extra read column taken from a table joined by the ownership chain.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub expr: &'static str,
    pub alias: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Text(&'static str),
    Bool(bool),
    Int(i64),
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            DefaultValue::Text(s) => Value::String(s.to_string()),
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Int(i) => Value::from(i),
        }
    }
}

/// A natural key unique within the tenant.
#[derive(Debug, Clone, Copy)]
pub struct UniqueKey {
    pub fields: &'static [&'static str],
    pub message: &'static str,
}

/// `/<resource>/{id}/<relation>` lists `child` rows whose `column` equals id.
#[derive(Clone, Copy)]
pub struct ChildRoute {
    pub relation: &'static str,
    pub child: &'static ResourceDescriptor,
    /// Qualified on the child's base alias, e.g. `t.cliente_id`.
    pub column: &'static str,
}

impl fmt::Debug for ChildRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildRoute")
            .field("relation", &self.relation)
            .field("child", &self.child.name)
            .field("column", &self.column)
            .finish()
    }
}

/// How PUT bodies compile into `SET` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Only supplied, allow-listed fields are assigned.
    AllowList,
    /// Every allow-listed field is assigned `COALESCE($n, column)`.
    Coalesce,
}

#[derive(Debug)]
pub struct ResourceDescriptor {
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    pub ownership: OwnershipChain,
    pub references: &'static [Reference],
    pub filters: &'static [FilterSpec],
    /// Qualified columns matched by `?search=`.
    pub search_columns: &'static [&'static str],
    pub projections: &'static [Projection],
    pub order_by: &'static str,
    pub defaults: &'static [(&'static str, DefaultValue)],
    pub required: &'static [&'static str],
    pub unique_keys: &'static [UniqueKey],
    pub children: &'static [ChildRoute],
    pub policy: UpdatePolicy,
    /// Message of the 404 for this resource, e.g. "Cita no encontrada".
    pub not_found: &'static str,
    pub methods: &'static [ServiceMethodKind],
}

impl ResourceDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn kind_of(&self, column: &str) -> Option<FieldKind> {
        if column == "id" {
            return Some(FieldKind::Integer);
        }
        self.field(column).map(|f| f.kind)
    }

    pub fn insertable(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.insert)
    }

    /// Whether `field` may be set to NULL. Required and defaulted fields
    /// never may.
    pub fn accepts_null(&self, field: &FieldSpec) -> bool {
        field.nullable && !self.required.contains(&field.name) && !self.defaults.iter().any(|(d, _)| *d == field.name)
    }

    /// Update allow-list, with `nullable` resolved against the descriptor.
    pub fn updatable(&self) -> Vec<FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.update)
            .map(|f| FieldSpec {
                nullable: self.accepts_null(f),
                ..*f
            })
            .collect()
    }

    pub fn child(&self, relation: &str) -> Option<&ChildRoute> {
        self.children.iter().find(|c| c.relation == relation)
    }

    pub fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(self.methods.to_vec())
    }
}

pub const CRUD: &[ServiceMethodKind] = &[
    ServiceMethodKind::Find,
    ServiceMethodKind::Get,
    ServiceMethodKind::Create,
    ServiceMethodKind::Update,
    ServiceMethodKind::Remove,
    ServiceMethodKind::Related,
];
