//! taller-sql: tenant-scoped relational resources.
//!
//! A [`ResourceDescriptor`] declares a table, its ownership chain to the
//! tenant column and its writable fields. [`ScopedQuery`] turns it into
//! parameterized statements that always carry that chain, the update
//! compiler turns sparse bodies into `SET` clauses, and
//! [`ScopedResourceService`] runs them against a [`Store`].

pub mod descriptor;
pub mod dialect;
pub mod query;
pub mod service;
pub mod store;
pub mod update;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use descriptor::{
    ChildRoute, DefaultValue, FieldSpec, FilterOp, FilterSpec, JoinStep, OwnershipChain, Projection, Reference,
    ResourceDescriptor, UniqueKey, UpdatePolicy, BASE_ALIAS, CRUD,
};
pub use dialect::{Dialect, ParamList, Statement};
pub use query::{Page, Pagination, ScopedQuery};
pub use service::{parse_id, ScopedResourceService};
pub use store::{Store, StoreError, StoreResult};
pub use update::{compile_coalesce, compile_update, CompiledUpdate, UpdateError};
pub use value::{FieldKind, Row, SqlValue};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
