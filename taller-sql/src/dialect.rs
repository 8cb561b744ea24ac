use crate::value::{FieldKind, SqlValue};

/// SQL flavour of the connected store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Placeholder `n` (1-based). Postgres gets an explicit cast so text-bound
    /// dates, times and JSON compare against typed columns.
    pub fn placeholder(self, n: usize, kind: Option<FieldKind>) -> String {
        match self {
            Dialect::Sqlite => format!("${n}"),
            Dialect::Postgres => {
                let cast = match kind {
                    Some(FieldKind::Integer) => "::bigint",
                    Some(FieldKind::Decimal) => "::numeric",
                    Some(FieldKind::Boolean) => "::boolean",
                    Some(FieldKind::Date) => "::date",
                    Some(FieldKind::Time) => "::time",
                    Some(FieldKind::Json) => "::jsonb",
                    Some(FieldKind::Text) | None => "",
                };
                format!("${n}{cast}")
            }
        }
    }
}

/// A parameterized statement ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Positional parameter accumulator.
///
/// `push` is the only way a value reaches a statement: it records the value
/// and hands back the placeholder text.
#[derive(Debug)]
pub struct ParamList {
    dialect: Dialect,
    values: Vec<SqlValue>,
}

impl ParamList {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: SqlValue, kind: Option<FieldKind>) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len(), kind)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.values,
        }
    }
}
