//! Partial-update compiler.
//!
//! Column names come only from the allow-list; request keys merely select
//! entries from it. Values always travel as bound parameters.

use serde_json::{Map, Value};
use taller_core::TallerError;
use thiserror::Error;

use crate::descriptor::{FieldSpec, UpdatePolicy};
use crate::dialect::ParamList;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("No se proporcionaron campos para actualizar")]
    NoFieldsProvided,

    #[error("El campo '{0}' es requerido")]
    NullNotAllowed(&'static str),

    #[error(transparent)]
    InvalidValue(#[from] TallerError),
}

impl From<UpdateError> for TallerError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::NoFieldsProvided | UpdateError::NullNotAllowed(_) => TallerError::bad_request(err.to_string()),
            UpdateError::InvalidValue(e) => e,
        }
    }
}

/// A compiled `SET` clause; its values are already in the [`ParamList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUpdate {
    pub set_clause: String,
    /// Columns whose new value was supplied.
    pub columns: Vec<&'static str>,
}

fn supplied_fields<'a>(allowed: &'a [FieldSpec], supplied: &Map<String, Value>) -> Vec<&'a FieldSpec> {
    allowed.iter().filter(|f| supplied.contains_key(f.name)).collect()
}

/// Compile only the supplied, allow-listed fields: `col = $n, ...`.
///
/// Unknown keys are ignored. A `null` value sets the column to NULL, unless
/// the field is not nullable. `updated_at` is always refreshed.
pub fn compile_update(
    allowed: &[FieldSpec],
    supplied: &Map<String, Value>,
    params: &mut ParamList,
) -> Result<CompiledUpdate, UpdateError> {
    let fields = supplied_fields(allowed, supplied);
    if fields.is_empty() {
        return Err(UpdateError::NoFieldsProvided);
    }

    let mut sets = Vec::with_capacity(fields.len() + 1);
    let mut columns = Vec::with_capacity(fields.len());
    for f in fields {
        let value = f.kind.coerce(f.name, &supplied[f.name])?;
        if value.is_null() && !f.nullable {
            return Err(UpdateError::NullNotAllowed(f.name));
        }
        let ph = params.push(value, Some(f.kind));
        sets.push(format!("{} = {ph}", f.name));
        columns.push(f.name);
    }
    sets.push("updated_at = CURRENT_TIMESTAMP".to_string());

    Ok(CompiledUpdate {
        set_clause: sets.join(", "),
        columns,
    })
}

/// Compile every allow-listed field as `col = COALESCE($n, col)`.
///
/// Omitted and `null` fields bind NULL and keep their stored value. At
/// least one allow-listed key must still be present.
pub fn compile_coalesce(
    allowed: &[FieldSpec],
    supplied: &Map<String, Value>,
    params: &mut ParamList,
) -> Result<CompiledUpdate, UpdateError> {
    if supplied_fields(allowed, supplied).is_empty() {
        return Err(UpdateError::NoFieldsProvided);
    }

    let mut sets = Vec::with_capacity(allowed.len() + 1);
    let mut columns = Vec::new();
    for f in allowed {
        let value = match supplied.get(f.name) {
            Some(v) => f.kind.coerce(f.name, v)?,
            None => crate::value::SqlValue::Null,
        };
        if !value.is_null() {
            columns.push(f.name);
        }
        let ph = params.push(value, Some(f.kind));
        sets.push(format!("{0} = COALESCE({ph}, {0})", f.name));
    }
    sets.push("updated_at = CURRENT_TIMESTAMP".to_string());

    Ok(CompiledUpdate {
        set_clause: sets.join(", "),
        columns,
    })
}

/// Dispatch on the resource's policy.
pub fn compile(
    policy: UpdatePolicy,
    allowed: &[FieldSpec],
    supplied: &Map<String, Value>,
    params: &mut ParamList,
) -> Result<CompiledUpdate, UpdateError> {
    match policy {
        UpdatePolicy::AllowList => compile_update(allowed, supplied, params),
        UpdatePolicy::Coalesce => compile_coalesce(allowed, supplied, params),
    }
}
