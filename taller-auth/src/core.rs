// Verification core.

use serde_json::{Map, Value};
use taller_core::{Principal, TenantContext, TenantId};

use crate::error::AuthError;
use crate::options::ClaimNames;

/// Extract the token from an `Authorization` header value.
///
/// Only `Bearer <token>` is accepted (scheme compared case-insensitively).
/// An absent header, another scheme or an empty token all count as "no
/// credential".
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.map(str::trim).filter(|v| !v.is_empty()).ok_or(AuthError::Missing)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Missing)?;
    if !scheme.trim().eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Missing);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token)
}

/// Turns a raw credential into a [`Principal`].
///
/// Pure: the result depends only on the credential and the verifier's
/// immutable key material.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, AuthError>;

    /// Verify an `Authorization` header value and build the tenant context.
    fn authenticate(&self, header: Option<&str>) -> Result<TenantContext, AuthError> {
        let token = extract_bearer_token(header)?;
        self.verify(token).map(TenantContext::new)
    }
}

fn claim<'a>(claims: &'a Map<String, Value>, name: &str) -> Result<&'a Value, AuthError> {
    claims
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| AuthError::MissingClaim(name.to_string()))
}

/// Build a principal from verified claims. All three claims are mandatory.
pub fn principal_from_claims(claims: &Value, names: &ClaimNames) -> Result<Principal, AuthError> {
    let claims = claims
        .as_object()
        .ok_or_else(|| AuthError::Malformed("claims must be an object".to_string()))?;

    let tenant = match claim(claims, &names.tenant)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
    .ok_or_else(|| AuthError::Invalid(format!("claim '{}' must be a positive integer", names.tenant)))?;

    let subject = match claim(claims, &names.subject)? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(AuthError::Invalid(format!(
                "claim '{}' must be a non-empty string or number",
                names.subject
            )))
        }
    };

    let role = match claim(claims, &names.role)? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(AuthError::Invalid(format!("claim '{}' must be a non-empty string", names.role))),
    };

    Ok(Principal::new(subject, role, TenantId(tenant)))
}
