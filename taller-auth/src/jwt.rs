// JWT credential verifier.

use taller_core::Principal;

use crate::core::CredentialVerifier;
use crate::error::AuthError;
use crate::options::JwtOptions;

/// Verifies HMAC-signed JWTs and builds a [`Principal`] from their claims.
///
/// Signature, `exp` (mandatory), `nbf`, and optionally `iss`/`aud` are
/// checked before any claim is read.
#[derive(Clone, Debug)]
pub struct JwtVerifier {
    options: JwtOptions,
}

impl JwtVerifier {
    pub fn new(options: JwtOptions) -> Result<Self, String> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl CredentialVerifier for JwtVerifier {
    fn verify(&self, _token: &str) -> Result<Principal, AuthError> {
        Err(AuthError::Disabled(
            "enable one of: jwt-aws-lc-rs, jwt-rust-crypto".to_string(),
        ))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
mod provider {
    use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde_json::Value;

    use crate::error::AuthError;
    use crate::options::{JwtAlgorithm, JwtOptions};

    fn algorithm(alg: JwtAlgorithm) -> Algorithm {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        }
    }

    fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => AuthError::Expired,
            JwtErrorKind::InvalidToken | JwtErrorKind::Base64(_) | JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => {
                AuthError::Malformed(err.to_string())
            }
            JwtErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            _ => AuthError::Invalid(err.to_string()),
        }
    }

    pub(super) fn decode_claims(opts: &JwtOptions, token: &str) -> Result<Value, AuthError> {
        let mut validation = Validation::new(algorithm(opts.algorithm));
        validation.leeway = opts.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp"]);

        if let Some(issuer) = &opts.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        match &opts.audience {
            Some(aud) => validation.set_audience(aud.as_slice()),
            None => validation.validate_aud = false,
        }

        decode::<Value>(token, &DecodingKey::from_secret(opts.secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(classify)
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = provider::decode_claims(&self.options, token).inspect_err(|e| {
            tracing::debug!(error = ?e, "credential rejected");
        })?;
        crate::core::principal_from_claims(&claims, &self.options.claims)
    }
}

#[cfg(all(test, any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use taller_core::TenantId;

    use super::*;
    use crate::options::JwtAlgorithm;

    const SECRET: &str = "taller-test-secret-0123456789";

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sign(claims: Value, secret: &str) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(JwtOptions::with_secret(SECRET)).unwrap()
    }

    #[test]
    fn valid_token_yields_principal() {
        let token = sign(json!({"sub": "9", "rol": "admin", "taller_id": 2, "exp": now() + 600}), SECRET);
        let ctx = verifier().authenticate(Some(format!("Bearer {token}").as_str())).unwrap();
        assert_eq!(ctx.tenant_id, TenantId(2));
        assert_eq!(ctx.principal.user_id, "9");
        assert_eq!(ctx.principal.role, "admin");
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(json!({"sub": "9", "rol": "admin", "taller_id": 2, "exp": now() - 3600}), SECRET);
        assert_eq!(verifier().verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn token_without_exp_is_rejected() {
        let token = sign(json!({"sub": "9", "rol": "admin", "taller_id": 2}), SECRET);
        assert!(verifier().verify(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = sign(
            json!({"sub": "9", "rol": "admin", "taller_id": 2, "exp": now() + 600}),
            "another-secret-entirely-000",
        );
        assert!(matches!(verifier().verify(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(verifier().verify("not-a-jwt"), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn missing_tenant_claim_is_rejected() {
        let token = sign(json!({"sub": "9", "rol": "admin", "exp": now() + 600}), SECRET);
        assert_eq!(verifier().verify(&token), Err(AuthError::MissingClaim("taller_id".into())));
    }

    #[test]
    fn algorithm_mismatch_is_invalid() {
        let mut opts = JwtOptions::with_secret(SECRET);
        opts.algorithm = JwtAlgorithm::HS512;
        let v = JwtVerifier::new(opts).unwrap();
        let token = sign(json!({"sub": "9", "rol": "admin", "taller_id": 2, "exp": now() + 600}), SECRET);
        assert!(matches!(v.verify(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let mut opts = JwtOptions::with_secret(SECRET);
        opts.issuer = Some("taller-api".to_string());
        let v = JwtVerifier::new(opts).unwrap();

        let good = sign(
            json!({"sub": "1", "rol": "a", "taller_id": 1, "iss": "taller-api", "exp": now() + 600}),
            SECRET,
        );
        let bad = sign(
            json!({"sub": "1", "rol": "a", "taller_id": 1, "iss": "otro", "exp": now() + 600}),
            SECRET,
        );
        assert!(v.verify(&good).is_ok());
        assert!(v.verify(&bad).is_err());
    }

    #[test]
    fn short_secret_is_refused_at_construction() {
        assert!(JwtVerifier::new(JwtOptions::with_secret("short")).is_err());
    }
}
