// Credential verification options.

use serde::{Deserialize, Serialize};
use taller_core::TallerConfigSnapshot;

/// JWT signing algorithms accepted by the verifier.
///
/// Only shared-secret algorithms: tokens are issued elsewhere with the same
/// secret.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl JwtAlgorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }
}

/// Names of the claims the principal is built from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimNames {
    pub tenant: String,
    pub subject: String,
    pub role: String,
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            tenant: "taller_id".to_string(),
            subject: "sub".to_string(),
            role: "rol".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    /// Shared verification secret.
    pub secret: String,
    pub algorithm: JwtAlgorithm,
    /// Required `iss`, when set.
    pub issuer: Option<String>,
    /// Accepted `aud` values, when set.
    pub audience: Option<Vec<String>>,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway_secs: u64,
    pub claims: ClaimNames,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: JwtAlgorithm::default(),
            issuer: None,
            audience: None,
            leeway_secs: 30,
            claims: ClaimNames::default(),
        }
    }
}

impl JwtOptions {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.secret.trim().is_empty() {
            return Err("JWT secret must be configured".to_string());
        }
        if self.secret.len() < 16 {
            return Err("JWT secret must be at least 16 characters".to_string());
        }
        let names = [&self.claims.tenant, &self.claims.subject, &self.claims.role];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err("JWT claim names must be non-empty".to_string());
        }
        Ok(())
    }

    /// Build options from `auth.*` configuration keys.
    pub fn from_config(cfg: &TallerConfigSnapshot) -> Result<Self, String> {
        let defaults = Self::default();

        let algorithm = match cfg.get("auth.jwt.algorithm") {
            Some(raw) => JwtAlgorithm::parse(raw).ok_or_else(|| format!("Unsupported JWT algorithm '{raw}'"))?,
            None => defaults.algorithm,
        };

        let audience = cfg.get("auth.jwt.audience").map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        let opts = Self {
            secret: cfg.get_string("auth.jwt.secret").unwrap_or_default(),
            algorithm,
            issuer: cfg
                .get_string("auth.jwt.issuer")
                .filter(|s| !s.trim().is_empty()),
            audience: audience.filter(|a| !a.is_empty()),
            leeway_secs: cfg.get_u64("auth.jwt.leeway").unwrap_or(defaults.leeway_secs),
            claims: ClaimNames {
                tenant: cfg
                    .get_string("auth.claims.tenant")
                    .unwrap_or(defaults.claims.tenant),
                subject: cfg
                    .get_string("auth.claims.subject")
                    .unwrap_or(defaults.claims.subject),
                role: cfg
                    .get_string("auth.claims.role")
                    .unwrap_or(defaults.claims.role),
            },
        };

        opts.validate()?;
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taller_core::TallerConfig;

    #[test]
    fn from_config_reads_auth_keys() {
        let mut cfg = TallerConfig::new();
        cfg.set("auth.jwt.secret", "0123456789abcdef0123");
        cfg.set("auth.jwt.algorithm", "hs512");
        cfg.set("auth.jwt.audience", "taller-web, taller-app");
        cfg.set("auth.claims.tenant", "tenant");

        let opts = JwtOptions::from_config(&cfg.snapshot()).unwrap();
        assert_eq!(opts.algorithm, JwtAlgorithm::HS512);
        assert_eq!(
            opts.audience,
            Some(vec!["taller-web".to_string(), "taller-app".to_string()])
        );
        assert_eq!(opts.claims.tenant, "tenant");
        assert_eq!(opts.claims.role, "rol");
    }

    #[test]
    fn missing_secret_is_rejected() {
        let cfg = TallerConfig::new();
        assert!(JwtOptions::from_config(&cfg.snapshot()).is_err());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let mut cfg = TallerConfig::new();
        cfg.set("auth.jwt.secret", "0123456789abcdef0123");
        cfg.set("auth.jwt.algorithm", "none");
        assert!(JwtOptions::from_config(&cfg.snapshot()).is_err());
    }
}
