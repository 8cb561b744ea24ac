use taller_core::TallerError;
use thiserror::Error;

/// Why a credential was not accepted.
///
/// `Missing` is the only `Unauthenticated` case; everything else is an
/// `InvalidCredential`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Token de autenticación requerido")]
    Missing,
    #[error("Token mal formado: {0}")]
    Malformed(String),
    #[error("Token expirado")]
    Expired,
    #[error("Token inválido: {0}")]
    Invalid(String),
    #[error("Token sin el claim requerido '{0}'")]
    MissingClaim(String),
    #[error("Verificación de tokens deshabilitada: {0}")]
    Disabled(String),
}

impl AuthError {
    pub fn is_missing(&self) -> bool {
        matches!(self, AuthError::Missing)
    }
}

impl From<AuthError> for TallerError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing => TallerError::unauthenticated(err.to_string()),
            // Signature and claim details stay out of client messages.
            AuthError::Expired => TallerError::invalid_credential(err.to_string()),
            AuthError::Disabled(_) => TallerError::internal(err.to_string()),
            _ => TallerError::invalid_credential("Token inválido"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taller_core::ErrorKind;

    #[test]
    fn missing_maps_to_unauthenticated_and_the_rest_to_invalid() {
        assert_eq!(TallerError::from(AuthError::Missing).kind, ErrorKind::Unauthenticated);
        assert_eq!(TallerError::from(AuthError::Expired).kind, ErrorKind::InvalidCredential);
        let bad = TallerError::from(AuthError::Invalid("InvalidSignature".into()));
        assert_eq!(bad.kind, ErrorKind::InvalidCredential);
        assert_eq!(bad.message, "Token inválido");
    }
}
