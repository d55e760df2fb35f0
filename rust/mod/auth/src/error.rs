use thiserror::Error;

use ticket_core::ServiceError;

/// Authorization gate error type.
///
/// Distinguishes the four 401 shapes the client handles differently,
/// plus the ownership failure. Converts into the service-wide taxonomy
/// at the API boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential presented at all.
    #[error("{0}")]
    Unauthenticated(String),

    /// An Authorization header exists but is not a Bearer credential.
    #[error("{0}")]
    MalformedCredential(String),

    /// The credential verified once but its validity window has passed.
    #[error("{0}")]
    CredentialExpired(String),

    /// The credential failed verification for any other reason.
    #[error("{0}")]
    CredentialInvalid(String),

    /// The resolved principal does not own the target resource.
    #[error("{0}")]
    Forbidden(String),
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated(m) => ServiceError::Unauthenticated(m),
            // A wrong-scheme header is an invalid credential as far as the
            // client contract goes; only the message differs.
            AuthError::MalformedCredential(m) => ServiceError::CredentialInvalid(m),
            AuthError::CredentialExpired(m) => ServiceError::CredentialExpired(m),
            AuthError::CredentialInvalid(m) => ServiceError::CredentialInvalid(m),
            AuthError::Forbidden(m) => ServiceError::Forbidden(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn all_credential_failures_are_401() {
        for err in [
            AuthError::Unauthenticated("x".into()),
            AuthError::MalformedCredential("x".into()),
            AuthError::CredentialExpired("x".into()),
            AuthError::CredentialInvalid("x".into()),
        ] {
            let svc: ServiceError = err.into();
            assert_eq!(svc.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn ownership_failure_is_403() {
        let svc: ServiceError = AuthError::Forbidden("no permission".into()).into();
        assert_eq!(svc.status_code(), StatusCode::FORBIDDEN);
    }
}
