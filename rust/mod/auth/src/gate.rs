use std::sync::Arc;

use axum::http::HeaderMap;

use ticket_core::Localizer;

use crate::error::AuthError;
use crate::verifier::CredentialVerifier;

/// The identity resolved from a verified credential.
#[derive(Debug, Clone)]
pub struct Principal {
    pub uid: String,
    pub display_name: String,
}

/// Authorization gate.
///
/// Two concerns, kept deliberately separate:
/// - `verify_credential` resolves a Bearer token into a [`Principal`]
///   via the injected verifier collaborator.
/// - `verify_ownership` compares a resolved principal against a
///   resource's **stored** owner field. Pure, no I/O. Callers must pass
///   the owner read from the store, never a client-supplied claim.
pub struct AuthGate {
    verifier: Arc<dyn CredentialVerifier>,
    i18n: Arc<dyn Localizer>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, i18n: Arc<dyn Localizer>) -> Self {
        Self { verifier, i18n }
    }

    /// Extract and verify the request's Bearer credential.
    ///
    /// Failure mapping (all are 401 at the boundary):
    /// - no Authorization header → `Unauthenticated`
    /// - non-Bearer scheme → `MalformedCredential`
    /// - verifier says expired → `CredentialExpired`
    /// - any other verifier failure → `CredentialInvalid`
    pub fn verify_credential(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AuthError::Unauthenticated(self.i18n.t("error.auth.missing_token", &[]))
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AuthError::MalformedCredential(self.i18n.t("error.auth.malformed_token", &[]))
        })?;

        let principal = self.verifier.verify(token).map_err(|e| match e {
            crate::verifier::VerifyError::Expired => {
                AuthError::CredentialExpired(self.i18n.t("error.auth.token_expired", &[]))
            }
            crate::verifier::VerifyError::Invalid(reason) => {
                tracing::debug!("credential verification failed: {reason}");
                AuthError::CredentialInvalid(self.i18n.t("error.auth.verify_failed", &[]))
            }
        })?;

        Ok(Principal {
            uid: principal.uid,
            display_name: principal.display_name,
        })
    }

    /// Check that the resolved principal owns the target resource.
    pub fn verify_ownership(&self, principal_uid: &str, owner_uid: &str) -> Result<(), AuthError> {
        if principal_uid == owner_uid {
            Ok(())
        } else {
            Err(AuthError::Forbidden(
                self.i18n.t("error.auth.no_permission", &[]),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use ticket_core::DefaultLocalizer;

    use crate::verifier::{JwtVerifier, StaticVerifier};

    fn gate_with(verifier: Arc<dyn CredentialVerifier>) -> AuthGate {
        AuthGate::new(verifier, Arc::new(DefaultLocalizer))
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let gate = gate_with(Arc::new(StaticVerifier::new()));
        let err = gate.verify_credential(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
        assert_eq!(err.to_string(), "login required");
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        let gate = gate_with(Arc::new(StaticVerifier::new()));
        let err = gate
            .verify_credential(&headers_with("Basic dXNlcjpwdw=="))
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedCredential(_)));
        assert_eq!(err.to_string(), "invalid token format");
    }

    #[test]
    fn unknown_token_is_invalid() {
        let gate = gate_with(Arc::new(StaticVerifier::new()));
        let err = gate
            .verify_credential(&headers_with("Bearer nope"))
            .unwrap_err();
        assert!(matches!(err, AuthError::CredentialInvalid(_)));
        assert_eq!(err.to_string(), "authentication failed");
    }

    #[test]
    fn expired_token_maps_to_expired() {
        let jwt = JwtVerifier::new("s", 3600);
        let token = jwt.issue_expired("u1", "Alice").unwrap();
        let gate = gate_with(Arc::new(jwt));
        let err = gate
            .verify_credential(&headers_with(&format!("Bearer {}", token)))
            .unwrap_err();
        assert!(matches!(err, AuthError::CredentialExpired(_)));
        assert_eq!(err.to_string(), "token expired, please log in again");
    }

    #[test]
    fn valid_token_resolves_principal() {
        let gate = gate_with(Arc::new(StaticVerifier::new().allow("tok", "u1", "Alice")));
        let principal = gate.verify_credential(&headers_with("Bearer tok")).unwrap();
        assert_eq!(principal.uid, "u1");
        assert_eq!(principal.display_name, "Alice");
    }

    #[test]
    fn ownership_requires_exact_match() {
        let gate = gate_with(Arc::new(StaticVerifier::new()));
        assert!(gate.verify_ownership("u1", "u1").is_ok());
        let err = gate.verify_ownership("u1", "u2").unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
        assert_eq!(err.to_string(), "no permission");
    }
}
