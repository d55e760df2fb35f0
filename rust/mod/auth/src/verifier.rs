//! Credential verification collaborators.
//!
//! The gate does not verify credentials itself — it delegates to a
//! [`CredentialVerifier`] injected at startup. The JWT implementation is
//! the production one; [`StaticVerifier`] serves tests and local tooling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// JWT claims — what's inside the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — user ID.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// The identity resolved from a successfully verified credential.
#[derive(Debug, Clone)]
pub struct VerifiedPrincipal {
    pub uid: String,
    pub display_name: String,
}

/// Why verification failed. The gate maps these onto the two distinct
/// 401 messages the client shows.
#[derive(Debug)]
pub enum VerifyError {
    /// The credential's validity window has passed.
    Expired,
    /// Any other verification failure (bad signature, garbage token, ...).
    Invalid(String),
}

/// Pluggable credential verifier. The gate calls this for every request
/// that presents a Bearer token.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn verify(&self, token: &str) -> Result<VerifiedPrincipal, VerifyError>;
}

// ── JWT ─────────────────────────────────────────────────────────────

/// HS256 JWT verifier.
///
/// Issuing lives here too so tests and local login tooling can mint
/// tokens; the production login flow belongs to the identity provider.
#[derive(Clone)]
pub struct JwtVerifier {
    encoding_key: jsonwebtoken::EncodingKey,
    decoding_key: jsonwebtoken::DecodingKey,
    validation: jsonwebtoken::Validation,
    expire_secs: i64,
}

impl JwtVerifier {
    /// Create a new JwtVerifier with an HMAC secret.
    pub fn new(secret: &str, expire_secs: i64) -> Self {
        Self {
            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            validation: jsonwebtoken::Validation::default(),
            expire_secs,
        }
    }

    /// Issue a signed JWT for a user.
    pub fn issue(&self, uid: &str, display_name: &str) -> Result<String, String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: uid.to_string(),
            name: display_name.to_string(),
            iat: now,
            exp: now + self.expire_secs,
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|e| format!("jwt encode: {}", e))
    }

    /// Issue a token whose expiration is already in the past.
    /// Test helper for the expired-credential path.
    pub fn issue_expired(&self, uid: &str, display_name: &str) -> Result<String, String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: uid.to_string(),
            name: display_name.to_string(),
            iat: now - 7200,
            // Validation::default() allows 60s leeway; stay well past it.
            exp: now - 3600,
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|e| format!("jwt encode: {}", e))
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedPrincipal, VerifyError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyError::Expired,
                _ => VerifyError::Invalid(e.to_string()),
            })?;
        Ok(VerifiedPrincipal {
            uid: data.claims.sub,
            display_name: data.claims.name,
        })
    }
}

// ── Test double ─────────────────────────────────────────────────────

/// A verifier that accepts a fixed token → uid table. Used for testing
/// and for local tooling that has no identity provider.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, VerifiedPrincipal>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as a valid credential for `uid`.
    pub fn allow(mut self, token: &str, uid: &str, display_name: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            VerifiedPrincipal {
                uid: uid.to_string(),
                display_name: display_name.to_string(),
            },
        );
        self
    }
}

impl CredentialVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedPrincipal, VerifyError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::Invalid("unknown token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify() {
        let jwt = JwtVerifier::new("test-secret", 3600);
        let token = jwt.issue("u1", "Alice").unwrap();
        let principal = jwt.verify(&token).unwrap();
        assert_eq!(principal.uid, "u1");
        assert_eq!(principal.display_name, "Alice");
    }

    #[test]
    fn expired_token_is_expired_not_invalid() {
        let jwt = JwtVerifier::new("test-secret", 3600);
        let token = jwt.issue_expired("u1", "Alice").unwrap();
        assert!(matches!(jwt.verify(&token), Err(VerifyError::Expired)));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let jwt = JwtVerifier::new("test-secret", 3600);
        let other = JwtVerifier::new("other-secret", 3600);
        let token = other.issue("u1", "Alice").unwrap();
        assert!(matches!(jwt.verify(&token), Err(VerifyError::Invalid(_))));
        assert!(matches!(jwt.verify("not.a.jwt"), Err(VerifyError::Invalid(_))));
    }

    #[test]
    fn static_verifier_table() {
        let v = StaticVerifier::new().allow("tok-1", "u1", "Alice");
        assert_eq!(v.verify("tok-1").unwrap().uid, "u1");
        assert!(matches!(v.verify("tok-2"), Err(VerifyError::Invalid(_))));
    }
}
