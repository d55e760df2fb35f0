use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these —
// never on the human-readable message string.

/// Stable error code constants.
///
/// Clients should match on `code` from `{"error": "...", "code": "NOT_FOUND"}`.
/// Codes never change; messages may be reworded or localized.
pub mod error_code {
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const CREDENTIAL_EXPIRED: &str = "CREDENTIAL_EXPIRED";
    pub const CREDENTIAL_INVALID: &str = "CREDENTIAL_INVALID";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"error": "review 'abc' not found", "code": "NOT_FOUND"}
/// ```
///
/// The three 401 variants are distinct because the client reacts
/// differently to each: an expired credential triggers a token refresh,
/// the other two send the user back to login.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Caller-fixable input problem. HTTP 400.
    #[error("{0}")]
    InvalidArgument(String),

    /// No credential presented. HTTP 401.
    #[error("{0}")]
    Unauthenticated(String),

    /// Credential was valid once but has expired. HTTP 401.
    #[error("{0}")]
    CredentialExpired(String),

    /// Credential is malformed or failed verification. HTTP 401.
    #[error("{0}")]
    CredentialInvalid(String),

    /// Authenticated but not the owner of the target resource. HTTP 403.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced resource does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate or illegal-state transition (e.g. double-like). HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::InvalidArgument(_) => error_code::INVALID_ARGUMENT,
            ServiceError::Unauthenticated(_) => error_code::UNAUTHENTICATED,
            ServiceError::CredentialExpired(_) => error_code::CREDENTIAL_EXPIRED,
            ServiceError::CredentialInvalid(_) => error_code::CREDENTIAL_INVALID,
            ServiceError::Forbidden(_) => error_code::FORBIDDEN,
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::CONFLICT,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::CredentialExpired(_) => StatusCode::UNAUTHORIZED,
            ServiceError::CredentialInvalid(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.error_code(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(ServiceError::InvalidArgument("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::Unauthenticated("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::CredentialExpired("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::CredentialInvalid("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ServiceError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ServiceError::Storage("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ServiceError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(ServiceError::InvalidArgument("x".into()).error_code(), "INVALID_ARGUMENT");
        assert_eq!(ServiceError::Unauthenticated("x".into()).error_code(), "UNAUTHENTICATED");
        assert_eq!(ServiceError::CredentialExpired("x".into()).error_code(), "CREDENTIAL_EXPIRED");
        assert_eq!(ServiceError::CredentialInvalid("x".into()).error_code(), "CREDENTIAL_INVALID");
        assert_eq!(ServiceError::Forbidden("x".into()).error_code(), "FORBIDDEN");
        assert_eq!(ServiceError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(ServiceError::Conflict("x".into()).error_code(), "CONFLICT");
        assert_eq!(ServiceError::Storage("x".into()).error_code(), "STORAGE_ERROR");
        assert_eq!(ServiceError::Internal("x".into()).error_code(), "INTERNAL");
    }

    #[test]
    fn json_response_format() {
        let err = ServiceError::NotFound("review 'abc' not found".into());
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_display_is_just_message() {
        // Display has no variant prefix — just the message.
        assert_eq!(ServiceError::NotFound("review 123".into()).to_string(), "review 123");
        assert_eq!(ServiceError::Conflict("already liked".into()).to_string(), "already liked");
        assert_eq!(ServiceError::InvalidArgument("bad input".into()).to_string(), "bad input");
        assert_eq!(ServiceError::Unauthenticated("login required".into()).to_string(), "login required");
        assert_eq!(ServiceError::Forbidden("no permission".into()).to_string(), "no permission");
    }
}
