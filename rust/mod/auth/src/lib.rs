//! Authorization gate — credential verification + ownership checks.
//!
//! # Resources
//!
//! - **Principal** — identity resolved from a verified Bearer credential
//! - **CredentialVerifier** — pluggable verification collaborator (JWT in
//!   production, a static table in tests)
//!
//! The gate never touches storage. Ownership checks are pure comparisons
//! against the owner field the caller read from the store.

pub mod error;
pub mod gate;
pub mod verifier;

pub use error::AuthError;
pub use gate::{AuthGate, Principal};
pub use verifier::{Claims, CredentialVerifier, JwtVerifier, StaticVerifier, VerifiedPrincipal, VerifyError};
