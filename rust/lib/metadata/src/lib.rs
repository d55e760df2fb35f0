//! Movie metadata enrichment — bounded TTL cache over a rate-limited
//! external provider.
//!
//! Enrichment is best-effort decoration: provider failures become absent
//! certifications, never errors on the read path that asked for them.

pub mod cache;
pub mod provider;
pub mod service;

pub use cache::MetadataCache;
pub use provider::{MetadataProvider, ProviderError, TmdbProvider};
pub use service::{EnrichRequest, Enrichment, MetadataService};
