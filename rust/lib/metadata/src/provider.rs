//! External movie metadata provider.
//!
//! The production implementation talks to a TMDB-compatible HTTP API.
//! Fetch failures are the caller's business — the service layer decides
//! that enrichment is best-effort, not this client.

use std::collections::HashMap;

use serde::Deserialize;

/// Client-side provider error.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider HTTP {0}")]
    Status(u16),
}

/// Pluggable metadata provider. Called on cache miss.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync + 'static {
    /// Age certification for one movie, if the provider lists one.
    async fn fetch_certification(&self, movie_id: u64) -> Result<Option<String>, ProviderError>;

    /// The shared genre-id → name table.
    async fn fetch_genres(&self) -> Result<HashMap<u64, String>, ProviderError>;
}

// ── TMDB wire shapes ────────────────────────────────────────────────

#[derive(Deserialize)]
struct ReleaseDatesResponse {
    results: Vec<CountryRelease>,
}

#[derive(Deserialize)]
struct CountryRelease {
    iso_3166_1: String,
    release_dates: Vec<ReleaseDate>,
}

#[derive(Deserialize)]
struct ReleaseDate {
    #[serde(default)]
    certification: String,
}

#[derive(Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

#[derive(Deserialize)]
struct Genre {
    id: u64,
    name: String,
}

// ── TMDB provider ───────────────────────────────────────────────────

/// TMDB-compatible metadata provider.
pub struct TmdbProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ProviderError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.query(&[("api_key", key.as_str())]);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<T>().await?)
    }
}

/// Pick a certification from a country's release entries: the first
/// non-empty string wins.
fn first_certification(release: &CountryRelease) -> Option<String> {
    release
        .release_dates
        .iter()
        .map(|r| r.certification.trim())
        .find(|c| !c.is_empty())
        .map(|c| c.to_string())
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_certification(&self, movie_id: u64) -> Result<Option<String>, ProviderError> {
        let resp: ReleaseDatesResponse = self
            .get_json(&format!("/movie/{}/release_dates", movie_id))
            .await?;

        // KR release preferred; US fallback.
        for country in ["KR", "US"] {
            if let Some(cert) = resp
                .results
                .iter()
                .find(|r| r.iso_3166_1 == country)
                .and_then(first_certification)
            {
                return Ok(Some(cert));
            }
        }
        Ok(None)
    }

    async fn fetch_genres(&self) -> Result<HashMap<u64, String>, ProviderError> {
        let resp: GenreListResponse = self.get_json("/genre/movie/list").await?;
        Ok(resp.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }
}
