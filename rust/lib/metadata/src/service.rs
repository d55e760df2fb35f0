use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::MetadataCache;
use crate::provider::MetadataProvider;

/// Cache key for the shared genre table.
const GENRES_KEY: &str = "genres";

/// Enrichment input: the external movie id plus the genre ids stored on
/// the review/movie document.
#[derive(Debug, Clone)]
pub struct EnrichRequest {
    pub movie_id: u64,
    pub genre_ids: Vec<u64>,
}

/// Enrichment output. Decoration only — a missing certification must
/// never prevent a review or movie from being displayed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub movie_id: u64,
    pub certification: Option<String>,
    pub genre_names: Vec<String>,
}

/// Metadata enrichment service.
///
/// One instance is created at startup and shared process-wide. Both
/// caches are bounded and TTL'd; the provider is only consulted for ids
/// whose cached certification is missing or expired.
pub struct MetadataService {
    provider: Arc<dyn MetadataProvider>,
    certs: MetadataCache<Option<String>>,
    genres: MetadataCache<Arc<HashMap<u64, String>>>,
}

impl MetadataService {
    pub fn new(provider: Arc<dyn MetadataProvider>, capacity: usize, ttl: Duration) -> Self {
        Self {
            provider,
            certs: MetadataCache::new(capacity, ttl),
            genres: MetadataCache::new(1, ttl),
        }
    }

    /// Certification for one movie. Fresh cache hit returns without an
    /// upstream call; a provider failure yields `None` and is not
    /// cached, so the next call retries.
    pub async fn certification(&self, movie_id: u64) -> Option<String> {
        let key = movie_id.to_string();
        if let Some(cached) = self.certs.get(&key) {
            return cached;
        }

        match self.provider.fetch_certification(movie_id).await {
            Ok(cert) => {
                self.certs.set(&key, cert.clone());
                cert
            }
            Err(e) => {
                tracing::warn!("certification fetch failed for movie {movie_id}: {e}");
                None
            }
        }
    }

    /// The shared genre-id → name table, cached with its own TTL.
    /// On fetch failure returns an empty table (uncached) — genre names
    /// simply come out blank.
    async fn genre_table(&self) -> Arc<HashMap<u64, String>> {
        if let Some(cached) = self.genres.get(GENRES_KEY) {
            return cached;
        }

        match self.provider.fetch_genres().await {
            Ok(table) => {
                let table = Arc::new(table);
                self.genres.set(GENRES_KEY, Arc::clone(&table));
                table
            }
            Err(e) => {
                tracing::warn!("genre table fetch failed: {e}");
                Arc::new(HashMap::new())
            }
        }
    }

    /// Enrich one movie.
    pub async fn enrich(&self, request: &EnrichRequest) -> Enrichment {
        let genres = self.genre_table().await;
        Enrichment {
            movie_id: request.movie_id,
            certification: self.certification(request.movie_id).await,
            genre_names: map_genres(&genres, &request.genre_ids),
        }
    }

    /// Enrich a batch of movies.
    ///
    /// Resolves the shared genre table once, then fetches certifications
    /// for only the ids not already cached and unexpired — in parallel —
    /// before combining results. The fetch futures are dropped with the
    /// caller's request, which bounds abandoned work.
    pub async fn enrich_batch(&self, requests: &[EnrichRequest]) -> Vec<Enrichment> {
        let genres = self.genre_table().await;

        let mut cached: HashMap<u64, Option<String>> = HashMap::new();
        let mut missing: Vec<u64> = Vec::new();
        for req in requests {
            if cached.contains_key(&req.movie_id) || missing.contains(&req.movie_id) {
                continue;
            }
            match self.certs.get(&req.movie_id.to_string()) {
                Some(cert) => {
                    cached.insert(req.movie_id, cert);
                }
                None => missing.push(req.movie_id),
            }
        }

        let fetched = futures::future::join_all(
            missing
                .iter()
                .map(|&id| async move { (id, self.provider.fetch_certification(id).await) }),
        )
        .await;

        for (id, result) in fetched {
            match result {
                Ok(cert) => {
                    self.certs.set(&id.to_string(), cert.clone());
                    cached.insert(id, cert);
                }
                Err(e) => {
                    tracing::warn!("certification fetch failed for movie {id}: {e}");
                    cached.insert(id, None);
                }
            }
        }

        requests
            .iter()
            .map(|req| Enrichment {
                movie_id: req.movie_id,
                certification: cached.get(&req.movie_id).cloned().flatten(),
                genre_names: map_genres(&genres, &req.genre_ids),
            })
            .collect()
    }

    /// Drop all cached entries. For test isolation.
    pub fn clear(&self) {
        self.certs.clear();
        self.genres.clear();
    }
}

fn map_genres(table: &HashMap<u64, String>, ids: &[u64]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| table.get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts upstream calls and can be switched to fail.
    struct CountingProvider {
        cert_calls: AtomicUsize,
        genre_calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    impl CountingProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                cert_calls: AtomicUsize::new(0),
                genre_calls: AtomicUsize::new(0),
                fail: std::sync::atomic::AtomicBool::new(false),
            })
        }
    }

    #[async_trait::async_trait]
    impl MetadataProvider for CountingProvider {
        async fn fetch_certification(
            &self,
            movie_id: u64,
        ) -> Result<Option<String>, ProviderError> {
            self.cert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProviderError::Status(503));
            }
            Ok(Some(format!("cert-{movie_id}")))
        }

        async fn fetch_genres(&self) -> Result<HashMap<u64, String>, ProviderError> {
            self.genre_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProviderError::Status(503));
            }
            Ok(HashMap::from([
                (28, "액션".to_string()),
                (18, "드라마".to_string()),
            ]))
        }
    }

    fn service(provider: Arc<CountingProvider>) -> MetadataService {
        MetadataService::new(provider, 10, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn repeated_gets_fetch_once_within_ttl() {
        let provider = CountingProvider::new();
        let svc = service(Arc::clone(&provider));

        for _ in 0..5 {
            assert_eq!(svc.certification(603).await, Some("cert-603".to_string()));
        }
        assert_eq!(provider.cert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let provider = CountingProvider::new();
        let svc = MetadataService::new(provider.clone(), 10, Duration::from_millis(10));

        svc.certification(603).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        svc.certification(603).await;

        assert_eq!(provider.cert_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provider_failure_yields_none_and_is_not_cached() {
        let provider = CountingProvider::new();
        provider.fail.store(true, Ordering::SeqCst);
        let svc = service(Arc::clone(&provider));

        assert_eq!(svc.certification(603).await, None);
        // Failure was not cached — the next call retries upstream.
        provider.fail.store(false, Ordering::SeqCst);
        assert_eq!(svc.certification(603).await, Some("cert-603".to_string()));
        assert_eq!(provider.cert_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn batch_fetches_only_missing_ids() {
        let provider = CountingProvider::new();
        let svc = service(Arc::clone(&provider));

        // Pre-warm one id.
        svc.certification(1).await;
        assert_eq!(provider.cert_calls.load(Ordering::SeqCst), 1);

        let requests = vec![
            EnrichRequest { movie_id: 1, genre_ids: vec![28] },
            EnrichRequest { movie_id: 2, genre_ids: vec![18] },
            EnrichRequest { movie_id: 3, genre_ids: vec![28, 18] },
            // Duplicate id must not double-fetch.
            EnrichRequest { movie_id: 2, genre_ids: vec![] },
        ];
        let enriched = svc.enrich_batch(&requests).await;

        assert_eq!(enriched.len(), 4);
        assert_eq!(provider.cert_calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.genre_calls.load(Ordering::SeqCst), 1);
        assert_eq!(enriched[0].certification, Some("cert-1".to_string()));
        assert_eq!(enriched[2].genre_names, vec!["액션", "드라마"]);
    }

    #[tokio::test]
    async fn genre_table_cached_across_batches() {
        let provider = CountingProvider::new();
        let svc = service(Arc::clone(&provider));

        let req = vec![EnrichRequest { movie_id: 1, genre_ids: vec![28] }];
        svc.enrich_batch(&req).await;
        svc.enrich_batch(&req).await;

        assert_eq!(provider.genre_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_forces_refetch() {
        let provider = CountingProvider::new();
        let svc = service(Arc::clone(&provider));

        svc.certification(603).await;
        svc.clear();
        svc.certification(603).await;

        assert_eq!(provider.cert_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enrich_single_maps_genres() {
        let provider = CountingProvider::new();
        let svc = service(Arc::clone(&provider));

        let e = svc
            .enrich(&EnrichRequest { movie_id: 7, genre_ids: vec![18, 999] })
            .await;
        assert_eq!(e.certification, Some("cert-7".to_string()));
        // Unknown genre ids are skipped, not errors.
        assert_eq!(e.genre_names, vec!["드라마"]);
    }
}
