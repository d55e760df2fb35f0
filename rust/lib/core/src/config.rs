use std::path::PathBuf;

/// Common CLI configuration for the service binary.
///
/// Parsed from command-line arguments, then passed to storage and module
/// initialization.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Path to the redb document database file.
    pub db_path: Option<PathBuf>,

    /// Use the in-memory document store instead of redb.
    /// Data does not survive a restart; for local development only.
    pub in_memory: bool,

    /// Listen address for the HTTP server.
    pub listen: String,

    /// HMAC secret for JWT credential verification.
    pub jwt_secret: String,

    /// Base URL of the external movie metadata provider.
    pub metadata_base_url: String,

    /// API key for the metadata provider.
    pub metadata_api_key: Option<String>,

    /// Maximum number of entries in the metadata cache.
    pub cache_capacity: usize,

    /// Metadata cache entry TTL in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            in_memory: false,
            listen: "0.0.0.0:8080".to_string(),
            jwt_secret: "ticket-dev-secret-change-me".to_string(),
            metadata_base_url: "https://api.themoviedb.org/3".to_string(),
            metadata_api_key: None,
            cache_capacity: 500,
            cache_ttl_secs: 86400, // 24h
        }
    }
}

impl ServiceConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--db=PATH`
    /// - `--mem`
    /// - `--listen=ADDR`
    /// - `--jwt-secret=SECRET`
    /// - `--metadata-base-url=URL`
    /// - `--metadata-api-key=KEY`
    /// - `--cache-capacity=N`
    /// - `--cache-ttl-secs=N`
    pub fn from_args(args: &[String]) -> Self {
        let mut config = ServiceConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--db=") {
                config.db_path = Some(PathBuf::from(val));
            } else if arg == "--mem" {
                config.in_memory = true;
            } else if let Some(val) = arg.strip_prefix("--listen=") {
                config.listen = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--jwt-secret=") {
                config.jwt_secret = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--metadata-base-url=") {
                config.metadata_base_url = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--metadata-api-key=") {
                config.metadata_api_key = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--cache-capacity=") {
                if let Ok(n) = val.parse() {
                    config.cache_capacity = n;
                }
            } else if let Some(val) = arg.strip_prefix("--cache-ttl-secs=") {
                if let Ok(n) = val.parse() {
                    config.cache_ttl_secs = n;
                }
            }
        }

        config
    }

    /// Resolve the redb database path, falling back to `ticket.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ticket.redb"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let args = vec![
            "--db=/tmp/ticket.redb".to_string(),
            "--listen=127.0.0.1:9090".to_string(),
            "--cache-capacity=32".to_string(),
        ];
        let config = ServiceConfig::from_args(&args);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/ticket.redb")));
        assert_eq!(config.listen, "127.0.0.1:9090");
        assert_eq!(config.cache_capacity, 32);
        assert!(!config.in_memory);
    }

    #[test]
    fn test_mem_flag() {
        let config = ServiceConfig::from_args(&["--mem".to_string()]);
        assert!(config.in_memory);
    }

    #[test]
    fn test_resolve_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.resolve_db_path(), PathBuf::from("ticket.redb"));
        assert_eq!(config.cache_ttl_secs, 86400);
    }
}
