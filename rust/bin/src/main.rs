//! Ticket server — movie-review engagement backend.
//!
//! Usage: ticketd [--db=PATH | --mem] [--listen=ADDR] [--jwt-secret=S]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use ticket_auth::{AuthGate, JwtVerifier};
use ticket_core::{DefaultLocalizer, Localizer, Module, ServiceConfig};
use ticket_docstore::{DocumentStore, MemoryDocStore, RedbDocStore};
use ticket_engagement::EngagementModule;
use ticket_metadata::{MetadataService, TmdbProvider};

const VERSION: &str = "0.1.0";

/// Access token lifetime accepted by the verifier (24h).
const TOKEN_TTL_SECS: i64 = 86400;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    // Handle --version / --help early.
    for arg in &args {
        if arg == "--version" || arg == "-V" {
            println!("ticketd {}", VERSION);
            return Ok(());
        }
        if arg == "--help" || arg == "-h" {
            print_usage();
            return Ok(());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServiceConfig::from_args(&args);

    let store: Arc<dyn DocumentStore> = if config.in_memory {
        info!("document store: in-memory");
        Arc::new(MemoryDocStore::new())
    } else {
        let path = config.resolve_db_path();
        info!("document store: {}", path.display());
        Arc::new(RedbDocStore::open(&path)?)
    };

    let i18n: Arc<dyn Localizer> = Arc::new(DefaultLocalizer);
    let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret, TOKEN_TTL_SECS));
    let gate = Arc::new(AuthGate::new(verifier, Arc::clone(&i18n)));

    let metadata = Arc::new(MetadataService::new(
        Arc::new(TmdbProvider::new(
            &config.metadata_base_url,
            config.metadata_api_key.clone(),
        )),
        config.cache_capacity,
        Duration::from_secs(config.cache_ttl_secs),
    ));

    let modules: Vec<Box<dyn Module>> = vec![Box::new(EngagementModule::new(
        store,
        gate,
        metadata,
        i18n,
    ))];

    let mut app = Router::new().route(
        "/health",
        get(|| async { Json(serde_json::json!({"status": "ok"})) }),
    );
    for module in &modules {
        info!("mounting module: {}", module.name());
        app = app.merge(module.routes());
    }

    info!("ticket server listening on http://{}", config.listen);
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

fn print_usage() {
    println!("ticketd {}", VERSION);
    println!();
    println!("USAGE:");
    println!("    ticketd [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --db=PATH               redb database path (default: ticket.redb)");
    println!("    --mem                   in-memory store (development only)");
    println!("    --listen=ADDR           HTTP listen address (default: 0.0.0.0:8080)");
    println!("    --jwt-secret=SECRET     HMAC secret for token verification");
    println!("    --metadata-base-url=URL movie metadata provider base URL");
    println!("    --metadata-api-key=KEY  movie metadata provider API key");
    println!("    --cache-capacity=N      metadata cache entries (default: 500)");
    println!("    --cache-ttl-secs=N      metadata cache TTL (default: 86400)");
    println!("    --version, -V           Print version");
    println!("    --help, -h              Print this help");
}
