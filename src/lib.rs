//! Tombstone - account deletion and cache-backed storage for a federated
//! social server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Account self-deletion                                    │
//! │  - Admin media maintenance, metrics                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Processing Layer                          │
//! │  - Account deletion cascade                                 │
//! │  - Client API worker, media manager                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Per-entity moka caches behind repositories               │
//! │  - Filesystem media storage                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `auth`: Bearer token extractors
//! - `processing`: Business logic and the client API worker
//! - `workers`: Client API event dispatch
//! - `federation`: Outgoing ActivityPub activities
//! - `media`: Media pruning and emoji refetching
//! - `data`: Database, caches and repositories
//! - `storage`: Media blob storage
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod media;
pub mod metrics;
pub mod processing;
pub mod storage;
pub mod workers;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Application state shared across all handlers
///
/// Caches are created once here and injected into the repositories.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Cache-backed account repository
    pub accounts: data::AccountRepository,

    /// Cache-backed media attachment repository
    pub media: data::MediaRepository,

    /// Media blob storage
    pub storage: Arc<storage::MediaStorage>,

    /// Client API event dispatcher
    pub workers: workers::Workers,

    pub account_processor: processing::AccountProcessor,
    pub admin_processor: processing::AdminProcessor,

    /// Consumer for the client API queue; spawned by the binary
    pub client_api_processor: processing::ClientApiProcessor,

    /// HTTP client for dereferencing remote media
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Initialize caches and repositories
    /// 3. Initialize HTTP client and media storage
    /// 4. Wire the client API queue and processors
    ///
    /// # Returns
    /// The state and the receiving end of the client API queue, to be
    /// handed to `ClientApiProcessor::run`
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(
        config: config::AppConfig,
        cancel: CancellationToken,
    ) -> Result<(Self, workers::ClientApiReceiver), error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Initialize caches and repositories
        let ttl = Duration::from_secs(config.cache.ttl_seconds);
        let account_cache = Arc::new(data::StructCache::new(
            "account",
            config.cache.account_max_items,
            ttl,
        ));
        let media_cache = Arc::new(data::StructCache::new(
            "media",
            config.cache.media_max_items,
            ttl,
        ));
        let accounts = data::AccountRepository::new(db.clone(), account_cache);
        let media = data::MediaRepository::new(db.clone(), media_cache);
        tracing::info!("Caches initialized");

        // 3. Initialize HTTP client and media storage
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent(concat!("Tombstone/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );
        let storage = Arc::new(storage::MediaStorage::new(&config.media.storage_path)?);
        tracing::info!("Media storage initialized");

        // 4. Wire the client API queue and processors
        let (workers, receiver) = workers::Workers::new(cancel);

        let account_processor =
            processing::AccountProcessor::new(db.clone(), accounts.clone(), workers.clone());

        let media_manager = Arc::new(media::Manager::new(
            db.clone(),
            media.clone(),
            accounts.clone(),
            storage.clone(),
        ));
        let dereferencer = Arc::new(media::HttpDereferencer::new(http_client.clone()));
        let admin_processor = processing::AdminProcessor::new(media_manager, dereferencer);

        let federator = Arc::new(federation::OutboxFederator::new(db.clone()));
        let client_api_processor = processing::ClientApiProcessor::new(
            db.clone(),
            media.clone(),
            storage.clone(),
            account_processor.clone(),
            federator,
        );

        tracing::info!("Application state initialized successfully");

        let state = Self {
            config: Arc::new(config),
            db,
            accounts,
            media,
            storage,
            workers,
            account_processor,
            admin_processor,
            client_api_processor,
            http_client,
        };

        Ok((state, receiver))
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route("/metrics", axum::routing::get(metrics_handler))
        .nest("/api", api::accounts_router())
        .nest("/admin", api::admin_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Prometheus text exposition, with cache sizes synced at scrape time
async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::response::Response {
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use prometheus::{Encoder, TextEncoder};

    state.accounts.sync_cache_size().await;
    state.media.sync_cache_size().await;

    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&metrics::REGISTRY.gather()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
