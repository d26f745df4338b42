use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academy_content::config::Config;
use academy_content::index::IndexManager;
use academy_content::kv::{self, KvStore};
use academy_content::middleware::auth::JwtVerifier;
use academy_content::routes::create_router;
use academy_content::storage::S3Storage;
use academy_content::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy_content=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Connect to the KV store
    let kv: Arc<dyn KvStore> = Arc::new(kv::connect(&config.redis).await?);
    info!("Connected to key-value store");

    // Provision object storage buckets (best-effort bootstrap)
    let storage = S3Storage::new(&config.storage)?;
    storage.ensure_buckets().await;

    // Create shared state
    let state = AppState {
        kv: kv.clone(),
        objects: Arc::new(storage),
        auth: Arc::new(JwtVerifier::new(&config.auth.jwt_secret)),
        indexes: Arc::new(IndexManager::new(kv)),
        config: config.clone(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
