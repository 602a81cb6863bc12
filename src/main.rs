use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use beat_market::{
    api::{create_router, AppDependencies, AppState},
    config::Config,
    db::{create_pool, create_redis_client, Cache, CatalogStore, MemoryStore, PgStore, ProfileStore},
    services::{
        recommender, CatalogSync, CheckoutSettings, MemorySessionStore, SessionStore,
        SingleAdminPolicy,
    },
    storage::{BlobStore, HttpBlobStore, MemoryBlobStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("beat_market=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (catalog, profiles): (Arc<dyn CatalogStore>, Arc<dyn ProfileStore>) =
        match &config.database_url {
            Some(url) => {
                let store = PgStore::new(create_pool(url).await?);
                tracing::info!("Catalog backed by Postgres");
                (Arc::new(store.clone()), Arc::new(store))
            }
            None => {
                let store = MemoryStore::new();
                tracing::warn!("DATABASE_URL not set, catalog kept in memory");
                (Arc::new(store.clone()), Arc::new(store))
            }
        };

    let session_store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => Arc::new(Cache::new(create_redis_client(url)?)),
        None => {
            tracing::warn!("REDIS_URL not set, sessions will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    let blobs: Arc<dyn BlobStore> = match (&config.storage_url, &config.storage_api_key) {
        (Some(url), Some(key)) => Arc::new(HttpBlobStore::new(url.clone(), key.clone())),
        _ => {
            tracing::warn!("Object storage not configured, uploads kept in memory");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let state = AppState::new(AppDependencies {
        sync: CatalogSync::new(catalog, blobs),
        profiles,
        session_store,
        recommender: recommender::from_config(&config),
        policy: Arc::new(SingleAdminPolicy::new(
            &config.admin_email,
            config.admin_passcode.clone(),
            config.admin_username.clone(),
        )),
        checkout: CheckoutSettings::from(&config),
    })
    .await;

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
