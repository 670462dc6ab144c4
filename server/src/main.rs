use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use eventhub_server::config::Config;
use eventhub_server::routes::create_routes;
use eventhub_server::state::AppState;
use eventhub_server::store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let state = match config.database_url.as_deref() {
        Some(database_url) => {
            let store = PgStore::connect(database_url, config.max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Successfully connected to database");

            store.migrate().await.expect("Failed to run migrations");
            tracing::info!("Migrations run successfully");

            AppState::with_backend(Arc::new(store), config.review_list_policy)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            AppState::with_backend(Arc::new(MemoryStore::new()), config.review_list_policy)
        }
    };
    tracing::info!(
        review_list_policy = ?state.authorizer.review_list_policy(),
        "Authorization policy loaded"
    );

    let app = create_routes(state, &config);

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
