use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use critique_core::OpenAiClient;
use critique_server::routes::api_router;
use critique_server::{AppState, Config, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting critique server");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let db_path = config.state_dir.join("critique.db");
    info!("Using database: {}", db_path.display());
    let store = SqliteStore::new(&db_path).expect("Failed to initialize SQLite database");

    let service = OpenAiClient::new(config.openai_api_key.clone(), config.openai_model.clone());

    let app_state = Arc::new(AppState::new(Arc::new(store), Arc::new(service)));

    let app = api_router()
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
