//! Server entrypoint: configuration, pool, router, listener.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use stanza::adapters::http::{api_router, AppState};
use stanza::adapters::postgres::{connect, PostgresChatStore, PostgresUsageStore};
use stanza::adapters::providers::ProviderRegistry;
use stanza::application::{StreamTurnHandler, TurnConfig};
use stanza::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let pool = connect(&config.database).await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let chat_store = Arc::new(PostgresChatStore::new(pool.clone()));
    let usage_store = Arc::new(PostgresUsageStore::new(pool));
    let registry = Arc::new(ProviderRegistry::from_config(&config.providers));

    let turn_config = TurnConfig {
        default_model: config.providers.default_model.clone(),
        ..TurnConfig::default()
    };
    let turns = Arc::new(StreamTurnHandler::with_config(
        chat_store.clone(),
        registry,
        turn_config,
    ));

    let state = AppState::new(chat_store, usage_store, turns);

    let origins = config.server.cors_origins_list();
    let cors = if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<axum::http::HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
