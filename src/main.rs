use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teachercards::catalog::{default_teachers, CatalogRepository};
use teachercards::{build_router, AppConfig, AppError, AppState, InMemoryStore, PostgresStore, Store};

/// Fills an empty catalog and makes sure a season exists, then wires state
async fn prepare_state<S: Store>(store: Arc<S>, config: AppConfig) -> Result<AppState, AppError> {
    if store.list_teachers().await?.is_empty() {
        for teacher in default_teachers() {
            store.add_teacher(teacher).await?;
        }
        info!("Seeded empty catalog with default teachers");
    }

    let state = AppState::new(store, config);
    if let Some(rollover) = state.season_service.ensure_initial_season().await? {
        info!(
            season_id = %rollover.season.id,
            cards_created = rollover.cards_created,
            "Initial season created"
        );
    }
    Ok(state)
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    let bind_addr = config.bind_addr.clone();

    let state = match config.database_url.clone() {
        Some(url) => {
            info!("Using PostgreSQL store");
            let store = PostgresStore::connect(&url).await?;
            store.ensure_schema().await?;
            prepare_state(Arc::new(store), config).await?
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            prepare_state(Arc::new(InMemoryStore::new()), config).await?
        }
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| {
            error!(error = %e, %bind_addr, "Failed to bind listener");
            AppError::Internal
        })?;
    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await.map_err(|e| {
        error!(error = %e, "Server exited with error");
        AppError::Internal
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teachercards=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting teacher card game server");

    if let Err(e) = run(AppConfig::from_env()).await {
        error!(error = %e, "Fatal startup error");
        std::process::exit(1);
    }
}
