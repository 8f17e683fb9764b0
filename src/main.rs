use anyhow::{Context, Result};
use axum::{routing::get, Router};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use deskserver::classifier::ClassifierEngine;
use deskserver::core::config::AppConfig;
use deskserver::core::shared::state::AppState;
use deskserver::core::shared::utils::init_pool;
use deskserver::profiles::configure_profiles_routes;
use deskserver::tickets::configure_tickets_routes;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let pool = init_pool(&config.database.url).context("failed to build database pool")?;

    {
        let mut conn = pool
            .get()
            .context("no database connection available for migrations")?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    }

    let classifier = ClassifierEngine::from_config(&config.classifier);
    classifier.warm();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(pool, config, classifier));

    let app = Router::new()
        .merge(configure_tickets_routes())
        .merge(configure_profiles_routes())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("deskserver listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
