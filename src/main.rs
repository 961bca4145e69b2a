//! Attendance Backend
//!
//! A REST backend for employee attendance records with SQLite persistence,
//! aggregate statistics and cached PNG charts.

mod analytics;
mod api;
mod charts;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use charts::ChartCache;
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub cache: Arc<ChartCache>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Attendance Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize chart cache
    let cache = Arc::new(ChartCache::open(&config.cache_dir).await?);
    tracing::info!(
        "Chart cache: {:?} ({}s window)",
        cache.root(),
        config.chart_window_secs
    );

    // Create application state
    let state = AppState {
        repo,
        cache,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes keep their trailing slashes
    let api_routes = Router::new()
        .route("/api/", get(api::api_root))
        // Employees
        .route(
            "/api/employees/",
            get(api::list_employees).post(api::create_employee),
        )
        .route(
            "/api/employees/{id}/",
            get(api::get_employee)
                .put(api::update_employee)
                .patch(api::patch_employee)
                .delete(api::delete_employee),
        )
        // Analytics
        .route("/api/analysis/", get(api::get_analysis))
        .route("/api/visualization/", get(api::get_visualization))
        .route("/api/chart/{name}/", get(api::get_chart));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
