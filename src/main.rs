mod aggregate;
mod catalog;
mod config;
mod database;
mod error;
mod export;
mod filters;
mod handlers;
mod intake;
mod ledger;
mod middleware;
mod models;
mod report;
mod state;
mod upload;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::process::ExitCode;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use dotenvy::dotenv;

use config::AppConfig;
use database::create_database_pool;
use state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let db = match create_database_pool(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to open ledger store {}: {}", config.database_url, e);
            return ExitCode::FAILURE;
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(db, config));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Cannot listen on {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Stock ledger listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server stopped: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::auth::home))
        .route("/login", get(handlers::auth::login_page))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))

        .route("/dashboard", get(handlers::dashboard))

        // Materials ledger views
        .route("/materials", get(handlers::inventory::materials))
        .route("/search", get(handlers::inventory::search))
        .route("/daily", get(handlers::inventory::daily))

        // Tanks
        .route("/tanks", get(handlers::tanks::tanks))

        // Writes
        .route("/upload", get(handlers::uploads::upload_page))
        .route("/upload", post(handlers::uploads::upload))
        .route("/manage", get(handlers::manage::manage_page))
        .route("/manage/batch", post(handlers::manage::delete_batch))
        .route("/manage/rows", post(handlers::manage::delete_rows))

        // CSV exports
        .route("/export/materials.csv", get(handlers::export::export_materials))
        .route("/export/ledger.csv", get(handlers::export::export_ledger))
        .route("/export/tanks.csv", get(handlers::export::export_tanks))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
        )
        .with_state(state)
}
