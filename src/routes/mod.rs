//! API Routes
//!
//! This module organizes all HTTP endpoints for the service:
//! - `/blog-posts` - Blog post CRUD and listing
//! - `/upload-material`, `/course/{id}/materials`, `/material/{id}` - Course materials
//! - `/generate-certificate`, `/certificates` - Certificates
//! - `/health` - Liveness

pub mod blog;
pub mod certificates;
pub mod health;
pub mod materials;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    Router::new()
        .merge(blog::router(state.clone()))
        .merge(materials::router(state.clone()))
        .merge(certificates::router(state.clone()))
        .merge(health::router())
        .layer(cors_layer(&state.config.server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
