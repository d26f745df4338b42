// Academy Content - content indexing and storage service for the academy learning platform

pub mod config;
pub mod index;
pub mod kv;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
