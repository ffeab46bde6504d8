pub mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;

/// 构建路由
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/:id/progress", get(project_progress))
        .route("/api/projects/:id/records", get(list_records))
        .route("/api/projects/:id/records/:index", patch(update_record))
        .route("/api/projects/:id/production", post(add_production))
        .route("/api/projects/:id/export", get(export_project))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(server.max_upload_bytes)))
        .with_state(state)
}
