use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Files (addressed by `?locator=gridfs://<bucket>/<id>`)
        .route(
            "/files",
            get(handlers::list_files)
                .delete(handlers::delete_file)
                .post(handlers::create_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/content", get(handlers::download_file))
        .route("/files/exists", get(handlers::file_exists))
        .route("/files/info", get(handlers::get_file_info))
        // Health
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
