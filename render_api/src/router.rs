use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::handlers::{VIDEOS_PATH, health_handler, render_handler};
use crate::state::AppContext;

/// Largest accepted `POST /render` body.
pub const RENDER_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Build the complete HTTP application around `context`.
pub fn app(context: AppContext) -> Router {
    let videos = ServeDir::new(context.output().path());

    let router = Router::new()
        .route(
            "/render",
            post(render_handler).layer(DefaultBodyLimit::max(RENDER_BODY_LIMIT)),
        )
        .route("/health", get(health_handler))
        .nest_service(VIDEOS_PATH, videos)
        .with_state(context);

    rv_axum::with_common_layers(router)
}
