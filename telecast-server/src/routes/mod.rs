use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health::health_handler, search::search_handler, search_videos::search_videos_handler};
use crate::infra::app_state::AppState;

/// All routes the original `app/route_search.py` exposes (§4.G), plus
/// `/health` for process liveness.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(search_handler))
        .route("/search-videos", get(search_videos_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
