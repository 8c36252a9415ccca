use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints available to anonymous clients. A signed-in viewer is still resolved
/// (via `CurrentUser`) so that owners can read their own secret blogs.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // The application root is the blog listing.
        .route("/", get(handlers::index))
        // GET /blogs?term=...
        // Published blogs only, newest first.
        .route("/blogs", get(handlers::index))
        // GET /blogs/{id}
        // Secret blogs answer 404 to anyone but their owner.
        .route("/blogs/{id}", get(handlers::show))
}
