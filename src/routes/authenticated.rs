use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Every write goes through here. The router is wrapped in the authentication layer by
/// `create_router`; handlers additionally receive the resolved `AuthUser` for the ownership and
/// premium checks.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /blogs
        .route("/blogs", post(handlers::create))
        // GET /blogs/new
        // Static segment, takes precedence over the public `/blogs/{id}`.
        .route("/blogs/new", get(handlers::new_blog))
        // GET /blogs/{id}/edit
        .route("/blogs/{id}/edit", get(handlers::edit))
        // PATCH/PUT/DELETE /blogs/{id}
        // Owner only. Non-owners get the same 404 as for a missing blog.
        .route(
            "/blogs/{id}",
            patch(handlers::update)
                .put(handlers::update)
                .delete(handlers::destroy),
        )
}
