use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod models;
pub mod outcome;
pub mod policy;
pub mod repository;
pub mod sanitize;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the blog endpoints, served at `/api-docs/openapi.json` and browsable
/// through the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::show, handlers::new_blog, handlers::edit,
        handlers::create, handlers::update, handlers::destroy
    ),
    components(
        schemas(
            models::Blog, models::BlogDraft, models::BlogEnvelope, models::BlogParams, models::User,
        )
    ),
    tags(
        (name = "blog-portal", description = "Blog posts with owner-only secrets and premium eyecatches")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container shared by every request: the store handle and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory for local runs without a database and for tests.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets the identity extractors pull only what they need out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Extracting `AuthUser` rejects with 401 before the handler
/// runs when no valid identity can be resolved.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the public and authenticated routers, the documentation, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // The page documents are consumed by a separately hosted view layer.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Every request gets an id, unless the caller already supplied one.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, correlated by the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
