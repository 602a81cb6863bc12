use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Session
        .route(
            "/session",
            get(handlers::get_session).delete(handlers::sign_out),
        )
        .route("/session/admin", post(handlers::sign_in_admin))
        .route("/session/register", post(handlers::register_artist))
        .route("/session/login", post(handlers::sign_in_artist))
        // Catalog
        .route(
            "/catalog",
            get(handlers::get_catalog).post(handlers::create_item),
        )
        .route("/catalog/genres", get(handlers::get_genres))
        .route("/catalog/:id", axum::routing::delete(handlers::delete_item))
        // AI assistant
        .route("/assistant", get(handlers::assistant_status))
        .route(
            "/assistant/match",
            post(handlers::match_catalog).delete(handlers::clear_match),
        )
        .route("/lyrics", post(handlers::generate_lyrics))
        .route("/lyrics/speech", post(handlers::synthesize_speech))
        // Checkout
        .route("/checkout", post(handlers::checkout))
}
