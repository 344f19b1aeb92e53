//! Router construction

use crate::api::{health, state::AppState, users};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{info_span, Level};
use uuid::Uuid;

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Room for the text fields and multipart framing around the photo
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Unique id assigned to each request
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Request ID middleware - tags the request and echoes the id on the response
async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .registration
        .policy()
        .max_photo_bytes
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        // Health check and hello world
        .route("/", get(health::hello_world))
        .route("/api/health", get(health::health_check))
        // Registration and lookup
        .route("/register", post(users::register))
        .route("/users", get(users::list_users))
        .route("/users/:key", get(users::get_user))
        .route("/users/:key/complete", post(users::complete_user))
        // Middleware (order matters - request_id must wrap the trace layer)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .map(|id| id.0.as_str())
                        .unwrap_or("-");
                    info_span!(
                        "request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
