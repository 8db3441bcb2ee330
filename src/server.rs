use crate::agent::script::serve_script;
use crate::api::{events, stats};
use crate::ingest::handler::{track, AppState};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body. A full beacon is a few KB.
const MAX_BODY_BYTES: usize = 65_536;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors(state.dashboard_origin.as_deref());
    let timeout = Duration::from_secs(state.request_timeout_secs);

    let api_routes = Router::new()
        .route("/track", post(track))
        .route("/events", post(events::create_event))
        .route("/analytics", get(stats::get_analytics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/script.js", get(serve_script))
        .nest("/api", api_routes)
        .layer(axum::middleware::map_response(add_security_headers))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inject OWASP-recommended security headers on every HTTP response.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

/// Only the dashboard origin may call the API from a browser.
///
/// `Access-Control-Allow-Origin` is sent only when the request's `Origin`
/// is the dashboard. With no origin configured it is never sent. Beacons
/// still arrive: `text/plain` posts need no preflight.
fn build_cors(dashboard_origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match dashboard_origin.map(str::parse::<HeaderValue>) {
        Some(Ok(allowed)) => layer.allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &axum::http::request::Parts| *origin == allowed,
        )),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Invalid dashboard origin, cross-origin requests disabled");
            layer
        }
        None => layer,
    }
}

/// GET /health — Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
