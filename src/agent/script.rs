use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "src/agent/assets/"]
struct Assets;

const SCRIPT_FILE: &str = "tracker.js";

/// The browser agent as embedded in the binary.
pub fn tracker_script() -> Option<Vec<u8>> {
    Assets::get(SCRIPT_FILE).map(|file| file.data.into_owned())
}

/// GET /script.js — serve the browser tracking agent.
pub async fn serve_script() -> impl IntoResponse {
    match tracker_script() {
        Some(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
