use crate::api::auth::authorize_domain;
use crate::api::errors::ApiError;
use crate::ingest::handler::AppState;
use crate::ingest::{sanitize_optional, IngestError};
use crate::storage::facts::CustomEvent;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_MESSAGE: usize = 4096;
const MAX_NAME: usize = 256;

/// Body of `POST /api/events`.
#[derive(Debug, Default, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventCreated {
    pub success: bool,
    pub event: CustomEvent,
}

/// POST /api/events — record a business event for a domain the caller owns.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<EventCreated>), ApiError> {
    let req: EventRequest = serde_json::from_slice(&body)
        .map_err(|e| IngestError::InvalidInput(format!("malformed event: {e}")))?;

    let event = tokio::task::spawn_blocking(move || {
        let (_, domain) = authorize_domain(
            state.authenticator.as_ref(),
            state.registry.as_ref(),
            &headers,
            &req.domain,
        )?;
        let name = sanitize_optional(Some(&req.name), MAX_NAME).unwrap_or_default();
        let message = sanitize_optional(req.description.as_deref(), MAX_MESSAGE);
        state
            .ingestor
            .engine()
            .record_event(&domain, &name, message.as_deref(), Utc::now())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Event task panicked: {e}")))??;

    tracing::debug!(domain = %event.domain, event = %event.event_name, "Custom event recorded");
    Ok((
        StatusCode::CREATED,
        Json(EventCreated {
            success: true,
            event,
        }),
    ))
}
