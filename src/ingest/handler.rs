use crate::aggregate::AggregationEngine;
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::api::errors::ApiError;
use crate::ingest::payload::TrackPayload;
use crate::ingest::pipeline::{Ack, Ingestor};
use crate::ingest::IngestError;
use crate::storage::{AnalyticsStore, ApiKeyAuthenticator, DomainRegistry};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

/// Shared application state handed to every handler.
pub struct AppState {
    pub ingestor: Ingestor,
    pub store: Arc<dyn AnalyticsStore>,
    pub registry: Arc<dyn DomainRegistry>,
    pub authenticator: Arc<dyn ApiKeyAuthenticator>,
    /// Sole origin allowed by CORS. `None` denies cross-origin browsers.
    pub dashboard_origin: Option<String>,
    pub request_timeout_secs: u64,
}

impl AppState {
    /// Wire every collaborator to one store that plays all three roles.
    pub fn new<S>(store: Arc<S>, secret: impl Into<String>) -> Self
    where
        S: AnalyticsStore + DomainRegistry + ApiKeyAuthenticator + 'static,
    {
        let engine = AggregationEngine::new(store.clone());
        Self {
            ingestor: Ingestor::new(engine, store.clone(), secret),
            store: store.clone(),
            registry: store.clone(),
            authenticator: store,
            dashboard_origin: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// POST /api/track — beacon ingestion.
///
/// The body is read as raw bytes so `text/plain` beacons (which skip the CORS
/// preflight) parse the same as `application/json`.
pub async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Ack>), ApiError> {
    let payload: TrackPayload = serde_json::from_slice(&body)
        .map_err(|e| IngestError::InvalidInput(format!("malformed beacon: {e}")))?;

    let ack = tokio::task::spawn_blocking(move || {
        state.ingestor.ingest(&payload, &headers, Utc::now())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("ingest task failed: {e}")))??;

    Ok((StatusCode::ACCEPTED, Json(ack)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::duckdb_store::DuckDbStore;

    #[test]
    fn test_state_timeout_matches_config_default() {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        let state = AppState::new(store, "secret");
        assert_eq!(
            state.request_timeout_secs,
            Config::default().request_timeout_secs
        );
        assert!(state.dashboard_origin.is_none());
    }
}
