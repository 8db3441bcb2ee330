use crate::api::auth::authorize_domain;
use crate::api::errors::ApiError;
use crate::ingest::handler::AppState;
use crate::query::analytics::{query_analytics, AnalyticsBundle};
use crate::query::range::TimeRange;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for `GET /api/analytics`.
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    #[serde(default)]
    pub domain: String,
    pub range: Option<String>,
}

impl AnalyticsParams {
    /// `last7days` when absent; anything outside the fixed set is rejected.
    pub fn time_range(&self) -> Result<TimeRange, ApiError> {
        self.range.as_deref().map_or(Ok(TimeRange::default()), |raw| {
            TimeRange::parse(raw).ok_or_else(|| {
                let allowed: Vec<_> = TimeRange::ALL.iter().map(|r| r.as_str()).collect();
                ApiError::BadRequest(format!(
                    "Invalid range: {raw}. Use one of {}",
                    allowed.join(", ")
                ))
            })
        })
    }
}

/// GET /api/analytics — aggregate bundle for a domain the caller owns.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<AnalyticsBundle>, ApiError> {
    let range = params.time_range()?;

    let bundle = tokio::task::spawn_blocking(move || -> Result<AnalyticsBundle, ApiError> {
        let (_, domain) = authorize_domain(
            state.authenticator.as_ref(),
            state.registry.as_ref(),
            &headers,
            &params.domain,
        )?;
        Ok(query_analytics(
            state.store.as_ref(),
            &domain,
            range,
            Utc::now(),
        )?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Query task panicked: {e}")))??;

    Ok(Json(bundle))
}
