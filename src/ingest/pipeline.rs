//! Beacon ingestion: classify, resolve context, dispatch to the engine.

use crate::aggregate::{AggregationEngine, PageViewAttributes, VisitAttributes};
use crate::ingest::classifier::{classify, ClassifiedBeacon, TrackedEvent};
use crate::ingest::context::{resolve_context, resolve_source};
use crate::ingest::payload::TrackPayload;
use crate::ingest::visitor_id::{client_ip, resolve_visitor_id};
use crate::ingest::IngestError;
use crate::storage::DomainRegistry;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Acknowledgment returned to the agent for an accepted beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub success: bool,
    pub event: String,
}

impl Ack {
    fn accepted(event: &TrackedEvent) -> Self {
        Self {
            success: true,
            event: event.kind().to_string(),
        }
    }
}

/// Owns everything a beacon needs between the HTTP boundary and the store.
pub struct Ingestor {
    engine: AggregationEngine,
    registry: Arc<dyn DomainRegistry>,
    secret: String,
}

impl Ingestor {
    pub fn new(
        engine: AggregationEngine,
        registry: Arc<dyn DomainRegistry>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            registry,
            secret: secret.into(),
        }
    }

    pub const fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Validate and record one beacon received at `now`.
    ///
    /// Validation failures are returned before anything is written.
    pub fn ingest(
        &self,
        payload: &TrackPayload,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Ack, IngestError> {
        let beacon = classify(payload, self.registry.as_ref()).inspect_err(|e| match e {
            IngestError::DomainMismatch | IngestError::UnregisteredDomain => {
                tracing::warn!(domain = %payload.domain, error = %e, "Rejected beacon");
            }
            _ => {}
        })?;

        let user_agent = beacon
            .user_agent
            .as_deref()
            .or_else(|| headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()));
        let ctx = resolve_context(user_agent, headers);

        match &beacon.event {
            TrackedEvent::SessionStart => {
                let visitor_id = self.visitor_id(&beacon, user_agent, headers, now);
                let attrs = VisitAttributes {
                    session_id: beacon.session_id.clone(),
                    visitor_id,
                    source: resolve_source(beacon.source.as_deref(), &beacon.utm),
                    device_type: ctx.device_type.to_string(),
                    os: ctx.os,
                    country: ctx.country,
                    screen_width: beacon.screen.width,
                    screen_height: beacon.screen.height,
                    language: beacon.language.clone(),
                    utm_source: beacon.utm.source.clone(),
                    utm_medium: beacon.utm.medium.clone(),
                    utm_campaign: beacon.utm.campaign.clone(),
                    occurred_at: now,
                };
                self.engine.record_visit(&beacon.domain, attrs)?;
            }
            TrackedEvent::PageView => {
                let attrs = PageViewAttributes {
                    path: beacon.path.clone(),
                    visitor_id: self.visitor_id(&beacon, user_agent, headers, now),
                    session_id: beacon.session_id.clone(),
                    device_type: ctx.device_type.to_string(),
                    os: ctx.os,
                    country: ctx.country,
                    occurred_at: now,
                };
                self.engine.record_page_view(&beacon.domain, attrs)?;
            }
            TrackedEvent::Custom { name, message } => {
                tracing::debug!(
                    domain = %beacon.domain,
                    event = %name,
                    properties = message.as_deref().unwrap_or("-"),
                    "Unrecognised beacon kind acknowledged"
                );
            }
        }

        Ok(Ack::accepted(&beacon.event))
    }

    fn visitor_id(
        &self,
        beacon: &ClassifiedBeacon,
        user_agent: Option<&str>,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> String {
        resolve_visitor_id(
            beacon.visitor_id.as_deref(),
            &client_ip(headers),
            user_agent.unwrap_or(""),
            &self.secret,
            now.date_naive(),
        )
    }
}
