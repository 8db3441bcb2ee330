//! Validates a raw beacon and turns it into a closed set of event kinds.
//!
//! Classification is pure apart from the registry lookup, which goes through
//! the injected [`DomainRegistry`].

use crate::ingest::payload::{ScreenSize, TrackPayload, UtmParams, PAGEVIEW, SESSION_START};
use crate::ingest::{sanitize_optional, sanitize_string, IngestError};
use crate::storage::{normalize_domain, DomainRegistry};

const MAX_SHORT_FIELD: usize = 256;
const MAX_URL: usize = 2048;
const MAX_ID: usize = 128;
const MAX_MESSAGE: usize = 4096;

/// The three shapes a validated beacon can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedEvent {
    SessionStart,
    PageView,
    /// Anything else. Acknowledged, never aggregated.
    Custom {
        name: String,
        message: Option<String>,
    },
}

impl TrackedEvent {
    fn from_kind(kind: &str, properties: Option<&serde_json::Value>) -> Self {
        match kind {
            SESSION_START => Self::SessionStart,
            PAGEVIEW => Self::PageView,
            other => Self::Custom {
                name: other.to_string(),
                message: properties
                    .filter(|p| !p.is_null())
                    .map(|p| sanitize_string(&p.to_string(), MAX_MESSAGE)),
            },
        }
    }

    /// The event kind as echoed back to the client.
    pub fn kind(&self) -> &str {
        match self {
            Self::SessionStart => SESSION_START,
            Self::PageView => PAGEVIEW,
            Self::Custom { name, .. } => name,
        }
    }
}

/// A beacon that passed validation, with every field sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedBeacon {
    /// Normalized registered domain.
    pub domain: String,
    pub event: TrackedEvent,
    pub url: String,
    pub path: String,
    pub visitor_id: Option<String>,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub source: Option<String>,
    pub utm: UtmParams,
    pub screen: ScreenSize,
    pub language: Option<String>,
}

/// Validate `payload` against the registry and classify it.
///
/// Checks run in order: required fields, URL/domain agreement, registration.
pub fn classify(
    payload: &TrackPayload,
    registry: &dyn DomainRegistry,
) -> Result<ClassifiedBeacon, IngestError> {
    let claimed = sanitize_string(payload.domain.trim(), MAX_SHORT_FIELD).to_ascii_lowercase();
    let url = sanitize_string(payload.url.trim(), MAX_URL);
    let kind = sanitize_string(payload.event.trim(), MAX_SHORT_FIELD);

    if claimed.is_empty() {
        return Err(IngestError::InvalidInput("domain is required".to_string()));
    }
    if url.is_empty() {
        return Err(IngestError::InvalidInput("url is required".to_string()));
    }
    if kind.is_empty() {
        return Err(IngestError::InvalidInput("event is required".to_string()));
    }

    if !url.to_ascii_lowercase().contains(&claimed) {
        return Err(IngestError::DomainMismatch);
    }

    let domain = normalize_domain(&claimed);
    if !registry.is_registered(&domain)? {
        return Err(IngestError::UnregisteredDomain);
    }

    let path = sanitize_optional(payload.path.as_deref(), MAX_URL)
        .unwrap_or_else(|| path_from_url(&url));
    let utm = sanitize_utm(&payload.utm).or(sanitize_utm(&UtmParams::from_url(&url)));

    Ok(ClassifiedBeacon {
        domain,
        event: TrackedEvent::from_kind(&kind, payload.properties.as_ref()),
        path,
        visitor_id: sanitize_optional(payload.visitor_id.as_deref(), MAX_ID),
        session_id: sanitize_optional(payload.session_id.as_deref(), MAX_ID),
        user_agent: sanitize_optional(payload.user_agent.as_deref(), MAX_URL),
        source: sanitize_optional(payload.source.as_deref(), MAX_SHORT_FIELD),
        utm,
        screen: payload.screen,
        language: sanitize_optional(payload.language.as_deref(), MAX_SHORT_FIELD),
        url,
    })
}

fn sanitize_utm(utm: &UtmParams) -> UtmParams {
    UtmParams {
        source: sanitize_optional(utm.source.as_deref(), MAX_SHORT_FIELD),
        medium: sanitize_optional(utm.medium.as_deref(), MAX_SHORT_FIELD),
        campaign: sanitize_optional(utm.campaign.as_deref(), MAX_SHORT_FIELD),
    }
}

/// Extract the path component of a URL, without query string or fragment.
pub fn path_from_url(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let path = rest.find('/').map_or("/", |pos| &rest[pos..]);

    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
