use serde::{Deserialize, Serialize};

/// Event kind announcing a fresh client-side session.
pub const SESSION_START: &str = "session_start";
/// Event kind for a page view.
pub const PAGEVIEW: &str = "pageview";

/// Beacon body posted by the tracking agent to `/api/track`.
///
/// Every field is optional on the wire so that a malformed beacon is
/// reported as `InvalidInput` rather than a deserializer rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPayload {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// `session_start`, `pageview`, or any custom event name.
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub utm: UtmParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub screen: ScreenSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Free-form properties attached to custom events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
}

impl UtmParams {
    /// Read `utm_source`, `utm_medium` and `utm_campaign` from a URL query string.
    pub fn from_url(url: &str) -> Self {
        let Some(query) = url.split_once('?').map(|(_, q)| q) else {
            return Self::default();
        };
        let query = query.split('#').next().unwrap_or(query);

        let mut utm = Self::default();
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if value.is_empty() {
                continue;
            }
            match key {
                "utm_source" => utm.source = Some(value.to_string()),
                "utm_medium" => utm.medium = Some(value.to_string()),
                "utm_campaign" => utm.campaign = Some(value.to_string()),
                _ => {}
            }
        }
        utm
    }

    /// Fill fields missing from `self` with those from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            source: self.source.or(fallback.source),
            medium: self.medium.or(fallback.medium),
            campaign: self.campaign.or(fallback.campaign),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}
