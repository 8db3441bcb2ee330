//! Device, OS, country and traffic-source resolution. Stateless.

use crate::ingest::payload::UtmParams;
use crate::ingest::useragent::{parse_user_agent, DeviceType};
use axum::http::HeaderMap;

/// Edge headers carrying the visitor's country, in priority order.
pub const COUNTRY_HEADERS: [&str; 4] = [
    "cf-ipcountry",
    "x-vercel-ip-country",
    "cloudfront-viewer-country",
    "x-country-code",
];

pub const UNKNOWN_COUNTRY: &str = "unknown";
pub const UNKNOWN_OS: &str = "Unknown";
pub const DIRECT_SOURCE: &str = "direct";

/// What the resolver derives from a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub device_type: DeviceType,
    pub os: String,
    pub country: String,
}

/// Resolve device class, OS and country for one beacon.
pub fn resolve_context(user_agent: Option<&str>, headers: &HeaderMap) -> RequestContext {
    let parsed = user_agent.map(parse_user_agent).unwrap_or_default();
    RequestContext {
        device_type: parsed.device_type,
        os: parsed.os.unwrap_or_else(|| UNKNOWN_OS.to_string()),
        country: resolve_country(headers),
    }
}

/// First non-empty country header wins; none yields [`UNKNOWN_COUNTRY`].
pub fn resolve_country(headers: &HeaderMap) -> String {
    COUNTRY_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map_or_else(|| UNKNOWN_COUNTRY.to_string(), str::to_ascii_uppercase)
}

/// Explicit source, else UTM medium, else UTM source, else `direct`.
pub fn resolve_source(explicit: Option<&str>, utm: &UtmParams) -> String {
    [explicit, utm.medium.as_deref(), utm.source.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DIRECT_SOURCE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm(source: Option<&str>, medium: Option<&str>) -> UtmParams {
        UtmParams {
            source: source.map(str::to_string),
            medium: medium.map(str::to_string),
            campaign: None,
        }
    }

    #[test]
    fn test_source_explicit_wins() {
        assert_eq!(resolve_source(Some("ads"), &utm(None, Some("email"))), "ads");
    }

    #[test]
    fn test_source_falls_back_to_medium_then_source() {
        assert_eq!(resolve_source(None, &utm(None, Some("email"))), "email");
        assert_eq!(resolve_source(None, &utm(Some("google"), Some("cpc"))), "cpc");
        assert_eq!(resolve_source(None, &utm(Some("google"), None)), "google");
    }

    #[test]
    fn test_source_defaults_to_direct() {
        assert_eq!(resolve_source(None, &UtmParams::default()), "direct");
        assert_eq!(resolve_source(Some(""), &UtmParams::default()), "direct");
    }

    #[test]
    fn test_country_priority_order() {
        let mut headers = HeaderMap::new();
        headers.insert("x-country-code", "fr".parse().unwrap());
        headers.insert("x-vercel-ip-country", "DE".parse().unwrap());
        assert_eq!(resolve_country(&headers), "DE");

        headers.insert("cf-ipcountry", "US".parse().unwrap());
        assert_eq!(resolve_country(&headers), "US");
    }

    #[test]
    fn test_country_skips_blank_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-ipcountry", "".parse().unwrap());
        headers.insert("cloudfront-viewer-country", "jp".parse().unwrap());
        assert_eq!(resolve_country(&headers), "JP");
    }

    #[test]
    fn test_country_unknown_without_headers() {
        assert_eq!(resolve_country(&HeaderMap::new()), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_context_defaults_without_user_agent() {
        let ctx = resolve_context(None, &HeaderMap::new());
        assert_eq!(ctx.device_type, DeviceType::Desktop);
        assert_eq!(ctx.os, UNKNOWN_OS);
        assert_eq!(ctx.country, UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_context_from_mobile_user_agent() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2_1 like Mac OS X) Mobile/15E148";
        let ctx = resolve_context(Some(ua), &HeaderMap::new());
        assert_eq!(ctx.device_type, DeviceType::Mobile);
        assert_eq!(ctx.os, "iOS");
    }
}
