use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Layout used when binding `TIMESTAMP` parameters (DuckDB keeps microseconds).
pub const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Layout accepted when reading timestamps back through `strftime`.
pub const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One row per session_start beacon. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: String,
    pub domain: String,
    pub session_id: Option<String>,
    pub visitor_id: String,
    pub source: String,
    pub device_type: String,
    pub os: String,
    pub country: String,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub language: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: NaiveDateTime,
}

/// One row per pageview beacon. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub id: String,
    pub domain: String,
    pub path: String,
    pub visitor_id: String,
    pub session_id: Option<String>,
    pub device_type: String,
    pub os: String,
    pub country: String,
    pub created_at: NaiveDateTime,
}

/// A business event recorded through the authenticated custom-event path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub id: String,
    pub domain: String,
    /// Always lower-case.
    pub event_name: String,
    pub message: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Per-domain, per-day rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub domain: String,
    pub date: NaiveDate,
    pub visits: u64,
    pub unique_visitors: u64,
    pub page_views: u64,
}

/// Amount added to a [`DailyStat`] row by one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatDelta {
    pub visits: u64,
    pub unique_visitors: u64,
    pub page_views: u64,
}

impl StatDelta {
    /// A session_start counts one visit and one unique visitor.
    pub const VISIT: Self = Self {
        visits: 1,
        unique_visitors: 1,
        page_views: 0,
    };

    pub const PAGE_VIEW: Self = Self {
        visits: 0,
        unique_visitors: 0,
        page_views: 1,
    };
}

/// Grouping dimensions for the visit breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    DeviceType,
    Country,
    Os,
}

impl Dimension {
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::DeviceType => "device_type",
            Self::Country => "country",
            Self::Os => "os",
        }
    }
}

/// A breakdown row: dimension value + number of visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub value: String,
    pub count: u64,
}
