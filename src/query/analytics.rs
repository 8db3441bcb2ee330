use crate::query::range::{DateInterval, TimeRange};
use crate::storage::facts::{BreakdownRow, CustomEvent, DailyStat, Dimension, PageView, Visit};
use crate::storage::{AnalyticsStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the reporting layer needs to draw a dashboard for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBundle {
    pub range: TimeRange,
    pub interval: DateInterval,
    pub page_views: Vec<PageView>,
    pub visits: Vec<Visit>,
    pub daily_stats: Vec<DailyStat>,
    pub device_stats: Vec<BreakdownRow>,
    pub country_stats: Vec<BreakdownRow>,
    pub os_stats: Vec<BreakdownRow>,
    pub events: Vec<CustomEvent>,
}

/// Assemble facts, rollups and visit breakdowns for `domain` over `range`.
///
/// `range` is resolved against `now` on every call. Read-only: safe to run
/// alongside ingestion and other reads.
pub fn query_analytics(
    store: &dyn AnalyticsStore,
    domain: &str,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Result<AnalyticsBundle, StoreError> {
    let interval = range.resolve(now);

    Ok(AnalyticsBundle {
        range,
        interval,
        page_views: store.page_views(domain, interval)?,
        visits: store.visits(domain, interval)?,
        daily_stats: store.daily_stats(domain, interval)?,
        device_stats: store.breakdown(domain, interval, Dimension::DeviceType)?,
        country_stats: store.breakdown(domain, interval, Dimension::Country)?,
        os_stats: store.breakdown(domain, interval, Dimension::Os)?,
        events: store.events(domain, interval)?,
    })
}
