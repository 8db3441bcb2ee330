use crate::ingest::IngestError;
use crate::storage::facts::{CustomEvent, PageView, StatDelta, Visit};
use crate::storage::{AnalyticsStore, StoreError};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Attributes of a `session_start` beacon after context resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitAttributes {
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
    pub occurred_at: DateTime<Utc>,
}

/// Attributes of a `pageview` beacon after context resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewAttributes {
    pub path: String,
    pub visitor_id: String,
    pub session_id: Option<String>,
    pub device_type: String,
    pub os: String,
    pub country: String,
    pub occurred_at: DateTime<Utc>,
}

/// Which half of a fact + rollup pair did not land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedWrite {
    Fact,
    Aggregate,
}

impl FailedWrite {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Aggregate => "aggregate",
        }
    }
}

/// One of the two writes for a beacon failed. Recoverable: logged for
/// offline reconciliation, never reported to the client.
#[derive(Debug)]
pub struct PartialAggregateFailure {
    pub kind: &'static str,
    pub domain: String,
    pub date: NaiveDate,
    pub failed: FailedWrite,
    pub error: StoreError,
}

impl std::fmt::Display for PartialAggregateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} write failed for {} on {}: {}",
            self.kind,
            self.failed.as_str(),
            self.domain,
            self.date,
            self.error
        )
    }
}

impl std::error::Error for PartialAggregateFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of a fact + rollup pair that reached the store at least once.
#[derive(Debug)]
pub enum RecordOutcome {
    Complete,
    Partial(PartialAggregateFailure),
}

impl RecordOutcome {
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Appends facts and applies rollup deltas through an [`AnalyticsStore`].
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn AnalyticsStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn AnalyticsStore {
        self.store.as_ref()
    }

    /// Insert a visit fact and add one visit and one unique visitor to the
    /// day's rollup. Each call counts exactly once; no deduplication by session.
    pub fn record_visit(
        &self,
        domain: &str,
        attrs: VisitAttributes,
    ) -> Result<RecordOutcome, IngestError> {
        let date = attrs.occurred_at.date_naive();
        let visit = Visit {
            id: uuid::Uuid::new_v4().to_string(),
            domain: domain.to_string(),
            session_id: attrs.session_id,
            visitor_id: attrs.visitor_id,
            source: attrs.source,
            device_type: attrs.device_type,
            os: attrs.os,
            country: attrs.country,
            screen_width: attrs.screen_width,
            screen_height: attrs.screen_height,
            language: attrs.language,
            utm_source: attrs.utm_source,
            utm_medium: attrs.utm_medium,
            utm_campaign: attrs.utm_campaign,
            created_at: attrs.occurred_at.naive_utc(),
        };

        let fact = self.store.insert_visit(&visit);
        let rollup = self.store.upsert_daily_stat(domain, date, StatDelta::VISIT);
        settle("visit", domain, date, fact, rollup)
    }

    /// Insert a page view fact and add one page view to the day's rollup.
    pub fn record_page_view(
        &self,
        domain: &str,
        attrs: PageViewAttributes,
    ) -> Result<RecordOutcome, IngestError> {
        let date = attrs.occurred_at.date_naive();
        let page_view = PageView {
            id: uuid::Uuid::new_v4().to_string(),
            domain: domain.to_string(),
            path: attrs.path,
            visitor_id: attrs.visitor_id,
            session_id: attrs.session_id,
            device_type: attrs.device_type,
            os: attrs.os,
            country: attrs.country,
            created_at: attrs.occurred_at.naive_utc(),
        };

        let fact = self.store.insert_page_view(&page_view);
        let rollup = self
            .store
            .upsert_daily_stat(domain, date, StatDelta::PAGE_VIEW);
        settle("pageview", domain, date, fact, rollup)
    }

    /// Append a custom event. The name is stored lower-cased; rollups are untouched.
    pub fn record_event(
        &self,
        domain: &str,
        event_name: &str,
        message: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Result<CustomEvent, IngestError> {
        let domain = domain.trim();
        let event_name = event_name.trim();
        if domain.is_empty() {
            return Err(IngestError::InvalidInput("domain is required".to_string()));
        }
        if event_name.is_empty() {
            return Err(IngestError::InvalidInput("name is required".to_string()));
        }

        let event = CustomEvent {
            id: uuid::Uuid::new_v4().to_string(),
            domain: domain.to_string(),
            event_name: event_name.to_lowercase(),
            message: message.map(str::to_string),
            created_at: occurred_at.naive_utc(),
        };
        self.store.insert_event(&event).map_err(|e| {
            tracing::error!(domain = %event.domain, error = %e, "Failed to store custom event");
            IngestError::StoreUnavailable(e)
        })?;
        Ok(event)
    }
}

/// Both writes have been attempted; succeed if at least one landed.
fn settle(
    kind: &'static str,
    domain: &str,
    date: NaiveDate,
    fact: Result<(), StoreError>,
    rollup: Result<(), StoreError>,
) -> Result<RecordOutcome, IngestError> {
    let (failed, error) = match (fact, rollup) {
        (Ok(()), Ok(())) => return Ok(RecordOutcome::Complete),
        (Err(fact_err), Err(rollup_err)) => {
            tracing::error!(
                kind,
                domain = %domain,
                fact_error = %fact_err,
                error = %rollup_err,
                "Store unavailable"
            );
            return Err(IngestError::StoreUnavailable(rollup_err));
        }
        (Err(e), Ok(())) => (FailedWrite::Fact, e),
        (Ok(()), Err(e)) => (FailedWrite::Aggregate, e),
    };

    let failure = PartialAggregateFailure {
        kind,
        domain: domain.to_string(),
        date,
        failed,
        error,
    };
    tracing::error!(
        kind,
        domain = %failure.domain,
        date = %failure.date,
        failed = failure.failed.as_str(),
        error = %failure.error,
        "Partial aggregate failure"
    );
    Ok(RecordOutcome::Partial(failure))
}
