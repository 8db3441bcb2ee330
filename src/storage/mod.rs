//! Aggregate store contract and its DuckDB implementation.
//!
//! The engine only ever talks to the traits in this module. Trust decisions
//! (is this domain registered, does this key belong to an account) go
//! through [`DomainRegistry`] and [`ApiKeyAuthenticator`] so the classifier
//! and resolver stay free of ambient authority.

pub mod duckdb_store;
pub mod facts;
pub mod migrations;
pub mod schema;

use crate::query::range::DateInterval;
use chrono::NaiveDate;
use facts::{BreakdownRow, CustomEvent, DailyStat, Dimension, PageView, StatDelta, Visit};
use sha2::{Digest, Sha256};

/// Opaque account identifier issued by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read/write contract for fact tables and daily rollups.
///
/// `upsert_daily_stat` must apply its delta as a single store-side
/// operation: concurrent callers targeting the same `(domain, date)` row
/// never lose an increment.
pub trait AnalyticsStore: Send + Sync {
    fn insert_visit(&self, visit: &Visit) -> Result<(), StoreError>;
    fn insert_page_view(&self, page_view: &PageView) -> Result<(), StoreError>;
    fn insert_event(&self, event: &CustomEvent) -> Result<(), StoreError>;
    fn upsert_daily_stat(
        &self,
        domain: &str,
        date: NaiveDate,
        delta: StatDelta,
    ) -> Result<(), StoreError>;

    fn visits(&self, domain: &str, interval: DateInterval) -> Result<Vec<Visit>, StoreError>;
    fn page_views(&self, domain: &str, interval: DateInterval)
        -> Result<Vec<PageView>, StoreError>;
    fn events(&self, domain: &str, interval: DateInterval)
        -> Result<Vec<CustomEvent>, StoreError>;
    fn daily_stats(&self, domain: &str, interval: DateInterval)
        -> Result<Vec<DailyStat>, StoreError>;
    fn breakdown(
        &self,
        domain: &str,
        interval: DateInterval,
        dimension: Dimension,
    ) -> Result<Vec<BreakdownRow>, StoreError>;
}

/// Registered-domains collaborator.
pub trait DomainRegistry: Send + Sync {
    /// `domain` is expected to be normalized (see [`normalize_domain`]).
    fn is_registered(&self, domain: &str) -> Result<bool, StoreError> {
        Ok(self.owner_of(domain)?.is_some())
    }

    fn owner_of(&self, domain: &str) -> Result<Option<AccountId>, StoreError>;
}

/// Resolves a bearer API key to the account it was issued to.
pub trait ApiKeyAuthenticator: Send + Sync {
    fn authenticate(&self, api_key: &str) -> Result<Option<AccountId>, StoreError>;
}

/// Canonical form of a domain: trimmed, lower-cased, without a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    lowered
        .strip_prefix("www.")
        .map_or_else(|| lowered.clone(), str::to_string)
}

/// API keys are stored as SHA-256 hex digests.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

#[derive(Debug)]
pub enum StoreError {
    Database(duckdb::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e)
    }
}
