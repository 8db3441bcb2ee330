pub mod classifier;
pub mod context;
pub mod handler;
pub mod payload;
pub mod pipeline;
pub mod useragent;
pub mod visitor_id;

use crate::storage::StoreError;

/// Failures a beacon or custom event can be rejected with.
///
/// Everything except `StoreUnavailable` is raised before any write.
#[derive(Debug)]
pub enum IngestError {
    /// The beacon's URL does not reference the claimed domain.
    DomainMismatch,
    /// The domain is not in the registry.
    UnregisteredDomain,
    /// Missing or unknown bearer credential.
    Unauthorized,
    /// A required field is empty after normalization.
    InvalidInput(String),
    /// Neither the fact nor the rollup could be written.
    StoreUnavailable(StoreError),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainMismatch => write!(f, "URL does not match domain"),
            Self::UnregisteredDomain => write!(f, "Domain is not registered"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::StoreUnavailable(e) => write!(f, "Store unavailable: {e}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreUnavailable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e)
    }
}

/// Strip control characters and truncate to `max_len` characters.
pub fn sanitize_string(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect()
}

/// Sanitize an optional field, collapsing blank values to `None`.
pub fn sanitize_optional(input: Option<&str>, max_len: usize) -> Option<String> {
    input
        .map(|s| sanitize_string(s.trim(), max_len))
        .filter(|s| !s.is_empty())
}
