//! Fact appends and daily rollup maintenance.
//!
//! The [`engine::AggregationEngine`] is the only writer of visit, page view,
//! event and daily stat rows.

pub mod engine;

pub use engine::{
    AggregationEngine, FailedWrite, PageViewAttributes, PartialAggregateFailure, RecordOutcome,
    VisitAttributes,
};
