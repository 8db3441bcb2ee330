pub mod analytics;
pub mod range;
