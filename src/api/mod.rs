pub mod auth;
pub mod errors;
pub mod events;
pub mod stats;
