pub mod agent;
pub mod aggregate;
pub mod api;
pub mod config;
pub mod ingest;
pub mod query;
pub mod server;
pub mod storage;
