pub mod auth;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod history;
pub mod http_client;
pub mod ingest;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod sanitize;
