//! CSV upload gateway: uploads land in an S3-compatible bucket and tabular
//! files are summarized by a separate analytics worker.

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
