//! Core data models for the upload gateway and the analytics worker.
//!
//! These types describe stored objects, computed statistics, and the JSON
//! bodies exchanged over HTTP. They serialize with `serde` and carry no
//! behaviour beyond small conversions.

pub mod gateway;
pub mod object;
pub mod statistics;
