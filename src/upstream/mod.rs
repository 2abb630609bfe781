// Upstream API module.
// Client, query-parameter construction, and response models for the
// X v2 REST API.

pub mod client;
pub mod params;
pub mod types;

pub use client::{PageQuery, UpstreamClient, UpstreamResponse};
pub use types::*;
