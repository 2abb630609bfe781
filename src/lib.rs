// birdfeed: aggregating proxy for the X v2 API.
// Core request orchestration, response normalization, caching, and
// tabular export; `http` is the thin front-end over the core.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod http;
pub mod upstream;

pub use error::{ApiError, Result};
