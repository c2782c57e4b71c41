//! Remote transport for the nexus client.
//!
//! Talks to PostgREST for table data and postgres-meta for metadata and raw
//! SQL. See [`RestAdapter`].

pub mod client;
pub mod error;

pub use client::RestAdapter;
pub use error::{error_from_response, ApiErrorResponse};
