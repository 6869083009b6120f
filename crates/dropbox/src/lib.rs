//! Dropbox API client for recursive listing and ranged downloads.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication. API
//! calls are retried on 429/503 per [`StoragePolicy`](docferry_retry::StoragePolicy).

pub mod client;
pub mod types;

pub use client::{Client, Error};
