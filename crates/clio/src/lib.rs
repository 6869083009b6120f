//! Clio API v4 client for folder creation and document uploads.
//!
//! A document upload is three steps: create the document (which issues
//! pre-signed `PUT` targets), `PUT` the bytes, then mark the version fully
//! uploaded.

pub mod client;
pub mod types;

pub use client::{Client, Error};
