//! # Airtable Provider
//!
//! Implements the `TableClient` trait for the Airtable REST API (v0).
//!
//! ## Overview
//!
//! This crate provides:
//! - Paginated record listing, optionally scoped to a view
//! - Single-record creation with `typecast` enabled
//! - Table schema lookup through the metadata endpoint
//! - A fixed three-attempt retry policy with 1 s / 2 s backoff for writes and
//!   schema reads, driven by an injected `Clock`

pub mod connector;
pub mod error;
pub mod types;

pub use connector::AirtableConnector;
pub use error::{AirtableError, Result};
