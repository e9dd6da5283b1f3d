//! Typed HTTP client for the Airtable records API.
//!
//! Covers the three operations the bridge performs against a base:
//! query-by-formula, record creation, and partial record updates.
//! Authentication is a static bearer token; field names and table ids are
//! the caller's concern.

pub mod client;
pub mod formula;

pub use client::{AirtableClient, AirtableError, Record};
