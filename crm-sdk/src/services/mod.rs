//! Contact use cases built on the aggregation engine
//!
//! This module contains the CRM-specific plans, path construction and the
//! diagnostic passthrough fetch.

pub mod common;
pub mod contacts;
pub mod passthrough;

pub use common::UserAgent;
pub use contacts::ContactService;
