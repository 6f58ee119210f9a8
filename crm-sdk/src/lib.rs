//! # CRM SDK
//!
//! Aggregation and normalization engine for a CRM contact gateway.
//!
//! This crate provides:
//!
//! - A timed upstream client for the CRM REST API
//! - An aggregator that runs named calls under a required/optional policy
//! - Field catalog resolution and contact normalization
//! - Webhook validation and decoding
//! - Configuration management utilities and a shared error taxonomy
//!
//! ## Architecture
//!
//! The SDK is designed around the following key abstractions:
//!
//! - `UpstreamFetch`: one timed GET producing an `UpstreamResult`
//! - `Aggregator`: runs an `AggregatePlan` of `UpstreamRequestSpec`s
//! - `FieldCatalogResolver`: one page of the field catalog
//! - `Normalizer`: merges field values, catalog and memberships
//! - `WebhookIngestor`: checks and decodes inbound callbacks
//! - `ServiceError`: comprehensive error handling system

// Re-export core modules
pub mod core;
pub use core::{ClientBuilder, Decoded, RawResponse, UpstreamClient, UpstreamFetch, UpstreamResult};

// Aggregation engine
pub mod aggregate;
pub use aggregate::{AggregatePlan, Aggregation, Aggregator, CallCost, ExecutionMode, UpstreamRequestSpec};

pub mod catalog;
pub use catalog::{CatalogPage, FieldCatalog, FieldCatalogResolver, FieldDefinition};

pub mod normalize;
pub use normalize::{ListMembership, NormalizedContact, Normalizer};

pub mod webhook;
pub use webhook::{WebhookEvent, WebhookIngestor, WebhookSummary};

// Re-export service-specific modules
pub mod services;
pub use services::ContactService;

// Re-export error handling
pub mod error;
pub use error::{Result, ServiceError};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, CrmConfig, ServiceConfig, TimeoutConfig, WebhookConfig};

// Utility module for common functionality
mod util;

#[cfg(test)]
mod tests;
