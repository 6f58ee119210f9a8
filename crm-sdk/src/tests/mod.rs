//! Unit tests for the CRM SDK
//!
//! This module contains tests for various components of the SDK.

pub mod aggregate_tests;
