//! Lunera Core - Shared types library.
//!
//! This crate provides common types used across all Lunera components:
//! - `reconciler` - Catalog reconciliation service (webhook-driven)
//! - `cli` - Command-line tools for migrations and catalog repair
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, storefront
//!   names, and Shopify status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
