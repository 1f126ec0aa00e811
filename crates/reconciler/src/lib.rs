//! Lunera Reconciler library.
//!
//! Keeps per-location Shopify stock levels, per-market availability,
//! product/variant documents, category membership, and default-variant
//! presentation state consistent across every storefront partition as
//! Shopify emits asynchronous, out-of-order, at-least-once webhook events.
//!
//! The service surface is a handful of webhook routes; everything
//! interesting lives in [`engine`], which is generic over the document
//! store ([`catalog::CatalogStore`]) and the upstream gateway
//! ([`shopify::ShopifyGateway`]) so it can be exercised end-to-end in
//! tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod shopify;
pub mod state;
