//! Vitrine Core - storefront domain types and rules.
//!
//! This crate holds everything about the storefront that can be decided
//! without touching a database or the network:
//!
//! - [`types`] - ids, email addresses, prices and status enums
//! - [`catalog`] - the category set, product records, availability and search matching
//! - [`favorites`] - toggle semantics for a user's favorite products
//! - [`support`] - support ticket threads: append rules, closing, unread counts
//! - [`profile`] - user profile and postal address records
//! - [`orders`] - read-only order history records
//!
//! The `storefront` crate persists these types in `PostgreSQL` and exposes them
//! over HTTP; the `cli` crate uses them for seeding and role management.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod favorites;
pub mod orders;
pub mod profile;
pub mod support;
pub mod types;

pub use types::*;
