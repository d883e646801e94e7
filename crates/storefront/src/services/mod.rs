//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login (Argon2id)
//! - `catalog` - Cached catalog snapshot and in-memory search
//! - `media` - Image uploads to the media API

pub mod auth;
pub mod catalog;
pub mod media;
