//! Request-scoped models for the storefront.
//!
//! Domain records (products, profiles, tickets) live in `vitrine-core`; this
//! module only holds what the HTTP layer keeps in the session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
