//! Core value types for Vitrine.
//!
//! Type-safe wrappers for identifiers, email addresses, prices and the small
//! closed sets (roles, ticket states, message authors) the storefront uses.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use status::*;
