//! API-side domain models that are not shared with other crates.

pub mod user;

pub use user::{PostalAddress, User, UserAddress};
