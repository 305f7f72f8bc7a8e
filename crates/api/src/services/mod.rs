//! Business logic shared by the HTTP handlers and the CLI.
//!
//! Services borrow the [`crate::db::Store`] for the length of one request.
//! Cart and order operations require an [`access::Owner`], which can only be
//! obtained by checking the caller against the user in the request path.

pub mod access;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

/// Attempts made by a cart read-modify-write before giving up.
pub(crate) const MAX_CART_ATTEMPTS: u32 = 8;
