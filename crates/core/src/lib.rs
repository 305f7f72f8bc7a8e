//! Emporium Core - domain types and invariants.
//!
//! This crate provides the types shared by every Emporium component:
//! - `api` - REST backend for catalog, cart, and orders
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. The cart aggregate's invariant maintenance and the
//! checkout transition live here so they can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, phones
//! - [`catalog`] - Categories and products
//! - [`cart`] - The per-user cart aggregate
//! - [`order`] - Immutable order snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod types;

pub use cart::{Cart, CartError, CartParts, LineItem};
pub use catalog::{Category, NewProduct, Product};
pub use order::Order;
pub use types::*;
