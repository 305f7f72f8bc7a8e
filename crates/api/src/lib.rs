//! Emporium REST backend: catalog, carts, checkout, and order history.
//!
//! The binary in `main.rs` wires configuration, tracing, and Sentry around
//! [`routes::app`]. Integration tests drive the same router against a
//! [`db::MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
