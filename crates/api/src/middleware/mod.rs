//! HTTP middleware and extractors.
//!
//! # Layer Order (outermost first, as built in `main`)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (correlation header, span field, Sentry tag)
//!
//! Bearer authentication is an extractor ([`RequireAuth`]) rather than a
//! layer, so public routes need no special casing.

pub mod auth;
pub mod request_id;

pub use auth::RequireAuth;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
