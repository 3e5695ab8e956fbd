//! # Middleware
//!
//! Request-level concerns layered around the file routes.

pub mod cors;
pub mod rate_limit;
