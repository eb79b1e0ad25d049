//! Common types for OpenFeed
//!
//! Shared domain types used across all OpenFeed crates: quotes, option
//! contracts and chains, Greeks, and the transport state enum.

pub mod types;

pub use types::*;
