//! Observability infrastructure for OpenFeed
//!
//! This crate provides structured logging via tracing.
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("openfeed", LogFormat::Pretty)?;
//! tracing::info!("Engine started");
//! ```

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
