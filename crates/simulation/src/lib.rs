//! Simulated market for OpenFeed
//!
//! This crate provides:
//! - Mean-reverting per-instrument price processes ([`generator`])
//! - Trading session gating ([`market_hours`])

pub mod generator;
pub mod market_hours;

pub use generator::{PriceProcess, TrendLabel};
pub use market_hours::MarketHours;
