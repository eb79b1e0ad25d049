//! Options pricing for OpenFeed
//!
//! This crate provides:
//! - Black-Scholes premiums and Greeks ([`black_scholes`])
//! - Monthly expiry calculation ([`expiry`])
//! - Full option chain synthesis ([`chain`])
//!
//! All pricing is deterministic given its inputs; the chain builder
//! adds bounded random jitter to synthetic volume and open interest
//! only.

pub mod black_scholes;
pub mod chain;
pub mod expiry;

pub use black_scholes::{black_scholes_price, compute_greeks, intrinsic_value, norm_cdf, norm_pdf};
pub use chain::{strike_interval, ChainBuilder};
pub use expiry::{next_monthly_expiry, time_to_expiry_years};
