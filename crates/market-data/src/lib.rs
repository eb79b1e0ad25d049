//! Market data engine for OpenFeed
//!
//! This crate wires the simulated market and the pricing layer into a
//! subscription-based service:
//!
//! - [`cache`] - TTL + LRU freshness cache
//! - [`hub`] - topic-keyed fanout to channel consumers
//! - [`backoff`] - deterministic exponential reconnect backoff
//! - [`transport`] - push transport state machine
//! - [`feed`] - data source seam (simulated or live adapter)
//! - [`service`] - the orchestrator and public API

pub mod backoff;
pub mod cache;
pub mod error;
pub mod feed;
pub mod hub;
pub mod service;
pub mod transport;

pub use backoff::ExponentialBackoff;
pub use cache::TtlCache;
pub use error::{MarketDataError, Result};
pub use feed::{DataFeed, SimulatedFeed};
pub use hub::{FeedCommand, MarketUpdate, SubscriptionHub, SubscriptionId, TopicKey, TopicKind};
pub use service::MarketDataService;
pub use transport::{SimulatedTransport, Transport, TransportManager};
