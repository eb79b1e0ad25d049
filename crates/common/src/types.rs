//! Shared types for the OpenFeed market data engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option class (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionClass {
    Call,
    Put,
}

impl OptionClass {
    /// Exchange-style suffix ("CE"/"PE") used in contract symbols
    pub fn suffix(&self) -> &'static str {
        match self {
            OptionClass::Call => "CE",
            OptionClass::Put => "PE",
        }
    }
}

/// Data source mode for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Synthetic prices from the in-process simulator
    Demo,
    /// A real feed adapter supplying the same interface
    Live,
}

/// Connection state of the push transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Inputs for Black-Scholes pricing
#[derive(Debug, Clone, Copy)]
pub struct BsInputs {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry (in years)
    pub time: f64,
    /// Volatility (as decimal, e.g., 0.2 = 20%)
    pub vol: f64,
    /// Risk-free rate (as decimal)
    pub rate: f64,
    /// Option class
    pub class: OptionClass,
}

/// Option Greeks
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: ∂V/∂S (rate of change with spot)
    pub delta: f64,
    /// Gamma: ∂²V/∂S² (curvature of delta)
    pub gamma: f64,
    /// Theta: ∂V/∂t, reported per calendar day
    pub theta: f64,
    /// Vega: ∂V/∂σ, reported per 1% volatility move
    pub vega: f64,
    /// Rho: ∂V/∂r, reported per 1% rate move
    pub rho: f64,
}

impl Greeks {
    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
            && self.gamma.is_finite()
            && self.theta.is_finite()
            && self.vega.is_finite()
            && self.rho.is_finite()
    }
}

/// A single quote for an instrument, emitted once per tick.
/// Immutable once emitted; the next tick supersedes it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentQuote {
    pub symbol: String,
    pub price: f64,
    /// Absolute change from the previous quote
    pub change: f64,
    /// Change as a percentage of the previous quote
    pub change_percent: f64,
    pub volume: u64,
    pub bid: f64,
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
}

/// A single option contract within a chain.
/// `greeks` is `None` when the Greeks computation produced non-finite
/// values; the contract then carries best-effort premiums only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub underlying: String,
    pub strike: f64,
    pub expiry: DateTime<Utc>,
    pub class: OptionClass,
    pub bid: f64,
    pub ask: f64,
    pub last_price: f64,
    pub volume: u64,
    pub open_interest: u64,
    pub implied_volatility: f64,
    pub lot_size: u32,
    pub greeks: Option<Greeks>,
}

/// Call and put pair at a single strike
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikePair {
    pub strike: f64,
    pub call: OptionContract,
    pub put: OptionContract,
}

/// A full option chain for one underlying and one expiry cycle.
/// Replaced wholesale on regeneration so readers never observe
/// contracts priced from different spots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub spot_price: f64,
    pub expiry: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Strikes in ascending order
    pub strikes: Vec<StrikePair>,
}

impl OptionChain {
    /// The at-the-money strike: the one closest to the chain's spot price
    pub fn atm_strike(&self) -> Option<f64> {
        self.strikes
            .iter()
            .map(|p| p.strike)
            .min_by(|a, b| {
                let da = (a - self.spot_price).abs();
                let db = (b - self.spot_price).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Look up the contract pair at an exact strike
    pub fn at_strike(&self, strike: f64) -> Option<&StrikePair> {
        self.strikes.iter().find(|p| p.strike == strike)
    }
}
