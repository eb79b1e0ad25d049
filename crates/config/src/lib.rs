use common::Mode;
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use validator::*;

/// Root configuration for the OpenFeed engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub engine: EngineMeta,
    pub instruments: Vec<Instrument>,
    #[serde(rename = "market_hours")]
    #[serde(default = "default_market_hours")]
    pub market_hours: MarketHoursConfig,
    #[serde(default = "default_simulation")]
    pub simulation: SimulationConfig,
    #[serde(default = "default_chain")]
    pub chain: ChainConfig,
    #[serde(default = "default_cache")]
    pub cache: CacheConfig,
    #[serde(default = "default_transport")]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineMeta {
    pub name: String,
    pub version: String,
    pub mode: Mode,
}

/// A single instrument in the static universe
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    /// Anchor price the simulated process mean-reverts toward
    #[serde(rename = "base_price")]
    pub base_price: f64,
    /// Annualized volatility as a decimal (e.g. 0.18 = 18%)
    pub volatility: f64,
    #[serde(rename = "lot_size")]
    pub lot_size: u32,
    #[serde(rename = "tick_size")]
    pub tick_size: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Trading session window; the tick driver is a no-op outside it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketHoursConfig {
    /// Session open, "HH:MM" local to the configured offset
    pub open: String,
    /// Session close, "HH:MM"
    pub close: String,
    /// Fixed offset from UTC in minutes (e.g. 330 for IST)
    #[serde(rename = "timezone_offset_minutes")]
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset_minutes: i32,
    #[serde(rename = "weekends_closed")]
    #[serde(default = "default_enabled")]
    pub weekends_closed: bool,
}

/// Price process tuning. These are simulation parameters, not domain
/// constants; see the validator for sane ranges.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(rename = "tick_interval_ms")]
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Bound on the uniform per-tick shock, as a fraction of price
    #[serde(rename = "max_move_per_tick")]
    #[serde(default = "default_max_move_per_tick")]
    pub max_move_per_tick: f64,
    /// Probability the current trend survives a regime check
    #[serde(rename = "trend_persistence")]
    #[serde(default = "default_trend_persistence")]
    pub trend_persistence: f64,
    /// Quotes retained per instrument
    #[serde(rename = "history_length")]
    #[serde(default = "default_history_length")]
    pub history_length: usize,
    /// Ticks between trend regime checks
    #[serde(rename = "regime_check_ticks")]
    #[serde(default = "default_regime_check_ticks")]
    pub regime_check_ticks: u64,
}

/// Option chain synthesis parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Strikes away from ATM, split evenly above and below
    #[serde(rename = "strike_count")]
    #[serde(default = "default_strike_count")]
    pub strike_count: u32,
    #[serde(rename = "risk_free_rate")]
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Premium floor, one exchange tick
    #[serde(rename = "min_premium")]
    #[serde(default = "default_min_premium")]
    pub min_premium: f64,
}

/// Freshness cache sizing and TTLs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(rename = "max_entries")]
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(rename = "quote_ttl_ms")]
    #[serde(default = "default_quote_ttl_ms")]
    pub quote_ttl_ms: u64,
    #[serde(rename = "chain_ttl_ms")]
    #[serde(default = "default_chain_ttl_ms")]
    pub chain_ttl_ms: u64,
    #[serde(rename = "sweep_interval_ms")]
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

/// Push transport and polling fallback
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(rename = "push_enabled")]
    #[serde(default = "default_enabled")]
    pub push_enabled: bool,
    #[serde(rename = "fallback_to_polling")]
    #[serde(default = "default_enabled")]
    pub fallback_to_polling: bool,
    /// Polling cadence; must be slower than the tick interval
    #[serde(rename = "poll_interval_ms")]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_reconnect")]
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectConfig {
    #[serde(rename = "base_delay_ms")]
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(rename = "backoff_factor")]
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(rename = "max_delay_ms")]
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(rename = "max_attempts")]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl EngineConfig {
    /// Look up an instrument by symbol (enabled or not)
    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    /// Symbols of all enabled instruments
    pub fn enabled_symbols(&self) -> Vec<String> {
        self.instruments
            .iter()
            .filter(|i| i.enabled)
            .map(|i| i.symbol.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_lookup() {
        let config = generate_default_config();
        assert!(config.instrument("NIFTY").is_some());
        assert!(config.instrument("UNKNOWN").is_none());
    }

    #[test]
    fn test_enabled_symbols_filters_disabled() {
        let mut config = generate_default_config();
        config.instruments[0].enabled = false;
        let symbols = config.enabled_symbols();
        assert!(!symbols.contains(&config.instruments[0].symbol));
    }
}
