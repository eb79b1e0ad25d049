//! Data feed seam between the orchestrator and its price source.
//!
//! The demo engine is backed by [`SimulatedFeed`]; a live adapter
//! implements the same trait against a real upstream and is swapped in
//! by `switch_mode` without disturbing subscriptions.

use chrono::{DateTime, Utc};
use common::{InstrumentQuote, Mode, OptionChain};
use config::{ChainConfig, Instrument, MarketHoursConfig, SimulationConfig};
use parking_lot::Mutex;
use pricing::ChainBuilder;
use simulation::{PriceProcess, TrendLabel};
use std::collections::HashMap;

/// Upstream data source for quotes and option chains.
///
/// Unknown symbols surface as `None` everywhere; the orchestrator
/// never turns them into subscriber-visible failures.
#[async_trait::async_trait]
pub trait DataFeed: Send + Sync {
    fn mode(&self) -> Mode;

    /// Symbols this feed can serve
    fn symbols(&self) -> Vec<String>;

    /// Advance the feed one step, returning the new quotes.
    /// Empty outside market hours or for feeds that push on their own
    /// schedule.
    async fn tick(&self, now: DateTime<Utc>) -> Vec<InstrumentQuote>;

    /// Most recent quote for a symbol, if any has been produced
    async fn latest_quote(&self, symbol: &str) -> Option<InstrumentQuote>;

    async fn current_price(&self, symbol: &str) -> Option<f64>;

    /// Build a fresh option chain snapshot for an underlying
    async fn option_chain(&self, underlying: &str, now: DateTime<Utc>) -> Option<OptionChain>;
}

/// Demo-mode feed: an in-process price simulator plus chain synthesis
pub struct SimulatedFeed {
    process: Mutex<PriceProcess>,
    builder: ChainBuilder,
    instruments: HashMap<String, Instrument>,
    mode: Mode,
}

impl SimulatedFeed {
    pub fn new(
        instruments: Vec<Instrument>,
        simulation: SimulationConfig,
        market_hours: &MarketHoursConfig,
        chain: ChainConfig,
        mode: Mode,
    ) -> Self {
        let by_symbol = instruments
            .iter()
            .filter(|i| i.enabled)
            .map(|i| (i.symbol.clone(), i.clone()))
            .collect();

        Self {
            process: Mutex::new(PriceProcess::new(instruments, simulation, market_hours)),
            builder: ChainBuilder::new(chain),
            instruments: by_symbol,
            mode,
        }
    }

    /// Force a trend regime on the underlying simulator
    pub fn set_trend(&self, symbol: &str, label: TrendLabel, strength: f64) {
        self.process.lock().set_trend(symbol, label, strength);
    }

    /// Recent quote history for a symbol, oldest first
    pub fn history(&self, symbol: &str, n: usize) -> Vec<InstrumentQuote> {
        self.process.lock().history(symbol, n)
    }
}

#[async_trait::async_trait]
impl DataFeed for SimulatedFeed {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn symbols(&self) -> Vec<String> {
        self.instruments.keys().cloned().collect()
    }

    async fn tick(&self, now: DateTime<Utc>) -> Vec<InstrumentQuote> {
        self.process.lock().tick(now)
    }

    async fn latest_quote(&self, symbol: &str) -> Option<InstrumentQuote> {
        self.process.lock().history(symbol, 1).pop()
    }

    async fn current_price(&self, symbol: &str) -> Option<f64> {
        self.process.lock().current_price(symbol)
    }

    async fn option_chain(&self, underlying: &str, now: DateTime<Utc>) -> Option<OptionChain> {
        let instrument = self.instruments.get(underlying)?;
        let spot = self.process.lock().current_price(underlying)?;
        Some(self.builder.build(instrument, spot, now))
    }
}
