//! Mean-reverting price processes.
//!
//! One process per instrument, advanced on a fixed tick. Each step
//! combines a directional trend bias, a pull back toward the
//! instrument's base price, and a bounded uniform shock, scaled by the
//! instrument's volatility. Trends resample occasionally to produce
//! regime changes without external input.

use crate::market_hours::MarketHours;
use chrono::{DateTime, Utc};
use common::InstrumentQuote;
use config::{Instrument, MarketHoursConfig, SimulationConfig};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Trend regime label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Sideways,
}

impl TrendLabel {
    fn direction(self) -> f64 {
        match self {
            TrendLabel::Bullish => 1.0,
            TrendLabel::Bearish => -1.0,
            TrendLabel::Sideways => 0.0,
        }
    }

    fn sample(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..3) {
            0 => TrendLabel::Bullish,
            1 => TrendLabel::Bearish,
            _ => TrendLabel::Sideways,
        }
    }
}

/// Per-instrument process state
struct ProcessState {
    instrument: Instrument,
    price: f64,
    history: VecDeque<InstrumentQuote>,
    trend: TrendLabel,
    /// Trend strength in [0, 1]
    strength: f64,
    trend_age: u64,
}

/// Simulated price generator for the whole instrument universe.
///
/// Not internally synchronized; the orchestrator owns one instance and
/// drives `tick` from a single task.
pub struct PriceProcess {
    states: HashMap<String, ProcessState>,
    config: SimulationConfig,
    hours: MarketHours,
}

impl PriceProcess {
    pub fn new(
        instruments: Vec<Instrument>,
        config: SimulationConfig,
        market_hours: &MarketHoursConfig,
    ) -> Self {
        let mut rng = rand::thread_rng();
        let states = instruments
            .into_iter()
            .filter(|i| i.enabled)
            .map(|instrument| {
                let state = ProcessState {
                    price: instrument.base_price,
                    history: VecDeque::with_capacity(config.history_length),
                    trend: TrendLabel::sample(&mut rng),
                    strength: rng.gen_range(0.0..1.0),
                    trend_age: 0,
                    instrument,
                };
                (state.instrument.symbol.clone(), state)
            })
            .collect();

        Self {
            states,
            config,
            hours: MarketHours::from_config(market_hours),
        }
    }

    /// Advance every instrument one step and return the new quotes.
    ///
    /// No-op (returns empty) outside market hours.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<InstrumentQuote> {
        if !self.hours.is_open(now) {
            return Vec::new();
        }

        let mut rng = rand::thread_rng();
        let mut quotes = Vec::with_capacity(self.states.len());

        for state in self.states.values_mut() {
            let quote = Self::step(state, &self.config, now, &mut rng);
            quotes.push(quote);
        }

        quotes
    }

    fn step(
        state: &mut ProcessState,
        config: &SimulationConfig,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> InstrumentQuote {
        state.trend_age += 1;
        if state.trend_age >= config.regime_check_ticks {
            state.trend_age = 0;
            if rng.gen::<f64>() > config.trend_persistence {
                state.trend = TrendLabel::sample(rng);
                state.strength = rng.gen_range(0.0..1.0);
                debug!(
                    symbol = %state.instrument.symbol,
                    trend = ?state.trend,
                    strength = state.strength,
                    "Trend regime resampled"
                );
            }
        }

        let max_move = config.max_move_per_tick;
        let bias = state.trend.direction() * state.strength * max_move;
        let reversion =
            -((state.price - state.instrument.base_price) / state.instrument.base_price) * max_move;
        let shock = rng.gen_range(-max_move..max_move);

        let move_frac = (bias + reversion + shock) * state.instrument.volatility;
        let floor = state.instrument.base_price * 0.5;
        let new_price = (state.price * (1.0 + move_frac)).max(floor);

        let prev = state.price;
        state.price = new_price;

        let change = new_price - prev;
        let change_percent = if prev > 0.0 { change / prev * 100.0 } else { 0.0 };
        let half_spread = (new_price * 0.0002).max(state.instrument.tick_size);

        let quote = InstrumentQuote {
            symbol: state.instrument.symbol.clone(),
            price: new_price,
            change,
            change_percent,
            volume: rng.gen_range(10_000..500_000),
            bid: new_price - half_spread,
            ask: new_price + half_spread,
            timestamp: now,
        };

        if state.history.len() >= config.history_length {
            state.history.pop_front();
        }
        state.history.push_back(quote.clone());

        quote
    }

    /// Current simulated price, if the symbol is part of the universe
    pub fn current_price(&self, symbol: &str) -> Option<f64> {
        self.states.get(symbol).map(|s| s.price)
    }

    /// The most recent `n` quotes for a symbol, oldest first
    pub fn history(&self, symbol: &str, n: usize) -> Vec<InstrumentQuote> {
        self.states
            .get(symbol)
            .map(|s| {
                let skip = s.history.len().saturating_sub(n);
                s.history.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Force a trend regime, for operators and scenario tests
    pub fn set_trend(&mut self, symbol: &str, label: TrendLabel, strength: f64) {
        if let Some(state) = self.states.get_mut(symbol) {
            state.trend = label;
            state.strength = strength.clamp(0.0, 1.0);
            state.trend_age = 0;
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.states.keys().cloned().collect()
    }
}
