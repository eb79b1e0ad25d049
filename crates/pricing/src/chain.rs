//! Option chain synthesis.
//!
//! Builds a full call/put ladder around the current spot price using
//! exchange-style strike spacing, Black-Scholes Greeks, and synthetic
//! volume/open-interest figures.

use crate::black_scholes::{compute_greeks, intrinsic_value};
use crate::expiry::{next_monthly_expiry, time_to_expiry_years};
use chrono::{DateTime, Utc};
use common::{BsInputs, OptionChain, OptionClass, OptionContract, StrikePair};
use config::{ChainConfig, Instrument};
use rand::Rng;
use tracing::debug;

/// Strike spacing bracket for a given spot price.
///
/// Mirrors real exchange conventions so the ladder stays a manageable,
/// realistic size at any price level.
pub fn strike_interval(spot: f64) -> f64 {
    if spot < 500.0 {
        10.0
    } else if spot < 1000.0 {
        25.0
    } else if spot < 2000.0 {
        50.0
    } else if spot < 5000.0 {
        100.0
    } else if spot < 10000.0 {
        250.0
    } else {
        500.0
    }
}

/// Builds immutable option chain snapshots.
///
/// Stateless apart from configuration. Spot, volatility, and the
/// generation instant are passed in so a single chain is internally
/// consistent: every contract in it is priced from the same triple.
pub struct ChainBuilder {
    config: ChainConfig,
}

impl ChainBuilder {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    /// Build a chain for `instrument` at the given spot.
    ///
    /// Contracts whose Greeks come out non-finite keep their premiums
    /// and carry `greeks: None`; the chain itself never fails for a
    /// single bad strike.
    pub fn build(
        &self,
        instrument: &Instrument,
        spot: f64,
        now: DateTime<Utc>,
    ) -> OptionChain {
        let expiry = next_monthly_expiry(now);
        let time = time_to_expiry_years(now, expiry);
        let interval = strike_interval(spot);

        let atm = (spot / interval).round() * interval;
        let half = (self.config.strike_count / 2) as i64;

        let mut rng = rand::thread_rng();
        let mut strikes = Vec::with_capacity((2 * half + 1) as usize);

        for step in -half..=half {
            let strike = atm + step as f64 * interval;
            if strike <= 0.0 {
                continue;
            }

            let call = self.build_contract(
                instrument,
                spot,
                strike,
                atm,
                interval,
                expiry,
                time,
                OptionClass::Call,
                &mut rng,
            );
            let put = self.build_contract(
                instrument,
                spot,
                strike,
                atm,
                interval,
                expiry,
                time,
                OptionClass::Put,
                &mut rng,
            );

            strikes.push(StrikePair { strike, call, put });
        }

        debug!(
            symbol = %instrument.symbol,
            spot,
            strikes = strikes.len(),
            expiry = %expiry,
            "Built option chain"
        );

        OptionChain {
            underlying: instrument.symbol.clone(),
            spot_price: spot,
            expiry,
            last_updated: now,
            strikes,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_contract(
        &self,
        instrument: &Instrument,
        spot: f64,
        strike: f64,
        atm: f64,
        interval: f64,
        expiry: DateTime<Utc>,
        time: f64,
        class: OptionClass,
        rng: &mut impl Rng,
    ) -> OptionContract {
        let vol = instrument.volatility;
        let intrinsic = intrinsic_value(spot, strike, class);

        // Time value decays with distance from the money, weighted by
        // how much the process can plausibly move before expiry.
        let moneyness = (spot - strike).abs() / spot;
        let decay = (-(moneyness * moneyness) / (2.0 * vol * vol * time)).exp();
        let time_value = time.sqrt() * vol * spot * 0.4 * decay;

        let last_price = round_to_tick(
            (intrinsic + time_value).max(self.config.min_premium),
            instrument.tick_size,
        )
        .max(self.config.min_premium);

        let half_spread = (last_price * 0.005).max(instrument.tick_size);
        let bid = round_to_tick(
            (last_price - half_spread).max(self.config.min_premium),
            instrument.tick_size,
        );
        let ask = round_to_tick(last_price + half_spread, instrument.tick_size);

        let (volume, open_interest) = synth_activity(strike, atm, interval, rng);

        let implied_volatility = vol + rng.gen_range(-0.02..0.02);

        let greeks = compute_greeks(BsInputs {
            spot,
            strike,
            time,
            vol,
            rate: self.config.risk_free_rate,
            class,
        });
        let greeks = greeks.is_finite().then_some(greeks);

        OptionContract {
            symbol: contract_symbol(&instrument.symbol, expiry, strike, class),
            underlying: instrument.symbol.clone(),
            strike,
            expiry,
            class,
            bid,
            ask,
            last_price,
            volume,
            open_interest,
            implied_volatility,
            lot_size: instrument.lot_size,
            greeks,
        }
    }
}

/// Exchange-style contract symbol, e.g. `NIFTY26AUG19500CE`
fn contract_symbol(
    underlying: &str,
    expiry: DateTime<Utc>,
    strike: f64,
    class: OptionClass,
) -> String {
    format!(
        "{}{}{}{}",
        underlying,
        expiry.format("%y%b").to_string().to_uppercase(),
        strike as i64,
        class.suffix()
    )
}

fn round_to_tick(value: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return value;
    }
    (value / tick).round() * tick
}

/// Synthetic volume and open interest: largest at the money, boosted
/// at round-numbered strikes, with multiplicative jitter.
fn synth_activity(strike: f64, atm: f64, interval: f64, rng: &mut impl Rng) -> (u64, u64) {
    let steps = ((strike - atm) / interval).abs();
    let atm_factor = 1.0 / (1.0 + 0.4 * steps);
    let round_factor = if (strike % 1000.0).abs() < f64::EPSILON {
        1.5
    } else {
        1.0
    };

    let volume_jitter: f64 = rng.gen_range(0.6..1.4);
    let oi_jitter: f64 = rng.gen_range(0.6..1.4);

    let volume = (80_000.0 * atm_factor * round_factor * volume_jitter) as u64;
    let open_interest = (400_000.0 * atm_factor * round_factor * oi_jitter) as u64;

    (volume, open_interest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use config::defaults::default_chain;

    fn nifty() -> Instrument {
        Instrument {
            symbol: "NIFTY".to_string(),
            name: "Nifty 50 Index".to_string(),
            base_price: 19500.0,
            volatility: 0.14,
            lot_size: 50,
            tick_size: 0.05,
            enabled: true,
        }
    }

    fn builder() -> ChainBuilder {
        ChainBuilder::new(default_chain())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_strike_interval_brackets() {
        assert_relative_eq!(strike_interval(400.0), 10.0);
        assert_relative_eq!(strike_interval(800.0), 25.0);
        assert_relative_eq!(strike_interval(1500.0), 50.0);
        assert_relative_eq!(strike_interval(4000.0), 100.0);
        assert_relative_eq!(strike_interval(9000.0), 250.0);
        assert_relative_eq!(strike_interval(19500.0), 500.0);
    }

    #[test]
    fn test_strike_ladder_symmetry() {
        // 20 strikes around ATM: 10 above, 10 below, plus the ATM itself
        let chain = builder().build(&nifty(), 19500.0, now());
        assert_eq!(chain.strikes.len(), 21);

        let interval = strike_interval(19500.0);
        let atm = (19500.0_f64 / interval).round() * interval;
        assert_eq!(chain.atm_strike(), Some(atm));

        let above = chain.strikes.iter().filter(|p| p.strike > atm).count();
        let below = chain.strikes.iter().filter(|p| p.strike < atm).count();
        assert_eq!(above, 10);
        assert_eq!(below, 10);
    }

    #[test]
    fn test_atm_centering_at_interval_100() {
        // Spot in the 100-interval bracket rounds to the nearest 100
        let chain = builder().build(&nifty(), 4532.0, now());
        assert_eq!(chain.atm_strike(), Some(4500.0));
    }

    #[test]
    fn test_premium_floor() {
        let chain = builder().build(&nifty(), 19500.0, now());
        for pair in &chain.strikes {
            assert!(pair.call.last_price >= 0.05);
            assert!(pair.put.last_price >= 0.05);
            assert!(pair.call.bid >= 0.05);
            assert!(pair.put.bid >= 0.05);
        }
    }

    #[test]
    fn test_bid_ask_bracket_last() {
        let chain = builder().build(&nifty(), 19500.0, now());
        for pair in &chain.strikes {
            for contract in [&pair.call, &pair.put] {
                assert!(contract.bid <= contract.last_price);
                assert!(contract.ask >= contract.last_price);
            }
        }
    }

    #[test]
    fn test_chain_consistency() {
        // Every contract is priced from the chain's own spot and expiry
        let chain = builder().build(&nifty(), 19500.0, now());
        for pair in &chain.strikes {
            assert_eq!(pair.call.expiry, chain.expiry);
            assert_eq!(pair.put.expiry, chain.expiry);

            let g = pair.call.greeks.as_ref().unwrap();
            assert!(g.is_finite());
            // ITM calls carry more delta than OTM calls
            if pair.strike < chain.spot_price - 500.0 {
                assert!(g.delta > 0.5);
            }
        }
    }

    #[test]
    fn test_deep_itm_call_premium_above_intrinsic() {
        let chain = builder().build(&nifty(), 19500.0, now());
        let deep = chain.strikes.first().unwrap();
        let intrinsic = 19500.0 - deep.strike;
        assert!(deep.call.last_price >= intrinsic - 0.05);
    }

    #[test]
    fn test_volume_peaks_at_the_money() {
        // Jitter is bounded, so across the whole ladder the ATM strike
        // still dominates the deep wings
        let chain = builder().build(&nifty(), 19500.0, now());
        let atm = chain.atm_strike().unwrap();
        let atm_pair = chain.at_strike(atm).unwrap();
        let wing = chain.strikes.first().unwrap();
        assert!(atm_pair.call.volume > wing.call.volume);
    }

    #[test]
    fn test_contract_symbols() {
        let chain = builder().build(&nifty(), 19500.0, now());
        let atm = chain.atm_strike().unwrap();
        let pair = chain.at_strike(atm).unwrap();
        assert!(pair.call.symbol.starts_with("NIFTY"));
        assert!(pair.call.symbol.ends_with("CE"));
        assert!(pair.put.symbol.ends_with("PE"));
    }

    #[test]
    fn test_no_nonpositive_strikes() {
        // A tiny spot with a wide ladder must not produce zero/negative strikes
        let mut penny = nifty();
        penny.symbol = "PENNY".to_string();
        penny.base_price = 40.0;
        let chain = builder().build(&penny, 40.0, now());
        assert!(chain.strikes.iter().all(|p| p.strike > 0.0));
    }
}
