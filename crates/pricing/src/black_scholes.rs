//! Black-Scholes pricing and Greeks
//!
//! Closed-form European option pricing with an Abramowitz-Stegun
//! approximation of the standard normal CDF (max absolute error
//! about 1.5e-7).

use common::{BsInputs, Greeks, OptionClass};
use std::f64::consts::PI;

/// Minimum time to expiry accepted by the model (one second, in years)
pub const MIN_TIME: f64 = 1.0 / (365.25 * 24.0 * 3600.0);
pub const MIN_VOL: f64 = 0.01;
pub const MAX_VOL: f64 = 5.0;
pub const MIN_PRICE: f64 = 1e-6;

/// Clamp inputs into the model's valid domain
pub fn clamp_inputs(input: &mut BsInputs) {
    input.spot = input.spot.max(MIN_PRICE);
    input.strike = input.strike.max(MIN_PRICE);
    input.time = input.time.max(MIN_TIME);
    input.vol = input.vol.clamp(MIN_VOL, MAX_VOL);
}

pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Standard normal CDF via the Abramowitz-Stegun polynomial
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.2316419 * x.abs());
    let poly = k
        * (0.319381530
            + k * (-0.356563782 + k * (1.781477937 + k * (-1.821255978 + k * 1.330274429))));

    let approx = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 {
        approx
    } else {
        1.0 - approx
    }
}

pub fn d1_d2(input: &BsInputs) -> (f64, f64) {
    let s = input.spot;
    let k = input.strike;
    let t = input.time.max(MIN_TIME);
    let v = input.vol.max(MIN_VOL);
    let r = input.rate;

    let d1 = ((s / k).ln() + (r + 0.5 * v * v) * t) / (v * t.sqrt());
    let d2 = d1 - v * t.sqrt();

    (d1, d2)
}

pub fn black_scholes_price(mut input: BsInputs) -> f64 {
    clamp_inputs(&mut input);

    let (d1, d2) = d1_d2(&input);
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let r = input.rate;

    let price = match input.class {
        OptionClass::Call => s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2),
        OptionClass::Put => k * (-r * t).exp() * norm_cdf(-d2) - s * norm_cdf(-d1),
    };

    price.max(0.0)
}

pub fn intrinsic_value(spot: f64, strike: f64, class: OptionClass) -> f64 {
    match class {
        OptionClass::Call => (spot - strike).max(0.0),
        OptionClass::Put => (strike - spot).max(0.0),
    }
}

/// Compute the full set of Greeks.
///
/// Theta is reported per calendar day (annual theta / 365); vega and
/// rho are reported per 1% move in volatility and rate. Out-of-domain
/// inputs surface as non-finite components; callers check
/// [`Greeks::is_finite`] and degrade that contract alone.
pub fn compute_greeks(mut input: BsInputs) -> Greeks {
    clamp_inputs(&mut input);

    let (d1, d2) = d1_d2(&input);
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let v = input.vol;
    let r = input.rate;

    let pdf = norm_pdf(d1);
    let sqrt_t = t.sqrt();

    let delta = match input.class {
        OptionClass::Call => norm_cdf(d1),
        OptionClass::Put => norm_cdf(d1) - 1.0,
    };

    let gamma = pdf / (s * v * sqrt_t);

    let annual_theta = match input.class {
        OptionClass::Call => -(s * pdf * v) / (2.0 * sqrt_t) - r * k * (-r * t).exp() * norm_cdf(d2),
        OptionClass::Put => -(s * pdf * v) / (2.0 * sqrt_t) + r * k * (-r * t).exp() * norm_cdf(-d2),
    };

    let vega = s * pdf * sqrt_t;

    let rho = match input.class {
        OptionClass::Call => k * t * (-r * t).exp() * norm_cdf(d2),
        OptionClass::Put => -k * t * (-r * t).exp() * norm_cdf(-d2),
    };

    Greeks {
        delta,
        gamma,
        theta: annual_theta / 365.0,
        vega: vega / 100.0,
        rho: rho / 100.0,
    }
}
