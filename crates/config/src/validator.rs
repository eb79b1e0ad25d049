use crate::*;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Engine name is required")]
    MissingEngineName,

    #[error("No instruments defined")]
    NoInstruments,

    #[error("At least one instrument must be enabled")]
    NoEnabledInstruments,

    #[error("Instrument {symbol}: {message}")]
    InvalidInstrument { symbol: String, message: String },

    #[error("Duplicate instrument symbol '{0}'")]
    DuplicateSymbol(String),

    #[error("Invalid time format '{time}': expected HH:MM")]
    InvalidTimeFormat { time: String },

    #[error("Market hours: open {open} is not before close {close}")]
    InvalidSessionWindow { open: String, close: String },

    #[error("Simulation: {message}")]
    InvalidSimulation { message: String },

    #[error("Chain: {message}")]
    InvalidChain { message: String },

    #[error("Cache: {message}")]
    InvalidCache { message: String },

    #[error("Transport: {message}")]
    InvalidTransport { message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a loaded configuration. Errors block startup; warnings are
/// logged and the engine starts anyway.
pub fn validate_config(config: &EngineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.engine.name.trim().is_empty() {
        report.errors.push(ValidationError::MissingEngineName);
    }

    validate_instruments(config, &mut report);
    validate_market_hours(&config.market_hours, &mut report);
    validate_simulation(&config.simulation, &mut report);
    validate_chain(&config.chain, &mut report);
    validate_cache(&config.cache, &mut report);
    validate_transport(config, &mut report);

    report
}

fn validate_instruments(config: &EngineConfig, report: &mut ValidationReport) {
    if config.instruments.is_empty() {
        report.errors.push(ValidationError::NoInstruments);
        return;
    }

    if !config.instruments.iter().any(|i| i.enabled) {
        report.errors.push(ValidationError::NoEnabledInstruments);
    }

    let mut seen = std::collections::HashSet::new();
    for instrument in &config.instruments {
        if !seen.insert(instrument.symbol.clone()) {
            report
                .errors
                .push(ValidationError::DuplicateSymbol(instrument.symbol.clone()));
        }

        if instrument.base_price <= 0.0 {
            report.errors.push(ValidationError::InvalidInstrument {
                symbol: instrument.symbol.clone(),
                message: "base_price must be positive".to_string(),
            });
        }
        if instrument.volatility <= 0.0 {
            report.errors.push(ValidationError::InvalidInstrument {
                symbol: instrument.symbol.clone(),
                message: "volatility must be positive".to_string(),
            });
        }
        if instrument.volatility > 2.0 {
            report.warn(
                &format!("instruments.{}.volatility", instrument.symbol),
                "volatility above 200% produces implausible chains",
            );
        }
        if instrument.lot_size == 0 {
            report.errors.push(ValidationError::InvalidInstrument {
                symbol: instrument.symbol.clone(),
                message: "lot_size must be positive".to_string(),
            });
        }
        if instrument.tick_size <= 0.0 {
            report.errors.push(ValidationError::InvalidInstrument {
                symbol: instrument.symbol.clone(),
                message: "tick_size must be positive".to_string(),
            });
        }
    }
}

/// Parse "HH:MM" into minutes past midnight
pub fn parse_session_time(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

fn validate_market_hours(hours: &MarketHoursConfig, report: &mut ValidationReport) {
    let open = parse_session_time(&hours.open);
    let close = parse_session_time(&hours.close);

    if open.is_none() {
        report.errors.push(ValidationError::InvalidTimeFormat {
            time: hours.open.clone(),
        });
    }
    if close.is_none() {
        report.errors.push(ValidationError::InvalidTimeFormat {
            time: hours.close.clone(),
        });
    }

    if let (Some(o), Some(c)) = (open, close) {
        if o >= c {
            report.errors.push(ValidationError::InvalidSessionWindow {
                open: hours.open.clone(),
                close: hours.close.clone(),
            });
        }
    }
}

fn validate_simulation(sim: &SimulationConfig, report: &mut ValidationReport) {
    if sim.tick_interval_ms == 0 {
        report.errors.push(ValidationError::InvalidSimulation {
            message: "tick_interval_ms must be positive".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&sim.trend_persistence) {
        report.errors.push(ValidationError::InvalidSimulation {
            message: "trend_persistence must be between 0 and 1".to_string(),
        });
    }
    if sim.max_move_per_tick <= 0.0 || sim.max_move_per_tick > 0.5 {
        report.errors.push(ValidationError::InvalidSimulation {
            message: "max_move_per_tick must be in (0, 0.5]".to_string(),
        });
    }
    if sim.history_length == 0 {
        report.errors.push(ValidationError::InvalidSimulation {
            message: "history_length must be positive".to_string(),
        });
    }
    if sim.regime_check_ticks == 0 {
        report.errors.push(ValidationError::InvalidSimulation {
            message: "regime_check_ticks must be positive".to_string(),
        });
    }
}

fn validate_chain(chain: &ChainConfig, report: &mut ValidationReport) {
    if chain.strike_count == 0 {
        report.errors.push(ValidationError::InvalidChain {
            message: "strike_count must be positive".to_string(),
        });
    }
    if chain.strike_count % 2 != 0 {
        report.warnings.push(ValidationWarning {
            field: "chain.strike_count".to_string(),
            message: "odd strike_count is rounded down to an even ladder".to_string(),
        });
    }
    if chain.min_premium <= 0.0 {
        report.errors.push(ValidationError::InvalidChain {
            message: "min_premium must be positive".to_string(),
        });
    }
    if chain.risk_free_rate < 0.0 || chain.risk_free_rate > 0.25 {
        report.warnings.push(ValidationWarning {
            field: "chain.risk_free_rate".to_string(),
            message: "risk_free_rate outside [0, 25%] is unusual".to_string(),
        });
    }
}

fn validate_cache(cache: &CacheConfig, report: &mut ValidationReport) {
    if cache.max_entries == 0 {
        report.errors.push(ValidationError::InvalidCache {
            message: "max_entries must be positive".to_string(),
        });
    }
    if cache.quote_ttl_ms == 0 || cache.chain_ttl_ms == 0 {
        report.errors.push(ValidationError::InvalidCache {
            message: "TTLs must be positive".to_string(),
        });
    }
    if cache.chain_ttl_ms < cache.quote_ttl_ms {
        report.warnings.push(ValidationWarning {
            field: "cache.chain_ttl_ms".to_string(),
            message: "chain TTL shorter than quote TTL causes needless rebuilds".to_string(),
        });
    }
}

fn validate_transport(config: &EngineConfig, report: &mut ValidationReport) {
    let transport = &config.transport;

    if !transport.push_enabled && !transport.fallback_to_polling {
        report.errors.push(ValidationError::InvalidTransport {
            message: "push_enabled and fallback_to_polling cannot both be disabled".to_string(),
        });
    }
    if transport.poll_interval_ms <= config.simulation.tick_interval_ms {
        report.errors.push(ValidationError::InvalidTransport {
            message: "poll_interval_ms must be slower than the tick interval".to_string(),
        });
    }
    if transport.reconnect.backoff_factor < 1.0 {
        report.errors.push(ValidationError::InvalidTransport {
            message: "reconnect.backoff_factor must be >= 1".to_string(),
        });
    }
    if transport.reconnect.base_delay_ms == 0 {
        report.errors.push(ValidationError::InvalidTransport {
            message: "reconnect.base_delay_ms must be positive".to_string(),
        });
    }
    if transport.reconnect.max_delay_ms < transport.reconnect.base_delay_ms {
        report.errors.push(ValidationError::InvalidTransport {
            message: "reconnect.max_delay_ms must be >= base_delay_ms".to_string(),
        });
    }
    if transport.reconnect.max_attempts == 0 {
        report.warnings.push(ValidationWarning {
            field: "transport.reconnect.max_attempts".to_string(),
            message: "zero attempts settles in error on the first failure".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::generate_default_config;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn test_rejects_empty_universe() {
        let mut config = generate_default_config();
        config.instruments.clear();
        let report = validate_config(&config);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_rejects_duplicate_symbols() {
        let mut config = generate_default_config();
        let dup = config.instruments[0].clone();
        config.instruments.push(dup);
        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateSymbol(_))));
    }

    #[test]
    fn test_rejects_negative_base_price() {
        let mut config = generate_default_config();
        config.instruments[0].base_price = -1.0;
        assert!(!validate_config(&config).is_valid());
    }

    #[test]
    fn test_rejects_poll_faster_than_tick() {
        let mut config = generate_default_config();
        config.transport.poll_interval_ms = config.simulation.tick_interval_ms;
        assert!(!validate_config(&config).is_valid());
    }

    #[test]
    fn test_rejects_both_delivery_modes_off() {
        let mut config = generate_default_config();
        config.transport.push_enabled = false;
        config.transport.fallback_to_polling = false;
        assert!(!validate_config(&config).is_valid());
    }

    #[test]
    fn test_parse_session_time() {
        assert_eq!(parse_session_time("09:15"), Some(9 * 60 + 15));
        assert_eq!(parse_session_time("15:30"), Some(15 * 60 + 30));
        assert_eq!(parse_session_time("24:00"), None);
        assert_eq!(parse_session_time("0915"), None);
    }

    #[test]
    fn test_invalid_session_window() {
        let mut config = generate_default_config();
        config.market_hours.open = "16:00".to_string();
        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidSessionWindow { .. })));
    }
}
