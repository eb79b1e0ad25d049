pub fn default_enabled() -> bool {
    true
}

pub fn default_timezone_offset() -> i32 {
    330 // IST
}

pub fn default_market_hours() -> super::MarketHoursConfig {
    super::MarketHoursConfig {
        open: "09:15".to_string(),
        close: "15:30".to_string(),
        timezone_offset_minutes: default_timezone_offset(),
        weekends_closed: true,
    }
}

pub fn default_tick_interval_ms() -> u64 {
    1000
}

pub fn default_max_move_per_tick() -> f64 {
    0.002
}

pub fn default_trend_persistence() -> f64 {
    0.8
}

pub fn default_history_length() -> usize {
    300
}

pub fn default_regime_check_ticks() -> u64 {
    100
}

pub fn default_simulation() -> super::SimulationConfig {
    super::SimulationConfig {
        tick_interval_ms: default_tick_interval_ms(),
        max_move_per_tick: default_max_move_per_tick(),
        trend_persistence: default_trend_persistence(),
        history_length: default_history_length(),
        regime_check_ticks: default_regime_check_ticks(),
    }
}

pub fn default_strike_count() -> u32 {
    20
}

pub fn default_risk_free_rate() -> f64 {
    0.065
}

pub fn default_min_premium() -> f64 {
    0.05
}

pub fn default_chain() -> super::ChainConfig {
    super::ChainConfig {
        strike_count: default_strike_count(),
        risk_free_rate: default_risk_free_rate(),
        min_premium: default_min_premium(),
    }
}

pub fn default_max_entries() -> usize {
    1000
}

pub fn default_quote_ttl_ms() -> u64 {
    5_000
}

pub fn default_chain_ttl_ms() -> u64 {
    30_000
}

pub fn default_sweep_interval_ms() -> u64 {
    30_000
}

pub fn default_cache() -> super::CacheConfig {
    super::CacheConfig {
        max_entries: default_max_entries(),
        quote_ttl_ms: default_quote_ttl_ms(),
        chain_ttl_ms: default_chain_ttl_ms(),
        sweep_interval_ms: default_sweep_interval_ms(),
    }
}

pub fn default_poll_interval_ms() -> u64 {
    5_000
}

pub fn default_base_delay_ms() -> u64 {
    1_000
}

pub fn default_backoff_factor() -> f64 {
    2.0
}

pub fn default_max_delay_ms() -> u64 {
    30_000
}

pub fn default_max_attempts() -> u32 {
    10
}

pub fn default_reconnect() -> super::ReconnectConfig {
    super::ReconnectConfig {
        base_delay_ms: default_base_delay_ms(),
        backoff_factor: default_backoff_factor(),
        max_delay_ms: default_max_delay_ms(),
        max_attempts: default_max_attempts(),
    }
}

pub fn default_transport() -> super::TransportConfig {
    super::TransportConfig {
        push_enabled: true,
        fallback_to_polling: true,
        poll_interval_ms: default_poll_interval_ms(),
        reconnect: default_reconnect(),
    }
}
