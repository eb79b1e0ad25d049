//! Trading session gating.
//!
//! The tick driver only advances prices inside the configured session
//! window. The window is expressed in a fixed offset from UTC so the
//! engine stays timezone-database-free.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use config::MarketHoursConfig;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct MarketHours {
    open_minutes: u32,
    close_minutes: u32,
    offset_minutes: i32,
    weekends_closed: bool,
}

impl MarketHours {
    pub fn from_config(config: &MarketHoursConfig) -> Self {
        let open_minutes = config::parse_session_time(&config.open).unwrap_or_else(|| {
            warn!(open = %config.open, "Unparseable session open, using 09:15");
            9 * 60 + 15
        });
        let close_minutes = config::parse_session_time(&config.close).unwrap_or_else(|| {
            warn!(close = %config.close, "Unparseable session close, using 15:30");
            15 * 60 + 30
        });

        Self {
            open_minutes,
            close_minutes,
            offset_minutes: config.timezone_offset_minutes,
            weekends_closed: config.weekends_closed,
        }
    }

    /// Whether the market is open at the given instant
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        // Shift into the session's local wall clock
        let local = now + Duration::minutes(self.offset_minutes as i64);

        if self.weekends_closed
            && matches!(local.weekday(), Weekday::Sat | Weekday::Sun)
        {
            return false;
        }

        let minutes = local.hour() * 60 + local.minute();
        minutes >= self.open_minutes && minutes < self.close_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use config::defaults::default_market_hours;

    fn hours() -> MarketHours {
        MarketHours::from_config(&default_market_hours())
    }

    #[test]
    fn test_open_mid_session() {
        // Tuesday 2026-08-04 06:00 UTC = 11:30 IST
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 6, 0, 0).unwrap();
        assert!(hours().is_open(now));
    }

    #[test]
    fn test_closed_before_open() {
        // Tuesday 03:00 UTC = 08:30 IST
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 3, 0, 0).unwrap();
        assert!(!hours().is_open(now));
    }

    #[test]
    fn test_closed_at_close_boundary() {
        // 10:00 UTC = 15:30 IST exactly; the close minute is exclusive
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 10, 0, 0).unwrap();
        assert!(!hours().is_open(now));
    }

    #[test]
    fn test_closed_on_weekend() {
        // Saturday 2026-08-08 06:00 UTC
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 6, 0, 0).unwrap();
        assert!(!hours().is_open(now));
    }

    #[test]
    fn test_weekend_open_when_not_gated() {
        let mut config = default_market_hours();
        config.weekends_closed = false;
        let hours = MarketHours::from_config(&config);
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 6, 0, 0).unwrap();
        assert!(hours.is_open(now));
    }
}
