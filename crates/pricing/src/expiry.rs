//! Monthly expiry calculation.
//!
//! Index options expire on the last Thursday of the month at market
//! close. If that date has already passed, the cycle rolls to the
//! next month.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

/// Expiry time of day, UTC (15:30 IST)
const EXPIRY_HOUR: u32 = 10;
const EXPIRY_MINUTE: u32 = 0;

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    match (first, first_next) {
        (Some(a), Some(b)) => (b - a).num_days() as u32,
        _ => 30,
    }
}

/// Last Thursday of the given month
pub fn last_thursday(year: i32, month: u32) -> Option<NaiveDate> {
    let mut day = days_in_month(year, month);
    while day > 0 {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        if date.weekday() == Weekday::Thu {
            return Some(date);
        }
        day -= 1;
    }
    None
}

/// The nearest monthly expiry at or after `now`.
///
/// The last Thursday of the current month, rolling to the next month
/// when that instant has already passed.
pub fn next_monthly_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    let expiry_time = NaiveTime::from_hms_opt(EXPIRY_HOUR, EXPIRY_MINUTE, 0)
        .unwrap_or(NaiveTime::MIN);

    let mut year = now.year();
    let mut month = now.month();

    // At most two iterations: current month, then next
    loop {
        if let Some(date) = last_thursday(year, month) {
            if let Some(expiry) = date.and_time(expiry_time).and_local_timezone(Utc).single() {
                if expiry >= now {
                    return expiry;
                }
            }
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
}

/// Time from `now` to `expiry` in years, floored at one day.
///
/// The floor keeps the pricing model away from its t -> 0 singularity
/// on expiry day.
pub fn time_to_expiry_years(now: DateTime<Utc>, expiry: DateTime<Utc>) -> f64 {
    let min = Duration::days(1);
    let remaining = (expiry - now).max(min);
    remaining.num_seconds() as f64 / (365.0 * 24.0 * 3600.0)
}
