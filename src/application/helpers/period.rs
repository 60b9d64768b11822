use chrono::{DateTime, Utc};

/// Usage period key for `now`, e.g. `2026-10`. Periods are UTC calendar months.
pub fn period_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

pub fn current_period() -> String {
    period_key(Utc::now())
}
