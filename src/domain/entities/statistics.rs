use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate stored as a single JSON blob under the `statistics` key.
///
/// Every field has a default so blobs written by older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsAggregate {
    #[serde(default)]
    pub total_donations: i64,
    #[serde(default)]
    pub total_trees: i64,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub monthly_stats: BTreeMap<String, MonthlyStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    #[serde(default)]
    pub donations: i64,
    #[serde(default)]
    pub trees: i64,
    #[serde(default)]
    pub revenue: f64,
}

impl Default for StatisticsAggregate {
    fn default() -> Self {
        Self {
            total_donations: 0,
            total_trees: 0,
            total_revenue: 0.0,
            last_updated: Utc::now(),
            monthly_stats: BTreeMap::new(),
        }
    }
}

impl StatisticsAggregate {
    /// Adds `count` donations (one tree each) to the totals and to `period`.
    pub fn record_donations(&mut self, period: &str, count: i64, now: DateTime<Utc>) {
        self.total_donations += count;
        self.total_trees += count;
        self.last_updated = now;

        let month = self.monthly_stats.entry(period.to_string()).or_default();
        month.donations += count;
        month.trees += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_donations_creates_month_and_bumps_totals() {
        let mut stats = StatisticsAggregate::default();
        let now = Utc::now();

        stats.record_donations("2026-10", 3, now);
        stats.record_donations("2026-10", 2, now);
        stats.record_donations("2026-11", 1, now);

        assert_eq!(stats.total_donations, 6);
        assert_eq!(stats.total_trees, 6);
        assert_eq!(stats.monthly_stats["2026-10"].trees, 5);
        assert_eq!(stats.monthly_stats["2026-11"].donations, 1);
        assert_eq!(stats.total_revenue, 0.0);
    }

    #[test]
    fn loads_partial_blob() {
        let stats: StatisticsAggregate =
            serde_json::from_value(json!({ "total_donations": 12 })).unwrap();
        assert_eq!(stats.total_donations, 12);
        assert_eq!(stats.total_trees, 0);
        assert!(stats.monthly_stats.is_empty());
    }
}
