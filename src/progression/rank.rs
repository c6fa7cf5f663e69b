//! Rank progression from cumulative currency
//!
//! Favor and prestige accumulate forever; ranks are tiers derived from the
//! running total through an ordered threshold table. Ranks are never stored
//! independently of the total, so recomputing always gives the same answer.

use serde::{Deserialize, Serialize};

use crate::core::error::RankTableError;
use crate::core::types::{Currency, ProfileId, Rank};

/// One tier of a rank table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Display name ("Initiate", "Fledgling", ...)
    pub name: String,
    /// Minimum cumulative currency to hold this rank
    pub threshold: u64,
}

impl RankEntry {
    pub fn new(name: impl Into<String>, threshold: u64) -> Self {
        Self {
            name: name.into(),
            threshold,
        }
    }
}

/// Ordered thresholds, strictly increasing, starting at 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankTable {
    entries: Vec<RankEntry>,
}

impl RankTable {
    /// Build a table, rejecting empty, non-zero-based or non-increasing input
    pub fn new(entries: Vec<RankEntry>) -> Result<Self, RankTableError> {
        let first = entries.first().ok_or(RankTableError::Empty)?;
        if first.threshold != 0 {
            return Err(RankTableError::NonZeroBase(first.threshold));
        }

        for pair in entries.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(RankTableError::NotIncreasing {
                    rank: pair[1].name.clone(),
                    threshold: pair[1].threshold,
                    previous: pair[0].threshold,
                });
            }
        }

        Ok(Self { entries })
    }

    /// Default favor ranks for players
    pub fn favor_defaults() -> Self {
        Self {
            entries: vec![
                RankEntry::new("Initiate", 0),
                RankEntry::new("Disciple", 500),
                RankEntry::new("Zealot", 2000),
                RankEntry::new("Champion", 5000),
                RankEntry::new("Avatar", 10000),
            ],
        }
    }

    /// Default prestige ranks for religions
    pub fn prestige_defaults() -> Self {
        Self {
            entries: vec![
                RankEntry::new("Fledgling", 0),
                RankEntry::new("Established", 500),
                RankEntry::new("Renowned", 2000),
                RankEntry::new("Legendary", 5000),
                RankEntry::new("Mythic", 10000),
            ],
        }
    }

    /// Highest rank whose threshold is <= total
    pub fn compute_rank(&self, total: u64) -> Rank {
        // entries[0].threshold == 0, so partition_point is always >= 1
        let above = self.entries.partition_point(|e| e.threshold <= total);
        (above.saturating_sub(1)) as Rank
    }

    pub fn max_rank(&self) -> Rank {
        (self.entries.len() - 1) as Rank
    }

    pub fn name(&self, rank: Rank) -> Option<&str> {
        self.entries.get(rank as usize).map(|e| e.name.as_str())
    }

    pub fn threshold(&self, rank: Rank) -> Option<u64> {
        self.entries.get(rank as usize).map(|e| e.threshold)
    }

    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    /// Progress through the current rank toward the next one
    pub fn progress(&self, total: u64) -> RankProgress {
        let rank = self.compute_rank(total);
        let floor = self.threshold(rank).unwrap_or(0);
        match self.threshold(rank + 1) {
            Some(next) => {
                let span = (next - floor) as f32;
                let fraction = ((total - floor) as f32 / span).clamp(0.0, 1.0);
                RankProgress {
                    rank,
                    next_threshold: Some(next),
                    fraction,
                }
            }
            None => RankProgress {
                rank,
                next_threshold: None,
                fraction: 1.0,
            },
        }
    }
}

impl<'de> Deserialize<'de> for RankTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<RankEntry>::deserialize(deserializer)?;
        RankTable::new(entries).map_err(serde::de::Error::custom)
    }
}

/// Where a total sits within its rank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankProgress {
    pub rank: Rank,
    /// `None` at the top rank
    pub next_threshold: Option<u64>,
    /// 0.0..=1.0 through the current rank; 1.0 at the top rank
    pub fraction: f32,
}

impl RankProgress {
    pub fn is_max(&self) -> bool {
        self.next_threshold.is_none()
    }
}

/// Fired when a currency change crosses into a higher rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankUpEvent {
    pub profile: ProfileId,
    pub currency: Currency,
    pub previous_rank: Rank,
    pub new_rank: Rank,
    pub new_rank_name: String,
}

/// Rank tables for both currencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankProgressionTracker {
    favor: RankTable,
    prestige: RankTable,
}

impl RankProgressionTracker {
    pub fn new(favor: RankTable, prestige: RankTable) -> Self {
        Self { favor, prestige }
    }

    pub fn table(&self, currency: Currency) -> &RankTable {
        match currency {
            Currency::Favor => &self.favor,
            Currency::Prestige => &self.prestige,
        }
    }

    pub fn compute_rank(&self, currency: Currency, total: u64) -> Rank {
        self.table(currency).compute_rank(total)
    }

    /// Returns an event only when `new_rank > previous_rank`
    pub fn detect_rank_up(
        &self,
        profile: ProfileId,
        previous_rank: Rank,
        new_rank: Rank,
    ) -> Option<RankUpEvent> {
        if new_rank <= previous_rank {
            return None;
        }
        let currency = profile.currency();
        let table = self.table(currency);
        let new_rank = new_rank.min(table.max_rank());
        if new_rank <= previous_rank {
            return None;
        }
        Some(RankUpEvent {
            profile,
            currency,
            previous_rank,
            new_rank,
            new_rank_name: table.name(new_rank).unwrap_or_default().to_string(),
        })
    }

    pub fn progress(&self, currency: Currency, total: u64) -> RankProgress {
        self.table(currency).progress(total)
    }
}

impl Default for RankProgressionTracker {
    fn default() -> Self {
        Self::new(RankTable::favor_defaults(), RankTable::prestige_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlayerId;

    fn three_tier() -> RankTable {
        RankTable::new(vec![
            RankEntry::new("Rank0", 0),
            RankEntry::new("Rank1", 100),
            RankEntry::new("Rank2", 500),
        ])
        .unwrap()
    }

    #[test]
    fn test_compute_rank_thresholds() {
        let table = three_tier();
        assert_eq!(table.compute_rank(0), 0);
        assert_eq!(table.compute_rank(99), 0);
        assert_eq!(table.compute_rank(100), 1);
        assert_eq!(table.compute_rank(499), 1);
        assert_eq!(table.compute_rank(500), 2);
        assert_eq!(table.compute_rank(u64::MAX), 2);
    }

    #[test]
    fn test_rank_up_scenario() {
        let tracker = RankProgressionTracker::new(three_tier(), three_tier());
        let profile = ProfileId::Player(PlayerId::new());
        let rank = tracker.compute_rank(Currency::Favor, 100);
        assert_eq!(rank, 1);

        let event = tracker.detect_rank_up(profile, 0, rank).unwrap();
        assert_eq!(event.previous_rank, 0);
        assert_eq!(event.new_rank, 1);
        assert_eq!(event.new_rank_name, "Rank1");
        assert_eq!(event.currency, Currency::Favor);
    }

    #[test]
    fn test_no_rank_up_when_equal_or_lower() {
        let tracker = RankProgressionTracker::default();
        let profile = ProfileId::Player(PlayerId::new());
        assert!(tracker.detect_rank_up(profile, 2, 2).is_none());
        assert!(tracker.detect_rank_up(profile, 3, 1).is_none());
    }

    #[test]
    fn test_no_rank_up_above_top() {
        let tracker = RankProgressionTracker::new(three_tier(), three_tier());
        let profile = ProfileId::Player(PlayerId::new());
        assert!(tracker.detect_rank_up(profile, 2, 7).is_none());
    }

    #[test]
    fn test_progress_mid_rank() {
        let table = three_tier();
        let progress = table.progress(300);
        assert_eq!(progress.rank, 1);
        assert_eq!(progress.next_threshold, Some(500));
        assert!((progress.fraction - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_progress_at_max_rank() {
        let table = three_tier();
        let progress = table.progress(10_000);
        assert!(progress.is_max());
        assert_eq!(progress.fraction, 1.0);
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(RankTable::new(vec![]), Err(RankTableError::Empty));
        assert_eq!(
            RankTable::new(vec![RankEntry::new("a", 5)]),
            Err(RankTableError::NonZeroBase(5))
        );
        assert!(matches!(
            RankTable::new(vec![RankEntry::new("a", 0), RankEntry::new("b", 0)]),
            Err(RankTableError::NotIncreasing { .. })
        ));
    }

    #[test]
    fn test_defaults_are_valid() {
        let favor = RankTable::favor_defaults();
        assert!(RankTable::new(favor.entries().to_vec()).is_ok());
        let prestige = RankTable::prestige_defaults();
        assert!(RankTable::new(prestige.entries().to_vec()).is_ok());
        assert_eq!(favor.max_rank(), 4);
        assert_eq!(favor.name(1), Some("Disciple"));
    }

    #[test]
    fn test_deserialize_rejects_bad_table() {
        let bad: std::result::Result<RankTable, _> =
            serde_json::from_str(r#"[{"name":"a","threshold":10}]"#);
        assert!(bad.is_err());
    }
}
