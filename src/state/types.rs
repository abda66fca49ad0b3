//! Progress state snapshot
//!
//! Serialized to JSON and persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every persisted state document
pub const STATE_VERSION: &str = "2.0.0";

fn default_version() -> String {
    STATE_VERSION.to_string()
}

/// Fetch progress for one owner
///
/// Mutated only by the orchestrating fetcher; the store only ever sees a
/// serialized snapshot. `total_items == 0` means totals are not yet known
/// (nothing has been fetched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub owner: String,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub total_items: u64,
    #[serde(default)]
    pub fetched_items: u64,
    #[serde(default = "default_version")]
    pub version: String,
}

impl ProgressState {
    /// Create a fresh state for an owner
    pub fn new(owner: impl Into<String>, total_items: u64) -> Self {
        let now = Utc::now();
        Self {
            owner: owner.into(),
            started_at: now,
            last_updated: now,
            total_items,
            fetched_items: 0,
            version: STATE_VERSION.to_string(),
        }
    }

    /// Progress as a percentage (0-100). An empty collection is complete by
    /// definition, so a zero total reports 100.
    pub fn percent_complete(&self) -> f64 {
        if self.total_items == 0 {
            return 100.0;
        }
        (self.fetched_items as f64 / self.total_items as f64) * 100.0
    }

    /// Items not yet fetched.
    pub fn remaining_items(&self) -> u64 {
        self.total_items.saturating_sub(self.fetched_items)
    }

    /// True once every known item has been fetched.
    pub fn is_complete(&self) -> bool {
        self.fetched_items >= self.total_items
    }

    /// Wall-clock span from start to the last update.
    pub fn duration(&self) -> chrono::Duration {
        self.last_updated - self.started_at
    }

    /// Refresh the last-updated timestamp.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Whether the snapshot satisfies its own invariants. A stored document
    /// failing this is treated as absent, the same as corrupt JSON.
    pub fn is_valid(&self) -> bool {
        !self.owner.is_empty() && self.fetched_items <= self.total_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = ProgressState::new("buntstift", 250);
        assert_eq!(state.owner, "buntstift");
        assert_eq!(state.total_items, 250);
        assert_eq!(state.fetched_items, 0);
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.started_at, state.last_updated);
        assert!(!state.is_complete());
        assert!(state.is_valid());
    }

    #[test]
    fn test_progress_math() {
        let mut state = ProgressState::new("buntstift", 250);
        state.fetched_items = 100;

        assert_eq!(state.percent_complete(), 40.0);
        assert_eq!(state.remaining_items(), 150);
        assert!(!state.is_complete());

        state.fetched_items = 250;
        assert_eq!(state.percent_complete(), 100.0);
        assert_eq!(state.remaining_items(), 0);
        assert!(state.is_complete());
    }

    #[test]
    fn test_zero_total_is_complete() {
        let state = ProgressState::new("buntstift", 0);
        assert_eq!(state.percent_complete(), 100.0);
        assert!(state.is_complete());
        assert!(state.is_valid());
    }

    #[test]
    fn test_validity() {
        let mut state = ProgressState::new("buntstift", 100);
        state.fetched_items = 150;
        assert!(!state.is_valid(), "fetched past total must be rejected");

        let mut sentinel = ProgressState::new("buntstift", 0);
        sentinel.fetched_items = 5;
        assert!(!sentinel.is_valid(), "sentinel total with fetched items");

        let nameless = ProgressState::new("", 10);
        assert!(!nameless.is_valid());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut state = ProgressState::new("buntstift", 250);
        state.fetched_items = 42;

        let json = serde_json::to_string_pretty(&state).unwrap();
        let restored: ProgressState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = serde_json::json!({
            "owner": "buntstift",
            "started_at": "2024-03-01T12:00:00Z",
            "last_updated": "2024-03-01T12:30:00Z",
            "total_items": 250
        });

        let state: ProgressState = serde_json::from_value(json).unwrap();
        assert_eq!(state.fetched_items, 0);
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.duration(), chrono::Duration::minutes(30));
    }
}
