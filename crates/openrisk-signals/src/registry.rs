//! Per-run record of the months each signal fired, per repository.
//!
//! Written after each (signal, repo) evaluation and read by antecedent gates
//! and composite signals. Passed explicitly through both evaluation phases.

use std::collections::BTreeSet;

use openrisk_core::{Month, RepoId};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct FiredRegistry {
    fired: FxHashMap<(RepoId, String), BTreeSet<Month>>,
}

impl FiredRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the span months of an emitted event.
    pub fn record(&mut self, repo: RepoId, signal_id: &str, months: impl IntoIterator<Item = Month>) {
        self.fired
            .entry((repo, signal_id.to_string()))
            .or_default()
            .extend(months);
    }

    pub fn months(&self, repo: RepoId, signal_id: &str) -> Option<&BTreeSet<Month>> {
        self.fired.get(&(repo, signal_id.to_string()))
    }

    /// True when the signal fired anywhere in the repository's history.
    pub fn fired_anywhere(&self, repo: RepoId, signal_id: &str) -> bool {
        self.months(repo, signal_id).is_some_and(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_per_repo() {
        let m = |s: &str| s.parse::<Month>().unwrap();
        let mut reg = FiredRegistry::new();
        reg.record(1, "a", [m("2024-01"), m("2024-02")]);
        reg.record(1, "a", [m("2024-02"), m("2024-03")]);
        assert_eq!(reg.months(1, "a").map(BTreeSet::len), Some(3));
        assert!(reg.fired_anywhere(1, "a"));
        assert!(!reg.fired_anywhere(2, "a"));
        assert!(reg.months(1, "a").is_some_and(|s| s.contains(&m("2024-03"))));
        assert!(reg.months(1, "b").is_none());
    }
}
