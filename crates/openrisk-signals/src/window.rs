//! Window & Consistency Engine.
//!
//! Turns a per-period activation sequence into k-of-n "candidate end"
//! indices and the event span each one covers. Every candidate end emits
//! independently; overlapping spans across consecutive months are expected.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use openrisk_core::config::CompositeCombinator;
use openrisk_core::Month;

/// For each index, whether at least `k` of the trailing `n` flags (clamped at
/// the sequence start) are true.
pub fn k_of_n_flags(flags: &[bool], k: usize, n: usize) -> Vec<bool> {
    let mut out = Vec::with_capacity(flags.len());
    let mut active = 0usize;
    for (i, &flag) in flags.iter().enumerate() {
        if flag {
            active += 1;
        }
        if n > 0 && i >= n && flags[i - n] {
            active -= 1;
        }
        out.push(n > 0 && active >= k);
    }
    out
}

/// Indices whose k-of-n flag is true.
pub fn candidate_ends(flags: &[bool], k: usize, n: usize) -> Vec<usize> {
    k_of_n_flags(flags, k, n)
        .into_iter()
        .enumerate()
        .filter_map(|(i, ok)| ok.then_some(i))
        .collect()
}

/// Span of the event ending at `end`: the trailing `n` periods, clamped at the
/// sequence start.
///
/// A clamped span shorter than `n` is kept only when `allow_partial` is set
/// and it still holds at least `max(1, k)` periods.
pub fn event_span(end: usize, k: usize, n: usize, allow_partial: bool) -> Option<RangeInclusive<usize>> {
    let start = (end + 1).saturating_sub(n);
    let len = end + 1 - start;
    let long_enough = if allow_partial { len >= k.max(1) } else { len >= n };
    long_enough.then_some(start..=end)
}

/// Per-month activation of a composite signal over `periods`.
///
/// `referenced` holds the fired months of each referenced signal; a missing
/// signal contributes an empty set.
pub fn composite_flags(
    periods: &[Month],
    referenced: &[&BTreeSet<Month>],
    combinator: CompositeCombinator,
) -> Vec<bool> {
    periods
        .iter()
        .map(|month| {
            let active = referenced.iter().filter(|fired| fired.contains(month)).count();
            match combinator {
                CompositeCombinator::MOfN { m } => active >= m,
                CompositeCombinator::All => active == referenced.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    fn naive(flags: &[bool], k: usize, n: usize) -> Vec<bool> {
        (0..flags.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(n);
                flags[start..=i].iter().filter(|f| **f).count() >= k
            })
            .collect()
    }

    #[test]
    fn trailing_window_is_clamped_at_start() {
        assert_eq!(k_of_n_flags(&flags("110"), 2, 3), vec![false, true, true]);
        assert_eq!(k_of_n_flags(&flags("1001"), 2, 3), vec![false, false, false, false]);
        assert_eq!(k_of_n_flags(&flags("10101"), 2, 3), vec![false, false, true, false, true]);
    }

    #[test]
    fn sliding_count_matches_naive_count() {
        let seq = flags("1101001110010111");
        for n in 1..6 {
            for k in 1..=n {
                assert_eq!(k_of_n_flags(&seq, k, n), naive(&seq, k, n), "k={k} n={n}");
            }
        }
    }

    #[test]
    fn empty_sequence_has_no_candidates() {
        assert!(candidate_ends(&[], 1, 1).is_empty());
    }

    #[test]
    fn spans_require_full_window_unless_partial() {
        assert_eq!(event_span(1, 2, 3, false), None);
        assert_eq!(event_span(1, 2, 3, true), Some(0..=1));
        assert_eq!(event_span(0, 2, 3, true), None);
        assert_eq!(event_span(2, 2, 3, false), Some(0..=2));
        assert_eq!(event_span(5, 2, 3, false), Some(3..=5));
    }

    #[test]
    fn three_true_months_in_a_three_month_series_yield_one_span() {
        let ends = candidate_ends(&flags("111"), 2, 3);
        assert_eq!(ends, vec![1, 2]);
        let spans: Vec<_> = ends
            .into_iter()
            .filter_map(|e| event_span(e, 2, 3, false))
            .collect();
        assert_eq!(spans, vec![0..=2]);
    }

    #[test]
    fn composite_combinators() {
        let m = |s: &str| s.parse::<Month>().unwrap();
        let periods = Month::sequence(m("2024-01"), m("2024-03"));
        let a: BTreeSet<Month> = [m("2024-01"), m("2024-02")].into();
        let b: BTreeSet<Month> = [m("2024-02"), m("2024-03")].into();
        let refs = [&a, &b];
        assert_eq!(
            composite_flags(&periods, &refs, CompositeCombinator::MOfN { m: 1 }),
            vec![true, true, true]
        );
        assert_eq!(
            composite_flags(&periods, &refs, CompositeCombinator::MOfN { m: 2 }),
            vec![false, true, false]
        );
        assert_eq!(
            composite_flags(&periods, &refs, CompositeCombinator::All),
            vec![false, true, false]
        );
    }
}
