//! Occurrence selection.
//!
//! Selection turns a candidate set into a concrete, non-overlapping set of
//! occurrences. The decision problem is weighted interval scheduling with a
//! quota: a pattern only pays for its dictionary entry once, so it must
//! place at least its compressibility minimum of occurrences to be worth
//! keeping. Three strategies share the quota-refinement loop.

use crate::candidate::{Candidate, Occurrence};
use crate::config::{CompressionConfig, SelectionMode};
use crate::token::{is_compressible, pattern_savings, Token};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};

/// Refinement iterations before the best selection seen wins.
const REFINE_ITERATIONS: usize = 4;

/// Coefficient mixing candidate priority into the greedy density score.
const PRIORITY_WEIGHT: f64 = 0.1;

/// A chosen set of non-overlapping occurrences and its net savings.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Accepted occurrences, ascending by start, pairwise disjoint.
    pub occurrences: Vec<Occurrence>,
    /// Net token savings over all surviving patterns.
    pub savings: i64,
}

impl Selection {
    fn empty() -> Self {
        Self::default()
    }

    /// True when nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

/// Selects occurrences with the strategy named in `config`.
pub fn select(candidates: &[Candidate], config: &CompressionConfig) -> Selection {
    let occurrences = build_occurrences(candidates);
    if occurrences.is_empty() {
        return Selection::empty();
    }
    match config.selection {
        SelectionMode::Greedy => select_greedy(&occurrences, config),
        SelectionMode::Optimal => select_optimal(&occurrences, config),
        SelectionMode::Beam => select_beam(&occurrences, config),
    }
}

/// Explodes candidates into occurrences under a stable total order:
/// ascending end, then start, then length, then subsequence.
fn build_occurrences(candidates: &[Candidate]) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    for candidate in candidates {
        for &pos in &candidate.positions {
            occurrences.push(Occurrence {
                start: pos,
                len: candidate.len,
                sub: candidate.sub.clone(),
                priority: candidate.priority,
            });
        }
    }
    occurrences.sort_by(|a, b| {
        a.end()
            .cmp(&b.end())
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.len.cmp(&b.len))
            .then_with(|| a.sub.cmp(&b.sub))
    });
    occurrences
}

/// Greedy density score: per-token saving fraction plus a small priority
/// nudge.
#[inline]
fn density(occ: &Occurrence) -> f64 {
    (occ.len as f64 - 1.0) / occ.len as f64 + f64::from(occ.priority) * PRIORITY_WEIGHT
}

/// Keeps only occurrences of patterns that met their quota and totals the
/// savings.
fn compressible_subset(
    occurrences: &[Occurrence],
    chosen: &[usize],
    delta: usize,
) -> (Vec<Occurrence>, i64) {
    let mut counts: HashMap<&[Token], usize> = HashMap::new();
    for &i in chosen {
        *counts.entry(occurrences[i].sub.as_slice()).or_default() += 1;
    }

    let mut savings = 0i64;
    let mut keep: HashSet<&[Token]> = HashSet::new();
    for (&sub, &count) in &counts {
        if is_compressible(sub.len(), count, delta) {
            savings += pattern_savings(sub.len(), count, delta);
            keep.insert(sub);
        }
    }

    let mut selected: Vec<Occurrence> = chosen
        .iter()
        .map(|&i| occurrences[i].clone())
        .filter(|occ| keep.contains(occ.sub.as_slice()))
        .collect();
    selected.sort_by(|a, b| a.start.cmp(&b.start));
    (selected, savings)
}

/// Patterns among `chosen` that fell short of their quota.
fn unmet_quotas(occurrences: &[Occurrence], chosen: &[usize], delta: usize) -> Vec<Vec<Token>> {
    let mut counts: HashMap<&[Token], usize> = HashMap::new();
    for &i in chosen {
        *counts.entry(occurrences[i].sub.as_slice()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(sub, count)| !is_compressible(sub.len(), *count, delta))
        .map(|(sub, _)| sub.to_vec())
        .collect()
}

/// Drops patterns whose total supply can never meet the quota.
fn viable_indices(occurrences: &[Occurrence], config: &CompressionConfig) -> Vec<usize> {
    let mut supply: HashMap<&[Token], usize> = HashMap::new();
    for occ in occurrences {
        *supply.entry(occ.sub.as_slice()).or_default() += 1;
    }
    (0..occurrences.len())
        .filter(|&i| {
            let occ = &occurrences[i];
            supply[occ.sub.as_slice()] >= config.min_count_for(occ.len)
        })
        .collect()
}

/// Greedy selection: walk occurrences in savings-density order, accept
/// whatever does not collide, then refine away patterns that missed their
/// quota. Bounded iterations; the best selection seen (by savings) wins.
fn select_greedy(occurrences: &[Occurrence], config: &CompressionConfig) -> Selection {
    let delta = config.delta();
    let span = occurrences.iter().map(Occurrence::end).max().unwrap_or(0);

    let mut viable = viable_indices(occurrences, config);
    let mut best = Selection::empty();

    for _ in 0..REFINE_ITERATIONS {
        if viable.is_empty() {
            break;
        }

        let mut ranked = viable.clone();
        ranked.sort_by(|&a, &b| {
            let (oa, ob) = (&occurrences[a], &occurrences[b]);
            density(ob)
                .partial_cmp(&density(oa))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| oa.start.cmp(&ob.start))
                .then_with(|| oa.len.cmp(&ob.len))
                .then_with(|| oa.sub.cmp(&ob.sub))
        });

        let mut occupied = vec![false; span];
        let mut chosen: Vec<usize> = Vec::new();
        for &i in &ranked {
            let occ = &occurrences[i];
            if occupied[occ.start..occ.end()].iter().any(|&b| b) {
                continue;
            }
            occupied[occ.start..occ.end()].fill(true);
            chosen.push(i);
        }

        let (selected, savings) = compressible_subset(occurrences, &chosen, delta);
        if savings > best.savings {
            best = Selection {
                occurrences: selected,
                savings,
            };
        }

        let failed = unmet_quotas(occurrences, &chosen, delta);
        if failed.is_empty() {
            break;
        }
        let failed: HashSet<Vec<Token>> = failed.into_iter().collect();
        viable.retain(|&i| !failed.contains(&occurrences[i].sub));
    }

    if best.savings <= 0 {
        return Selection::empty();
    }
    best
}

/// Optimal selection: weighted interval scheduling by dynamic programming
/// over occurrences sorted by end position, with the same quota refinement.
///
/// Equal-score `take`/`skip` decisions resolve to `skip`, so among
/// equally-scored solutions the one with fewer occurrences wins.
fn select_optimal(occurrences: &[Occurrence], config: &CompressionConfig) -> Selection {
    let delta = config.delta();
    let mut viable = viable_indices(occurrences, config);
    let mut best = Selection::empty();

    for _ in 0..REFINE_ITERATIONS {
        if viable.is_empty() {
            break;
        }

        // `occurrences` is already end-sorted; `viable` preserves that order
        let n = viable.len();
        let ends: Vec<usize> = viable.iter().map(|&i| occurrences[i].end()).collect();

        // p[i]: rightmost j < i whose occurrence ends at or before i starts
        let p: Vec<Option<usize>> = (0..n)
            .map(|i| {
                let start = occurrences[viable[i]].start;
                let idx = ends[..i].partition_point(|&e| e <= start);
                idx.checked_sub(1)
            })
            .collect();

        let weights: Vec<i64> = viable
            .iter()
            .map(|&i| occurrences[i].len as i64 - 1)
            .collect();

        let mut dp = vec![0i64; n];
        let mut take = vec![false; n];
        for i in 0..n {
            let with = weights[i] + p[i].map_or(0, |j| dp[j]);
            let without = if i > 0 { dp[i - 1] } else { 0 };
            if with > without {
                dp[i] = with;
                take[i] = true;
            } else {
                dp[i] = without;
            }
        }

        let mut chosen: Vec<usize> = Vec::new();
        let mut i = n;
        while i > 0 {
            let idx = i - 1;
            if take[idx] {
                chosen.push(viable[idx]);
                match p[idx] {
                    Some(j) => i = j + 1,
                    None => break,
                }
            } else {
                i -= 1;
            }
        }
        chosen.reverse();

        let (selected, savings) = compressible_subset(occurrences, &chosen, delta);
        if savings > best.savings {
            best = Selection {
                occurrences: selected,
                savings,
            };
        }

        let failed = unmet_quotas(occurrences, &chosen, delta);
        if failed.is_empty() {
            break;
        }
        let failed: HashSet<Vec<Token>> = failed.into_iter().collect();
        viable.retain(|&i| !failed.contains(&occurrences[i].sub));
    }

    if best.savings <= 0 {
        return Selection::empty();
    }
    best
}

/// One partial solution tracked by the beam.
#[derive(Debug, Clone)]
struct BeamState {
    score: i64,
    last_end: usize,
    chosen: Vec<usize>,
    counts: HashMap<Vec<Token>, usize>,
}

/// Beam selection: branch take/skip per occurrence in start order, scoring
/// the take with the pattern's marginal saving — the dictionary overhead is
/// charged exactly once, on the occurrence that meets the quota.
fn select_beam(occurrences: &[Occurrence], config: &CompressionConfig) -> Selection {
    let delta = config.delta();
    let viable = viable_indices(occurrences, config);
    if viable.is_empty() {
        return Selection::empty();
    }

    let mut in_start_order = viable;
    in_start_order.sort_by(|&a, &b| {
        let (oa, ob) = (&occurrences[a], &occurrences[b]);
        oa.start
            .cmp(&ob.start)
            .then_with(|| oa.len.cmp(&ob.len))
            .then_with(|| oa.sub.cmp(&ob.sub))
    });

    let mut states = vec![BeamState {
        score: 0,
        last_end: 0,
        chosen: Vec::new(),
        counts: HashMap::new(),
    }];

    for &i in &in_start_order {
        let occ = &occurrences[i];
        let mut next: Vec<BeamState> = Vec::with_capacity(states.len() * 2);

        for state in &states {
            // skip
            next.push(state.clone());

            // take
            if occ.start >= state.last_end {
                let mut taken = state.clone();
                let count = taken.counts.entry(occ.sub.clone()).or_insert(0);
                *count += 1;
                let mut increment = occ.len as i64 - 1;
                if *count == config.min_count_for(occ.len) {
                    increment -= 2 + delta as i64;
                }
                taken.score += increment;
                taken.last_end = occ.end();
                taken.chosen.push(i);
                next.push(taken);
            }
        }

        next.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.last_end.cmp(&b.last_end)));
        next.truncate(config.beam_width.max(1));
        states = next;
    }

    let winner = states
        .into_iter()
        .max_by(|a, b| a.score.cmp(&b.score).then_with(|| b.last_end.cmp(&a.last_end)))
        .expect("beam always holds at least one state");

    let (selected, savings) = compressible_subset(occurrences, &winner.chosen, delta);
    if savings <= 0 {
        return Selection::empty();
    }
    Selection {
        occurrences: selected,
        savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionMode;

    fn config_with(mode: SelectionMode) -> CompressionConfig {
        CompressionConfig {
            selection: mode,
            ..Default::default()
        }
    }

    fn assert_disjoint(selection: &Selection) {
        let mut occupied: HashSet<usize> = HashSet::new();
        for occ in &selection.occurrences {
            for pos in occ.start..occ.end() {
                assert!(occupied.insert(pos), "offset {pos} selected twice");
            }
        }
    }

    const MODES: [SelectionMode; 3] = [
        SelectionMode::Greedy,
        SelectionMode::Optimal,
        SelectionMode::Beam,
    ];

    #[test]
    fn test_empty_candidates() {
        for mode in MODES {
            assert!(select(&[], &config_with(mode)).is_empty());
        }
    }

    #[test]
    fn test_below_quota_selects_nothing() {
        // a pair with 3 occurrences never pays for its entry
        let cand = Candidate::new(vec![1, 2], vec![0, 4, 8]);
        for mode in MODES {
            let selection = select(&[cand.clone()], &config_with(mode));
            assert!(selection.is_empty(), "{mode}");
        }
    }

    #[test]
    fn test_single_compressible_pattern() {
        let cand = Candidate::new(vec![1, 2, 3], vec![0, 3, 6, 9, 12]);
        for mode in MODES {
            let selection = select(&[cand.clone()], &config_with(mode));
            assert_eq!(selection.occurrences.len(), 5, "{mode}");
            // (3-1)*(5-1) - 3 = 5
            assert_eq!(selection.savings, 5, "{mode}");
            assert_disjoint(&selection);
        }
    }

    #[test]
    fn test_cross_pattern_overlap_resolved() {
        let a = Candidate::new(vec![1, 2, 3], vec![0, 6, 12, 18, 24]);
        let b = Candidate::new(vec![3, 4, 5], vec![2, 8, 14, 20, 26]);
        for mode in MODES {
            let selection = select(&[a.clone(), b.clone()], &config_with(mode));
            assert!(!selection.is_empty(), "{mode}");
            assert_disjoint(&selection);
        }
    }

    #[test]
    fn test_selected_patterns_meet_quota() {
        let a = Candidate::new(vec![1, 2, 3], vec![0, 6, 12, 18, 24]);
        let b = Candidate::new(vec![9, 8], vec![30, 33, 36, 39, 42]);
        for mode in MODES {
            let selection = select(&[a.clone(), b.clone()], &config_with(mode));
            let mut counts: HashMap<&[Token], usize> = HashMap::new();
            for occ in &selection.occurrences {
                *counts.entry(occ.sub.as_slice()).or_default() += 1;
            }
            for (sub, count) in counts {
                assert!(is_compressible(sub.len(), count, 1), "{mode}: {sub:?}");
            }
        }
    }

    #[test]
    fn test_optimal_prefers_heavier_cover() {
        // a lone length-8 pattern competing with dense pairs over the same
        // region: the DP should keep total weight maximal and disjoint
        let long = Candidate::new(vec![1, 2, 3, 4, 5, 6, 7, 8], vec![0, 8]);
        let pair = Candidate::new(vec![1, 2], vec![0, 2, 4, 6, 8, 10, 12, 14]);
        let selection = select(&[long, pair], &config_with(SelectionMode::Optimal));
        assert!(!selection.is_empty());
        assert_disjoint(&selection);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let a = Candidate::new(vec![1, 2, 3], vec![0, 6, 12, 18, 24]);
        let b = Candidate::new(vec![3, 4, 5], vec![2, 8, 14, 20, 26]);
        for mode in MODES {
            let cfg = config_with(mode);
            let first = select(&[a.clone(), b.clone()], &cfg);
            let second = select(&[a.clone(), b.clone()], &cfg);
            assert_eq!(first.occurrences, second.occurrences, "{mode}");
            assert_eq!(first.savings, second.savings, "{mode}");
        }
    }

    #[test]
    fn test_beam_width_one_still_selects() {
        let cand = Candidate::new(vec![5, 6, 7], vec![0, 3, 6, 9, 12]);
        let cfg = CompressionConfig {
            selection: SelectionMode::Beam,
            beam_width: 1,
            ..Default::default()
        };
        let selection = select(&[cand], &cfg);
        assert_eq!(selection.occurrences.len(), 5);
    }

    #[test]
    fn test_priority_biases_greedy_ties() {
        // two interleaved pair patterns of equal density competing for the
        // same region: the prioritized one must win the sweep
        let base = Candidate::new(vec![1, 2], vec![0, 2, 4, 6, 8]);
        let rival = Candidate::new(vec![2, 1], vec![1, 3, 5, 7, 9]).with_priority(1);
        let selection = select(&[base, rival.clone()], &config_with(SelectionMode::Greedy));
        assert!(!selection.is_empty());
        assert!(selection
            .occurrences
            .iter()
            .all(|occ| occ.sub == rival.sub));
    }

    #[test]
    fn test_savings_match_formula() {
        let cand = Candidate::new(vec![1, 2, 3, 4], vec![0, 4, 8, 12]);
        for mode in MODES {
            let selection = select(&[cand.clone()], &config_with(mode));
            // (4-1)*(4-1) - 3 = 6
            assert_eq!(selection.savings, 6, "{mode}");
        }
    }
}
