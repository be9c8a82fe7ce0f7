//! Subsumption pruning.
//!
//! Two pruning rules run between discovery and selection:
//!
//! 1. *Coverage*: a short candidate whose occurrences all sit inside the
//!    occurrences of longer candidates adds dictionary overhead without
//!    adding coverage. It survives only when enough of its positions fall
//!    outside every subsumer.
//! 2. *Cyclic extension*: periodic regions make the suffix array emit the
//!    same repetition at every window length (`s`, `s·s`, `s·s·s[0..1]`,
//!    …). The extended forms never beat the base pattern when the base
//!    saves at least as much, yet they outrank it on per-token density and
//!    can starve it during selection. They are dropped here.

use crate::candidate::{merge_duplicates, Candidate};
use crate::config::CompressionConfig;
use crate::token::{pattern_savings, Token};
use ahash::AHashMap as HashMap;

/// Returns true if `needle` occurs as a contiguous run inside `haystack`.
fn is_contiguous_subsequence(needle: &[Token], haystack: &[Token]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Whether the occurrence of `inner_len` tokens at `pos` lies entirely
/// inside some occurrence of the candidate with sorted `spans` of
/// `outer_len` tokens.
fn covered_by(pos: usize, inner_len: usize, spans: &[usize], outer_len: usize) -> bool {
    // rightmost span start <= pos
    let idx = spans.partition_point(|&s| s <= pos);
    if idx == 0 {
        return false;
    }
    let start = spans[idx - 1];
    pos + inner_len <= start + outer_len
}

/// Whether `sub` repeats with period `period` (its tail equals the sequence
/// shifted by `period`).
fn has_period(sub: &[Token], period: usize) -> bool {
    period < sub.len() && (period..sub.len()).all(|i| sub[i] == sub[i - period])
}

/// Prunes candidates dominated by other candidates.
///
/// Candidates with identical subsequences are merged first. A candidate is
/// dropped when it is a cyclic extension of a shorter candidate saving at
/// least as much, or when its positions lie inside longer candidates'
/// occurrences and the positions left over (covered by no subsumer) fall
/// short of the independence threshold — `min_independent` when configured,
/// otherwise the pattern's own compressibility minimum. Survivors keep
/// their full position lists; selection resolves any cross-pattern overlap
/// that remains.
pub fn prune(candidates: Vec<Candidate>, config: &CompressionConfig) -> Vec<Candidate> {
    let candidates = merge_duplicates(candidates);
    if candidates.len() < 2 {
        return candidates;
    }

    let delta = config.delta();
    let savings_of: HashMap<&[Token], i64> = candidates
        .iter()
        .map(|c| (c.sub.as_slice(), pattern_savings(c.len, c.count(), delta)))
        .collect();

    // longest first so coverage checks only look at earlier entries
    let mut by_len: Vec<&Candidate> = candidates.iter().collect();
    by_len.sort_by(|a, b| b.len.cmp(&a.len).then_with(|| a.sub.cmp(&b.sub)));

    let mut kept: Vec<bool> = vec![true; by_len.len()];

    for i in 0..by_len.len() {
        let candidate = by_len[i];

        // cyclic-extension rule
        let own_savings = savings_of[candidate.sub.as_slice()];
        let dominated = (config.min_len..candidate.len).any(|period| {
            has_period(&candidate.sub, period)
                && savings_of
                    .get(&candidate.sub[..period])
                    .is_some_and(|&base| base >= own_savings)
        });
        if dominated {
            kept[i] = false;
            continue;
        }

        // coverage rule
        let mut has_subsumer = false;
        let mut independent = 0usize;

        'position: for &pos in &candidate.positions {
            for (j, long) in by_len.iter().enumerate().take(i) {
                if !kept[j] || long.len <= candidate.len {
                    continue;
                }
                if !is_contiguous_subsequence(&candidate.sub, &long.sub) {
                    continue;
                }
                has_subsumer = true;
                if covered_by(pos, candidate.len, &long.positions, long.len) {
                    continue 'position;
                }
            }
            independent += 1;
        }

        if has_subsumer {
            let floor = config
                .min_independent
                .unwrap_or_else(|| config.min_count_for(candidate.len));
            if independent < floor {
                kept[i] = false;
            }
        }
    }

    let survivors: Vec<&[Token]> = by_len
        .iter()
        .zip(&kept)
        .filter(|(_, &k)| k)
        .map(|(c, _)| c.sub.as_slice())
        .collect();

    // preserve the incoming (savings-ranked) order
    candidates
        .iter()
        .filter(|c| survivors.contains(&c.sub.as_slice()))
        .cloned()
        .collect()
}
