//! Pattern discovery.
//!
//! Produces [`Candidate`] patterns — repeated subsequences with
//! non-overlapping position sets — from a working token sequence. Three
//! interchangeable strategies share one output contract, so their results
//! can be unioned and merged by pattern content.

use crate::candidate::{merge_duplicates, non_overlapping_positions, Candidate};
use crate::config::{CompressionConfig, DiscoveryMode};
use crate::suffix_array::SuffixArray;
use crate::token::{is_compressible, min_count, pattern_savings, Token};
use ahash::AHashMap as HashMap;
use log::debug;

/// Discovers candidates with the strategy named in `config`.
///
/// The result is deduplicated by subsequence, filtered through the
/// compressibility pre-filter, and sorted by potential savings (ties break
/// toward longer, then lexicographically smaller patterns).
pub fn discover(tokens: &[Token], config: &CompressionConfig) -> Vec<Candidate> {
    let raw = match config.discovery {
        DiscoveryMode::SuffixArray => discover_suffix_array(tokens, config),
        DiscoveryMode::SlidingWindow => discover_sliding_window(tokens, config),
        DiscoveryMode::Bpe => discover_bpe(tokens, config),
    };
    finalize(raw, config)
}

/// Dedup, re-filter, and order a raw candidate set.
pub(crate) fn finalize(candidates: Vec<Candidate>, config: &CompressionConfig) -> Vec<Candidate> {
    let delta = config.delta();
    let mut merged = merge_duplicates(candidates);
    merged.retain(|c| is_compressible(c.len, c.count(), delta));
    merged.sort_by(|a, b| {
        let sa = pattern_savings(a.len, a.count(), delta);
        let sb = pattern_savings(b.len, b.count(), delta);
        sb.cmp(&sa)
            .then_with(|| b.len.cmp(&a.len))
            .then_with(|| a.sub.cmp(&b.sub))
    });
    merged
}

/// Suffix-array strategy: one pass over the LCP intervals of the input.
///
/// Each interval contributes a candidate per admissible prefix length; the
/// interval's suffix offsets are reduced to a maximal non-overlapping subset
/// by a left-to-right sweep before the compressibility check.
pub fn discover_suffix_array(tokens: &[Token], config: &CompressionConfig) -> Vec<Candidate> {
    if tokens.len() < config.min_len + 1 {
        return Vec::new();
    }

    let delta = config.delta();
    let sa = SuffixArray::build(tokens);
    let intervals = sa.lcp_intervals(config.min_len, config.max_len);

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen: HashMap<Vec<Token>, usize> = HashMap::new();

    for interval in intervals {
        let mut positions: Vec<usize> = sa.sa[interval.begin..=interval.end].to_vec();
        positions.sort_unstable();

        for len in config.min_len..=interval.len {
            // cheap bound before the sweep: even the full run is too small
            if positions.len() < min_count(len, delta) {
                continue;
            }

            let first = positions[0];
            if first + len > tokens.len() {
                continue;
            }
            let pattern = tokens[first..first + len].to_vec();

            let kept = non_overlapping_positions(&positions, len);
            if !is_compressible(len, kept.len(), delta) {
                continue;
            }

            match seen.get(&pattern) {
                Some(&i) => {
                    // a wider truncated interval already produced this
                    // pattern; union the offsets and re-sweep
                    let existing = &mut candidates[i];
                    existing.positions.extend(&kept);
                    existing.positions.sort_unstable();
                    existing.positions.dedup();
                    existing.positions =
                        non_overlapping_positions(&existing.positions, existing.len);
                }
                None => {
                    seen.insert(pattern.clone(), candidates.len());
                    candidates.push(Candidate::new(pattern, kept));
                }
            }
        }
    }

    candidates
}

/// Sliding-window strategy: group equal fixed-length windows, one sweep per
/// length from longest to shortest.
pub fn discover_sliding_window(tokens: &[Token], config: &CompressionConfig) -> Vec<Candidate> {
    let n = tokens.len();
    let delta = config.delta();
    let mut candidates = Vec::new();

    for len in (config.min_len..=config.max_len.min(n)).rev() {
        let mut by_window: HashMap<&[Token], Vec<usize>> = HashMap::new();
        for start in 0..=n - len {
            by_window
                .entry(&tokens[start..start + len])
                .or_default()
                .push(start);
        }

        let floor = min_count(len, delta);
        for (window, positions) in by_window {
            if positions.len() < floor {
                continue;
            }
            // window scan order is ascending, so no sort needed
            let kept = non_overlapping_positions(&positions, len);
            if is_compressible(len, kept.len(), delta) {
                candidates.push(Candidate::new(window.to_vec(), kept));
            }
        }
    }

    candidates
}

/// Symbol id used inside the BPE merge loop: original tokens keep their
/// value, merged symbols live above `u32::MAX`.
type Sym = u64;

const MERGED_BASE: Sym = 1 << 32;

/// BPE-style strategy: repeatedly merge the adjacent symbol pair with the
/// best promised saving, then read candidates off the merged symbols.
///
/// Deterministic: the winning pair maximizes the pattern saving of its
/// expansion; ties go to the lexicographically smaller expansion. Stops when
/// no merge is net-beneficial or after `bpe_max_merges` rounds.
pub fn discover_bpe(tokens: &[Token], config: &CompressionConfig) -> Vec<Candidate> {
    if tokens.len() < config.min_len + 1 {
        return Vec::new();
    }

    let delta = config.delta();

    // working sequence of (symbol, start offset in the original input)
    let mut seq: Vec<(Sym, usize)> = tokens
        .iter()
        .enumerate()
        .map(|(i, &t)| (Sym::from(t), i))
        .collect();
    let mut expansions: HashMap<Sym, Vec<Token>> = HashMap::new();
    let mut next_merged = MERGED_BASE;

    let expand = |sym: Sym, expansions: &HashMap<Sym, Vec<Token>>| -> Vec<Token> {
        match expansions.get(&sym) {
            Some(sub) => sub.clone(),
            None => vec![sym as Token],
        }
    };

    for round in 0..config.bpe_max_merges {
        // count non-overlapping adjacent pairs (a run of equal symbols only
        // yields floor(run/2) merge sites)
        let mut pair_counts: HashMap<(Sym, Sym), usize> = HashMap::new();
        let mut i = 0;
        while i + 1 < seq.len() {
            let pair = (seq[i].0, seq[i + 1].0);
            *pair_counts.entry(pair).or_default() += 1;
            i += if pair.0 == pair.1 { 2 } else { 1 };
        }

        let mut best: Option<((Sym, Sym), Vec<Token>, i64)> = None;
        for (&pair, &count) in &pair_counts {
            if count < 2 {
                continue;
            }
            let mut merged = expand(pair.0, &expansions);
            merged.extend(expand(pair.1, &expansions));
            if merged.len() > config.max_len {
                continue;
            }
            let saving = pattern_savings(merged.len(), count, delta);
            if saving <= 0 {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_pair, best_sub, best_saving)) => saving
                    .cmp(best_saving)
                    .then_with(|| best_sub.cmp(&merged))
                    .then_with(|| best_pair.cmp(&pair))
                    .is_gt(),
            };
            if better {
                best = Some((pair, merged, saving));
            }
        }

        let Some((pair, merged_sub, saving)) = best else {
            debug!("bpe: no beneficial pair after {round} merges");
            break;
        };
        debug!(
            "bpe: round {round} merging pair with expansion len {} (saving {saving})",
            merged_sub.len()
        );

        let sym = next_merged;
        next_merged += 1;
        expansions.insert(sym, merged_sub);

        // left-to-right replacement; consumed pairs cannot overlap
        let mut replaced: Vec<(Sym, usize)> = Vec::with_capacity(seq.len());
        let mut i = 0;
        while i < seq.len() {
            if i + 1 < seq.len() && (seq[i].0, seq[i + 1].0) == pair {
                replaced.push((sym, seq[i].1));
                i += 2;
            } else {
                replaced.push(seq[i]);
                i += 1;
            }
        }
        seq = replaced;
    }

    // read candidates off the surviving merged symbols
    let mut positions_by_sym: HashMap<Sym, Vec<usize>> = HashMap::new();
    for &(sym, start) in &seq {
        if sym >= MERGED_BASE {
            positions_by_sym.entry(sym).or_default().push(start);
        }
    }

    let mut candidates = Vec::new();
    for (sym, positions) in positions_by_sym {
        let sub = expansions[&sym].clone();
        if sub.len() < config.min_len || sub.len() > config.max_len {
            continue;
        }
        // instances in the merged sequence never overlap, but sweep anyway
        // to uphold the candidate invariant
        let mut sorted = positions;
        sorted.sort_unstable();
        let kept = non_overlapping_positions(&sorted, sub.len());
        if is_compressible(sub.len(), kept.len(), delta) {
            candidates.push(Candidate::new(sub, kept));
        }
    }

    candidates
}

/// Re-locates previously profitable subsequences in a fresh input.
///
/// `prior` would typically be the dictionary subsequences of an earlier
/// result for a similar document. Each subsequence is scanned for, swept to
/// non-overlapping positions, and kept when compressible in the new input.
pub fn warm_start(
    tokens: &[Token],
    prior: &[Vec<Token>],
    config: &CompressionConfig,
) -> Vec<Candidate> {
    let delta = config.delta();
    let mut candidates = Vec::new();

    for sub in prior {
        let len = sub.len();
        if len < config.min_len || len > config.max_len || tokens.len() < len {
            continue;
        }
        let positions: Vec<usize> = tokens
            .windows(len)
            .enumerate()
            .filter(|(_, w)| *w == sub.as_slice())
            .map(|(i, _)| i)
            .collect();
        let kept = non_overlapping_positions(&positions, len);
        if is_compressible(len, kept.len(), delta) {
            candidates.push(Candidate::new(sub.clone(), kept));
        }
    }

    candidates
}

/// Chunked discovery facade: discover per overlapping window, shift offsets,
/// and merge candidate sets by subsequence key.
///
/// Single-threaded and deterministic; callers that fan the windows out to
/// workers merge with the same semantics.
pub fn discover_chunked(
    tokens: &[Token],
    config: &CompressionConfig,
    chunk_size: usize,
    overlap: usize,
) -> Vec<Candidate> {
    if chunk_size == 0 || tokens.len() <= chunk_size {
        return discover(tokens, config);
    }
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut all = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + chunk_size).min(tokens.len());
        let chunk = &tokens[start..end];
        for mut candidate in discover(chunk, config) {
            for pos in &mut candidate.positions {
                *pos += start;
            }
            all.push(candidate);
        }
        if end == tokens.len() {
            break;
        }
        start += step;
    }

    finalize(all, config)
}
