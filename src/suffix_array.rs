//! Suffix array and LCP interval computation.
//!
//! The suffix array is built with prefix doubling (radix ranking on
//! `(rank[i], rank[i + k])` pairs), which is alphabet-independent and so
//! works for arbitrary 32-bit token ids. The LCP array uses Kasai's
//! amortized-height algorithm; repeated-pattern ranges are enumerated as
//! LCP intervals with a monotonic stack.

use crate::token::Token;
use ahash::AHashMap as HashMap;

/// Suffix array over a token sequence, with its LCP array.
#[derive(Debug, Clone)]
pub struct SuffixArray {
    /// `sa[i]` is the start offset of the i-th smallest suffix.
    pub sa: Vec<usize>,
    /// `lcp[i]` is the common-prefix length of suffixes `sa[i]` and
    /// `sa[i + 1]`; has `n - 1` entries.
    pub lcp: Vec<usize>,
}

/// A maximal run `[begin, end]` of suffix-array indices whose suffixes share
/// a common prefix of `len` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcpInterval {
    /// First suffix-array index of the run (inclusive).
    pub begin: usize,
    /// Last suffix-array index of the run (inclusive).
    pub end: usize,
    /// Shared prefix length, already truncated to the caller's maximum.
    pub len: usize,
}

impl LcpInterval {
    /// Number of suffixes in the run.
    #[inline]
    pub fn width(&self) -> usize {
        self.end - self.begin + 1
    }
}

impl SuffixArray {
    /// Builds the suffix array and LCP array for `tokens`.
    pub fn build(tokens: &[Token]) -> Self {
        let n = tokens.len();
        if n == 0 {
            return Self {
                sa: Vec::new(),
                lcp: Vec::new(),
            };
        }

        let mut rank = initial_ranks(tokens);
        let mut sa: Vec<usize> = (0..n).collect();
        let mut next_rank = vec![0usize; n];
        let mut k = 1usize;

        loop {
            let key = |i: usize| -> (usize, usize) {
                let second = if i + k < n { rank[i + k] } else { 0 };
                (rank[i], second)
            };

            sa.sort_unstable_by(|&a, &b| key(a).cmp(&key(b)));

            next_rank[sa[0]] = 1;
            for i in 1..n {
                let bump = usize::from(key(sa[i]) != key(sa[i - 1]));
                next_rank[sa[i]] = next_rank[sa[i - 1]] + bump;
            }
            rank.copy_from_slice(&next_rank);

            if rank[sa[n - 1]] == n {
                break;
            }
            k *= 2;
        }

        let lcp = kasai(tokens, &sa);
        Self { sa, lcp }
    }

    /// Enumerates LCP intervals with shared-prefix length at least `min_len`.
    ///
    /// Interval lengths are truncated to `max_len` on emission, so nested
    /// runs may repeat a truncated length; callers merge by pattern content.
    /// Inputs shorter than `min_len + 1` produce nothing.
    pub fn lcp_intervals(&self, min_len: usize, max_len: usize) -> Vec<LcpInterval> {
        if self.lcp.is_empty() || min_len > max_len {
            return Vec::new();
        }

        let mut intervals = Vec::new();
        // stack of (leftmost suffix-array index, lcp value)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for (i, &value) in self.lcp.iter().enumerate() {
            let mut left = i;
            while let Some(&(begin, top)) = stack.last() {
                if top <= value {
                    break;
                }
                stack.pop();
                if top >= min_len {
                    intervals.push(LcpInterval {
                        begin,
                        end: i,
                        len: top.min(max_len),
                    });
                }
                left = begin;
            }
            if stack.last().map_or(true, |&(_, top)| top < value) {
                stack.push((left, value));
            }
        }

        let n = self.lcp.len();
        while let Some((begin, top)) = stack.pop() {
            if top >= min_len {
                intervals.push(LcpInterval {
                    begin,
                    end: n,
                    len: top.min(max_len),
                });
            }
        }

        intervals
    }
}

/// Dense initial ranks (1-based so that 0 can stand for "past the end").
fn initial_ranks(tokens: &[Token]) -> Vec<usize> {
    let mut unique: Vec<Token> = tokens.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mapping: HashMap<Token, usize> = unique
        .into_iter()
        .enumerate()
        .map(|(i, t)| (t, i + 1))
        .collect();

    tokens.iter().map(|t| mapping[t]).collect()
}

/// Kasai's O(n) LCP construction.
fn kasai(tokens: &[Token], sa: &[usize]) -> Vec<usize> {
    let n = tokens.len();
    if n < 2 {
        return Vec::new();
    }

    let mut inverse = vec![0usize; n];
    for (i, &suffix) in sa.iter().enumerate() {
        inverse[suffix] = i;
    }

    let mut lcp = vec![0usize; n - 1];
    let mut h = 0usize;

    for i in 0..n {
        let pos = inverse[i];
        if pos == n - 1 {
            h = 0;
            continue;
        }
        let j = sa[pos + 1];
        while i + h < n && j + h < n && tokens[i + h] == tokens[j + h] {
            h += 1;
        }
        lcp[pos] = h;
        h = h.saturating_sub(1);
    }

    lcp
}
