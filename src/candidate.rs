//! Candidate patterns and their occurrences.

use crate::token::Token;
use ahash::AHashMap as HashMap;

/// A repeated subsequence together with a non-overlapping set of start
/// positions in the working sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The token subsequence this pattern stands for.
    pub sub: Vec<Token>,
    /// Length of `sub`.
    pub len: usize,
    /// Strictly ascending, pairwise non-overlapping start offsets.
    pub positions: Vec<usize>,
    /// Signed tie-break hint; external scorers may adjust it.
    pub priority: i32,
}

impl Candidate {
    /// Creates a candidate. `positions` must be ascending and
    /// non-overlapping for `sub.len()`.
    pub fn new(sub: Vec<Token>, positions: Vec<usize>) -> Self {
        let len = sub.len();
        debug_assert!(len >= 2, "candidate patterns are at least two tokens");
        debug_assert!(
            positions.windows(2).all(|w| w[1] >= w[0] + len),
            "candidate positions must be ascending and non-overlapping"
        );
        Self {
            sub,
            len,
            positions,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Number of recorded occurrences.
    #[inline]
    pub fn count(&self) -> usize {
        self.positions.len()
    }
}

/// One concrete placement of a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Start offset in the working sequence.
    pub start: usize,
    /// Pattern length.
    pub len: usize,
    /// The pattern subsequence.
    pub sub: Vec<Token>,
    /// Tie-break hint inherited from the candidate.
    pub priority: i32,
}

impl Occurrence {
    /// One past the last covered offset.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether this occurrence shares any offset with `other`.
    #[inline]
    pub fn overlaps(&self, other: &Occurrence) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Greedy left-to-right sweep keeping a maximal non-overlapping subset of
/// sorted positions for a pattern of `len` tokens.
pub fn non_overlapping_positions(sorted_positions: &[usize], len: usize) -> Vec<usize> {
    let mut kept = Vec::with_capacity(sorted_positions.len());
    let mut next_free = 0usize;
    for &pos in sorted_positions {
        if pos >= next_free {
            kept.push(pos);
            next_free = pos + len;
        }
    }
    kept
}

/// Merges candidates with identical subsequences.
///
/// Positions are unioned, de-duplicated, and re-swept for overlap; the
/// priority of a merged candidate is the maximum over its sources. Order of
/// first appearance is preserved, keeping the result deterministic.
pub fn merge_duplicates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut index: HashMap<Vec<Token>, usize> = HashMap::new();
    let mut merged: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match index.get(&candidate.sub) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.positions.extend(&candidate.positions);
                existing.priority = existing.priority.max(candidate.priority);
            }
            None => {
                index.insert(candidate.sub.clone(), merged.len());
                merged.push(candidate);
            }
        }
    }

    for candidate in &mut merged {
        candidate.positions.sort_unstable();
        candidate.positions.dedup();
        candidate.positions = non_overlapping_positions(&candidate.positions, candidate.len);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_count() {
        let c = Candidate::new(vec![1, 2, 3], vec![0, 3, 9]);
        assert_eq!(c.len, 3);
        assert_eq!(c.count(), 3);
        assert_eq!(c.priority, 0);
        assert_eq!(c.with_priority(2).priority, 2);
    }

    #[test]
    fn test_occurrence_end_and_overlap() {
        let a = Occurrence {
            start: 4,
            len: 3,
            sub: vec![1, 2, 3],
            priority: 0,
        };
        let b = Occurrence {
            start: 6,
            len: 2,
            sub: vec![3, 4],
            priority: 0,
        };
        let c = Occurrence {
            start: 7,
            len: 2,
            sub: vec![9, 9],
            priority: 0,
        };
        assert_eq!(a.end(), 7);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_non_overlapping_sweep() {
        assert_eq!(non_overlapping_positions(&[0, 1, 2, 5, 6, 10], 3), vec![0, 5, 10]);
        assert_eq!(non_overlapping_positions(&[0, 2, 4, 6, 8], 2), vec![0, 2, 4, 6, 8]);
        assert_eq!(non_overlapping_positions(&[], 2), Vec::<usize>::new());
    }

    #[test]
    fn test_merge_duplicates_unions_positions() {
        let c1 = Candidate::new(vec![1, 2], vec![0, 4, 8]);
        let c2 = Candidate::new(vec![1, 2], vec![2, 6, 10]).with_priority(3);
        let c3 = Candidate::new(vec![3, 4], vec![1, 5]);

        let merged = merge_duplicates(vec![c1, c2, c3]);
        assert_eq!(merged.len(), 2);

        let m = &merged[0];
        assert_eq!(m.sub, vec![1, 2]);
        // union {0,2,4,6,8,10} is already non-overlapping at length 2
        assert_eq!(m.positions, vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(m.priority, 3);
    }

    #[test]
    fn test_merge_duplicates_resweeps_overlap() {
        let c1 = Candidate::new(vec![7, 7, 7], vec![0, 6]);
        let c2 = Candidate::new(vec![7, 7, 7], vec![1, 9]);
        let merged = merge_duplicates(vec![c1, c2]);
        assert_eq!(merged.len(), 1);
        // {0,1,6,9} sweeps to {0,6,9}
        assert_eq!(merged[0].positions, vec![0, 6, 9]);
    }
}
