//! Dictionary construction and body substitution.
//!
//! Selected occurrences are grouped by pattern, each pattern is assigned the
//! next meta-token from the operation's pool, and the body is rebuilt with
//! occurrences collapsed to single meta-token references. Entries carry a
//! generation number (the pass that created them); an entry may only
//! reference meta-tokens from strictly lower generations, which keeps the
//! reference graph a DAG by construction.

use crate::candidate::Occurrence;
use crate::error::{Error, Result};
use crate::selection::Selection;
use crate::token::{is_meta, meta_token, Token};
use ahash::AHashMap as HashMap;

/// One dictionary entry: a meta-token and the subsequence it denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    /// The allocated meta-token.
    pub meta: Token,
    /// The subsequence the meta-token expands to. May itself contain
    /// meta-tokens from earlier generations.
    pub sub: Vec<Token>,
    /// The hierarchical pass that created this entry.
    pub generation: usize,
}

/// Operation-scoped meta-token allocator.
///
/// Fresh per compression call; ids grow upward from the pool base so entry
/// order equals allocation order.
#[derive(Debug)]
pub struct MetaAllocator {
    next: usize,
    pool_size: usize,
}

impl MetaAllocator {
    pub fn new(pool_size: usize) -> Self {
        Self { next: 0, pool_size }
    }

    /// Allocates the next meta-token, failing when the pool is exhausted.
    pub fn allocate(&mut self) -> Result<Token> {
        if self.next >= self.pool_size {
            return Err(Error::CapacityExceeded {
                pool_size: self.pool_size,
            });
        }
        let token = meta_token(self.next);
        self.next += 1;
        Ok(token)
    }

    /// Number of meta-tokens handed out so far.
    pub fn allocated(&self) -> usize {
        self.next
    }
}

/// Builds dictionary entries for one pass.
///
/// Patterns are assigned meta-tokens in order of their first selected
/// occurrence, which makes allocation deterministic for a deterministic
/// selection. Returns the entries and the pattern → meta-token mapping used
/// for body substitution.
pub fn build_entries(
    selection: &Selection,
    allocator: &mut MetaAllocator,
    generation: usize,
) -> Result<(Vec<DictEntry>, HashMap<Vec<Token>, Token>)> {
    let mut entries = Vec::new();
    let mut pattern_to_meta: HashMap<Vec<Token>, Token> = HashMap::new();

    for occ in &selection.occurrences {
        if pattern_to_meta.contains_key(&occ.sub) {
            continue;
        }
        let meta = allocator.allocate()?;
        pattern_to_meta.insert(occ.sub.clone(), meta);
        entries.push(DictEntry {
            meta,
            sub: occ.sub.clone(),
            generation,
        });
    }

    Ok((entries, pattern_to_meta))
}

/// Rebuilds the working sequence with selected occurrences collapsed to
/// their meta-tokens.
///
/// The walk is a single left-to-right cursor; the selection's non-overlap
/// invariant makes it deterministic.
pub fn build_body(
    tokens: &[Token],
    occurrences: &[Occurrence],
    pattern_to_meta: &HashMap<Vec<Token>, Token>,
) -> Vec<Token> {
    let mut replacement_at: HashMap<usize, (usize, Token)> = HashMap::new();
    for occ in occurrences {
        if let Some(&meta) = pattern_to_meta.get(&occ.sub) {
            replacement_at.insert(occ.start, (occ.len, meta));
        }
    }

    let mut body = Vec::with_capacity(tokens.len());
    let mut cursor = 0;
    while cursor < tokens.len() {
        match replacement_at.get(&cursor) {
            Some(&(len, meta)) => {
                body.push(meta);
                cursor += len;
            }
            None => {
                body.push(tokens[cursor]);
                cursor += 1;
            }
        }
    }
    body
}

/// Serialized token footprint of an entry set (meta id, optional length
/// marker, and the subsequence, per entry).
pub fn entries_token_cost(entries: &[DictEntry], delta: usize) -> usize {
    entries.iter().map(|e| 1 + delta + e.sub.len()).sum()
}

/// Orders entries dependencies-first and checks the DAG invariant.
///
/// Meta ids are allocated in increasing order across passes and an entry may
/// only reference lower-generation (hence lower-id) metas, so ascending id
/// order is a topological order. References at or above `pool_size` belong
/// to a static dictionary and are defined externally; any other reference
/// that is undefined or does not point strictly backward is rejected.
pub fn order_entries(mut entries: Vec<DictEntry>, pool_size: usize) -> Result<Vec<DictEntry>> {
    entries.sort_by_key(|e| e.meta);

    let static_floor = meta_token(pool_size);
    let mut defined: HashMap<Token, usize> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if defined.insert(entry.meta, i).is_some() {
            return Err(Error::malformed(format!(
                "duplicate dictionary entry for meta-token {:#010x}",
                entry.meta
            )));
        }
    }

    for (i, entry) in entries.iter().enumerate() {
        for &t in &entry.sub {
            if !is_meta(t) || t >= static_floor {
                continue;
            }
            match defined.get(&t) {
                Some(&j) if j < i => {}
                Some(_) => {
                    return Err(Error::malformed(format!(
                        "dictionary entry {:#010x} references a non-earlier meta-token {t:#010x}",
                        entry.meta
                    )))
                }
                None => {
                    return Err(Error::malformed(format!(
                        "dictionary entry {:#010x} references undefined meta-token {t:#010x}",
                        entry.meta
                    )))
                }
            }
        }
    }

    Ok(entries)
}
