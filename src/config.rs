//! Compression configuration.
//!
//! A [`CompressionConfig`] is read once at the start of an operation and
//! never mutated. Every public entry point validates it before doing any
//! work, so an invalid combination fails fast with
//! [`Error::InvalidConfig`](crate::Error::InvalidConfig).

use crate::error::{Error, Result};
use crate::token::{min_count, LEN_BASE, META_BASE, META_POOL_LIMIT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Pattern discovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMode {
    /// Suffix array + LCP intervals. The default; finds all repeat lengths
    /// in one pass.
    SuffixArray,
    /// Hash-grouped fixed-length windows, one sweep per length.
    SlidingWindow,
    /// Iterative best-pair merging in the style of byte-pair encoding.
    Bpe,
}

impl FromStr for DiscoveryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "suffix-array" => Ok(DiscoveryMode::SuffixArray),
            "sliding-window" => Ok(DiscoveryMode::SlidingWindow),
            "bpe" => Ok(DiscoveryMode::Bpe),
            other => Err(Error::invalid_config(format!(
                "unknown discovery mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscoveryMode::SuffixArray => "suffix-array",
            DiscoveryMode::SlidingWindow => "sliding-window",
            DiscoveryMode::Bpe => "bpe",
        };
        f.write_str(name)
    }
}

/// Occurrence selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Savings-density greedy sweep with quota refinement.
    Greedy,
    /// Weighted interval scheduling by dynamic programming.
    Optimal,
    /// Beam search over take/skip decisions.
    Beam,
}

impl FromStr for SelectionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "greedy" => Ok(SelectionMode::Greedy),
            "optimal" => Ok(SelectionMode::Optimal),
            "beam" => Ok(SelectionMode::Beam),
            other => Err(Error::invalid_config(format!(
                "unknown selection mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionMode::Greedy => "greedy",
            SelectionMode::Optimal => "optimal",
            SelectionMode::Beam => "beam",
        };
        f.write_str(name)
    }
}

/// Frozen configuration record for one compression operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Minimum pattern length considered (inclusive).
    pub min_len: usize,
    /// Maximum pattern length considered (inclusive).
    pub max_len: usize,
    /// Discovery strategy.
    pub discovery: DiscoveryMode,
    /// Selection strategy.
    pub selection: SelectionMode,
    /// Beam width for [`SelectionMode::Beam`].
    pub beam_width: usize,
    /// Allow multiple compression passes over the body.
    pub hierarchical_enabled: bool,
    /// Maximum number of passes.
    pub max_depth: usize,
    /// Early-stop threshold on the per-pass length reduction fraction.
    pub min_improvement: f64,
    /// Embed a length marker at the start of each dictionary entry.
    pub length_markers_enabled: bool,
    /// Maximum meta-tokens allocatable per operation.
    pub meta_pool_size: usize,
    /// Assert round-trip equality at the end of the operation.
    pub verify: bool,
    /// Independent-position threshold for subsumed candidates. `None` uses
    /// the pattern's own compressibility minimum.
    pub min_independent: Option<usize>,
    /// Extra tolerance (in tokens) before a pass is rejected for growing
    /// the dictionary faster than it shrinks the body.
    pub efficiency_margin: i64,
    /// Optional wall-clock budget, polled between stages.
    pub deadline: Option<Duration>,
    /// Iteration cap for the BPE discovery strategy.
    pub bpe_max_merges: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_len: 2,
            max_len: 8,
            discovery: DiscoveryMode::SuffixArray,
            selection: SelectionMode::Greedy,
            beam_width: 8,
            hierarchical_enabled: true,
            max_depth: 3,
            min_improvement: 0.02,
            length_markers_enabled: true,
            meta_pool_size: 500,
            verify: false,
            min_independent: None,
            efficiency_margin: 0,
            deadline: None,
            bpe_max_merges: 256,
        }
    }
}

impl CompressionConfig {
    /// Per-entry overhead added by the length marker.
    #[inline]
    pub fn delta(&self) -> usize {
        usize::from(self.length_markers_enabled)
    }

    /// Minimum occurrence count for a pattern of `len` tokens under this
    /// configuration.
    #[inline]
    pub fn min_count_for(&self, len: usize) -> usize {
        min_count(len, self.delta())
    }

    /// Checks the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.min_len < 2 {
            return Err(Error::invalid_config(format!(
                "min_len must be at least 2, got {}",
                self.min_len
            )));
        }
        if self.max_len < self.min_len {
            return Err(Error::invalid_config(format!(
                "max_len ({}) must not be below min_len ({})",
                self.max_len, self.min_len
            )));
        }
        if self.max_len >= (META_BASE - LEN_BASE) as usize {
            return Err(Error::invalid_config(format!(
                "max_len ({}) exceeds the length-marker range",
                self.max_len
            )));
        }
        if self.beam_width == 0 {
            return Err(Error::invalid_config("beam_width must be positive"));
        }
        if self.meta_pool_size == 0 {
            return Err(Error::invalid_config("meta_pool_size must be positive"));
        }
        if self.meta_pool_size > META_POOL_LIMIT {
            return Err(Error::invalid_config(format!(
                "meta_pool_size ({}) exceeds the reserved pool range ({})",
                self.meta_pool_size, META_POOL_LIMIT
            )));
        }
        if self.max_depth == 0 {
            return Err(Error::invalid_config("max_depth must be positive"));
        }
        if !self.min_improvement.is_finite() || self.min_improvement < 0.0 {
            return Err(Error::invalid_config(format!(
                "min_improvement must be a non-negative finite fraction, got {}",
                self.min_improvement
            )));
        }
        if !self.length_markers_enabled && self.hierarchical_enabled {
            // Marker-free entries are delimited by the next meta-token, so
            // entry bodies cannot themselves contain meta references.
            return Err(Error::invalid_config(
                "hierarchical compression requires length markers",
            ));
        }
        Ok(())
    }
}
