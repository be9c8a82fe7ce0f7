//! Compression engine.
//!
//! Orchestrates one or more passes of discovery → subsumption → selection →
//! dictionary construction → body substitution, then frames the result.
//! The engine is stateless: every operation gets a fresh meta-token pool
//! and owns all intermediate state.

use crate::candidate::Candidate;
use crate::config::CompressionConfig;
use crate::dictionary::{
    build_body, build_entries, entries_token_cost, order_entries, DictEntry, MetaAllocator,
};
use crate::discovery;
use crate::error::{Error, Result};
use crate::selection;
use crate::serialize;
use crate::subsume;
use crate::token::{is_meta, is_reserved, meta_token, Token};
use ahash::AHashMap as HashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Per-stage timing and counters for one compression operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetrics {
    /// Time spent discovering and pruning candidates (ms).
    pub discovery_ms: f64,
    /// Time spent selecting occurrences (ms).
    pub selection_ms: f64,
    /// Time spent building dictionary entries and bodies (ms).
    pub dictionary_ms: f64,
    /// Time spent framing and verifying (ms).
    pub serialization_ms: f64,
    /// Whole-operation wall time (ms).
    pub total_ms: f64,
    /// Candidates surviving subsumption, summed over passes.
    pub candidates_discovered: usize,
    /// Patterns that made it into the dictionary.
    pub candidates_selected: usize,
    /// Number of committed passes.
    pub passes: usize,
}

/// Immutable outcome of a compression operation.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// The input, untouched.
    pub original: Vec<Token>,
    /// The final working sequence with meta-token substitutions.
    pub body: Vec<Token>,
    /// Framed output: dictionary section followed by the body.
    pub serialized: Vec<Token>,
    /// Every meta-token the stream may reference, including static entries.
    pub dictionary_map: HashMap<Token, Vec<Token>>,
    /// Length of `original`.
    pub original_length: usize,
    /// Length of `serialized`.
    pub compressed_length: usize,
    /// Stage timing and counters.
    pub metrics: CompressionMetrics,
    /// Id of the static dictionary, when one was applied.
    pub static_dictionary_id: Option<String>,
}

impl CompressionResult {
    /// Compressed-to-original length ratio; 1.0 for empty input.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_length == 0 {
            return 1.0;
        }
        self.compressed_length as f64 / self.original_length as f64
    }

    /// Tokens removed by compression. Never negative.
    pub fn tokens_saved(&self) -> usize {
        self.original_length.saturating_sub(self.compressed_length)
    }

    /// The dictionary subsequences of this result, suitable for seeding
    /// [`Compressor::compress_with_warm_start`] on a similar input.
    ///
    /// Sorted for determinism; hierarchical entries are returned as stored,
    /// meta-token references included.
    pub fn dictionary_subsequences(&self) -> Vec<Vec<Token>> {
        let mut subs: Vec<Vec<Token>> = self.dictionary_map.values().cloned().collect();
        subs.sort();
        subs
    }

    /// Re-runs the round-trip check on this result.
    pub fn self_test(&self, config: &CompressionConfig) -> bool {
        serialize::decompress_with(&self.serialized, config, Some(&self.dictionary_map))
            .map(|restored| restored == self.original)
            .unwrap_or(false)
    }

    /// Result for an input the engine leaves unchanged.
    fn passthrough(tokens: Vec<Token>, metrics: CompressionMetrics) -> Self {
        let len = tokens.len();
        Self {
            original: tokens.clone(),
            body: tokens.clone(),
            serialized: tokens,
            dictionary_map: HashMap::new(),
            original_length: len,
            compressed_length: len,
            metrics,
            static_dictionary_id: None,
        }
    }
}

/// Scores candidates before selection; contributions are summed into
/// [`Candidate::priority`].
pub trait PriorityProvider {
    fn score(&self, candidate: &Candidate, tokens: &[Token]) -> i32;
}

/// An immutable meta-token → subsequence map applied before dynamic
/// discovery.
///
/// Static ids live above the dynamic pool (`meta_pool_size` and up), so the
/// two can never collide within an operation.
#[derive(Debug, Clone)]
pub struct StaticDictionary {
    /// Identifier recorded on results that used this dictionary.
    pub id: String,
    /// Entries, longest subsequence first after validation.
    entries: Vec<(Token, Vec<Token>)>,
}

impl StaticDictionary {
    /// Validates and builds a static dictionary under `config`.
    pub fn new(
        id: impl Into<String>,
        entries: Vec<(Token, Vec<Token>)>,
        config: &CompressionConfig,
    ) -> Result<Self> {
        let floor = meta_token(config.meta_pool_size);
        for (meta, sub) in &entries {
            if !is_meta(*meta) || *meta < floor {
                return Err(Error::invalid_config(format!(
                    "static meta-token {meta:#010x} collides with the dynamic pool"
                )));
            }
            if sub.is_empty() {
                return Err(Error::invalid_config(
                    "static dictionary entry with empty subsequence",
                ));
            }
            if sub.iter().any(|&t| is_reserved(t)) {
                return Err(Error::invalid_config(
                    "static dictionary subsequence contains a reserved token",
                ));
            }
        }
        let mut entries = entries;
        entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
        Ok(Self {
            id: id.into(),
            entries,
        })
    }

    /// Greedy left-to-right substitution, longest entry first at each
    /// offset. Returns the rewritten sequence and whether anything matched.
    fn substitute(&self, tokens: &[Token]) -> (Vec<Token>, bool) {
        let mut out = Vec::with_capacity(tokens.len());
        let mut applied = false;
        let mut cursor = 0;
        while cursor < tokens.len() {
            let hit = self.entries.iter().find(|(_, sub)| {
                tokens[cursor..]
                    .get(..sub.len())
                    .is_some_and(|w| w == sub.as_slice())
            });
            match hit {
                Some((meta, sub)) => {
                    out.push(*meta);
                    cursor += sub.len();
                    applied = true;
                }
                None => {
                    out.push(tokens[cursor]);
                    cursor += 1;
                }
            }
        }
        (out, applied)
    }

    fn entry_map(&self) -> HashMap<Token, Vec<Token>> {
        self.entries.iter().cloned().collect()
    }
}

/// The compression engine.
///
/// Holds a validated configuration plus the optional collaborators: priority
/// providers and a static dictionary. A single instance can serve any number
/// of operations; nothing is shared between calls.
///
/// # Example
///
/// ```
/// use tokzip::{Compressor, CompressionConfig};
///
/// let engine = Compressor::new(CompressionConfig::default()).unwrap();
/// let tokens: Vec<u32> = [7, 8, 9].repeat(6);
/// let result = engine.compress(&tokens).unwrap();
/// assert!(result.self_test(engine.config()));
/// ```
pub struct Compressor {
    config: CompressionConfig,
    providers: Vec<Box<dyn PriorityProvider>>,
    static_dict: Option<StaticDictionary>,
}

impl Compressor {
    /// Builds an engine, validating the configuration up front.
    pub fn new(config: CompressionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            providers: Vec::new(),
            static_dict: None,
        })
    }

    /// Registers a priority provider consulted before selection.
    pub fn with_priority_provider(mut self, provider: Box<dyn PriorityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Installs a static dictionary applied ahead of dynamic discovery.
    pub fn with_static_dictionary(mut self, dict: StaticDictionary) -> Self {
        self.static_dict = Some(dict);
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compresses a token sequence.
    pub fn compress(&self, tokens: &[Token]) -> Result<CompressionResult> {
        self.compress_with_warm_start(tokens, &[])
    }

    /// Compresses a token sequence, seeding discovery with subsequences that
    /// proved useful on earlier, similar inputs.
    pub fn compress_with_warm_start(
        &self,
        tokens: &[Token],
        prior: &[Vec<Token>],
    ) -> Result<CompressionResult> {
        let started = Instant::now();
        let mut metrics = CompressionMetrics::default();

        if let Some((offset, &token)) = tokens.iter().enumerate().find(|(_, &t)| is_reserved(t)) {
            return Err(Error::ReservedTokenInInput {
                token,
                offset,
            });
        }

        if tokens.is_empty() {
            metrics.total_ms = ms_since(started);
            return Ok(CompressionResult::passthrough(Vec::new(), metrics));
        }

        // static pre-substitution
        let (mut working, static_applied) = match &self.static_dict {
            Some(dict) => dict.substitute(tokens),
            None => (tokens.to_vec(), false),
        };

        let mut allocator = MetaAllocator::new(self.config.meta_pool_size);
        let mut entries: Vec<DictEntry> = Vec::new();
        let depth_limit = if self.config.hierarchical_enabled {
            self.config.max_depth
        } else {
            1
        };

        for depth in 0..depth_limit {
            self.check_deadline(started, "discovery")?;
            let stage = Instant::now();
            let mut candidates = discovery::discover(&working, &self.config);
            if depth == 0 && !prior.is_empty() {
                let seeded = discovery::warm_start(&working, prior, &self.config);
                candidates.extend(seeded);
                candidates = discovery::finalize(candidates, &self.config);
            }
            for candidate in &mut candidates {
                for provider in &self.providers {
                    candidate.priority += provider.score(candidate, &working);
                }
            }
            let candidates = subsume::prune(candidates, &self.config);
            metrics.discovery_ms += ms_since(stage);
            metrics.candidates_discovered += candidates.len();

            if candidates.is_empty() {
                debug!("pass {depth}: no candidates, stopping");
                break;
            }

            self.check_deadline(started, "selection")?;
            let stage = Instant::now();
            let selection = selection::select(&candidates, &self.config);
            metrics.selection_ms += ms_since(stage);

            if selection.is_empty() || selection.savings <= 0 {
                debug!("pass {depth}: no beneficial selection, stopping");
                break;
            }

            self.check_deadline(started, "dictionary")?;
            let stage = Instant::now();
            let (pass_entries, pattern_to_meta) =
                build_entries(&selection, &mut allocator, depth)?;
            let new_body = build_body(&working, &selection.occurrences, &pattern_to_meta);
            metrics.dictionary_ms += ms_since(stage);

            let body_saved = working.len() as i64 - new_body.len() as i64;
            let dict_growth = entries_token_cost(&pass_entries, self.config.delta()) as i64;
            if dict_growth - body_saved > self.config.efficiency_margin {
                debug!(
                    "pass {depth}: dictionary growth {dict_growth} outweighs body savings {body_saved}, stopping"
                );
                break;
            }

            let improvement = body_saved as f64 / working.len() as f64;
            debug!(
                "pass {depth}: {} entries, body {} -> {} ({improvement:.3} improvement)",
                pass_entries.len(),
                working.len(),
                new_body.len()
            );

            metrics.candidates_selected += pass_entries.len();
            metrics.passes += 1;
            entries.extend(pass_entries);
            working = new_body;

            if improvement < self.config.min_improvement {
                debug!("pass {depth}: improvement below threshold, stopping");
                break;
            }
        }

        self.check_deadline(started, "serialization")?;
        let stage = Instant::now();

        if entries.is_empty() && !static_applied {
            metrics.serialization_ms = ms_since(stage);
            metrics.total_ms = ms_since(started);
            return Ok(CompressionResult::passthrough(tokens.to_vec(), metrics));
        }

        let entries = order_entries(entries, self.config.meta_pool_size)?;
        let serialized = serialize::serialize(&entries, &working, static_applied, &self.config);

        // non-expansion guarantee
        if serialized.len() >= tokens.len() {
            metrics.serialization_ms = ms_since(stage);
            metrics.total_ms = ms_since(started);
            return Ok(CompressionResult::passthrough(tokens.to_vec(), metrics));
        }

        let mut dictionary_map: HashMap<Token, Vec<Token>> = entries
            .iter()
            .map(|e| (e.meta, e.sub.clone()))
            .collect();
        if static_applied {
            if let Some(dict) = &self.static_dict {
                dictionary_map.extend(dict.entry_map());
            }
        }

        if self.config.verify {
            let restored =
                serialize::decompress_with(&serialized, &self.config, Some(&dictionary_map))?;
            if restored != tokens {
                return Err(Error::VerificationFailed(format!(
                    "round trip produced {} tokens, expected {}",
                    restored.len(),
                    tokens.len()
                )));
            }
        }

        metrics.serialization_ms = ms_since(stage);
        metrics.total_ms = ms_since(started);

        Ok(CompressionResult {
            original: tokens.to_vec(),
            body: working,
            compressed_length: serialized.len(),
            serialized,
            dictionary_map,
            original_length: tokens.len(),
            metrics,
            static_dictionary_id: static_applied
                .then(|| self.static_dict.as_ref().map(|d| d.id.clone()))
                .flatten(),
        })
    }

    fn check_deadline(&self, started: Instant, stage: &'static str) -> Result<()> {
        if let Some(deadline) = self.config.deadline {
            if started.elapsed() >= deadline {
                return Err(Error::Timeout { deadline, stage });
            }
        }
        Ok(())
    }
}

fn ms_since(instant: Instant) -> f64 {
    instant.elapsed().as_secs_f64() * 1000.0
}
