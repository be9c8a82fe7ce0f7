//! # tokzip - Lossless Token Sequence Compression
//!
//! Compresses sequences of opaque integer tokens by replacing repeated
//! subsequences with single meta-tokens backed by a prefixed dictionary.
//! The main use is shrinking prompts before they reach a large language
//! model while keeping a format the model (or anyone else) can invert
//! exactly.
//!
//! A compressed stream is laid out as
//! `DICT_START (meta len sub…)* DICT_END body…`, where the body is the
//! input with selected occurrences collapsed to meta-token references.
//! Decompression parses the dictionary and recursively expands the body.
//!
//! ## Example
//!
//! ```
//! use tokzip::{compress, decompress, CompressionConfig};
//!
//! let tokens: Vec<u32> = [1, 2, 3].repeat(5);
//! let config = CompressionConfig::default();
//!
//! let result = compress(&tokens, &config).unwrap();
//! assert!(result.compressed_length <= result.original_length);
//!
//! let restored = decompress(&result.serialized, &config).unwrap();
//! assert_eq!(restored, tokens);
//! ```
//!
//! ## Guarantees
//!
//! - **Lossless**: decompression restores the input token-for-token.
//! - **Never expands**: when no substitution is a net win the input comes
//!   back unchanged.
//! - **Deterministic**: identical input and configuration produce identical
//!   output; all orderings use stable total orders.
//!
//! The engine is single-threaded, performs no I/O, and shares no state
//! between operations.

pub mod candidate;
pub mod config;
pub mod dictionary;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod selection;
pub mod serialize;
pub mod subsume;
pub mod suffix_array;
pub mod token;
pub mod verify;

#[cfg(test)]
mod tests;

pub use candidate::{Candidate, Occurrence};
pub use config::{CompressionConfig, DiscoveryMode, SelectionMode};
pub use engine::{
    CompressionMetrics, CompressionResult, Compressor, PriorityProvider, StaticDictionary,
};
pub use error::{Error, Result};
pub use token::Token;

/// Compresses a token sequence under `config`.
pub fn compress(tokens: &[Token], config: &CompressionConfig) -> Result<CompressionResult> {
    Compressor::new(config.clone())?.compress(tokens)
}

/// Decompresses a serialized stream produced by [`compress`].
///
/// Works for hierarchical and single-pass streams alike; a stream with no
/// dictionary section decodes to itself.
pub fn decompress(tokens: &[Token], config: &CompressionConfig) -> Result<Vec<Token>> {
    config.validate()?;
    serialize::decompress(tokens, config)
}

/// Discovers candidate patterns without compressing, for inspection or for
/// building static dictionaries.
pub fn discover_patterns(
    tokens: &[Token],
    min_len: usize,
    max_len: usize,
) -> Result<Vec<Candidate>> {
    let config = CompressionConfig {
        min_len,
        max_len,
        ..CompressionConfig::default()
    };
    config.validate()?;
    Ok(discovery::discover(tokens, &config))
}

/// Checks that `result` faithfully encodes `tokens` under `config`.
pub fn verify_result(
    tokens: &[Token],
    result: &CompressionResult,
    config: &CompressionConfig,
) -> bool {
    verify::verify(tokens, result, config)
}
