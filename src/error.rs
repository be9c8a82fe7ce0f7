//! Error types for the tokzip crate.

use crate::token::Token;
use std::time::Duration;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by compression and decompression operations.
///
/// The engine never recovers internally: every failure propagates to the
/// caller and partial output is never exposed.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration fails validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input contains an id inside an engine-reserved range.
    #[error("input contains reserved token {token:#010x} at offset {offset}")]
    ReservedTokenInInput { token: Token, offset: usize },

    /// The dynamic meta-token pool ran out during dictionary construction.
    #[error("meta-token pool of {pool_size} exhausted")]
    CapacityExceeded { pool_size: usize },

    /// A compressed stream violates the wire format.
    #[error("malformed compressed stream: {0}")]
    MalformedCompressedStream(String),

    /// Round-trip verification found a mismatch. Fatal: the produced stream
    /// would decode to something other than the input.
    #[error("round-trip verification failed: {0}")]
    VerificationFailed(String),

    /// The configured deadline elapsed between stages.
    #[error("deadline of {deadline:?} elapsed during {stage}")]
    Timeout {
        deadline: Duration,
        stage: &'static str,
    },
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedCompressedStream(msg.into())
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}
