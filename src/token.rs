//! Token model and compressibility arithmetic.
//!
//! Tokens are opaque `u32` identifiers supplied by an external tokenizer.
//! The engine reserves the top of the id space for its own markers:
//! length markers, the meta-token pool, and the dictionary delimiters.
//! Tokenizers must never emit ids at or above [`RESERVED_FLOOR`].

/// An opaque token identifier.
///
/// Compared by equality only; the engine assumes no ordering semantics
/// beyond what it imposes internally for suffix sorting.
pub type Token = u32;

/// First reserved id. Everything at or above this value belongs to the engine.
pub const RESERVED_FLOOR: Token = 0xFFFE_0000;

/// Base of the length-marker range: `LEN(k) = LEN_BASE + k`.
pub const LEN_BASE: Token = 0xFFFE_0000;

/// Base of the meta-token pool: the i-th meta-token is `META_BASE + i`.
pub const META_BASE: Token = 0xFFFF_0000;

/// Exclusive upper bound of the meta-token range.
///
/// Leaves the delimiter ids clear of any allocatable pool.
pub const META_LIMIT: Token = 0xFFFF_FF00;

/// Largest admissible `meta_pool_size`.
pub const META_POOL_LIMIT: usize = (META_LIMIT - META_BASE) as usize;

/// Opens the serialized dictionary section.
pub const DICT_START: Token = 0xFFFF_FFF0;

/// Closes the serialized dictionary section.
pub const DICT_END: Token = 0xFFFF_FFF1;

/// Emitted ahead of `DICT_START` when a static dictionary was applied.
pub const STATIC_MARKER: Token = 0xFFFF_FFF2;

/// Returns true if `token` lies in any engine-reserved range.
#[inline]
pub fn is_reserved(token: Token) -> bool {
    token >= RESERVED_FLOOR
}

/// Returns true if `token` is a meta-token (dynamic or static).
#[inline]
pub fn is_meta(token: Token) -> bool {
    (META_BASE..META_LIMIT).contains(&token)
}

/// Returns true if `token` is a length marker.
#[inline]
pub fn is_len_marker(token: Token) -> bool {
    (LEN_BASE..META_BASE).contains(&token)
}

/// The length marker for an entry of `len` tokens.
#[inline]
pub fn len_marker(len: usize) -> Token {
    LEN_BASE + len as Token
}

/// The entry length encoded by a length marker.
#[inline]
pub fn marker_len(marker: Token) -> usize {
    (marker - LEN_BASE) as usize
}

/// The i-th meta-token of the dynamic pool.
#[inline]
pub fn meta_token(index: usize) -> Token {
    META_BASE + index as Token
}

/// Whether a pattern of `len` tokens with `count` replaced occurrences
/// shrinks the stream.
///
/// The replaced occurrences cost `len * count` tokens in the original and
/// `count` meta-token references plus one dictionary entry
/// (`1 + len + delta` tokens, where `delta` is 1 when length markers are
/// enabled) in the output. Strict inequality: equality means no gain.
#[inline]
pub fn is_compressible(len: usize, count: usize, delta: usize) -> bool {
    if len < 2 || count == 0 {
        return false;
    }
    len * count > 1 + len + count + delta
}

/// Minimum occurrence count at which a pattern of `len` tokens becomes
/// compressible.
///
/// Derived from the inequality: `count * (len - 1) > 1 + len + delta`,
/// i.e. `count >= ceil((2 + len + delta) / (len - 1))`.
#[inline]
pub fn min_count(len: usize, delta: usize) -> usize {
    if len < 2 {
        return usize::MAX;
    }
    let numerator = 2 + len + delta;
    let denominator = len - 1;
    numerator.div_ceil(denominator)
}

/// Net token savings of replacing `count` occurrences of a `len`-token
/// pattern. Negative when the dictionary entry costs more than it saves.
#[inline]
pub fn pattern_savings(len: usize, count: usize, delta: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    (len as i64 - 1) * (count as i64 - 1) - (2 + delta as i64)
}
