//! Round-trip verification.
//!
//! The lossless invariant is checked by decompressing a produced stream and
//! comparing token-by-token with the original. The engine consults this
//! predicate as an internal gate when `verify` is set; it is also public so
//! callers can audit any result after the fact.

use crate::config::CompressionConfig;
use crate::engine::CompressionResult;
use crate::serialize;
use crate::token::Token;

/// Returns true if `result`'s serialized stream decodes exactly to
/// `original`.
///
/// Malformed streams verify as false rather than erroring; a result that
/// cannot be decoded is by definition not a faithful encoding.
pub fn verify(original: &[Token], result: &CompressionResult, config: &CompressionConfig) -> bool {
    serialize::decompress_with(&result.serialized, config, Some(&result.dictionary_map))
        .map(|restored| restored == original)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Compressor;

    #[test]
    fn test_verify_accepts_faithful_result() {
        let tokens: Vec<Token> = [1, 2, 3].repeat(6);
        let config = CompressionConfig::default();
        let result = Compressor::new(config.clone())
            .unwrap()
            .compress(&tokens)
            .unwrap();
        assert!(verify(&tokens, &result, &config));
    }

    #[test]
    fn test_verify_rejects_corrupted_body() {
        let tokens: Vec<Token> = [1, 2, 3].repeat(6);
        let config = CompressionConfig::default();
        let mut result = Compressor::new(config.clone())
            .unwrap()
            .compress(&tokens)
            .unwrap();

        // flip one trailing body token
        let last = result.serialized.len() - 1;
        result.serialized[last] ^= 1;
        assert!(!verify(&tokens, &result, &config));
    }

    #[test]
    fn test_verify_rejects_wrong_original() {
        let tokens: Vec<Token> = [1, 2, 3].repeat(6);
        let config = CompressionConfig::default();
        let result = Compressor::new(config.clone())
            .unwrap()
            .compress(&tokens)
            .unwrap();
        let mut other = tokens.clone();
        other.push(4);
        assert!(!verify(&other, &result, &config));
    }
}
