//! End-to-end scenarios with literal inputs.

use crate::config::{CompressionConfig, SelectionMode};
use crate::token::{is_meta, Token, DICT_END, DICT_START, META_BASE};
use crate::{compress, decompress, verify_result, Compressor, Error};

fn repeat(pattern: &[Token], times: usize) -> Vec<Token> {
    pattern
        .iter()
        .cycle()
        .take(pattern.len() * times)
        .copied()
        .collect()
}

/// Simple repetition: five copies of (1, 2, 3) collapse to one dictionary
/// entry and a five-token body.
#[test]
fn test_simple_repetition() {
    let tokens = repeat(&[1, 2, 3], 5);
    assert_eq!(tokens.len(), 15);

    let config = CompressionConfig::default();
    let result = compress(&tokens, &config).unwrap();

    assert_eq!(result.dictionary_map.len(), 1);
    let (meta, sub) = result.dictionary_map.iter().next().unwrap();
    assert_eq!(*meta, META_BASE);
    assert_eq!(sub, &vec![1, 2, 3]);

    assert_eq!(result.body, vec![META_BASE; 5]);
    // DICT_START, meta, len, 1, 2, 3, DICT_END, body x5
    assert_eq!(result.compressed_length, 12);

    assert_eq!(decompress(&result.serialized, &config).unwrap(), tokens);
}

/// No compressible pattern: one hundred unique tokens pass through
/// untouched.
#[test]
fn test_no_compressible_pattern() {
    let tokens: Vec<Token> = (0..100).collect();
    let config = CompressionConfig::default();
    let result = compress(&tokens, &config).unwrap();

    assert_eq!(result.serialized, tokens);
    assert!(result.dictionary_map.is_empty());
    assert_eq!(result.compression_ratio(), 1.0);
}

/// Single token input.
#[test]
fn test_single_token() {
    let config = CompressionConfig::default();
    let result = compress(&[42], &config).unwrap();
    assert_eq!(result.serialized, vec![42]);
    assert_eq!(result.compression_ratio(), 1.0);
    assert_eq!(decompress(&result.serialized, &config).unwrap(), vec![42]);
}

/// Two overlapping pattern families: `1 2 3 4 | 1 2 3 | 1 2 3 4 | 1 2 3`.
/// The only selection with positive savings keeps the longest repeat, the
/// seven-token half of the input, twice.
#[test]
fn test_overlapping_candidates() {
    let tokens = vec![1, 2, 3, 4, 1, 2, 3, 1, 2, 3, 4, 1, 2, 3];
    for selection in [SelectionMode::Optimal, SelectionMode::Greedy] {
        let config = CompressionConfig {
            selection,
            ..Default::default()
        };
        let result = compress(&tokens, &config).unwrap();

        assert_eq!(result.dictionary_map.len(), 1, "{selection}");
        let sub = result.dictionary_map.values().next().unwrap();
        assert_eq!(sub, &vec![1, 2, 3, 4, 1, 2, 3], "{selection}");
        assert_eq!(result.body, vec![META_BASE, META_BASE], "{selection}");
        assert_eq!(result.compressed_length, 13, "{selection}");
        assert_eq!(decompress(&result.serialized, &config).unwrap(), tokens);
    }
}

/// Hierarchical compression: `(X Y X Y Z)` repeats fold twice, the second
/// pass referencing the first pass's meta-token.
#[test]
fn test_hierarchical_two_generations() {
    let tokens = repeat(&[11, 22, 11, 22, 33], 12);
    let config = CompressionConfig {
        min_improvement: 0.0,
        ..Default::default()
    };
    let result = compress(&tokens, &config).unwrap();

    assert!(result.metrics.passes >= 2);
    assert!(result.dictionary_map.len() >= 2);

    // a later entry references an earlier meta-token
    let nested = result
        .dictionary_map
        .values()
        .any(|sub| sub.iter().any(|&t| is_meta(t)));
    assert!(nested, "expected a hierarchical entry: {result:?}");

    // the body kept shrinking past the single-pass result
    assert!(result.body.len() < tokens.len() / 4);

    assert_eq!(decompress(&result.serialized, &config).unwrap(), tokens);
}

/// Round-trip verification: clean results pass, corrupted ones fail.
#[test]
fn test_verification_gate() {
    let tokens = repeat(&[1, 2, 3], 5);
    let config = CompressionConfig {
        verify: true,
        ..Default::default()
    };
    let result = Compressor::new(config.clone())
        .unwrap()
        .compress(&tokens)
        .unwrap();
    assert!(verify_result(&tokens, &result, &config));

    let mut corrupted = result.clone();
    let last = corrupted.serialized.len() - 1;
    corrupted.serialized[last] = 999;
    assert!(!verify_result(&tokens, &corrupted, &config));
}

/// The serialized frame is exactly dictionary-then-body.
#[test]
fn test_frame_layout() {
    let tokens = repeat(&[1, 2, 3], 5);
    let config = CompressionConfig::default();
    let result = compress(&tokens, &config).unwrap();

    assert_eq!(result.serialized[0], DICT_START);
    let end = result
        .serialized
        .iter()
        .position(|&t| t == DICT_END)
        .unwrap();
    assert_eq!(&result.serialized[end + 1..], result.body.as_slice());
}

/// Reserved ids in the input are rejected with their offset.
#[test]
fn test_reserved_token_reported() {
    let config = CompressionConfig::default();
    let err = compress(&[7, DICT_END, 7], &config).unwrap_err();
    match err {
        Error::ReservedTokenInInput { token, offset } => {
            assert_eq!(token, DICT_END);
            assert_eq!(offset, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Empty input compresses to an empty stream with an empty dictionary.
#[test]
fn test_empty_input() {
    let config = CompressionConfig::default();
    let result = compress(&[], &config).unwrap();
    assert!(result.serialized.is_empty());
    assert!(result.dictionary_map.is_empty());
    assert_eq!(decompress(&result.serialized, &config).unwrap(), Vec::<Token>::new());
}
