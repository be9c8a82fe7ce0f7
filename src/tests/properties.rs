use crate::config::{CompressionConfig, DiscoveryMode, SelectionMode};
use crate::token::{is_compressible, is_meta, Token, DICT_END, DICT_START, META_BASE};
use crate::{compress, decompress, discovery, selection, subsume};
use ahash::AHashSet as HashSet;
use proptest::prelude::*;

/// Random small-alphabet inputs, biased toward planted repeat structure so
/// the interesting code paths actually fire.
fn arb_tokens() -> impl Strategy<Value = Vec<Token>> {
    let random = prop::collection::vec(0u32..12, 0..120);
    let planted = (
        prop::collection::vec(0u32..6, 2..6),
        2usize..12,
        prop::collection::vec(0u32..12, 0..10),
    )
        .prop_map(|(pattern, times, tail)| {
            let mut tokens: Vec<Token> = pattern
                .iter()
                .cycle()
                .take(pattern.len() * times)
                .copied()
                .collect();
            tokens.extend(tail);
            tokens
        });
    prop_oneof![random, planted]
}

/// Inputs that reliably produce a non-empty dictionary.
fn compressible_tokens() -> impl Strategy<Value = Vec<Token>> {
    (2usize..5, 8usize..20).prop_map(|(plen, times)| {
        let pattern: Vec<Token> = (1..=plen as Token).collect();
        pattern.iter().cycle().take(plen * times).copied().collect()
    })
}

fn arb_discovery() -> impl Strategy<Value = DiscoveryMode> {
    prop_oneof![
        Just(DiscoveryMode::SuffixArray),
        Just(DiscoveryMode::SlidingWindow),
        Just(DiscoveryMode::Bpe),
    ]
}

fn arb_selection() -> impl Strategy<Value = SelectionMode> {
    prop_oneof![
        Just(SelectionMode::Greedy),
        Just(SelectionMode::Optimal),
        Just(SelectionMode::Beam),
    ]
}

fn arb_config() -> impl Strategy<Value = CompressionConfig> {
    (arb_discovery(), arb_selection(), any::<bool>(), any::<bool>()).prop_map(
        |(discovery, selection, hierarchical, markers)| CompressionConfig {
            discovery,
            selection,
            // marker-free dictionaries cannot express hierarchy
            hierarchical_enabled: hierarchical && markers,
            length_markers_enabled: markers,
            ..CompressionConfig::default()
        },
    )
}

proptest! {
    /// Losslessness: decompression restores the input exactly.
    #[test]
    fn prop_round_trip(tokens in arb_tokens(), config in arb_config()) {
        let result = compress(&tokens, &config).unwrap();
        let restored = decompress(&result.serialized, &config).unwrap();
        prop_assert_eq!(restored, tokens);
    }

    /// Non-expansion: the serialized stream never exceeds the input.
    #[test]
    fn prop_non_expansion(tokens in arb_tokens(), config in arb_config()) {
        let result = compress(&tokens, &config).unwrap();
        prop_assert!(result.serialized.len() <= tokens.len());
        prop_assert!(result.compression_ratio() <= 1.0);
    }

    /// Determinism: identical input and configuration, identical output.
    #[test]
    fn prop_deterministic(tokens in arb_tokens(), config in arb_config()) {
        let first = compress(&tokens, &config).unwrap();
        let second = compress(&tokens, &config).unwrap();
        prop_assert_eq!(first.serialized, second.serialized);
        prop_assert_eq!(first.dictionary_map, second.dictionary_map);
    }

    /// Compressibility respect: in a single pass, every dictionary entry
    /// earns strictly more than it costs.
    #[test]
    fn prop_single_pass_entries_meet_quota(tokens in arb_tokens()) {
        let config = CompressionConfig {
            hierarchical_enabled: false,
            ..CompressionConfig::default()
        };
        let result = compress(&tokens, &config).unwrap();
        for (meta, sub) in &result.dictionary_map {
            let refs = result.body.iter().filter(|&&t| t == *meta).count();
            prop_assert!(
                is_compressible(sub.len(), refs, config.delta()),
                "entry {:#x} (len {}) has only {} references",
                meta, sub.len(), refs
            );
        }
    }

    /// Non-overlap: a pass's selected occurrences are pairwise disjoint and
    /// sorted by start.
    #[test]
    fn prop_selection_non_overlap(tokens in arb_tokens(), config in arb_config()) {
        let candidates = subsume::prune(discovery::discover(&tokens, &config), &config);
        let selection = selection::select(&candidates, &config);

        let mut occupied: HashSet<usize> = HashSet::new();
        let mut last_start = 0usize;
        for occ in &selection.occurrences {
            prop_assert!(occ.start >= last_start);
            last_start = occ.start;
            for pos in occ.start..occ.end() {
                prop_assert!(occupied.insert(pos), "offset {} selected twice", pos);
            }
        }
    }

    /// Dictionary DAG: entries appear dependencies-first and every entry is
    /// reachable from the body.
    #[test]
    fn prop_dictionary_order_and_liveness(tokens in arb_tokens(), config in arb_config()) {
        let result = compress(&tokens, &config).unwrap();
        let parsed = crate::serialize::parse(&result.serialized, &config).unwrap();

        // dependencies first
        let mut defined: HashSet<Token> = HashSet::new();
        for (meta, sub) in &parsed.entries {
            for &t in sub {
                if is_meta(t) {
                    prop_assert!(defined.contains(&t), "forward reference to {:#x}", t);
                }
            }
            defined.insert(*meta);
        }

        // every entry reachable from the body
        let mut reached: HashSet<Token> = HashSet::new();
        let mut frontier: Vec<Token> =
            parsed.body.iter().copied().filter(|&t| is_meta(t)).collect();
        while let Some(meta) = frontier.pop() {
            if !reached.insert(meta) {
                continue;
            }
            if let Some((_, sub)) = parsed.entries.iter().find(|(m, _)| *m == meta) {
                frontier.extend(sub.iter().copied().filter(|&t| is_meta(t)));
            }
        }
        for (meta, _) in &parsed.entries {
            prop_assert!(reached.contains(meta), "dead dictionary entry {:#x}", meta);
        }
    }

    /// Raw streams decompress to themselves.
    #[test]
    fn prop_raw_decompression_identity(tokens in arb_tokens()) {
        let config = CompressionConfig::default();
        prop_assert_eq!(decompress(&tokens, &config).unwrap(), tokens);
    }

    /// Any truncation inside the dictionary section is malformed, never a
    /// panic or a silent success.
    #[test]
    fn prop_truncated_dictionary_is_malformed(tokens in compressible_tokens()) {
        let config = CompressionConfig::default();
        let result = compress(&tokens, &config).unwrap();
        prop_assume!(result.serialized.first() == Some(&DICT_START));

        let end_pos = result
            .serialized
            .iter()
            .position(|&t| t == DICT_END)
            .unwrap();
        for cut in 1..=end_pos {
            prop_assert!(decompress(&result.serialized[..cut], &config).is_err());
        }
    }

    /// A body reference to a meta-token the dictionary never defined is
    /// malformed.
    #[test]
    fn prop_unknown_meta_reference_is_malformed(tokens in compressible_tokens()) {
        let config = CompressionConfig::default();
        let result = compress(&tokens, &config).unwrap();
        prop_assume!(result.serialized.first() == Some(&DICT_START));

        let unused = META_BASE + 499;
        prop_assume!(!result.dictionary_map.contains_key(&unused));

        let mut corrupted = result.serialized.clone();
        corrupted.push(unused);
        prop_assert!(decompress(&corrupted, &config).is_err());
    }
}

/// Fuzz: decompression of arbitrary streams never panics.
#[test]
fn fuzz_decompress_no_panic() {
    let config = CompressionConfig::default();
    bolero::check!().with_type::<Vec<u32>>().for_each(|tokens| {
        let _ = decompress(tokens, &config);
    });
}

/// Fuzz: compression of arbitrary reserved-free input round-trips.
#[test]
fn fuzz_compress_round_trip() {
    let config = CompressionConfig::default();
    bolero::check!().with_type::<Vec<u8>>().for_each(|bytes| {
        let tokens: Vec<Token> = bytes.iter().map(|&b| Token::from(b)).collect();
        let result = compress(&tokens, &config).expect("reserved-free input must compress");
        let restored = decompress(&result.serialized, &config).unwrap();
        assert_eq!(restored, tokens);
    });
}
