use tokzip::{compress, CompressionConfig, DiscoveryMode, SelectionMode};

/// Compares every discovery/selection combination on the same input.
///
/// Usage: cargo run --example modes
fn main() {
    // repetitive boilerplate with a sprinkle of unique tokens
    let mut tokens: Vec<u32> = Vec::new();
    for i in 0..60u32 {
        tokens.extend([5, 6, 7, 8, 5, 6]);
        if i % 3 == 0 {
            tokens.push(2000 + i);
        }
    }

    println!("input: {} tokens", tokens.len());
    println!(
        "{:<16} {:<10} {:>10} {:>8} {:>7}",
        "discovery", "selection", "serialized", "entries", "ratio"
    );

    for discovery in [
        DiscoveryMode::SuffixArray,
        DiscoveryMode::SlidingWindow,
        DiscoveryMode::Bpe,
    ] {
        for selection in [
            SelectionMode::Greedy,
            SelectionMode::Optimal,
            SelectionMode::Beam,
        ] {
            let config = CompressionConfig {
                discovery,
                selection,
                verify: true,
                ..Default::default()
            };
            let result = compress(&tokens, &config).expect("compression failed");
            println!(
                "{:<16} {:<10} {:>10} {:>8} {:>7.3}",
                discovery.to_string(),
                selection.to_string(),
                result.compressed_length,
                result.dictionary_map.len(),
                result.compression_ratio()
            );
        }
    }
}
