use tokzip::{compress, decompress, CompressionConfig};

/// End-to-end demo: compress a repetitive token sequence, print the stats,
/// and verify the round trip.
///
/// Usage: cargo run --example basic
fn main() {
    // a prompt-shaped sequence: boilerplate repeated around varying ids
    let mut tokens: Vec<u32> = Vec::new();
    for i in 0..40u32 {
        tokens.extend([50, 51, 52, 53]);
        tokens.push(1000 + i % 7);
        tokens.extend([60, 61]);
    }

    let config = CompressionConfig::default();
    let result = compress(&tokens, &config).expect("compression failed");

    println!("=== tokzip demo ===");
    println!("input tokens:      {}", result.original_length);
    println!("serialized tokens: {}", result.compressed_length);
    println!("tokens saved:      {}", result.tokens_saved());
    println!("ratio:             {:.3}", result.compression_ratio());
    println!("dictionary size:   {}", result.dictionary_map.len());
    println!("passes:            {}", result.metrics.passes);

    for (meta, sub) in &result.dictionary_map {
        println!("  {meta:#010x} -> {sub:?}");
    }

    let restored = decompress(&result.serialized, &config).expect("decompression failed");
    assert_eq!(restored, tokens);
    println!("round trip: ok");
}
