//! Wire format: framing, parsing, and expansion.
//!
//! Layout: `[STATIC_MARKER] DICT_START (meta LEN(k)? sub…)* DICT_END body…`
//!
//! Entries are written back to back. With length markers each entry is
//! self-delimiting; without them the parser splits on the next meta-range
//! token, which is only unambiguous when entry bodies contain no meta
//! references (single-pass compression). A stream with no leading
//! `DICT_START` is a raw body and parses to itself.

use crate::config::CompressionConfig;
use crate::dictionary::DictEntry;
use crate::error::{Error, Result};
use crate::token::{
    is_len_marker, is_meta, len_marker, marker_len, Token, DICT_END, DICT_START, STATIC_MARKER,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};

/// A parsed compressed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStream {
    /// Whether the static-dictionary marker was present.
    pub static_marker: bool,
    /// Entries in stream order.
    pub entries: Vec<(Token, Vec<Token>)>,
    /// Body tokens after `DICT_END` (or the whole stream when raw).
    pub body: Vec<Token>,
}

/// Serializes ordered dictionary entries and a body into one token stream.
pub fn serialize(
    entries: &[DictEntry],
    body: &[Token],
    static_marker: bool,
    config: &CompressionConfig,
) -> Vec<Token> {
    let mut out = Vec::with_capacity(body.len() + entries.len() * 4 + 3);
    if static_marker {
        out.push(STATIC_MARKER);
    }
    out.push(DICT_START);
    for entry in entries {
        out.push(entry.meta);
        if config.length_markers_enabled {
            out.push(len_marker(entry.sub.len()));
        }
        out.extend_from_slice(&entry.sub);
    }
    out.push(DICT_END);
    out.extend_from_slice(body);
    out
}

/// Parses a compressed stream into its dictionary and body.
///
/// Streams that do not begin with `DICT_START` (optionally preceded by the
/// static marker) are returned whole as a raw body.
pub fn parse(tokens: &[Token], config: &CompressionConfig) -> Result<ParsedStream> {
    let (static_marker, dict_at) = match tokens.first() {
        Some(&STATIC_MARKER) if tokens.get(1) == Some(&DICT_START) => (true, 1),
        Some(&DICT_START) => (false, 0),
        _ => {
            return Ok(ParsedStream {
                static_marker: false,
                entries: Vec::new(),
                body: tokens.to_vec(),
            })
        }
    };

    let mut entries: Vec<(Token, Vec<Token>)> = Vec::new();
    let mut seen: HashSet<Token> = HashSet::new();
    let mut cursor = dict_at + 1;

    loop {
        let &token = tokens
            .get(cursor)
            .ok_or_else(|| Error::malformed("missing dictionary end delimiter"))?;
        if token == DICT_END {
            cursor += 1;
            break;
        }
        if !is_meta(token) {
            return Err(Error::malformed(format!(
                "expected a meta-token at offset {cursor}, found {token:#010x}"
            )));
        }
        if !seen.insert(token) {
            return Err(Error::malformed(format!(
                "duplicate dictionary entry for meta-token {token:#010x}"
            )));
        }
        cursor += 1;

        let sub = if config.length_markers_enabled {
            let &marker = tokens
                .get(cursor)
                .ok_or_else(|| Error::malformed("dictionary entry missing length marker"))?;
            if !is_len_marker(marker) {
                return Err(Error::malformed(format!(
                    "expected a length marker at offset {cursor}, found {marker:#010x}"
                )));
            }
            let len = marker_len(marker);
            if len == 0 {
                return Err(Error::malformed("zero-length dictionary entry"));
            }
            cursor += 1;

            let end = cursor + len;
            let slice = tokens
                .get(cursor..end)
                .ok_or_else(|| Error::malformed("dictionary entry truncated"))?;
            if slice.contains(&DICT_END) || slice.contains(&DICT_START) {
                return Err(Error::malformed(
                    "length marker runs past a dictionary delimiter",
                ));
            }
            cursor = end;
            slice.to_vec()
        } else {
            let mut sub = Vec::new();
            while let Some(&t) = tokens.get(cursor) {
                if t == DICT_END || is_meta(t) {
                    break;
                }
                sub.push(t);
                cursor += 1;
            }
            if sub.is_empty() {
                return Err(Error::malformed("empty dictionary entry"));
            }
            sub
        };

        entries.push((token, sub));
    }

    Ok(ParsedStream {
        static_marker,
        entries,
        body: tokens[cursor..].to_vec(),
    })
}

/// Recursively expands one meta-token, memoizing full expansions.
fn expand_meta(
    meta: Token,
    dictionary: &HashMap<Token, Vec<Token>>,
    memo: &mut HashMap<Token, Vec<Token>>,
    in_progress: &mut HashSet<Token>,
) -> Result<Vec<Token>> {
    if let Some(done) = memo.get(&meta) {
        return Ok(done.clone());
    }
    if !in_progress.insert(meta) {
        return Err(Error::malformed(format!(
            "cyclic dictionary reference through meta-token {meta:#010x}"
        )));
    }

    let sub = dictionary.get(&meta).ok_or_else(|| {
        Error::malformed(format!("reference to undefined meta-token {meta:#010x}"))
    })?;

    let mut expanded = Vec::with_capacity(sub.len());
    for &t in sub {
        if is_meta(t) {
            expanded.extend(expand_meta(t, dictionary, memo, in_progress)?);
        } else {
            expanded.push(t);
        }
    }

    in_progress.remove(&meta);
    memo.insert(meta, expanded.clone());
    Ok(expanded)
}

/// Expands every meta-token in `body` against `dictionary`.
pub fn expand(body: &[Token], dictionary: &HashMap<Token, Vec<Token>>) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(body.len());
    let mut memo: HashMap<Token, Vec<Token>> = HashMap::new();
    let mut in_progress: HashSet<Token> = HashSet::new();

    for &t in body {
        if is_meta(t) {
            out.extend(expand_meta(t, dictionary, &mut memo, &mut in_progress)?);
        } else {
            out.push(t);
        }
    }
    Ok(out)
}

/// Decompresses a serialized stream.
///
/// Inverse of compression regardless of which strategy produced the stream.
/// Raw streams (no dictionary section) decompress to themselves.
pub fn decompress(tokens: &[Token], config: &CompressionConfig) -> Result<Vec<Token>> {
    decompress_with(tokens, config, None)
}

/// Decompresses a stream, consulting `static_entries` for meta-tokens that
/// are referenced but not defined in the stream itself.
pub fn decompress_with(
    tokens: &[Token],
    config: &CompressionConfig,
    static_entries: Option<&HashMap<Token, Vec<Token>>>,
) -> Result<Vec<Token>> {
    let parsed = parse(tokens, config)?;
    if parsed.entries.is_empty() && !parsed.static_marker && static_entries.is_none() {
        return Ok(parsed.body);
    }

    let mut dictionary: HashMap<Token, Vec<Token>> = HashMap::new();
    if let Some(statics) = static_entries {
        for (&meta, sub) in statics {
            dictionary.insert(meta, sub.clone());
        }
    }
    for (meta, sub) in &parsed.entries {
        dictionary.insert(*meta, sub.clone());
    }

    expand(&parsed.body, &dictionary)
}
