//! Threat record extraction
//!
//! Finds every `nd: <tier>` assignment in a data file and collects the
//! `attributes` and `skills` blocks of the entity that owns it.
//!
//! The owning entity is the innermost object literal around the marker,
//! clipped at neighbouring markers of the same depth, so data files that
//! list several threats (or forget the surrounding braces) split cleanly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::scan::{self, Token, TokenKind};
use crate::tier;

/// Object key that assigns a tier to its entity.
pub const TIER_KEY: &str = "nd";
pub const ATTRIBUTES_KEY: &str = "attributes";
pub const SKILLS_KEY: &str = "skills";

/// One parsed threat definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub file: String,
    /// Tier token as written (`ChallengeLevel.HALF`, `1/2`, ...).
    pub raw_tier: String,
    /// Output of [`tier::normalize`] for `raw_tier`.
    pub tier: String,
    pub attributes: BTreeMap<String, i64>,
    pub skills: BTreeMap<String, i64>,
    /// Byte offset of the tier marker in the source file.
    pub offset: usize,
}

struct TierMarker {
    /// Index of the `nd` key token.
    key: usize,
    /// Index just past the tier value.
    value_end: usize,
    raw: String,
}

/// Extract all threat records from `contents`, in source order.
pub fn extract(contents: &str, file_id: &str) -> Vec<EntityRecord> {
    let tokens = scan::tokenize(contents);
    let markers = find_markers(contents, &tokens);

    markers
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let depth = tokens[marker.key].depth;
            let body = entity_body(&tokens, &markers, i, depth);

            let attributes = labeled_block(contents, &tokens, body.clone(), depth, ATTRIBUTES_KEY);
            let skills = labeled_block(contents, &tokens, body, depth, SKILLS_KEY);

            let record = EntityRecord {
                file: file_id.to_string(),
                tier: tier::normalize(&marker.raw),
                raw_tier: marker.raw.clone(),
                attributes,
                skills,
                offset: tokens[marker.key].span.start,
            };
            tracing::debug!(
                file = file_id,
                tier = %record.raw_tier,
                attributes = record.attributes.len(),
                skills = record.skills.len(),
                "extracted threat record"
            );
            record
        })
        .collect()
}

fn find_markers(src: &str, tokens: &[Token<'_>]) -> Vec<TierMarker> {
    let mut markers = Vec::new();
    let mut i = 0;
    while i + 2 < tokens.len() {
        let is_key = (tokens[i].is_ident(TIER_KEY)
            || (tokens[i].kind == TokenKind::Str && tokens[i].text == TIER_KEY))
            && tokens[i + 1].is_punct(':');
        // Member access such as `threat.nd: ...` is not an object key.
        let after_dot = i > 0 && tokens[i - 1].is_punct('.');

        if is_key && !after_dot {
            if let Some((raw, value_end)) = tier_value(src, tokens, i + 2) {
                markers.push(TierMarker {
                    key: i,
                    value_end,
                    raw,
                });
                i = value_end;
                continue;
            }
        }
        i += 1;
    }
    markers
}

fn tier_value(src: &str, tokens: &[Token<'_>], index: usize) -> Option<(String, usize)> {
    let token = tokens.get(index)?;
    match token.kind {
        // A bare identifier is a type annotation (`nd: ChallengeLevel;`).
        TokenKind::Ident => {
            scan::dotted_path(src, tokens, index).filter(|(path, _)| path.contains('.'))
        }
        TokenKind::Str => Some((token.text.to_string(), index + 1)),
        TokenKind::Number => {
            // `1/4` written as a bare expression
            if let (Some(slash), Some(den)) = (tokens.get(index + 1), tokens.get(index + 2)) {
                if slash.is_punct('/') && den.kind == TokenKind::Number {
                    return Some((format!("{}/{}", token.text, den.text), index + 3));
                }
            }
            Some((token.text.to_string(), index + 1))
        }
        TokenKind::Punct(_) => None,
    }
}

/// Token range belonging to marker `i`.
fn entity_body(
    tokens: &[Token<'_>],
    markers: &[TierMarker],
    i: usize,
    depth: usize,
) -> Range<usize> {
    let key = markers[i].key;
    let (mut start, mut end) = match scan::enclosing_open(tokens, key) {
        Some(open) => (
            open + 1,
            scan::matching_close(tokens, open).unwrap_or(tokens.len()),
        ),
        None => (0, tokens.len()),
    };

    if let Some(prev) = markers[..i]
        .iter()
        .rev()
        .find(|m| tokens[m.key].depth == depth)
    {
        start = start.max(prev.value_end);
    }
    if let Some(next) = markers[i + 1..]
        .iter()
        .find(|m| tokens[m.key].depth == depth)
    {
        end = end.min(next.key);
    }

    start..end.max(start)
}

/// Parse `label: { key: int, ... }` found directly inside `body`.
/// Repeated labels merge; a later key overwrites an earlier one.
fn labeled_block(
    src: &str,
    tokens: &[Token<'_>],
    body: Range<usize>,
    depth: usize,
    label: &str,
) -> BTreeMap<String, i64> {
    let mut values = BTreeMap::new();

    let mut i = body.start;
    while i + 2 < body.end {
        let t = &tokens[i];
        let labeled = t.depth == depth
            && (t.is_ident(label) || (t.kind == TokenKind::Str && t.text == label))
            && tokens[i + 1].is_punct(':')
            && tokens[i + 2].is_punct('{');
        if !labeled {
            i += 1;
            continue;
        }

        let open = i + 2;
        let close = scan::matching_close(tokens, open)
            .filter(|&c| c <= body.end)
            .unwrap_or(body.end);
        for (key, value) in integer_entries(src, tokens, open + 1..close, depth + 1) {
            values.insert(key, value);
        }
        i = close;
    }

    values
}

/// `key: integer` entries at `depth` inside `range`. Entries whose value is
/// not a plain integer literal are skipped, as is a trailing partial entry.
fn integer_entries(
    src: &str,
    tokens: &[Token<'_>],
    range: Range<usize>,
    depth: usize,
) -> Vec<(String, i64)> {
    let mut entries = Vec::new();
    let mut i = range.start;

    while i < range.end {
        let Some((key, colon)) = entry_key(src, tokens, i, range.end, depth) else {
            // Skip to the next entry separator at this depth.
            i = next_separator(tokens, i, range.end, depth) + 1;
            continue;
        };

        let value_start = colon + 1;
        let value_end = next_separator(tokens, value_start, range.end, depth);
        if let Some(value) = integer_value(&tokens[value_start..value_end]) {
            entries.push((key, value));
        }
        i = value_end + 1;
    }

    entries
}

fn entry_key(
    src: &str,
    tokens: &[Token<'_>],
    i: usize,
    end: usize,
    depth: usize,
) -> Option<(String, usize)> {
    let t = tokens.get(i).filter(|t| t.depth == depth)?;
    let (key, after) = match t.kind {
        TokenKind::Ident | TokenKind::Str | TokenKind::Number => (t.text.to_string(), i + 1),
        TokenKind::Punct('[') => {
            let close = scan::matching_close(tokens, i).filter(|&c| c < end)?;
            let inner = &src[tokens[i].span.end..tokens[close].span.start];
            let key = inner.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.split_whitespace().collect::<String>(), close + 1)
        }
        TokenKind::Punct(_) => return None,
    };
    (after < end && tokens[after].is_punct(':')).then_some((key, after))
}

fn next_separator(tokens: &[Token<'_>], from: usize, end: usize, depth: usize) -> usize {
    (from..end)
        .find(|&j| tokens[j].depth == depth && tokens[j].is_punct(','))
        .unwrap_or(end)
}

fn integer_value(value: &[Token<'_>]) -> Option<i64> {
    match value {
        [n] if n.kind == TokenKind::Number => n.text.replace('_', "").parse().ok(),
        [sign, n] if n.kind == TokenKind::Number && (sign.is_punct('-') || sign.is_punct('+')) => {
            let magnitude: i64 = n.text.replace('_', "").parse().ok()?;
            Some(if sign.is_punct('-') { -magnitude } else { magnitude })
        }
        _ => None,
    }
}
