//! Block-aware tokenizer for TypeScript-style object literals
//!
//! Just enough lexing to walk data files reliably: identifiers, string
//! literals, numbers and single-character punctuation, with comments skipped.
//! Delimiter depth is tracked per token so callers can match blocks by
//! balance instead of by character distance.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_till, take_until, take_while, take_while1},
    character::complete::{anychar, char as pchar, digit1, one_of},
    combinator::{consumed, map, opt, recognize, rest},
    multi::many0_count,
    sequence::{pair, terminated, tuple},
    IResult,
};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword (Unicode letters, digits, `_`, `$`).
    Ident,
    /// String literal; `text` holds the contents without quotes.
    Str,
    /// Unsigned numeric literal.
    Number,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte span in the source, quotes included for strings.
    pub span: Range<usize>,
    /// Number of unclosed `{`, `[`, `(` before this token.
    pub depth: usize,
}

impl Token<'_> {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_digit_or_separator(c: char) -> bool {
    c.is_ascii_digit() || c == '_'
}

// ============================================================================
// Recognizers
// ============================================================================

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), take_till(|c: char| c == '\n')))(input)
}

/// An unterminated block comment runs to the end of input.
fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        tag("/*"),
        alt((terminated(take_until("*/"), tag("*/")), rest)),
    ))(input)
}

fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((
        take_while1(char::is_whitespace),
        line_comment,
        block_comment,
    )))(input)
}

fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    ))(input)
}

/// Digits with `_` separators and at most one fraction part. A `.` not
/// followed by a digit is left for member access.
fn parse_number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        digit1,
        take_while(is_digit_or_separator),
        opt(tuple((pchar('.'), digit1, take_while(is_digit_or_separator)))),
    )))(input)
}

/// Contents of a literal up to (not including) any char in `stops`;
/// backslash escapes are skipped over.
fn string_body<'a>(input: &'a str, stops: &'static str) -> IResult<&'a str, &'a str> {
    recognize(many0_count(alt((
        is_not(stops),
        recognize(pair(pchar('\\'), anychar)),
    ))))(input)
}

/// String literal; yields the contents without quotes. A missing closing
/// quote is tolerated.
fn parse_string(input: &str) -> IResult<&str, &str> {
    let (input, quote) = one_of("\"'`")(input)?;
    // Backtick templates may span lines; `'` and `"` literals end at an
    // unescaped newline.
    let stops = match quote {
        '"' => "\"\\\n",
        '\'' => "'\\\n",
        _ => "`\\",
    };
    let (input, body) = string_body(input, stops)?;
    let (input, _) = opt(pchar(quote))(input)?;
    Ok((input, body))
}

fn parse_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(parse_string, |text| (TokenKind::Str, text)),
        map(parse_ident, |text| (TokenKind::Ident, text)),
        map(parse_number, |text| (TokenKind::Number, text)),
        map(consumed(anychar), |(text, c)| (TokenKind::Punct(c), text)),
    ))(input)
}

/// Tokenize `src`. Never fails: unterminated strings and comments are cut
/// at their natural end, unmatched closers clamp depth at zero.
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut input = src;

    loop {
        input = trivia(input).map_or(input, |(rest, _)| rest);
        let start = src.len() - input.len();
        let Ok((rest, (kind, text))) = parse_token(input) else {
            break;
        };
        let span = start..src.len() - rest.len();
        input = rest;

        match kind {
            TokenKind::Punct('{' | '[' | '(') => {
                tokens.push(Token { kind, text, span, depth });
                depth += 1;
            }
            TokenKind::Punct('}' | ']' | ')') => {
                depth = depth.saturating_sub(1);
                tokens.push(Token { kind, text, span, depth });
            }
            _ => tokens.push(Token { kind, text, span, depth }),
        }
    }

    tokens
}

/// Index of the token closing the block opened at `open`, if the input
/// contains one.
///
/// Openers and their closers carry the same depth, so the closer is the next
/// closing punctuation back at the opener's depth.
pub fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let depth = tokens.get(open)?.depth;
    tokens[open + 1..]
        .iter()
        .position(|t| {
            t.depth == depth && matches!(t.kind, TokenKind::Punct('}' | ']' | ')'))
        })
        .map(|offset| open + 1 + offset)
}

/// Index of the innermost opener enclosing `index`, if any.
pub fn enclosing_open(tokens: &[Token<'_>], index: usize) -> Option<usize> {
    let depth = tokens.get(index)?.depth;
    if depth == 0 {
        return None;
    }
    tokens[..index]
        .iter()
        .rposition(|t| t.depth == depth - 1 && matches!(t.kind, TokenKind::Punct('{' | '[' | '(')))
}

/// Top-level `{ ... }` blocks directly inside the token range `body`,
/// as `(open, close)` index pairs. A block cut off by end of input runs to
/// `body.end`.
pub fn child_blocks(tokens: &[Token<'_>], body: Range<usize>, depth: usize) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut i = body.start;
    while i < body.end {
        if tokens[i].depth == depth && tokens[i].is_punct('{') {
            let close = matching_close(tokens, i)
                .filter(|&c| c < body.end)
                .unwrap_or(body.end);
            blocks.push((i, close));
            i = close + 1;
        } else {
            i += 1;
        }
    }
    blocks
}

/// Read a dotted path (`ChallengeLevel.HALF`) starting at `index`.
/// Returns the joined text and the index after the last segment.
pub fn dotted_path(src: &str, tokens: &[Token<'_>], index: usize) -> Option<(String, usize)> {
    let first = tokens.get(index).filter(|t| t.kind == TokenKind::Ident)?;
    let start = first.span.start;
    let mut end = first.span.end;
    let mut next = index + 1;
    while let (Some(dot), Some(seg)) = (tokens.get(next), tokens.get(next + 1)) {
        if !(dot.is_punct('.') && seg.kind == TokenKind::Ident) {
            break;
        }
        end = seg.span.end;
        next += 2;
    }
    let joined: String = src[start..end].split_whitespace().collect();
    Some((joined, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str, usize)> {
        tokenize(src)
            .into_iter()
            .map(|t| (t.kind, t.text, t.depth))
            .collect()
    }

    #[test]
    fn tokenizes_object_literal_with_depth() {
        let toks = kinds("{ a: 1, b: { c: 'x}' } }");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Punct('{'), "{", 0),
                (TokenKind::Ident, "a", 1),
                (TokenKind::Punct(':'), ":", 1),
                (TokenKind::Number, "1", 1),
                (TokenKind::Punct(','), ",", 1),
                (TokenKind::Ident, "b", 1),
                (TokenKind::Punct(':'), ":", 1),
                (TokenKind::Punct('{'), "{", 1),
                (TokenKind::Ident, "c", 2),
                (TokenKind::Punct(':'), ":", 2),
                (TokenKind::Str, "x}", 2),
                (TokenKind::Punct('}'), "}", 1),
                (TokenKind::Punct('}'), "}", 0),
            ]
        );
    }

    #[test]
    fn skips_comments_and_keeps_unicode_identifiers() {
        let toks = kinds("// { not a block\nPercepção: 4 /* } */");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Ident, "Percepção", 0),
                (TokenKind::Punct(':'), ":", 0),
                (TokenKind::Number, "4", 0),
            ]
        );
    }

    #[test]
    fn numbers_do_not_swallow_member_access() {
        let toks = kinds("12.5 3.toString");
        assert_eq!(toks[0], (TokenKind::Number, "12.5", 0));
        assert_eq!(toks[1], (TokenKind::Number, "3", 0));
        assert_eq!(toks[2], (TokenKind::Punct('.'), ".", 0));
    }

    #[test]
    fn matching_close_and_enclosing_open() {
        let tokens = tokenize("[ { a: [1, 2] }, { b: 3 } ]");
        assert_eq!(matching_close(&tokens, 0), Some(tokens.len() - 1));
        let b = tokens.iter().position(|t| t.is_ident("b")).unwrap();
        let open = enclosing_open(&tokens, b).unwrap();
        assert!(tokens[open].is_punct('{'));
        assert_eq!(child_blocks(&tokens, 1..tokens.len() - 1, 1).len(), 2);
    }

    #[test]
    fn unterminated_input_is_tolerated() {
        let tokens = tokenize("{ a: \"open");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Str);
        assert_eq!(matching_close(&tokens, 0), None);
        assert_eq!(child_blocks(&tokens, 0..tokens.len(), 0), vec![(0, tokens.len())]);
    }

    #[test]
    fn quoted_strings_stop_at_end_of_line() {
        let toks = kinds("const re = /'/;\n{ a: `x\ny` }");
        assert!(toks.contains(&(TokenKind::Str, "/;", 0)));
        assert!(toks.contains(&(TokenKind::Punct('{'), "{", 0)));
        assert!(toks.contains(&(TokenKind::Str, "x\ny", 1)));

        let escaped = kinds(r#""a\"b" 'c\'d'"#);
        assert_eq!(escaped[0], (TokenKind::Str, r#"a\"b"#, 0));
        assert_eq!(escaped[1], (TokenKind::Str, r"c\'d", 0));
    }

    #[test]
    fn unterminated_block_comment_hides_the_rest() {
        assert_eq!(kinds("a /* { b"), vec![(TokenKind::Ident, "a", 0)]);
    }

    #[test]
    fn dotted_path_joins_segments() {
        let src = "nd: ChallengeLevel . S_PLUS,";
        let tokens = tokenize(src);
        let (path, next) = dotted_path(src, &tokens, 2).unwrap();
        assert_eq!(path, "ChallengeLevel.S_PLUS");
        assert!(tokens[next].is_punct(','));
    }
}
