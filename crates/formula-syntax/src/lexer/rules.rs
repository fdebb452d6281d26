//! Sub-recognizers, tried in order at each offset. The first one that matches wins.

use regex::Regex;
use std::sync::OnceLock;

use super::TokenizeOptions;
use crate::address::a1::scan_a1_range;
use crate::address::r1c1::scan_r1c1_range;
use crate::address::structured::{parse_table, scan_structured};
use crate::token::TokenKind;

/// A recognized token: its kind and the byte offset just past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lexeme {
    pub kind: TokenKind,
    pub end: usize,
    pub unterminated: bool,
}

impl Lexeme {
    fn new(kind: TokenKind, end: usize) -> Self {
        Self {
            kind,
            end,
            unterminated: false,
        }
    }
}

type Rule = fn(&str, usize, &TokenizeOptions) -> Option<Lexeme>;

const RULES: &[Rule] = &[
    lex_error,
    lex_trim_operator,
    lex_operator,
    lex_function,
    lex_bool,
    lex_newline,
    lex_whitespace,
    lex_string,
    lex_quoted_context,
    lex_context,
    lex_range,
    lex_structured,
    lex_number,
    lex_name,
];

/// Run the rules at `pos`; `None` when nothing matches.
pub(crate) fn next_lexeme(text: &str, pos: usize, opts: &TokenizeOptions) -> Option<Lexeme> {
    RULES.iter().find_map(|rule| rule(text, pos, opts))
}

pub const ERROR_LITERALS: [&str; 17] = [
    "#DIV/0!",
    "#N/A",
    "#NAME?",
    "#NULL!",
    "#NUM!",
    "#REF!",
    "#VALUE!",
    "#GETTING_DATA",
    "#SPILL!",
    "#CALC!",
    "#FIELD!",
    "#UNKNOWN!",
    "#SYNTAX?",
    "#ERROR!",
    "#CONNECT!",
    "#BLOCKED!",
    "#EXTERNAL!",
];

fn starts_with_ignore_case(text: &str, pos: usize, needle: &str) -> bool {
    text.get(pos..pos + needle.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(needle))
}

fn lex_error(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    if !text[pos..].starts_with('#') {
        return None;
    }
    ERROR_LITERALS
        .iter()
        .find(|e| starts_with_ignore_case(text, pos, e))
        .map(|e| Lexeme::new(TokenKind::Error, pos + e.len()))
}

/// `.:`, `:.` and `.:.` are emitted as `Unknown` here; the tokenizer promotes them to operators
/// once it can see the tokens on both sides.
fn lex_trim_operator(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let rest = &text[pos..];
    [".:.", ".:", ":."]
        .iter()
        .find(|op| rest.starts_with(*op))
        .map(|op| Lexeme::new(TokenKind::Unknown, pos + op.len()))
}

fn lex_operator(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let rest = &text[pos..];
    for op in ["<=", ">=", "<>"] {
        if rest.starts_with(op) {
            return Some(Lexeme::new(TokenKind::Operator, pos + 2));
        }
    }
    match rest.as_bytes().first()? {
        b'-' | b'+' | b'/' | b'*' | b'^' | b'%' | b'&' | b'<' | b'>' | b'=' | b'{' | b'}'
        | b',' | b';' | b'(' | b')' | b'@' | b':' | b'!' | b'#' => {
            Some(Lexeme::new(TokenKind::Operator, pos + 1))
        }
        _ => None,
    }
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{L}_\\][\p{L}\p{N}_.\\]*\(").expect("valid regex"))
}

fn lex_function(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let m = function_re().find(&text[pos..])?;
    Some(Lexeme::new(TokenKind::Func, pos + m.end() - 1))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '\\' | '?')
}

fn lex_bool(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let len = ["TRUE", "FALSE"]
        .iter()
        .find(|word| starts_with_ignore_case(text, pos, word))?
        .len();
    match text[pos + len..].chars().next() {
        Some(c) if is_name_char(c) || matches!(c, '!' | '[' | '(') => None,
        _ => Some(Lexeme::new(TokenKind::Bool, pos + len)),
    }
}

fn lex_newline(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    text[pos..]
        .starts_with('\n')
        .then(|| Lexeme::new(TokenKind::Newline, pos + 1))
}

fn lex_whitespace(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let len: usize = text[pos..]
        .chars()
        .take_while(|&c| c != '\n' && c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    (len > 0).then(|| Lexeme::new(TokenKind::Whitespace, pos + len))
}

/// Scan a `q`-delimited run where a doubled `q` is an escaped quote. Returns the end offset and
/// whether the closing quote was found.
fn scan_quoted(text: &str, pos: usize, q: u8) -> Option<(usize, bool)> {
    let bytes = text.as_bytes();
    if bytes.get(pos) != Some(&q) {
        return None;
    }
    let mut i = pos + 1;
    while i < bytes.len() {
        if bytes[i] == q {
            if bytes.get(i + 1) == Some(&q) {
                i += 2;
                continue;
            }
            return Some((i + 1, true));
        }
        i += 1;
    }
    Some((bytes.len(), false))
}

fn lex_string(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let (end, closed) = scan_quoted(text, pos, b'"')?;
    Some(Lexeme {
        kind: TokenKind::String,
        end,
        unterminated: !closed,
    })
}

fn lex_quoted_context(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let (end, closed) = scan_quoted(text, pos, b'\'')?;
    if !closed {
        return Some(Lexeme {
            kind: TokenKind::ContextQuote,
            end,
            unterminated: true,
        });
    }
    // Only a prefix when `!` follows; an empty `''` is never a sheet name.
    (end - pos > 2 && text[end..].starts_with('!'))
        .then(|| Lexeme::new(TokenKind::ContextQuote, end))
}

fn context_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\[[^\[\]]+\])?([\p{L}\p{N}_.\\?]*)!").expect("valid regex")
    })
}

fn lex_context(text: &str, pos: usize, opts: &TokenizeOptions) -> Option<Lexeme> {
    let caps = context_re().captures(&text[pos..])?;
    let has_workbook = caps.get(1).is_some();
    let has_sheet = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
    // `[Book.xlsx]!` (workbook-scoped names) is only valid in xlsx mode.
    let valid = has_sheet || (opts.xlsx && has_workbook);
    let whole = caps.get(0)?;
    valid.then(|| Lexeme::new(TokenKind::Context, pos + whole.end() - 1))
}

/// Whether a reference may end at `pos`: the text ends, or the next character cannot continue
/// an identifier. A `.` only ends a reference when it starts a trim operator.
pub(crate) fn is_reference_boundary(text: &str, pos: usize) -> bool {
    let rest = &text[pos..];
    match rest.chars().next() {
        None => true,
        Some('.') => rest.starts_with(".:"),
        Some(c) => !(c.is_alphanumeric() || matches!(c, '_' | '\\' | '?' | '$' | '[')),
    }
}

fn scan_range(text: &str, pos: usize, r1c1: bool, allow_ternary: bool) -> Option<(TokenKind, usize)> {
    let (shape, end) = if r1c1 {
        let (_, shape, end) = scan_r1c1_range(text, pos, allow_ternary, is_reference_boundary)?;
        (shape, end)
    } else {
        let (_, shape, end) = scan_a1_range(text, pos, allow_ternary, is_reference_boundary)?;
        (shape, end)
    };
    Some((shape.token_kind(), end))
}

/// A partial range never swallows a function name: `A1:SUM(` is `A1` followed by `:SUM(`.
fn lex_range(text: &str, pos: usize, opts: &TokenizeOptions) -> Option<Lexeme> {
    let (kind, end) = match scan_range(text, pos, opts.r1c1, opts.allow_ternary)? {
        (TokenKind::Ternary, end) if text[end..].starts_with('(') => {
            scan_range(text, pos, opts.r1c1, false)?
        }
        found => found,
    };
    Some(Lexeme::new(kind, end))
}

/// Balanced brackets are not enough: misspelled keywords and invalid section combinations are
/// left for the later rules.
fn lex_structured(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let end = scan_structured(text, pos)?;
    parse_table(&text[pos..end])?;
    Some(Lexeme::new(TokenKind::Structured, end))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
    })
}

/// A number glued to identifier text (`9æði`) is not a number; it falls through to `Unknown`.
fn lex_number(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let m = number_re().find(&text[pos..])?;
    let end = pos + m.end();
    match text[end..].chars().next() {
        Some(c) if c.is_alphabetic() || matches!(c, '_' | '\\') => None,
        _ => Some(Lexeme::new(TokenKind::Number, end)),
    }
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{L}_\\][\p{L}\p{N}_.\\?]*").expect("valid regex"))
}

fn lex_name(text: &str, pos: usize, _: &TokenizeOptions) -> Option<Lexeme> {
    let m = name_re().find(&text[pos..])?;
    let name = m.as_str();
    // Bare `R` and `C` are reserved for row/column references.
    if name.eq_ignore_ascii_case("r") || name.eq_ignore_ascii_case("c") {
        return None;
    }
    Some(Lexeme::new(TokenKind::Name, pos + m.end()))
}
