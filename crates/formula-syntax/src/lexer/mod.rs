//! Formula tokenizer.
//!
//! [`tokenize`] never fails. Text that no rule recognizes becomes [`TokenKind::Unknown`], and
//! strings or quoted prefixes still open at the end of input are flagged `unterminated` so editors
//! can highlight in-progress typing.

mod merge;
pub(crate) mod rules;

use serde::{Deserialize, Serialize};

use crate::token::{Span, Token, TokenKind};

pub use merge::merge_ref_tokens;
pub use rules::ERROR_LITERALS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizeOptions {
    /// Attach byte spans to every token.
    pub with_location: bool,
    /// Fuse `context ! reference` runs into one reference token.
    pub merge_refs: bool,
    /// Fuse a leading unary minus into the following number.
    pub negative_numbers: bool,
    /// Recognize partial ranges such as `A1:A` or `R1C1:R`.
    pub allow_ternary: bool,
    /// Recognize references in R1C1 notation instead of A1.
    pub r1c1: bool,
    /// Keep workbook and sheet separate and allow workbook-only prefixes (`[1]!Name`).
    pub xlsx: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            with_location: false,
            merge_refs: true,
            negative_numbers: true,
            allow_ternary: false,
            r1c1: false,
            xlsx: false,
        }
    }
}

const TRIM_OPERATORS: [&str; 3] = [".:", ":.", ".:."];

/// Break formula text into tokens.
///
/// ```
/// use formula_syntax::{tokenize, TokenKind, TokenizeOptions};
///
/// let tokens = tokenize("=SUM(Sheet1!A1:B2)", &TokenizeOptions::default());
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     [TokenKind::FxPrefix, TokenKind::Func, TokenKind::Operator, TokenKind::Range, TokenKind::Operator]
/// );
/// assert_eq!(tokens[3].value, "Sheet1!A1:B2");
/// ```
pub fn tokenize(formula: &str, opts: &TokenizeOptions) -> Vec<Token> {
    log::trace!("tokenize: {} bytes", formula.len());

    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;
    if formula.starts_with('=') {
        tokens.push(Token::new(TokenKind::FxPrefix, "=").with_span(Span::new(0, 1)));
        pos = 1;
    }

    while pos < formula.len() {
        let (kind, end, unterminated) = match rules::next_lexeme(formula, pos, opts) {
            Some(lexeme) => (lexeme.kind, lexeme.end, lexeme.unterminated),
            None => {
                let width = formula[pos..].chars().next().map_or(1, char::len_utf8);
                (TokenKind::Unknown, pos + width, false)
            }
        };
        let token = Token {
            unterminated,
            ..Token::new(kind, &formula[pos..end]).with_span(Span::new(pos, end))
        };
        push_token(&mut tokens, token, opts);
        pos = end;
    }

    if opts.merge_refs {
        tokens = merge_ref_tokens(tokens);
    }
    resolve_trim_operators(&mut tokens);
    reclassify_row_col_names(&mut tokens);

    if !opts.with_location {
        for token in &mut tokens {
            token.span = None;
        }
    }
    tokens
}

/// [`tokenize`] with xlsx prefix syntax forced on.
pub fn tokenize_xlsx(formula: &str, opts: &TokenizeOptions) -> Vec<Token> {
    tokenize(
        formula,
        &TokenizeOptions {
            xlsx: true,
            ..*opts
        },
    )
}

fn join_spans(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Span::new(a.start, b.end)),
        (a, b) => a.or(b),
    }
}

fn append_to(last: &mut Token, token: Token) {
    last.value.push_str(&token.value);
    last.span = join_spans(last.span, token.span);
    last.unterminated |= token.unterminated;
}

/// A token that completes an operand, after which `-` is subtraction.
fn ends_operand(token: &Token) -> bool {
    token.is_operand()
        || (token.kind == TokenKind::Operator && matches!(token.value.as_str(), "%" | ")" | "}" | "#"))
}

fn push_token(tokens: &mut Vec<Token>, token: Token, opts: &TokenizeOptions) {
    if let Some(last) = tokens.last_mut() {
        let contaminates = match token.kind {
            TokenKind::Unknown => {
                matches!(last.kind, TokenKind::Unknown | TokenKind::Name | TokenKind::Func)
            }
            TokenKind::Name | TokenKind::Func => last.kind == TokenKind::Unknown,
            _ => false,
        };
        if contaminates {
            last.kind = TokenKind::Unknown;
            append_to(last, token);
            return;
        }
    }

    if token.kind == TokenKind::Number && opts.negative_numbers && fuses_with_minus(tokens) {
        if let Some(mut minus) = tokens.pop() {
            minus.kind = TokenKind::Number;
            append_to(&mut minus, token);
            tokens.push(minus);
            return;
        }
    }
    tokens.push(token);
}

/// The last token is `-` and the significant token before it does not end an operand.
fn fuses_with_minus(tokens: &[Token]) -> bool {
    let Some((minus, before)) = tokens.split_last() else {
        return false;
    };
    if !minus.is_operator("-") {
        return false;
    }
    match before.iter().rev().find(|t| !t.is_whitespace()) {
        None => true,
        Some(prev) => prev.is_fx_prefix() || !ends_operand(prev),
    }
}

fn is_pending_trim(token: &Token) -> bool {
    token.kind == TokenKind::Unknown && TRIM_OPERATORS.contains(&token.value.as_str())
}

/// Promote a trim operator to [`TokenKind::Operator`] when a range sits directly on both sides;
/// otherwise leave it unknown and flag it.
fn resolve_trim_operators(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if !is_pending_trim(&tokens[i]) {
            continue;
        }
        let between_ranges = i > 0
            && tokens[i - 1].kind == TokenKind::Range
            && tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Range);
        if between_ranges {
            tokens[i].kind = TokenKind::Operator;
        } else {
            log::debug!("trim operator '{}' has no range on both sides", tokens[i].value);
            tokens[i].error = true;
        }
    }
}

fn is_scoping_function(name: &str) -> bool {
    let name = name
        .strip_prefix("_xlfn.")
        .or_else(|| name.strip_prefix("_XLFN."))
        .unwrap_or(name);
    name.eq_ignore_ascii_case("LAMBDA") || name.eq_ignore_ascii_case("LET")
}

/// Inside `LAMBDA(` and `LET(` bare `r` and `c` are ordinary parameter names.
fn reclassify_row_col_names(tokens: &mut [Token]) {
    let mut depth = 0usize;
    let mut scopes: Vec<usize> = Vec::new();
    for i in 0..tokens.len() {
        if tokens[i].is_operator("(") {
            depth += 1;
            if i > 0 && tokens[i - 1].is_function() && is_scoping_function(&tokens[i - 1].value) {
                scopes.push(depth);
            }
        } else if tokens[i].is_operator(")") {
            if scopes.last() == Some(&depth) {
                scopes.pop();
            }
            depth = depth.saturating_sub(1);
        } else if !scopes.is_empty()
            && tokens[i].kind == TokenKind::Unknown
            && (tokens[i].value.eq_ignore_ascii_case("r") || tokens[i].value.eq_ignore_ascii_case("c"))
        {
            tokens[i].kind = TokenKind::Name;
        }
    }
}
