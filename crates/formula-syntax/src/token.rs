//! Token record produced by the tokenizer.

use serde::{Deserialize, Serialize};

/// Byte range into the tokenized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// The leading `=`.
    FxPrefix,
    Number,
    String,
    Bool,
    Error,
    Operator,
    Whitespace,
    Newline,
    Func,
    /// Unquoted sheet/workbook prefix before `!`.
    Context,
    /// Quoted sheet/workbook prefix before `!`.
    ContextQuote,
    Range,
    #[serde(rename = "range_beam")]
    Beam,
    #[serde(rename = "range_named")]
    Name,
    #[serde(rename = "range_ternary")]
    Ternary,
    Structured,
    Unknown,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::FxPrefix => "fx_prefix",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Bool => "bool",
            TokenKind::Error => "error",
            TokenKind::Operator => "operator",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Newline => "newline",
            TokenKind::Func => "func",
            TokenKind::Context => "context",
            TokenKind::ContextQuote => "context_quote",
            TokenKind::Range => "range",
            TokenKind::Beam => "range_beam",
            TokenKind::Name => "range_named",
            TokenKind::Ternary => "range_ternary",
            TokenKind::Structured => "structured",
            TokenKind::Unknown => "unknown",
        }
    }

    /// Any reference token, including defined names and table references.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            TokenKind::Range
                | TokenKind::Beam
                | TokenKind::Name
                | TokenKind::Ternary
                | TokenKind::Structured
        )
    }

    /// Range, beam or partial range (not names, not tables).
    pub fn is_range(self) -> bool {
        matches!(self, TokenKind::Range | TokenKind::Beam | TokenKind::Ternary)
    }

    /// Literal value tokens: numbers, strings, booleans and error values.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Number | TokenKind::String | TokenKind::Bool | TokenKind::Error
        )
    }

    /// Literal or reference: a token that can stand as a complete operand.
    pub fn is_operand(self) -> bool {
        self.is_literal() || self.is_reference()
    }

    /// Tokens without meaning to the parser.
    pub fn is_whitespace(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Newline)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub value: String,
    #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// A string or quoted prefix that ran to the end of the input without closing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unterminated: bool,
    /// A trim operator that could not attach to a range on both sides.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            span: None,
            unterminated: false,
            error: false,
        }
    }

    #[must_use]
    pub fn with_span(self, span: Span) -> Self {
        Self {
            span: Some(span),
            ..self
        }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.value == op
    }

    pub fn is_reference(&self) -> bool {
        self.kind.is_reference()
    }

    pub fn is_range(&self) -> bool {
        self.kind.is_range()
    }

    pub fn is_literal(&self) -> bool {
        self.kind.is_literal()
    }

    pub fn is_operand(&self) -> bool {
        self.kind.is_operand()
    }

    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind.is_whitespace()
    }

    pub fn is_function(&self) -> bool {
        self.kind == TokenKind::Func
    }

    pub fn is_fx_prefix(&self) -> bool {
        self.kind == TokenKind::FxPrefix
    }

    /// Replace the text of a token in a stream being rewritten left to right.
    ///
    /// `skew` is the running byte difference between the rewritten and the original text. The
    /// span is shifted by it and resized to the new text, then `skew` is updated.
    pub(crate) fn rewrite_value(&mut self, value: Option<String>, skew: &mut isize) {
        let old_len = self.value.len();
        if let Some(value) = value {
            self.value = value;
        }
        if let Some(span) = self.span {
            let start = span.start.saturating_add_signed(*skew);
            self.span = Some(Span::new(start, start + self.value.len()));
        }
        *skew += self.value.len() as isize - old_len as isize;
    }
}

/// Concatenate token values back into formula text.
pub fn stringify_tokens(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.value.as_str()).collect()
}
