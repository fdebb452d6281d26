use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::Span;

/// A parse failure.
///
/// `offset` counts characters (not bytes) from the start of the formula text that the parser
/// saw, which is the token stream rendered back to text and kept in `formula`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    pub message: String,
    #[serde(rename = "source")]
    pub formula: String,
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, formula: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            formula: formula.into(),
            offset,
            span: None,
        }
    }

    #[must_use]
    pub fn with_span(self, span: Option<Span>) -> Self {
        Self { span, ..self }
    }

    /// Shift the reported position, for formulas embedded in a larger text.
    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            offset: self.offset.saturating_add(delta),
            span: self.span.map(|span| span.add_offset(delta)),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("'{input}' is not a valid reference")]
    Invalid { input: String },
    #[error("reference is outside the sheet bounds")]
    OutOfBounds,
}
