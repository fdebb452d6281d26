//! Reference-address algebra.
//!
//! Ranges are plain records of (possibly unset) coordinates plus per-coordinate absolute flags.
//! An unset coordinate means the axis is open: a range with neither `top` nor `bottom` is a
//! column beam (`A:A`), one with neither `left` nor `right` a row beam (`1:1`).
//!
//! Parsing never fails loudly: "is this string a reference at all" is an ordinary question, so
//! the parse functions return `Option`. The `*_checked` helpers wrap them for callers that want a
//! [`crate::AddressError`].

pub mod a1;
pub mod column;
pub mod context;
pub mod r1c1;
pub mod structured;

use serde::{Deserialize, Serialize};

use crate::token::{Token, TokenKind};
use crate::{AddressError, MAX_COL_INDEX, MAX_ROW_INDEX};

pub use structured::StructuredRef;

/// Spill-trimming variant of the `:` range operator.
///
/// `.:` trims leading blanks (`Head`), `:.` trailing blanks (`Tail`), `.:.` both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trim {
    Head,
    Tail,
    Both,
}

impl Trim {
    /// Classify a range join operator. Returns `None` if `op` is not a join operator at all,
    /// `Some(None)` for a plain `:`.
    pub fn from_operator(op: &str) -> Option<Option<Trim>> {
        match op {
            ":" => Some(None),
            ".:" => Some(Some(Trim::Head)),
            ":." => Some(Some(Trim::Tail)),
            ".:." => Some(Some(Trim::Both)),
            _ => None,
        }
    }

    /// The join operator text for an optional trim tag.
    pub fn join_operator(trim: Option<Trim>) -> &'static str {
        match trim {
            None => ":",
            Some(Trim::Head) => ".:",
            Some(Trim::Tail) => ":.",
            Some(Trim::Both) => ".:.",
        }
    }
}

/// Locate a range join operator (`:`, `.:`, `:.`, `.:.`) starting at byte `pos`.
///
/// Returns the operator length in bytes and its trim tag.
pub(crate) fn join_operator_at(text: &str, pos: usize) -> Option<(usize, Option<Trim>)> {
    let rest = text.get(pos..)?;
    for op in [".:.", ".:", ":.", ":"] {
        if rest.starts_with(op) {
            return Trim::from_operator(op).map(|trim| (op.len(), trim));
        }
    }
    None
}

/// An A1-dialect rectangle. All coordinates are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct A1Range {
    pub top: Option<u32>,
    pub left: Option<u32>,
    pub bottom: Option<u32>,
    pub right: Option<u32>,
    #[serde(rename = "$top", default)]
    pub top_abs: bool,
    #[serde(rename = "$left", default)]
    pub left_abs: bool,
    #[serde(rename = "$bottom", default)]
    pub bottom_abs: bool,
    #[serde(rename = "$right", default)]
    pub right_abs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<Trim>,
}

impl A1Range {
    /// A relative single-cell range.
    #[must_use]
    pub fn cell(row: u32, col: u32) -> Self {
        Self {
            top: Some(row),
            left: Some(col),
            bottom: Some(row),
            right: Some(col),
            ..Self::default()
        }
    }

    /// A relative rectangle spanning the two corners (not normalised).
    #[must_use]
    pub fn rect(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top: Some(top),
            left: Some(left),
            bottom: Some(bottom),
            right: Some(right),
            ..Self::default()
        }
    }

    /// `true` when neither row is set (`A:B`).
    pub fn is_column_beam(&self) -> bool {
        self.top.is_none() && self.bottom.is_none()
    }

    /// `true` when neither column is set (`1:2`).
    pub fn is_row_beam(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// `true` when exactly one end of one axis is open (`A1:A`, `A1:1`).
    pub fn is_ternary(&self) -> bool {
        let all = [self.top, self.left, self.bottom, self.right];
        all.iter().filter(|v| v.is_none()).count() == 1
    }

    /// Swap out-of-order coordinates so that `top <= bottom` and `left <= right`.
    ///
    /// Each value travels together with its own absolute flag.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let (Some(top), Some(bottom)) = (self.top, self.bottom) {
            if top > bottom {
                std::mem::swap(&mut self.top, &mut self.bottom);
                std::mem::swap(&mut self.top_abs, &mut self.bottom_abs);
            }
        }
        if let (Some(left), Some(right)) = (self.left, self.right) {
            if left > right {
                std::mem::swap(&mut self.left, &mut self.right);
                std::mem::swap(&mut self.left_abs, &mut self.right_abs);
            }
        }
        self
    }

    /// Clear every absolute flag.
    #[must_use]
    pub fn to_relative(self) -> Self {
        Self {
            top_abs: false,
            left_abs: false,
            bottom_abs: false,
            right_abs: false,
            ..self
        }
    }

    /// Set every absolute flag.
    #[must_use]
    pub fn to_absolute(self) -> Self {
        Self {
            top_abs: true,
            left_abs: true,
            bottom_abs: true,
            right_abs: true,
            ..self
        }
    }
}

/// An R1C1-dialect rectangle.
///
/// Absolute coordinates are 0-indexed positions (`R1` is `0`); relative coordinates are signed
/// offsets from an anchor cell (`R[-1]` is `-1`, a bare `R` is `0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct R1C1Range {
    pub r0: Option<i32>,
    pub c0: Option<i32>,
    pub r1: Option<i32>,
    pub c1: Option<i32>,
    #[serde(rename = "$r0", default)]
    pub r0_abs: bool,
    #[serde(rename = "$c0", default)]
    pub c0_abs: bool,
    #[serde(rename = "$r1", default)]
    pub r1_abs: bool,
    #[serde(rename = "$c1", default)]
    pub c1_abs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<Trim>,
}

/// Sheet/workbook prefix of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefContext {
    /// Ordered chain of prefixes: `[workbook, sheet]`, `[sheet]` or empty.
    Chain(Vec<String>),
    /// xlsx mode: workbook and sheet are always separate; the workbook may be an external-link
    /// index such as `1`.
    #[serde(rename_all = "camelCase")]
    Xlsx {
        workbook_name: Option<String>,
        sheet_name: Option<String>,
    },
}

impl RefContext {
    /// An empty context in the requested mode.
    pub fn empty(xlsx: bool) -> Self {
        if xlsx {
            RefContext::Xlsx {
                workbook_name: None,
                sheet_name: None,
            }
        } else {
            RefContext::Chain(Vec::new())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RefContext::Chain(parts) => parts.is_empty(),
            RefContext::Xlsx {
                workbook_name,
                sheet_name,
            } => workbook_name.is_none() && sheet_name.is_none(),
        }
    }
}

impl Default for RefContext {
    fn default() -> Self {
        RefContext::Chain(Vec::new())
    }
}

/// What a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefTarget<R> {
    Range(R),
    Name(String),
    Table(StructuredRef),
}

/// A fully parsed reference: context plus target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference<R = A1Range> {
    pub context: RefContext,
    pub target: RefTarget<R>,
}

impl<R> Reference<R> {
    /// The range target, if this reference points at one.
    pub fn range(&self) -> Option<&R> {
        match &self.target {
            RefTarget::Range(range) => Some(range),
            _ => None,
        }
    }

    /// The defined-name target, if this reference points at one.
    pub fn name(&self) -> Option<&str> {
        match &self.target {
            RefTarget::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl Reference {
    /// Parse `Sheet1!A1:B2`, a defined name or a table reference with default options.
    pub fn from_a1_str(text: &str) -> Result<Self, AddressError> {
        let opts = RefOptions::default();
        a1::parse_a1_ref(text, &opts)
            .or_else(|| structured::parse_struct_ref(text, &opts))
            .ok_or_else(|| AddressError::Invalid {
                input: text.to_string(),
            })
    }
}

impl std::str::FromStr for Reference {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1_str(s)
    }
}

/// Options shared by the reference parse functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefOptions {
    /// Accept defined names (`Sheet1!Rates`) as well as ranges.
    pub allow_named: bool,
    /// Accept partial ranges such as `A1:A` / `R1C1:R`.
    pub allow_ternary: bool,
    /// Split contexts into separate workbook/sheet fields and accept `[1]!Name`.
    pub xlsx: bool,
}

impl Default for RefOptions {
    fn default() -> Self {
        Self {
            allow_named: true,
            allow_ternary: false,
            xlsx: false,
        }
    }
}

/// How a scanned range is classified by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RangeShape {
    Range,
    Beam,
    Ternary,
}

impl RangeShape {
    pub(crate) fn token_kind(self) -> TokenKind {
        match self {
            RangeShape::Range => TokenKind::Range,
            RangeShape::Beam => TokenKind::Beam,
            RangeShape::Ternary => TokenKind::Ternary,
        }
    }
}

/// Match `[context, "!", target]` or `[target]` and split off the context.
pub(crate) fn split_reference_tokens(tokens: &[Token], xlsx: bool) -> Option<(RefContext, &Token)> {
    match tokens {
        [target] if !target.unterminated => Some((RefContext::empty(xlsx), target)),
        [prefix, bang, target]
            if matches!(prefix.kind, TokenKind::Context | TokenKind::ContextQuote)
                && bang.kind == TokenKind::Operator
                && bang.value == "!"
                && !prefix.unterminated
                && !target.unterminated =>
        {
            Some((context::split_context(&prefix.value, xlsx)?, target))
        }
        _ => None,
    }
}

pub(crate) fn clamp_row(row: u32) -> u32 {
    row.min(MAX_ROW_INDEX)
}

pub(crate) fn clamp_col(col: u32) -> u32 {
    col.min(MAX_COL_INDEX)
}

/// Clamp a signed R1C1 coordinate: absolute values into `[0, max]`, relative offsets into
/// `[-max, max]`.
pub(crate) fn clamp_signed(value: i32, abs: bool, max: u32) -> i32 {
    let max = max as i32;
    let min = if abs { 0 } else { -max };
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_operator_detection() {
        assert_eq!(join_operator_at("A1:B2", 2), Some((1, None)));
        assert_eq!(join_operator_at("A1.:B2", 2), Some((2, Some(Trim::Head))));
        assert_eq!(join_operator_at("A1:.B2", 2), Some((2, Some(Trim::Tail))));
        assert_eq!(join_operator_at("A1.:.B2", 2), Some((3, Some(Trim::Both))));
        assert_eq!(join_operator_at("A1+B2", 2), None);
    }

    #[test]
    fn normalisation_swaps_values_with_their_flags() {
        let range = A1Range {
            top_abs: true,
            ..A1Range::rect(5, 3, 1, 0)
        }
        .normalized();
        assert_eq!(range.top, Some(1));
        assert_eq!(range.bottom, Some(5));
        assert!(!range.top_abs);
        assert!(range.bottom_abs);
        assert_eq!((range.left, range.right), (Some(0), Some(3)));
    }

    #[test]
    fn beam_and_ternary_shapes() {
        let cols = A1Range {
            left: Some(0),
            right: Some(1),
            ..A1Range::default()
        };
        assert!(cols.is_column_beam());
        assert!(!cols.is_row_beam());

        let ternary = A1Range {
            bottom: None,
            ..A1Range::cell(0, 0)
        };
        assert!(ternary.is_ternary());
    }
}
