//! Rewriting references between R1C1 and A1 notation, anchored at a cell.

use serde::{Deserialize, Serialize};

use crate::address::a1::{from_a1, to_a1};
use crate::address::r1c1::{from_r1c1, to_r1c1};
use crate::address::{A1Range, R1C1Range};
use crate::lexer::{tokenize, TokenizeOptions};
use crate::token::{stringify_tokens, Token, TokenKind};
use crate::{AddressError, MAX_COL_INDEX, MAX_ROW_INDEX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Wrap coordinates that fall off the sheet around to the other side. When off, such
    /// references become `#REF!`.
    pub wrap_edges: bool,
    /// Translate `Sheet1!R1C1` as one token so an out-of-bounds result replaces the prefix too.
    pub merge_refs: bool,
    pub xlsx: bool,
    pub allow_ternary: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            wrap_edges: true,
            merge_refs: true,
            xlsx: false,
            allow_ternary: true,
        }
    }
}

impl TranslateOptions {
    fn tokenize_options(&self, r1c1: bool) -> TokenizeOptions {
        TokenizeOptions {
            with_location: false,
            merge_refs: self.merge_refs,
            negative_numbers: false,
            allow_ternary: self.allow_ternary,
            r1c1,
            xlsx: self.xlsx,
        }
    }
}

/// Parse an anchor such as `B2` or `$B$2` into a 0-indexed `(row, col)`.
fn anchor_cell(anchor: &str) -> Result<(u32, u32), AddressError> {
    let invalid = || AddressError::Invalid {
        input: anchor.to_string(),
    };
    let range = from_a1(anchor, false).ok_or_else(invalid)?;
    match (range.top, range.left, range.bottom, range.right) {
        (Some(top), Some(left), Some(bottom), Some(right)) if top == bottom && left == right => {
            Ok((top, left))
        }
        _ => Err(invalid()),
    }
}

fn resolve(value: Option<i32>, abs: bool, anchor: u32, max: u32, wrap: bool) -> Result<Option<u32>, AddressError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let position = if abs {
        i64::from(value)
    } else {
        i64::from(anchor) + i64::from(value)
    };
    let size = i64::from(max) + 1;
    if (0..size).contains(&position) {
        return Ok(Some(position as u32));
    }
    if wrap {
        Ok(Some(position.rem_euclid(size) as u32))
    } else {
        Err(AddressError::OutOfBounds)
    }
}

/// Resolve an R1C1 range against an anchor cell.
///
/// Relative offsets that land off the sheet wrap around when `wrap_edges` is set and fail with
/// [`AddressError::OutOfBounds`] otherwise.
pub fn r1c1_to_a1_range(
    range: &R1C1Range,
    anchor_row: u32,
    anchor_col: u32,
    wrap_edges: bool,
) -> Result<A1Range, AddressError> {
    let row = |v, abs| resolve(v, abs, anchor_row, MAX_ROW_INDEX, wrap_edges);
    let col = |v, abs| resolve(v, abs, anchor_col, MAX_COL_INDEX, wrap_edges);
    Ok(A1Range {
        top: row(range.r0, range.r0_abs)?,
        left: col(range.c0, range.c0_abs)?,
        bottom: row(range.r1, range.r1_abs)?,
        right: col(range.c1, range.c1_abs)?,
        top_abs: range.r0_abs,
        left_abs: range.c0_abs,
        bottom_abs: range.r1_abs,
        right_abs: range.c1_abs,
        trim: range.trim,
    }
    .normalized())
}

/// Express an A1 range relative to an anchor cell.
pub fn a1_to_r1c1_range(range: &A1Range, anchor_row: u32, anchor_col: u32) -> R1C1Range {
    let offset = |v: Option<u32>, abs: bool, anchor: u32| {
        v.map(|v| {
            if abs {
                v as i32
            } else {
                (i64::from(v) - i64::from(anchor)) as i32
            }
        })
    };
    R1C1Range {
        r0: offset(range.top, range.top_abs, anchor_row),
        c0: offset(range.left, range.left_abs, anchor_col),
        r1: offset(range.bottom, range.bottom_abs, anchor_row),
        c1: offset(range.right, range.right_abs, anchor_col),
        r0_abs: range.top_abs,
        c0_abs: range.left_abs,
        r1_abs: range.bottom_abs,
        c1_abs: range.right_abs,
        trim: range.trim,
    }
}

/// Split `Sheet1!A1` into `("Sheet1!", "A1")`. References themselves never contain `!`.
fn split_prefix(value: &str) -> (&str, &str) {
    match value.rfind('!') {
        Some(i) => value.split_at(i + 1),
        None => ("", value),
    }
}

/// Rewrite every R1C1 range token as A1, anchored at `anchor` (e.g. `"B2"`).
///
/// Spans, when present, are recomputed to match the rewritten text.
pub fn translate_tokens_to_a1(
    tokens: &[Token],
    anchor: &str,
    opts: &TranslateOptions,
) -> Result<Vec<Token>, AddressError> {
    let (anchor_row, anchor_col) = anchor_cell(anchor)?;
    let mut skew = 0isize;
    let mut out = Vec::with_capacity(tokens.len());

    for token in tokens {
        let mut token = token.clone();
        let mut value = None;
        if token.is_range() {
            let (prefix, body) = split_prefix(&token.value);
            if let Some(range) = from_r1c1(body, true) {
                match r1c1_to_a1_range(&range, anchor_row, anchor_col, opts.wrap_edges) {
                    Ok(range) => value = Some(format!("{prefix}{}", to_a1(&range))),
                    Err(_) => {
                        log::debug!("'{}' is off the sheet from {anchor}, using #REF!", token.value);
                        token.kind = TokenKind::Error;
                        value = Some("#REF!".to_string());
                    }
                }
            }
        }
        token.rewrite_value(value, &mut skew);
        out.push(token);
    }
    Ok(out)
}

/// Rewrite R1C1 formula text as A1.
///
/// ```
/// use formula_syntax::{translate_formula_to_a1, TranslateOptions};
///
/// let opts = TranslateOptions::default();
/// assert_eq!(translate_formula_to_a1("=R1C1", "B2", &opts).unwrap(), "=$A$1");
/// assert_eq!(translate_formula_to_a1("=SUM(RC[-1]:R[2]C)", "B2", &opts).unwrap(), "=SUM(A2:B4)");
/// ```
pub fn translate_formula_to_a1(
    formula: &str,
    anchor: &str,
    opts: &TranslateOptions,
) -> Result<String, AddressError> {
    let tokens = tokenize(formula, &opts.tokenize_options(true));
    Ok(stringify_tokens(&translate_tokens_to_a1(&tokens, anchor, opts)?))
}

/// Rewrite every A1 range token as R1C1 relative to `anchor`.
pub fn translate_tokens_to_r1c1(
    tokens: &[Token],
    anchor: &str,
    _opts: &TranslateOptions,
) -> Result<Vec<Token>, AddressError> {
    let (anchor_row, anchor_col) = anchor_cell(anchor)?;
    let mut skew = 0isize;
    let mut out = Vec::with_capacity(tokens.len());

    for token in tokens {
        let mut token = token.clone();
        let mut value = None;
        if token.is_range() {
            let (prefix, body) = split_prefix(&token.value);
            if let Some(range) = from_a1(body, true) {
                let r1c1 = a1_to_r1c1_range(&range, anchor_row, anchor_col);
                value = Some(format!("{prefix}{}", to_r1c1(&r1c1)));
            }
        }
        token.rewrite_value(value, &mut skew);
        out.push(token);
    }
    Ok(out)
}

/// Rewrite A1 formula text as R1C1.
pub fn translate_formula_to_r1c1(
    formula: &str,
    anchor: &str,
    opts: &TranslateOptions,
) -> Result<String, AddressError> {
    let tokens = tokenize(formula, &opts.tokenize_options(false));
    Ok(stringify_tokens(&translate_tokens_to_r1c1(&tokens, anchor, opts)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;
    use pretty_assertions::assert_eq;

    fn to_a1_text(formula: &str, anchor: &str) -> String {
        translate_formula_to_a1(formula, anchor, &TranslateOptions::default()).unwrap()
    }

    #[test]
    fn absolute_and_relative_coordinates() {
        assert_eq!(to_a1_text("=R1C1", "B2"), "=$A$1");
        assert_eq!(to_a1_text("=RC", "B2"), "=B2");
        assert_eq!(to_a1_text("=R[1]C[-1]", "B2"), "=A3");
        assert_eq!(to_a1_text("=R2C[1]", "B2"), "=C$2");
        assert_eq!(to_a1_text("=Sheet1!R[-1]C", "C3"), "=Sheet1!C2");
        assert_eq!(to_a1_text("=SUM(R:R[1])", "A5"), "=SUM(5:6)");
        assert_eq!(to_a1_text("=C2:C3", "A1"), "=$B:$C");
    }

    #[test]
    fn other_tokens_are_untouched() {
        assert_eq!(
            to_a1_text("=IF(R1C1>1,\"R1C1\",Rates)", "A1"),
            "=IF($A$1>1,\"R1C1\",Rates)"
        );
    }

    #[test]
    fn edges_wrap_or_become_ref_errors() {
        assert_eq!(to_a1_text("=R[-1]C[-1]", "A1"), "=XFD1048576");
        let no_wrap = TranslateOptions {
            wrap_edges: false,
            ..TranslateOptions::default()
        };
        assert_eq!(
            translate_formula_to_a1("=R[-1]C[-1]", "A1", &no_wrap).unwrap(),
            "=#REF!"
        );
        assert_eq!(
            translate_formula_to_a1("=Sheet1!R[-1]C+1", "A1", &no_wrap).unwrap(),
            "=#REF!+1"
        );
        let unmerged = TranslateOptions {
            merge_refs: false,
            ..no_wrap
        };
        assert_eq!(
            translate_formula_to_a1("=Sheet1!R[-1]C+1", "A1", &unmerged).unwrap(),
            "=Sheet1!#REF!+1"
        );
    }

    #[test]
    fn bad_anchor_is_an_error() {
        let opts = TranslateOptions::default();
        assert!(translate_formula_to_a1("=RC", "A1:B2", &opts).is_err());
        assert!(translate_formula_to_a1("=RC", "nope", &opts).is_err());
    }

    #[test]
    fn spans_follow_rewritten_text() {
        let tokens = tokenize(
            "=R[1]C[1]+R1C1",
            &TokenizeOptions {
                with_location: true,
                r1c1: true,
                ..TokenizeOptions::default()
            },
        );
        let out = translate_tokens_to_a1(&tokens, "A1", &TranslateOptions::default()).unwrap();
        let spans: Vec<_> = out.iter().map(|t| (t.value.as_str(), t.span)).collect();
        assert_eq!(
            spans,
            [
                ("=", Some(Span::new(0, 1))),
                ("B2", Some(Span::new(1, 3))),
                ("+", Some(Span::new(3, 4))),
                ("$A$1", Some(Span::new(4, 8))),
            ]
        );
    }

    #[test]
    fn a1_to_r1c1() {
        let opts = TranslateOptions::default();
        assert_eq!(
            translate_formula_to_r1c1("=SUM(A1:B2)+$C$3", "B2", &opts).unwrap(),
            "=SUM(R[-1]C[-1]:RC)+R3C3"
        );
        assert_eq!(
            translate_formula_to_r1c1("=A:A", "C3", &opts).unwrap(),
            "=C[-2]"
        );
        assert_eq!(
            translate_formula_to_r1c1("='My Sheet'!B2", "B2", &opts).unwrap(),
            "='My Sheet'!RC"
        );
    }
}
