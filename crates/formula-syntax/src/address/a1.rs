//! A1 dialect: `A1`, `$A$1:B2`, `A:A`, `1:1`, partial `A1:A`.

use super::column::{from_col, from_row, to_col, to_row};
use super::context::stringify_context;
use super::structured::stringify_table;
use super::{
    clamp_col, clamp_row, join_operator_at, split_reference_tokens, A1Range, RangeShape,
    RefOptions, RefTarget, Reference, Trim,
};
use crate::lexer::{tokenize, TokenizeOptions};
use crate::token::TokenKind;
use crate::{AddressError, MAX_COL_INDEX, MAX_ROW_INDEX};

/// One coordinate with its absolute (`$`) flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Coord {
    pub value: u32,
    pub abs: bool,
}

/// One side of a range: a column part, a row part or both (a cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct A1Part {
    pub row: Option<Coord>,
    pub col: Option<Coord>,
}

/// Scan the longest A1 part (`$A$1`, `A`, `$12`) starting at byte `pos`.
///
/// Returns the part and the byte offset just past it. Does not check what follows.
pub(crate) fn scan_a1_part(text: &str, pos: usize) -> Option<(A1Part, usize)> {
    let bytes = text.as_bytes();
    let mut i = pos;
    let leading_dollar = bytes.get(i) == Some(&b'$');
    if leading_dollar {
        i += 1;
    }

    let letters = bytes[i.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    let mut col = None;
    let mut row_abs = false;
    if letters > 0 {
        if letters > 3 {
            return None;
        }
        let value = from_col(&text[i..i + letters])?;
        if value > MAX_COL_INDEX {
            return None;
        }
        col = Some(Coord {
            value,
            abs: leading_dollar,
        });
        i += letters;
        if bytes.get(i) == Some(&b'$') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            row_abs = true;
            i += 1;
        }
    } else {
        row_abs = leading_dollar;
    }

    let digits = bytes[i.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let mut row = None;
    if digits > 0 {
        if bytes[i] == b'0' {
            return None;
        }
        let value = from_row(&text[i..i + digits])?;
        if value > MAX_ROW_INDEX {
            return None;
        }
        row = Some(Coord {
            value,
            abs: row_abs,
        });
        i += digits;
    } else if col.is_none() {
        return None;
    }

    Some((A1Part { row, col }, i))
}

/// Join two parts into a rectangle and classify its shape.
pub(crate) fn merge_a1_parts(
    a: A1Part,
    b: A1Part,
    trim: Option<Trim>,
    allow_ternary: bool,
) -> Option<(A1Range, RangeShape)> {
    let coord = |c: Option<Coord>| (c.map(|c| c.value), c.is_some_and(|c| c.abs));
    let (range, shape) = match (a.row, a.col, b.row, b.col) {
        (Some(_), Some(_), Some(_), Some(_)) => {
            let ((top, top_abs), (left, left_abs)) = (coord(a.row), coord(a.col));
            let ((bottom, bottom_abs), (right, right_abs)) = (coord(b.row), coord(b.col));
            let range = A1Range {
                top,
                left,
                bottom,
                right,
                top_abs,
                left_abs,
                bottom_abs,
                right_abs,
                trim,
            };
            (range, RangeShape::Range)
        }
        (None, Some(_), None, Some(_)) => {
            let ((left, left_abs), (right, right_abs)) = (coord(a.col), coord(b.col));
            let range = A1Range {
                left,
                right,
                left_abs,
                right_abs,
                trim,
                ..A1Range::default()
            };
            (range, RangeShape::Beam)
        }
        (Some(_), None, Some(_), None) => {
            let ((top, top_abs), (bottom, bottom_abs)) = (coord(a.row), coord(b.row));
            let range = A1Range {
                top,
                bottom,
                top_abs,
                bottom_abs,
                trim,
                ..A1Range::default()
            };
            (range, RangeShape::Beam)
        }
        // `A1:B` / `B:A1`: column pair bounded, rows open below the cell.
        (Some(_), Some(_), None, Some(_)) | (None, Some(_), Some(_), Some(_)) => {
            if !allow_ternary {
                return None;
            }
            let (cell, other) = if a.row.is_some() { (a, b) } else { (b, a) };
            let ((top, top_abs), (left, left_abs)) = (coord(cell.row), coord(cell.col));
            let (right, right_abs) = coord(other.col);
            let range = A1Range {
                top,
                left,
                right,
                top_abs,
                left_abs,
                right_abs,
                trim,
                ..A1Range::default()
            };
            (range, RangeShape::Ternary)
        }
        // `A1:5` / `5:A1`: row pair bounded, columns open to the right of the cell.
        (Some(_), Some(_), Some(_), None) | (Some(_), None, Some(_), Some(_)) => {
            if !allow_ternary {
                return None;
            }
            let (cell, other) = if a.col.is_some() { (a, b) } else { (b, a) };
            let ((top, top_abs), (left, left_abs)) = (coord(cell.row), coord(cell.col));
            let (bottom, bottom_abs) = coord(other.row);
            let range = A1Range {
                top,
                left,
                bottom,
                top_abs,
                left_abs,
                bottom_abs,
                trim,
                ..A1Range::default()
            };
            (range, RangeShape::Ternary)
        }
        _ => return None,
    };
    Some((range.normalized(), shape))
}

/// Scan a complete A1 range (single cell, joined pair, beam or partial) starting at `pos`.
///
/// Returns the range, its shape and the end offset. The caller checks the boundary after it.
pub(crate) fn scan_a1_range(
    text: &str,
    pos: usize,
    allow_ternary: bool,
    is_boundary: impl Fn(&str, usize) -> bool,
) -> Option<(A1Range, RangeShape, usize)> {
    let (first, first_end) = scan_a1_part(text, pos)?;

    if let Some((op_len, trim)) = join_operator_at(text, first_end) {
        let second_start = first_end + op_len;
        if let Some((second, second_end)) = scan_a1_part(text, second_start) {
            if is_boundary(text, second_end) {
                if let Some((range, shape)) = merge_a1_parts(first, second, trim, allow_ternary) {
                    return Some((range, shape, second_end));
                }
            }
        }
    }

    match first {
        A1Part {
            row: Some(row),
            col: Some(col),
        } if is_boundary(text, first_end) => {
            let range = A1Range {
                top_abs: row.abs,
                bottom_abs: row.abs,
                left_abs: col.abs,
                right_abs: col.abs,
                ..A1Range::cell(row.value, col.value)
            };
            Some((range, RangeShape::Range, first_end))
        }
        _ => None,
    }
}

/// Parse a bare A1 range string (no sheet prefix).
///
/// ```
/// use formula_syntax::address::a1::{from_a1, to_a1};
///
/// let range = from_a1("B2:A1", false).unwrap();
/// assert_eq!(to_a1(&range), "A1:B2");
/// assert!(from_a1("A1:A", false).is_none());
/// assert!(from_a1("A1:A", true).is_some());
/// ```
pub fn from_a1(text: &str, allow_ternary: bool) -> Option<A1Range> {
    let (range, _, end) = scan_a1_range(text, 0, allow_ternary, |_, _| true)?;
    (end == text.len()).then_some(range)
}

fn col_text(col: u32, abs: bool) -> String {
    format!("{}{}", if abs { "$" } else { "" }, to_col(col))
}

fn row_text(row: u32, abs: bool) -> String {
    format!("{}{}", if abs { "$" } else { "" }, to_row(row))
}

fn cell_text(row: u32, row_abs: bool, col: u32, col_abs: bool) -> String {
    format!("{}{}", col_text(col, col_abs), row_text(row, row_abs))
}

/// Serialize a range to its shortest canonical A1 text.
///
/// Coordinates are clamped to the sheet bounds first. A rectangle covering every row collapses
/// to a column beam (`A:B`), one covering every column to a row beam (`1:2`).
pub fn to_a1(range: &A1Range) -> String {
    let mut range = *range;
    if range.top.is_none() && range.bottom.is_some() {
        std::mem::swap(&mut range.top, &mut range.bottom);
        std::mem::swap(&mut range.top_abs, &mut range.bottom_abs);
    }
    if range.left.is_none() && range.right.is_some() {
        std::mem::swap(&mut range.left, &mut range.right);
        std::mem::swap(&mut range.left_abs, &mut range.right_abs);
    }

    let no_top = range.top.is_none();
    let no_left = range.left.is_none();
    let no_bottom = range.bottom.is_none();
    let no_right = range.right.is_none();

    let top = clamp_row(range.top.unwrap_or(0));
    let left = clamp_col(range.left.unwrap_or(0));
    let single_corner = !no_top && !no_left && no_bottom && no_right;
    let (bottom, bottom_abs, right, right_abs) = if single_corner {
        (top, range.top_abs, left, range.left_abs)
    } else {
        (
            clamp_row(range.bottom.unwrap_or(0)),
            range.bottom_abs,
            clamp_col(range.right.unwrap_or(0)),
            range.right_abs,
        )
    };
    let (no_bottom, no_right) = if single_corner {
        (false, false)
    } else {
        (no_bottom, no_right)
    };
    let op = Trim::join_operator(range.trim);

    let all_rows = !no_top && !no_bottom && top == 0 && bottom >= MAX_ROW_INDEX;
    if (all_rows && !no_left && !no_right) || (no_top && no_bottom) {
        return format!(
            "{}{op}{}",
            col_text(left, range.left_abs),
            col_text(right, right_abs)
        );
    }

    let all_cols = !no_left && !no_right && left == 0 && right >= MAX_COL_INDEX;
    if (all_cols && !no_top && !no_bottom) || (no_left && no_right) {
        return format!(
            "{}{op}{}",
            row_text(top, range.top_abs),
            row_text(bottom, bottom_abs)
        );
    }

    let start = cell_text(top, range.top_abs, left, range.left_abs);
    if no_bottom {
        return format!("{start}{op}{}", col_text(right, right_abs));
    }
    if no_right {
        return format!("{start}{op}{}", row_text(bottom, bottom_abs));
    }
    if top != bottom
        || left != right
        || range.top_abs != bottom_abs
        || range.left_abs != right_abs
        || range.trim.is_some()
    {
        return format!("{start}{op}{}", cell_text(bottom, bottom_abs, right, right_abs));
    }
    start
}

/// Parse a possibly prefixed A1 reference: `Sheet1!A1:B2`, `'My Sheet'!A:A`,
/// `[Book.xlsx]Sheet1!Rates`.
///
/// Returns `None` when the text is not exactly one reference.
pub fn parse_a1_ref(text: &str, opts: &RefOptions) -> Option<Reference> {
    let tokens = tokenize(
        text,
        &TokenizeOptions {
            allow_ternary: opts.allow_ternary,
            merge_refs: false,
            negative_numbers: false,
            r1c1: false,
            xlsx: opts.xlsx,
            with_location: false,
        },
    );
    let (context, token) = split_reference_tokens(&tokens, opts.xlsx)?;
    let target = match token.kind {
        TokenKind::Range | TokenKind::Beam | TokenKind::Ternary => {
            RefTarget::Range(from_a1(&token.value, true)?)
        }
        TokenKind::Name if opts.allow_named => RefTarget::Name(token.value.clone()),
        _ => return None,
    };
    Some(Reference { context, target })
}

/// [`parse_a1_ref`] for callers that want an error value.
pub fn parse_a1_ref_checked(text: &str, opts: &RefOptions) -> Result<Reference, AddressError> {
    parse_a1_ref(text, opts).ok_or_else(|| AddressError::Invalid {
        input: text.to_string(),
    })
}

/// Render a reference as A1 text, quoting the context where needed.
pub fn stringify_a1_ref(reference: &Reference) -> String {
    let body = match &reference.target {
        RefTarget::Range(range) => to_a1(range),
        RefTarget::Name(name) => name.clone(),
        RefTarget::Table(table) => stringify_table(table),
    };
    let prefix = stringify_context(&reference.context);
    if prefix.is_empty() {
        body
    } else {
        format!("{prefix}!{body}")
    }
}
