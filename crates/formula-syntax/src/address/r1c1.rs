//! R1C1 dialect: `R1C1`, `R[-1]C`, `R2:R5`, `C[1]`, partial `R1C1:R`.

use super::context::stringify_context;
use super::structured::stringify_table;
use super::{
    clamp_signed, join_operator_at, split_reference_tokens, R1C1Range, RangeShape, RefOptions,
    RefTarget, Reference, Trim,
};
use crate::lexer::{tokenize, TokenizeOptions};
use crate::token::TokenKind;
use crate::{AddressError, MAX_COL_INDEX, MAX_ROW_INDEX};

/// One R1C1 axis value: an absolute 0-indexed position or a relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Axis {
    pub value: i32,
    pub abs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct R1C1Part {
    pub row: Option<Axis>,
    pub col: Option<Axis>,
}

fn scan_axis(text: &str, pos: usize, letter: u8, max: u32) -> Option<(Option<Axis>, usize)> {
    let bytes = text.as_bytes();
    if !bytes
        .get(pos)
        .is_some_and(|b| b.to_ascii_uppercase() == letter)
    {
        return Some((None, pos));
    }
    let mut i = pos + 1;
    let max = max as i64;

    if bytes.get(i) == Some(&b'[') {
        i += 1;
        let sign_start = i;
        if matches!(bytes.get(i), Some(b'-') | Some(b'+')) {
            i += 1;
        }
        let digits = bytes[i.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 || bytes.get(i + digits) != Some(&b']') {
            return None;
        }
        let value: i64 = text[sign_start..i + digits].parse().ok()?;
        if value.abs() > max {
            return None;
        }
        return Some((
            Some(Axis {
                value: value as i32,
                abs: false,
            }),
            i + digits + 1,
        ));
    }

    let digits = bytes[i.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return Some((Some(Axis { value: 0, abs: false }), i));
    }
    if bytes[i] == b'0' {
        return None;
    }
    let value: i64 = text[i..i + digits].parse().ok()?;
    if value - 1 > max {
        return None;
    }
    Some((
        Some(Axis {
            value: (value - 1) as i32,
            abs: true,
        }),
        i + digits,
    ))
}

/// Scan the longest R1C1 part (`R1C1`, `R[-2]`, `C`) starting at byte `pos`.
pub(crate) fn scan_r1c1_part(text: &str, pos: usize) -> Option<(R1C1Part, usize)> {
    let (row, after_row) = scan_axis(text, pos, b'R', MAX_ROW_INDEX)?;
    let (col, end) = scan_axis(text, after_row, b'C', MAX_COL_INDEX)?;
    if row.is_none() && col.is_none() {
        return None;
    }
    Some((R1C1Part { row, col }, end))
}

/// Order a pair of axis values. Pairs sharing the same flag are sorted; mixed pairs keep their
/// written order since an absolute and a relative value cannot be compared without an anchor.
fn order(a: Axis, b: Axis) -> (Axis, Axis) {
    if a.abs == b.abs && a.value > b.value {
        (b, a)
    } else {
        (a, b)
    }
}

fn split(axis: Option<Axis>) -> (Option<i32>, bool) {
    (axis.map(|a| a.value), axis.is_some_and(|a| a.abs))
}

pub(crate) fn merge_r1c1_parts(
    a: R1C1Part,
    b: R1C1Part,
    trim: Option<Trim>,
    allow_ternary: bool,
) -> Option<(R1C1Range, RangeShape)> {
    let pair = |x: Option<Axis>, y: Option<Axis>| match (x, y) {
        (Some(x), Some(y)) => {
            let (lo, hi) = order(x, y);
            (split(Some(lo)), split(Some(hi)))
        }
        _ => (split(x), split(y)),
    };

    match (a.row, a.col, b.row, b.col) {
        (Some(_), Some(_), Some(_), Some(_)) => {
            let ((r0, r0_abs), (r1, r1_abs)) = pair(a.row, b.row);
            let ((c0, c0_abs), (c1, c1_abs)) = pair(a.col, b.col);
            Some((
                R1C1Range {
                    r0,
                    c0,
                    r1,
                    c1,
                    r0_abs,
                    c0_abs,
                    r1_abs,
                    c1_abs,
                    trim,
                },
                RangeShape::Range,
            ))
        }
        (Some(_), None, Some(_), None) => {
            let ((r0, r0_abs), (r1, r1_abs)) = pair(a.row, b.row);
            Some((
                R1C1Range {
                    r0,
                    r1,
                    r0_abs,
                    r1_abs,
                    trim,
                    ..R1C1Range::default()
                },
                RangeShape::Beam,
            ))
        }
        (None, Some(_), None, Some(_)) => {
            let ((c0, c0_abs), (c1, c1_abs)) = pair(a.col, b.col);
            Some((
                R1C1Range {
                    c0,
                    c1,
                    c0_abs,
                    c1_abs,
                    trim,
                    ..R1C1Range::default()
                },
                RangeShape::Beam,
            ))
        }
        // `R1C1:C3`: rows open below the cell.
        (Some(_), Some(_), None, Some(_)) | (None, Some(_), Some(_), Some(_)) if allow_ternary => {
            let (cell, other) = if a.row.is_some() { (a, b) } else { (b, a) };
            let (r0, r0_abs) = split(cell.row);
            let ((c0, c0_abs), (c1, c1_abs)) = pair(cell.col, other.col);
            Some((
                R1C1Range {
                    r0,
                    c0,
                    c1,
                    r0_abs,
                    c0_abs,
                    c1_abs,
                    trim,
                    ..R1C1Range::default()
                },
                RangeShape::Ternary,
            ))
        }
        // `R1C1:R4`: columns open to the right of the cell.
        (Some(_), Some(_), Some(_), None) | (Some(_), None, Some(_), Some(_)) if allow_ternary => {
            let (cell, other) = if a.col.is_some() { (a, b) } else { (b, a) };
            let (c0, c0_abs) = split(cell.col);
            let ((r0, r0_abs), (r1, r1_abs)) = pair(cell.row, other.row);
            Some((
                R1C1Range {
                    r0,
                    c0,
                    r1,
                    r0_abs,
                    c0_abs,
                    r1_abs,
                    trim,
                    ..R1C1Range::default()
                },
                RangeShape::Ternary,
            ))
        }
        _ => None,
    }
}

fn single_part(part: R1C1Part) -> (R1C1Range, RangeShape) {
    let (r, r_abs) = split(part.row);
    let (c, c_abs) = split(part.col);
    let shape = if part.row.is_some() && part.col.is_some() {
        RangeShape::Range
    } else {
        RangeShape::Beam
    };
    let range = R1C1Range {
        r0: r,
        c0: c,
        r1: r,
        c1: c,
        r0_abs: r_abs,
        c0_abs: c_abs,
        r1_abs: r_abs,
        c1_abs: c_abs,
        trim: None,
    };
    (range, shape)
}

/// Scan a complete R1C1 range starting at `pos`. A lone row or column part is a beam.
pub(crate) fn scan_r1c1_range(
    text: &str,
    pos: usize,
    allow_ternary: bool,
    is_boundary: impl Fn(&str, usize) -> bool,
) -> Option<(R1C1Range, RangeShape, usize)> {
    let (first, first_end) = scan_r1c1_part(text, pos)?;

    if let Some((op_len, trim)) = join_operator_at(text, first_end) {
        if let Some((second, second_end)) = scan_r1c1_part(text, first_end + op_len) {
            if is_boundary(text, second_end) {
                if let Some((range, shape)) =
                    merge_r1c1_parts(first, second, trim, allow_ternary)
                {
                    return Some((range, shape, second_end));
                }
            }
        }
    }

    if !is_boundary(text, first_end) {
        return None;
    }
    let (range, shape) = single_part(first);
    Some((range, shape, first_end))
}

/// Parse a bare R1C1 range string (no sheet prefix).
///
/// ```
/// use formula_syntax::address::r1c1::from_r1c1;
///
/// let range = from_r1c1("R[-1]C2", false).unwrap();
/// assert_eq!((range.r0, range.r0_abs), (Some(-1), false));
/// assert_eq!((range.c0, range.c0_abs), (Some(1), true));
/// ```
pub fn from_r1c1(text: &str, allow_ternary: bool) -> Option<R1C1Range> {
    let (range, _, end) = scan_r1c1_range(text, 0, allow_ternary, |_, _| true)?;
    (end == text.len()).then_some(range)
}

fn axis_text(letter: char, value: i32, abs: bool) -> String {
    if abs {
        format!("{letter}{}", i64::from(value) + 1)
    } else if value == 0 {
        letter.to_string()
    } else {
        format!("{letter}[{value}]")
    }
}

/// Serialize a range to R1C1 text.
///
/// Values are clamped first: absolute positions into the sheet, relative offsets into
/// `[-max, max]`. A range spanning every row (both ends absolute) collapses to a column form.
pub fn to_r1c1(range: &R1C1Range) -> String {
    let mut range = *range;
    if range.r0.is_none() && range.r1.is_some() {
        std::mem::swap(&mut range.r0, &mut range.r1);
        std::mem::swap(&mut range.r0_abs, &mut range.r1_abs);
    }
    if range.c0.is_none() && range.c1.is_some() {
        std::mem::swap(&mut range.c0, &mut range.c1);
        std::mem::swap(&mut range.c0_abs, &mut range.c1_abs);
    }
    if range.r0.is_some() && range.c0.is_some() && range.r1.is_none() && range.c1.is_none() {
        range.r1 = range.r0;
        range.c1 = range.c0;
        range.r1_abs = range.r0_abs;
        range.c1_abs = range.c0_abs;
    }

    let clamp_row = |v: Option<i32>, abs: bool| v.map(|v| clamp_signed(v, abs, MAX_ROW_INDEX));
    let clamp_col = |v: Option<i32>, abs: bool| v.map(|v| clamp_signed(v, abs, MAX_COL_INDEX));
    let r0 = clamp_row(range.r0, range.r0_abs);
    let r1 = clamp_row(range.r1, range.r1_abs);
    let c0 = clamp_col(range.c0, range.c0_abs);
    let c1 = clamp_col(range.c1, range.c1_abs);
    let op = Trim::join_operator(range.trim);

    let all_rows = range.r0_abs
        && range.r1_abs
        && r0 == Some(0)
        && r1.is_some_and(|r| r >= MAX_ROW_INDEX as i32);
    let all_cols = range.c0_abs
        && range.c1_abs
        && c0 == Some(0)
        && c1.is_some_and(|c| c >= MAX_COL_INDEX as i32);

    let pair_text = |a: String, b: String| {
        if a == b && range.trim.is_none() {
            a
        } else {
            format!("{a}{op}{b}")
        }
    };

    if (r0.is_none() && r1.is_none()) || (all_rows && c0.is_some() && c1.is_some()) {
        let a = axis_text('C', c0.unwrap_or(0), range.c0_abs);
        let b = axis_text('C', c1.or(c0).unwrap_or(0), range.c1_abs);
        return pair_text(a, b);
    }
    if (c0.is_none() && c1.is_none()) || (all_cols && r0.is_some() && r1.is_some()) {
        let a = axis_text('R', r0.unwrap_or(0), range.r0_abs);
        let b = axis_text('R', r1.or(r0).unwrap_or(0), range.r1_abs);
        return pair_text(a, b);
    }

    let start = format!(
        "{}{}",
        axis_text('R', r0.unwrap_or(0), range.r0_abs),
        axis_text('C', c0.unwrap_or(0), range.c0_abs)
    );
    match (r1, c1) {
        (None, Some(c1)) => format!("{start}{op}{}", axis_text('C', c1, range.c1_abs)),
        (Some(r1), None) => format!("{start}{op}{}", axis_text('R', r1, range.r1_abs)),
        (Some(r1), Some(c1)) => {
            let end = format!(
                "{}{}",
                axis_text('R', r1, range.r1_abs),
                axis_text('C', c1, range.c1_abs)
            );
            pair_text(start, end)
        }
        (None, None) => start,
    }
}

/// Parse a possibly prefixed R1C1 reference such as `Sheet1!R1C1:R2C2` or `'Q 1'!R[-1]`.
pub fn parse_r1c1_ref(text: &str, opts: &RefOptions) -> Option<Reference<R1C1Range>> {
    let tokens = tokenize(
        text,
        &TokenizeOptions {
            allow_ternary: opts.allow_ternary,
            merge_refs: false,
            negative_numbers: false,
            r1c1: true,
            xlsx: opts.xlsx,
            with_location: false,
        },
    );
    let (context, token) = split_reference_tokens(&tokens, opts.xlsx)?;
    let target = match token.kind {
        TokenKind::Range | TokenKind::Beam | TokenKind::Ternary => {
            RefTarget::Range(from_r1c1(&token.value, true)?)
        }
        TokenKind::Name if opts.allow_named => RefTarget::Name(token.value.clone()),
        _ => return None,
    };
    Some(Reference { context, target })
}

/// [`parse_r1c1_ref`] for callers that want an error value.
pub fn parse_r1c1_ref_checked(
    text: &str,
    opts: &RefOptions,
) -> Result<Reference<R1C1Range>, AddressError> {
    parse_r1c1_ref(text, opts).ok_or_else(|| AddressError::Invalid {
        input: text.to_string(),
    })
}

pub fn stringify_r1c1_ref(reference: &Reference<R1C1Range>) -> String {
    let body = match &reference.target {
        RefTarget::Range(range) => to_r1c1(range),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::RefContext;
    use pretty_assertions::assert_eq;

    fn cell(r: i32, r_abs: bool, c: i32, c_abs: bool) -> R1C1Range {
        R1C1Range {
            r0: Some(r),
            c0: Some(c),
            r1: Some(r),
            c1: Some(c),
            r0_abs: r_abs,
            c0_abs: c_abs,
            r1_abs: r_abs,
            c1_abs: c_abs,
            trim: None,
        }
    }

    #[test]
    fn parses_cells() {
        assert_eq!(from_r1c1("R1C1", false), Some(cell(0, true, 0, true)));
        assert_eq!(from_r1c1("RC", false), Some(cell(0, false, 0, false)));
        assert_eq!(from_r1c1("r[-3]c[+2]", false), Some(cell(-3, false, 2, false)));
        assert_eq!(from_r1c1("R[0]C5", false), Some(cell(0, false, 4, true)));
        assert_eq!(from_r1c1("R0C1", false), None);
        assert_eq!(from_r1c1("R[]C", false), None);
        assert_eq!(from_r1c1("R1048577C1", false), None);
        assert_eq!(from_r1c1("R2D2", false), None);
    }

    #[test]
    fn lone_axes_are_beams() {
        assert_eq!(
            from_r1c1("R", false),
            Some(R1C1Range {
                r0: Some(0),
                r1: Some(0),
                ..R1C1Range::default()
            })
        );
        assert_eq!(
            from_r1c1("C3", false),
            Some(R1C1Range {
                c0: Some(2),
                c1: Some(2),
                c0_abs: true,
                c1_abs: true,
                ..R1C1Range::default()
            })
        );
        let rows = from_r1c1("R5:R[1]", false).unwrap();
        assert_eq!((rows.r0, rows.r0_abs), (Some(4), true));
        assert_eq!((rows.r1, rows.r1_abs), (Some(1), false));
    }

    #[test]
    fn same_flag_pairs_are_sorted() {
        let range = from_r1c1("R3C3:R1C1", false).unwrap();
        assert_eq!((range.r0, range.r1), (Some(0), Some(2)));
        assert_eq!(to_r1c1(&range), "R1C1:R3C3");

        let range = from_r1c1("R[2]C:R[-2]C", false).unwrap();
        assert_eq!((range.r0, range.r1), (Some(-2), Some(2)));
    }

    #[test]
    fn ternary_ranges() {
        assert_eq!(from_r1c1("R1C1:R", false), None);
        let range = from_r1c1("R2C1:C3", true).unwrap();
        assert_eq!(range.r1, None);
        assert_eq!(to_r1c1(&range), "R2C1:C3");
        let range = from_r1c1("R2C1:R5", true).unwrap();
        assert_eq!(range.c1, None);
        assert_eq!(to_r1c1(&range), "R2C1:R5");
    }

    #[test]
    fn serializes() {
        assert_eq!(to_r1c1(&cell(0, false, 0, false)), "RC");
        assert_eq!(to_r1c1(&cell(-1, false, 3, true)), "R[-1]C4");
        assert_eq!(
            to_r1c1(&R1C1Range {
                r0: Some(0),
                r1: Some(MAX_ROW_INDEX as i32),
                c0: Some(1),
                c1: Some(2),
                r0_abs: true,
                r1_abs: true,
                c0_abs: true,
                c1_abs: true,
                trim: None,
            }),
            "C2:C3"
        );
        assert_eq!(
            to_r1c1(&R1C1Range {
                r0: Some(-5_000_000),
                c0: Some(0),
                ..R1C1Range::default()
            }),
            "R[-1048575]C"
        );
        let trimmed = from_r1c1("R1C1.:R1C1", false).unwrap();
        assert_eq!(to_r1c1(&trimmed), "R1C1.:R1C1");
    }

    #[test]
    fn prefixed_refs() {
        let parsed = parse_r1c1_ref("'My Sheet'!R1C1:R2C2", &RefOptions::default()).unwrap();
        assert_eq!(parsed.context, RefContext::Chain(vec!["My Sheet".into()]));
        assert_eq!(stringify_r1c1_ref(&parsed), "'My Sheet'!R1C1:R2C2");

        let named = parse_r1c1_ref("Sheet1!Rates", &RefOptions::default()).unwrap();
        assert_eq!(named.name(), Some("Rates"));
        assert!(parse_r1c1_ref_checked("R1C1+1", &RefOptions::default()).is_err());
    }
}
