//! Normalizing the reference text in a formula.
//!
//! Every range and table reference is parsed and written back out, so `b2:a1` becomes `A1:B2`
//! and `'Sheet1'!A1` becomes `Sheet1!A1`. Everything else passes through untouched.

use serde::{Deserialize, Serialize};

use crate::address::a1::{parse_a1_ref, stringify_a1_ref};
use crate::address::r1c1::{parse_r1c1_ref, stringify_r1c1_ref};
use crate::address::structured::{parse_struct_ref, stringify_struct_ref};
use crate::address::{A1Range, R1C1Range, RefOptions, RefTarget};
use crate::lexer::{tokenize, TokenizeOptions};
use crate::token::{stringify_tokens, Token, TokenKind};
use crate::{MAX_COL_INDEX, MAX_ROW_INDEX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixOptions {
    /// Close partial ranges at the sheet edge: `A3:A` becomes `A3:A1048576`.
    pub add_bounds: bool,
    pub r1c1: bool,
    pub xlsx: bool,
}

fn bound_a1(range: &mut A1Range) {
    if !range.is_ternary() {
        return;
    }
    range.top.get_or_insert(0);
    range.left.get_or_insert(0);
    range.bottom.get_or_insert(MAX_ROW_INDEX);
    range.right.get_or_insert(MAX_COL_INDEX);
}

fn bound_r1c1(range: &mut R1C1Range) {
    let rows = [range.r0, range.r1].iter().filter(|v| v.is_some()).count();
    let cols = [range.c0, range.c1].iter().filter(|v| v.is_some()).count();
    // Only partial ranges: one axis complete, the other half open.
    if rows + cols != 3 {
        return;
    }
    if range.r1.is_none() {
        range.r1 = Some(MAX_ROW_INDEX as i32);
        range.r1_abs = true;
    }
    if range.c1.is_none() {
        range.c1 = Some(MAX_COL_INDEX as i32);
        range.c1_abs = true;
    }
}

fn fix_token(token: &Token, opts: &FixOptions) -> Option<String> {
    let ref_opts = RefOptions {
        allow_named: false,
        allow_ternary: true,
        xlsx: opts.xlsx,
    };
    if token.kind == TokenKind::Structured {
        return parse_struct_ref(&token.value, &ref_opts).map(|r| stringify_struct_ref(&r));
    }
    if !token.is_range() {
        return None;
    }
    if opts.r1c1 {
        let mut reference = parse_r1c1_ref(&token.value, &ref_opts)?;
        if let (RefTarget::Range(range), true) = (&mut reference.target, opts.add_bounds) {
            bound_r1c1(range);
        }
        Some(stringify_r1c1_ref(&reference))
    } else {
        let mut reference = parse_a1_ref(&token.value, &ref_opts)?;
        if let (RefTarget::Range(range), true) = (&mut reference.target, opts.add_bounds) {
            bound_a1(range);
        }
        Some(stringify_a1_ref(&reference))
    }
}

/// Normalize every reference token in a token list. Spans are moved to match the new text.
pub fn fix_range_tokens(tokens: &[Token], opts: &FixOptions) -> Vec<Token> {
    let mut skew = 0isize;
    tokens
        .iter()
        .map(|token| {
            let mut token = token.clone();
            let fixed = fix_token(&token, opts).filter(|text| *text != token.value);
            if let Some(text) = &fixed {
                log::trace!("normalized reference '{}' to '{text}'", token.value);
            }
            token.rewrite_value(fixed, &mut skew);
            token
        })
        .collect()
}

/// Normalize every reference in formula text.
///
/// ```
/// use formula_syntax::fix::{fix_ranges, FixOptions};
///
/// assert_eq!(fix_ranges("=SUM(b2:a1)", &FixOptions::default()), "=SUM(A1:B2)");
/// ```
pub fn fix_ranges(formula: &str, opts: &FixOptions) -> String {
    let tokens = tokenize(
        formula,
        &TokenizeOptions {
            allow_ternary: true,
            negative_numbers: false,
            r1c1: opts.r1c1,
            xlsx: opts.xlsx,
            ..TokenizeOptions::default()
        },
    );
    stringify_tokens(&fix_range_tokens(&tokens, opts))
}
