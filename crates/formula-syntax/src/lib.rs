//! Syntax layer for spreadsheet formulas.
//!
//! - [`tokenize`] splits formula text into [`Token`]s (A1 or R1C1 notation) and never fails.
//! - [`parse`] builds a [`Node`] tree with a Pratt parser, reporting a [`ParseError`] with the
//!   character offset where it gave up.
//! - [`address`] converts between reference text and range records.
//! - [`translate`] rewrites R1C1 references as A1 and back, relative to an anchor cell.
//!
//! ```
//! use formula_syntax::{parse, tokenize, Node, ParseOptions, TokenKind, TokenizeOptions};
//!
//! let tokens = tokenize("=SUM(A1:B2)*2", &TokenizeOptions::default());
//! assert_eq!(tokens[1].kind, TokenKind::Func);
//! assert_eq!(tokens[2].kind, TokenKind::Range);
//!
//! let ast = parse("=SUM(A1:B2)*2", &ParseOptions::default()).unwrap();
//! assert!(matches!(ast, Node::BinaryExpression { .. }));
//! ```
//!
//! ```
//! use formula_syntax::address::a1::{from_a1, to_a1};
//!
//! let range = from_a1("B2:A1", false).unwrap();
//! assert_eq!(to_a1(&range), "A1:B2");
//! ```

#![forbid(unsafe_code)]

pub mod address;
pub mod ast;
mod error;
pub mod fix;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod translate;

/// Largest 0-indexed row on a sheet (row 1,048,576).
pub const MAX_ROW_INDEX: u32 = 1_048_575;
/// Largest 0-indexed column on a sheet (column `XFD`).
pub const MAX_COL_INDEX: u32 = 16_383;

pub use address::a1::{from_a1, parse_a1_ref, stringify_a1_ref, to_a1};
pub use address::r1c1::{from_r1c1, parse_r1c1_ref, stringify_r1c1_ref, to_r1c1};
pub use address::{A1Range, R1C1Range, RefContext, RefOptions, RefTarget, Reference, Trim};
pub use ast::Node;
pub use error::{AddressError, ParseError};
pub use fix::{fix_range_tokens, fix_ranges, FixOptions};
pub use lexer::{tokenize, tokenize_xlsx, TokenizeOptions};
pub use parser::{parse, parse_tokens, ParseOptions};
pub use token::{stringify_tokens, Span, Token, TokenKind};
pub use translate::{
    translate_formula_to_a1, translate_formula_to_r1c1, translate_tokens_to_a1,
    translate_tokens_to_r1c1, TranslateOptions,
};
