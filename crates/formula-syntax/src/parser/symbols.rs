//! Static symbol table: token id to binding power and prefix/infix behaviour.

use std::collections::HashMap;
use std::sync::OnceLock;

pub(crate) const END: &str = "(end)";
pub(crate) const LITERAL: &str = "(literal)";
pub(crate) const REFERENCE: &str = "(reference)";
pub(crate) const FUNCTION: &str = "(function)";
pub(crate) const WHITESPACE: &str = "(whitespace)";

/// Binding power of the reference operators (`:`, trims, `,` and intersection).
pub(crate) const REF_BP: u8 = 80;
/// Right binding power of prefix operators.
pub(crate) const PREFIX_BP: u8 = 70;

/// Behaviour when the symbol starts an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Nud {
    Invalid,
    Literal,
    Reference,
    Function,
    Prefix,
    Group,
    Array,
}

/// Behaviour when the symbol follows a complete left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Led {
    None,
    Infix,
    RangeJoin,
    Postfix,
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Symbol {
    pub id: &'static str,
    pub lbp: u8,
    pub nud: Nud,
    pub led: Led,
}

const fn symbol(id: &'static str, lbp: u8, nud: Nud, led: Led) -> Symbol {
    Symbol { id, lbp, nud, led }
}

const SYMBOLS: &[Symbol] = &[
    symbol(END, 0, Nud::Invalid, Led::None),
    symbol(LITERAL, 0, Nud::Literal, Led::None),
    symbol(REFERENCE, 0, Nud::Reference, Led::None),
    symbol(FUNCTION, 0, Nud::Function, Led::None),
    symbol(WHITESPACE, REF_BP, Nud::Invalid, Led::RangeJoin),
    symbol(":", REF_BP, Nud::Invalid, Led::RangeJoin),
    symbol(".:", REF_BP, Nud::Invalid, Led::RangeJoin),
    symbol(":.", REF_BP, Nud::Invalid, Led::RangeJoin),
    symbol(".:.", REF_BP, Nud::Invalid, Led::RangeJoin),
    symbol(",", REF_BP, Nud::Invalid, Led::RangeJoin),
    symbol("(", 90, Nud::Group, Led::Call),
    symbol(")", 0, Nud::Invalid, Led::None),
    symbol("{", 0, Nud::Array, Led::None),
    symbol("}", 0, Nud::Invalid, Led::None),
    symbol(";", 0, Nud::Invalid, Led::None),
    symbol("!", 0, Nud::Invalid, Led::None),
    symbol("%", 70, Nud::Invalid, Led::Postfix),
    symbol("#", 70, Nud::Invalid, Led::Postfix),
    symbol("@", 0, Nud::Prefix, Led::None),
    symbol("^", 50, Nud::Invalid, Led::Infix),
    symbol("*", 40, Nud::Invalid, Led::Infix),
    symbol("/", 40, Nud::Invalid, Led::Infix),
    symbol("+", 30, Nud::Prefix, Led::Infix),
    symbol("-", 30, Nud::Prefix, Led::Infix),
    symbol("&", 20, Nud::Invalid, Led::Infix),
    symbol("=", 10, Nud::Invalid, Led::Infix),
    symbol("<>", 10, Nud::Invalid, Led::Infix),
    symbol("<", 10, Nud::Invalid, Led::Infix),
    symbol("<=", 10, Nud::Invalid, Led::Infix),
    symbol(">", 10, Nud::Invalid, Led::Infix),
    symbol(">=", 10, Nud::Invalid, Led::Infix),
];

fn table() -> &'static HashMap<&'static str, Symbol> {
    static TABLE: OnceLock<HashMap<&'static str, Symbol>> = OnceLock::new();
    TABLE.get_or_init(|| SYMBOLS.iter().map(|s| (s.id, *s)).collect())
}

pub(crate) fn lookup(id: &str) -> Option<&'static Symbol> {
    table().get(id)
}

/// Symbol for an id known to be in the table.
pub(crate) fn builtin(id: &'static str) -> &'static Symbol {
    // Every caller passes one of the ids declared above.
    match table().get(id) {
        Some(symbol) => symbol,
        None => &SYMBOLS[0],
    }
}
