//! Operator-precedence formula parser.
//!
//! The parser walks a token list with a Pratt loop driven by the table in [`symbols`]. Excel's
//! grammar is ambiguous in two places the loop resolves with local state:
//!
//! - `,` is the union operator inside parentheses and at the top level, but an argument separator
//!   inside calls, `LAMBDA`/`LET` and array literals. `union_refs` holds the current meaning and is
//!   saved and restored around each nested scope.
//! - A space between two reference-shaped operands is the intersection operator. Everywhere else
//!   whitespace is skipped.

mod special;
mod symbols;

use serde::{Deserialize, Serialize};

use crate::ast::{
    span_between, BinaryOperator, LiteralValue, Node, ReferenceKind, UnaryOperator,
};
use crate::lexer::{merge_ref_tokens, tokenize, TokenizeOptions};
use crate::token::{stringify_tokens, Span, Token, TokenKind};
use crate::ParseError;

use symbols::{Led, Nud, Symbol, END, FUNCTION, LITERAL, PREFIX_BP, REFERENCE, WHITESPACE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Options used when [`parse`] tokenizes the text itself.
    pub tokenize: TokenizeOptions,
    /// Allow references inside array literals (`{A1,B2}`).
    pub permit_array_ranges: bool,
    /// Allow function calls inside array literals (`{SUM(1,2)}`).
    pub permit_array_calls: bool,
    /// Treat every function call as possibly returning a reference.
    pub loose_ref_calls: bool,
}

/// Tokenize and parse formula text.
///
/// ```
/// use formula_syntax::{parse, Node, ParseOptions};
///
/// let ast = parse("=SUM(A1:B2)*2", &ParseOptions::default()).unwrap();
/// assert!(matches!(ast, Node::BinaryExpression { .. }));
/// assert!(parse("=SUM(", &ParseOptions::default()).is_err());
/// ```
pub fn parse(formula: &str, opts: &ParseOptions) -> Result<Node, ParseError> {
    let tokenize_opts = TokenizeOptions {
        merge_refs: true,
        ..opts.tokenize
    };
    let tokens = tokenize(formula, &tokenize_opts);
    parse_tokens(&tokens, opts)
}

/// Parse an already tokenized formula. Unmerged `context ! reference` runs are merged first.
pub fn parse_tokens(tokens: &[Token], opts: &ParseOptions) -> Result<Node, ParseError> {
    log::trace!("parse: {} tokens", tokens.len());
    let merged;
    let tokens = if tokens
        .iter()
        .any(|t| matches!(t.kind, TokenKind::Context | TokenKind::ContextQuote))
    {
        merged = merge_ref_tokens(tokens.to_vec());
        merged.as_slice()
    } else {
        tokens
    };
    let mut parser = Parser::new(tokens, opts);
    parser.advance(None, false)?;
    let root = parser.expression(0)?;
    if parser.current.symbol.id != END {
        return Err(parser.unexpected());
    }
    Ok(root)
}

/// The token the parser is looking at, with its symbol.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Current<'a> {
    symbol: &'static Symbol,
    token: Option<&'a Token>,
    index: usize,
}

impl Current<'_> {
    fn id(&self) -> &'static str {
        self.symbol.id
    }

    fn span(&self) -> Option<Span> {
        self.token.and_then(|t| t.span)
    }

    fn describe(&self) -> String {
        match self.token {
            Some(token) if token.kind == TokenKind::Whitespace => "whitespace".to_string(),
            Some(token) => token.value.clone(),
            None => "end of input".to_string(),
        }
    }
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    next: usize,
    current: Current<'a>,
    union_refs: bool,
    opts: &'a ParseOptions,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], opts: &'a ParseOptions) -> Self {
        let next = usize::from(tokens.first().is_some_and(Token::is_fx_prefix));
        Self {
            tokens,
            next,
            current: Current {
                symbol: symbols::builtin(END),
                token: None,
                index: next,
            },
            union_refs: true,
            opts,
        }
    }

    fn halt_at(&self, index: usize, message: impl Into<String>) -> ParseError {
        let message = message.into();
        let end = index.min(self.tokens.len());
        let offset = self.tokens[..end]
            .iter()
            .map(|t| t.value.chars().count())
            .sum();
        log::debug!("parse halted: {message} (at offset {offset})");
        ParseError::new(message, stringify_tokens(self.tokens), offset)
            .with_span(self.tokens.get(index).and_then(|t| t.span))
    }

    fn halt(&self, message: impl Into<String>) -> ParseError {
        self.halt_at(self.current.index, message)
    }

    fn unexpected(&self) -> ParseError {
        self.halt(format!("Unexpected {}", self.current.describe()))
    }

    /// Set the meaning of `,` and return the previous one.
    fn set_union_refs(&mut self, union_refs: bool) -> bool {
        std::mem::replace(&mut self.union_refs, union_refs)
    }

    fn lbp(&self) -> u8 {
        if self.current.id() == "," && !self.union_refs {
            0
        } else {
            self.current.symbol.lbp
        }
    }

    fn is_reference_shaped(&self, node: &Node) -> bool {
        node.reference_shaped(self.opts.loose_ref_calls)
    }

    /// Whether a reference-like token follows, looking past whitespace and opening parens.
    fn reference_is_upcoming(&self) -> bool {
        self.tokens[self.next..]
            .iter()
            .find(|t| !t.is_whitespace() && !t.is_operator("("))
            .is_some_and(|t| {
                t.is_reference() || t.is_function() || t.value.eq_ignore_ascii_case("#REF!")
            })
    }

    fn call_is_upcoming(&self) -> bool {
        self.tokens[self.next..]
            .iter()
            .find(|t| !t.is_whitespace())
            .is_some_and(|t| t.is_operator("("))
    }

    /// Move to the next token.
    ///
    /// `expect` checks the current symbol before moving. `left_is_ref` says whether the operand
    /// just completed is reference-shaped, which is the only case where a following space can be
    /// the intersection operator.
    fn advance(&mut self, expect: Option<&str>, left_is_ref: bool) -> Result<(), ParseError> {
        if let Some(expected) = expect {
            if self.current.id() != expected {
                return Err(self.halt(format!(
                    "Expected {expected} but got {}",
                    self.current.describe()
                )));
            }
        }

        if self.tokens.get(self.next).is_some_and(Token::is_whitespace) {
            let significant = left_is_ref
                && self.tokens[self.next].kind == TokenKind::Whitespace
                && (self.reference_is_upcoming() || self.call_is_upcoming());
            if !significant {
                while self.tokens.get(self.next).is_some_and(Token::is_whitespace) {
                    self.next += 1;
                }
            }
        }

        let index = self.next;
        let Some(token) = self.tokens.get(index) else {
            self.current = Current {
                symbol: symbols::builtin(END),
                token: None,
                index,
            };
            return Ok(());
        };
        self.next += 1;

        if token.unterminated {
            return Err(self.halt_at(index, "Encountered an unterminated token"));
        }
        let symbol = match token.kind {
            TokenKind::Operator => symbols::lookup(&token.value)
                .ok_or_else(|| self.halt_at(index, format!("Unknown operator {}", token.value)))?,
            TokenKind::Whitespace | TokenKind::Newline => symbols::builtin(WHITESPACE),
            kind if kind.is_literal() => symbols::builtin(LITERAL),
            kind if kind.is_reference() => symbols::builtin(REFERENCE),
            TokenKind::Func => symbols::builtin(FUNCTION),
            kind => {
                return Err(self.halt_at(
                    index,
                    format!("Unexpected {kind} token: {}", token.value),
                ))
            }
        };
        self.current = Current {
            symbol,
            token: Some(token),
            index,
        };
        Ok(())
    }

    pub(crate) fn expression(&mut self, rbp: u8) -> Result<Node, ParseError> {
        let t = self.current;
        let starts_ref = t.token.is_some_and(|tok| {
            tok.is_reference() || (tok.is_error() && tok.value.eq_ignore_ascii_case("#REF!"))
        });
        if t.symbol.nud != Nud::Invalid {
            self.advance(None, starts_ref)?;
        }
        let mut left = self.nud(t)?;

        while rbp < self.lbp() {
            let t = self.current;
            self.advance(None, false)?;
            left = self.led(t, left)?;
        }
        Ok(left)
    }

    fn nud(&mut self, t: Current<'a>) -> Result<Node, ParseError> {
        let span = t.span();
        match (t.symbol.nud, t.token) {
            (Nud::Literal, Some(token)) => self.literal(token, t.index),
            (Nud::Reference, Some(token)) => Ok(Node::ReferenceIdentifier {
                value: token.value.clone(),
                kind: match token.kind {
                    TokenKind::Beam => ReferenceKind::Beam,
                    TokenKind::Name => ReferenceKind::Name,
                    TokenKind::Structured => ReferenceKind::Table,
                    _ => ReferenceKind::Range,
                },
                span,
            }),
            (Nud::Function, Some(token)) => Ok(Node::Identifier {
                name: token.value.clone(),
                span,
            }),
            (Nud::Prefix, Some(token)) => {
                let operator = UnaryOperator::from_prefix(&token.value)
                    .ok_or_else(|| self.halt_at(t.index, format!("Unexpected {}", token.value)))?;
                let argument = self.expression(PREFIX_BP)?;
                Ok(Node::UnaryExpression {
                    span: span_between(span, argument.span()),
                    operator,
                    argument: Box::new(argument),
                })
            }
            (Nud::Group, _) => {
                let saved = self.set_union_refs(true);
                let mut inner = self.expression(0)?;
                self.union_refs = saved;
                let close = self.current.span();
                let is_ref = self.is_reference_shaped(&inner);
                self.advance(Some(")"), is_ref)?;
                inner.set_span(span_between(span, close));
                Ok(inner)
            }
            (Nud::Array, _) => self.array(t),
            _ => Err(self.halt_at(t.index, format!("Unexpected {}", t.describe()))),
        }
    }

    fn literal(&self, token: &Token, index: usize) -> Result<Node, ParseError> {
        let raw = token.value.clone();
        let span = token.span;
        let value = match token.kind {
            TokenKind::Number => LiteralValue::Number(
                token
                    .value
                    .parse::<f64>()
                    .map_err(|_| self.halt_at(index, format!("Invalid number {}", token.value)))?,
            ),
            TokenKind::String => {
                let inner = token
                    .value
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(&token.value);
                LiteralValue::String(inner.replace("\"\"", "\""))
            }
            TokenKind::Bool => LiteralValue::Boolean(token.value.eq_ignore_ascii_case("TRUE")),
            _ => {
                return Ok(Node::ErrorLiteral {
                    value: token.value.to_ascii_uppercase(),
                    raw,
                    span,
                })
            }
        };
        Ok(Node::Literal { value, raw, span })
    }

    fn led(&mut self, t: Current<'a>, left: Node) -> Result<Node, ParseError> {
        match t.symbol.led {
            Led::Infix => {
                let operator = BinaryOperator::from_symbol(t.id())
                    .ok_or_else(|| self.halt_at(t.index, format!("Unexpected {}", t.describe())))?;
                let right = self.expression(t.symbol.lbp)?;
                Ok(binary(operator, left, right))
            }
            Led::RangeJoin => {
                let operator = if t.id() == WHITESPACE {
                    BinaryOperator::Intersect
                } else {
                    BinaryOperator::from_symbol(t.id()).ok_or_else(|| {
                        self.halt_at(t.index, format!("Unexpected {}", t.describe()))
                    })?
                };
                if !self.is_reference_shaped(&left) {
                    return Err(self.halt_at(
                        t.index,
                        format!("Unexpected {} operator", operator_name(operator)),
                    ));
                }
                let right = self.expression(t.symbol.lbp)?;
                if !self.is_reference_shaped(&right) {
                    return Err(self.halt_at(
                        t.index,
                        format!("Unexpected {} operator", operator_name(operator)),
                    ));
                }
                Ok(binary(operator, left, right))
            }
            Led::Postfix => {
                let operator = UnaryOperator::from_postfix(t.id())
                    .ok_or_else(|| self.halt_at(t.index, format!("Unexpected {}", t.describe())))?;
                if operator == UnaryOperator::Spill && !self.is_reference_shaped(&left) {
                    return Err(self.halt_at(t.index, "Unexpected # operator"));
                }
                Ok(Node::UnaryExpression {
                    span: span_between(left.span(), t.span()),
                    operator,
                    argument: Box::new(left),
                })
            }
            Led::Call => self.call(t, left),
            Led::None => Err(self.halt_at(t.index, format!("Unexpected {}", t.describe()))),
        }
    }

    /// Parse a comma separated argument list up to (not past) the closing `)`.
    /// Empty arguments are `None`.
    pub(crate) fn arguments(&mut self) -> Result<Vec<Option<Node>>, ParseError> {
        let saved = self.set_union_refs(false);
        let mut args = Vec::new();
        if self.current.id() != ")" {
            loop {
                let arg = match self.current.id() {
                    "," | ")" => None,
                    _ => Some(self.expression(0)?),
                };
                args.push(arg);
                match self.current.id() {
                    "," => self.advance(Some(","), false)?,
                    ")" => break,
                    _ => {
                        return Err(self.halt(format!(
                            "Expected , or ) but got {}",
                            self.current.describe()
                        )))
                    }
                }
            }
        }
        self.union_refs = saved;
        Ok(args)
    }

    fn call(&mut self, open: Current<'a>, callee: Node) -> Result<Node, ParseError> {
        let callable = match &callee {
            Node::Identifier { .. }
            | Node::ReferenceIdentifier { .. }
            | Node::CallExpression { .. }
            | Node::LetExpression { .. }
            | Node::LambdaExpression { .. } => true,
            Node::UnaryExpression { operator, .. } => *operator == UnaryOperator::Spill,
            Node::ErrorLiteral { value, .. } => value == "#REF!",
            _ => false,
        };
        if !callable {
            return Err(self.halt_at(open.index, "Unexpected call"));
        }

        if let Node::Identifier { name, .. } = &callee {
            let bare = name
                .get(..6)
                .filter(|p| p.eq_ignore_ascii_case("_xlfn."))
                .map_or(name.as_str(), |_| &name[6..]);
            if bare.eq_ignore_ascii_case("LAMBDA") {
                return self.lambda(callee.span());
            }
            if bare.eq_ignore_ascii_case("LET") {
                return self.let_expression(callee.span());
            }
        }

        let arguments = self.arguments()?;
        let close = self.current.span();
        let node = Node::CallExpression {
            span: span_between(callee.span(), close),
            callee: Box::new(callee),
            arguments,
        };
        let is_ref = self.is_reference_shaped(&node);
        self.advance(Some(")"), is_ref)?;
        Ok(node)
    }
}

fn binary(operator: BinaryOperator, left: Node, right: Node) -> Node {
    Node::BinaryExpression {
        span: span_between(left.span(), right.span()),
        operator,
        arguments: Box::new([left, right]),
    }
}

fn operator_name(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Intersect => "intersection",
        other => other.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_default(formula: &str) -> Result<Node, ParseError> {
        parse(formula, &ParseOptions::default())
    }

    fn reference(value: &str, kind: ReferenceKind) -> Node {
        Node::ReferenceIdentifier {
            value: value.to_string(),
            kind,
            span: None,
        }
    }

    fn number(raw: &str) -> Node {
        Node::Literal {
            value: LiteralValue::Number(raw.parse().unwrap()),
            raw: raw.to_string(),
            span: None,
        }
    }

    #[test]
    fn precedence() {
        let ast = parse_default("=1+2*3").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Add,
                number("1"),
                binary(BinaryOperator::Mul, number("2"), number("3"))
            )
        );
        let ast = parse_default("=-A1^2").unwrap();
        let Node::BinaryExpression { operator, arguments, .. } = ast else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Pow);
        assert!(matches!(
            arguments[0],
            Node::UnaryExpression {
                operator: UnaryOperator::Minus,
                ..
            }
        ));
    }

    #[test]
    fn union_inside_parens_separator_inside_calls() {
        let ast = parse_default("=(A1,B2)").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Union,
                reference("A1", ReferenceKind::Range),
                reference("B2", ReferenceKind::Range)
            )
        );

        let ast = parse_default("=FOO(A1,B2)").unwrap();
        let Node::CallExpression { arguments, .. } = ast else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);

        let ast = parse_default("=SUM((A1,B2),C3)").unwrap();
        let Node::CallExpression { arguments, .. } = ast else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(
            arguments[0],
            Some(Node::BinaryExpression {
                operator: BinaryOperator::Union,
                ..
            })
        ));
    }

    #[test]
    fn whitespace_between_references_intersects() {
        assert_eq!(
            parse_default("=(A1 B2)").unwrap(),
            binary(
                BinaryOperator::Intersect,
                reference("A1", ReferenceKind::Range),
                reference("B2", ReferenceKind::Range)
            )
        );
        assert_eq!(
            parse_default("= A1 + 1 ").unwrap(),
            binary(
                BinaryOperator::Add,
                reference("A1", ReferenceKind::Range),
                number("1")
            )
        );
        assert!(parse_default("=A1 1").is_err());
    }

    #[test]
    fn range_joins_need_reference_operands() {
        for formula in ["=A1:0", "=0:A1", "=1,A1", "=A1 (1)", "=\"a\":A1"] {
            assert!(parse_default(formula).is_err(), "{formula} should fail");
        }
        assert!(parse_default("=INDEX(A:A,1):B5").is_ok());
        assert!(parse_default("=SUM(A:A,1):B5").is_err());
        let loose = ParseOptions {
            loose_ref_calls: true,
            ..ParseOptions::default()
        };
        assert!(parse("=SUM(A:A,1):B5", &loose).is_ok());
    }

    #[test]
    fn empty_arguments_are_none() {
        let ast = parse_default("=IF(A1,,1)").unwrap();
        let Node::CallExpression { arguments, .. } = ast else {
            panic!("expected call");
        };
        assert_eq!(
            arguments,
            vec![Some(reference("A1", ReferenceKind::Range)), None, Some(number("1"))]
        );
    }

    #[test]
    fn calls_on_call_results() {
        assert!(parse_default("=A1:B2(1)").is_ok());
        assert!(parse_default("=INDEX(A:B,1)(2)").is_ok());
        assert!(parse_default("=#REF!(1)").is_ok());
        let err = parse_default("=1(2)").unwrap_err();
        assert_eq!(err.message, "Unexpected call");
        assert!(parse_default("=\"x\"(1)").is_err());
    }

    #[test]
    fn errors_carry_source_and_offset() {
        let err = parse_default("=SUM(1,2").unwrap_err();
        assert_eq!(err.formula, "=SUM(1,2");
        assert_eq!(err.offset, 8);
        let err = parse_default("=1+~").unwrap_err();
        assert_eq!(err.offset, 3);
        assert!(err.to_string().ends_with("(at offset 3)"));
        assert!(parse_default("=\"abc").is_err());
        assert!(parse_default("").is_err());
    }

    #[test]
    fn spans_cover_children() {
        let opts = ParseOptions {
            tokenize: TokenizeOptions {
                with_location: true,
                ..TokenizeOptions::default()
            },
            ..ParseOptions::default()
        };
        let ast = parse("=SUM(A1, 2) + 1", &opts).unwrap();
        assert_eq!(ast.span(), Some(Span::new(1, 15)));
        let Node::BinaryExpression { arguments, .. } = ast else {
            panic!("expected binary expression");
        };
        assert_eq!(arguments[0].span(), Some(Span::new(1, 11)));
    }
}
