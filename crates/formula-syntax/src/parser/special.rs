//! `LAMBDA`, `LET` and array literal sub-parsers.

use std::collections::HashSet;

use super::{Current, Parser};
use crate::ast::{span_between, LetDeclarator, Node, ReferenceKind, UnaryOperator};
use crate::token::Span;
use crate::ParseError;

impl<'a> Parser<'a> {
    /// Turn a name-kind reference into an identifier, or halt.
    fn declared_name(
        &self,
        node: Option<Node>,
        seen: &mut HashSet<String>,
        what: &str,
    ) -> Result<Node, ParseError> {
        match node {
            Some(Node::ReferenceIdentifier {
                value,
                span,
                kind: ReferenceKind::Name,
            }) if !value.contains('!') => {
                if !seen.insert(value.to_lowercase()) {
                    return Err(self.halt(format!("Duplicate name: {value}")));
                }
                Ok(Node::Identifier { name: value, span })
            }
            _ => Err(self.halt(format!("{what} must be a name"))),
        }
    }

    /// `LAMBDA(param, ..., body)`. The opening paren is already consumed.
    pub(super) fn lambda(&mut self, callee_span: Option<Span>) -> Result<Node, ParseError> {
        let mut args = self.arguments()?;
        let close = self.current.span();

        let body = match args.pop() {
            None => None,
            Some(None) => return Err(self.halt("LAMBDA is missing a body")),
            Some(Some(body)) => Some(Box::new(body)),
        };
        let mut seen = HashSet::new();
        let params = args
            .into_iter()
            .map(|arg| self.declared_name(arg, &mut seen, "LAMBDA parameter"))
            .collect::<Result<Vec<_>, _>>()?;

        let node = Node::LambdaExpression {
            params,
            body,
            span: span_between(callee_span, close),
        };
        self.advance(Some(")"), false)?;
        Ok(node)
    }

    /// `LET(name, value, ..., body)`. The opening paren is already consumed.
    pub(super) fn let_expression(&mut self, callee_span: Option<Span>) -> Result<Node, ParseError> {
        let mut args = self.arguments()?;
        let close = self.current.span();

        if args.len() < 3 {
            return Err(self.halt("LET needs at least one name, value and a calculation"));
        }
        if args.len() % 2 == 0 {
            return Err(self.halt("Unexpected argument after LET calculation"));
        }
        let body = match args.pop() {
            Some(Some(body)) => Box::new(body),
            _ => return Err(self.halt("LET is missing a calculation")),
        };

        let mut seen = HashSet::new();
        let mut declarations = Vec::with_capacity(args.len() / 2);
        let mut pairs = args.into_iter();
        while let (Some(name), Some(init)) = (pairs.next(), pairs.next()) {
            let id = self.declared_name(name, &mut seen, "LET declaration")?;
            let span = span_between(id.span(), init.as_ref().and_then(Node::span).or(id.span()));
            declarations.push(LetDeclarator { id, init, span });
        }

        let node = Node::LetExpression {
            declarations,
            body: Some(body),
            span: span_between(callee_span, close),
        };
        self.advance(Some(")"), true)?;
        Ok(node)
    }

    fn array_element_allowed(&self, node: &Node) -> bool {
        match node {
            Node::Literal { .. } | Node::ErrorLiteral { .. } => true,
            Node::UnaryExpression {
                operator: UnaryOperator::Minus | UnaryOperator::Plus,
                argument,
                ..
            } => matches!(argument.as_ref(), Node::Literal { .. }),
            Node::ReferenceIdentifier { .. } => self.opts.permit_array_ranges,
            Node::BinaryExpression { operator, .. } if operator.is_reference_operator() => {
                self.opts.permit_array_ranges
            }
            Node::CallExpression { .. } => self.opts.permit_array_calls,
            _ => false,
        }
    }

    /// `{1,2;3,4}`. The opening brace is already consumed.
    pub(super) fn array(&mut self, open: Current<'a>) -> Result<Node, ParseError> {
        let saved = self.set_union_refs(false);
        let mut rows: Vec<Vec<Node>> = vec![Vec::new()];
        loop {
            if matches!(self.current.id(), "," | ";" | "}") {
                return Err(self.unexpected());
            }
            let element_index = self.current.index;
            let element = self.expression(0)?;
            if !self.array_element_allowed(&element) {
                return Err(self.halt_at(element_index, "Unexpected element in array"));
            }
            if let Some(row) = rows.last_mut() {
                row.push(element);
            }
            match self.current.id() {
                "," => self.advance(Some(","), false)?,
                ";" => {
                    self.advance(Some(";"), false)?;
                    rows.push(Vec::new());
                }
                "}" => break,
                _ => return Err(self.unexpected()),
            }
        }
        self.union_refs = saved;

        let node = Node::ArrayExpression {
            elements: rows,
            span: span_between(open.span(), self.current.span()),
        };
        self.advance(Some("}"), false)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{LiteralValue, Node};
    use crate::parser::{parse, ParseOptions};

    fn parse_default(formula: &str) -> Result<Node, crate::ParseError> {
        parse(formula, &ParseOptions::default())
    }

    #[test]
    fn lambda_parameters_and_body() {
        let ast = parse_default("=LAMBDA(x, y, x+y)").unwrap();
        let Node::LambdaExpression { params, body, .. } = ast else {
            panic!("expected lambda");
        };
        let names: Vec<_> = params
            .iter()
            .map(|p| match p {
                Node::Identifier { name, .. } => name.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(names, ["x", "y"]);
        assert!(body.is_some());

        let ast = parse_default("=LAMBDA()").unwrap();
        assert!(matches!(ast, Node::LambdaExpression { body: None, .. }));
        assert!(parse_default("=LAMBDA(x,x)(1)").is_ok());
        assert!(parse_default("=LAMBDA(r,c,r*c)").is_ok());
    }

    #[test]
    fn lambda_rejects_bad_parameters() {
        assert!(parse_default("=LAMBDA(a,a,1)").is_err());
        assert!(parse_default("=LAMBDA(a,A,1)").is_err());
        assert!(parse_default("=LAMBDA(A1,1)").is_err());
        assert!(parse_default("=LAMBDA(1,1)").is_err());
        assert!(parse_default("=LAMBDA(a,)").is_err());
    }

    #[test]
    fn let_declarations() {
        let ast = parse_default("=LET(a,1,b,a+1,a*b)").unwrap();
        let Node::LetExpression { declarations, body, .. } = ast else {
            panic!("expected let");
        };
        assert_eq!(declarations.len(), 2);
        assert!(matches!(&declarations[0].id, Node::Identifier { name, .. } if name == "a"));
        assert!(body.is_some());

        assert!(parse_default("LET(a,1,A,1,1)").is_err());
        assert!(parse_default("=LET(a,1)").is_err());
        assert!(parse_default("=LET(a,1,a,2)").is_err());
        assert!(parse_default("=LET(1,1,1)").is_err());
        assert!(parse_default("=LET(x,A1:B2,x):C5").is_ok());
    }

    #[test]
    fn array_literals() {
        let ast = parse_default("={1,2;3,-4}").unwrap();
        let Node::ArrayExpression { elements, .. } = ast else {
            panic!("expected array");
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].len(), 2);
        assert!(matches!(
            elements[1][1],
            Node::Literal {
                value: LiteralValue::Number(n),
                ..
            } if n == -4.0
        ));

        assert!(parse_default("={}").is_err());
        assert!(parse_default("={1,,2}").is_err());
        assert!(parse_default("={1;}").is_err());
        assert!(parse_default("={1,2").is_err());
        assert!(parse_default("={A1}").is_err());
        assert!(parse_default("={SUM(1)}").is_err());
        assert!(parse_default("={{1}}").is_err());
        assert!(parse_default("={1+1}").is_err());
    }

    #[test]
    fn array_capabilities() {
        let ranges = ParseOptions {
            permit_array_ranges: true,
            ..ParseOptions::default()
        };
        assert!(parse("={A1,B2:C3}", &ranges).is_ok());
        assert!(parse("={SUM(1)}", &ranges).is_err());

        let calls = ParseOptions {
            permit_array_calls: true,
            ..ParseOptions::default()
        };
        assert!(parse("={SUM(1,2),3}", &calls).is_ok());
    }
}
