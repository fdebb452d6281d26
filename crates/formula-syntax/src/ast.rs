use serde::{Deserialize, Serialize};

use crate::token::Span;

/// Function names whose result may be a reference, so a call to them is allowed as an operand of
/// `:`, `,` and intersection.
pub const REFERENCE_FUNCTIONS: [&str; 16] = [
    "ANCHORARRAY",
    "CHOOSE",
    "DROP",
    "IF",
    "IFS",
    "INDEX",
    "INDIRECT",
    "LAMBDA",
    "LET",
    "OFFSET",
    "REDUCE",
    "SINGLE",
    "SWITCH",
    "TAKE",
    "TRIMRANGE",
    "XLOOKUP",
];

/// Returns `true` if `name` (optionally `_xlfn.`-prefixed, any case) may return a reference.
pub fn is_reference_function(name: &str) -> bool {
    let name = name
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("_xlfn."))
        .map_or(name, |_| &name[6..]);
    REFERENCE_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Number(f64),
    Boolean(bool),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Range,
    Beam,
    Name,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "@")]
    ImplicitIntersection,
    #[serde(rename = "#")]
    Spill,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Percent => "%",
            UnaryOperator::ImplicitIntersection => "@",
            UnaryOperator::Spill => "#",
        }
    }

    pub fn from_prefix(op: &str) -> Option<Self> {
        match op {
            "+" => Some(UnaryOperator::Plus),
            "-" => Some(UnaryOperator::Minus),
            "@" => Some(UnaryOperator::ImplicitIntersection),
            _ => None,
        }
    }

    pub fn from_postfix(op: &str) -> Option<Self> {
        match op {
            "%" => Some(UnaryOperator::Percent),
            "#" => Some(UnaryOperator::Spill),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = ":")]
    Range,
    #[serde(rename = ".:")]
    RangeTrimHead,
    #[serde(rename = ":.")]
    RangeTrimTail,
    #[serde(rename = ".:.")]
    RangeTrimBoth,
    #[serde(rename = ",")]
    Union,
    #[serde(rename = " ")]
    Intersect,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "^")]
    Pow,
    #[serde(rename = "&")]
    Concat,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Range => ":",
            BinaryOperator::RangeTrimHead => ".:",
            BinaryOperator::RangeTrimTail => ":.",
            BinaryOperator::RangeTrimBoth => ".:.",
            BinaryOperator::Union => ",",
            BinaryOperator::Intersect => " ",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Pow => "^",
            BinaryOperator::Concat => "&",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }

    pub fn from_symbol(op: &str) -> Option<Self> {
        Some(match op {
            ":" => BinaryOperator::Range,
            ".:" => BinaryOperator::RangeTrimHead,
            ":." => BinaryOperator::RangeTrimTail,
            ".:." => BinaryOperator::RangeTrimBoth,
            "," => BinaryOperator::Union,
            " " => BinaryOperator::Intersect,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Sub,
            "*" => BinaryOperator::Mul,
            "/" => BinaryOperator::Div,
            "^" => BinaryOperator::Pow,
            "&" => BinaryOperator::Concat,
            "=" => BinaryOperator::Eq,
            "<>" => BinaryOperator::Ne,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::Le,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::Ge,
            _ => return None,
        })
    }

    /// Operators that combine references into a reference.
    pub fn is_reference_operator(self) -> bool {
        matches!(
            self,
            BinaryOperator::Range
                | BinaryOperator::RangeTrimHead
                | BinaryOperator::RangeTrimTail
                | BinaryOperator::RangeTrimBoth
                | BinaryOperator::Union
                | BinaryOperator::Intersect
        )
    }
}

/// `name = init` pair inside `LET(..)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct LetDeclarator {
    pub id: Node,
    pub init: Option<Node>,
    #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// Formula syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Literal {
        value: LiteralValue,
        raw: String,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    ErrorLiteral {
        value: String,
        raw: String,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    ReferenceIdentifier {
        value: String,
        kind: ReferenceKind,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    UnaryExpression {
        operator: UnaryOperator,
        argument: Box<Node>,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    BinaryExpression {
        operator: BinaryOperator,
        arguments: Box<[Node; 2]>,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Option<Node>>,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    LambdaExpression {
        params: Vec<Node>,
        body: Option<Box<Node>>,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    LetExpression {
        declarations: Vec<LetDeclarator>,
        body: Option<Box<Node>>,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    ArrayExpression {
        elements: Vec<Vec<Node>>,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    Identifier {
        name: String,
        #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
}

impl Node {
    pub fn span(&self) -> Option<Span> {
        match self {
            Node::Literal { span, .. }
            | Node::ErrorLiteral { span, .. }
            | Node::ReferenceIdentifier { span, .. }
            | Node::UnaryExpression { span, .. }
            | Node::BinaryExpression { span, .. }
            | Node::CallExpression { span, .. }
            | Node::LambdaExpression { span, .. }
            | Node::LetExpression { span, .. }
            | Node::ArrayExpression { span, .. }
            | Node::Identifier { span, .. } => *span,
        }
    }

    pub(crate) fn set_span(&mut self, new_span: Option<Span>) {
        match self {
            Node::Literal { span, .. }
            | Node::ErrorLiteral { span, .. }
            | Node::ReferenceIdentifier { span, .. }
            | Node::UnaryExpression { span, .. }
            | Node::BinaryExpression { span, .. }
            | Node::CallExpression { span, .. }
            | Node::LambdaExpression { span, .. }
            | Node::LetExpression { span, .. }
            | Node::ArrayExpression { span, .. }
            | Node::Identifier { span, .. } => *span = new_span,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal { .. } | Node::ErrorLiteral { .. })
    }

    /// `true` for a bare defined-name reference (no sheet prefix, no range).
    pub fn is_name(&self) -> bool {
        matches!(
            self,
            Node::ReferenceIdentifier {
                kind: ReferenceKind::Name,
                ..
            }
        )
    }

    /// Whether this node may be an operand of `:`, `,` or intersection.
    pub fn is_reference_shaped(&self) -> bool {
        self.reference_shaped(false)
    }

    pub(crate) fn reference_shaped(&self, loose_ref_calls: bool) -> bool {
        match self {
            Node::ReferenceIdentifier { .. } | Node::LetExpression { .. } => true,
            Node::ErrorLiteral { value, .. } => value.eq_ignore_ascii_case("#REF!"),
            Node::BinaryExpression { operator, .. } => operator.is_reference_operator(),
            Node::CallExpression { callee, .. } => match callee.as_ref() {
                Node::Identifier { name, .. } => loose_ref_calls || is_reference_function(name),
                Node::LambdaExpression { .. } | Node::LetExpression { .. } => true,
                _ => loose_ref_calls,
            },
            _ => false,
        }
    }
}

/// Span from the start of `a` to the end of `b`, if both are known.
pub(crate) fn span_between(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Span::new(a.start.min(b.start), a.end.max(b.end))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(value: &str) -> Node {
        Node::ReferenceIdentifier {
            value: value.to_string(),
            kind: ReferenceKind::Range,
            span: None,
        }
    }

    fn call(name: &str) -> Node {
        Node::CallExpression {
            callee: Box::new(Node::Identifier {
                name: name.to_string(),
                span: None,
            }),
            arguments: vec![],
            span: None,
        }
    }

    #[test]
    fn reference_shaped_nodes() {
        assert!(reference("A1").is_reference_shaped());
        assert!(call("index").is_reference_shaped());
        assert!(call("_xlfn.XLOOKUP").is_reference_shaped());
        assert!(!call("SUM").is_reference_shaped());
        assert!(call("SUM").reference_shaped(true));

        let sum = Node::BinaryExpression {
            operator: BinaryOperator::Add,
            arguments: Box::new([reference("A1"), reference("B1")]),
            span: None,
        };
        assert!(!sum.is_reference_shaped());
        let union = Node::BinaryExpression {
            operator: BinaryOperator::Union,
            arguments: Box::new([reference("A1"), reference("B1")]),
            span: None,
        };
        assert!(union.is_reference_shaped());

        let ref_error = Node::ErrorLiteral {
            value: "#REF!".into(),
            raw: "#ref!".into(),
            span: None,
        };
        assert!(ref_error.is_reference_shaped());
    }

    #[test]
    fn nodes_serialize_with_type_tags() {
        let node = Node::UnaryExpression {
            operator: UnaryOperator::Minus,
            argument: Box::new(reference("A1")),
            span: None,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "UnaryExpression",
                "operator": "-",
                "argument": { "type": "ReferenceIdentifier", "value": "A1", "kind": "range" }
            })
        );
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
