use crate::token::{Span, Token, TokenKind};

fn is_prefixed_reference(window: &[Token]) -> bool {
    match window {
        [prefix, bang, target] => {
            matches!(prefix.kind, TokenKind::Context | TokenKind::ContextQuote)
                && !prefix.unterminated
                && bang.is_operator("!")
                && target.is_reference()
        }
        _ => false,
    }
}

/// Fuse every `context ! reference` run into a single token of the reference's kind.
///
/// The fused token's span starts at the prefix and ends with the reference.
pub fn merge_ref_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        out.push(token);
        let n = out.len();
        if n < 3 || !is_prefixed_reference(&out[n - 3..]) {
            continue;
        }
        let target = out.pop();
        let bang = out.pop();
        let prefix = out.pop();
        if let (Some(prefix), Some(bang), Some(target)) = (prefix, bang, target) {
            let span = match (prefix.span, target.span) {
                (Some(a), Some(b)) => Some(Span::new(a.start, b.end)),
                _ => None,
            };
            out.push(Token {
                kind: target.kind,
                value: format!("{}{}{}", prefix.value, bang.value, target.value),
                span,
                unterminated: false,
                error: false,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuses_context_runs() {
        let tokens = vec![
            Token::new(TokenKind::ContextQuote, "'My Sheet'").with_span(Span::new(0, 10)),
            Token::new(TokenKind::Operator, "!").with_span(Span::new(10, 11)),
            Token::new(TokenKind::Beam, "A:A").with_span(Span::new(11, 14)),
            Token::new(TokenKind::Operator, "+").with_span(Span::new(14, 15)),
            Token::new(TokenKind::Number, "1").with_span(Span::new(15, 16)),
        ];
        let merged = merge_ref_tokens(tokens);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].kind, TokenKind::Beam);
        assert_eq!(merged[0].value, "'My Sheet'!A:A");
        assert_eq!(merged[0].span, Some(Span::new(0, 14)));
    }

    #[test]
    fn leaves_dangling_prefixes_alone() {
        let tokens = vec![
            Token::new(TokenKind::Context, "Sheet1"),
            Token::new(TokenKind::Operator, "!"),
            Token::new(TokenKind::Number, "1"),
        ];
        assert_eq!(merge_ref_tokens(tokens.clone()), tokens);
    }
}
