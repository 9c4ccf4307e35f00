//! Expression lexer using logos
//!
//! # Token Categories
//!
//! 1. Keywords: `true`, `false`, `not`, `and`, `or`, `if`, `then`, `else`
//! 2. Operators: `== != < <= > >= + - * / %`
//! 3. Delimiters: `( ) ,`
//! 4. Literals: decimal integers
//! 5. Identifiers: state variables, enum literals, builtin names

use crate::span::Span;
use crate::Error;
use logos::Logos;

/// Expression tokens
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // === Keywords ===
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("not")]
    Not,

    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    // === Operators ===
    #[token("==")]
    EqEq,

    #[token("!=")]
    BangEq,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    // === Delimiters ===
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    // === Literals and identifiers ===
    #[regex(r"[0-9]+")]
    Int,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

impl Token {
    /// Human-readable description used in parse error messages
    pub fn describe(self) -> &'static str {
        match self {
            Token::True => "`true`",
            Token::False => "`false`",
            Token::Not => "`not`",
            Token::And => "`and`",
            Token::Or => "`or`",
            Token::If => "`if`",
            Token::Then => "`then`",
            Token::Else => "`else`",
            Token::EqEq => "`==`",
            Token::BangEq => "`!=`",
            Token::LtEq => "`<=`",
            Token::GtEq => "`>=`",
            Token::Lt => "`<`",
            Token::Gt => "`>`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Star => "`*`",
            Token::Slash => "`/`",
            Token::Percent => "`%`",
            Token::LParen => "`(`",
            Token::RParen => "`)`",
            Token::Comma => "`,`",
            Token::Int => "integer literal",
            Token::Ident => "identifier",
        }
    }
}

/// Tokenize an expression string into (token, span) pairs.
///
/// Spans are byte offsets into `source`. An unexpected character
/// produces a syntax error pointing at it.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, Error> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        match result {
            Ok(tok) => tokens.push((tok, span)),
            Err(()) => {
                return Err(Error::Syntax {
                    message: format!("unexpected character `{}`", &source[range]),
                    span,
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_lex_operators() {
        assert_eq!(
            kinds("a == b != c <= d >= e < f > g"),
            vec![
                Token::Ident,
                Token::EqEq,
                Token::Ident,
                Token::BangEq,
                Token::Ident,
                Token::LtEq,
                Token::Ident,
                Token::GtEq,
                Token::Ident,
                Token::Lt,
                Token::Ident,
                Token::Gt,
                Token::Ident,
            ]
        );
    }

    #[test]
    fn test_lex_keywords_vs_idents() {
        assert_eq!(
            kinds("if truth then true else not_a"),
            vec![
                Token::If,
                Token::Ident,
                Token::Then,
                Token::True,
                Token::Else,
                Token::Ident,
            ]
        );
    }

    #[test]
    fn test_lex_spans() {
        let tokens = lex("n + 12").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 1));
        assert_eq!(tokens[1].1, Span::new(2, 3));
        assert_eq!(tokens[2].1, Span::new(4, 6));
    }

    #[test]
    fn test_lex_unexpected_character() {
        let err = lex("a @ b").unwrap_err();
        assert!(err.to_string().contains("unexpected character `@`"));
    }

    #[test]
    fn test_lex_bare_bang_rejected() {
        assert!(lex("!x").is_err());
        assert!(lex("x != y").is_ok());
    }
}
