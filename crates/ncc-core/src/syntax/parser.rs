//! Pratt parser for registry expressions
//!
//! Precedence, low to high: `or`, `and`, comparisons, `+ -`, `* / %`,
//! unary (`not`, `-`), atoms. All binary operators parse
//! left-associatively; comparison chains like `a < b < c` therefore
//! parse but are rejected later by type inference (bool compared with
//! int), which makes comparisons effectively non-associative.
//!
//! `if c then a else b` is a prefix form: the `else` branch extends as
//! far right as possible. Unary minus is sugar for `0 - operand`.

use crate::ast::{BinOp, Builtin, Expr};
use crate::span::{Span, Spanned};
use crate::syntax::lexer::{lex, Token};
use crate::Error;

/// Parse an expression string into a span-annotated AST.
pub fn parse_expr(source: &str) -> Result<Spanned<Expr>, Error> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
    };
    let expr = parser.expr_bp(0)?;
    if let Some((tok, span)) = parser.peek() {
        return Err(Error::Syntax {
            message: format!("unexpected {} after expression", tok.describe()),
            span,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    source: &'a str,
}

/// Binding powers for infix operators.
fn infix_binding(tok: Token) -> Option<(u8, BinOp)> {
    let info = match tok {
        Token::Or => (1, BinOp::Or),
        Token::And => (2, BinOp::And),
        Token::EqEq => (3, BinOp::Eq),
        Token::BangEq => (3, BinOp::Ne),
        Token::Lt => (3, BinOp::Lt),
        Token::LtEq => (3, BinOp::Le),
        Token::Gt => (3, BinOp::Gt),
        Token::GtEq => (3, BinOp::Ge),
        Token::Plus => (4, BinOp::Add),
        Token::Minus => (4, BinOp::Sub),
        Token::Star => (5, BinOp::Mul),
        Token::Slash => (5, BinOp::Div),
        Token::Percent => (5, BinOp::Rem),
        _ => return None,
    };
    Some(info)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<(Token, Span)> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    /// Span just past the end of input, for "unexpected end" errors.
    fn eof_span(&self) -> Span {
        let end = self.source.len() as u32;
        Span::new(end, end)
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<Span, Error> {
        match self.advance() {
            Some((tok, span)) if tok == expected => Ok(span),
            Some((tok, span)) => Err(Error::Syntax {
                message: format!("expected {} {}, found {}", expected.describe(), context, tok.describe()),
                span,
            }),
            None => Err(Error::Syntax {
                message: format!("expected {} {}, found end of input", expected.describe(), context),
                span: self.eof_span(),
            }),
        }
    }

    fn expr_bp(&mut self, min_bp: u8) -> Result<Spanned<Expr>, Error> {
        let mut lhs = self.unary()?;

        while let Some((tok, _)) = self.peek() {
            let Some((bp, op)) = infix_binding(tok) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            // bp + 1 on the right makes every operator left-associative
            let rhs = self.expr_bp(bp + 1)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>, Error> {
        match self.peek() {
            Some((Token::Not, span)) => {
                self.advance();
                let operand = self.unary()?;
                let full = span.merge(operand.span);
                Ok(Spanned::new(Expr::Not(Box::new(operand)), full))
            }
            Some((Token::If, span)) => {
                self.advance();
                let cond = self.expr_bp(0)?;
                self.expect(Token::Then, "in if-then-else")?;
                let then = self.expr_bp(0)?;
                self.expect(Token::Else, "in if-then-else")?;
                let els = self.expr_bp(0)?;
                let full = span.merge(els.span);
                Ok(Spanned::new(
                    Expr::If {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        els: Box::new(els),
                    },
                    full,
                ))
            }
            Some((Token::Minus, span)) => {
                self.advance();
                let operand = self.unary()?;
                let full = span.merge(operand.span);
                // Lower `-e` to `0 - e`
                let zero = Spanned::new(Expr::Int(0), span);
                Ok(Spanned::new(
                    Expr::Binary {
                        op: BinOp::Sub,
                        lhs: Box::new(zero),
                        rhs: Box::new(operand),
                    },
                    full,
                ))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Spanned<Expr>, Error> {
        let Some((tok, span)) = self.advance() else {
            return Err(Error::Syntax {
                message: "unexpected end of input".to_string(),
                span: self.eof_span(),
            });
        };

        match tok {
            Token::Int => {
                let text = &self.source[span.start as usize..span.end as usize];
                let value: i64 = text.parse().map_err(|_| Error::Syntax {
                    message: format!("integer literal `{text}` out of range"),
                    span,
                })?;
                Ok(Spanned::new(Expr::Int(value), span))
            }
            Token::True => Ok(Spanned::new(Expr::Bool(true), span)),
            Token::False => Ok(Spanned::new(Expr::Bool(false), span)),
            Token::Ident => {
                let name = &self.source[span.start as usize..span.end as usize];
                if let Some(builtin) = Builtin::from_name(name) {
                    if matches!(self.peek(), Some((Token::LParen, _))) {
                        return self.call(builtin, span);
                    }
                }
                Ok(Spanned::new(Expr::Ident(name.to_string()), span))
            }
            Token::LParen => {
                let expr = self.expr_bp(0)?;
                self.expect(Token::RParen, "to close parenthesized expression")?;
                Ok(expr)
            }
            other => Err(Error::Syntax {
                message: format!("unexpected {}", other.describe()),
                span,
            }),
        }
    }

    fn call(&mut self, builtin: Builtin, name_span: Span) -> Result<Spanned<Expr>, Error> {
        self.advance(); // consume `(`
        let mut args = Vec::new();
        loop {
            args.push(self.expr_bp(0)?);
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.advance();
                }
                _ => break,
            }
        }
        let close = self.expect(Token::RParen, &format!("after {} arguments", builtin.name()))?;

        if args.len() != builtin.arity() {
            return Err(Error::Syntax {
                message: format!(
                    "{} requires {} arguments, got {}",
                    builtin.name(),
                    builtin.arity(),
                    args.len()
                ),
                span: name_span.merge(close),
            });
        }

        Ok(Spanned::new(
            Expr::Call { builtin, args },
            name_span.merge(close),
        ))
    }
}
