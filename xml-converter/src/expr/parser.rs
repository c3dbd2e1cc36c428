//! Tokenizer and Pratt parser for arithmetic expressions

use crate::error::{ConvertError, Result};

use super::Number;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Number),
    Placeholder,
    Negate(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Call { func: Func, arg: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Int,
    Float,
}

/// The one identifier an expression may reference
pub const PLACEHOLDER: &str = "x";

const BP_ADDITIVE: u8 = 2;
const BP_MULTIPLICATIVE: u8 = 4;
const BP_UNARY: u8 = 6;

fn error(msg: impl Into<String>) -> ConvertError {
    ConvertError::Expression(msg.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = if literal.contains('.') {
                    literal
                        .parse::<f64>()
                        .map(Number::Float)
                        .map_err(|_| error(format!("bad number '{}'", literal)))?
                } else {
                    literal
                        .parse::<i64>()
                        .map(Number::Int)
                        .map_err(|_| error(format!("bad number '{}'", literal)))?
                };
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(error(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => Err(error(format!("expected {:?}, found {:?}", expected, other))),
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut left = self.parse_prefix()?;

        loop {
            let (op, bp) = match self.peek() {
                Some(Token::Plus) => (BinaryOp::Add, BP_ADDITIVE),
                Some(Token::Minus) => (BinaryOp::Sub, BP_ADDITIVE),
                Some(Token::Star) => (BinaryOp::Mul, BP_MULTIPLICATIVE),
                Some(Token::Slash) => (BinaryOp::Div, BP_MULTIPLICATIVE),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let right = self.parse_expr(bp + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(n)),
            Some(Token::Minus) => Ok(Expr::Negate(Box::new(self.parse_expr(BP_UNARY)?))),
            Some(Token::Plus) => self.parse_expr(BP_UNARY),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                PLACEHOLDER => Ok(Expr::Placeholder),
                "int" | "float" => {
                    let func = if name == "int" { Func::Int } else { Func::Float };
                    self.expect(Token::LParen)?;
                    let arg = self.parse_expr(0)?;
                    self.expect(Token::RParen)?;
                    Ok(Expr::Call { func, arg: Box::new(arg) })
                }
                other => Err(error(format!("unknown name '{}'", other))),
            },
            Some(other) => Err(error(format!("unexpected {:?}", other))),
            None => Err(error("unexpected end of expression")),
        }
    }
}

/// Parse a complete expression
pub fn parse(input: &str) -> Result<Expr> {
    let mut parser = ExprParser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let expr = parser.parse_expr(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(error(format!("trailing {:?}", token))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse("1+2*3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Literal(Number::Int(1))),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Literal(Number::Int(2))),
                    right: Box::new(Expr::Literal(Number::Int(3))),
                }),
            }
        );
    }

    #[test]
    fn test_rejects_names_and_garbage() {
        assert!(parse("__import__").is_err());
        assert!(parse("1 +").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("2 ** 3").is_err());
        assert!(parse("'text'").is_err());
    }

    #[test]
    fn test_functions_and_placeholder() {
        assert!(matches!(parse("int(x/60)").unwrap(), Expr::Call { func: Func::Int, .. }));
        assert_eq!(parse("x").unwrap(), Expr::Placeholder);
    }
}
