//! Recursive-descent parser for trip expressions.
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! Or         := And ("||" And)*
//! And        := Not ("&&" Not)*
//! Not        := "!" Not | Comparison
//! Comparison := Primary [ ("==" | "!=" | ">" | "<" | ">=" | "<=") Value ]
//! Primary    := "(" Or ")" | Identifier
//! ```
//!
//! Identifiers are data-point paths of letters, digits, `_`, `/`, `.`;
//! values are alphanumeric tokens optionally prefixed with a sign. Bare
//! identifiers are not boolean by themselves, so every identifier leaf
//! must be completed by a comparison operator and value.
//!
//! Parsing returns a result, never panics; errors carry the byte position
//! and a description.

use thiserror::Error;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
        };
        f.write_str(text)
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Expression AST: a tagged union, no virtual dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Binary {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    Compare {
        path: String,
        op: CmpOp,
        value: String,
    },
}

/// Structured parse failure with the byte position of the offense.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("at byte {position}: {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    Or,
    And,
    Not,
    LParen,
    RParen,
    Cmp(CmpOp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spanned {
    token: Token,
    pos: usize,
}

fn is_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '/' || c == '.'
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Spanned { token: Token::LParen, pos: i });
                i += 1;
            }
            ')' => {
                tokens.push(Spanned { token: Token::RParen, pos: i });
                i += 1;
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Cmp(CmpOp::Ne), pos: i });
                    i += 2;
                } else {
                    tokens.push(Spanned { token: Token::Not, pos: i });
                    i += 1;
                }
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Spanned { token: Token::And, pos: i });
                    i += 2;
                } else {
                    return Err(ParseError::new(i, "expected '&&'"));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Spanned { token: Token::Or, pos: i });
                    i += 2;
                } else {
                    return Err(ParseError::new(i, "expected '||'"));
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Cmp(CmpOp::Eq), pos: i });
                    i += 2;
                } else {
                    return Err(ParseError::new(i, "expected '=='"));
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Cmp(CmpOp::Ge), pos: i });
                    i += 2;
                } else {
                    tokens.push(Spanned { token: Token::Cmp(CmpOp::Gt), pos: i });
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned { token: Token::Cmp(CmpOp::Le), pos: i });
                    i += 2;
                } else {
                    tokens.push(Spanned { token: Token::Cmp(CmpOp::Lt), pos: i });
                    i += 1;
                }
            }
            '+' | '-' => {
                let start = i;
                let next_is_atom = bytes
                    .get(i + 1)
                    .map(|&b| is_atom_char(b as char))
                    .unwrap_or(false);
                if !next_is_atom {
                    return Err(ParseError::new(i, format!("dangling sign '{c}'")));
                }
                i += 1;
                let atom_start = i;
                while i < bytes.len() && is_atom_char(bytes[i] as char) {
                    i += 1;
                }
                let mut text = String::with_capacity(1 + i - atom_start);
                text.push(c);
                text.push_str(&input[atom_start..i]);
                tokens.push(Spanned {
                    token: Token::Atom(text),
                    pos: start,
                });
            }
            c if is_atom_char(c) => {
                let start = i;
                while i < bytes.len() && is_atom_char(bytes[i] as char) {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Atom(input[start..i].to_string()),
                    pos: start,
                });
            }
            other => {
                return Err(ParseError::new(i, format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn here(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.pos)
            .unwrap_or(self.input_len)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::Binary {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(ParseError::new(self.here(), "expected ')'")),
                }
            }
            Some(Token::Atom(_)) => {
                let path = match self.advance() {
                    Some(Spanned {
                        token: Token::Atom(text),
                        ..
                    }) => text,
                    _ => return Err(ParseError::new(self.here(), "expected identifier")),
                };

                let op = match self.peek() {
                    Some(&Token::Cmp(op)) => {
                        self.advance();
                        op
                    }
                    _ => {
                        return Err(ParseError::new(
                            self.here(),
                            format!("identifier '{path}' must be completed by a comparison operator and value"),
                        ))
                    }
                };

                match self.advance() {
                    Some(Spanned {
                        token: Token::Atom(value),
                        ..
                    }) => Ok(Expr::Compare { path, op, value }),
                    _ => Err(ParseError::new(
                        self.here(),
                        format!("expected value after '{op}'"),
                    )),
                }
            }
            _ => Err(ParseError::new(
                self.here(),
                "expected '(', '!' or an identifier",
            )),
        }
    }
}

/// Parse one trip expression.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };
    let expr = parser.parse_or()?;
    if parser.peek().is_some() {
        return Err(ParseError::new(parser.here(), "unexpected trailing input"));
    }
    Ok(expr)
}
