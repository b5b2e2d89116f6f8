//! Query parser
//!
//! ```text
//! expr  := conj ("or" conj)*
//! conj  := term ("and" term)*
//! term  := "(" expr ")" | path ("==" | "!=") value
//! value := 'string' | "string" | number | true | false | null
//! ```

use dettect_core::errors::{DettectError, DtError};

use crate::errors::Result;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
}

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Parsed query
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Cmp {
        path: Vec<String>,
        op: CmpOp,
        value: Literal,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Text(String),
    Number(f64),
    Eq,
    Ne,
    LParen,
    RParen,
}

struct Lexer<'a> {
    query: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn tokenize(query: &'a str) -> Result<Vec<(usize, Token)>> {
        let mut lexer = Lexer {
            query,
            chars: query.char_indices().peekable(),
        };
        let mut tokens = Vec::new();
        while let Some(&(pos, c)) = lexer.chars.peek() {
            let token = match c {
                c if c.is_whitespace() => {
                    lexer.chars.next();
                    continue;
                }
                '(' => {
                    lexer.chars.next();
                    Token::LParen
                }
                ')' => {
                    lexer.chars.next();
                    Token::RParen
                }
                '=' | '!' => {
                    lexer.chars.next();
                    match lexer.chars.next() {
                        Some((_, '=')) if c == '=' => Token::Eq,
                        Some((_, '=')) => Token::Ne,
                        _ => return Err(parse_error(query, pos, "expected '==' or '!='")),
                    }
                }
                '\'' | '"' => lexer.quoted(pos, c)?,
                c if c.is_ascii_digit() || c == '-' => lexer.number(pos)?,
                c if c.is_alphanumeric() || c == '_' => lexer.ident(),
                other => {
                    return Err(parse_error(
                        query,
                        pos,
                        &format!("unexpected character '{}'", other),
                    ))
                }
            };
            tokens.push((pos, token));
        }
        Ok(tokens)
    }

    fn quoted(&mut self, start: usize, quote: char) -> Result<Token> {
        self.chars.next();
        let mut text = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == quote {
                return Ok(Token::Text(text));
            }
            text.push(c);
        }
        Err(parse_error(self.query, start, "unterminated string"))
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        let mut raw = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' || (c == '-' && raw.is_empty()) {
                raw.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        raw.parse()
            .map(Token::Number)
            .map_err(|_| parse_error(self.query, start, "invalid number"))
    }

    fn ident(&mut self) -> Token {
        let mut raw = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' {
                raw.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Ident(raw)
    }
}

fn parse_error(query: &str, position: usize, reason: &str) -> DtError {
    DtError::from(DettectError::QueryParse {
        query: query.to_string(),
        position,
        reason: reason.to_string(),
    })
    .with_op("parse_query")
}

struct Parser<'a> {
    query: &'a str,
    tokens: Vec<(usize, Token)>,
    cursor: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map_or(self.query.len(), |(pos, _)| *pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(_, t)| t.clone());
        self.cursor += 1;
        token
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case(word))
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut terms = vec![self.conj()?];
        while self.keyword("or") {
            self.cursor += 1;
            terms.push(self.conj()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn conj(&mut self) -> Result<Expr> {
        let mut terms = vec![self.term()?];
        while self.keyword("and") {
            self.cursor += 1;
            terms.push(self.term()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn term(&mut self) -> Result<Expr> {
        let position = self.position();
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(parse_error(self.query, position, "unbalanced parenthesis")),
                }
            }
            Some(Token::Ident(path)) => {
                let op_position = self.position();
                let op = match self.next() {
                    Some(Token::Eq) => CmpOp::Eq,
                    Some(Token::Ne) => CmpOp::Ne,
                    _ => return Err(parse_error(self.query, op_position, "expected '==' or '!='")),
                };
                let value = self.literal()?;
                Ok(Expr::Cmp {
                    path: path.split('.').map(str::to_string).collect(),
                    op,
                    value,
                })
            }
            _ => Err(parse_error(self.query, position, "expected a field name or '('")),
        }
    }

    fn literal(&mut self) -> Result<Literal> {
        let position = self.position();
        match self.next() {
            Some(Token::Text(text)) => Ok(Literal::Text(text)),
            Some(Token::Number(n)) => Ok(Literal::Number(n)),
            Some(Token::Ident(word)) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(Literal::Bool(true)),
                "false" => Ok(Literal::Bool(false)),
                "null" | "none" => Ok(Literal::Null),
                _ => Err(parse_error(
                    self.query,
                    position,
                    "expected a quoted string, number, true, false or null",
                )),
            },
            _ => Err(parse_error(self.query, position, "expected a value")),
        }
    }
}

/// Parse a query string
///
/// # Errors
///
/// Returns `InvalidQuery` with the offending position.
pub fn parse(query: &str) -> Result<Expr> {
    let tokens = Lexer::tokenize(query)?;
    let mut parser = Parser {
        query,
        tokens,
        cursor: 0,
    };
    let expr = parser.expr()?;
    if parser.cursor < parser.tokens.len() {
        return Err(parse_error(query, parser.position(), "unexpected trailing input"));
    }
    Ok(expr)
}
