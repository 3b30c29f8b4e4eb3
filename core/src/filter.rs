//! Entry filter expressions.
//!
//! A filter is a conjunction of `field op literal` comparisons, optionally
//! parenthesized and joined with `AND`:
//!
//! ```text
//! (time eq '12:00') AND (text eq 'sausage roll')
//! number_of_calories lt 50
//! ```
//!
//! Parsing produces a [`Filter`] of typed [`Clause`]s. Storage renders it as a
//! parameterized `WHERE` fragment; literals are always bound, never spliced
//! into SQL text.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value;

use crate::error::{Error, Result};

/// Deepest parenthesis nesting a filter may use.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Date,
    Time,
    Text,
    NumberOfCalories,
    Username,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "text" => Some(Self::Text),
            "number_of_calories" => Some(Self::NumberOfCalories),
            "username" => Some(Self::Username),
            _ => None,
        }
    }

    /// Column backing this field in the `calories` table.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Date => "date",
            Self::Time => "time",
            Self::Text => "text",
            Self::NumberOfCalories => "number_of_calories",
            Self::Username => "username",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Id | Self::NumberOfCalories)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Lt,
}

impl Op {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            _ => None,
        }
    }

    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Integer(i64),
}

impl Literal {
    fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::Text(s.clone()),
            Self::Integer(n) => Value::Integer(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: Field,
    pub op: Op,
    pub value: Literal,
}

impl Clause {
    #[must_use]
    pub fn new(field: Field, op: Op, value: Literal) -> Self {
        Self { field, op, value }
    }
}

/// A parsed conjunctive predicate over calorie entry fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end: input.len(),
            depth: 0,
        };
        let mut clauses = Vec::new();
        parser.expr(&mut clauses)?;
        if let Some(tok) = parser.peek() {
            return Err(match &tok.kind {
                TokenKind::RParen => Error::invalid(format!(
                    "unbalanced ')' at offset {}",
                    tok.offset
                )),
                _ => unexpected(tok),
            });
        }
        Ok(Self { clauses })
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Restrict the filter to entries owned by `username`.
    #[must_use]
    pub fn scoped_to(mut self, username: &str) -> Self {
        self.clauses.push(Clause::new(
            Field::Username,
            Op::Eq,
            Literal::Text(username.to_string()),
        ));
        self
    }

    /// Render as a `WHERE` fragment with positional placeholders, plus the
    /// values to bind to them in order.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut parts = Vec::with_capacity(self.clauses.len());
        let mut values = Vec::with_capacity(self.clauses.len());
        for (i, clause) in self.clauses.iter().enumerate() {
            parts.push(format!(
                "\"{}\" {} ?{}",
                clause.field.column(),
                clause.op.sql(),
                i + 1
            ));
            values.push(clause.value.to_value());
        }
        (parts.join(" AND "), values)
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            let op = match clause.op {
                Op::Eq => "eq",
                Op::Ne => "ne",
                Op::Gt => "gt",
                Op::Lt => "lt",
            };
            match &clause.value {
                Literal::Text(s) => write!(
                    f,
                    "({} {op} '{}')",
                    clause.field.column(),
                    s.replace('\'', "''")
                )?,
                Literal::Integer(n) => write!(f, "({} {op} {n})", clause.field.column())?,
            }
        }
        Ok(())
    }
}

// --- Lexer ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    LParen,
    RParen,
    Word(String),
    Str(String),
    Int(i64),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let kind = match c {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => {
                            // '' is an escaped quote
                            if chars.peek().is_some_and(|&(_, n)| n == '\'') {
                                chars.next();
                                value.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some((_, ch)) => value.push(ch),
                        None => {
                            return Err(Error::invalid(format!(
                                "unterminated string starting at offset {offset}"
                            )));
                        }
                    }
                }
                TokenKind::Str(value)
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = text.parse::<i64>().map_err(|_| {
                    Error::invalid(format!("invalid number '{text}' at offset {offset}"))
                })?;
                TokenKind::Int(n)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&(_, w)) = chars.peek() {
                    if w.is_alphanumeric() || w == '_' {
                        word.push(w);
                        chars.next();
                    } else {
                        break;
                    }
                }
                TokenKind::Word(word)
            }
            other => {
                return Err(Error::invalid(format!(
                    "unexpected character '{other}' at offset {offset}"
                )));
            }
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

// --- Parser ---

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn end_of_input(&self, expected: &str) -> Error {
        Error::invalid(format!(
            "expected {expected} at offset {}, found end of input",
            self.end
        ))
    }

    // expr := term ("AND" term)*
    fn expr(&mut self, out: &mut Vec<Clause>) -> Result<()> {
        self.term(out)?;
        while let Some(tok) = self.peek() {
            match &tok.kind {
                TokenKind::Word(w) if w.eq_ignore_ascii_case("and") => {
                    self.pos += 1;
                    self.term(out)?;
                }
                TokenKind::Word(w) if w.eq_ignore_ascii_case("or") => {
                    return Err(Error::invalid(format!(
                        "OR is not supported (offset {})",
                        tok.offset
                    )));
                }
                _ => break,
            }
        }
        Ok(())
    }

    // term := "(" expr ")" | field op literal
    fn term(&mut self, out: &mut Vec<Clause>) -> Result<()> {
        let Some(tok) = self.peek() else {
            return Err(self.end_of_input("a comparison"));
        };
        if tok.kind == TokenKind::LParen {
            let open = tok.offset;
            if self.depth >= MAX_NESTING {
                return Err(Error::invalid(format!(
                    "filter nested too deeply at offset {open} (at most {MAX_NESTING} levels)"
                )));
            }
            self.pos += 1;
            self.depth += 1;
            self.expr(out)?;
            self.depth -= 1;
            return match self.next() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => Ok(()),
                Some(tok) => Err(unexpected(tok)),
                None => Err(Error::invalid(format!(
                    "unclosed '(' at offset {open}"
                ))),
            };
        }
        out.push(self.comparison()?);
        Ok(())
    }

    fn comparison(&mut self) -> Result<Clause> {
        let field = match self.next().cloned() {
            Some(Token {
                kind: TokenKind::Word(w),
                offset,
            }) => {
                if w.eq_ignore_ascii_case("not") {
                    return Err(Error::invalid(format!(
                        "NOT is not supported (offset {offset})"
                    )));
                }
                Field::from_name(&w).ok_or_else(|| {
                    Error::invalid(format!("unknown field '{w}' at offset {offset}"))
                })?
            }
            Some(tok) => return Err(unexpected(&tok)),
            None => return Err(self.end_of_input("a field name")),
        };

        let op = match self.next().cloned() {
            Some(Token {
                kind: TokenKind::Word(w),
                offset,
            }) => Op::from_name(&w).ok_or_else(|| {
                Error::invalid(format!(
                    "unknown operator '{w}' at offset {offset}; use eq, ne, gt, or lt"
                ))
            })?,
            Some(tok) => return Err(unexpected(&tok)),
            None => return Err(self.end_of_input("an operator")),
        };

        let value = match self.next().cloned() {
            Some(Token {
                kind: TokenKind::Str(s),
                offset,
            }) => {
                if field.is_numeric() {
                    let n = s.trim().parse::<i64>().map_err(|_| {
                        Error::invalid(format!(
                            "field '{}' expects a number, got '{s}' at offset {offset}",
                            field.column()
                        ))
                    })?;
                    Literal::Integer(n)
                } else {
                    Literal::Text(s)
                }
            }
            Some(Token {
                kind: TokenKind::Int(n),
                offset,
            }) => {
                if !field.is_numeric() {
                    return Err(Error::invalid(format!(
                        "field '{}' expects a quoted string at offset {offset}",
                        field.column()
                    )));
                }
                Literal::Integer(n)
            }
            Some(tok) => return Err(unexpected(&tok)),
            None => return Err(self.end_of_input("a value")),
        };

        Ok(Clause::new(field, op, value))
    }
}

fn unexpected(tok: &Token) -> Error {
    let shown = match &tok.kind {
        TokenKind::LParen => "(".to_string(),
        TokenKind::RParen => ")".to_string(),
        TokenKind::Word(w) => w.clone(),
        TokenKind::Str(s) => format!("'{s}'"),
        TokenKind::Int(n) => n.to_string(),
    };
    Error::invalid(format!(
        "unexpected token '{shown}' at offset {}",
        tok.offset
    ))
}
