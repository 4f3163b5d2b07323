use csg_core::{ArityError, Primitive, SetOperator};

use crate::grammar::Grammar;
use crate::program::{Expression, Token};
use crate::render::{StackError, check_structure};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty program")]
    Empty,
    #[error("unknown symbol '{symbol}' at offset {offset}")]
    UnknownSymbol { symbol: String, offset: usize },
    #[error("unexpected '{found}' at offset {offset}, expected {expected}")]
    Unexpected {
        found: char,
        offset: usize,
        expected: &'static str,
    },
    #[error("unterminated parameter list for '{symbol}' at offset {offset}")]
    Unterminated { symbol: String, offset: usize },
    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },
    #[error("{source} at offset {offset}")]
    Arity { source: ArityError, offset: usize },
    #[error("primitive at offset {offset} has rank {found}, program has rank {expected}")]
    MixedRank {
        offset: usize,
        expected: usize,
        found: usize,
    },
    #[error("program has {tokens} tokens, budget is {budget}")]
    TooLong { tokens: usize, budget: usize },
    #[error(transparent)]
    Structure(#[from] StackError),
}

/// Parses a program and checks that it leaves exactly one canvas on the stack.
pub fn parse(source: &str, grammar: &Grammar) -> Result<Expression, ParseError> {
    let tokens = Lexer::new(source, grammar).tokenize()?;
    finish(tokens, None)
}

/// Like [`parse`], rejecting programs with more than `max_tokens` tokens.
pub fn parse_with_budget(
    source: &str,
    grammar: &Grammar,
    max_tokens: usize,
) -> Result<Expression, ParseError> {
    let tokens = Lexer::new(source, grammar).tokenize()?;
    finish(tokens, Some(max_tokens))
}

/// Rewrites a program into canonical form.
pub fn canonicalize(source: &str, grammar: &Grammar) -> Result<String, ParseError> {
    parse(source, grammar).map(|expression| expression.to_canonical())
}

fn finish(tokens: Vec<Token>, budget: Option<usize>) -> Result<Expression, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some(budget) = budget
        && tokens.len() > budget
    {
        return Err(ParseError::TooLong {
            tokens: tokens.len(),
            budget,
        });
    }
    check_structure(&tokens, None)?;
    Ok(Expression::from_tokens(tokens))
}

#[derive(Debug)]
struct Lexer<'a> {
    source: &'a str,
    grammar: &'a Grammar,
    index: usize,
    rank: Option<usize>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, grammar: &'a Grammar) -> Self {
        Self {
            source,
            grammar,
            index: 0,
            rank: None,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance_char();
                continue;
            }
            if ch == self.grammar.stop_symbol() {
                break;
            }

            let offset = self.index;
            if let Some(op) = SetOperator::from_symbol(ch) {
                if !self.grammar.accepts_operator(op) {
                    return Err(ParseError::UnknownSymbol {
                        symbol: ch.to_string(),
                        offset,
                    });
                }
                self.advance_char();
                tokens.push(Token::Operator(op));
                continue;
            }

            if ch.is_ascii_alphabetic() {
                tokens.push(self.lex_primitive()?);
                continue;
            }

            return Err(ParseError::Unexpected {
                found: ch,
                offset,
                expected: "a primitive, an operator or the stop symbol",
            });
        }

        Ok(tokens)
    }

    fn lex_primitive(&mut self) -> Result<Token, ParseError> {
        let offset = self.index;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
        let symbol = &self.source[offset..self.index];
        let kind = self
            .grammar
            .primitive(symbol)
            .ok_or_else(|| ParseError::UnknownSymbol {
                symbol: symbol.to_string(),
                offset,
            })?;

        match self.peek_char() {
            Some('(') => {
                self.advance_char();
            }
            Some(found) => {
                return Err(ParseError::Unexpected {
                    found,
                    offset: self.index,
                    expected: "'(' after primitive symbol",
                });
            }
            None => {
                return Err(ParseError::Unterminated {
                    symbol: symbol.to_string(),
                    offset,
                });
            }
        }

        let close = self.source[self.index..]
            .find(')')
            .map(|relative| self.index + relative)
            .ok_or_else(|| ParseError::Unterminated {
                symbol: symbol.to_string(),
                offset,
            })?;
        let params = self.lex_numbers(close)?;
        self.index = close + 1;

        if let Some(expected) = self.rank {
            if expected != kind.rank() {
                return Err(ParseError::MixedRank {
                    offset,
                    expected,
                    found: kind.rank(),
                });
            }
        } else {
            self.rank = Some(kind.rank());
        }

        Primitive::new(kind, params)
            .map(Token::Primitive)
            .map_err(|source| ParseError::Arity { source, offset })
    }

    fn lex_numbers(&self, close: usize) -> Result<Vec<f64>, ParseError> {
        let inner = &self.source[self.index..close];
        if inner.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut values = Vec::new();
        let mut start = self.index;
        for part in inner.split(',') {
            let text = part.trim();
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => values.push(value),
                _ => {
                    return Err(ParseError::InvalidNumber {
                        text: text.to_string(),
                        offset: start,
                    });
                }
            }
            start += part.len() + 1;
        }
        Ok(values)
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.index += ch.len_utf8();
        Some(ch)
    }
}
