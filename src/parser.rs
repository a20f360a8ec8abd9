use std::mem;

use thiserror::Error;

use crate::{
    ast::{Call, CallId, Expr, Operator, Token},
    lexer::{LexError, Lexer},
    value::Value,
};

/// Errors raised while parsing rule text. All of them are fatal: a rule
/// that fails to parse is never evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, found {found} at position {position}")]
    Unexpected {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("empty call at position {position}: a call starts with an operator name")]
    EmptyCall { position: usize },

    #[error("operator name must be a string, found {found} at position {position}")]
    OperatorName { found: String, position: usize },

    #[error("unknown operator '{name}' at position {position}")]
    UnknownOperator { name: String, position: usize },

    #[error("'{op}' takes {expected} operands, found {found} (call at position {position})")]
    Arity {
        op: &'static str,
        expected: String,
        found: usize,
        position: usize,
    },
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_position: usize,
    next_call: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        let current_position = lexer.token_start();
        Ok(Parser {
            lexer,
            current_token,
            current_position,
            next_call: 0,
        })
    }

    /// Number of call nodes created so far.
    pub fn call_count(&self) -> usize {
        self.next_call
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        self.current_position = self.lexer.token_start();
        Ok(())
    }

    fn expect(&mut self, expected: Token, description: &'static str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(description));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self.current_token.to_string(),
            position: self.current_position,
        }
    }

    /// Parse a single rule (a literal, a field path or a call).
    ///
    /// Strings in ordinary positions become field paths; `literal_strings`
    /// turns them into string constants instead (the argument of `str`).
    fn parse_expression(&mut self, literal_strings: bool) -> Result<Expr, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Literal(Value::Number(n)))
            }
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Expr::Literal(Value::Boolean(b)))
            }
            Token::Null => {
                self.advance()?;
                Ok(Expr::Literal(Value::Null))
            }
            Token::String(s) => {
                self.advance()?;
                if literal_strings {
                    Ok(Expr::Literal(Value::String(s)))
                } else {
                    Ok(Expr::Field(s))
                }
            }
            Token::LBracket => {
                let position = self.current_position;
                self.advance()?;
                self.parse_call(position)
            }
            token => {
                self.current_token = token;
                Err(self.unexpected("a rule"))
            }
        }
    }

    /// Parse the remainder of a call; the opening '[' is consumed.
    fn parse_call(&mut self, position: usize) -> Result<Expr, ParseError> {
        let op = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::String(name) => match Operator::from_name(&name) {
                Some(op) => op,
                None => return Err(ParseError::UnknownOperator { name, position }),
            },
            Token::RBracket => return Err(ParseError::EmptyCall { position }),
            token => {
                return Err(ParseError::OperatorName {
                    found: token.to_string(),
                    position: self.current_position,
                })
            }
        };
        self.advance()?;

        // Pre-order: the call gets its id before any nested call
        let id = CallId(self.next_call);
        self.next_call += 1;

        let mut args = vec![];
        while self.check(&Token::Comma) {
            self.advance()?;
            args.push(self.parse_expression(op == Operator::Str)?);
        }
        self.expect(Token::RBracket, "',' or ']'")?;

        check_arity(op, args.len(), position)?;

        Ok(Expr::Call(Call { id, op, args }))
    }

    /// Parse a complete rule, rejecting trailing input.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression(false)?;
        self.expect(Token::Eof, "end of input")?;
        Ok(expr)
    }
}

fn check_arity(op: Operator, found: usize, position: usize) -> Result<(), ParseError> {
    let (min, max) = op.arity();
    if found >= min && max.is_none_or(|max| found <= max) {
        return Ok(());
    }

    let expected = match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{}-{}", min, max),
        None => format!("at least {}", min),
    };
    Err(ParseError::Arity {
        op: op.name(),
        expected,
        found,
        position,
    })
}
