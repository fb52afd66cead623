// Tue Feb 17 2026 - Alex

use crate::memory::Address;
use crate::resolver::lexer::{tokenize, Token, TokenKind};
use crate::resolver::{ExpressionError, Variables};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(i64),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl Expression {
    /// Evaluate against `variables`. `None` means a referenced variable is absent
    /// or bound to null, or the arithmetic is undefined (division by zero).
    pub fn evaluate(&self, variables: &Variables) -> Option<i64> {
        match self {
            Expression::Literal(value) => Some(*value),
            Expression::Variable(name) => variables.get(name),
            Expression::Unary { op, operand } => {
                let value = operand.evaluate(variables)?;
                Some(match op {
                    UnaryOp::Neg => value.wrapping_neg(),
                    UnaryOp::BitNot => !value,
                })
            }
            Expression::Binary { left, op, right } => {
                let l = left.evaluate(variables)?;
                let r = right.evaluate(variables)?;
                match op {
                    BinaryOp::Add => Some(l.wrapping_add(r)),
                    BinaryOp::Sub => Some(l.wrapping_sub(r)),
                    BinaryOp::Mul => Some(l.wrapping_mul(r)),
                    BinaryOp::Div => l.checked_div(r),
                    BinaryOp::Mod => l.checked_rem(r),
                    BinaryOp::BitAnd => Some(l & r),
                    BinaryOp::BitOr => Some(l | r),
                    BinaryOp::BitXor => Some(l ^ r),
                    BinaryOp::Shl => Some(l.wrapping_shl(r as u32)),
                    BinaryOp::Shr => Some(l.wrapping_shr(r as u32)),
                }
            }
        }
    }

    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Literal(_) => {}
            Expression::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expression::Unary { operand, .. } => operand.collect_variables(out),
            Expression::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
        }
    }
}

/// Compiled address expression attached to a property.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressExpression {
    source: String,
    root: Expression,
}

impl AddressExpression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let tokens = tokenize(trimmed)?;
        let mut parser = Parser::new(&tokens);
        let root = parser.parse_expression()?;
        parser.expect_end()?;

        Ok(Self {
            source: trimmed.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expression {
        &self.root
    }

    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_variables(&mut out);
        out
    }

    /// Result is truncated to the 32-bit address space.
    pub fn resolve(&self, variables: &Variables) -> Option<Address> {
        self.root
            .evaluate(variables)
            .map(|value| Address::new(value as u32))
    }
}

impl fmt::Display for AddressExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate in one step. Syntax errors are returned as errors,
/// missing variables as `Ok(None)`.
pub fn resolve(expression: &str, variables: &Variables) -> Result<Option<Address>, ExpressionError> {
    Ok(AddressExpression::parse(expression)?.resolve(variables))
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, current: 0 }
    }

    fn parse_expression(&mut self) -> Result<Expression, ExpressionError> {
        self.parse_bit_or()
    }

    fn parse_bit_or(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_bit_xor()?;
        while self.peek().kind == TokenKind::Pipe {
            self.advance();
            let right = self.parse_bit_xor()?;
            left = binary(left, BinaryOp::BitOr, right);
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_bit_and()?;
        while self.peek().kind == TokenKind::Caret {
            self.advance();
            let right = self.parse_bit_and()?;
            left = binary(left, BinaryOp::BitXor, right);
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_shift()?;
        while self.peek().kind == TokenKind::Ampersand {
            self.advance();
            let right = self.parse_shift()?;
            left = binary(left, BinaryOp::BitAnd, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::ShiftLeft => BinaryOp::Shl,
                TokenKind::ShiftRight => BinaryOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expression, ExpressionError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ExpressionError> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Plus => {
                self.advance();
                return self.parse_unary();
            }
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ExpressionError> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::Integer(value) => Ok(Expression::Literal(value)),
            TokenKind::Identifier(name) => Ok(Expression::Variable(name)),
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                match self.advance().kind {
                    TokenKind::RightParen => Ok(inner),
                    TokenKind::Eof => Err(ExpressionError::UnexpectedEnd("')'".into())),
                    ref other => Err(ExpressionError::UnexpectedToken(other.describe(), token.column)),
                }
            }
            TokenKind::Eof => Err(ExpressionError::UnexpectedEnd("a value".into())),
            other => Err(ExpressionError::UnexpectedToken(other.describe(), token.column)),
        }
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => Ok(()),
            ref other => Err(ExpressionError::UnexpectedToken(other.describe(), token.column)),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let idx = self.current.min(self.tokens.len() - 1);
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        &self.tokens[idx]
    }
}

fn binary(left: Expression, op: BinaryOp, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}
