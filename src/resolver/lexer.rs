// Tue Feb 17 2026 - Alex

use crate::resolver::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, column: usize) -> Self {
        Self { kind, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,
    LeftParen,
    RightParen,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Integer(n) => n.to_string(),
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Percent => "%".into(),
            TokenKind::Ampersand => "&".into(),
            TokenKind::Pipe => "|".into(),
            TokenKind::Caret => "^".into(),
            TokenKind::Tilde => "~".into(),
            TokenKind::ShiftLeft => "<<".into(),
            TokenKind::ShiftRight => ">>".into(),
            TokenKind::LeftParen => "(".into(),
            TokenKind::RightParen => ")".into(),
            TokenKind::Eof => "end of expression".into(),
        }
    }
}

/// Split an address expression into tokens. Identifiers may contain dots so
/// mapper variables such as `party.base` can be referenced directly.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(idx, c)) = chars.peek() {
        let column = idx + 1;

        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }

            '0'..='9' => {
                let mut literal = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        literal.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = parse_integer(&literal)
                    .ok_or_else(|| ExpressionError::InvalidNumber(literal.clone(), column))?;
                tokens.push(Token::new(TokenKind::Integer(value), column));
            }

            'a'..='z' | 'A'..='Z' | '_' | '$' => {
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '$' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::new(TokenKind::Identifier(name), column));
            }

            '<' | '>' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, next)) if next == c => {
                        chars.next();
                        let kind = if c == '<' { TokenKind::ShiftLeft } else { TokenKind::ShiftRight };
                        tokens.push(Token::new(kind, column));
                    }
                    _ => return Err(ExpressionError::UnexpectedCharacter(c, column)),
                }
            }

            _ => {
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '%' => TokenKind::Percent,
                    '&' => TokenKind::Ampersand,
                    '|' => TokenKind::Pipe,
                    '^' => TokenKind::Caret,
                    '~' => TokenKind::Tilde,
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    other => return Err(ExpressionError::UnexpectedCharacter(other, column)),
                };
                chars.next();
                tokens.push(Token::new(kind, column));
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, source.len() + 1));
    Ok(tokens)
}

fn parse_integer(literal: &str) -> Option<i64> {
    let cleaned = literal.replace('_', "");
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()
    } else {
        cleaned.parse::<i64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_hex_and_identifiers() {
        let tokens = tokenize("0x2000 + party.base*2").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Integer(0x2000),
                TokenKind::Plus,
                TokenKind::Identifier("party.base".into()),
                TokenKind::Star,
                TokenKind::Integer(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_garbage() {
        assert_eq!(tokenize("1 # 2"), Err(ExpressionError::UnexpectedCharacter('#', 3)));
        assert!(matches!(tokenize("0xZZ"), Err(ExpressionError::InvalidNumber(..))));
        assert!(tokenize("1 < 2").is_err());
    }
}
