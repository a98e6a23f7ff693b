//! Formula tokenizer
//!
//! Turns the body of a formula (the text after `=`) into a flat list of
//! [`Token`]s. Tokens borrow their raw text from the input; only string
//! literals and sheet/workbook qualifiers own unescaped copies.

use crate::ast::Span;
use crate::error::{ParseError, ParseErrorKind};
use crate::evaluator::decimal_from_f64;
use gridcalc_core::{CellAddress, CellError};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::str::FromStr;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(Decimal),
    /// A numeric literal beyond the decimal range, such as `1E+30`
    Float(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    /// A name that is neither a function call nor shaped like a cell address
    Identifier,
    /// An identifier directly followed by `(`
    FunctionName,
    /// `A1`, `$B$2`, `c3`
    CellRef,
    /// `Sheet1!` or `'My Sheet'!`, carrying the unquoted sheet name
    SheetPrefix(String),
    /// `[Book.xlsx]`, carrying the workbook name
    Workbook(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    Colon,

    // End of input
    Eof,
}

/// A lexical unit with its raw text and position
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

/// Tokenize a formula body. The returned list always ends with [`TokenKind::Eof`].
///
/// ```rust
/// use gridcalc_formula::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("SUM(A1:B2)").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
/// assert_eq!(kinds[0], TokenKind::FunctionName);
/// assert_eq!(kinds[2], TokenKind::CellRef);
/// assert_eq!(kinds.last(), Some(&TokenKind::Eof));
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut tokens = Vec::with_capacity(input.len() / 2 + 1);
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.input[start..self.pos],
            span: Span::new(start, self.pos),
        }
    }

    fn error(&self, kind: ParseErrorKind, start: usize) -> ParseError {
        ParseError::new(kind, Span::new(start, self.pos.max(start + 1)))
    }

    fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.peek_char() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '&' => Some(TokenKind::Ampersand),
            '%' => Some(TokenKind::Percent),
            '=' => Some(TokenKind::Equal),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(self.token(kind, start));
        }

        match c {
            '<' => {
                self.advance();
                let kind = match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        TokenKind::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::LessThan,
                };
                Ok(self.token(kind, start))
            }
            '>' => {
                self.advance();
                let kind = if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::GreaterThan
                };
                Ok(self.token(kind, start))
            }
            '"' => self.scan_string(start),
            '#' => self.scan_error(start),
            '[' => self.scan_workbook(start),
            '\'' => self.scan_quoted_sheet(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            '.' if self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()) => {
                self.scan_number(start)
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => Ok(self.scan_identifier(start)),
            _ => {
                self.advance();
                Err(self.error(
                    ParseErrorKind::UnexpectedToken(c.to_string()),
                    start,
                ))
            }
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return Err(self.error(ParseErrorKind::UnterminatedString, start)),
                Some('"') => {
                    self.advance();
                    // "" is an escaped quote
                    if self.peek_char() == Some('"') {
                        self.advance();
                        value.push('"');
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(self.token(TokenKind::String(value), start))
    }

    fn scan_number(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.eat_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.eat_digits();
        }

        let mut scientific = false;
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let exponent_follows = match self.peek_char_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_char_at(2).map_or(false, |c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent_follows {
                scientific = true;
                self.advance();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance();
                }
                self.eat_digits();
            }
        }

        let text = &self.input[start..self.pos];
        let mut literal = Cow::Borrowed(text);
        if text.starts_with('.') {
            literal = Cow::Owned(format!("0{}", text));
        }

        let parsed = if scientific {
            Decimal::from_scientific(&literal.replace('+', ""))
        } else {
            Decimal::from_str(&literal)
        };
        let kind = match parsed {
            Ok(value) => TokenKind::Number(value),
            // too many digits for a decimal: tiny values round, huge ones stay f64
            Err(_) => match literal.parse::<f64>() {
                Ok(f) if f.is_finite() => {
                    decimal_from_f64(f).map_or(TokenKind::Float(f), TokenKind::Number)
                }
                _ => return Err(self.error(ParseErrorKind::NumberOutOfRange, start)),
            },
        };

        Ok(self.token(kind, start))
    }

    fn eat_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn scan_error(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let rest = &self.input[start..];
        let found = [
            CellError::Div0,
            CellError::Value,
            CellError::Ref,
            CellError::Name,
            CellError::Null,
            CellError::Num,
            CellError::Na,
        ]
        .into_iter()
        .find(|e| {
            let lit = e.as_str();
            rest.len() >= lit.len()
                && rest.is_char_boundary(lit.len())
                && rest[..lit.len()].eq_ignore_ascii_case(lit)
        });

        match found {
            Some(error) => {
                self.pos += error.as_str().len();
                Ok(self.token(TokenKind::Error(error), start))
            }
            None => {
                self.advance();
                Err(self.error(ParseErrorKind::UnexpectedToken("#".into()), start))
            }
        }
    }

    fn scan_workbook(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let rest = &self.input[start + 1..];
        let Some(close) = rest.find(']') else {
            self.advance();
            return Err(self.error(ParseErrorKind::UnexpectedToken("[".into()), start));
        };
        let name = rest[..close].trim().to_string();
        self.pos = start + 1 + close + 1;
        if name.is_empty() {
            return Err(self.error(ParseErrorKind::InvalidCellReference, start));
        }
        Ok(self.token(TokenKind::Workbook(name), start))
    }

    fn scan_quoted_sheet(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.advance(); // opening quote
        let mut name = String::new();

        loop {
            match self.peek_char() {
                None => return Err(self.error(ParseErrorKind::UnterminatedString, start)),
                Some('\'') => {
                    self.advance();
                    if self.peek_char() == Some('\'') {
                        self.advance();
                        name.push('\'');
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
            }
        }

        if self.peek_char() != Some('!') || name.is_empty() {
            return Err(self.error(ParseErrorKind::InvalidCellReference, start));
        }
        self.advance();
        Ok(self.token(TokenKind::SheetPrefix(name), start))
    }

    fn scan_identifier(&mut self, start: usize) -> Token<'a> {
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'))
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('!') {
            self.advance();
            return self.token(TokenKind::SheetPrefix(text.to_string()), start);
        }

        let rest = self.input[self.pos..].trim_start();
        let kind = if rest.starts_with('(') {
            TokenKind::FunctionName
        } else if text.eq_ignore_ascii_case("TRUE") {
            TokenKind::Boolean(true)
        } else if text.eq_ignore_ascii_case("FALSE") {
            TokenKind::Boolean(false)
        } else if CellAddress::is_a1_pattern(text) {
            TokenKind::CellRef
        } else {
            TokenKind::Identifier
        };
        self.token(kind, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("1<=2<>3>=4"),
            vec![
                TokenKind::Number(Decimal::from(1)),
                TokenKind::LessEqual,
                TokenKind::Number(Decimal::from(2)),
                TokenKind::NotEqual,
                TokenKind::Number(Decimal::from(3)),
                TokenKind::GreaterEqual,
                TokenKind::Number(Decimal::from(4)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1.23E+5")[0],
            TokenKind::Number(Decimal::from(123000))
        );
        assert_eq!(
            kinds(".5")[0],
            TokenKind::Number(Decimal::from_str("0.5").unwrap())
        );
        assert_eq!(
            kinds("2e-2")[0],
            TokenKind::Number(Decimal::from_str("0.02").unwrap())
        );
    }

    #[test]
    fn test_number_out_of_range() {
        let err = tokenize("1E+999").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NumberOutOfRange);
    }

    #[test]
    fn test_numbers_beyond_decimal_range() {
        assert_eq!(kinds("1E+29")[0], TokenKind::Float(1e29));
        assert!(matches!(
            kinds("123456789012345678901234567890")[0],
            TokenKind::Float(f) if f > 1.2e29 && f < 1.3e29
        ));
        assert_eq!(kinds("1E-30")[0], TokenKind::Number(Decimal::ZERO));
        assert_eq!(
            kinds("1.5E-27")[0],
            TokenKind::Number(Decimal::from_str("0.0000000000000000000000000015").unwrap())
        );
        // the largest decimal is still exact
        assert_eq!(
            kinds("79228162514264337593543950335")[0],
            TokenKind::Number(Decimal::MAX)
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""say ""hi""""#)[0],
            TokenKind::String("say \"hi\"".into())
        );
        let err = tokenize("\"open").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString);
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(kinds("sum (")[0], TokenKind::FunctionName);
        assert_eq!(kinds("$A$1")[0], TokenKind::CellRef);
        assert_eq!(kinds("true")[0], TokenKind::Boolean(true));
        assert_eq!(kinds("base_rate")[0], TokenKind::Identifier);
        assert_eq!(kinds("LOG10(")[0], TokenKind::FunctionName);
    }

    #[test]
    fn test_qualifiers() {
        assert_eq!(
            kinds("[Book.xlsx]'My Sheet'!B2"),
            vec![
                TokenKind::Workbook("Book.xlsx".into()),
                TokenKind::SheetPrefix("My Sheet".into()),
                TokenKind::CellRef,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("Sheet2!A1")[0], TokenKind::SheetPrefix("Sheet2".into()));
    }

    #[test]
    fn test_error_literals() {
        assert_eq!(kinds("#div/0!")[0], TokenKind::Error(CellError::Div0));
        assert_eq!(kinds("#N/A")[0], TokenKind::Error(CellError::Na));
        assert!(tokenize("#WHAT").is_err());
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("A1 + 20").unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(3, 4));
        assert_eq!(tokens[2].span, Span::new(5, 7));
        assert_eq!(tokens[2].text, "20");
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("1 ~ 2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken("~".into()));
        assert_eq!(err.span.start, 2);
    }
}
