use crate::edm::EdmType;
use crate::error::{Error, Result};
use std::fmt;

/// Kinds of tokens in query option text.
///
/// Operator keywords (`eq`, `and`, `not`, ...) are plain identifiers; the
/// parser recognizes them by text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    IntegerLiteral,
    Int64Literal,
    SingleLiteral,
    DoubleLiteral,
    DecimalLiteral,
    StringLiteral,
    DateTimeLiteral,
    GuidLiteral,
    BinaryLiteral,
    BooleanLiteral,
    NullLiteral,
    /// `@name`, replaced by the value the request gives for it.
    ParameterAlias,
    OpenParen,
    CloseParen,
    Comma,
    Slash,
    Star,
    Dot,
    Minus,
    End,
}

impl TokenKind {
    /// Type descriptor that validates a literal token of this kind.
    pub fn literal_type(self) -> Option<EdmType> {
        Some(match self {
            TokenKind::IntegerLiteral => EdmType::Int32,
            TokenKind::Int64Literal => EdmType::Int64,
            TokenKind::SingleLiteral => EdmType::Single,
            TokenKind::DoubleLiteral => EdmType::Double,
            TokenKind::DecimalLiteral => EdmType::Decimal,
            TokenKind::StringLiteral => EdmType::String,
            TokenKind::DateTimeLiteral => EdmType::DateTime,
            TokenKind::GuidLiteral => EdmType::Guid,
            TokenKind::BinaryLiteral => EdmType::Binary,
            TokenKind::BooleanLiteral => EdmType::Boolean,
            TokenKind::NullLiteral => EdmType::Null,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerLiteral => "integer literal",
            TokenKind::Int64Literal => "Int64 literal",
            TokenKind::SingleLiteral => "Single literal",
            TokenKind::DoubleLiteral => "Double literal",
            TokenKind::DecimalLiteral => "Decimal literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::DateTimeLiteral => "DateTime literal",
            TokenKind::GuidLiteral => "Guid literal",
            TokenKind::BinaryLiteral => "Binary literal",
            TokenKind::BooleanLiteral => "boolean literal",
            TokenKind::NullLiteral => "null",
            TokenKind::ParameterAlias => "parameter alias",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Slash => "'/'",
            TokenKind::Star => "'*'",
            TokenKind::Dot => "'.'",
            TokenKind::Minus => "'-'",
            TokenKind::End => "end of input",
        };

        f.write_str(text)
    }
}

/// A token with its source text and byte offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token<'t> {
    pub kind: TokenKind,
    pub text: &'t str,
    pub position: usize,
}

impl Token<'_> {
    /// Whether this is the identifier `text`, e.g. an operator keyword.
    pub fn identifier_is(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == text
    }
}

/// Pull-based tokenizer over one query option value.
///
/// ```
/// use odata_query::filters::{Lexer, TokenKind};
///
/// let mut lexer = Lexer::new("Price gt 10.5M").unwrap();
/// assert_eq!(lexer.current_token().kind, TokenKind::Identifier);
/// lexer.next_token().unwrap();
/// assert!(lexer.current_token().identifier_is("gt"));
/// lexer.next_token().unwrap();
/// assert_eq!(lexer.current_token().kind, TokenKind::DecimalLiteral);
/// assert_eq!(lexer.current_token().position, 9);
/// ```
#[derive(Clone, Debug)]
pub struct Lexer<'t> {
    text: &'t str,
    current: Token<'t>,
}

/// Identifiers that turn a following quoted section into a typed literal.
const TYPED_LITERAL_PREFIXES: [(&str, TokenKind); 5] = [
    ("datetime", TokenKind::DateTimeLiteral),
    ("guid", TokenKind::GuidLiteral),
    ("binary", TokenKind::BinaryLiteral),
    ("X", TokenKind::BinaryLiteral),
    ("x", TokenKind::BinaryLiteral),
];

impl<'t> Lexer<'t> {
    /// Creates a lexer positioned on the first token.
    pub fn new(text: &'t str) -> Result<Self> {
        let current = scan(text, 0)?;
        Ok(Self { text, current })
    }

    pub fn text(&self) -> &'t str {
        self.text
    }

    pub fn current_token(&self) -> &Token<'t> {
        &self.current
    }

    /// Advances to the next token.
    pub fn next_token(&mut self) -> Result<()> {
        let end = self.current.position + self.current.text.len();
        self.current = scan(self.text, end)?;
        Ok(())
    }

    /// Returns the token after the current one without consuming anything.
    pub fn peek_next_token(&self) -> Result<Token<'t>> {
        scan(self.text, self.current.position + self.current.text.len())
    }

    /// Fails unless the current token is of `kind`.
    pub fn validate_token(&self, kind: TokenKind) -> Result<()> {
        if self.current.kind == kind {
            Ok(())
        } else {
            Err(Error::ExpectedToken {
                expected: kind,
                found: self.found_text(),
                position: self.current.position,
            })
        }
    }

    /// Reads `identifier(.identifier)*` and returns it joined by dots.
    pub fn read_dotted_identifier(&mut self) -> Result<String> {
        self.validate_token(TokenKind::Identifier)?;
        let mut identifier = self.current.text.to_owned();
        self.next_token()?;

        while self.current.kind == TokenKind::Dot {
            self.next_token()?;
            self.validate_token(TokenKind::Identifier)?;
            identifier.push('.');
            identifier.push_str(self.current.text);
            self.next_token()?;
        }

        Ok(identifier)
    }

    /// Text of the current token for diagnostics.
    pub(crate) fn found_text(&self) -> String {
        match self.current.kind {
            TokenKind::End => "end of input".to_owned(),
            _ => self.current.text.to_owned(),
        }
    }
}

/// Scans the token starting at or after byte offset `start`.
fn scan(text: &str, start: usize) -> Result<Token<'_>> {
    let rest = &text[start..];
    let position = start + (rest.len() - rest.trim_start().len());
    let rest = &text[position..];

    let token = |kind: TokenKind, len: usize| Token {
        kind,
        text: &rest[..len],
        position,
    };

    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return Ok(token(TokenKind::End, 0));
    };
    let second = chars.next();

    match first {
        '(' => Ok(token(TokenKind::OpenParen, 1)),
        ')' => Ok(token(TokenKind::CloseParen, 1)),
        ',' => Ok(token(TokenKind::Comma, 1)),
        '/' => Ok(token(TokenKind::Slash, 1)),
        '*' => Ok(token(TokenKind::Star, 1)),
        '.' => Ok(token(TokenKind::Dot, 1)),

        '-' if second.is_some_and(|c| c.is_ascii_digit()) => {
            let (kind, len) = scan_number(rest, position)?;
            Ok(token(kind, len))
        }
        '-' => Ok(token(TokenKind::Minus, 1)),

        '\'' => {
            let len = quoted_len(rest, 0, position)?;
            Ok(token(TokenKind::StringLiteral, len))
        }

        '@' => match identifier_len(&rest[1..]) {
            0 => Err(Error::InvalidCharacter {
                character: '@',
                position,
            }),
            len => Ok(token(TokenKind::ParameterAlias, len + 1)),
        },

        c if c.is_ascii_digit() => {
            let (kind, len) = scan_number(rest, position)?;
            Ok(token(kind, len))
        }

        c if c.is_alphabetic() || c == '_' => {
            let len = identifier_len(rest);
            let identifier = &rest[..len];

            if rest[len..].starts_with('\'') {
                if let Some((_, kind)) = TYPED_LITERAL_PREFIXES
                    .iter()
                    .find(|(prefix, _)| *prefix == identifier)
                {
                    let len = quoted_len(rest, len, position)?;
                    return Ok(token(*kind, len));
                }
            }

            let kind = match identifier {
                "true" | "false" => TokenKind::BooleanLiteral,
                "null" => TokenKind::NullLiteral,
                _ => TokenKind::Identifier,
            };

            Ok(token(kind, len))
        }

        character => Err(Error::InvalidCharacter {
            character,
            position,
        }),
    }
}

fn identifier_len(text: &str) -> usize {
    text.char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(text.len(), |(i, _)| i)
}

/// Length up to and including the quote closing the one at `open`; a
/// doubled quote does not close.
fn quoted_len(text: &str, open: usize, position: usize) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut i = open + 1;

    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Ok(i + 1);
        }
        i += 1;
    }

    Err(Error::UnterminatedLiteral {
        text: text.to_owned(),
        position,
    })
}

/// Scans an optionally negative numeric literal and its type suffix.
fn scan_number(text: &str, position: usize) -> Result<(TokenKind, usize)> {
    let bytes = text.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    let skip_digits = |mut i: usize| {
        while digit_at(i) {
            i += 1;
        }
        i
    };

    let mut kind = TokenKind::IntegerLiteral;
    let mut i = if bytes.first() == Some(&b'-') { 1 } else { 0 };
    i = skip_digits(i);

    if bytes.get(i) == Some(&b'.') {
        kind = TokenKind::DoubleLiteral;
        i += 1;
        if !digit_at(i) {
            return Err(Error::DigitExpected {
                position: position + i,
            });
        }
        i = skip_digits(i);
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        kind = TokenKind::DoubleLiteral;
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !digit_at(i) {
            return Err(Error::DigitExpected {
                position: position + i,
            });
        }
        i = skip_digits(i);
    }

    let suffixed = match bytes.get(i) {
        Some(b'M' | b'm') => Some(TokenKind::DecimalLiteral),
        Some(b'D' | b'd') => Some(TokenKind::DoubleLiteral),
        Some(b'F' | b'f') => Some(TokenKind::SingleLiteral),
        Some(b'L' | b'l') => Some(TokenKind::Int64Literal),
        _ => None,
    };

    if let Some(suffixed) = suffixed {
        kind = suffixed;
        i += 1;
    }

    Ok((kind, i))
}
