use odata_query::filters::{Lexer, TokenKind};
use odata_query::Error;
use pretty_assertions::assert_eq;

fn tokens(text: &str) -> Vec<(TokenKind, &str)> {
    let mut lexer = Lexer::new(text).expect("valid first token");
    let mut tokens = Vec::new();

    loop {
        let token = *lexer.current_token();
        if token.kind == TokenKind::End {
            return tokens;
        }
        tokens.push((token.kind, token.text));
        lexer.next_token().expect("valid token");
    }
}

#[test]
fn comparison_with_literals() {
    assert_eq!(
        tokens("Name eq 'O''Neil' and Price le 10.5M or Qty ne -5L"),
        vec![
            (TokenKind::Identifier, "Name"),
            (TokenKind::Identifier, "eq"),
            (TokenKind::StringLiteral, "'O''Neil'"),
            (TokenKind::Identifier, "and"),
            (TokenKind::Identifier, "Price"),
            (TokenKind::Identifier, "le"),
            (TokenKind::DecimalLiteral, "10.5M"),
            (TokenKind::Identifier, "or"),
            (TokenKind::Identifier, "Qty"),
            (TokenKind::Identifier, "ne"),
            (TokenKind::Int64Literal, "-5L"),
        ]
    );
}

#[test]
fn numeric_suffixes() {
    assert_eq!(
        tokens("1 2L 3.5 4e10 2.0f 7d 8m"),
        vec![
            (TokenKind::IntegerLiteral, "1"),
            (TokenKind::Int64Literal, "2L"),
            (TokenKind::DoubleLiteral, "3.5"),
            (TokenKind::DoubleLiteral, "4e10"),
            (TokenKind::SingleLiteral, "2.0f"),
            (TokenKind::DoubleLiteral, "7d"),
            (TokenKind::DecimalLiteral, "8m"),
        ]
    );
}

#[test]
fn typed_literal_prefixes() {
    assert_eq!(
        tokens("datetime'2024-01-01T00:00' guid'00000000-0000-0000-0000-000000000000' X'AB' binary'0f' true null"),
        vec![
            (TokenKind::DateTimeLiteral, "datetime'2024-01-01T00:00'"),
            (TokenKind::GuidLiteral, "guid'00000000-0000-0000-0000-000000000000'"),
            (TokenKind::BinaryLiteral, "X'AB'"),
            (TokenKind::BinaryLiteral, "binary'0f'"),
            (TokenKind::BooleanLiteral, "true"),
            (TokenKind::NullLiteral, "null"),
        ]
    );
}

#[test]
fn punctuation_and_aliases() {
    assert_eq!(
        tokens("substring(Address/City,@start)*"),
        vec![
            (TokenKind::Identifier, "substring"),
            (TokenKind::OpenParen, "("),
            (TokenKind::Identifier, "Address"),
            (TokenKind::Slash, "/"),
            (TokenKind::Identifier, "City"),
            (TokenKind::Comma, ","),
            (TokenKind::ParameterAlias, "@start"),
            (TokenKind::CloseParen, ")"),
            (TokenKind::Star, "*"),
        ]
    );
}

#[test]
fn minus_before_identifier_is_an_operator() {
    assert_eq!(
        tokens("-Price"),
        vec![(TokenKind::Minus, "-"), (TokenKind::Identifier, "Price")]
    );
}

#[test]
fn positions_skip_whitespace() {
    let mut lexer = Lexer::new("  Price   gt 3").expect("valid first token");
    assert_eq!(lexer.current_token().position, 2);

    lexer.next_token().expect("valid token");
    assert_eq!(lexer.current_token().position, 10);

    let peeked = lexer.peek_next_token().expect("valid token");
    assert_eq!(peeked.position, 13);
    assert!(lexer.current_token().identifier_is("gt"));
}

#[test]
fn dotted_identifiers() {
    let mut lexer = Lexer::new("Namespace.Function(1)").expect("valid first token");

    let identifier = lexer.read_dotted_identifier().expect("dotted identifier");
    assert_eq!(identifier, "Namespace.Function");
    assert_eq!(lexer.current_token().kind, TokenKind::OpenParen);
}

#[test]
fn validate_token_reports_what_was_found() {
    let lexer = Lexer::new("Price").expect("valid first token");

    assert_eq!(
        lexer.validate_token(TokenKind::OpenParen),
        Err(Error::ExpectedToken {
            expected: TokenKind::OpenParen,
            found: "Price".to_owned(),
            position: 0,
        })
    );
}

#[test]
fn invalid_character() {
    assert_eq!(
        Lexer::new("#").map(|_| ()),
        Err(Error::InvalidCharacter {
            character: '#',
            position: 0,
        })
    );

    let mut lexer = Lexer::new("Price eq ~").expect("valid first token");
    lexer.next_token().expect("valid token");
    assert_eq!(
        lexer.next_token(),
        Err(Error::InvalidCharacter {
            character: '~',
            position: 9,
        })
    );
}

#[test]
fn lone_at_sign_is_invalid() {
    assert_eq!(
        Lexer::new("@").map(|_| ()),
        Err(Error::InvalidCharacter {
            character: '@',
            position: 0,
        })
    );
}

#[test]
fn unterminated_string() {
    assert_eq!(
        Lexer::new("'abc").map(|_| ()),
        Err(Error::UnterminatedLiteral {
            text: "'abc".to_owned(),
            position: 0,
        })
    );
}

#[test]
fn missing_fraction_digits() {
    assert_eq!(
        Lexer::new("1.").map(|_| ()),
        Err(Error::DigitExpected { position: 2 })
    );
    assert_eq!(
        Lexer::new("1e+").map(|_| ()),
        Err(Error::DigitExpected { position: 3 })
    );
}
