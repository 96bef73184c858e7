use crate::assert_tokenizes_as;
use crate::tests::TokenMock;
use crate::token::LexerErrorKind;
use crate::T;

#[test]
fn simple_strings() {
    assert_tokenizes_as!(
        "A = \"\"",
        TokenMock::identifier("A"),
        ' ',
        T![=],
        ' ',
        TokenMock::string("\"\"")
    );
    assert_tokenizes_as!(
        "A = 'one \"two\"'",
        TokenMock::identifier("A"),
        ' ',
        T![=],
        ' ',
        TokenMock::string("'one \"two\"'")
    );
}

#[test]
fn escaped_quotes() {
    assert_tokenizes_as!(r#""a\"b""#, TokenMock::string(r#""a\"b""#));
    assert_tokenizes_as!(r#"'\\'"#, TokenMock::string(r#"'\\'"#));
}

#[test]
fn raw_strings() {
    assert_tokenizes_as!(r#"r"\d+""#, TokenMock::string(r#"r"\d+""#));
    assert_tokenizes_as!(r#"R'x'"#, TokenMock::string(r#"R'x'"#));
    // 'r' on its own is just a name
    assert_tokenizes_as!("r", TokenMock::identifier("r"));
}

#[test]
fn triple_quoted_strings() {
    let input = "\"\"\"first\n\"second\"\n\"\"\"";
    assert_tokenizes_as!(input, TokenMock::string("\"\"\"first\n\"second\"\n\"\"\""));
    assert_tokenizes_as!("''''''", TokenMock::string("''''''"));
}

#[test]
fn unterminated_strings() {
    assert_tokenizes_as!(
        "\"abc\nx",
        TokenMock::error(LexerErrorKind::UnterminatedString, "\"abc"),
        '\n',
        TokenMock::identifier("x")
    );
    assert_tokenizes_as!(
        "'''abc",
        TokenMock::error(LexerErrorKind::UnterminatedString, "'''abc")
    );
}

#[test]
fn non_ascii_strings_use_byte_lengths() {
    assert_tokenizes_as!("\"h\u{e9}\"", TokenMock::string("\"h\u{e9}\""));
    assert_eq!(crate::tokenize("\"h\u{e9}\"")[0].len, 5);
}
