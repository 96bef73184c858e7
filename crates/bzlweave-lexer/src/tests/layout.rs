use crate::assert_tokenizes_as;
use crate::tests::TokenMock;
use crate::token::{LexerErrorKind, TokenKind};
use crate::T;

#[test]
fn call_statement() {
    assert_tokenizes_as!(
        "cc_library(name = \"a\", srcs = [\"a.cc\"])\n",
        TokenMock::identifier("cc_library"),
        T!['('],
        TokenMock::identifier("name"),
        ' ',
        T![=],
        ' ',
        TokenMock::string("\"a\""),
        T![,],
        ' ',
        TokenMock::identifier("srcs"),
        ' ',
        T![=],
        ' ',
        T!['['],
        TokenMock::string("\"a.cc\""),
        T![']'],
        T![')'],
        '\n'
    );
}

#[test]
fn newlines_inside_brackets_are_whitespace() {
    assert_tokenizes_as!(
        "x = [\n    1,\n]\n",
        TokenMock::identifier("x"),
        ' ',
        T![=],
        ' ',
        T!['['],
        TokenMock::whitespace("\n"),
        TokenMock::whitespace("    "),
        TokenMock::int("1"),
        T![,],
        TokenMock::whitespace("\n"),
        T![']'],
        '\n'
    );
}

#[test]
fn line_continuation() {
    assert_tokenizes_as!(
        "x = 1 \\\n  + 2",
        TokenMock::identifier("x"),
        ' ',
        T![=],
        ' ',
        TokenMock::int("1"),
        ' ',
        TokenMock::whitespace("\\\n"),
        TokenMock::whitespace("  "),
        T![+],
        ' ',
        TokenMock::int("2")
    );
    assert_tokenizes_as!(
        "\\x",
        TokenMock::error(LexerErrorKind::StrayBackslash, "\\"),
        TokenMock::identifier("x")
    );
}

#[test]
fn indentation() {
    assert_tokenizes_as!(
        "def f():\n    return 1\n\n  # note\n",
        T![def],
        ' ',
        TokenMock::identifier("f"),
        T!['('],
        T![')'],
        T![:],
        '\n',
        TokenMock::indent("    "),
        T![return],
        ' ',
        TokenMock::int("1"),
        '\n',
        '\n',
        TokenMock::whitespace("  "),
        TokenMock::comment("# note"),
        '\n'
    );
}

#[test]
fn keywords() {
    assert_tokenizes_as!(
        "None True False if lambda load",
        T![None],
        ' ',
        T![True],
        ' ',
        T![False],
        ' ',
        TokenMock::reserved("if"),
        ' ',
        TokenMock::reserved("lambda"),
        ' ',
        TokenMock::identifier("load")
    );
}

#[test]
fn operators() {
    assert_tokenizes_as!(
        "a += b ** 2 == c",
        TokenMock::identifier("a"),
        ' ',
        TokenMock::operator("+="),
        ' ',
        TokenMock::identifier("b"),
        ' ',
        TokenMock::operator("**"),
        ' ',
        TokenMock::int("2"),
        ' ',
        TokenMock::operator("=="),
        ' ',
        TokenMock::identifier("c")
    );
    assert_tokenizes_as!(
        "-1 -> x",
        T![-],
        TokenMock::int("1"),
        ' ',
        TokenMock::operator("->"),
        ' ',
        TokenMock::identifier("x")
    );
}

#[test]
fn unexpected_character() {
    let tokens = crate::tokenize("a $ b");
    assert_eq!(
        tokens[2].kind,
        TokenKind::Error(crate::token::LexerError {
            kind: LexerErrorKind::UnexpectedCharacter
        })
    );
}

#[test]
fn streaming_lexer_skips_trivia() {
    let mut lexer = crate::Lexer::new("a  # c\n", true);
    assert_eq!(lexer.token().kind, TokenKind::Identifier);
    lexer.advance();
    assert_eq!(lexer.token().kind, TokenKind::Newline);
    lexer.advance();
    assert!(lexer.token().is_end_of_input());
}
