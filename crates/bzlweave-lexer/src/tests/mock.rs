use std::borrow::Cow;

use crate::lexer::is_space_or_tab;
use crate::token::{Token, TokenKind};

#[derive(Debug, Eq, PartialEq)]
pub(crate) struct TokenMock<'a> {
    pub(crate) text: Cow<'a, str>,
    pub(crate) kind: TokenKind,
    pub(crate) len: usize,
}

impl<'a> From<&'a str> for TokenMock<'a> {
    fn from(val: &'a str) -> Self {
        match val {
            "\n" => TokenMock {
                text: Cow::Borrowed(val),
                kind: TokenKind::Newline,
                len: val.len(),
            },
            val if val.chars().all(is_space_or_tab) => TokenMock {
                text: Cow::Borrowed(val),
                kind: TokenKind::Whitespace,
                len: val.len(),
            },
            _ => panic!("no mock for {val:?}"),
        }
    }
}

impl From<Token> for TokenMock<'_> {
    fn from(val: Token) -> Self {
        if let Some(fixed_str) = val.get_fixed_str() {
            return TokenMock {
                kind: val.kind,
                text: Cow::Borrowed(fixed_str),
                len: fixed_str.len(),
            };
        }

        panic!("no fixed representation for token {:?}", val)
    }
}

impl From<char> for TokenMock<'_> {
    fn from(val: char) -> Self {
        match val {
            '\n' => TokenMock {
                text: Cow::Borrowed("\n"),
                len: 1,
                kind: TokenKind::Newline,
            },
            ' ' => TokenMock {
                text: Cow::Borrowed(" "),
                len: 1,
                kind: TokenKind::Whitespace,
            },
            _ => unimplemented!(),
        }
    }
}

#[macro_export]
macro_rules! assert_tokenizes_as {
    ($input:expr, $($tokens:expr),+ $(,)?) => {
        let mut expected_tokens = vec![];
        for token in vec![$($crate::tests::TokenMock::from($tokens)),+] {
            expected_tokens.push(token);
        }

        let mut start = 0;
        let mut lexed_tokens = vec![];
        for token in $crate::lexer::tokenize($input) {
            lexed_tokens.push($crate::tests::TokenMock {
                kind: token.kind,
                len: token.len,
                text: std::borrow::Cow::Borrowed(&$input[start..start + token.len]),
            });
            start += token.len;
        }

        pretty_assertions::assert_eq!(lexed_tokens, expected_tokens);
    };
}

impl TokenMock<'static> {
    fn with_kind(kind: TokenKind, text: &'static str) -> TokenMock<'static> {
        TokenMock {
            kind,
            text: Cow::Borrowed(text),
            len: text.len(),
        }
    }

    pub fn comment(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Comment, text)
    }

    pub fn identifier(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Identifier, text)
    }

    pub fn int(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Int, text)
    }

    pub fn string(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::String, text)
    }

    pub fn indent(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Indent, text)
    }

    pub fn whitespace(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Whitespace, text)
    }

    pub fn operator(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Operator, text)
    }

    pub fn reserved(text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::ReservedKeyword, text)
    }

    pub fn error(kind: crate::token::LexerErrorKind, text: &'static str) -> TokenMock<'static> {
        Self::with_kind(TokenKind::Error(crate::token::LexerError { kind }), text)
    }
}
