use thiserror::Error;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte length of token
    pub len: usize,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    pub fn is_end_of_input(&self) -> bool {
        self.kind.is_end_of_input()
    }

    pub fn get_fixed_str(&self) -> Option<&'static str> {
        self.kind.get_fixed_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Error(LexerError),

    CloseBrace,
    CloseBracket,
    CloseParenthesis,
    Colon,
    Comma,
    Comment,
    DefKeyword,
    Dot,
    EndOfInput,
    Equals,
    FalseKeyword,
    Identifier,
    Indent,
    Int,
    Minus,
    Newline,
    NoneKeyword,
    OpenBrace,
    OpenBracket,
    OpenParenthesis,
    Operator,
    Plus,
    ReservedKeyword,
    ReturnKeyword,
    String,
    TrueKeyword,
    Whitespace,
}

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[error("{kind}")]
pub struct LexerError {
    pub kind: LexerErrorKind,
}

#[derive(Error, Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum LexerErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("backslash not followed by a newline")]
    StrayBackslash,
}

impl TokenKind {
    /// Tokens the parser skips over inside a statement.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, TokenKind::EndOfInput)
    }

    pub fn get_fixed_str(&self) -> Option<&'static str> {
        let ret = match self {
            TokenKind::CloseBrace => "}",
            TokenKind::CloseBracket => "]",
            TokenKind::CloseParenthesis => ")",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::DefKeyword => "def",
            TokenKind::Dot => ".",
            TokenKind::Equals => "=",
            TokenKind::FalseKeyword => "False",
            TokenKind::Minus => "-",
            TokenKind::Newline => "\n",
            TokenKind::NoneKeyword => "None",
            TokenKind::OpenBrace => "{",
            TokenKind::OpenBracket => "[",
            TokenKind::OpenParenthesis => "(",
            TokenKind::Plus => "+",
            TokenKind::ReturnKeyword => "return",
            TokenKind::TrueKeyword => "True",
            _ => return None,
        };

        Some(ret)
    }
}

pub fn make_fixed_str_token(kind: TokenKind) -> Token {
    Token {
        kind,
        len: kind.get_fixed_str().map_or(0, str::len),
    }
}

#[macro_export]
macro_rules! T {
    ['('] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::OpenParenthesis) } ;
    [')'] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::CloseParenthesis) } ;
    ['['] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::OpenBracket) } ;
    [']'] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::CloseBracket) } ;
    ['{'] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::OpenBrace) } ;
    ['}'] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::CloseBrace) } ;
    [=] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::Equals) } ;
    [+] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::Plus) } ;
    [-] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::Minus) } ;
    [:] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::Colon) } ;
    [,] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::Comma) } ;
    [.] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::Dot) } ;
    [def] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::DefKeyword) } ;
    [return] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::ReturnKeyword) } ;
    [None] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::NoneKeyword) } ;
    [True] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::TrueKeyword) } ;
    [False] => { $crate::token::make_fixed_str_token($crate::token::TokenKind::FalseKeyword) } ;
}
