use std::ops::Range;

use muncher::Muncher;
use phf::{self, phf_map};

use crate::token::{LexerError, LexerErrorKind, Token, TokenKind};

pub type Span = Range<usize>;

/// Thin wrapper around [`Muncher`] that keeps a byte offset, since token lengths are measured
/// in bytes while the muncher counts characters.
struct Cursor<'input> {
    muncher: Muncher<'input>,
    pos: usize,
}

impl<'input> Cursor<'input> {
    fn new(input: &'input str) -> Self {
        Cursor {
            muncher: Muncher::new(input),
            pos: 0,
        }
    }

    fn nth(&self, n: usize) -> Option<char> {
        let mut ret = None;
        for _ in 0..=n {
            ret = self.muncher.peek().copied();
        }
        self.muncher.reset_peek();
        ret
    }

    fn first(&self) -> Option<char> {
        self.nth(0)
    }

    fn second(&self) -> Option<char> {
        self.nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        self.muncher.reset_peek();
        let c = self.muncher.eat()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.first() == Some(expected) {
            self.bump();
            return true;
        }
        false
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.first() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "def" => TokenKind::DefKeyword,
    "return" => TokenKind::ReturnKeyword,
    "None" => TokenKind::NoneKeyword,
    "True" => TokenKind::TrueKeyword,
    "False" => TokenKind::FalseKeyword,

    "and" => TokenKind::ReservedKeyword,
    "as" => TokenKind::ReservedKeyword,
    "assert" => TokenKind::ReservedKeyword,
    "async" => TokenKind::ReservedKeyword,
    "await" => TokenKind::ReservedKeyword,
    "break" => TokenKind::ReservedKeyword,
    "class" => TokenKind::ReservedKeyword,
    "continue" => TokenKind::ReservedKeyword,
    "del" => TokenKind::ReservedKeyword,
    "elif" => TokenKind::ReservedKeyword,
    "else" => TokenKind::ReservedKeyword,
    "except" => TokenKind::ReservedKeyword,
    "finally" => TokenKind::ReservedKeyword,
    "for" => TokenKind::ReservedKeyword,
    "from" => TokenKind::ReservedKeyword,
    "global" => TokenKind::ReservedKeyword,
    "if" => TokenKind::ReservedKeyword,
    "import" => TokenKind::ReservedKeyword,
    "in" => TokenKind::ReservedKeyword,
    "is" => TokenKind::ReservedKeyword,
    "lambda" => TokenKind::ReservedKeyword,
    "nonlocal" => TokenKind::ReservedKeyword,
    "not" => TokenKind::ReservedKeyword,
    "or" => TokenKind::ReservedKeyword,
    "pass" => TokenKind::ReservedKeyword,
    "raise" => TokenKind::ReservedKeyword,
    "try" => TokenKind::ReservedKeyword,
    "while" => TokenKind::ReservedKeyword,
    "with" => TokenKind::ReservedKeyword,
    "yield" => TokenKind::ReservedKeyword,
};

pub fn is_space_or_tab(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\x0c')
}

fn is_identifier_first_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '*' | '/' | '%' | '<' | '>' | '!' | '&' | '|' | '^' | '~' | '@' | ';'
    )
}

#[inline]
fn scan_comment(start: usize, m: &mut Cursor) -> Token {
    m.eat_while(|c| c != '\n');

    Token {
        len: m.pos - start,
        kind: TokenKind::Comment,
    }
}

/// Scans a string literal whose opening quote (and any `r` prefix) has already been consumed.
#[inline]
fn scan_string(start: usize, m: &mut Cursor, quote_char: char) -> Token {
    let triple = m.first() == Some(quote_char) && m.second() == Some(quote_char);
    if triple {
        m.bump();
        m.bump();
    }

    let unterminated = |m: &Cursor| Token {
        len: m.pos - start,
        kind: TokenKind::Error(LexerError {
            kind: LexerErrorKind::UnterminatedString,
        }),
    };

    loop {
        match m.first() {
            None => return unterminated(m),
            // Only triple-quoted strings may span lines
            Some('\n') if !triple => return unterminated(m),
            Some('\\') => {
                // A backslash always protects the following character, raw or not
                m.bump();
                if m.bump().is_none() {
                    return unterminated(m);
                }
            }
            Some(c) if c == quote_char => {
                m.bump();
                if !triple {
                    break;
                }
                if m.first() == Some(quote_char) && m.second() == Some(quote_char) {
                    m.bump();
                    m.bump();
                    break;
                }
            }
            Some(_) => {
                m.bump();
            }
        }
    }

    Token {
        kind: TokenKind::String,
        len: m.pos - start,
    }
}

#[inline]
fn scan_operator(start: usize, first: char, m: &mut Cursor) -> Token {
    match (first, m.first()) {
        // '**', '//', '<<', '>>'
        (a, Some(b)) if a == b && matches!(a, '*' | '/' | '<' | '>') => {
            m.bump();
            m.bump_if('=');
        }
        (a, Some('=')) if a != ';' && a != '~' && a != '@' => {
            m.bump();
        }
        _ => {}
    }

    Token {
        kind: TokenKind::Operator,
        len: m.pos - start,
    }
}

pub struct Lexer<'input> {
    input: &'input str,
    cursor: Cursor<'input>,
    pub(crate) token: Token,
    skip_trivia: bool,
    /// Nesting level of open brackets; newlines inside brackets are not significant
    depth: usize,
    at_line_start: bool,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str, skip_trivia: bool) -> Lexer<'input> {
        let mut ret = Lexer {
            input,
            cursor: Cursor::new(input),
            token: Token {
                kind: TokenKind::EndOfInput,
                len: 0,
            },
            skip_trivia,
            depth: 0,
            at_line_start: true,
        };
        ret.advance();
        ret
    }

    /// Byte offset just past the current token.
    pub fn pos(&self) -> usize {
        self.cursor.pos
    }

    pub fn input(&self) -> &'input str {
        self.input
    }

    pub fn token(&self) -> Token {
        self.token.clone()
    }

    pub fn advance(&mut self) {
        self.advance_internal();

        while self.skip_trivia && self.token.is_trivia() {
            self.advance_internal();
        }
    }

    fn single_char_token(&self, kind: TokenKind) -> Token {
        Token { kind, len: 1 }
    }

    fn advance_internal(&mut self) {
        let start = self.cursor.pos;
        let at_line_start = std::mem::replace(&mut self.at_line_start, false);

        let c = match self.cursor.bump() {
            Some(c) => c,
            None => {
                self.token = Token {
                    kind: TokenKind::EndOfInput,
                    len: 0,
                };
                return;
            }
        };

        if is_space_or_tab(c) {
            self.cursor.eat_while(is_space_or_tab);

            // Leading whitespace is only significant on a line that holds a statement
            let significant = at_line_start
                && self.depth == 0
                && !matches!(self.cursor.first(), None | Some('\n') | Some('#'));

            self.token = Token {
                kind: if significant {
                    TokenKind::Indent
                } else {
                    TokenKind::Whitespace
                },
                len: self.cursor.pos - start,
            };
            return;
        }

        self.token = match c {
            '#' => scan_comment(start, &mut self.cursor),
            '\n' if self.depth > 0 => self.single_char_token(TokenKind::Whitespace),
            '\n' => {
                self.at_line_start = true;
                self.single_char_token(TokenKind::Newline)
            }
            '\\' => {
                if self.cursor.bump_if('\n') {
                    Token {
                        kind: TokenKind::Whitespace,
                        len: 2,
                    }
                } else if self.cursor.first() == Some('\r') && self.cursor.second() == Some('\n') {
                    self.cursor.bump();
                    self.cursor.bump();
                    Token {
                        kind: TokenKind::Whitespace,
                        len: 3,
                    }
                } else {
                    self.single_char_token(TokenKind::Error(LexerError {
                        kind: LexerErrorKind::StrayBackslash,
                    }))
                }
            }
            '(' | '[' | '{' => {
                self.depth += 1;
                self.single_char_token(match c {
                    '(' => TokenKind::OpenParenthesis,
                    '[' => TokenKind::OpenBracket,
                    _ => TokenKind::OpenBrace,
                })
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                self.single_char_token(match c {
                    ')' => TokenKind::CloseParenthesis,
                    ']' => TokenKind::CloseBracket,
                    _ => TokenKind::CloseBrace,
                })
            }
            ',' => self.single_char_token(TokenKind::Comma),
            ':' => self.single_char_token(TokenKind::Colon),
            '.' => self.single_char_token(TokenKind::Dot),
            '=' => {
                if self.cursor.bump_if('=') {
                    Token {
                        kind: TokenKind::Operator,
                        len: 2,
                    }
                } else {
                    self.single_char_token(TokenKind::Equals)
                }
            }
            '+' => {
                if self.cursor.bump_if('=') {
                    Token {
                        kind: TokenKind::Operator,
                        len: 2,
                    }
                } else {
                    self.single_char_token(TokenKind::Plus)
                }
            }
            '-' => {
                if self.cursor.bump_if('=') || self.cursor.bump_if('>') {
                    Token {
                        kind: TokenKind::Operator,
                        len: 2,
                    }
                } else {
                    self.single_char_token(TokenKind::Minus)
                }
            }
            '\'' | '"' => scan_string(start, &mut self.cursor, c),
            'r' | 'R' if matches!(self.cursor.first(), Some('\'' | '"')) => {
                let quote_char = self.cursor.bump().unwrap_or('"');
                scan_string(start, &mut self.cursor, quote_char)
            }
            c if c.is_ascii_digit() => {
                self.cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
                Token {
                    kind: TokenKind::Int,
                    len: self.cursor.pos - start,
                }
            }
            c if is_identifier_first_char(c) => {
                self.cursor.eat_while(is_identifier_char);
                let text = &self.input[start..self.cursor.pos];
                Token {
                    kind: KEYWORDS
                        .get(text)
                        .copied()
                        .unwrap_or(TokenKind::Identifier),
                    len: self.cursor.pos - start,
                }
            }
            c if is_operator_char(c) => scan_operator(start, c, &mut self.cursor),
            c => Token {
                kind: TokenKind::Error(LexerError {
                    kind: LexerErrorKind::UnexpectedCharacter,
                }),
                len: c.len_utf8(),
            },
        };
    }
}

pub fn tokenize(data: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(data, false);

    let mut ret = vec![];

    while lexer.token().kind != TokenKind::EndOfInput {
        ret.push(lexer.token());
        lexer.advance();
    }

    ret
}

/// Tokenizes `data` and pairs every token with its byte range.
pub fn tokenize_with_spans(data: &str) -> Vec<(Token, Span)> {
    let mut offset = 0;
    tokenize(data)
        .into_iter()
        .map(|token| {
            let span = offset..offset + token.len;
            offset = span.end;
            (token, span)
        })
        .collect()
}
