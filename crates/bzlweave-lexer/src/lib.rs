pub use lexer::{tokenize, tokenize_with_spans, Lexer, Span};
pub use token::{LexerError, LexerErrorKind, Token, TokenKind};

#[macro_use]
pub mod lexer;
#[cfg(test)]
mod tests;
pub mod token;
