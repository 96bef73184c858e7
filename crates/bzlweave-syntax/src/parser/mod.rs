use bzlweave_lexer::LexerError;
use thiserror::Error;

pub mod parser;

pub use parser::{parse, Parse};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_no}: {kind}")]
pub struct ParseError {
    pub line_no: usize,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unsupported syntax: {0}")]
    Unsupported(String),
    #[error("only a single target is allowed in an assignment")]
    MultipleAssignmentTargets,
    #[error("cannot assign to this expression")]
    InvalidAssignmentTarget,
    #[error("'return' outside of a function")]
    ReturnOutsideFunction,
    #[error("unexpected indentation")]
    UnexpectedIndent,
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },
    #[error("integer literal {0} is out of range")]
    IntegerOutOfRange(String),
    #[error("{0}")]
    Lexer(LexerError),
}

pub type ParserResult<T> = Result<T, ParseError>;
