pub mod parser;
pub mod syntax;

pub use parser::{parse, Parse, ParseError, ParseErrorKind, ParserResult};
pub use syntax::line_index::LineIndex;
