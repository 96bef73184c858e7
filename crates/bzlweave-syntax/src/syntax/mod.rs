pub mod ast;
pub mod line_index;
pub mod syntax_kind;
pub mod syntax_node;

pub use syntax_kind::SyntaxKind;
pub use syntax_node::{BzlLanguage, SyntaxElement, SyntaxNode, SyntaxToken};
