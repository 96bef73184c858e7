use crate::syntax::syntax_kind::SyntaxKind;

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum BzlLanguage {}

impl rowan::Language for BzlLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
        SyntaxKind::from_raw(raw.0)
    }

    fn kind_to_raw(kind: SyntaxKind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<BzlLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<BzlLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<BzlLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<BzlLanguage>;
