// The AstNode / AstToken machinery follows Rust Analyzer
// (https://github.com/rust-analyzer/rust-analyzer), which is under MIT license.

use std::marker::PhantomData;

pub use crate::syntax::syntax_kind::SyntaxKind;
pub use crate::syntax::syntax_node::{SyntaxNode, SyntaxNodeChildren, SyntaxToken};

pub mod nodes;
pub mod tokens;

pub trait AstNode {
    fn can_cast(kind: SyntaxKind) -> bool
    where
        Self: Sized;

    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &SyntaxNode;
}

pub trait AstToken {
    fn can_cast(token: SyntaxKind) -> bool
    where
        Self: Sized;

    fn cast(syntax: SyntaxToken) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &SyntaxToken;

    fn text(&self) -> &str {
        self.syntax().text()
    }
}

/// An iterator over `SyntaxNode` children of a particular AST type.
#[derive(Debug, Clone)]
pub struct AstChildren<N> {
    inner: SyntaxNodeChildren,
    ph: PhantomData<N>,
}

impl<N> AstChildren<N> {
    fn new(parent: &SyntaxNode) -> Self {
        AstChildren {
            inner: parent.children(),
            ph: PhantomData,
        }
    }
}

impl<N: AstNode> Iterator for AstChildren<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        self.inner.find_map(N::cast)
    }
}

pub mod support {
    use super::{AstChildren, AstNode, AstToken, SyntaxNode};

    pub fn child<N: AstNode>(parent: &SyntaxNode) -> Option<N> {
        parent.children().find_map(N::cast)
    }

    pub fn nth_child<N: AstNode>(parent: &SyntaxNode, n: usize) -> Option<N> {
        parent.children().filter_map(N::cast).nth(n)
    }

    pub fn children<N: AstNode>(parent: &SyntaxNode) -> AstChildren<N> {
        AstChildren::new(parent)
    }

    pub fn token<T: AstToken>(parent: &SyntaxNode) -> Option<T> {
        parent
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find_map(T::cast)
    }
}

#[macro_export]
macro_rules! ast_node {
    ($ast:ident, $kind:ident) => {
        #[derive(PartialEq, Eq, Hash, Clone)]
        #[repr(transparent)]
        pub struct $ast {
            pub(crate) syntax: $crate::syntax::ast::SyntaxNode,
        }

        impl $crate::syntax::ast::AstNode for $ast {
            fn can_cast(kind: $crate::syntax::ast::SyntaxKind) -> bool
            where
                Self: Sized,
            {
                kind == $crate::syntax::ast::SyntaxKind::$kind
            }

            fn cast(syntax: $crate::syntax::ast::SyntaxNode) -> Option<Self>
            where
                Self: Sized,
            {
                if Self::can_cast(syntax.kind()) {
                    Some(Self { syntax })
                } else {
                    None
                }
            }

            fn syntax(&self) -> &$crate::syntax::ast::SyntaxNode {
                &self.syntax
            }
        }

        impl std::fmt::Debug for $ast {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ast))
                    .field("syntax", &self.syntax)
                    .finish()
            }
        }

        impl std::fmt::Display for $ast {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.syntax, f)
            }
        }
    };
}

#[macro_export]
macro_rules! ast_token {
    ($ast:ident, $kind:ident) => {
        #[derive(PartialEq, Eq, Hash, Clone)]
        #[repr(transparent)]
        pub struct $ast {
            pub(crate) syntax: $crate::syntax::ast::SyntaxToken,
        }

        impl $crate::syntax::ast::AstToken for $ast {
            fn can_cast(kind: $crate::syntax::ast::SyntaxKind) -> bool
            where
                Self: Sized,
            {
                kind == $crate::syntax::ast::SyntaxKind::$kind
            }

            fn cast(syntax: $crate::syntax::ast::SyntaxToken) -> Option<Self>
            where
                Self: Sized,
            {
                if Self::can_cast(syntax.kind()) {
                    Some(Self { syntax })
                } else {
                    None
                }
            }

            fn syntax(&self) -> &$crate::syntax::ast::SyntaxToken {
                &self.syntax
            }
        }

        impl std::fmt::Debug for $ast {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ast))
                    .field("syntax", &self.syntax)
                    .finish()
            }
        }
    };
}
