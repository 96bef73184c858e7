use crate::ast_node;
use crate::syntax::ast::tokens::{Identifier, Int, Minus, StringLit};
use crate::syntax::ast::{support, AstChildren, AstNode, AstToken, SyntaxKind, SyntaxNode};

ast_node!(Root, RootNode);
impl Root {
    pub fn statements(&self) -> AstChildren<Stmt> {
        support::children(self.syntax())
    }
}

ast_node!(Assign, AssignNode);
impl Assign {
    pub fn target(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 0)
    }

    pub fn value(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 1)
    }
}

ast_node!(ExprStmt, ExprStmtNode);
impl ExprStmt {
    pub fn expr(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }
}

ast_node!(Def, DefNode);
impl Def {
    pub fn name(&self) -> Option<Identifier> {
        support::token(&self.syntax)
    }

    pub fn params(&self) -> AstChildren<Param> {
        match support::child::<ParamList>(&self.syntax) {
            Some(list) => support::children(&list.syntax),
            None => support::children(&self.syntax),
        }
    }

    pub fn body(&self) -> Option<Body> {
        support::child(&self.syntax)
    }
}

ast_node!(ParamList, ParamListNode);

ast_node!(Param, ParamNode);
impl Param {
    pub fn name(&self) -> Option<Identifier> {
        support::token(&self.syntax)
    }

    pub fn default(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }
}

ast_node!(Body, BodyNode);
impl Body {
    pub fn statements(&self) -> AstChildren<Stmt> {
        support::children(&self.syntax)
    }
}

ast_node!(Return, ReturnNode);
impl Return {
    pub fn value(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Assign(Assign),
    Expr(ExprStmt),
    Def(Def),
    Return(Return),
}

impl AstNode for Stmt {
    fn can_cast(kind: SyntaxKind) -> bool
    where
        Self: Sized,
    {
        kind.is_statement()
    }

    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized,
    {
        let res = match syntax.kind() {
            SyntaxKind::AssignNode => Stmt::Assign(Assign { syntax }),
            SyntaxKind::ExprStmtNode => Stmt::Expr(ExprStmt { syntax }),
            SyntaxKind::DefNode => Stmt::Def(Def { syntax }),
            SyntaxKind::ReturnNode => Stmt::Return(Return { syntax }),
            _ => return None,
        };

        Some(res)
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Stmt::Assign(it) => &it.syntax,
            Stmt::Expr(it) => &it.syntax,
            Stmt::Def(it) => &it.syntax,
            Stmt::Return(it) => &it.syntax,
        }
    }
}

ast_node!(Name, NameNode);
impl Name {
    pub fn identifier(&self) -> Option<Identifier> {
        support::token(&self.syntax)
    }

    pub fn text(&self) -> String {
        self.identifier()
            .map(|it| it.text().to_string())
            .unwrap_or_default()
    }
}

/// Value of a literal expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    String(String),
}

ast_node!(Literal, LiteralNode);
impl Literal {
    pub fn value(&self) -> Option<LiteralValue> {
        let token = self
            .syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|it| !it.kind().is_trivia() && it.kind() != SyntaxKind::Minus)?;

        let ret = match token.kind() {
            SyntaxKind::NoneKeyword => LiteralValue::None,
            SyntaxKind::TrueKeyword => LiteralValue::Bool(true),
            SyntaxKind::FalseKeyword => LiteralValue::Bool(false),
            SyntaxKind::Int => {
                let negative = support::token::<Minus>(&self.syntax).is_some();
                LiteralValue::Int(support::token::<Int>(&self.syntax)?.value(negative)?)
            }
            SyntaxKind::String => {
                LiteralValue::String(support::token::<StringLit>(&self.syntax)?.value().into_owned())
            }
            _ => return None,
        };

        Some(ret)
    }

    pub fn is_string(&self) -> bool {
        support::token::<StringLit>(&self.syntax).is_some()
    }
}

ast_node!(List, ListNode);
impl List {
    pub fn elements(&self) -> AstChildren<Expr> {
        support::children(&self.syntax)
    }
}

ast_node!(Dict, DictNode);
impl Dict {
    pub fn entries(&self) -> AstChildren<DictEntry> {
        support::children(&self.syntax)
    }
}

ast_node!(DictEntry, DictEntryNode);
impl DictEntry {
    pub fn key(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 0)
    }

    pub fn value(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 1)
    }
}

ast_node!(Call, CallNode);
impl Call {
    pub fn callee(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }

    pub fn args(&self) -> AstChildren<Arg> {
        match support::child::<ArgList>(&self.syntax) {
            Some(list) => support::children(&list.syntax),
            None => support::children(&self.syntax),
        }
    }

    /// Name of the callee when it is a plain name, e.g. `load`.
    pub fn callee_name(&self) -> Option<String> {
        match self.callee()? {
            Expr::Name(name) => Some(name.text()),
            _ => None,
        }
    }
}

ast_node!(ArgList, ArgListNode);

ast_node!(PositionalArg, ArgNode);
impl PositionalArg {
    pub fn value(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }
}

ast_node!(KeywordArg, KeywordArgNode);
impl KeywordArg {
    pub fn keyword(&self) -> Option<Identifier> {
        support::token(&self.syntax)
    }

    pub fn value(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arg {
    Positional(PositionalArg),
    Keyword(KeywordArg),
}

impl Arg {
    pub fn value(&self) -> Option<Expr> {
        match self {
            Arg::Positional(it) => it.value(),
            Arg::Keyword(it) => it.value(),
        }
    }
}

impl AstNode for Arg {
    fn can_cast(kind: SyntaxKind) -> bool
    where
        Self: Sized,
    {
        matches!(kind, SyntaxKind::ArgNode | SyntaxKind::KeywordArgNode)
    }

    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized,
    {
        let res = match syntax.kind() {
            SyntaxKind::ArgNode => Arg::Positional(PositionalArg { syntax }),
            SyntaxKind::KeywordArgNode => Arg::Keyword(KeywordArg { syntax }),
            _ => return None,
        };

        Some(res)
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Arg::Positional(it) => &it.syntax,
            Arg::Keyword(it) => &it.syntax,
        }
    }
}

ast_node!(Dot, DotNode);
impl Dot {
    pub fn receiver(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }

    pub fn attribute(&self) -> Option<Identifier> {
        support::token(&self.syntax)
    }
}

ast_node!(Index, IndexNode);
impl Index {
    pub fn base(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 0)
    }

    pub fn index(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 1)
    }
}

ast_node!(Binary, BinaryNode);
impl Binary {
    pub fn lhs(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 0)
    }

    pub fn rhs(&self) -> Option<Expr> {
        support::nth_child(&self.syntax, 1)
    }
}

ast_node!(Paren, ParenNode);
impl Paren {
    pub fn inner(&self) -> Option<Expr> {
        support::child(&self.syntax)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Name(Name),
    Literal(Literal),
    List(List),
    Dict(Dict),
    Call(Call),
    Dot(Dot),
    Index(Index),
    Binary(Binary),
    Paren(Paren),
}

impl AstNode for Expr {
    fn can_cast(kind: SyntaxKind) -> bool
    where
        Self: Sized,
    {
        kind.is_expression()
    }

    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized,
    {
        let res = match syntax.kind() {
            SyntaxKind::NameNode => Expr::Name(Name { syntax }),
            SyntaxKind::LiteralNode => Expr::Literal(Literal { syntax }),
            SyntaxKind::ListNode => Expr::List(List { syntax }),
            SyntaxKind::DictNode => Expr::Dict(Dict { syntax }),
            SyntaxKind::CallNode => Expr::Call(Call { syntax }),
            SyntaxKind::DotNode => Expr::Dot(Dot { syntax }),
            SyntaxKind::IndexNode => Expr::Index(Index { syntax }),
            SyntaxKind::BinaryNode => Expr::Binary(Binary { syntax }),
            SyntaxKind::ParenNode => Expr::Paren(Paren { syntax }),
            _ => return None,
        };

        Some(res)
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Expr::Name(it) => &it.syntax,
            Expr::Literal(it) => &it.syntax,
            Expr::List(it) => &it.syntax,
            Expr::Dict(it) => &it.syntax,
            Expr::Call(it) => &it.syntax,
            Expr::Dot(it) => &it.syntax,
            Expr::Index(it) => &it.syntax,
            Expr::Binary(it) => &it.syntax,
            Expr::Paren(it) => &it.syntax,
        }
    }
}

impl Expr {
    /// The string value when this expression is a string literal.
    pub fn as_string_literal(&self) -> Option<String> {
        match self {
            Expr::Literal(lit) => match lit.value()? {
                LiteralValue::String(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }
}
