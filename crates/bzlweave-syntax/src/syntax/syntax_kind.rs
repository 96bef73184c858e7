use bzlweave_lexer::token::TokenKind;

pub fn syntax_kind_for_token_kind(token_kind: TokenKind) -> SyntaxKind {
    match token_kind {
        TokenKind::Error(_) => SyntaxKind::LexError,
        TokenKind::CloseBrace => SyntaxKind::CloseBrace,
        TokenKind::CloseBracket => SyntaxKind::CloseBracket,
        TokenKind::CloseParenthesis => SyntaxKind::CloseParenthesis,
        TokenKind::Colon => SyntaxKind::Colon,
        TokenKind::Comma => SyntaxKind::Comma,
        TokenKind::Comment => SyntaxKind::Comment,
        TokenKind::DefKeyword => SyntaxKind::DefKeyword,
        TokenKind::Dot => SyntaxKind::Dot,
        TokenKind::EndOfInput => SyntaxKind::EndOfInput,
        TokenKind::Equals => SyntaxKind::Equals,
        TokenKind::FalseKeyword => SyntaxKind::FalseKeyword,
        TokenKind::Identifier => SyntaxKind::Identifier,
        TokenKind::Indent => SyntaxKind::Indent,
        TokenKind::Int => SyntaxKind::Int,
        TokenKind::Minus => SyntaxKind::Minus,
        TokenKind::Newline => SyntaxKind::Newline,
        TokenKind::NoneKeyword => SyntaxKind::NoneKeyword,
        TokenKind::OpenBrace => SyntaxKind::OpenBrace,
        TokenKind::OpenBracket => SyntaxKind::OpenBracket,
        TokenKind::OpenParenthesis => SyntaxKind::OpenParenthesis,
        TokenKind::Operator => SyntaxKind::Operator,
        TokenKind::Plus => SyntaxKind::Plus,
        TokenKind::ReservedKeyword => SyntaxKind::ReservedKeyword,
        TokenKind::ReturnKeyword => SyntaxKind::ReturnKeyword,
        TokenKind::String => SyntaxKind::String,
        TokenKind::TrueKeyword => SyntaxKind::TrueKeyword,
        TokenKind::Whitespace => SyntaxKind::Whitespace,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // Tokens
    LexError = 0,
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
    Whitespace, // << last token

    // Statements
    AssignNode,
    ExprStmtNode,
    DefNode,
    ReturnNode,

    // Helper nodes of a def
    ParamListNode,
    ParamNode,
    BodyNode,

    // Expressions
    NameNode,
    LiteralNode,
    ListNode,
    DictNode,
    DictEntryNode,
    CallNode,
    ArgListNode,
    ArgNode,
    KeywordArgNode,
    DotNode,
    IndexNode,
    BinaryNode,
    ParenNode,

    // Holds the unparsed remainder of the input after the first error
    ErrorNode,

    // Must be the last entry in the enum
    RootNode,
}

impl SyntaxKind {
    pub fn from_raw(raw: u16) -> SyntaxKind {
        assert!(raw <= SyntaxKind::RootNode as u16);
        // SAFETY: the enum is `repr(u16)` with contiguous discriminants starting at zero
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw) }
    }

    pub fn is_token(&self) -> bool {
        (*self as u16) <= (SyntaxKind::Whitespace as u16)
    }

    pub fn is_node(&self) -> bool {
        !self.is_token()
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, SyntaxKind::Whitespace | SyntaxKind::Comment)
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            SyntaxKind::AssignNode
                | SyntaxKind::ExprStmtNode
                | SyntaxKind::DefNode
                | SyntaxKind::ReturnNode
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            SyntaxKind::NameNode
                | SyntaxKind::LiteralNode
                | SyntaxKind::ListNode
                | SyntaxKind::DictNode
                | SyntaxKind::CallNode
                | SyntaxKind::DotNode
                | SyntaxKind::IndexNode
                | SyntaxKind::BinaryNode
                | SyntaxKind::ParenNode
        )
    }

    /// Only names and subscripts denote a storage location.
    pub fn is_assignable(&self) -> bool {
        matches!(self, SyntaxKind::NameNode | SyntaxKind::IndexNode)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

#[cfg(test)]
mod test {
    use super::SyntaxKind;

    #[test]
    fn raw_round_trip() {
        for raw in 0..=SyntaxKind::RootNode as u16 {
            assert_eq!(SyntaxKind::from_raw(raw) as u16, raw);
        }
        assert!(SyntaxKind::Whitespace.is_token());
        assert!(SyntaxKind::AssignNode.is_node());
    }
}
