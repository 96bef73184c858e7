use bzlweave_lexer::{tokenize, LexerError, TokenKind};
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder};

use crate::parser::{ParseError, ParseErrorKind, ParserResult};
use crate::syntax::ast::nodes::Root;
use crate::syntax::ast::tokens::parse_int;
use crate::syntax::syntax_kind::{syntax_kind_for_token_kind, SyntaxKind};
use crate::syntax::syntax_node::SyntaxNode;

/// Result of parsing a description file: a lossless tree plus the errors found.
///
/// Parsing stops at the first error; the unparsed remainder of the input is kept in an
/// `ErrorNode` so that the tree still covers the whole text.
#[derive(Debug, Clone)]
pub struct Parse {
    green: GreenNode,
    errors: Vec<ParseError>,
}

impl Parse {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn root(&self) -> Root {
        Root {
            syntax: self.syntax(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// The typed root, or the first parse error.
    pub fn ok(self) -> ParserResult<Root> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(Root {
                syntax: SyntaxNode::new_root(self.green),
            }),
        }
    }
}

struct Lexeme<'text> {
    kind: SyntaxKind,
    text: &'text str,
    error: Option<LexerError>,
}

struct Parser<'text> {
    builder: GreenNodeBuilder<'static>,
    lexemes: Vec<Lexeme<'text>>,
    pos: usize,
    /// Line of the next lexeme to be bumped
    line: usize,
    /// Number of nodes opened below the root
    depth: usize,
    in_def: bool,
}

impl<'text> Parser<'text> {
    fn new(input: &'text str) -> Parser<'text> {
        let mut start = 0;
        let lexemes = tokenize(input)
            .into_iter()
            .map(|token| {
                let text = &input[start..start + token.len];
                start += token.len;
                Lexeme {
                    kind: syntax_kind_for_token_kind(token.kind),
                    text,
                    error: match token.kind {
                        TokenKind::Error(e) => Some(e),
                        _ => None,
                    },
                }
            })
            .collect();

        Parser {
            builder: GreenNodeBuilder::new(),
            lexemes,
            pos: 0,
            line: 1,
            depth: 0,
            in_def: false,
        }
    }

    /// Index of the `n`th significant lexeme from the current position.
    fn nth_index(&self, n: usize) -> Option<usize> {
        self.lexemes
            .iter()
            .enumerate()
            .skip(self.pos)
            .filter(|(_, l)| !l.kind.is_trivia())
            .nth(n)
            .map(|(idx, _)| idx)
    }

    fn nth(&self, n: usize) -> Option<SyntaxKind> {
        self.nth_index(n).map(|idx| self.lexemes[idx].kind)
    }

    fn peek(&self) -> Option<SyntaxKind> {
        self.nth(0)
    }

    fn peek_text(&self) -> &'text str {
        self.nth_index(0).map_or("", |idx| self.lexemes[idx].text)
    }

    fn eat_trivia(&mut self) {
        while self
            .lexemes
            .get(self.pos)
            .map(|l| l.kind.is_trivia())
            .unwrap_or(false)
        {
            self.bump_raw();
        }
    }

    fn bump_raw(&mut self) {
        if let Some(lexeme) = self.lexemes.get(self.pos) {
            self.line += lexeme.text.matches('\n').count();
            self.builder.token(lexeme.kind.into(), lexeme.text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        self.eat_trivia();
        self.bump_raw();
    }

    fn allow(&mut self, kind: SyntaxKind) -> bool {
        if self.peek() == Some(kind) {
            self.bump();
            return true;
        }

        false
    }

    fn expect(&mut self, kind: SyntaxKind, expected: &str) -> ParserResult<()> {
        if self.allow(kind) {
            return Ok(());
        }

        Err(self.unexpected(expected))
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.eat_trivia();
        self.builder.checkpoint()
    }

    fn start_node(&mut self, kind: SyntaxKind) {
        self.eat_trivia();
        self.builder.start_node(kind.into());
        self.depth += 1;
    }

    fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
        self.depth += 1;
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
        self.depth -= 1;
    }

    /// Line of the next significant lexeme.
    fn current_line(&self) -> usize {
        let end = self.nth_index(0).unwrap_or(self.lexemes.len());
        self.line
            + self.lexemes[self.pos..end]
                .iter()
                .map(|l| l.text.matches('\n').count())
                .sum::<usize>()
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            line_no: self.current_line(),
            kind,
        }
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            None => String::from("end of input"),
            Some(SyntaxKind::Newline) => String::from("newline"),
            Some(SyntaxKind::Indent) => String::from("indentation"),
            Some(_) => format!("`{}`", self.peek_text()),
        }
    }

    /// Error for a lexeme that does not fit the grammar at this point. Constructs that are
    /// outside the language get a dedicated message.
    fn unexpected(&self, expected: &str) -> ParseError {
        let text = self.peek_text();
        let kind = match self.peek() {
            Some(SyntaxKind::LexError) => {
                match self.nth_index(0).and_then(|i| self.lexemes[i].error) {
                    Some(e) => ParseErrorKind::Lexer(e),
                    None => ParseErrorKind::Unsupported(format!("`{text}`")),
                }
            }
            Some(SyntaxKind::ReservedKeyword) => match text {
                "for" => ParseErrorKind::Unsupported(String::from("comprehensions")),
                "if" | "else" => {
                    ParseErrorKind::Unsupported(String::from("conditional expressions"))
                }
                "lambda" => ParseErrorKind::Unsupported(String::from("lambda expressions")),
                _ => ParseErrorKind::Unsupported(format!("`{text}`")),
            },
            Some(SyntaxKind::Operator) if is_augmented_assignment(text) => {
                ParseErrorKind::Unsupported(String::from("augmented assignment"))
            }
            Some(SyntaxKind::Operator) | Some(SyntaxKind::Minus) => {
                ParseErrorKind::Unsupported(format!("operator `{text}`"))
            }
            _ => ParseErrorKind::Unexpected {
                expected: expected.to_string(),
                found: self.describe_current(),
            },
        };

        self.error(kind)
    }

    fn parse_file(&mut self) -> ParserResult<()> {
        loop {
            match self.peek() {
                None => break,
                Some(SyntaxKind::Newline) => self.bump(),
                Some(SyntaxKind::Indent) => {
                    return Err(self.error(ParseErrorKind::UnexpectedIndent));
                }
                Some(_) => {
                    self.parse_statement()?;
                    self.expect_end_of_statement()?;
                }
            }
        }

        // Trailing trivia
        self.eat_trivia();
        Ok(())
    }

    fn expect_end_of_statement(&mut self) -> ParserResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(SyntaxKind::Newline) => {
                self.bump();
                Ok(())
            }
            Some(SyntaxKind::Comma) => Err(self.error(ParseErrorKind::Unsupported(
                String::from("tuples"),
            ))),
            Some(SyntaxKind::Colon) => Err(self.error(ParseErrorKind::Unsupported(
                String::from("annotations"),
            ))),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn parse_statement(&mut self) -> ParserResult<()> {
        match self.peek() {
            Some(SyntaxKind::DefKeyword) if self.in_def => Err(self.error(
                ParseErrorKind::Unsupported(String::from("nested function definitions")),
            )),
            Some(SyntaxKind::DefKeyword) => self.parse_def(),
            Some(SyntaxKind::ReturnKeyword) if !self.in_def => {
                Err(self.error(ParseErrorKind::ReturnOutsideFunction))
            }
            Some(SyntaxKind::ReturnKeyword) => self.parse_return(),
            Some(SyntaxKind::ReservedKeyword) => {
                let text = self.peek_text();
                Err(self.error(ParseErrorKind::Unsupported(format!("`{text}` statements"))))
            }
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_simple_statement(&mut self) -> ParserResult<()> {
        let checkpoint = self.checkpoint();
        let target = self.parse_expr()?;

        if self.peek() != Some(SyntaxKind::Equals) {
            self.start_node_at(checkpoint, SyntaxKind::ExprStmtNode);
            self.finish_node();
            return Ok(());
        }

        if !target.is_assignable() {
            return Err(self.error(ParseErrorKind::InvalidAssignmentTarget));
        }

        self.start_node_at(checkpoint, SyntaxKind::AssignNode);
        self.bump();
        self.parse_expr()?;
        if self.peek() == Some(SyntaxKind::Equals) {
            return Err(self.error(ParseErrorKind::MultipleAssignmentTargets));
        }
        self.finish_node();

        Ok(())
    }

    fn parse_return(&mut self) -> ParserResult<()> {
        self.start_node(SyntaxKind::ReturnNode);
        self.bump();
        if !matches!(self.peek(), None | Some(SyntaxKind::Newline)) {
            self.parse_expr()?;
        }
        self.finish_node();
        Ok(())
    }

    fn parse_def(&mut self) -> ParserResult<()> {
        self.start_node(SyntaxKind::DefNode);
        self.bump();
        self.expect(SyntaxKind::Identifier, "function name")?;

        self.start_node(SyntaxKind::ParamListNode);
        self.expect(SyntaxKind::OpenParenthesis, "`(`")?;
        loop {
            match self.peek() {
                Some(SyntaxKind::CloseParenthesis) => break,
                Some(SyntaxKind::Operator) if self.peek_text().starts_with('*') => {
                    return Err(self.error(ParseErrorKind::Unsupported(String::from(
                        "variadic parameters",
                    ))));
                }
                _ => {}
            }

            self.start_node(SyntaxKind::ParamNode);
            self.expect(SyntaxKind::Identifier, "parameter name")?;
            if self.allow(SyntaxKind::Equals) {
                self.parse_expr()?;
            }
            self.finish_node();

            if !self.allow(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::CloseParenthesis, "`)`")?;
        self.finish_node();

        self.expect(SyntaxKind::Colon, "`:`")?;

        self.start_node(SyntaxKind::BodyNode);
        self.in_def = true;
        let body = self.parse_def_body();
        self.in_def = false;
        body?;
        self.finish_node();

        self.finish_node();
        Ok(())
    }

    fn parse_def_body(&mut self) -> ParserResult<()> {
        if self.peek() != Some(SyntaxKind::Newline) {
            // def f(): return 1
            return self.parse_statement();
        }

        while self.peek() == Some(SyntaxKind::Newline) {
            self.bump();
        }
        if self.peek() != Some(SyntaxKind::Indent) {
            return Err(self.unexpected("an indented block"));
        }

        loop {
            self.expect(SyntaxKind::Indent, "indentation")?;
            self.parse_statement()?;

            match self.peek() {
                None => break,
                Some(SyntaxKind::Newline) => {}
                _ => return Err(self.unexpected("end of statement")),
            }

            if !self.next_line_is_indented() {
                // The newline that ends the def is consumed by the caller
                break;
            }
            while self.peek() == Some(SyntaxKind::Newline) {
                self.bump();
            }
        }

        Ok(())
    }

    fn next_line_is_indented(&self) -> bool {
        self.lexemes[self.pos..]
            .iter()
            .map(|l| l.kind)
            .find(|kind| !kind.is_trivia() && *kind != SyntaxKind::Newline)
            == Some(SyntaxKind::Indent)
    }

    /// Parses an expression and returns the kind of node it produced.
    fn parse_expr(&mut self) -> ParserResult<SyntaxKind> {
        let checkpoint = self.checkpoint();
        let mut kind = self.parse_postfix()?;

        while self.peek() == Some(SyntaxKind::Plus) {
            self.start_node_at(checkpoint, SyntaxKind::BinaryNode);
            self.bump();
            self.parse_postfix()?;
            self.finish_node();
            kind = SyntaxKind::BinaryNode;
        }

        Ok(kind)
    }

    fn parse_postfix(&mut self) -> ParserResult<SyntaxKind> {
        let checkpoint = self.checkpoint();
        let mut kind = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(SyntaxKind::OpenParenthesis) => {
                    self.start_node_at(checkpoint, SyntaxKind::CallNode);
                    self.parse_arg_list()?;
                    self.finish_node();
                    kind = SyntaxKind::CallNode;
                }
                Some(SyntaxKind::Dot) => {
                    self.start_node_at(checkpoint, SyntaxKind::DotNode);
                    self.bump();
                    if self.peek() == Some(SyntaxKind::Int) {
                        return Err(self.error(ParseErrorKind::Unsupported(String::from(
                            "floating point literals",
                        ))));
                    }
                    self.expect(SyntaxKind::Identifier, "attribute name")?;
                    self.finish_node();
                    kind = SyntaxKind::DotNode;
                }
                Some(SyntaxKind::OpenBracket) => {
                    self.start_node_at(checkpoint, SyntaxKind::IndexNode);
                    self.bump();
                    if self.peek() == Some(SyntaxKind::Colon) {
                        return Err(self.error(ParseErrorKind::Unsupported(String::from("slices"))));
                    }
                    self.parse_expr()?;
                    match self.peek() {
                        Some(SyntaxKind::Colon) => {
                            return Err(
                                self.error(ParseErrorKind::Unsupported(String::from("slices")))
                            )
                        }
                        Some(SyntaxKind::Comma) => {
                            return Err(
                                self.error(ParseErrorKind::Unsupported(String::from("tuples")))
                            )
                        }
                        _ => {}
                    }
                    self.expect(SyntaxKind::CloseBracket, "`]`")?;
                    self.finish_node();
                    kind = SyntaxKind::IndexNode;
                }
                _ => break,
            }
        }

        Ok(kind)
    }

    fn parse_int_literal(&mut self, negative: bool) -> ParserResult<()> {
        let text = self.peek_text();
        if parse_int(text, negative).is_none() {
            let kind = if text.bytes().all(|b| b.is_ascii_digit()) {
                let sign = if negative { "-" } else { "" };
                ParseErrorKind::IntegerOutOfRange(format!("{sign}{text}"))
            } else {
                ParseErrorKind::Unsupported(format!("numeric literal `{text}`"))
            };
            return Err(self.error(kind));
        }
        self.bump();
        Ok(())
    }

    fn parse_primary(&mut self) -> ParserResult<SyntaxKind> {
        let kind = match self.peek() {
            Some(SyntaxKind::Identifier) => {
                self.start_node(SyntaxKind::NameNode);
                self.bump();
                SyntaxKind::NameNode
            }
            Some(SyntaxKind::Int) => {
                self.start_node(SyntaxKind::LiteralNode);
                self.parse_int_literal(false)?;
                SyntaxKind::LiteralNode
            }
            Some(SyntaxKind::Minus) if self.nth(1) == Some(SyntaxKind::Int) => {
                self.start_node(SyntaxKind::LiteralNode);
                self.bump();
                self.parse_int_literal(true)?;
                SyntaxKind::LiteralNode
            }
            Some(SyntaxKind::Minus) => {
                return Err(self.error(ParseErrorKind::Unsupported(String::from(
                    "unary operator `-`",
                ))));
            }
            Some(
                SyntaxKind::String
                | SyntaxKind::NoneKeyword
                | SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword,
            ) => {
                self.start_node(SyntaxKind::LiteralNode);
                self.bump();
                if self.peek() == Some(SyntaxKind::String) {
                    return Err(self.error(ParseErrorKind::Unsupported(String::from(
                        "implicit string concatenation",
                    ))));
                }
                SyntaxKind::LiteralNode
            }
            Some(SyntaxKind::OpenBracket) => {
                self.start_node(SyntaxKind::ListNode);
                self.bump();
                loop {
                    if self.peek() == Some(SyntaxKind::CloseBracket) {
                        break;
                    }
                    self.parse_expr()?;
                    if !self.allow(SyntaxKind::Comma) {
                        break;
                    }
                }
                self.expect(SyntaxKind::CloseBracket, "`,` or `]`")?;
                SyntaxKind::ListNode
            }
            Some(SyntaxKind::OpenBrace) => {
                self.start_node(SyntaxKind::DictNode);
                self.bump();
                loop {
                    if self.peek() == Some(SyntaxKind::CloseBrace) {
                        break;
                    }
                    self.start_node(SyntaxKind::DictEntryNode);
                    self.parse_expr()?;
                    self.expect(SyntaxKind::Colon, "`:`")?;
                    self.parse_expr()?;
                    self.finish_node();
                    if !self.allow(SyntaxKind::Comma) {
                        break;
                    }
                }
                self.expect(SyntaxKind::CloseBrace, "`,` or `}`")?;
                SyntaxKind::DictNode
            }
            Some(SyntaxKind::OpenParenthesis) => {
                self.start_node(SyntaxKind::ParenNode);
                self.bump();
                if self.peek() == Some(SyntaxKind::CloseParenthesis) {
                    return Err(self.error(ParseErrorKind::Unsupported(String::from("tuples"))));
                }
                self.parse_expr()?;
                if self.peek() == Some(SyntaxKind::Comma) {
                    return Err(self.error(ParseErrorKind::Unsupported(String::from("tuples"))));
                }
                self.expect(SyntaxKind::CloseParenthesis, "`)`")?;
                SyntaxKind::ParenNode
            }
            Some(SyntaxKind::Operator) if self.peek_text().starts_with('*') => {
                return Err(self.error(ParseErrorKind::Unsupported(String::from(
                    "argument unpacking",
                ))));
            }
            _ => return Err(self.unexpected("an expression")),
        };

        self.finish_node();
        Ok(kind)
    }

    fn parse_arg_list(&mut self) -> ParserResult<()> {
        self.start_node(SyntaxKind::ArgListNode);
        self.bump();

        let mut seen_keyword = false;
        loop {
            if self.peek() == Some(SyntaxKind::CloseParenthesis) {
                break;
            }

            if self.peek() == Some(SyntaxKind::Identifier) && self.nth(1) == Some(SyntaxKind::Equals)
            {
                self.start_node(SyntaxKind::KeywordArgNode);
                self.bump();
                self.bump();
                self.parse_expr()?;
                self.finish_node();
                seen_keyword = true;
            } else {
                if seen_keyword {
                    return Err(self.error(ParseErrorKind::Unsupported(String::from(
                        "positional argument after keyword argument",
                    ))));
                }
                self.start_node(SyntaxKind::ArgNode);
                self.parse_expr()?;
                self.finish_node();
            }

            if !self.allow(SyntaxKind::Comma) {
                break;
            }
        }

        self.expect(SyntaxKind::CloseParenthesis, "`,` or `)`")?;
        self.finish_node();
        Ok(())
    }

    fn parse(mut self) -> Parse {
        let mut errors = vec![];

        self.builder.start_node(SyntaxKind::RootNode.into());
        if let Err(e) = self.parse_file() {
            errors.push(e);

            self.builder.start_node(SyntaxKind::ErrorNode.into());
            while self.pos < self.lexemes.len() {
                self.bump_raw();
            }
            self.builder.finish_node();

            while self.depth > 0 {
                self.finish_node();
            }
        }
        self.builder.finish_node();

        Parse {
            green: self.builder.finish(),
            errors,
        }
    }
}

fn is_augmented_assignment(op: &str) -> bool {
    op.ends_with('=') && !matches!(op, "==" | "!=" | "<=" | ">=")
}

pub fn parse(input: &str) -> Parse {
    Parser::new(input).parse()
}
