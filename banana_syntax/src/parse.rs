use std::rc::Rc;

use log::trace;

use crate::{
    ast::{
        AssignOp, BinOp, ElseCase, FuncDef, Ident, IfCase, Node, NodeKind, Param, SwitchCase,
        UnaryOp,
    },
    error::{Error, ErrorKind},
    position::Span,
    stack::ensure_sufficient_stack,
    token::{Keyword, Token, TokenKind},
};

const EXPECTED_EXPR: &str = "Expected int, float, string, identifier, 'let', 'if', 'for', \
'while', 'func', 'switch', 'import', 'not', '+', '-', '(', '[' or '{'";

#[derive(Debug)]
pub struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
    /// The error that ended the last statement list early, keyed by the
    /// token index the parser backtracked to.
    deferred: Option<(usize, Error)>,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with [`TokenKind::EOF`], as produced by the lexer.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            index: 0,
            deferred: None,
        }
    }

    /// Parses a whole program into a [`NodeKind::Block`]. The first error
    /// wins; there is no recovery.
    pub fn parse_all(mut self) -> Result<Node, Error> {
        let root = self.parse_statements()?;
        if !self.peek().matches(TokenKind::EOF) {
            return Err(self.expected(
                "Expected '+', '-', '*', '/', '^', '.', '(', a comparison, 'and', 'or' or newline",
            ));
        }
        trace!("Parsed {root:#?}");
        Ok(root)
    }

    pub fn parse_statements(&mut self) -> Result<Node, Error> {
        let start = self.peek().span.clone();
        self.skip_newlines();
        let mut statements = vec![];
        if !self.at_list_end() {
            statements.push(self.parse_statement()?);
        }
        loop {
            if self.skip_newlines() == 0 || self.at_list_end() {
                break;
            }
            let checkpoint = self.index;
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(e) => {
                    // Leave the tokens for whoever called us
                    self.index = checkpoint;
                    self.deferred = Some((checkpoint, e));
                    break;
                }
            }
        }
        Ok(Node::new(NodeKind::Block(statements), self.span_from(&start)))
    }

    pub fn parse_statement(&mut self) -> Result<Node, Error> {
        let start = self.peek().span.clone();
        if self.advance_if_keyword(Keyword::Return).is_some() {
            let value = if self.at_statement_end() {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            return Ok(Node::new(NodeKind::Return(value), self.span_from(&start)));
        }
        if self.advance_if_keyword(Keyword::Continue).is_some() {
            return Ok(Node::new(NodeKind::Continue, start));
        }
        if self.advance_if_keyword(Keyword::Break).is_some() {
            return Ok(Node::new(NodeKind::Break, start));
        }
        self.parse_expr()
    }

    pub fn parse_expr(&mut self) -> Result<Node, Error> {
        ensure_sufficient_stack(|| {
            if self.peek().is_keyword(Keyword::Let) {
                return self.parse_let(false);
            }
            self.parse_logical_or()
        })
    }

    fn parse_let(&mut self, is_public: bool) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let ident = self.parse_ident()?;
        self.advance_or_err(TokenKind::EQUAL, "Expected '='")?;
        let value = self.parse_expr()?;
        Ok(Node::new(
            NodeKind::Assign {
                ident,
                op: AssignOp::Set,
                value: Box::new(value),
                declare: true,
                is_public,
            },
            self.span_from(&start),
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Node, Error> {
        self.parse_binary(
            |t| t.is_keyword(Keyword::Or),
            Self::parse_logical_and,
            Self::parse_logical_and,
        )
    }

    fn parse_logical_and(&mut self) -> Result<Node, Error> {
        self.parse_binary(
            |t| t.is_keyword(Keyword::And),
            Self::parse_cmp,
            Self::parse_cmp,
        )
    }

    fn parse_cmp(&mut self) -> Result<Node, Error> {
        if self.peek().is_keyword(Keyword::Not) {
            let start = self.advance().span.clone();
            let operand = ensure_sufficient_stack(|| self.parse_cmp())?;
            return Ok(Node::new(
                NodeKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                self.span_from(&start),
            ));
        }
        self.parse_binary(
            |t| {
                matches!(
                    t.kind,
                    TokenKind::EQUAL_EQUAL
                        | TokenKind::BANG_EQUAL
                        | TokenKind::LESS
                        | TokenKind::GREATER
                        | TokenKind::LESS_EQUAL
                        | TokenKind::GREATER_EQUAL
                )
            },
            Self::parse_arith,
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> Result<Node, Error> {
        self.parse_binary(
            |t| matches!(t.kind, TokenKind::PLUS | TokenKind::MINUS),
            Self::parse_term,
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Node, Error> {
        self.parse_binary(
            |t| matches!(t.kind, TokenKind::STAR | TokenKind::SLASH),
            Self::parse_factor,
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Node, Error> {
        if let Some(t) = self.advance_if(|t| matches!(t.kind, TokenKind::PLUS | TokenKind::MINUS))
        {
            let start = t.span.clone();
            // Infallible unwrap as we are ensuring the right token kind above
            let op = UnaryOp::from_token(t.kind).expect("non-unary operators cannot be present here");
            let operand = ensure_sufficient_stack(|| self.parse_factor())?;
            return Ok(Node::new(
                NodeKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                self.span_from(&start),
            ));
        }
        self.parse_power()
    }

    /// Right associative: the exponent is parsed as a full factor.
    fn parse_power(&mut self) -> Result<Node, Error> {
        let lhs = self.parse_postfix()?;
        if self.advance_if(|t| t.matches(TokenKind::CARET)).is_none() {
            return Ok(lhs);
        }
        let rhs = ensure_sufficient_stack(|| self.parse_factor())?;
        let span = lhs.span.to(&rhs.span);
        Ok(Node::new(
            NodeKind::Binary {
                lhs: Box::new(lhs),
                op: BinOp::Caret,
                rhs: Box::new(rhs),
            },
            span,
        ))
    }

    fn parse_binary<F>(
        &mut self,
        is_op: F,
        parse_lhs: fn(&mut Self) -> Result<Node, Error>,
        parse_rhs: fn(&mut Self) -> Result<Node, Error>,
    ) -> Result<Node, Error>
    where
        F: Fn(&Token) -> bool,
    {
        let mut lhs = parse_lhs(self)?;
        while let Some(t) = self.advance_if(&is_op) {
            // Infallible unwrap as we are ensuring the right token kind above
            let op = BinOp::from_token(t.kind).expect("non-binary operators cannot be present here");
            let rhs = parse_rhs(self)?;
            let span = lhs.span.to(&rhs.span);
            lhs = Node::new(
                NodeKind::Binary {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Node, Error> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.advance_if(|t| t.matches(TokenKind::DOT)).is_some() {
                let member = self.parse_ident()?;
                let span = expr.span.to(&member.span);
                expr = Node::new(
                    NodeKind::Member {
                        target: Box::new(expr),
                        member,
                    },
                    span,
                );
            } else if self.advance_if(|t| t.matches(TokenKind::LPAREN)).is_some() {
                let args = self.parse_sequence(TokenKind::RPAREN, Self::parse_expr)?;
                let span = self.span_from(&expr.span);
                expr = Node::new(
                    NodeKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Node, Error> {
        let t = self.peek();
        let kind = match t.kind {
            TokenKind::INT | TokenKind::FLOAT => {
                self.advance();
                let n = t.lexeme.parse::<f64>().map_err(|_| {
                    Error::new(ErrorKind::InvalidSyntax, "Invalid number", t.span.clone())
                })?;
                NodeKind::Number(n)
            }
            TokenKind::STRING => {
                self.advance();
                NodeKind::Str(t.lexeme.clone())
            }
            TokenKind::KEYWORD(Keyword::True) => {
                self.advance();
                NodeKind::Boolean(true)
            }
            TokenKind::KEYWORD(Keyword::False) => {
                self.advance();
                NodeKind::Boolean(false)
            }
            TokenKind::KEYWORD(Keyword::Null) => {
                self.advance();
                NodeKind::Null
            }
            TokenKind::IDENT => return self.parse_identifier_expr(),
            TokenKind::LPAREN => return self.parse_group(),
            TokenKind::LSQUARE => return self.parse_list(),
            TokenKind::LBRACE => return self.parse_object(),
            TokenKind::KEYWORD(Keyword::If) => return self.parse_if(),
            TokenKind::KEYWORD(Keyword::For) => return self.parse_for(),
            TokenKind::KEYWORD(Keyword::While) => return self.parse_while(),
            TokenKind::KEYWORD(Keyword::Func) => return self.parse_function(false),
            TokenKind::KEYWORD(Keyword::Switch) => return self.parse_switch(),
            TokenKind::KEYWORD(Keyword::Import) => return self.parse_import(),
            TokenKind::KEYWORD(Keyword::Public) | TokenKind::KEYWORD(Keyword::Private) => {
                return self.parse_visibility()
            }
            _ => return Err(self.expected(EXPECTED_EXPR)),
        };
        Ok(Node::new(kind, t.span.clone()))
    }

    /// Plain access, `x = v`, `x += v`, or `a.b.c = v`. Dotted names that
    /// are not assigned are rewound and left to the postfix parser.
    fn parse_identifier_expr(&mut self) -> Result<Node, Error> {
        let ident = self.parse_ident()?;
        if let Some(op) = AssignOp::from_token(self.peek().kind) {
            self.advance();
            let value = self.parse_expr()?;
            let span = ident.span.to(&value.span);
            return Ok(Node::new(
                NodeKind::Assign {
                    ident,
                    op,
                    value: Box::new(value),
                    declare: false,
                    is_public: false,
                },
                span,
            ));
        }

        let checkpoint = self.index;
        let mut path = vec![ident.clone()];
        while self.peek().matches(TokenKind::DOT) && self.peek_nth(1).matches(TokenKind::IDENT) {
            self.advance();
            let t = self.advance();
            path.push(Ident {
                name: t.lexeme.clone(),
                span: t.span.clone(),
            });
        }
        if path.len() > 1 {
            if let Some(op) = AssignOp::from_token(self.peek().kind) {
                self.advance();
                let value = self.parse_expr()?;
                let span = ident.span.to(&value.span);
                return Ok(Node::new(
                    NodeKind::MemberAssign {
                        path,
                        op,
                        value: Box::new(value),
                    },
                    span,
                ));
            }
            self.index = checkpoint;
        }

        let span = ident.span.clone();
        Ok(Node::new(NodeKind::Access(ident), span))
    }

    fn parse_group(&mut self) -> Result<Node, Error> {
        // Consume the opening parenthesis
        self.advance();
        let expr = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN, "Expected ')'")?;
        Ok(expr)
    }

    fn parse_list(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let elements = self.parse_sequence(TokenKind::RSQUARE, Self::parse_expr)?;
        Ok(Node::new(NodeKind::List(elements), self.span_from(&start)))
    }

    fn parse_object(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let entries = self.parse_sequence(TokenKind::RBRACE, |p| {
            let t = p.peek();
            if !matches!(t.kind, TokenKind::IDENT | TokenKind::STRING) {
                return Err(p.expected("Expected identifier or string"));
            }
            p.advance();
            let key = Ident {
                name: t.lexeme.clone(),
                span: t.span.clone(),
            };
            p.advance_or_err(TokenKind::COLON, "Expected ':'")?;
            Ok((key, p.parse_expr()?))
        })?;
        Ok(Node::new(NodeKind::Object(entries), self.span_from(&start)))
    }

    /// Comma separated items up to `close`, which is consumed. Newlines
    /// between items are ignored.
    fn parse_sequence<T>(
        &mut self,
        close: TokenKind,
        mut parse_item: impl FnMut(&mut Self) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let mut items = vec![];
        self.skip_newlines();
        if self.advance_if(|t| t.matches(close)).is_some() {
            return Ok(items);
        }
        loop {
            items.push(parse_item(self)?);
            self.skip_newlines();
            if self.advance_if(|t| t.matches(TokenKind::COMMA)).is_none() {
                break;
            }
            self.skip_newlines();
        }
        self.advance_or_err(close, &format!("Expected ',' or {close}"))?;
        Ok(items)
    }

    fn parse_if(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let mut cases = vec![];
        let mut else_case = None;
        loop {
            let condition = self.parse_expr()?;
            self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
            if self.advance_if(|t| t.matches(TokenKind::NEWLINE)).is_some() {
                let body = self.parse_statements()?;
                cases.push(IfCase {
                    condition,
                    body,
                    is_block: true,
                });
                if self.advance_if_keyword(Keyword::End).is_some() {
                    break;
                }
                if self.advance_if_keyword(Keyword::Elif).is_some() {
                    continue;
                }
                if self.peek().is_keyword(Keyword::Else) {
                    else_case = Some(Box::new(self.parse_else()?));
                    break;
                }
                return Err(self.expected("Expected 'end', 'elif' or 'else'"));
            }
            let body = self.parse_statement()?;
            cases.push(IfCase {
                condition,
                body,
                is_block: false,
            });
            if self.advance_if_keyword(Keyword::Elif).is_some() {
                continue;
            }
            if self.peek().is_keyword(Keyword::Else) {
                else_case = Some(Box::new(self.parse_else()?));
            }
            break;
        }
        Ok(Node::new(
            NodeKind::If { cases, else_case },
            self.span_from(&start),
        ))
    }

    fn parse_else(&mut self) -> Result<ElseCase, Error> {
        // Consume the `else` keyword
        self.advance();
        let (body, is_block) = self.parse_body()?;
        Ok(ElseCase { body, is_block })
    }

    /// Either NEWLINE, statements, `end` (block form) or a single statement.
    fn parse_body(&mut self) -> Result<(Node, bool), Error> {
        if self.advance_if(|t| t.matches(TokenKind::NEWLINE)).is_some() {
            let body = self.parse_statements()?;
            self.advance_or_err(TokenKind::KEYWORD(Keyword::End), "Expected 'end'")?;
            Ok((body, true))
        } else {
            Ok((self.parse_statement()?, false))
        }
    }

    fn parse_for(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let ident = self.parse_ident()?;

        if self.advance_if(|t| t.matches(TokenKind::COMMA)).is_some() {
            let value = self.parse_ident()?;
            self.advance_or_err(TokenKind::KEYWORD(Keyword::Of), "Expected 'of'")?;
            let object = self.parse_expr()?;
            self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
            let (body, is_block) = self.parse_body()?;
            return Ok(Node::new(
                NodeKind::ForOfObject {
                    key: ident,
                    value,
                    object: Box::new(object),
                    body: Box::new(body),
                    is_block,
                },
                self.span_from(&start),
            ));
        }

        if self.advance_if_keyword(Keyword::Of).is_some() {
            let list = self.parse_expr()?;
            self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
            let (body, is_block) = self.parse_body()?;
            return Ok(Node::new(
                NodeKind::ForOfList {
                    ident,
                    list: Box::new(list),
                    body: Box::new(body),
                    is_block,
                },
                self.span_from(&start),
            ));
        }

        self.advance_or_err(TokenKind::EQUAL, "Expected '=', ',' or 'of'")?;
        let from = self.parse_expr()?;
        self.advance_or_err(TokenKind::KEYWORD(Keyword::To), "Expected 'to'")?;
        let to = self.parse_expr()?;
        let step = if self.advance_if_keyword(Keyword::Step).is_some() {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
        let (body, is_block) = self.parse_body()?;
        Ok(Node::new(
            NodeKind::ForCount {
                ident,
                start: Box::new(from),
                end: Box::new(to),
                step,
                body: Box::new(body),
                is_block,
            },
            self.span_from(&start),
        ))
    }

    fn parse_while(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let condition = self.parse_expr()?;
        self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
        let (body, is_block) = self.parse_body()?;
        Ok(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
                is_block,
            },
            self.span_from(&start),
        ))
    }

    fn parse_visibility(&mut self) -> Result<Node, Error> {
        let t = self.advance();
        let is_public = t.is_keyword(Keyword::Public);
        let mut node = match self.peek().kind {
            TokenKind::KEYWORD(Keyword::Let) => self.parse_let(is_public)?,
            TokenKind::KEYWORD(Keyword::Func) => self.parse_function(is_public)?,
            _ => return Err(self.expected("Expected 'let' or 'func'")),
        };
        node.span = t.span.to(&node.span);
        Ok(node)
    }

    fn parse_function(&mut self, is_public: bool) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let name = if self.peek().matches(TokenKind::IDENT) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let expected_paren = if name.is_some() {
            "Expected '('"
        } else {
            "Expected identifier or '('"
        };
        self.advance_or_err(TokenKind::LPAREN, expected_paren)?;

        let mut params: Vec<Param> = vec![];
        if self.peek().matches(TokenKind::IDENT) {
            loop {
                let ident = self.parse_ident()?;
                let optional = self.advance_if(|t| t.matches(TokenKind::QUESTION)).is_some();
                if !optional && params.iter().any(|p| p.optional) {
                    return Err(Error::new(
                        ErrorKind::InvalidSyntax,
                        "Expected '?': required parameters cannot follow optional ones",
                        ident.span,
                    ));
                }
                params.push(Param { ident, optional });
                if self.advance_if(|t| t.matches(TokenKind::COMMA)).is_none() {
                    break;
                }
            }
            self.advance_or_err(TokenKind::RPAREN, "Expected ',' or ')'")?;
        } else {
            self.advance_or_err(TokenKind::RPAREN, "Expected identifier or ')'")?;
        }

        let (body, auto_return) = if self.advance_if(|t| t.matches(TokenKind::ARROW)).is_some() {
            (self.parse_expr()?, true)
        } else if self.advance_if(|t| t.matches(TokenKind::NEWLINE)).is_some() {
            let body = self.parse_statements()?;
            self.advance_or_err(TokenKind::KEYWORD(Keyword::End), "Expected 'end'")?;
            (body, false)
        } else {
            return Err(self.expected("Expected '=>' or newline"));
        };

        Ok(Node::new(
            NodeKind::Func(Rc::new(FuncDef {
                name,
                params,
                body: Rc::new(body),
                auto_return,
                is_public,
            })),
            self.span_from(&start),
        ))
    }

    fn parse_switch(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let subject = self.parse_expr()?;
        if self.skip_newlines() == 0 {
            return Err(self.expected("Expected newline"));
        }

        let mut cases = vec![];
        let mut default: Option<Box<Node>> = None;
        loop {
            let t = self.peek();
            match t.kind {
                TokenKind::KEYWORD(Keyword::Case) => {
                    self.advance();
                    let pattern = self.parse_expr()?;
                    self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
                    let body = self.parse_case_body()?;
                    cases.push(SwitchCase { pattern, body });
                }
                TokenKind::KEYWORD(Keyword::Default) => {
                    if default.is_some() {
                        return Err(Error::new(
                            ErrorKind::InvalidSyntax,
                            "Expected 'case' or 'end': a switch can only have one 'default'",
                            t.span.clone(),
                        ));
                    }
                    self.advance();
                    self.advance_or_err(TokenKind::KEYWORD(Keyword::Then), "Expected 'then'")?;
                    default = Some(Box::new(self.parse_case_body()?));
                }
                TokenKind::KEYWORD(Keyword::End) => {
                    self.advance();
                    break;
                }
                _ => return Err(self.expected("Expected 'case', 'default' or 'end'")),
            }
            self.skip_newlines();
        }

        Ok(Node::new(
            NodeKind::Switch {
                subject: Box::new(subject),
                cases,
                default,
            },
            self.span_from(&start),
        ))
    }

    /// Case bodies run until the next `case`, `default` or `end`.
    fn parse_case_body(&mut self) -> Result<Node, Error> {
        if self.peek().matches(TokenKind::NEWLINE) {
            self.parse_statements()
        } else {
            self.parse_statement()
        }
    }

    fn parse_import(&mut self) -> Result<Node, Error> {
        let start = self.advance().span.clone();
        let lib = self.parse_expr()?;
        self.advance_or_err(TokenKind::KEYWORD(Keyword::As), "Expected 'as'")?;
        let alias = self.parse_ident()?;
        Ok(Node::new(
            NodeKind::Import {
                lib: Box::new(lib),
                alias,
            },
            self.span_from(&start),
        ))
    }

    fn parse_ident(&mut self) -> Result<Ident, Error> {
        let t = self.advance_or_err(TokenKind::IDENT, "Expected identifier")?;
        Ok(Ident {
            name: t.lexeme.clone(),
            span: t.span.clone(),
        })
    }

    fn peek(&self) -> &'a Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &'a Token {
        let tokens = self.tokens;
        tokens
            .get(self.index + n)
            .or(tokens.last())
            .expect("token stream must end with EOF")
    }

    fn advance(&mut self) -> &'a Token {
        let t = self.peek();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        t
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if cond(self.peek()) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn advance_if_keyword(&mut self, keyword: Keyword) -> Option<&'a Token> {
        self.advance_if(|t| t.is_keyword(keyword))
    }

    fn advance_or_err(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, Error> {
        self.advance_if(|t| t.matches(kind))
            .ok_or_else(|| self.expected(expected))
    }

    fn skip_newlines(&mut self) -> usize {
        let mut count = 0;
        while self.advance_if(|t| t.matches(TokenKind::NEWLINE)).is_some() {
            count += 1;
        }
        count
    }

    /// Tokens that close a statement list rather than start a statement.
    fn at_list_end(&self) -> bool {
        let t = self.peek();
        t.matches(TokenKind::EOF)
            || [Keyword::End, Keyword::Elif, Keyword::Else, Keyword::Case, Keyword::Default]
                .into_iter()
                .any(|kw| t.is_keyword(kw))
    }

    fn at_statement_end(&self) -> bool {
        self.peek().matches(TokenKind::NEWLINE) || self.at_list_end()
    }

    fn span_from(&self, start: &Span) -> Span {
        let last = &self.tokens[self.index.saturating_sub(1)];
        if last.span.end.index < start.start.index {
            return start.clone();
        }
        Span::new(start.start.clone(), last.span.end.clone())
    }

    /// An error at the current token, unless a statement list backtracked
    /// to exactly here, in which case its error is the more useful one.
    fn expected(&self, expected: &str) -> Error {
        if let Some((index, e)) = &self.deferred {
            if *index == self.index {
                return e.clone();
            }
        }
        Error::new(ErrorKind::InvalidSyntax, expected, self.peek().span.clone())
    }
}

pub fn parse(tokens: &[Token]) -> Result<Node, Error> {
    Parser::new(tokens).parse_all()
}
