use std::{fmt::Display, rc::Rc};

use crate::{
    position::Span,
    token::{Keyword, TokenKind},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::KEYWORD(Keyword::Not) => Self::Not,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Caret => "^",
            Self::EqualEqual => "==",
            Self::BangEqual => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

impl BinOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::STAR => Self::Star,
            TokenKind::SLASH => Self::Slash,
            TokenKind::CARET => Self::Caret,
            TokenKind::EQUAL_EQUAL => Self::EqualEqual,
            TokenKind::BANG_EQUAL => Self::BangEqual,
            TokenKind::LESS => Self::Less,
            TokenKind::GREATER => Self::Greater,
            TokenKind::LESS_EQUAL => Self::LessEqual,
            TokenKind::GREATER_EQUAL => Self::GreaterEqual,
            TokenKind::KEYWORD(Keyword::And) => Self::And,
            TokenKind::KEYWORD(Keyword::Or) => Self::Or,
            _ => return None,
        };
        Some(op)
    }
}

/// `=`, `+=` or `-=`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Subtract,
}

impl AssignOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::EQUAL => Self::Set,
            TokenKind::PLUS_EQUAL => Self::Add,
            TokenKind::MINUS_EQUAL => Self::Subtract,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ident: Ident,
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDef {
    pub name: Option<Ident>,
    pub params: Vec<Param>,
    pub body: Rc<Node>,
    /// `=>` bodies return their value without an explicit `return`
    pub auto_return: bool,
    pub is_public: bool,
}

/// One `if`/`elif` arm. Block-form arms evaluate to null.
#[derive(Clone, Debug, PartialEq)]
pub struct IfCase {
    pub condition: Node,
    pub body: Node,
    pub is_block: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElseCase {
    pub body: Node,
    pub is_block: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub pattern: Node,
    pub body: Node,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Number(f64),
    Str(String),
    Boolean(bool),
    Null,
    List(Vec<Node>),
    Object(Vec<(Ident, Node)>),
    Access(Ident),
    /// `target.member`; the member is a name, never an evaluated expression
    Member {
        target: Box<Node>,
        member: Ident,
    },
    /// `let x = v` declares, `x = v` updates an existing binding
    Assign {
        ident: Ident,
        op: AssignOp,
        value: Box<Node>,
        declare: bool,
        is_public: bool,
    },
    /// `a.b.c = v`
    MemberAssign {
        path: Vec<Ident>,
        op: AssignOp,
        value: Box<Node>,
    },
    Binary {
        lhs: Box<Node>,
        op: BinOp,
        rhs: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    If {
        cases: Vec<IfCase>,
        else_case: Option<Box<ElseCase>>,
    },
    Switch {
        subject: Box<Node>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Node>>,
    },
    ForCount {
        ident: Ident,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        is_block: bool,
    },
    ForOfList {
        ident: Ident,
        list: Box<Node>,
        body: Box<Node>,
        is_block: bool,
    },
    ForOfObject {
        key: Ident,
        value: Ident,
        object: Box<Node>,
        body: Box<Node>,
        is_block: bool,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
        is_block: bool,
    },
    Func(Rc<FuncDef>),
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Import {
        lib: Box<Node>,
        alias: Ident,
    },
    Return(Option<Box<Node>>),
    Break,
    Continue,
    /// A statement list; evaluates to the list of its statement values
    Block(Vec<Node>),
}
