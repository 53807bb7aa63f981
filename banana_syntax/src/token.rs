use std::fmt::Display;

use crate::position::Span;

/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Symbols
    LPAREN,
    RPAREN,
    LSQUARE,
    RSQUARE,
    LBRACE,
    RBRACE,
    COMMA,
    COLON,
    DOT,
    QUESTION,
    ARROW,
    // Arithmetic
    PLUS,
    MINUS,
    STAR,
    SLASH,
    CARET,
    // Assignment
    EQUAL,
    PLUS_EQUAL,
    MINUS_EQUAL,
    // Comparisons
    EQUAL_EQUAL,
    BANG_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,
    // Literals
    INT,
    FLOAT,
    STRING,
    IDENT,
    KEYWORD(Keyword),
    // Miscellaneous tokens
    NEWLINE,
    EOF,
}

impl TokenKind {
    pub fn from_char(c: char) -> Option<Self> {
        let token = match c {
            '(' => Self::LPAREN,
            ')' => Self::RPAREN,
            '[' => Self::LSQUARE,
            ']' => Self::RSQUARE,
            '{' => Self::LBRACE,
            '}' => Self::RBRACE,
            ',' => Self::COMMA,
            ':' => Self::COLON,
            '.' => Self::DOT,
            '?' => Self::QUESTION,
            '*' => Self::STAR,
            '^' => Self::CARET,
            ';' | '\n' => Self::NEWLINE,
            _ => return None,
        };
        Some(token)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::LPAREN => "'('",
            Self::RPAREN => "')'",
            Self::LSQUARE => "'['",
            Self::RSQUARE => "']'",
            Self::LBRACE => "'{'",
            Self::RBRACE => "'}'",
            Self::COMMA => "','",
            Self::COLON => "':'",
            Self::DOT => "'.'",
            Self::QUESTION => "'?'",
            Self::ARROW => "'=>'",
            Self::PLUS => "'+'",
            Self::MINUS => "'-'",
            Self::STAR => "'*'",
            Self::SLASH => "'/'",
            Self::CARET => "'^'",
            Self::EQUAL => "'='",
            Self::PLUS_EQUAL => "'+='",
            Self::MINUS_EQUAL => "'-='",
            Self::EQUAL_EQUAL => "'=='",
            Self::BANG_EQUAL => "'!='",
            Self::GREATER => "'>'",
            Self::GREATER_EQUAL => "'>='",
            Self::LESS => "'<'",
            Self::LESS_EQUAL => "'<='",
            Self::INT => "int",
            Self::FLOAT => "float",
            Self::STRING => "string",
            Self::IDENT => "identifier",
            Self::KEYWORD(kw) => return write!(f, "'{kw}'"),
            Self::NEWLINE => "newline",
            Self::EOF => "end of file",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Let,
    And,
    Or,
    Not,
    If,
    Then,
    Elif,
    Else,
    For,
    To,
    Step,
    Of,
    While,
    Func,
    End,
    Return,
    Continue,
    Break,
    Import,
    As,
    Public,
    Private,
    Switch,
    Case,
    Default,
    True,
    False,
    Null,
}

impl Keyword {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        let keyword = match kw {
            "let" => Self::Let,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "if" => Self::If,
            "then" => Self::Then,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "for" => Self::For,
            "to" => Self::To,
            "step" => Self::Step,
            "of" => Self::Of,
            "while" => Self::While,
            "func" => Self::Func,
            "end" => Self::End,
            "return" => Self::Return,
            "continue" => Self::Continue,
            "break" => Self::Break,
            "import" => Self::Import,
            "as" => Self::As,
            "public" => Self::Public,
            "private" => Self::Private,
            "switch" => Self::Switch,
            "case" => Self::Case,
            "default" => Self::Default,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Let => "let",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::If => "if",
            Self::Then => "then",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::For => "for",
            Self::To => "to",
            Self::Step => "step",
            Self::Of => "of",
            Self::While => "while",
            Self::Func => "func",
            Self::End => "end",
            Self::Return => "return",
            Self::Continue => "continue",
            Self::Break => "break",
            Self::Import => "import",
            Self::As => "as",
            Self::Public => "public",
            Self::Private => "private",
            Self::Switch => "switch",
            Self::Case => "case",
            Self::Default => "default",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Source text for identifiers, keywords and numbers; the unescaped
    /// contents for strings; empty for punctuation.
    pub lexeme: String,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            f.write_str(&self.lexeme)
        }
    }
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }

    pub fn matches(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::KEYWORD(keyword)
    }
}
