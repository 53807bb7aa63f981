use std::{fmt::Display, rc::Rc};

/// A named piece of source text. Shared by every position that points into it.
#[derive(Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: &str, text: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            text: text.to_string(),
        })
    }

    pub fn line(&self, line: usize) -> &str {
        self.text.split('\n').nth(line).unwrap_or_default()
    }
}

/// A cursor into a [`SourceFile`]. Lines and columns are zero-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
    pub file: Rc<SourceFile>,
}

impl Position {
    pub fn start_of(file: Rc<SourceFile>) -> Self {
        Self {
            index: 0,
            line: 0,
            column: 0,
            file,
        }
    }

    /// Moves past `c`, which must be the character at the current index.
    pub fn advance(&mut self, c: char) {
        self.index += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The span covering `self` through `other`.
    pub fn to(&self, other: &Span) -> Self {
        Self {
            start: self.start.clone(),
            end: other.end.clone(),
        }
    }

    pub fn file(&self) -> &SourceFile {
        &self.start.file
    }

    /// The source lines covered by this span, each followed by a caret line
    /// underlining the covered columns.
    pub fn underline(&self) -> String {
        let mut out = String::new();
        for line in self.start.line..=self.end.line.max(self.start.line) {
            let text = self.file().line(line).trim_end_matches('\r');
            let width = text.chars().count();
            let from = if line == self.start.line {
                self.start.column.min(width)
            } else {
                0
            };
            let to = if line == self.end.line {
                self.end.column.min(width)
            } else {
                width
            };
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
            out.push('\n');
            out.push_str(&" ".repeat(from));
            out.push_str(&"^".repeat(to.saturating_sub(from).max(1)));
        }
        out
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "File {}, line {}", self.file().name, self.start.line + 1)
    }
}
