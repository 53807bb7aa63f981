use std::fmt::Display;

use thiserror::Error;

use crate::position::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
    // Lex errors
    #[error("Illegal Character")]
    IllegalCharacter,
    #[error("Expected Character")]
    ExpectedCharacter,
    // Parse errors
    #[error("Invalid Syntax")]
    InvalidSyntax,
    // Runtime errors
    #[error("Name Error")]
    Name,
    #[error("Type Error")]
    Type,
    #[error("Too Many Arguments")]
    TooManyArguments,
    #[error("Too Few Arguments")]
    TooFewArguments,
    #[error("Division By Zero")]
    DivisionByZero,
    #[error("Illegal Operation")]
    IllegalOperation,
    #[error("Index Out Of Bounds")]
    IndexOutOfBounds,
    #[error("Import Error")]
    Import,
    #[error("Recursion Error")]
    Recursion,
    #[error("IO Error")]
    Io,
}

/// One call boundary an error travelled through on its way out.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub context: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    /// Innermost call first.
    pub trace: Vec<Frame>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            trace: Vec::default(),
        }
    }

    pub fn with_frame(mut self, context: &str, span: Span) -> Self {
        self.trace.push(Frame {
            context: context.to_string(),
            span,
        });
        self
    }

    /// The rendered error preceded by the chain of calls it escaped from.
    pub fn traceback(&self) -> String {
        if self.trace.is_empty() {
            return self.to_string();
        }
        let mut out = String::from("Traceback (most recent call last):\n");
        for frame in self.trace.iter().rev() {
            out.push_str(&format!("  {}, in {}\n", frame.span, frame.context));
        }
        out.push_str(&self.to_string());
        out
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}\n{}\n{}",
            self.kind,
            self.message,
            self.span,
            self.span.underline()
        )
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Position, SourceFile};

    fn whole_line(text: &str) -> Span {
        let file = SourceFile::new("main.bp", text);
        let start = Position::start_of(file);
        let mut end = start.clone();
        text.chars().for_each(|c| end.advance(c));
        Span::new(start, end)
    }

    #[test]
    fn renders_name_file_line_and_caret() {
        let err = Error::new(ErrorKind::Name, "'x' is not defined", whole_line("x"));
        assert_eq!(
            err.to_string(),
            "Name Error: 'x' is not defined\nFile main.bp, line 1\nx\n^"
        );
    }

    #[test]
    fn traceback_lists_outermost_call_first() {
        let err = Error::new(ErrorKind::DivisionByZero, "Division by zero", whole_line("f()"))
            .with_frame("inner", whole_line("g()"))
            .with_frame("outer", whole_line("f()"));
        let rendered = err.traceback();
        let outer = rendered.find("in outer").unwrap();
        let inner = rendered.find("in inner").unwrap();
        assert!(outer < inner);
        assert!(rendered.ends_with("Division By Zero: Division by zero\nFile main.bp, line 1\nf()\n^^^"));
    }
}
