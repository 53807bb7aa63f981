use std::fmt::Display;

use banana_syntax::{
    error::{Error, ErrorKind},
    position::Span,
};
use thiserror::Error;

use crate::types::Value;

/// Everything that can unwind an evaluation. Only `Error` is a failure; the
/// rest are control signals consumed by calls and loops.
#[derive(Debug)]
pub enum Exception {
    Error(Error),
    Return(Value),
    Break,
    Continue,
}

impl Display for Exception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Return(value) => write!(f, "return {value}"),
            Self::Break => f.write_str("break"),
            Self::Continue => f.write_str("continue"),
        }
    }
}

impl From<Error> for Exception {
    fn from(e: Error) -> Self {
        Self::Error(e)
    }
}

/// A runtime failure raised away from the syntax tree, by an operator or a
/// built-in. The evaluator pins it to a source span with [`Fault::at`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Fault {
    #[error("'{0}' is not defined")]
    Undefined(String),
    #[error("{0}")]
    Type(String),
    #[error("Can't do this operation with the type {0}")]
    IllegalOperation(&'static str),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Division by null")]
    DivisionByNull,
    #[error("Element at index {index} could not be {action} because index is out of bounds")]
    IndexOutOfBounds { index: f64, action: &'static str },
    #[error("{count} too many args passed into '{name}'")]
    TooManyArguments { name: String, count: usize },
    #[error("{count} too few args passed into '{name}'")]
    TooFewArguments { name: String, count: usize },
    #[error("'{0}' outside of a loop")]
    OutsideLoop(&'static str),
    #[error("Maximum call depth of {0} exceeded")]
    Recursion(usize),
    #[error("{0}")]
    Import(String),
    #[error("{0}")]
    Io(String),
}

impl Fault {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Undefined(_) => ErrorKind::Name,
            Self::Type(_) => ErrorKind::Type,
            Self::IllegalOperation(_) => ErrorKind::IllegalOperation,
            Self::DivisionByZero | Self::DivisionByNull => ErrorKind::DivisionByZero,
            Self::IndexOutOfBounds { .. } => ErrorKind::IndexOutOfBounds,
            Self::TooManyArguments { .. } => ErrorKind::TooManyArguments,
            Self::TooFewArguments { .. } => ErrorKind::TooFewArguments,
            Self::OutsideLoop(_) => ErrorKind::InvalidSyntax,
            Self::Recursion(_) => ErrorKind::Recursion,
            Self::Import(_) => ErrorKind::Import,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn into_error(self, span: &Span) -> Error {
        Error::new(self.kind(), self.to_string(), span.clone())
    }

    pub fn at(self, span: &Span) -> Exception {
        Exception::Error(self.into_error(span))
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub fn io(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
