pub mod ast;
pub mod error;
pub mod lex;
pub mod parse;
pub mod position;
pub mod stack;
pub mod token;

use std::rc::Rc;

use log::trace;

use crate::{ast::Node, error::Error, position::SourceFile};

/// Lexes and parses `file` into the root statement block.
pub fn parse_file(file: &Rc<SourceFile>) -> Result<Node, Error> {
    trace!("Lexing {}", file.name);
    let tokens = lex::tokenize(file)?;
    trace!("Parsing {} tokens", tokens.len());
    parse::parse(&tokens)
}
