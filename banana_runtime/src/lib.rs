pub mod environment;
pub mod error;
pub mod host;
pub mod interpret;
pub mod members;
pub mod module;
pub mod ops;
pub mod stdlib;
pub mod types;

use std::{cell::RefCell, rc::Rc};

use banana_syntax::{error::Error, parse_file, position::SourceFile};
use environment::Env;
use interpret::Interpreter;
use log::trace;
use types::Value;

/// Lexes, parses and evaluates `source` in `env`. `name` is what
/// diagnostics call the file.
pub fn run(
    name: &str,
    source: &str,
    interpreter: &mut Interpreter,
    env: &Rc<RefCell<Env>>,
) -> Result<Value, Error> {
    let file = SourceFile::new(name, source);
    let root = parse_file(&file)?;
    trace!("Interpreting {name}");
    interpreter.interpret(&root, env)
}
