//! `import`: runs a script in a fresh root environment and collects its
//! public top-level bindings into an object.

use banana_syntax::{parse_file, position::SourceFile};
use log::info;

use crate::{environment::Env, error::Fault, interpret::Interpreter, types::Object};

pub(crate) fn load(interpreter: &mut Interpreter, lib: &str) -> Result<Object, Fault> {
    let workspace = interpreter.workspace();
    let path = workspace.resolve_lib(lib);
    if interpreter.is_importing(&path) {
        return Err(Fault::Import(format!(
            "Circular import of script \"{}\"",
            path.display()
        )));
    }
    let source = workspace.read(&path).map_err(|e| {
        Fault::Import(format!("Failed to load script \"{}\"\n{e}", path.display()))
    })?;

    info!("Importing {lib} from {}", path.display());
    let file = SourceFile::new(lib, &source);
    let env = Env::new();
    parse_file(&file)
        .and_then(|root| interpreter.interpret_module(path.clone(), lib, &root, &env))
        .map_err(|e| {
            Fault::Import(format!(
                "Failed to finish executing script \"{}\"\n{}",
                path.display(),
                e.traceback()
            ))
        })?;

    let exports = env.borrow().public_symbols();
    info!("Imported {} public symbols from {lib}", exports.len());
    Ok(Object::new(exports))
}
