use std::rc::Rc;

use banana_runtime::{
    environment::Env,
    host::{CapturedConsole, MemoryWorkspace},
    interpret::Interpreter,
    run,
};
use banana_syntax::error::{Error, ErrorKind};
use pretty_assertions::assert_eq;

const GREETER: &str = "public func f() => 1\n\
                       private func g() => 2\n\
                       func h() => 3\n\
                       public let greeting = \"hi \" + g()\n\
                       public func greet(name) => greeting + name";

fn run_in(workspace: MemoryWorkspace, source: &str) -> (Result<(), Error>, Vec<String>) {
    let console = CapturedConsole::default();
    let mut interpreter = Interpreter::new(Box::new(console.clone()), Rc::new(workspace));
    let result = run("main.bp", source, &mut interpreter, &Env::new()).map(|_| ());
    (result, console.lines())
}

#[test]
fn only_public_bindings_are_exported() {
    let workspace = MemoryWorkspace::default().with_file("lib/greeter.bp", GREETER);
    let (result, lines) = run_in(
        workspace,
        "import \"greeter\" as lib\nprint(lib.f())\nprint(lib.greet(\"bob\"))\nprint(lib.keys())",
    );
    result.unwrap();
    assert_eq!(lines, vec!["1", "hi 2bob", "[\"f\", \"greet\", \"greeting\"]"]);
}

#[test]
fn functions_keep_their_declared_visibility() {
    let workspace = MemoryWorkspace::default().with_file(
        "lib/aliases.bp",
        "public func f() => 1\nlet alias = f\npublic let anon = func() => 2",
    );
    let (result, lines) = run_in(
        workspace,
        "import \"aliases\" as lib\nprint(lib.alias())\nprint(lib.keys())",
    );
    result.unwrap();
    assert_eq!(lines, vec!["1", "[\"alias\", \"f\"]"]);
}

#[test]
fn private_members_are_not_defined() {
    for member in ["g", "h", "print"] {
        let workspace = MemoryWorkspace::default().with_file("lib/greeter.bp", GREETER);
        let (result, _) = run_in(workspace, &format!("import \"greeter\" as lib\nlib.{member}"));
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
        assert_eq!(err.message, format!("'{member}' is not defined"));
    }
}

#[test]
fn scripts_with_the_extension_resolve_from_the_workspace() {
    let workspace = MemoryWorkspace::default()
        .with_file("helpers.bp", "public let answer = 42")
        .with_file("nested/more.bp", "public let more = 1");
    let (result, lines) = run_in(
        workspace,
        "import \"helpers.bp\" as h\nimport \"./nested/more.bp\" as m\nprint(h.answer + m.more)",
    );
    result.unwrap();
    assert_eq!(lines, vec!["43"]);
}

#[test]
fn import_binds_privately_and_yields_null() {
    let workspace = MemoryWorkspace::default()
        .with_file("lib/inner.bp", "public let x = 1")
        .with_file("lib/outer.bp", "import \"inner\" as inner\npublic let y = inner.x + 1");
    let (result, lines) = run_in(
        workspace,
        "import \"outer\" as o\nprint(o.keys())\nprint(o.y)\nprint(import \"inner\" as again)",
    );
    result.unwrap();
    assert_eq!(lines, vec!["[\"y\"]", "2", "null"]);
}

#[test]
fn modules_run_in_their_own_environment() {
    let workspace = MemoryWorkspace::default().with_file("lib/probe.bp", "public let seen = is_null(secret)");
    let (result, _) = run_in(workspace, "let secret = 1\nimport \"probe\" as p");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Import);
    assert!(err.message.contains("'secret' is not defined"));
}

#[test]
fn missing_library_reports_the_path() {
    let (result, _) = run_in(MemoryWorkspace::default(), "import \"nope\" as n");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Import);
    assert!(err
        .message
        .starts_with("Failed to load script \"/workspace/lib/nope.bp\"\n"));
}

#[test]
fn failures_inside_the_module_keep_their_rendering() {
    let workspace = MemoryWorkspace::default().with_file("lib/broken.bp", "public let x = 1 / 0");
    let (result, _) = run_in(workspace, "let before = 1\nimport \"broken\" as b");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Import);
    assert_eq!(
        err.message,
        "Failed to finish executing script \"/workspace/lib/broken.bp\"\n\
         Division By Zero: Division by zero\nFile broken, line 1\npublic let x = 1 / 0\n                   ^"
    );
    assert_eq!(err.span.start.line, 1);
}

#[test]
fn syntax_errors_in_modules_are_import_errors() {
    let workspace = MemoryWorkspace::default().with_file("lib/bad.bp", "let = 1");
    let (result, _) = run_in(workspace, "import \"bad\" as b");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Import);
    assert!(err.message.contains("Invalid Syntax"));
}

#[test]
fn circular_imports_are_rejected() {
    let workspace = MemoryWorkspace::default()
        .with_file("a.bp", "import \"b.bp\" as b\npublic let a = 1")
        .with_file("b.bp", "import \"a.bp\" as a\npublic let b = 1");
    let (result, _) = run_in(workspace, "import \"a.bp\" as a");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Import);
    assert!(err.message.contains("Circular import of script \"/workspace/a.bp\""));
}

#[test]
fn lib_name_must_be_a_string() {
    let (result, _) = run_in(MemoryWorkspace::default(), "import 5 as five");
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Type);
    assert_eq!(err.message, "Lib name must be string");
}

#[test]
fn module_level_return_still_exports() {
    let workspace = MemoryWorkspace::default()
        .with_file("lib/early.bp", "public let x = 1\nreturn null\npublic let y = 2");
    let (result, lines) = run_in(workspace, "import \"early\" as e\nprint(e.keys())");
    result.unwrap();
    assert_eq!(lines, vec!["[\"x\"]"]);
}
