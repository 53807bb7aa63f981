use std::rc::Rc;

use banana_runtime::{
    environment::Env,
    host::{CapturedConsole, MemoryWorkspace},
    interpret::{Interpreter, MAX_CALL_DEPTH},
    run,
    types::Value,
};
use banana_syntax::{
    error::{Error, ErrorKind},
    parse_file,
    position::SourceFile,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

struct Session {
    console: CapturedConsole,
    workspace: MemoryWorkspace,
}

impl Session {
    fn new() -> Self {
        Self::with_workspace(MemoryWorkspace::default())
    }

    fn with_workspace(workspace: MemoryWorkspace) -> Self {
        Self {
            console: CapturedConsole::default(),
            workspace,
        }
    }

    fn run(&self, source: &str) -> Result<Value, Error> {
        let mut interpreter = Interpreter::new(
            Box::new(self.console.clone()),
            Rc::new(self.workspace.clone()),
        );
        run("main.bp", source, &mut interpreter, &Env::new())
    }

    /// Runs `source` and returns everything it printed.
    fn output(&self, source: &str) -> Vec<String> {
        if let Err(e) = self.run(source) {
            panic!("script failed:\n{}", e.traceback());
        }
        self.console.lines()
    }
}

fn output(source: &str) -> Vec<String> {
    Session::new().output(source)
}

fn error(source: &str) -> Error {
    Session::new()
        .run(source)
        .expect_err("script should have failed")
}

#[rstest]
#[case("print(2 ^ 3 ^ 2)", "512")]
#[case("print((2 ^ 3) ^ 2)", "64")]
#[case("print(1 + 2 * 3 - 4 / 2)", "5")]
#[case("print(-3 + 5)", "2")]
#[case("print(1 + 1 == 2 and not 3 < 2)", "true")]
#[case("print(5 + null)", "5")]
#[case("print(null / 4)", "0")]
#[case("print(\"ab\" * 3)", "ababab")]
#[case("print(\"n: \" + null + true)", "n: nulltrue")]
#[case("print([1] + 2)", "[1, 2]")]
#[case("print([1] * [2])", "[1, 2]")]
#[case("print([1, 2, 3] - 0)", "[2, 3]")]
#[case("print([1, 2, 3] / -1)", "3")]
#[case("print([1, \"a\"] == [1, \"a\"])", "true")]
#[case("print(1 == true)", "false")]
fn operators(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(output(source), vec![expected]);
}

#[rstest]
#[case("print(1 / 0)")]
#[case("print(null / 0)")]
#[case("print(3 / null)")]
fn division_by_zero(#[case] source: &str) {
    assert_eq!(error(source).kind, ErrorKind::DivisionByZero);
}

#[rstest]
#[case("print(\"a\" - 1)", ErrorKind::IllegalOperation)]
#[case("print(true * 2)", ErrorKind::IllegalOperation)]
#[case("print(\"ab\" * -1)", ErrorKind::IllegalOperation)]
#[case("let s = \"ab\" * 1000000000000000", ErrorKind::IllegalOperation)]
#[case("print([1] / 5)", ErrorKind::IndexOutOfBounds)]
#[case("print(\"a\" < 1)", ErrorKind::IllegalOperation)]
fn operator_failures(#[case] source: &str, #[case] kind: ErrorKind) {
    assert_eq!(error(source).kind, kind);
}

#[test]
fn declare_then_update() {
    let source = "let x = 5\nx = x + 1\nprint(x)\nx += 4\nx -= 1\nprint(x)";
    assert_eq!(output(source), vec!["6", "9"]);
}

#[test]
fn redeclaring_replaces_binding_and_visibility() {
    let workspace = MemoryWorkspace::default().with_file(
        "lib/vis.bp",
        "public let a = 1\nlet a = \"a\"\nprivate let b = 1\npublic let b = 2",
    );
    let session = Session::with_workspace(workspace);
    let lines = session.output("import \"vis\" as vis\nprint(vis.keys())\nprint(vis.b)");
    assert_eq!(lines, vec!["[\"b\"]", "2"]);
}

#[test]
fn closures_made_in_a_loop_share_the_counter() {
    let source = "let fs = []\n\
                  for i = 0 to 3 then fs.append(func() => i)\n\
                  print([fs.get(0)(), fs.get(1)(), fs.get(2)()])";
    assert_eq!(output(source), vec!["[3, 3, 3]"]);
}

#[test]
fn closures_capture_their_defining_scope() {
    let source = "func counter()\n\
                  let n = {count: 0}\n\
                  return func() => n.count += 1\n\
                  end\n\
                  let next = counter()\n\
                  next()\n\
                  next()\n\
                  print(next())";
    assert_eq!(output(source), vec!["3"]);
}

#[test]
fn objects_alias_through_assignment() {
    let source = "let a = {}\nlet b = a\nb.x = 5\nprint(a.x)\nlet l = [1]\nlet m = l\nm.append(2)\nprint(l)";
    assert_eq!(output(source), vec!["5", "[1, 2]"]);
}

#[test]
fn arithmetic_builds_new_lists() {
    let source = "let a = [1]\nlet b = a + 2\nprint(a)\nprint(b)";
    assert_eq!(output(source), vec!["[1]", "[1, 2]"]);
}

#[test]
fn switch_takes_the_first_match() {
    let source = "let x = 2\n\
                  switch x\n\
                  case 1 then print(\"one\")\n\
                  case 1 + 1 then print(\"first two\")\n\
                  case 2 then print(\"second two\")\n\
                  default then print(\"other\")\n\
                  end\n\
                  print(switch 9\ncase 1 then 1\nend)";
    assert_eq!(output(source), vec!["first two", "null"]);
}

#[test]
fn switch_falls_back_to_default_with_block_bodies() {
    let source = "switch \"z\"\n\
                  case \"a\" then\n\
                  print(\"a\")\n\
                  default then\n\
                  print(\"fallback\")\n\
                  print(\"done\")\n\
                  end";
    assert_eq!(output(source), vec!["fallback", "done"]);
}

#[test]
fn duplicate_default_is_a_syntax_error() {
    let err = error("switch 1\ndefault then 1\ndefault then 2\nend");
    assert_eq!(err.kind, ErrorKind::InvalidSyntax);
}

#[test]
fn if_forms() {
    let source = "let n = 5\n\
                  print(if n > 3 then \"big\" else \"small\")\n\
                  print(if n > 9 then 1 elif n > 4 then 2 else 3)\n\
                  if n == 5 then\n\
                  print(\"block\")\n\
                  else\n\
                  print(\"never\")\n\
                  end\n\
                  print(if false then 1)";
    assert_eq!(output(source), vec!["big", "2", "block", "null"]);
}

#[test]
fn loops_collect_values_unless_block_form() {
    let source = "print(for x of [1, 2, 3] then x * x)\n\
                  print(for k, v of {a: 1} then k)\n\
                  print(for i = 0 to 2 then\ni\nend)\n\
                  let i = 0\n\
                  print(while i < 3 then i += 1)";
    assert_eq!(
        output(source),
        vec!["[1, 4, 9]", "[\"a\"]", "null", "[1, 2, 3]"]
    );
}

#[test]
fn break_and_continue() {
    let source = "let seen = []\n\
                  for i = 0 to 10 then\n\
                  if i == 1 then continue\n\
                  if i == 4 then break\n\
                  seen.append(i)\n\
                  end\n\
                  print(seen)";
    assert_eq!(output(source), vec!["[0, 2, 3]"]);
}

#[rstest]
#[case("break")]
#[case("continue")]
#[case("func f()\ncontinue\nend\nwhile true then f()")]
fn loop_signals_outside_loops(#[case] source: &str) {
    assert_eq!(error(source).kind, ErrorKind::InvalidSyntax);
}

#[test]
fn evaluating_a_tree_twice_is_idempotent() {
    let file = SourceFile::new(
        "main.bp",
        "let total = 0\nfor i = 1 to 4 then total += i\nlet o = {n: total}\no.n += 1\nprint(o)",
    );
    let root = parse_file(&file).unwrap();
    let results: Vec<(Value, Vec<String>)> = (0..2)
        .map(|_| {
            let console = CapturedConsole::default();
            let mut interpreter = Interpreter::new(
                Box::new(console.clone()),
                Rc::new(MemoryWorkspace::default()),
            );
            let value = interpreter.interpret(&root, &Env::new()).unwrap();
            (value, console.lines())
        })
        .collect();
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].1, vec!["{n: 7}"]);
}

#[rstest]
#[case("f(1)", ErrorKind::TooFewArguments, "1 too few args passed into 'f'")]
#[case("f(1, 2, 3)", ErrorKind::TooManyArguments, "1 too many args passed into 'f'")]
#[case("len()", ErrorKind::TooFewArguments, "1 too few args passed into 'len'")]
#[case("\"a\".upper(1)", ErrorKind::TooManyArguments, "1 too many args passed into 'upper'")]
fn arity_errors(#[case] call: &str, #[case] kind: ErrorKind, #[case] message: &str) {
    let err = error(&format!("func f(a, b) => a + b\n{call}"));
    assert_eq!(err.kind, kind);
    assert_eq!(err.message, message);
}

#[test]
fn optional_parameters_default_to_null() {
    let source = "func f(a, b?) => if b == null then a else a + b\nprint(f(1))\nprint(f(1, 2))";
    assert_eq!(output(source), vec!["1", "3"]);
}

#[test]
fn required_after_optional_is_a_syntax_error() {
    assert_eq!(error("func f(a?, b) => a").kind, ErrorKind::InvalidSyntax);
}

#[test]
fn arguments_see_the_caller_scope() {
    let source = "let o = {}\n\
                  let x = \"caller\"\n\
                  func make()\n\
                  let x = \"closure\"\n\
                  o.show = func(v) => v\n\
                  end\n\
                  make()\n\
                  print(o.show(x))";
    assert_eq!(output(source), vec!["caller"]);
}

#[test]
fn function_equality_is_by_name() {
    let source = "let a = func same() => 1\nlet b = func same() => 2\nprint(a == b)\nprint(a.name())";
    assert_eq!(output(source), vec!["true", "same"]);
}

#[test]
fn runaway_recursion_is_an_error() {
    let err = error("func down(n) => down(n + 1)\ndown(0)");
    assert_eq!(err.kind, ErrorKind::Recursion);
    assert_eq!(
        err.message,
        format!("Maximum call depth of {MAX_CALL_DEPTH} exceeded")
    );
}

#[test]
fn deep_recursion_within_the_limit() {
    let source = "func sum(n) => if n == 0 then 0 else n + sum(n - 1)\nprint(sum(2000))";
    assert_eq!(output(source), vec!["2001000"]);
}

#[test]
fn undefined_names_render_with_position() {
    let err = error("let x = 1\nprint(y)");
    assert_eq!(
        err.to_string(),
        "Name Error: 'y' is not defined\nFile main.bp, line 2\nprint(y)\n      ^"
    );
}

#[test]
fn traceback_names_each_call() {
    let err = error("func inner() => 1 / 0\nfunc outer() => inner()\nouter()");
    let rendered = err.traceback();
    assert!(rendered.starts_with("Traceback (most recent call last):\n"));
    assert!(rendered.contains("File main.bp, line 3, in <program>"));
    assert!(rendered.contains("File main.bp, line 2, in outer"));
    assert!(rendered.ends_with("Division By Zero: Division by zero\nFile main.bp, line 1\nfunc inner() => 1 / 0\n                    ^"));
}

#[test]
fn lex_errors_surface_from_run() {
    assert_eq!(error("let x = 1 @ 2").kind, ErrorKind::IllegalCharacter);
}

#[test]
fn string_and_collection_members() {
    let source = "print(\"a,b,c\".split(\",\").len())\n\
                  print([1, 2].join(\"-\"))\n\
                  let o = {a: 1, b: 2}\n\
                  print(o.values())\n\
                  print(o.has(\"a\"))\n\
                  o.remove(\"a\")\n\
                  print(o)\n\
                  print(len(\"hey\"))";
    assert_eq!(output(source), vec!["3", "1-2", "[1, 2]", "true", "{b: 2}", "3"]);
}

#[test]
fn missing_member_is_a_name_error() {
    let err = error("let o = {a: 1}\nprint(o.b)");
    assert_eq!(err.kind, ErrorKind::Name);
    assert_eq!(err.message, "'b' is not defined");
}

#[test]
fn conversions_and_type_checks() {
    let source = "print(Number(\" 4.5 \") + 1)\n\
                  print(Boolean(\"TRUE\"))\n\
                  print(String([1]) + \"!\")\n\
                  print(is_function(print))\n\
                  print(is_number(\"1\"))\n\
                  print(math.pi > 3)";
    assert_eq!(output(source), vec!["5.5", "true", "[1]!", "true", "false", "true"]);
}

#[test]
fn input_reads_from_the_console() {
    let session = Session {
        console: CapturedConsole::with_input(["Ada", "41", "nope"]),
        workspace: MemoryWorkspace::default(),
    };
    let source = "let name = input(\"name? \")\n\
                  let age = input_int()\n\
                  print(name + \" \" + (age + 1))\n\
                  print(input_int())";
    assert_eq!(session.output(source), vec!["name? ", "Ada 42", "null"]);
}

#[test]
fn file_builtins_use_the_workspace() {
    let workspace = MemoryWorkspace::default().with_file("notes.txt", "old");
    let session = Session::with_workspace(workspace.clone());
    let source = "print(read_file(\"./notes.txt\"))\n\
                  write_file(\"out.txt\", 12)\n\
                  delete_file(\"notes.txt\")";
    assert_eq!(session.output(source), vec!["old"]);
    assert_eq!(workspace.file("out.txt").as_deref(), Some("12"));
    assert_eq!(workspace.file("notes.txt"), None);

    let err = session.run("read_file(\"notes.txt\")").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
}

#[test]
fn printed_output_survives_a_later_failure() {
    let session = Session::new();
    assert!(session.run("print(\"before\")\nprint(1 / 0)").is_err());
    assert_eq!(session.console.lines(), vec!["before"]);
}
