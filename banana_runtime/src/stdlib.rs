use std::f64::consts;

use crate::{
    environment::Env,
    error::Fault,
    interpret::Interpreter,
    types::{NativeDef, NativeFunc, NativeParam, Object, Value},
};

/// Registers the global built-ins. They are all private, so a module never
/// re-exports them.
pub fn init(env: &mut Env) {
    for def in GLOBALS {
        env.set(def.name, Value::NativeFunc(NativeFunc::new(def)), false);
    }
    env.set("math", math(), false);
}

/// The names [`init`] binds.
pub fn init_symbols() -> Vec<&'static str> {
    GLOBALS
        .iter()
        .map(|def| def.name)
        .chain(std::iter::once("math"))
        .collect()
}

fn math() -> Value {
    Value::Object(Object::new(vec![
        ("pi".to_string(), Value::Number(consts::PI)),
        ("e".to_string(), Value::Number(consts::E)),
        ("inf".to_string(), Value::Number(f64::INFINITY)),
    ]))
}

const VALUE: &[NativeParam] = &[NativeParam::required("value")];
const PROMPT: &[NativeParam] = &[NativeParam::optional("prompt")];
const PATH: &[NativeParam] = &[NativeParam::required("path")];

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

fn prompt_text(args: Vec<Value>) -> String {
    match first(args) {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn path_arg(value: Value) -> Result<String, Fault> {
    match value {
        Value::Str(path) => Ok(path),
        other => Err(Fault::type_error(format!(
            "Path must be a string, found {}",
            other.type_name()
        ))),
    }
}

static GLOBALS: &[NativeDef] = &[
    NativeDef {
        name: "print",
        params: VALUE,
        body: |interpreter, _, args| {
            interpreter.console().print(&first(args).to_string());
            Ok(Value::Null)
        },
    },
    NativeDef {
        name: "input",
        params: PROMPT,
        body: |interpreter, _, args| {
            let text = interpreter
                .console()
                .input(&prompt_text(args))
                .map_err(Fault::io)?;
            Ok(Value::Str(text))
        },
    },
    NativeDef {
        name: "input_int",
        params: PROMPT,
        body: |interpreter, _, args| {
            let text = interpreter
                .console()
                .input(&prompt_text(args))
                .map_err(Fault::io)?;
            Ok(text
                .trim()
                .parse::<i64>()
                .map_or(Value::Null, |n| Value::Number(n as f64)))
        },
    },
    NativeDef {
        name: "clear",
        params: &[],
        body: |interpreter, _, _| {
            interpreter.console().clear();
            Ok(Value::Null)
        },
    },
    NativeDef {
        name: "is_number",
        params: VALUE,
        body: |_, _, args| Ok(Value::Boolean(matches!(first(args), Value::Number(_)))),
    },
    NativeDef {
        name: "is_string",
        params: VALUE,
        body: |_, _, args| Ok(Value::Boolean(matches!(first(args), Value::Str(_)))),
    },
    NativeDef {
        name: "is_boolean",
        params: VALUE,
        body: |_, _, args| Ok(Value::Boolean(matches!(first(args), Value::Boolean(_)))),
    },
    NativeDef {
        name: "is_null",
        params: VALUE,
        body: |_, _, args| Ok(Value::Boolean(matches!(first(args), Value::Null))),
    },
    NativeDef {
        name: "is_list",
        params: VALUE,
        body: |_, _, args| Ok(Value::Boolean(matches!(first(args), Value::List(_)))),
    },
    NativeDef {
        name: "is_object",
        params: VALUE,
        body: |_, _, args| Ok(Value::Boolean(matches!(first(args), Value::Object(_)))),
    },
    NativeDef {
        name: "is_function",
        params: VALUE,
        body: |_, _, args| {
            Ok(Value::Boolean(matches!(
                first(args),
                Value::Func(_) | Value::NativeFunc(_)
            )))
        },
    },
    NativeDef {
        name: "String",
        params: VALUE,
        body: |_, _, args| Ok(Value::Str(first(args).to_string())),
    },
    NativeDef {
        name: "Number",
        params: VALUE,
        body: to_number,
    },
    NativeDef {
        name: "Boolean",
        params: VALUE,
        body: to_boolean,
    },
    NativeDef {
        name: "len",
        params: VALUE,
        body: |_, _, args| {
            let len = match first(args) {
                Value::Str(s) => s.chars().count(),
                Value::List(l) => l.len(),
                Value::Object(o) => o.len(),
                _ => return Err(Fault::type_error("Argument must be list or string")),
            };
            Ok(Value::Number(len as f64))
        },
    },
    NativeDef {
        name: "read_file",
        params: PATH,
        body: |interpreter, _, args| {
            let workspace = interpreter.workspace();
            let path = workspace.resolve_file(&path_arg(first(args))?);
            workspace.read(&path).map(Value::Str).map_err(Fault::io)
        },
    },
    NativeDef {
        name: "write_file",
        params: &[NativeParam::required("path"), NativeParam::required("text")],
        body: |interpreter, _, args| {
            let mut args = args.into_iter();
            let path = path_arg(args.next().unwrap_or(Value::Null))?;
            let text = args.next().unwrap_or(Value::Null).to_string();
            let workspace = interpreter.workspace();
            workspace
                .write(&workspace.resolve_file(&path), &text)
                .map_err(Fault::io)?;
            Ok(Value::Null)
        },
    },
    NativeDef {
        name: "delete_file",
        params: PATH,
        body: |interpreter, _, args| {
            let workspace = interpreter.workspace();
            let path = workspace.resolve_file(&path_arg(first(args))?);
            workspace.delete(&path).map_err(Fault::io)?;
            Ok(Value::Null)
        },
    },
];

fn to_number(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> Result<Value, Fault> {
    match first(args) {
        Value::Number(n) => Ok(Value::Number(n)),
        Value::Boolean(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| Fault::type_error("A string argument must contain a number")),
        _ => Err(Fault::type_error("The argument must be a string or boolean")),
    }
}

fn to_boolean(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> Result<Value, Fault> {
    match first(args) {
        Value::Boolean(b) => Ok(Value::Boolean(b)),
        Value::Str(s) => Ok(Value::Boolean(s.to_lowercase().contains("true"))),
        Value::Number(n) => Ok(Value::Boolean(n == 1.0)),
        _ => Err(Fault::type_error("The argument must be a string or number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn global(name: &str) -> &'static NativeDef {
        GLOBALS.iter().find(|def| def.name == name).unwrap()
    }

    #[rstest]
    #[case(Value::Str(" 12.5 ".to_string()), Value::Number(12.5))]
    #[case(Value::Boolean(true), Value::Number(1.0))]
    #[case(Value::Number(3.0), Value::Number(3.0))]
    fn number_conversion(#[case] input: Value, #[case] expected: Value) {
        assert_eq!(to_number_value(input).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Str("abc".to_string()))]
    #[case(Value::Null)]
    fn number_conversion_failures(#[case] input: Value) {
        assert!(matches!(to_number_value(input), Err(Fault::Type(_))));
    }

    fn to_number_value(input: Value) -> Result<Value, Fault> {
        let mut interpreter = Interpreter::new(
            Box::new(crate::host::CapturedConsole::default()),
            std::rc::Rc::new(crate::host::MemoryWorkspace::default()),
        );
        to_number(&mut interpreter, &Value::Null, vec![input])
    }

    #[test]
    fn registry_shape() {
        assert_eq!(global("input").params, PROMPT);
        assert_eq!(global("write_file").params.len(), 2);
        assert!(global("clear").params.is_empty());
        let names = init_symbols();
        assert!(names.contains(&"math"));
        assert!(names.contains(&"is_object"));
    }

    #[test]
    fn math_constants() {
        let Value::Object(math) = math() else {
            panic!("math is not an object");
        };
        assert_eq!(math.get("pi"), Some(Value::Number(consts::PI)));
        assert_eq!(math.get("inf"), Some(Value::Number(f64::INFINITY)));
    }
}
