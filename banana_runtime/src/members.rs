//! Per-type method tables and the `.` lookup order: built-in methods first,
//! then object entries.

use crate::{
    error::Fault,
    interpret::Interpreter,
    ops::{list_index, list_of},
    types::{Callable, List, NativeDef, NativeFunc, NativeParam, Object, Value},
};

pub fn lookup(receiver: &Value, name: &str) -> Result<Value, Fault> {
    if let Some(def) = methods_of(receiver).iter().find(|def| def.name == name) {
        return Ok(Value::NativeFunc(NativeFunc::bound(def, receiver.clone())));
    }
    if let Value::Object(object) = receiver {
        if let Some(value) = object.get(name) {
            return Ok(value);
        }
    }
    Err(Fault::Undefined(name.to_string()))
}

pub fn methods_of(receiver: &Value) -> &'static [NativeDef] {
    match receiver {
        Value::Str(_) => STRING_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Object(_) => OBJECT_METHODS,
        Value::Func(_) | Value::NativeFunc(_) => FUNCTION_METHODS,
        _ => &[],
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Null)
}

fn expect_str(value: Value, what: &str) -> Result<String, Fault> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Fault::type_error(format!(
            "{what} must be a string, found {}",
            other.type_name()
        ))),
    }
}

static STRING_METHODS: &[NativeDef] = &[
    NativeDef {
        name: "len",
        params: &[],
        body: |_, this, _| with_str(this, |s| Value::Number(s.chars().count() as f64)),
    },
    NativeDef {
        name: "upper",
        params: &[],
        body: |_, this, _| with_str(this, |s| Value::Str(s.to_uppercase())),
    },
    NativeDef {
        name: "lower",
        params: &[],
        body: |_, this, _| with_str(this, |s| Value::Str(s.to_lowercase())),
    },
    NativeDef {
        name: "trim",
        params: &[],
        body: |_, this, _| with_str(this, |s| Value::Str(s.trim().to_string())),
    },
    NativeDef {
        name: "split",
        params: &[NativeParam::optional("separator")],
        body: str_split,
    },
    NativeDef {
        name: "contains",
        params: &[NativeParam::required("text")],
        body: |_, this, args| {
            let needle = expect_str(arg(&args, 0), "Argument")?;
            with_str(this, |s| Value::Boolean(s.contains(&needle)))
        },
    },
    NativeDef {
        name: "replace",
        params: &[NativeParam::required("from"), NativeParam::required("to")],
        body: |_, this, args| {
            let from = expect_str(arg(&args, 0), "First argument")?;
            let to = expect_str(arg(&args, 1), "Second argument")?;
            with_str(this, |s| Value::Str(s.replace(&from, &to)))
        },
    },
];

fn with_str(this: &Value, f: impl FnOnce(&str) -> Value) -> Result<Value, Fault> {
    match this {
        Value::Str(s) => Ok(f(s)),
        other => Err(Fault::IllegalOperation(other.type_name())),
    }
}

fn str_split(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> Result<Value, Fault> {
    let parts: Vec<Value> = match arg(&args, 0) {
        Value::Null => with_str_parts(this, |s| {
            s.split_whitespace().map(str::to_string).collect()
        })?,
        Value::Str(sep) if sep.is_empty() => {
            with_str_parts(this, |s| s.chars().map(String::from).collect())?
        }
        Value::Str(sep) => with_str_parts(this, |s| s.split(&sep).map(str::to_string).collect())?,
        other => return Err(Fault::type_error(format!(
            "Separator must be a string, found {}",
            other.type_name()
        ))),
    };
    Ok(list_of(parts))
}

fn with_str_parts(this: &Value, f: impl FnOnce(&str) -> Vec<String>) -> Result<Vec<Value>, Fault> {
    match this {
        Value::Str(s) => Ok(f(s).into_iter().map(Value::Str).collect()),
        other => Err(Fault::IllegalOperation(other.type_name())),
    }
}

static LIST_METHODS: &[NativeDef] = &[
    NativeDef {
        name: "len",
        params: &[],
        body: |_, this, _| with_list(this, |l| Ok(Value::Number(l.len() as f64))),
    },
    NativeDef {
        name: "append",
        params: &[NativeParam::required("value")],
        body: |_, this, args| {
            with_list(this, |l| {
                l.borrow_mut().push(arg(&args, 0));
                Ok(Value::Null)
            })
        },
    },
    NativeDef {
        name: "pop",
        params: &[NativeParam::optional("index")],
        body: list_pop,
    },
    NativeDef {
        name: "extend",
        params: &[NativeParam::required("list")],
        body: |_, this, args| {
            let Value::List(other) = arg(&args, 0) else {
                return Err(Fault::type_error("First argument must be list"));
            };
            // Copy first: `other` may be this very list
            let tail = other.borrow().clone();
            with_list(this, |l| {
                l.borrow_mut().extend(tail);
                Ok(Value::Null)
            })
        },
    },
    NativeDef {
        name: "contains",
        params: &[NativeParam::required("value")],
        body: |_, this, args| {
            let needle = arg(&args, 0);
            with_list(this, |l| {
                Ok(Value::Boolean(l.borrow().iter().any(|v| *v == needle)))
            })
        },
    },
    NativeDef {
        name: "join",
        params: &[NativeParam::optional("separator")],
        body: |_, this, args| {
            let sep = match arg(&args, 0) {
                Value::Null => String::new(),
                other => expect_str(other, "Separator")?,
            };
            with_list(this, |l| {
                let parts: Vec<String> = l.borrow().iter().map(Value::to_string).collect();
                Ok(Value::Str(parts.join(&sep)))
            })
        },
    },
    NativeDef {
        name: "get",
        params: &[NativeParam::required("index")],
        body: |_, this, args| {
            let Value::Number(n) = arg(&args, 0) else {
                return Err(Fault::type_error("First argument must be number"));
            };
            with_list(this, |l| {
                list_index(n, l.len())
                    .and_then(|index| l.get(index))
                    .ok_or(Fault::IndexOutOfBounds {
                        index: n,
                        action: "retrieved from list",
                    })
            })
        },
    },
];

fn with_list(
    this: &Value,
    f: impl FnOnce(&List) -> Result<Value, Fault>,
) -> Result<Value, Fault> {
    match this {
        Value::List(l) => f(l),
        other => Err(Fault::IllegalOperation(other.type_name())),
    }
}

/// Removes and returns the element at `index`, the last one by default.
fn list_pop(_: &mut Interpreter, this: &Value, args: Vec<Value>) -> Result<Value, Fault> {
    let index = match arg(&args, 0) {
        Value::Null => -1.0,
        Value::Number(n) => n,
        _ => return Err(Fault::type_error("First argument must be number")),
    };
    with_list(this, |l| {
        let resolved = list_index(index, l.len()).ok_or(Fault::IndexOutOfBounds {
            index,
            action: "removed from list",
        })?;
        Ok(l.borrow_mut().remove(resolved))
    })
}

static OBJECT_METHODS: &[NativeDef] = &[
    NativeDef {
        name: "keys",
        params: &[],
        body: |_, this, _| {
            with_object(this, |o| {
                Ok(list_of(o.keys().into_iter().map(Value::Str).collect()))
            })
        },
    },
    NativeDef {
        name: "values",
        params: &[],
        body: |_, this, _| {
            with_object(this, |o| {
                Ok(list_of(o.entries().into_iter().map(|(_, v)| v).collect()))
            })
        },
    },
    NativeDef {
        name: "has",
        params: &[NativeParam::required("key")],
        body: |_, this, args| {
            let key = expect_str(arg(&args, 0), "Key")?;
            with_object(this, |o| Ok(Value::Boolean(o.contains(&key))))
        },
    },
    NativeDef {
        name: "remove",
        params: &[NativeParam::required("key")],
        body: |_, this, args| {
            let key = expect_str(arg(&args, 0), "Key")?;
            with_object(this, |o| Ok(o.remove(&key).unwrap_or(Value::Null)))
        },
    },
];

fn with_object(
    this: &Value,
    f: impl FnOnce(&Object) -> Result<Value, Fault>,
) -> Result<Value, Fault> {
    match this {
        Value::Object(o) => f(o),
        other => Err(Fault::IllegalOperation(other.type_name())),
    }
}

static FUNCTION_METHODS: &[NativeDef] = &[
    NativeDef {
        name: "name",
        params: &[],
        body: |_, this, _| with_callable(this, |f| Value::Str(f.name().to_string())),
    },
    NativeDef {
        name: "arity",
        params: &[],
        body: |_, this, _| with_callable(this, |f| Value::Number(f.arity() as f64)),
    },
];

fn with_callable(this: &Value, f: impl FnOnce(&dyn Callable) -> Value) -> Result<Value, Fault> {
    match this {
        Value::Func(func) => Ok(f(func)),
        Value::NativeFunc(func) => Ok(f(func)),
        other => Err(Fault::IllegalOperation(other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CapturedConsole, MemoryWorkspace};
    use banana_syntax::position::{Position, SourceFile, Span};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn call(receiver: &Value, method: &str, args: Vec<Value>) -> Value {
        let Value::NativeFunc(func) = lookup(receiver, method).unwrap() else {
            panic!("{method} is not a method");
        };
        let mut interpreter = Interpreter::new(
            Box::new(CapturedConsole::default()),
            Rc::new(MemoryWorkspace::default()),
        );
        let start = Position::start_of(SourceFile::new("<test>", ""));
        let span = Span::new(start.clone(), start);
        let args = func.bind_args(args).unwrap();
        func.call(&mut interpreter, args, &span).unwrap()
    }

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn string_methods() {
        let text = s("  Hello World ");
        assert_eq!(call(&text, "trim", vec![]), s("Hello World"));
        assert_eq!(call(&text, "upper", vec![]), s("  HELLO WORLD "));
        assert_eq!(call(&text, "len", vec![]), Value::Number(14.0));
        assert_eq!(call(&text, "contains", vec![s("World")]), Value::Boolean(true));
        assert_eq!(call(&s("a-b"), "replace", vec![s("-"), s("+")]), s("a+b"));
        assert_eq!(
            call(&s("a,b"), "split", vec![s(",")]),
            list_of(vec![s("a"), s("b")])
        );
        assert_eq!(
            call(&text, "split", vec![]),
            list_of(vec![s("Hello"), s("World")])
        );
    }

    #[test]
    fn list_methods_mutate_shared_storage() {
        let list = List::new(vec![Value::Number(1.0)]);
        let value = Value::List(list.clone());
        assert_eq!(call(&value, "append", vec![Value::Number(2.0)]), Value::Null);
        assert_eq!(list.len(), 2);
        assert_eq!(call(&value, "extend", vec![value.clone()]), Value::Null);
        assert_eq!(list.len(), 4);
        assert_eq!(call(&value, "pop", vec![]), Value::Number(2.0));
        assert_eq!(call(&value, "pop", vec![Value::Number(0.0)]), Value::Number(1.0));
        assert_eq!(call(&value, "get", vec![Value::Number(-1.0)]), Value::Number(1.0));
        assert_eq!(call(&value, "join", vec![s("|")]), s("2|1"));
        assert_eq!(call(&value, "contains", vec![Value::Number(2.0)]), Value::Boolean(true));
    }

    #[test]
    fn pop_on_empty_list_fails() {
        let value = Value::List(List::default());
        let Value::NativeFunc(pop) = lookup(&value, "pop").unwrap() else {
            panic!("pop is not a method");
        };
        let mut interpreter = Interpreter::new(
            Box::new(CapturedConsole::default()),
            Rc::new(MemoryWorkspace::default()),
        );
        let result = (pop.def.body)(&mut interpreter, &value, vec![Value::Null]);
        assert!(matches!(result, Err(Fault::IndexOutOfBounds { .. })));
    }

    #[test]
    fn methods_shadow_object_entries() {
        let object = Value::Object(Object::new(vec![
            ("keys".to_string(), Value::Number(1.0)),
            ("x".to_string(), Value::Number(2.0)),
        ]));
        assert!(matches!(lookup(&object, "keys"), Ok(Value::NativeFunc(_))));
        assert_eq!(lookup(&object, "x").unwrap(), Value::Number(2.0));
        assert_eq!(
            lookup(&object, "missing").unwrap_err(),
            Fault::Undefined("missing".to_string())
        );
        assert_eq!(
            call(&object, "keys", vec![]),
            list_of(vec![s("keys"), s("x")])
        );
    }

    #[test]
    fn numbers_have_no_members() {
        assert_eq!(
            lookup(&Value::Number(1.0), "len").unwrap_err(),
            Fault::Undefined("len".to_string())
        );
    }
}
