use std::{
    cell::{Ref, RefCell, RefMut},
    fmt::{Debug, Display},
    rc::Rc,
};

use banana_syntax::{ast::FuncDef, position::Span};

use crate::{
    environment::Env,
    error::{Exception, Fault},
    interpret::Interpreter,
};

#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    Str(String),
    Boolean(bool),
    Null,
    List(List),
    Object(Object),
    Func(Func),
    NativeFunc(NativeFunc),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "Number",
            Self::Str(_) => "String",
            Self::Boolean(_) => "Boolean",
            Self::Null => "Null",
            Self::List(_) => "List",
            Self::Object(_) => "Object",
            Self::Func(_) => "Function",
            Self::NativeFunc(_) => "BuiltInFunction",
        }
    }

    /// Null and false are falsy, as is the empty string. Everything else,
    /// zero included, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The rendering used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::List(l) => write!(f, "{l}"),
            Self::Object(o) => write!(f, "{o}"),
            Self::Func(func) => write!(f, "{func}"),
            Self::NativeFunc(func) => write!(f, "{func}"),
        }
    }
}

/// Structural equality. Functions compare by name only, so two distinct
/// functions sharing a name are equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(m), Self::Number(n)) => m == n,
            (Self::Str(m), Self::Str(n)) => m == n,
            (Self::Boolean(m), Self::Boolean(n)) => m == n,
            (Self::Null, Self::Null) => true,
            (Self::List(m), Self::List(n)) => m == n,
            (Self::Object(m), Self::Object(n)) => m == n,
            (Self::Func(m), Self::Func(n)) => m.name() == n.name(),
            (Self::NativeFunc(m), Self::NativeFunc(n)) => m.def.name == n.def.name,
            _ => false,
        }
    }
}

/// A name bound in an environment or object, with its export visibility.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub is_public: bool,
}

/// A list handle. Clones alias the same storage.
#[derive(Clone, Debug, Default)]
pub struct List(Rc<RefCell<Vec<Value>>>);

impl List {
    pub fn new(elements: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(elements)))
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    /// A new list holding the same elements.
    pub fn duplicate(&self) -> Self {
        Self::new(self.borrow().clone())
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.borrow() == *other.borrow()
    }
}

impl Display for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elements: Vec<String> = self.borrow().iter().map(Value::repr).collect();
        write!(f, "[{}]", elements.join(", "))
    }
}

/// An insertion-ordered object handle. Clones alias the same storage.
#[derive(Clone, Debug, Default)]
pub struct Object(Rc<RefCell<Vec<(String, Binding)>>>);

impl Object {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        let object = Self::default();
        for (key, value) in entries {
            object.set(&key, value);
        }
        object
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, b)| b.value.clone())
    }

    /// Overwrites in place, keeping the key's position and visibility, or
    /// appends a new public entry.
    pub fn set(&self, key: &str, value: Value) {
        let mut entries = self.0.borrow_mut();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, binding)) => binding.value = value,
            None => entries.push((
                key.to_string(),
                Binding {
                    value,
                    is_public: true,
                },
            )),
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut entries = self.0.borrow_mut();
        let index = entries.iter().position(|(k, _)| k == key)?;
        Some(entries.remove(index).1.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, b)| (k.clone(), b.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Key order does not matter for equality.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let entries = self.entries();
        entries.len() == other.len()
            && entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == *v))
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self
            .entries()
            .iter()
            .map(|(k, v)| format!("{k}: {}", v.repr()))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

pub trait Callable {
    fn name(&self) -> &str;
    /// Optional flags of the parameters, in order.
    fn params(&self) -> Vec<bool>;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        span: &Span,
    ) -> Result<Value, Exception>;

    fn arity(&self) -> usize {
        self.params().len()
    }

    /// Checks the argument count and pads missing optionals with null.
    fn bind_args(&self, mut args: Vec<Value>) -> Result<Vec<Value>, Fault> {
        let params = self.params();
        if args.len() > params.len() {
            return Err(Fault::TooManyArguments {
                name: self.name().to_string(),
                count: args.len() - params.len(),
            });
        }
        let required = params.iter().take_while(|optional| !**optional).count();
        if args.len() < required {
            return Err(Fault::TooFewArguments {
                name: self.name().to_string(),
                count: required - args.len(),
            });
        }
        args.resize(params.len(), Value::Null);
        Ok(args)
    }
}

/// A user-defined function closing over the environment it was defined in.
#[derive(Clone)]
pub struct Func {
    pub def: Rc<FuncDef>,
    pub env: Rc<RefCell<Env>>,
}

impl Func {
    pub fn param_names(&self) -> Vec<&str> {
        self.def
            .params
            .iter()
            .map(|p| p.ident.name.as_str())
            .collect()
    }
}

impl Debug for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name())
            .field("params", &self.param_names())
            .finish()
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<function {}>", self.name())
    }
}

impl Callable for Func {
    fn name(&self) -> &str {
        self.def
            .name
            .as_ref()
            .map_or("<anonymous>", |ident| ident.name.as_str())
    }

    fn params(&self) -> Vec<bool> {
        self.def.params.iter().map(|p| p.optional).collect()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        span: &Span,
    ) -> Result<Value, Exception> {
        interpreter.call_func(self, args, span)
    }
}

pub type NativeBody = fn(&mut Interpreter, &Value, Vec<Value>) -> Result<Value, Fault>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeParam {
    pub name: &'static str,
    pub optional: bool,
}

impl NativeParam {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            optional: true,
        }
    }
}

/// A host function as it sits in a registry table.
pub struct NativeDef {
    pub name: &'static str,
    pub params: &'static [NativeParam],
    pub body: NativeBody,
}

impl Debug for NativeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// A built-in, optionally bound to the receiver it was looked up on.
#[derive(Clone, Debug)]
pub struct NativeFunc {
    pub def: &'static NativeDef,
    pub this: Option<Box<Value>>,
}

impl NativeFunc {
    pub fn new(def: &'static NativeDef) -> Self {
        Self { def, this: None }
    }

    pub fn bound(def: &'static NativeDef, this: Value) -> Self {
        Self {
            def,
            this: Some(Box::new(this)),
        }
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<built-in function {}>", self.def.name)
    }
}

impl Callable for NativeFunc {
    fn name(&self) -> &str {
        self.def.name
    }

    fn params(&self) -> Vec<bool> {
        self.def.params.iter().map(|p| p.optional).collect()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        span: &Span,
    ) -> Result<Value, Exception> {
        let null = Value::Null;
        let this = self.this.as_deref().unwrap_or(&null);
        (self.def.body)(interpreter, this, args).map_err(|f| f.at(span))
    }
}
