use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    stdlib,
    types::{Binding, Value},
};

#[derive(Debug, Default)]
pub struct Env {
    values: HashMap<String, Binding>,
    pub parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    /// A root environment with the built-ins registered.
    pub fn new() -> Rc<RefCell<Self>> {
        let mut env = Self::default();
        stdlib::init(&mut env);
        Rc::new(RefCell::new(env))
    }

    pub fn with_parent(parent: Rc<RefCell<Env>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            ..Default::default()
        }))
    }

    /// Binds `name` in this scope, replacing any earlier binding and its
    /// visibility.
    pub fn set(&mut self, name: &str, value: Value, is_public: bool) {
        debug!("Set {name} -> {value:?} (public: {is_public})");
        self.values
            .insert(name.to_string(), Binding { value, is_public });
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|b| b.value)
    }

    /// Finds the nearest binding for `name`, walking up the parents.
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        debug!("Get {name}");
        if let Some(binding) = self.values.get(name) {
            return Some(binding.clone());
        }
        if let Some(parent) = &self.parent {
            debug!("Get {name} from parent");
            return parent.borrow().lookup(name);
        }
        None
    }

    /// Removes `name` from this scope only. Absent names are ignored.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        debug!("Remove {name}");
        self.values.remove(name).map(|b| b.value)
    }

    /// The public bindings of this scope, sorted by name. A function's
    /// visibility is the one it was declared with, whatever name holds it.
    pub fn public_symbols(&self) -> Vec<(String, Value)> {
        let mut symbols: Vec<(String, Value)> = self
            .values
            .iter()
            .filter(|(_, b)| match &b.value {
                Value::Func(func) => func.def.is_public,
                _ => b.is_public,
            })
            .map(|(name, b)| (name.clone(), b.value.clone()))
            .collect();
        symbols.sort_by(|(a, _), (b, _)| a.cmp(b));
        symbols
    }
}
