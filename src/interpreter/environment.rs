use crate::interpreter::error::NameError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

struct Scope {
    bindings: RefCell<HashMap<Rc<str>, Value>>,
    parent: Option<Environment>,
}

/// A handle to one scope in the lexical chain.
///
/// Cloning the handle shares the scope: closures created in the same call
/// all hold the same parent, and a binding changed through one handle is
/// visible through every other.
#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    pub fn new() -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A fresh scope whose lookups fall back to `self`.
    pub fn child(&self) -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// Binds in this scope, replacing any binding of the same name here.
    pub fn define(&self, name: impl Into<Rc<str>>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, NameError> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(value) = env.0.bindings.borrow().get(name) {
                return Ok(value.clone());
            }
            scope = env.parent();
        }
        Err(NameError::Undefined(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Rebinds the nearest existing `name`; when no scope holds it the
    /// binding is created here.
    pub fn assign(&self, name: impl Into<Rc<str>>, value: Value) {
        let name = name.into();
        if let Err(NameError::Undefined(_)) = self.assign_existing(&name, value.clone()) {
            self.define(name, value);
        }
    }

    /// Rebinds the nearest existing `name`, failing if nothing holds it.
    pub fn assign_existing(&self, name: &str, value: Value) -> Result<(), NameError> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            let mut bindings = env.0.bindings.borrow_mut();
            if let Some(slot) = bindings.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            drop(bindings);
            scope = env.parent();
        }
        Err(NameError::Undefined(name.to_string()))
    }

    /// Bindings held directly by this scope, sorted by name.
    pub fn bindings(&self) -> Vec<(Rc<str>, Value)> {
        let mut bindings: Vec<_> = self
            .0
            .bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        bindings.sort_by(|(left, _), (right, _)| left.cmp(right));
        bindings
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.parent();
        while let Some(env) = scope {
            depth += 1;
            scope = env.parent();
        }
        depth
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.0.bindings.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("depth", &self.depth())
            .finish()
    }
}
