use indexmap::IndexMap;
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::ops::Deref;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::interpreter::Environment;
use crate::stack::ensure_sufficient_stack;

pub type ListRef = Rc<Contents<Vec<Value>>>;
pub type MapRef = Rc<Contents<IndexMap<Key, Value>>>;

/// Storage behind a list or map handle. Dropping the last handle releases
/// nested containers through a worklist, so `[[[...]]]` nested to any
/// depth is freed without native recursion.
#[derive(Debug)]
pub struct Contents<T: Children>(RefCell<T>);

impl<T: Children> Contents<T> {
    pub fn new(inner: T) -> Self {
        Contents(RefCell::new(inner))
    }
}

impl<T: Children> Deref for Contents<T> {
    type Target = RefCell<T>;

    fn deref(&self) -> &RefCell<T> {
        &self.0
    }
}

impl<T: Children> Drop for Contents<T> {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.0.get_mut().drain_into(&mut pending);
        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::List(items) => {
                    if let Some(inner) = Rc::get_mut(items) {
                        inner.0.get_mut().drain_into(&mut pending);
                    }
                }
                Value::Map(entries) => {
                    if let Some(inner) = Rc::get_mut(entries) {
                        inner.0.get_mut().drain_into(&mut pending);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Container payloads that can hand their values over for release.
pub trait Children {
    fn drain_into(&mut self, out: &mut Vec<Value>);
}

impl Children for Vec<Value> {
    fn drain_into(&mut self, out: &mut Vec<Value>) {
        out.append(self);
    }
}

impl Children for IndexMap<Key, Value> {
    fn drain_into(&mut self, out: &mut Vec<Value>) {
        out.extend(mem::take(self).into_values());
    }
}

/// A runtime datum. Lists and maps are shared handles: cloning a `Value`
/// clones the handle, so every binding sees the same contents.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Map(MapRef),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
}

/// The hashable subset of `Value`, used as mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
}

impl Key {
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::None => Some(Key::None),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(n) => Some(Key::Int(*n)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(n) => Value::Int(*n),
            Key::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

/// A user-defined function: `def` or `lambda` plus the scope it closed over.
pub struct Function {
    pub name: Rc<str>,
    pub params: Rc<[Rc<str>]>,
    pub body: Rc<[Stmt]>,
    pub closure: Environment,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A registry builtin, optionally bound to the value it was looked up on
/// (`xs.append` carries `xs` as its receiver).
#[derive(Debug)]
pub struct NativeFunction {
    pub name: Rc<str>,
    pub receiver: Option<Value>,
}

impl NativeFunction {
    pub fn free(name: impl Into<Rc<str>>) -> Self {
        Self { name: name.into(), receiver: None }
    }

    pub fn bound(name: impl Into<Rc<str>>, receiver: Value) -> Self {
        Self { name: name.into(), receiver: Some(receiver) }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Comparison::default().equal(self, other)
    }
}

/// Structural equality. Container pairs already under comparison count as
/// equal, so two self-referencing lists compare without looping forever.
#[derive(Default)]
struct Comparison {
    open: HashSet<(*const (), *const ())>,
}

impl Comparison {
    fn equal(&mut self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::None, Value::None) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::List(left), Value::List(right)) => {
                if Rc::ptr_eq(left, right) {
                    return true;
                }
                let pair = (Rc::as_ptr(left) as *const (), Rc::as_ptr(right) as *const ());
                if !self.open.insert(pair) {
                    return true;
                }
                let (left, right) = (left.borrow(), right.borrow());
                let equal = left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|(l, r)| ensure_sufficient_stack(|| self.equal(l, r)));
                self.open.remove(&pair);
                equal
            }
            (Value::Map(left), Value::Map(right)) => {
                if Rc::ptr_eq(left, right) {
                    return true;
                }
                let pair = (Rc::as_ptr(left) as *const (), Rc::as_ptr(right) as *const ());
                if !self.open.insert(pair) {
                    return true;
                }
                let (left, right) = (left.borrow(), right.borrow());
                let equal = left.len() == right.len()
                    && left.iter().all(|(key, l)| {
                        right
                            .get(key)
                            .is_some_and(|r| ensure_sufficient_stack(|| self.equal(l, r)))
                    });
                self.open.remove(&pair);
                equal
            }
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            (Value::Native(left), Value::Native(right)) => {
                Rc::ptr_eq(left, right)
                    || (left.name == right.name
                        && match (&left.receiver, &right.receiver) {
                            (Some(l), Some(r)) => self.equal(l, r),
                            (None, None) => true,
                            _ => false,
                        })
            }
            _ => false,
        }
    }
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(Contents::new(items)))
    }

    pub fn map(entries: IndexMap<Key, Value>) -> Value {
        Value::Map(Rc::new(Contents::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Function(_) => "function",
            Value::Native(_) => "builtin_function",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// Numeric view of ints and floats alike.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<Ref<'_, Vec<Value>>> {
        if let Value::List(items) = self {
            Some(items.borrow())
        } else {
            None
        }
    }

    pub fn as_map(&self) -> Option<Ref<'_, IndexMap<Key, Value>>> {
        if let Value::Map(entries) = self {
            Some(entries.borrow())
        } else {
            None
        }
    }

    /// Truthiness for the `bool` builtin. Conditions never use this: they
    /// require an actual boolean.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) => true,
        }
    }

    /// Source-like rendering: strings are quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        Printer::default().write(&mut out, self, true);
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        Printer::default().write(&mut out, self, false);
        f.write_str(&out)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let text = if x > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Tracks containers on the current path so self-referencing lists and
/// maps print as `[...]` / `{...}`.
#[derive(Default)]
struct Printer {
    open: HashSet<*const ()>,
}

impl Printer {
    fn write(&mut self, out: &mut String, value: &Value, quoted: bool) {
        match value {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(x) => out.push_str(&format_float(*x)),
            Value::Str(s) if quoted => out.push_str(&quote_str(s)),
            Value::Str(s) => out.push_str(s),
            Value::List(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if !self.open.insert(id) {
                    out.push_str("[...]");
                    return;
                }
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    ensure_sufficient_stack(|| self.write(out, item, true));
                }
                out.push(']');
                self.open.remove(&id);
            }
            Value::Map(entries) => {
                let id = Rc::as_ptr(entries) as *const ();
                if !self.open.insert(id) {
                    out.push_str("{...}");
                    return;
                }
                out.push('{');
                for (i, (key, item)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write(out, &key.to_value(), true);
                    out.push_str(": ");
                    ensure_sufficient_stack(|| self.write(out, item, true));
                }
                out.push('}');
                self.open.remove(&id);
            }
            Value::Function(function) => out.push_str(&format!("<function {}>", function.name)),
            Value::Native(native) => match &native.receiver {
                Some(receiver) => out.push_str(&format!(
                    "<built-in method {} of {} object>",
                    native.name.rsplit('.').next().unwrap_or(&native.name),
                    receiver.type_name()
                )),
                None => out.push_str(&format!("<built-in function {}>", native.name)),
            },
        }
    }
}
