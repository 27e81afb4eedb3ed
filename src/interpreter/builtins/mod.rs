//! Builtin registry and the standard library.
//!
//! Free functions are registered under their plain name (`len`), methods
//! under `<type>.<name>` (`list.append`) and receive the receiver as their
//! first argument. Groups:
//! - **io**: printing, input, files, environment variables
//! - **types**: type inspection and conversion
//! - **array**: list helpers and `list.*` methods
//! - **string**: `str.*` methods
//! - **object**: `dict.*` methods
//! - **math**: numeric helpers
//! - **json**: encoding and decoding

mod array;
mod io;
mod json;
mod math;
mod object;
mod string;
mod types;

use crate::interpreter::environment::Environment;
use crate::value::{Key, ListRef, MapRef, NativeFunction, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use thiserror::Error;

/// Why a builtin refused its arguments or failed while running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BuiltinFailure {
    pub message: String,
}

impl BuiltinFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type BuiltinFn = Rc<dyn Fn(&[Value]) -> Result<Value, BuiltinFailure>>;

/// Where `print` and `input` prompts are written.
pub type Output = Rc<RefCell<dyn Write>>;

#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    functions: IndexMap<Rc<str>, BuiltinFn>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard library, printing to stdout.
    pub fn standard() -> Self {
        Self::standard_with_output(Rc::new(RefCell::new(std::io::stdout())))
    }

    pub fn standard_with_output(output: Output) -> Self {
        let mut registry = Self::new();
        io::register(&mut registry, output);
        types::register(&mut registry);
        array::register(&mut registry);
        string::register(&mut registry);
        object::register(&mut registry);
        math::register(&mut registry);
        json::register(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, BuiltinFailure> + 'static,
    {
        self.functions.insert(Rc::from(name), Rc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, BuiltinFailure> {
        let function = self
            .get(name)
            .ok_or_else(|| BuiltinFailure::new(format!("unknown builtin '{}'", name)))?;
        function(args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|name| &**name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Binds every free function as a `NativeFunction` in `env`.
    pub fn install(&self, env: &Environment) {
        for name in self.functions.keys().filter(|name| !name.contains('.')) {
            env.define(name.clone(), Value::Native(Rc::new(NativeFunction::free(name.clone()))));
        }
    }

    /// Looks up `<type>.<name>` for `receiver` and binds it.
    pub fn method(&self, receiver: &Value, name: &str) -> Option<Value> {
        let qualified = format!("{}.{}", receiver.type_name(), name);
        let (key, _) = self.functions.get_key_value(qualified.as_str())?;
        Some(Value::Native(Rc::new(NativeFunction::bound(key.clone(), receiver.clone()))))
    }
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

macro_rules! expect_args {
    ($args:expr, $n:expr, $name:expr) => {
        if $args.len() != $n {
            return Err(BuiltinFailure::new(format!(
                "{}() takes {} argument(s) but {} were given",
                $name,
                $n,
                $args.len()
            )));
        }
    };
}

macro_rules! expect_args_between {
    ($args:expr, $min:expr, $max:expr, $name:expr) => {
        if !($min..=$max).contains(&$args.len()) {
            return Err(BuiltinFailure::new(format!(
                "{}() takes from {} to {} arguments but {} were given",
                $name,
                $min,
                $max,
                $args.len()
            )));
        }
    };
}

pub(crate) use expect_args;
pub(crate) use expect_args_between;

fn wrong_type(name: &str, position: usize, expected: &str, found: &Value) -> BuiltinFailure {
    BuiltinFailure::new(format!(
        "{}() argument {} must be {}, not '{}'",
        name,
        position + 1,
        expected,
        found.type_name()
    ))
}

pub(crate) fn str_arg<'a>(args: &'a [Value], position: usize, name: &str) -> Result<&'a str, BuiltinFailure> {
    match &args[position] {
        Value::Str(s) => Ok(s),
        other => Err(wrong_type(name, position, "str", other)),
    }
}

pub(crate) fn int_arg(args: &[Value], position: usize, name: &str) -> Result<i64, BuiltinFailure> {
    match &args[position] {
        Value::Int(n) => Ok(*n),
        other => Err(wrong_type(name, position, "int", other)),
    }
}

pub(crate) fn number_arg(args: &[Value], position: usize, name: &str) -> Result<f64, BuiltinFailure> {
    args[position]
        .as_number()
        .ok_or_else(|| wrong_type(name, position, "a number", &args[position]))
}

pub(crate) fn list_arg<'a>(args: &'a [Value], position: usize, name: &str) -> Result<&'a ListRef, BuiltinFailure> {
    match &args[position] {
        Value::List(items) => Ok(items),
        other => Err(wrong_type(name, position, "list", other)),
    }
}

pub(crate) fn map_arg<'a>(args: &'a [Value], position: usize, name: &str) -> Result<&'a MapRef, BuiltinFailure> {
    match &args[position] {
        Value::Map(entries) => Ok(entries),
        other => Err(wrong_type(name, position, "dict", other)),
    }
}

pub(crate) fn key_arg(args: &[Value], position: usize) -> Result<Key, BuiltinFailure> {
    Key::from_value(&args[position])
        .ok_or_else(|| BuiltinFailure::new(format!("unhashable type: '{}'", args[position].type_name())))
}
