//! `dict.*` methods.

use super::{expect_args, expect_args_between, key_arg, map_arg, BuiltinFailure, BuiltinRegistry};
use crate::value::{Key, Value};

fn keys(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "keys");
    let entries = map_arg(args, 0, "keys")?.borrow();
    Ok(Value::list(entries.keys().map(Key::to_value).collect()))
}

fn values(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "values");
    let entries = map_arg(args, 0, "values")?.borrow();
    Ok(Value::list(entries.values().cloned().collect()))
}

/// Each entry as a two-element `[key, value]` list.
fn items(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "items");
    let entries = map_arg(args, 0, "items")?.borrow();
    let pairs = entries
        .iter()
        .map(|(key, value)| Value::list(vec![key.to_value(), value.clone()]))
        .collect();
    Ok(Value::list(pairs))
}

fn get(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 2, 3, "get");
    let entries = map_arg(args, 0, "get")?.borrow();
    let key = key_arg(args, 1)?;
    Ok(entries
        .get(&key)
        .or_else(|| args.get(2))
        .cloned()
        .unwrap_or(Value::None))
}

fn pop(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 2, 3, "pop");
    let mut entries = map_arg(args, 0, "pop")?.borrow_mut();
    let key = key_arg(args, 1)?;
    match entries.shift_remove(&key) {
        Some(value) => Ok(value),
        None => args
            .get(2)
            .cloned()
            .ok_or_else(|| BuiltinFailure::new(format!("key not found: {}", args[1].repr()))),
    }
}

fn copy(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "copy");
    Ok(Value::map(map_arg(args, 0, "copy")?.borrow().clone()))
}

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register("dict.keys", keys);
    registry.register("dict.values", values);
    registry.register("dict.items", items);
    registry.register("dict.get", get);
    registry.register("dict.pop", pop);
    registry.register("dict.copy", copy);
}
