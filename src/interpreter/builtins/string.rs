//! `str.*` methods. Positions are counted in characters, not bytes.

use super::{expect_args, expect_args_between, list_arg, str_arg, BuiltinFailure, BuiltinRegistry};
use crate::value::Value;

fn join(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "join");
    let separator = str_arg(args, 0, "join")?;
    let items = list_arg(args, 1, "join")?.borrow();
    let mut parts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Str(s) => parts.push(s.clone()),
            other => {
                return Err(BuiltinFailure::new(format!(
                    "sequence item {}: expected str instance, {} found",
                    i,
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::from(parts.join(separator)))
}

fn split(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 2, "split");
    let text = str_arg(args, 0, "split")?;
    let pieces: Vec<Value> = match args.get(1) {
        None | Some(Value::None) => text.split_whitespace().map(Value::from).collect(),
        Some(_) => {
            let separator = str_arg(args, 1, "split")?;
            if separator.is_empty() {
                return Err(BuiltinFailure::new("empty separator"));
            }
            text.split(separator).map(Value::from).collect()
        }
    };
    Ok(Value::list(pieces))
}

fn upper(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "upper");
    Ok(Value::from(str_arg(args, 0, "upper")?.to_uppercase()))
}

fn lower(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "lower");
    Ok(Value::from(str_arg(args, 0, "lower")?.to_lowercase()))
}

fn strip(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 2, "strip");
    let text = str_arg(args, 0, "strip")?;
    let stripped = match args.get(1) {
        None | Some(Value::None) => text.trim(),
        Some(_) => {
            let chars: Vec<char> = str_arg(args, 1, "strip")?.chars().collect();
            text.trim_matches(chars.as_slice())
        }
    };
    Ok(Value::from(stripped))
}

fn replace(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 3, "replace");
    let text = str_arg(args, 0, "replace")?;
    let old = str_arg(args, 1, "replace")?;
    let new = str_arg(args, 2, "replace")?;
    Ok(Value::from(text.replace(old, new)))
}

fn startswith(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "startswith");
    let text = str_arg(args, 0, "startswith")?;
    Ok(Value::Bool(text.starts_with(str_arg(args, 1, "startswith")?)))
}

fn endswith(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "endswith");
    let text = str_arg(args, 0, "endswith")?;
    Ok(Value::Bool(text.ends_with(str_arg(args, 1, "endswith")?)))
}

/// Character index of the first occurrence, or -1.
fn find(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "find");
    let text = str_arg(args, 0, "find")?;
    let needle = str_arg(args, 1, "find")?;
    let position = text
        .find(needle)
        .map_or(-1, |byte| text[..byte].chars().count() as i64);
    Ok(Value::Int(position))
}

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register("str.join", join);
    registry.register("str.split", split);
    registry.register("str.upper", upper);
    registry.register("str.lower", lower);
    registry.register("str.strip", strip);
    registry.register("str.replace", replace);
    registry.register("str.startswith", startswith);
    registry.register("str.endswith", endswith);
    registry.register("str.find", find);
}
