//! List helpers and `list.*` methods.

use super::{
    expect_args, expect_args_between, int_arg, list_arg, BuiltinFailure, BuiltinRegistry,
};
use crate::interpreter::operators::{normalize_index, ordering};
use crate::value::{Key, Value};
use std::cmp::Ordering;

/// Upper bound on the number of items `range` materialises.
const MAX_RANGE_LEN: i128 = 10_000_000;

/// Items of a list, a string's characters or a dict's keys, copied out.
fn iterable(value: &Value, name: &str) -> Result<Vec<Value>, BuiltinFailure> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Map(entries) => Ok(entries.borrow().keys().map(Key::to_value).collect()),
        other => Err(BuiltinFailure::new(format!(
            "{}() argument must be iterable, not '{}'",
            name,
            other.type_name()
        ))),
    }
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, BuiltinFailure> {
    match ordering(a, b) {
        Some(order) => Ok(order.unwrap_or(Ordering::Equal)),
        None => Err(BuiltinFailure::new(format!(
            "'<' not supported between instances of '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// Stable sort that reports the first incomparable pair instead of panicking.
fn sort_values(items: &mut [Value]) -> Result<(), BuiltinFailure> {
    let mut failure = None;
    items.sort_by(|a, b| match compare(a, b) {
        Ok(order) => order,
        Err(e) => {
            failure.get_or_insert(e);
            Ordering::Equal
        }
    });
    failure.map_or(Ok(()), Err)
}

fn range(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 3, "range");
    let (start, stop) = match args.len() {
        1 => (0, int_arg(args, 0, "range")?),
        _ => (int_arg(args, 0, "range")?, int_arg(args, 1, "range")?),
    };
    let step = if args.len() == 3 { int_arg(args, 2, "range")? } else { 1 };
    if step == 0 {
        return Err(BuiltinFailure::new("range() arg 3 must not be zero"));
    }

    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 {
        (stop - start + step - 1).div_euclid(step).max(0)
    } else {
        (start - stop - step - 1).div_euclid(-step).max(0)
    };
    if len > MAX_RANGE_LEN {
        return Err(BuiltinFailure::new(format!("range() would produce {} items", len)));
    }
    // Every produced item lies between start and stop, so it fits in i64.
    let items = (0..len).map(|i| Value::Int((start + i * step) as i64)).collect();
    Ok(Value::list(items))
}

fn sum(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "sum");
    let items = list_arg(args, 0, "sum")?.borrow();
    let mut total = Value::Int(0);
    for item in items.iter() {
        total = match (&total, item) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| BuiltinFailure::new("sum() overflowed"))?,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                Value::Float(total.as_number().unwrap_or_default() + item.as_number().unwrap_or_default())
            }
            (_, other) => {
                return Err(BuiltinFailure::new(format!(
                    "unsupported operand type(s) for +: '{}' and '{}'",
                    total.type_name(),
                    other.type_name()
                )))
            }
        };
    }
    Ok(total)
}

/// `min`/`max` over one iterable argument or over all the arguments.
fn extreme(args: &[Value], name: &str, wanted: Ordering) -> Result<Value, BuiltinFailure> {
    let items = match args {
        [] => {
            return Err(BuiltinFailure::new(format!(
                "{}() expected at least 1 argument, got 0",
                name
            )))
        }
        [single] => iterable(single, name)?,
        many => many.to_vec(),
    };
    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| BuiltinFailure::new(format!("{}() arg is an empty sequence", name)))?;
    for item in iter {
        if compare(&item, &best)? == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn sorted(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "sorted");
    let mut items = iterable(&args[0], "sorted")?;
    sort_values(&mut items)?;
    Ok(Value::list(items))
}

fn reversed(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "reversed");
    let mut items = iterable(&args[0], "reversed")?;
    items.reverse();
    Ok(Value::list(items))
}

fn append(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "append");
    list_arg(args, 0, "append")?.borrow_mut().push(args[1].clone());
    Ok(Value::None)
}

fn pop(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 2, "pop");
    let mut items = list_arg(args, 0, "pop")?.borrow_mut();
    if items.is_empty() {
        return Err(BuiltinFailure::new("pop from empty list"));
    }
    let position = if args.len() == 2 { int_arg(args, 1, "pop")? } else { -1 };
    let at = normalize_index(position, items.len())
        .ok_or_else(|| BuiltinFailure::new("pop index out of range"))?;
    Ok(items.remove(at))
}

fn insert(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 3, "insert");
    let position = int_arg(args, 1, "insert")?;
    let mut items = list_arg(args, 0, "insert")?.borrow_mut();
    let len = items.len() as i64;
    // Out-of-range positions clamp to the ends.
    let at = if position < 0 { (len + position).max(0) } else { position.min(len) };
    items.insert(at as usize, args[2].clone());
    Ok(Value::None)
}

fn extend(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "extend");
    let target = list_arg(args, 0, "extend")?;
    // Copy first: `xs.extend(xs)` borrows the same cell twice.
    let extra = iterable(&args[1], "extend")?;
    target.borrow_mut().extend(extra);
    Ok(Value::None)
}

fn reverse(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "reverse");
    list_arg(args, 0, "reverse")?.borrow_mut().reverse();
    Ok(Value::None)
}

fn sort(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "sort");
    let target = list_arg(args, 0, "sort")?;
    let mut items = target.borrow().clone();
    sort_values(&mut items)?;
    *target.borrow_mut() = items;
    Ok(Value::None)
}

fn index(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "index");
    let items = list_arg(args, 0, "index")?.borrow();
    items
        .iter()
        .position(|item| item == &args[1])
        .map(|at| Value::Int(at as i64))
        .ok_or_else(|| BuiltinFailure::new(format!("{} is not in list", args[1].repr())))
}

fn copy(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "copy");
    Ok(Value::list(list_arg(args, 0, "copy")?.borrow().clone()))
}

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register("range", range);
    registry.register("sum", sum);
    registry.register("min", |args| extreme(args, "min", Ordering::Less));
    registry.register("max", |args| extreme(args, "max", Ordering::Greater));
    registry.register("sorted", sorted);
    registry.register("reversed", reversed);

    registry.register("list.append", append);
    registry.register("list.pop", pop);
    registry.register("list.insert", insert);
    registry.register("list.extend", extend);
    registry.register("list.reverse", reverse);
    registry.register("list.sort", sort);
    registry.register("list.index", index);
    registry.register("list.copy", copy);
}
