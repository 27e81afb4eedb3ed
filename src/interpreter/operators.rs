use crate::ast::{BinaryOp, UnaryOp};
use crate::diagnostic::Span;
use crate::interpreter::error::RuntimeError;
use crate::value::{Key, Value};
use std::cmp::Ordering;

fn unsupported(op: BinaryOp, left: &Value, right: &Value, span: Span) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
        span,
    )
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value, span: Span) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq => {
            compare(op, left, right, span)
        }
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And { *a && *b } else { *a || *b })),
            _ => Err(unsupported(op, left, right, span)),
        },
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right, span)
        }
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value, span: Span) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b, span),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, *a, *b, span),
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            if op == BinaryOp::Mod {
                return Err(unsupported(op, left, right, span));
            }
            match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => float_arithmetic(op, a, b, span),
                _ => Err(unsupported(op, left, right, span)),
            }
        }
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::from(joined))
        }
        _ => Err(unsupported(op, left, right, span)),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64, span: Span) -> Result<Value, RuntimeError> {
    let overflow = || RuntimeError::overflow(format!("{} {} {}", a, op.symbol(), b), span);
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err(RuntimeError::zero_division("division by zero", span));
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(RuntimeError::zero_division("integer modulo by zero", span));
            }
            // i64::MIN % -1 is the only overflowing case and its result is 0.
            Ok(Value::Int(a.wrapping_rem(b)))
        }
        _ => Err(unsupported(op, &Value::Int(a), &Value::Int(b), span)),
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64, span: Span) -> Result<Value, RuntimeError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(RuntimeError::zero_division("float division by zero", span));
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(RuntimeError::zero_division("float modulo", span));
            }
            a % b
        }
        _ => return Err(unsupported(op, &Value::Float(a), &Value::Float(b), span)),
    };
    Ok(Value::Float(result))
}

/// Orders two values of comparable kinds: numbers with numbers, strings
/// with strings. `None` means the kinds do not order.
pub fn ordering(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Some(Some(a.cmp(b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (left.as_number()?, right.as_number()?);
            Some(a.partial_cmp(&b))
        }
        _ => None,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value, span: Span) -> Result<Value, RuntimeError> {
    let Some(ordering) = ordering(left, right) else {
        return Err(RuntimeError::type_error(
            format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
            span,
        ));
    };
    // NaN compares false against everything.
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::LessEq => ordering != Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

pub fn unary(op: UnaryOp, operand: &Value, span: Span) -> Result<Value, RuntimeError> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::overflow(format!("-({})", n), span)),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, other) => Err(RuntimeError::type_error(
            format!("bad operand type for unary -: '{}'", other.type_name()),
            span,
        )),
        (UnaryOp::Not, other) => Err(RuntimeError::type_error(
            format!("operand of 'not' must be bool, not '{}'", other.type_name()),
            span,
        )),
    }
}

/// Requires a boolean where a condition is expected.
pub fn truth(value: &Value, context: &str, span: Span) -> Result<bool, RuntimeError> {
    value.as_bool().ok_or_else(|| {
        RuntimeError::type_error(
            format!("{} must be bool, not '{}'", context, value.type_name()),
            span,
        )
    })
}

/// Resolves a possibly negative index against a length.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn int_index(kind: &str, index: &Value, span: Span) -> Result<i64, RuntimeError> {
    index.as_int().ok_or_else(|| {
        RuntimeError::type_error(
            format!("{} indices must be integers, not '{}'", kind, index.type_name()),
            span,
        )
    })
}

fn map_key(index: &Value, span: Span) -> Result<Key, RuntimeError> {
    Key::from_value(index)
        .ok_or_else(|| RuntimeError::type_error(format!("unhashable type: '{}'", index.type_name()), span))
}

pub fn index(target: &Value, index: &Value, span: Span) -> Result<Value, RuntimeError> {
    match target {
        Value::List(items) => {
            let i = int_index("list", index, span)?;
            let items = items.borrow();
            normalize_index(i, items.len())
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| RuntimeError::index_error("list index out of range", span))
        }
        Value::Str(s) => {
            let i = int_index("string", index, span)?;
            normalize_index(i, s.chars().count())
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::from(c.to_string()))
                .ok_or_else(|| RuntimeError::index_error("string index out of range", span))
        }
        Value::Map(entries) => {
            let key = map_key(index, span)?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::key_error(index.repr(), span))
        }
        other => Err(RuntimeError::type_error(
            format!("'{}' object is not subscriptable", other.type_name()),
            span,
        )),
    }
}

pub fn set_index(target: &Value, index: &Value, value: Value, span: Span) -> Result<(), RuntimeError> {
    match target {
        Value::List(items) => {
            let i = int_index("list", index, span)?;
            let mut items = items.borrow_mut();
            let slot = normalize_index(i, items.len())
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| RuntimeError::index_error("list assignment index out of range", span))?;
            *slot = value;
            Ok(())
        }
        Value::Map(entries) => {
            let key = map_key(index, span)?;
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(
            format!("'{}' object does not support item assignment", other.type_name()),
            span,
        )),
    }
}

/// The elements a `for` loop walks, captured up front: list items, mapping
/// keys in insertion order, or string characters.
pub fn iterate(value: &Value, span: Span) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Map(entries) => Ok(entries.borrow().keys().map(Key::to_value).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        other => Err(RuntimeError::type_error(
            format!("'{}' object is not iterable", other.type_name()),
            span,
        )),
    }
}
