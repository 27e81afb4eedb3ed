//! Numeric helpers.

use super::types::float_to_int;
use super::{expect_args, expect_args_between, int_arg, number_arg, BuiltinFailure, BuiltinRegistry};
use crate::value::Value;

/// A float-to-int rounding builtin; ints pass through untouched.
macro_rules! rounding {
    ($name:ident, $op:ident) => {
        fn $name(args: &[Value]) -> Result<Value, BuiltinFailure> {
            expect_args!(args, 1, stringify!($op));
            match &args[0] {
                Value::Int(n) => Ok(Value::Int(*n)),
                _ => {
                    let x = number_arg(args, 0, stringify!($op))?;
                    float_to_int(x.$op(), stringify!($op)).map(Value::Int)
                }
            }
        }
    };
}

rounding!(floor, floor);
rounding!(ceil, ceil);

fn abs(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "abs");
    match &args[0] {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| BuiltinFailure::new("abs() overflowed")),
        _ => Ok(Value::Float(number_arg(args, 0, "abs")?.abs())),
    }
}

/// `round(x)` rounds half to even and yields an int; `round(x, n)` keeps
/// `n` decimal places and yields a float.
fn round(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 2, "round");
    if args.len() == 1 {
        return match &args[0] {
            Value::Int(n) => Ok(Value::Int(*n)),
            _ => float_to_int(number_arg(args, 0, "round")?.round_ties_even(), "round").map(Value::Int),
        };
    }
    let digits = int_arg(args, 1, "round")?;
    if let (Value::Int(n), true) = (&args[0], digits >= 0) {
        return Ok(Value::Int(*n));
    }
    let x = number_arg(args, 0, "round")?;
    let scale = 10f64.powi(digits.clamp(-308, 308) as i32);
    let rounded = (x * scale).round_ties_even() / scale;
    match &args[0] {
        Value::Int(_) => float_to_int(rounded, "round").map(Value::Int),
        _ if rounded.is_finite() => Ok(Value::Float(rounded)),
        _ => Ok(Value::Float(x)),
    }
}

fn sqrt(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "sqrt");
    let x = number_arg(args, 0, "sqrt")?;
    if x < 0.0 {
        return Err(BuiltinFailure::new("math domain error"));
    }
    Ok(Value::Float(x.sqrt()))
}

/// Int to a non-negative int power stays exact; anything else is a float.
fn pow(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "pow");
    if let (Value::Int(base), Value::Int(exp)) = (&args[0], &args[1]) {
        if *exp >= 0 {
            return u32::try_from(*exp)
                .ok()
                .and_then(|exp| base.checked_pow(exp))
                .map(Value::Int)
                .ok_or_else(|| BuiltinFailure::new("pow() overflowed"));
        }
    }
    let base = number_arg(args, 0, "pow")?;
    let exp = number_arg(args, 1, "pow")?;
    Ok(Value::Float(base.powf(exp)))
}

fn random(args: &[Value]) -> Result<Value, BuiltinFailure> {
    use rand::Rng;
    expect_args!(args, 0, "random");
    Ok(Value::Float(rand::thread_rng().r#gen::<f64>()))
}

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register("abs", abs);
    registry.register("floor", floor);
    registry.register("ceil", ceil);
    registry.register("round", round);
    registry.register("sqrt", sqrt);
    registry.register("pow", pow);
    registry.register("random", random);
}
