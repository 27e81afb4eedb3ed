//! Type inspection and conversion.

use super::{expect_args, expect_args_between, BuiltinFailure, BuiltinRegistry};
use crate::value::{format_float, Key, Value};

/// Truncates a float towards zero, refusing values with no `i64` image.
pub(super) fn float_to_int(x: f64, name: &str) -> Result<i64, BuiltinFailure> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if !x.is_finite() || x < i64::MIN as f64 || x >= i64::MAX as f64 {
        return Err(BuiltinFailure::new(format!(
            "{}(): cannot convert float {} to integer",
            name,
            format_float(x)
        )));
    }
    Ok(x.trunc() as i64)
}

fn type_of(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "type");
    Ok(Value::str(args[0].type_name()))
}

fn to_str(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 0, 1, "str");
    Ok(args.first().map_or_else(|| Value::str(""), |value| Value::from(value.to_string())))
}

fn repr(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "repr");
    Ok(Value::from(args[0].repr()))
}

fn to_int(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 0, 1, "int");
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(x) => float_to_int(*x, "int").map(Value::Int),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            BuiltinFailure::new(format!("invalid literal for int() with base 10: {}", value.repr()))
        }),
        other => Err(BuiltinFailure::new(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 0, 1, "float");
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| BuiltinFailure::new(format!("could not convert string to float: {}", value.repr()))),
        other => Err(BuiltinFailure::new(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_bool(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 0, 1, "bool");
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn length(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "len");
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        other => {
            return Err(BuiltinFailure::new(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| BuiltinFailure::new("len() result does not fit in an int"))
}

fn to_list(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 0, 1, "list");
    let Some(value) = args.first() else {
        return Ok(Value::list(Vec::new()));
    };
    let items = match value {
        Value::List(items) => items.borrow().clone(),
        Value::Str(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        Value::Map(entries) => entries.borrow().keys().map(Key::to_value).collect(),
        other => {
            return Err(BuiltinFailure::new(format!(
                "'{}' object is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(Value::list(items))
}

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register("type", type_of);
    registry.register("str", to_str);
    registry.register("repr", repr);
    registry.register("int", to_int);
    registry.register("float", to_float);
    registry.register("bool", to_bool);
    registry.register("len", length);
    registry.register("list", to_list);
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(call("type", &[Value::Int(1)]), Ok(Value::str("int")));
        assert_eq!(call("type", &[Value::None]), Ok(Value::str("NoneType")));
        assert_eq!(call("type", &[list(&[])]), Ok(Value::str("list")));
    }

    #[test]
    fn test_str_and_repr() {
        assert_eq!(call("str", &[Value::Float(2.0)]), Ok(Value::str("2.0")));
        assert_eq!(call("str", &[Value::str("x")]), Ok(Value::str("x")));
        assert_eq!(call("repr", &[Value::str("x")]), Ok(Value::str("'x'")));
        assert_eq!(call("str", &[]), Ok(Value::str("")));
    }

    #[test]
    fn test_int_conversion() {
        assert_eq!(call("int", &[Value::str(" 42 ")]), Ok(Value::Int(42)));
        assert_eq!(call("int", &[Value::Float(-3.9)]), Ok(Value::Int(-3)));
        assert_eq!(call("int", &[Value::Bool(true)]), Ok(Value::Int(1)));
        assert_eq!(
            call("int", &[Value::str("4.5")]),
            Err(BuiltinFailure::new("invalid literal for int() with base 10: '4.5'"))
        );
        assert!(call("int", &[Value::Float(f64::INFINITY)]).is_err());
        assert!(call("int", &[Value::Float(1e19)]).is_err());
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(call("float", &[Value::Int(3)]), Ok(Value::Float(3.0)));
        assert_eq!(call("float", &[Value::str("2.5")]), Ok(Value::Float(2.5)));
        assert!(call("float", &[Value::str("abc")]).is_err());
    }

    #[test]
    fn test_bool_uses_truthiness() {
        assert_eq!(call("bool", &[Value::str("")]), Ok(Value::Bool(false)));
        assert_eq!(call("bool", &[list(&[0])]), Ok(Value::Bool(true)));
        assert_eq!(call("bool", &[]), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", &[Value::str("héllo")]), Ok(Value::Int(5)));
        assert_eq!(call("len", &[list(&[1, 2, 3])]), Ok(Value::Int(3)));
        assert_eq!(
            call("len", &[Value::Int(3)]),
            Err(BuiltinFailure::new("object of type 'int' has no len()"))
        );
    }

    #[test]
    fn test_list_copies() {
        let original = list(&[1, 2]);
        let copy = call("list", &[original.clone()]).unwrap();
        assert_eq!(copy, original);
        if let Value::List(items) = &copy {
            items.borrow_mut().push(Value::Int(3));
        }
        assert_eq!(original.to_string(), "[1, 2]");
        assert_eq!(call("list", &[Value::str("ab")]).unwrap().to_string(), "['a', 'b']");
    }
}
