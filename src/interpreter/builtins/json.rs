//! JSON encoding and decoding.

use super::{expect_args, expect_args_between, int_arg, str_arg, BuiltinFailure, BuiltinRegistry};
use crate::value::{format_float, Key, Value};
use indexmap::IndexMap;

/// Containers nested deeper than this are rejected; it also stops
/// self-referencing lists from recursing forever.
const MAX_DEPTH: usize = 256;

struct Encoder {
    /// Spaces per level; `None` renders everything on one line.
    indent: Option<usize>,
}

impl Encoder {
    fn encode(&self, out: &mut String, value: &Value, level: usize) -> Result<(), BuiltinFailure> {
        if level > MAX_DEPTH {
            return Err(BuiltinFailure::new(
                "json_encode(): nesting too deep (circular reference?)",
            ));
        }
        match value {
            Value::None => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(x) if x.is_finite() => out.push_str(&format_float(*x)),
            Value::Float(x) => {
                return Err(BuiltinFailure::new(format!(
                    "json_encode(): float {} is not JSON compliant",
                    format_float(*x)
                )))
            }
            Value::Str(s) => push_string(out, s),
            Value::List(items) => {
                let items = items.borrow();
                if items.is_empty() {
                    out.push_str("[]");
                    return Ok(());
                }
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    self.separate(out, i, level + 1);
                    self.encode(out, item, level + 1)?;
                }
                self.close(out, ']', level);
            }
            Value::Map(entries) => {
                let entries = entries.borrow();
                if entries.is_empty() {
                    out.push_str("{}");
                    return Ok(());
                }
                out.push('{');
                for (i, (key, item)) in entries.iter().enumerate() {
                    self.separate(out, i, level + 1);
                    push_string(out, &key_text(key));
                    out.push_str(": ");
                    self.encode(out, item, level + 1)?;
                }
                self.close(out, '}', level);
            }
            Value::Function(_) | Value::Native(_) => {
                return Err(BuiltinFailure::new(format!(
                    "json_encode(): object of type '{}' is not JSON serializable",
                    value.type_name()
                )))
            }
        }
        Ok(())
    }

    fn separate(&self, out: &mut String, position: usize, level: usize) {
        match self.indent {
            None if position > 0 => out.push_str(", "),
            None => {}
            Some(width) => {
                if position > 0 {
                    out.push(',');
                }
                out.push('\n');
                out.push_str(&" ".repeat(level * width));
            }
        }
    }

    fn close(&self, out: &mut String, bracket: char, level: usize) {
        if let Some(width) = self.indent {
            out.push('\n');
            out.push_str(&" ".repeat(level * width));
        }
        out.push(bracket);
    }
}

/// Object keys are always strings in JSON.
fn key_text(key: &Key) -> String {
    match key {
        Key::None => "null".to_string(),
        Key::Bool(b) => b.to_string(),
        Key::Int(n) => n.to_string(),
        Key::Str(s) => s.to_string(),
    }
}

fn push_string(out: &mut String, s: &str) {
    // Serialising a &str cannot fail.
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}

fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(n) => Value::Int(n),
            None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::from(s),
        serde_json::Value::Array(items) => Value::list(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(fields) => {
            let entries: IndexMap<Key, Value> = fields
                .into_iter()
                .map(|(name, field)| (Key::from(name.as_str()), from_json(field)))
                .collect();
            Value::map(entries)
        }
    }
}

fn json_encode(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 2, "json_encode");
    let indent = match args.get(1) {
        None | Some(Value::None) => None,
        Some(_) => {
            let width = int_arg(args, 1, "json_encode")?;
            let width = usize::try_from(width)
                .map_err(|_| BuiltinFailure::new("json_encode(): indent must not be negative"))?;
            Some(width)
        }
    };
    let mut out = String::new();
    Encoder { indent }.encode(&mut out, &args[0], 0)?;
    Ok(Value::from(out))
}

fn json_decode(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "json_decode");
    let text = str_arg(args, 0, "json_decode")?;
    serde_json::from_str::<serde_json::Value>(text)
        .map(from_json)
        .map_err(|e| BuiltinFailure::new(format!("json_decode(): {}", e)))
}

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register("json_encode", json_encode);
    registry.register("json_decode", json_decode);
}
