//! Printing, input, files and environment variables.

use super::{expect_args, expect_args_between, str_arg, BuiltinFailure, BuiltinRegistry, Output};
use crate::value::Value;
use std::io::BufRead;

fn io_failure(name: &str, error: std::io::Error) -> BuiltinFailure {
    BuiltinFailure::new(format!("{}: {}", name, error))
}

fn print(output: &Output, args: &[Value]) -> Result<Value, BuiltinFailure> {
    let line: Vec<String> = args.iter().map(Value::to_string).collect();
    let mut sink = output.borrow_mut();
    writeln!(sink, "{}", line.join(" ")).map_err(|e| io_failure("print", e))?;
    sink.flush().map_err(|e| io_failure("print", e))?;
    Ok(Value::None)
}

fn input(output: &Output, args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 0, 1, "input");
    if !args.is_empty() {
        let mut sink = output.borrow_mut();
        write!(sink, "{}", args[0]).map_err(|e| io_failure("input", e))?;
        sink.flush().map_err(|e| io_failure("input", e))?;
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| io_failure("input", e))?;
    Ok(Value::from(line.trim_end_matches(['\n', '\r'])))
}

fn read_file(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 1, "read_file");
    let path = str_arg(args, 0, "read_file")?;
    std::fs::read_to_string(path)
        .map(Value::from)
        .map_err(|e| BuiltinFailure::new(format!("cannot read '{}': {}", path, e)))
}

fn write_file(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args!(args, 2, "write_file");
    let path = str_arg(args, 0, "write_file")?;
    let contents = str_arg(args, 1, "write_file")?;
    std::fs::write(path, contents)
        .map_err(|e| BuiltinFailure::new(format!("cannot write '{}': {}", path, e)))?;
    Ok(Value::None)
}

fn getenv(args: &[Value]) -> Result<Value, BuiltinFailure> {
    expect_args_between!(args, 1, 2, "getenv");
    let name = str_arg(args, 0, "getenv")?;
    match std::env::var(name) {
        Ok(value) => Ok(Value::from(value)),
        Err(_) => Ok(args.get(1).cloned().unwrap_or(Value::None)),
    }
}

pub(super) fn register(registry: &mut BuiltinRegistry, output: Output) {
    let sink = output.clone();
    registry.register("print", move |args| print(&sink, args));
    registry.register("input", move |args| input(&output, args));
    registry.register("read_file", read_file);
    registry.register("write_file", write_file);
    registry.register("getenv", getenv);
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_print_joins_with_spaces() {
        let (registry, buffer) = capturing();
        registry
            .call("print", &[Value::str("a"), Value::Int(1), Value::list(vec![Value::str("b")])])
            .unwrap();
        registry.call("print", &[]).unwrap();
        assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "a 1 ['b']\n\n");
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("serpent-io-{}.txt", std::process::id()));
        let path_value = Value::from(path.to_string_lossy().into_owned());
        call("write_file", &[path_value.clone(), Value::str("line one\n")]).unwrap();
        assert_eq!(call("read_file", &[path_value]), Ok(Value::str("line one\n")));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_missing_file_fails() {
        let failure = call("read_file", &[Value::str("/definitely/not/here.txt")]).unwrap_err();
        assert!(failure.message.starts_with("cannot read '/definitely/not/here.txt'"));
    }

    #[test]
    fn test_getenv_default() {
        assert_eq!(
            call("getenv", &[Value::str("SERPENT_SURELY_UNSET_VAR"), Value::Int(3)]),
            Ok(Value::Int(3))
        );
        assert_eq!(call("getenv", &[Value::str("SERPENT_SURELY_UNSET_VAR")]), Ok(Value::None));
    }
}
