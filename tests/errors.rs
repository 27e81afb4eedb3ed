//! Errors from every stage, their positions and rendered diagnostics.

mod common;

use common::run_program;
use serpent::diagnostic::render_diagnostics;
use serpent::{compile, Error, LexError, NameError, ParseError, RuntimeError};

fn runtime_error(source: &str) -> RuntimeError {
    match run_program(source).result {
        Err(Error::Runtime(error)) => error,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

fn parse_errors(source: &str) -> Vec<ParseError> {
    match compile(source) {
        Err(Error::Parse(errors)) => errors,
        other => panic!("expected parse errors, got {:?}", other),
    }
}

#[test]
fn test_lex_errors_stop_before_parsing() {
    assert!(matches!(compile("x = 1 @ 2\n"), Err(Error::Lex(LexError::UnknownCharacter { found: '@', .. }))));
    assert!(matches!(compile("s = 'open\n"), Err(Error::Lex(LexError::UnterminatedString { .. }))));
    assert!(matches!(
        compile("if True:\n        a = 1\n    b = 2\n"),
        Err(Error::Lex(LexError::InconsistentDedent { width: 4, .. }))
    ));
    assert!(matches!(
        compile("n = 99999999999999999999\n"),
        Err(Error::Lex(LexError::InvalidNumber { .. }))
    ));
}

#[test]
fn test_parser_reports_every_independent_error() {
    let source = "\
x = 1 +
y = 2
def f(a, a):
    return a
while True
    pass
z = 3
";
    let errors = parse_errors(source);
    let lines: Vec<usize> = errors.iter().map(ParseError::line).collect();
    assert_eq!(lines, vec![1, 3, 5]);
    assert!(matches!(
        &errors[1],
        ParseError::InvalidSyntax { message, .. } if message == "duplicate parameter 'a'"
    ));
}

#[test]
fn test_context_errors_are_parse_errors() {
    let errors = parse_errors("break\nreturn 1\ndef f():\n    continue\n");
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert_eq!(errors.len(), 3, "{:?}", messages);
    assert!(messages[0].ends_with("'break' outside loop"));
    assert!(messages[1].ends_with("'return' outside function"));
    assert!(messages[2].ends_with("'continue' outside loop"));
}

#[test]
fn test_runtime_type_errors_name_operator_and_operands() {
    let error = runtime_error("x = 'a' + 1\n");
    assert!(matches!(
        &error,
        RuntimeError::TypeError { message, .. }
            if message == "unsupported operand type(s) for +: 'str' and 'int'"
    ));
    assert!(matches!(runtime_error("x = 1 < 'a'\n"), RuntimeError::TypeError { .. }));
    assert!(matches!(runtime_error("while 0:\n    pass\n"), RuntimeError::TypeError { .. }));
    assert!(matches!(runtime_error("x = 1.5 % 1\n"), RuntimeError::TypeError { .. }));
}

#[test]
fn test_cross_kind_equality_is_never_an_error() {
    let run = run_program("a = 1 == 'x'\nb = None != []\nc = 1 == 1.0\nd = True == 1\n");
    assert!(run.result.is_ok());
    assert_eq!(run.get("a"), serpent::Value::Bool(false));
    assert_eq!(run.get("b"), serpent::Value::Bool(true));
    assert_eq!(run.get("c"), serpent::Value::Bool(false));
    assert_eq!(run.get("d"), serpent::Value::Bool(false));
}

#[test]
fn test_index_and_key_errors() {
    assert!(matches!(runtime_error("xs = [1]\nxs[1]\n"), RuntimeError::IndexError { .. }));
    assert!(matches!(runtime_error("xs = [1]\nxs[-2]\n"), RuntimeError::IndexError { .. }));
    let error = runtime_error("d = {'a': 1}\nd['b']\n");
    assert!(matches!(&error, RuntimeError::KeyError { key, .. } if key == "'b'"));
    assert!(matches!(runtime_error("d = {[1]: 2}\n"), RuntimeError::TypeError { .. }));
}

#[test]
fn test_zero_division_and_overflow() {
    assert!(matches!(runtime_error("x = 1 / 0\n"), RuntimeError::ZeroDivision { .. }));
    assert!(matches!(runtime_error("x = 5 % 0\n"), RuntimeError::ZeroDivision { .. }));
    assert!(matches!(
        runtime_error("x = 9223372036854775807\nx += 1\n"),
        RuntimeError::Overflow { .. }
    ));
}

#[test]
fn test_undefined_name_position() {
    let error = runtime_error("def f():\n    return missing\nf()\n");
    let RuntimeError::Name { error: NameError::Undefined(name), span } = &error else {
        panic!("expected NameError, got {:?}", error);
    };
    assert_eq!(name, "missing");
    assert_eq!((span.line, span.column), (2, 12));
}

#[test]
fn test_arity_mismatch_for_lambda() {
    let error = runtime_error("f = lambda a: a\nf(1, 2)\n");
    assert!(matches!(
        &error,
        RuntimeError::ArityMismatch { name, expected: 1, found: 2, .. } if name == "<lambda>"
    ));
}

#[test]
fn test_builtin_failure_carries_name() {
    let error = runtime_error("xs = []\nxs.pop()\n");
    assert!(matches!(
        &error,
        RuntimeError::BuiltinError { name, message, .. }
            if name == "list.pop" && message == "pop from empty list"
    ));
}

#[test]
fn test_unbounded_recursion_hits_the_limit() {
    let error = runtime_error("def down(n):\n    return down(n + 1)\ndown(0)\n");
    assert!(matches!(error, RuntimeError::RecursionLimitExceeded { limit: 1000, .. }));
}

#[test]
fn test_error_aborts_remaining_statements() {
    let run = run_program("print('one')\nx = 1 / 0\nprint('two')\n");
    assert!(run.result.is_err());
    assert_eq!(run.output, "one\n");
}

#[test]
fn test_rendered_diagnostic_points_at_source() {
    let source = "x = 1\ny = x + nope\n";
    let error = run_program(source).result.unwrap_err();
    let rendered = render_diagnostics(source, "demo.sp", &error.to_diagnostics(), false);
    assert!(rendered.starts_with("error[E0201]: name `nope` is not defined\n"), "{}", rendered);
    assert!(rendered.contains("demo.sp:2:9"), "{}", rendered);
    assert!(rendered.contains("2 | y = x + nope"), "{}", rendered);
    assert!(rendered.contains("^^^^ not found in this scope"), "{}", rendered);
    assert!(rendered.ends_with("error: aborting due to 1 error\n"));
}

#[test]
fn test_parse_diagnostics_render_one_per_error() {
    let source = "x = = 1\ny = )\n";
    let error = compile(source).unwrap_err();
    let rendered = render_diagnostics(source, "demo.sp", &error.to_diagnostics(), false);
    assert_eq!(rendered.matches("error[E0101]").count(), 2, "{}", rendered);
    assert!(rendered.ends_with("error: aborting due to 2 errors\n"));
}
