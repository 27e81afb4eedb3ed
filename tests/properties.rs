//! Property-based tests over generated sources and values.

mod common;

use common::run_program;
use proptest::prelude::*;
use serpent::{compile, tokenize, Error, ParseError, RuntimeError, Value};

// ============================================================================
// Strategies
// ============================================================================

fn arb_ident() -> impl Strategy<Value = String> {
    prop_oneof![Just("a"), Just("b"), Just("total"), Just("xs"), Just("name")].prop_map(String::from)
}

fn arb_atom() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..1000).prop_map(|n| n.to_string()),
        (0u32..100, 0u32..100).prop_map(|(w, f)| format!("{}.{}", w, f)),
        "[a-z ]{0,8}".prop_map(|s| format!("'{}'", s)),
        Just("True".to_string()),
        Just("None".to_string()),
        arb_ident(),
    ]
}

fn arb_expr() -> impl Strategy<Value = String> {
    let binop = prop_oneof![Just("+"), Just("-"), Just("*"), Just("=="), Just("<"), Just("and")];
    prop_oneof![
        arb_atom(),
        (arb_atom(), binop, arb_atom()).prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
        prop::collection::vec(arb_atom(), 0..4).prop_map(|items| format!("[{}]", items.join(", "))),
        (arb_ident(), prop::collection::vec(arb_atom(), 0..3))
            .prop_map(|(f, args)| format!("{}({})", f, args.join(", "))),
    ]
}

fn arb_simple_stmt() -> impl Strategy<Value = String> {
    prop_oneof![
        (arb_ident(), arb_expr()).prop_map(|(name, value)| format!("{} = {}", name, value)),
        (arb_ident(), arb_expr()).prop_map(|(name, value)| format!("{} += {}", name, value)),
        arb_expr(),
        Just("pass".to_string()),
    ]
}

fn indented(header: String, body: Vec<Vec<String>>) -> Vec<String> {
    let mut lines = vec![header];
    lines.extend(body.into_iter().flatten().map(|line| format!("    {}", line)));
    lines
}

/// A statement as its source lines, relative to its own indentation.
fn arb_stmt() -> impl Strategy<Value = Vec<String>> {
    arb_simple_stmt()
        .prop_map(|line| vec![line])
        .prop_recursive(3, 32, 4, |inner| {
            let body = prop::collection::vec(inner, 1..4);
            prop_oneof![
                (arb_expr(), body.clone()).prop_map(|(cond, body)| indented(format!("if {}:", cond), body)),
                (arb_expr(), body.clone())
                    .prop_map(|(cond, body)| indented(format!("while {}:", cond), body)),
                (arb_ident(), arb_expr(), body.clone())
                    .prop_map(|(var, iter, body)| indented(format!("for {} in {}:", var, iter), body)),
                (arb_ident(), body).prop_map(|(name, body)| indented(format!("def {}(p, q):", name), body)),
            ]
        })
}

fn arb_program() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_stmt(), 1..6).prop_map(|stmts| stmts.into_iter().flatten().collect())
}

fn arb_arith_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("+"), Just("-"), Just("*"), Just("/"), Just("%")]
}

fn join_lines(lines: &[String]) -> String {
    let mut source = lines.join("\n");
    source.push('\n');
    source
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn lexer_never_panics_and_errors_point_into_source(source in "[a-z0-9 =+():\\n\\t'\"#@$\\[\\]{}.,-]{0,80}") {
        if let Err(error) = tokenize(&source) {
            let lines = source.split('\n').count();
            prop_assert!(error.line() >= 1 && error.line() <= lines, "{:?} in {:?}", error, source);
            prop_assert!(error.column() >= 1);
        }
    }

    #[test]
    fn generated_programs_parse(lines in arb_program()) {
        let source = join_lines(&lines);
        let result = compile(&source);
        prop_assert!(result.is_ok(), "{:?}\n{}", result.err(), source);
    }

    #[test]
    fn parse_errors_point_at_the_broken_line(lines in arb_program(), pick in any::<prop::sample::Index>()) {
        let mut lines = lines;
        let broken = pick.index(lines.len());
        let indent: String = lines[broken].chars().take_while(|c| *c == ' ').collect();
        lines[broken] = format!("{}x = = 1", indent);
        let source = join_lines(&lines);
        match compile(&source) {
            Err(Error::Parse(errors)) => {
                let first: &ParseError = &errors[0];
                prop_assert_eq!(first.line(), broken + 1, "{:?}\n{}", errors, source);
            }
            other => prop_assert!(false, "expected parse errors, got {:?}\n{}", other, source),
        }
    }

    #[test]
    fn integer_arithmetic_matches_model(a in -1000i64..1000, b in -1000i64..1000, op in arb_arith_op()) {
        let run = run_program(&format!("a = {}\nb = {}\nr = a {} b\n", a, b, op));
        let expected = match op {
            "+" => Some(Value::Int(a + b)),
            "-" => Some(Value::Int(a - b)),
            "*" => Some(Value::Int(a * b)),
            "/" if b != 0 => Some(Value::Float(a as f64 / b as f64)),
            "%" if b != 0 => Some(Value::Int(a % b)),
            _ => None,
        };
        match expected {
            Some(value) => prop_assert_eq!(run.get("r"), value),
            None => prop_assert!(matches!(run.result, Err(Error::Runtime(RuntimeError::ZeroDivision { .. }))), "expected ZeroDivision, got {:?}", run.result),
        }
    }

    #[test]
    fn list_mutation_is_visible_through_aliases(
        items in prop::collection::vec(-100i64..100, 1..8),
        pick in any::<prop::sample::Index>(),
        value in -100i64..100,
    ) {
        let i = pick.index(items.len());
        let literal: Vec<String> = items.iter().map(ToString::to_string).collect();
        let source = format!(
            "a = [{}]\nb = a\nb[{}] = {}\nd = {{'k': a}}\nd['k'].append(0)\nr = a[{}]\nn = len(b)\n",
            literal.join(", "), i, value, i
        );
        let run = run_program(&source);
        prop_assert_eq!(run.get("r"), Value::Int(value));
        prop_assert_eq!(run.get("n"), Value::Int(items.len() as i64 + 1));
    }

    #[test]
    fn map_mutation_is_visible_through_aliases(key in "[a-z]{1,6}", value in any::<i64>()) {
        let source = format!("m = {{}}\nalias = m\nalias['{}'] = {}\nr = m['{}']\n", key, value.saturating_abs(), key);
        let run = run_program(&source);
        prop_assert_eq!(run.get("r"), Value::Int(value.saturating_abs()));
    }

    #[test]
    fn closures_observe_later_assignments(first in -1000i64..1000, second in -1000i64..1000) {
        let source = format!(
            "x = {}\ndef read():\n    return x\nbefore = read()\nx = {}\nafter = read()\n",
            first, second
        );
        let run = run_program(&source);
        prop_assert_eq!(run.get("before"), Value::Int(first));
        prop_assert_eq!(run.get("after"), Value::Int(second));
    }
}
