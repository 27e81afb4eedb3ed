//! Lexical scoping, captured environments and function values.

mod common;

use common::{global, run_program};
use pretty_assertions::assert_eq;
use serpent::{Error, RuntimeError, Value};

#[test]
fn test_closure_sees_later_mutation_of_captured_variable() {
    let source = "\
x = 1
def read():
    return x
x = 2
result = read()
";
    assert_eq!(global(source, "result"), Value::Int(2));
}

#[test]
fn test_counters_are_independent() {
    let source = "\
def make_counter():
    n = 0
    def next():
        n += 1
        return n
    return next

a = make_counter()
b = make_counter()
a()
a()
b()
ra = a()
rb = b()
";
    assert_eq!(global(source, "ra"), Value::Int(3));
    assert_eq!(global(source, "rb"), Value::Int(2));
}

#[test]
fn test_sibling_closures_share_one_scope() {
    let source = "\
def make_account(balance):
    def deposit(amount):
        balance += amount
        return balance
    def current():
        return balance
    return [deposit, current]

fns = make_account(100)
deposit = fns[0]
current = fns[1]
deposit(50)
result = current()
";
    assert_eq!(global(source, "result"), Value::Int(150));
}

#[test]
fn test_scoping_is_lexical_not_dynamic() {
    let source = "\
y = 'global'
def show():
    return y
def caller():
    y = 'local'
    return show()
result = caller()
";
    // `y = 'local'` rebinds the existing global, which `show` then reads.
    assert_eq!(global(source, "result"), Value::str("local"));

    let source = "\
def outer():
    hidden = 'outer'
    def inner():
        return hidden
    return inner
def caller(f):
    hidden = 'caller'
    return f()
result = caller(outer())
";
    assert_eq!(global(source, "result"), Value::str("outer"));
}

#[test]
fn test_parameters_shadow_outer_names() {
    let source = "\
n = 10
def f(n):
    n = n + 1
    return n
r = f(1)
";
    assert_eq!(global(source, "r"), Value::Int(2));
    assert_eq!(global(source, "n"), Value::Int(10));
}

#[test]
fn test_function_locals_do_not_leak() {
    let run = run_program("def f():\n    local = 1\nf()\nprint(local)\n");
    assert!(matches!(run.error(), Error::Runtime(RuntimeError::Name { .. })));
}

#[test]
fn test_mutual_recursion() {
    let source = "\
def is_even(n):
    if n == 0:
        return True
    return is_odd(n - 1)
def is_odd(n):
    if n == 0:
        return False
    return is_even(n - 1)
result = is_even(10)
";
    assert_eq!(global(source, "result"), Value::Bool(true));
}

#[test]
fn test_lambdas_compose() {
    let source = "\
compose = lambda f, g: lambda x: f(g(x))
inc = lambda x: x + 1
double = lambda x: x * 2
h = compose(inc, double)
result = h(5)
";
    assert_eq!(global(source, "result"), Value::Int(11));
}

#[test]
fn test_function_values_print_by_name() {
    let run = run_program("def f():\n    pass\nprint(f, len, [].append)\n");
    assert_eq!(
        run.output,
        "<function f> <built-in function len> <built-in method append of list object>\n"
    );
}
