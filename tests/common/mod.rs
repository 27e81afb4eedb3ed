#![allow(dead_code)]

use serpent::interpreter::builtins::Output;
use serpent::{compile, BuiltinRegistry, Environment, Error, Interpreter, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Result of running a program with captured output.
pub struct Run {
    pub env: Environment,
    pub output: String,
    pub result: Result<(), Error>,
}

impl Run {
    pub fn get(&self, name: &str) -> Value {
        self.env
            .get(name)
            .unwrap_or_else(|e| panic!("{} after run: {:?}", e, self.result))
    }

    pub fn error(&self) -> &Error {
        self.result.as_ref().err().expect("program should fail")
    }
}

pub fn run_program(source: &str) -> Run {
    run_program_with(source, |interpreter| interpreter)
}

pub fn run_program_with(source: &str, configure: impl FnOnce(Interpreter) -> Interpreter) -> Run {
    let buffer = Rc::new(RefCell::new(Vec::<u8>::new()));
    let sink: Output = buffer.clone();
    let mut interpreter = configure(Interpreter::with_registry(BuiltinRegistry::standard_with_output(sink)));
    let env = interpreter.global_environment();
    let result = compile(source)
        .and_then(|program| interpreter.execute(&program, &env).map_err(Error::from));
    let output = String::from_utf8(buffer.borrow().clone()).expect("utf-8 output");
    Run { env, output, result }
}

/// Runs a program that must succeed and returns what it printed.
pub fn output_of(source: &str) -> String {
    let run = run_program(source);
    if let Err(e) = &run.result {
        panic!("program failed: {}\n{}", e, source);
    }
    run.output
}

/// Runs a program that must succeed and returns one global.
pub fn global(source: &str, name: &str) -> Value {
    let run = run_program(source);
    if let Err(e) = &run.result {
        panic!("program failed: {}\n{}", e, source);
    }
    run.get(name)
}
