//! A small indentation-structured scripting language: a lexer with
//! INDENT/DEDENT layout, a recovering recursive-descent parser and a
//! tree-walking interpreter with closures and a builtin registry.
//!
//! ```no_run
//! use serpent::{run, Environment};
//!
//! let env = Environment::new();
//! run("def sq(x):\n    return x * x\nprint(sq(7))\n", &env).unwrap();
//! ```

pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod interpreter;
pub mod lexer;
pub mod stack;
pub mod token;
pub mod value;

pub use ast::{Expr, ExprKind, Program, Stmt, StmtKind};
pub use diagnostic::{Diagnostic, Span};
pub use interpreter::{
    BuiltinFailure, BuiltinRegistry, Environment, Interpreter, NameError, ParseError, RuntimeError, Signal,
};
pub use lexer::{tokenize, LexError};
pub use token::{Token, TokenKind};
pub use value::Value;

use thiserror::Error;

/// Any failure of the lex, parse or run stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{} parse error(s), first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Parse(Vec<ParseError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<Vec<ParseError>> for Error {
    fn from(errors: Vec<ParseError>) -> Self {
        Error::Parse(errors)
    }
}

impl Error {
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Lex(error) => vec![error.to_diagnostic()],
            Error::Parse(errors) => errors.iter().map(ParseError::to_diagnostic).collect(),
            Error::Runtime(error) => vec![error.to_diagnostic()],
        }
    }
}

/// Lexes and parses `source` without running it.
pub fn compile(source: &str) -> Result<Program, Error> {
    let tokens = tokenize(source)?;
    Ok(interpreter::parse(tokens)?)
}

/// Compiles and runs `source` in `env` with the standard library, printing
/// to stdout. Builtins are installed into `env` first.
pub fn run(source: &str, env: &Environment) -> Result<(), Error> {
    run_with(source, env, &mut Interpreter::new())
}

pub fn run_with(source: &str, env: &Environment, interpreter: &mut Interpreter) -> Result<(), Error> {
    let program = compile(source)?;
    interpreter.registry().install(env);
    interpreter.execute(&program, env)?;
    Ok(())
}
