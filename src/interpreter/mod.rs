pub mod builtins;
pub mod control_flow;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod operators;
pub mod parser;

pub use builtins::{BuiltinFailure, BuiltinRegistry};
pub use control_flow::Signal;
pub use environment::Environment;
pub use error::{NameError, RuntimeError};
pub use evaluator::{execute, Interpreter, DEFAULT_MAX_CALL_DEPTH};
pub use parser::{parse, ParseError, Parser};
