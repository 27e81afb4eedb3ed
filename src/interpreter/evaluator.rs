use crate::ast::{AssignTarget, BinaryOp, Expr, ExprKind, Literal, Stmt, StmtKind};
use crate::diagnostic::Span;
use crate::stack::ensure_sufficient_stack;
use crate::value::{Function, Key, NativeFunction, Value};
use super::builtins::BuiltinRegistry;
use super::control_flow::Signal;
use super::environment::Environment;
use super::error::RuntimeError;
use super::operators;
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Default bound on nested user-function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Walks the syntax tree directly. One interpreter may run several programs
/// against the same or different environments.
pub struct Interpreter {
    registry: Rc<BuiltinRegistry>,
    max_call_depth: Option<usize>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter backed by the standard library.
    pub fn new() -> Self {
        Self::with_registry(BuiltinRegistry::standard())
    }

    pub fn with_registry(registry: BuiltinRegistry) -> Self {
        Self {
            registry: Rc::new(registry),
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
            call_depth: 0,
        }
    }

    /// `None` removes the limit.
    pub fn with_max_call_depth(mut self, limit: Option<usize>) -> Self {
        self.max_call_depth = limit;
        self
    }

    pub fn registry(&self) -> &BuiltinRegistry {
        &self.registry
    }

    /// A fresh top-level scope with every builtin bound.
    pub fn global_environment(&self) -> Environment {
        let env = Environment::new();
        self.registry.install(&env);
        env
    }

    pub fn execute(&mut self, program: &[Stmt], env: &Environment) -> Result<(), RuntimeError> {
        debug!(statements = program.len(), "executing program");
        self.call_depth = 0;
        match self.execute_block(program, env) {
            Ok(_) => Ok(()),
            Err(error) => {
                debug!(%error, "runtime error");
                Err(error)
            }
        }
    }

    /// Runs statements in order, stopping at the first non-`Normal` signal.
    pub fn execute_block(&mut self, statements: &[Stmt], env: &Environment) -> Result<Signal, RuntimeError> {
        for statement in statements {
            let signal = self.execute_statement(statement, env)?;
            if !signal.is_normal() {
                return Ok(signal);
            }
        }
        Ok(Signal::Normal)
    }

    fn execute_statement(&mut self, statement: &Stmt, env: &Environment) -> Result<Signal, RuntimeError> {
        trace!(line = statement.span.line, "statement");
        match &statement.kind {
            StmtKind::Expr(expr) => {
                self.evaluate(expr, env)?;
                Ok(Signal::Normal)
            }
            StmtKind::Assign { target, value } => {
                let value = self.evaluate(value, env)?;
                match target {
                    AssignTarget::Name(name) => env.assign(name.clone(), value),
                    AssignTarget::Index { target, index } => {
                        let container = self.evaluate(target, env)?;
                        let index = self.evaluate(index, env)?;
                        operators::set_index(&container, &index, value, statement.span)?;
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::AugAssign { target, op, value } => {
                self.execute_aug_assign(target, *op, value, statement.span, env)?;
                Ok(Signal::Normal)
            }
            StmtKind::If { branches, else_branch } => {
                for (condition, body) in branches {
                    let test = self.evaluate(condition, env)?;
                    if operators::truth(&test, "if condition", condition.span)? {
                        return self.execute_block(body, env);
                    }
                }
                match else_branch {
                    Some(body) => self.execute_block(body, env),
                    None => Ok(Signal::Normal),
                }
            }
            StmtKind::While { condition, body } => {
                loop {
                    let test = self.evaluate(condition, env)?;
                    if !operators::truth(&test, "while condition", condition.span)? {
                        break;
                    }
                    match self.execute_block(body, env)? {
                        Signal::Break => break,
                        Signal::Return(value) => return Ok(Signal::Return(value)),
                        Signal::Normal | Signal::Continue => {}
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::For { variable, iterable, body } => {
                let iterable_value = self.evaluate(iterable, env)?;
                for item in operators::iterate(&iterable_value, iterable.span)? {
                    env.define(variable.clone(), item);
                    match self.execute_block(body, env)? {
                        Signal::Break => break,
                        Signal::Return(value) => return Ok(Signal::Return(value)),
                        Signal::Normal | Signal::Continue => {}
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::FunctionDef { name, params, body } => {
                let function = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: env.clone(),
                };
                env.define(name.clone(), Value::Function(Rc::new(function)));
                Ok(Signal::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::None,
                };
                Ok(Signal::Return(value))
            }
            StmtKind::Break => Ok(Signal::Break),
            StmtKind::Continue => Ok(Signal::Continue),
            StmtKind::Pass => Ok(Signal::Normal),
        }
    }

    /// `x op= v` and `a[i] op= v`; the container and index are evaluated once.
    fn execute_aug_assign(
        &mut self,
        target: &AssignTarget,
        op: BinaryOp,
        value: &Expr,
        span: Span,
        env: &Environment,
    ) -> Result<(), RuntimeError> {
        match target {
            AssignTarget::Name(name) => {
                let current = env.get(name).map_err(|error| RuntimeError::Name { error, span })?;
                let operand = self.evaluate(value, env)?;
                let result = operators::binary(op, &current, &operand, span)?;
                env.assign(name.clone(), result);
            }
            AssignTarget::Index { target, index } => {
                let container = self.evaluate(target, env)?;
                let index = self.evaluate(index, env)?;
                let current = operators::index(&container, &index, span)?;
                let operand = self.evaluate(value, env)?;
                let result = operators::binary(op, &current, &operand, span)?;
                operators::set_index(&container, &index, result, span)?;
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr, env: &Environment) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr, env))
    }

    fn evaluate_inner(&mut self, expr: &Expr, env: &Environment) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::None => Value::None,
            }),
            ExprKind::Identifier(name) => env
                .get(name)
                .map_err(|error| RuntimeError::Name { error, span: expr.span }),
            ExprKind::Unary { op, operand } => {
                let operand = self.evaluate(operand, env)?;
                operators::unary(*op, &operand, expr.span)
            }
            ExprKind::Binary { left, op: op @ (BinaryOp::And | BinaryOp::Or), right } => {
                let context = format!("operand of '{}'", op.symbol());
                let lhs = self.evaluate(left, env)?;
                let lhs = operators::truth(&lhs, &context, left.span)?;
                // `and` stops on False, `or` on True.
                if lhs == (*op == BinaryOp::Or) {
                    return Ok(Value::Bool(lhs));
                }
                let rhs = self.evaluate(right, env)?;
                Ok(Value::Bool(operators::truth(&rhs, &context, right.span)?))
            }
            ExprKind::Binary { left, op, right } => {
                let lhs = self.evaluate(left, env)?;
                let rhs = self.evaluate(right, env)?;
                operators::binary(*op, &lhs, &rhs, expr.span)
            }
            ExprKind::Call { callee, args } => {
                let callee = self.evaluate(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg, env)?);
                }
                self.call_value(&callee, values, expr.span)
            }
            ExprKind::Index { target, index } => {
                let target = self.evaluate(target, env)?;
                let index = self.evaluate(index, env)?;
                operators::index(&target, &index, expr.span)
            }
            ExprKind::Attribute { target, name } => {
                let target = self.evaluate(target, env)?;
                self.attribute(&target, name, expr.span)
            }
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item, env)?);
                }
                Ok(Value::list(values))
            }
            ExprKind::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.evaluate(key_expr, env)?;
                    let key = Key::from_value(&key).ok_or_else(|| {
                        RuntimeError::type_error(format!("unhashable type: '{}'", key.type_name()), key_expr.span)
                    })?;
                    let value = self.evaluate(value_expr, env)?;
                    map.insert(key, value);
                }
                Ok(Value::map(map))
            }
            ExprKind::Lambda { params, body } => Ok(Value::Function(Rc::new(Function {
                name: Rc::from("<lambda>"),
                params: params.clone(),
                body: body.clone(),
                closure: env.clone(),
            }))),
        }
    }

    /// Builtin methods first, then a string key of a dict.
    fn attribute(&self, target: &Value, name: &str, span: Span) -> Result<Value, RuntimeError> {
        if let Some(method) = self.registry.method(target, name) {
            return Ok(method);
        }
        if let Value::Map(entries) = target {
            if let Some(value) = entries.borrow().get(&Key::from(name)) {
                return Ok(value.clone());
            }
        }
        Err(RuntimeError::attribute_error(
            format!("'{}' object has no attribute '{}'", target.type_name(), name),
            span,
        ))
    }

    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => self.call_function(function, args, span),
            Value::Native(native) => self.call_native(native, args, span),
            other => Err(RuntimeError::type_error(
                format!("'{}' object is not callable", other.type_name()),
                span,
            )),
        }
    }

    fn call_function(&mut self, function: &Function, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: function.name.to_string(),
                expected: function.params.len(),
                found: args.len(),
                span,
            });
        }
        if let Some(limit) = self.max_call_depth {
            if self.call_depth >= limit {
                return Err(RuntimeError::RecursionLimitExceeded { limit, span });
            }
        }

        let scope = function.closure.child();
        for (param, arg) in function.params.iter().zip(args) {
            scope.define(param.clone(), arg);
        }

        trace!(function = %function.name, depth = self.call_depth, "call");
        self.call_depth += 1;
        let outcome = ensure_sufficient_stack(|| self.execute_block(&function.body, &scope));
        self.call_depth -= 1;

        match outcome? {
            Signal::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }

    fn call_native(&self, native: &NativeFunction, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
        let builtin_error = |message: String| RuntimeError::BuiltinError {
            name: native.name.to_string(),
            message,
            span,
        };
        let function = self
            .registry
            .get(&native.name)
            .cloned()
            .ok_or_else(|| builtin_error(format!("unknown builtin '{}'", native.name)))?;

        let args = match &native.receiver {
            Some(receiver) => {
                let mut bound = Vec::with_capacity(args.len() + 1);
                bound.push(receiver.clone());
                bound.extend(args);
                bound
            }
            None => args,
        };
        trace!(builtin = %native.name, args = args.len(), "native call");
        function(&args).map_err(|failure| builtin_error(failure.message))
    }
}

/// Runs `program` in `env` with a standard-library interpreter. Builtin
/// names resolve only if they were installed in `env` or an ancestor.
pub fn execute(program: &[Stmt], env: &Environment) -> Result<(), RuntimeError> {
    Interpreter::new().execute(program, env)
}
