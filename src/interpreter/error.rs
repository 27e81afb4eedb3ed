use crate::diagnostic::{Diagnostic, Span};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name '{0}' is not defined")]
    Undefined(String),
}

/// A failure while executing a program. Every variant carries the span of
/// the expression or statement that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{span}: TypeError: {message}")]
    TypeError { message: String, span: Span },
    #[error("{span}: NameError: {error}")]
    Name {
        #[source]
        error: NameError,
        span: Span,
    },
    #[error("{span}: ZeroDivisionError: {message}")]
    ZeroDivision { message: String, span: Span },
    #[error("{span}: IndexError: {message}")]
    IndexError { message: String, span: Span },
    #[error("{span}: KeyError: {key}")]
    KeyError { key: String, span: Span },
    #[error("{span}: TypeError: {name}() takes {expected} argument(s) but {found} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("{span}: {name}: {message}")]
    BuiltinError {
        name: String,
        message: String,
        span: Span,
    },
    #[error("{span}: AttributeError: {message}")]
    AttributeError { message: String, span: Span },
    #[error("{span}: OverflowError: integer overflow in {operation}")]
    Overflow { operation: String, span: Span },
    #[error("{span}: RecursionError: maximum recursion depth of {limit} exceeded")]
    RecursionLimitExceeded { limit: usize, span: Span },
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::TypeError { message: message.into(), span }
    }

    pub fn undefined(name: impl Into<String>, span: Span) -> Self {
        Self::Name { error: NameError::Undefined(name.into()), span }
    }

    pub fn zero_division(message: impl Into<String>, span: Span) -> Self {
        Self::ZeroDivision { message: message.into(), span }
    }

    pub fn index_error(message: impl Into<String>, span: Span) -> Self {
        Self::IndexError { message: message.into(), span }
    }

    pub fn key_error(key: impl Into<String>, span: Span) -> Self {
        Self::KeyError { key: key.into(), span }
    }

    pub fn attribute_error(message: impl Into<String>, span: Span) -> Self {
        Self::AttributeError { message: message.into(), span }
    }

    pub fn overflow(operation: impl Into<String>, span: Span) -> Self {
        Self::Overflow { operation: operation.into(), span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::TypeError { span, .. }
            | Self::Name { span, .. }
            | Self::ZeroDivision { span, .. }
            | Self::IndexError { span, .. }
            | Self::KeyError { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::BuiltinError { span, .. }
            | Self::AttributeError { span, .. }
            | Self::Overflow { span, .. }
            | Self::RecursionLimitExceeded { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Name { error: NameError::Undefined(name), span } => {
                Diagnostic::error("E0201", format!("name `{}` is not defined", name))
                    .with_label(*span, "not found in this scope")
            }
            Self::TypeError { message, span } => {
                Diagnostic::error("E0202", format!("type error: {}", message)).with_label(*span, "")
            }
            Self::IndexError { message, span } => {
                Diagnostic::error("E0203", format!("index error: {}", message))
                    .with_label(*span, "index out of range")
            }
            Self::KeyError { key, span } => Diagnostic::error("E0204", format!("key {} not found", key))
                .with_label(*span, "missing key"),
            Self::ZeroDivision { message, span } => Diagnostic::error("E0205", message.clone())
                .with_label(*span, "division by zero here"),
            Self::ArityMismatch { name, expected, found, span } => Diagnostic::error(
                "E0206",
                format!("`{}` takes {} argument(s) but {} were given", name, expected, found),
            )
            .with_label(*span, format!("expected {} argument(s)", expected)),
            Self::BuiltinError { name, message, span } => {
                Diagnostic::error("E0207", format!("builtin `{}` failed: {}", name, message))
                    .with_label(*span, "in this call")
            }
            Self::AttributeError { message, span } => {
                Diagnostic::error("E0208", message.clone()).with_label(*span, "unknown attribute")
            }
            Self::Overflow { operation, span } => {
                Diagnostic::error("E0209", format!("integer overflow in {}", operation))
                    .with_label(*span, "result does not fit in 64 bits")
            }
            Self::RecursionLimitExceeded { limit, span } => Diagnostic::error(
                "E0210",
                format!("maximum recursion depth of {} exceeded", limit),
            )
            .with_label(*span, "in this call")
            .with_note("raise the limit with `--max-depth`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position_and_kind() {
        let error = RuntimeError::undefined("x", Span::new(4, 5, 2, 3));
        assert_eq!(error.to_string(), "2:3: NameError: name 'x' is not defined");

        let error = RuntimeError::ArityMismatch {
            name: "f".to_string(),
            expected: 2,
            found: 1,
            span: Span::new(0, 4, 1, 1),
        };
        assert_eq!(error.to_string(), "1:1: TypeError: f() takes 2 argument(s) but 1 were given");
    }

    #[test]
    fn test_diagnostic_codes() {
        let span = Span::new(0, 1, 1, 1);
        assert_eq!(RuntimeError::type_error("bad", span).to_diagnostic().code, "E0202");
        assert_eq!(RuntimeError::zero_division("division by zero", span).to_diagnostic().code, "E0205");
        assert_eq!(
            RuntimeError::RecursionLimitExceeded { limit: 10, span }.to_diagnostic().code,
            "E0210"
        );
    }
}
