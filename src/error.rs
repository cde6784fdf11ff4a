use thiserror::Error;

use crate::registry::HandlerKind;
use crate::parser::SyntaxError;

/// Failures raised while resolving or rendering an expression.
///
/// Every kind is terminal for the current top-level evaluation; the
/// interpreter never downgrades or retries them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),
    #[error("Unknown constructor: {0}")]
    UnknownConstructor(String),
    #[error("Unsupported modifier: {0}")]
    UnsupportedModifier(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{kind} `{name}` is already registered")]
    DuplicateRegistration { kind: HandlerKind, name: String },
    #[error("Scope #{0} is not live")]
    InvalidScope(usize),
}

impl EvalError {
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        EvalError::UnsupportedExpression(message.into())
    }

    pub fn invalid_arguments<S: Into<String>>(message: S) -> Self {
        EvalError::InvalidArguments(message.into())
    }

    /// The numeric coercion failure used by the built-in initializers.
    pub fn conversion(from: &str, to: &str) -> Self {
        EvalError::UnsupportedExpression(format!("Cannot convert {} to {}", from, to))
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}

pub type ViewchainResult<T> = Result<T, Error>;
