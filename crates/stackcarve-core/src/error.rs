//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while resolving model data.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An expression could not be evaluated.
    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),

    /// A footprint id was not present in the registry.
    #[error("Unknown footprint: {0}")]
    UnknownFootprint(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the expression evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The expression text could not be parsed.
    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// The expression referenced a parameter that is not defined.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Division by zero during evaluation.
    #[error("Division by zero in expression")]
    DivisionByZero,

    /// The result was not a finite number.
    #[error("Expression did not evaluate to a finite number")]
    NotFinite,
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
