//! Structured calculation errors
//!
//! Errors are values. Plugins turn them into `Value::Error`, the typed API
//! returns them through `CalcResult`.

use crate::NumberError;
use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const MISSING_INPUT: &str = "MISSING_INPUT";
    pub const UNSOLVABLE: &str = "UNSOLVABLE";
    pub const CONVERGENCE: &str = "CONVERGENCE";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const OVERFLOW: &str = "OVERFLOW";
    pub const NON_FINITE: &str = "NON_FINITE";
    pub const TYPE_ERROR: &str = "TYPE_ERROR";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const ARG_TYPE: &str = "ARG_TYPE";
    pub const UNDEFINED_FUNC: &str = "UNDEFINED_FUNC";
    pub const UNDEFINED_FIELD: &str = "UNDEFINED_FIELD";
    pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
    pub const NOT_FOUND: &str = "NOT_FOUND";
}

/// Structured calculation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    // ========== Common Error Constructors ==========

    pub fn missing_input(field: &str, target: &str) -> Self {
        Self::new(
            codes::MISSING_INPUT,
            format!("Missing input '{}' required to solve for {}", field, target),
        )
        .with_suggestion(format!("Provide '{}'", field))
    }

    pub fn unsolvable(details: impl Into<String>) -> Self {
        Self::new(codes::UNSOLVABLE, format!("No real solution: {}", details.into()))
            .with_suggestion("Check the signs of the cash flows")
    }

    pub fn convergence(what: &str, estimate: &str, iterations: usize) -> Self {
        Self::new(
            codes::CONVERGENCE,
            format!(
                "{} did not converge within {} iterations (best estimate {})",
                what, iterations, estimate
            ),
        )
        .with_suggestion("Check that the inputs admit a single root inside the search bracket")
    }

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
            .with_suggestion("Use a plain decimal such as 0.05")
    }

    pub fn div_zero() -> Self {
        Self::new(codes::DIV_ZERO, "Division by zero")
            .with_suggestion("Ensure divisor is not zero")
    }

    pub fn domain_error(details: impl Into<String>) -> Self {
        Self::new(codes::DOMAIN_ERROR, format!("Domain error: {}", details.into()))
    }

    pub fn non_finite(value: f64) -> Self {
        Self::new(codes::NON_FINITE, format!("Input is not a finite number: {}", value))
    }

    pub fn undefined_func(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FUNC, format!("Unknown function: {}", name))
            .with_suggestion("Use list_functions to see what is available")
    }

    /// Named arguments a function does not declare
    pub fn undefined_field(func: &str, unknown: &[&str], known: &[&str]) -> Self {
        Self::new(
            codes::UNDEFINED_FIELD,
            format!("{}() has no argument named {}", func, unknown.join(", ")),
        )
        .with_suggestion(format!("Arguments: {}", known.join(", ")))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(codes::TYPE_ERROR, format!("Expected {}, got {}", expected, got))
    }

    pub fn arg_count(func: &str, expected: usize, got: usize) -> Self {
        Self::new(
            codes::ARG_COUNT,
            format!("{}() expects {} arguments, got {}", func, expected, got),
        )
        .with_suggestion(format!("Use help('{}') for usage", func))
    }

    pub fn arg_type(func: &str, arg: &str, expected: &str, got: &str) -> Self {
        Self::new(
            codes::ARG_TYPE,
            format!("{}() argument '{}': expected {}, got {}", func, arg, expected, got),
        )
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_CONFIG, format!("Invalid configuration: {}", details.into()))
    }
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for CalcError {}

impl From<NumberError> for CalcError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::ParseError(s) => Self::parse_error(s),
            NumberError::DivisionByZero => Self::div_zero(),
            NumberError::DomainError(s) => Self::domain_error(s),
            NumberError::NonFinite(f) => Self::non_finite(f),
            NumberError::Overflow => Self::new(codes::OVERFLOW, "Result is outside the f64 range"),
        }
    }
}
