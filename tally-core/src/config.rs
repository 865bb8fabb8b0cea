//! Engine configuration
//!
//! An `EngineConfig` is built once and passed by value to every calculation.
//! Nothing in the engine mutates it, so two calls with the same config and
//! the same inputs always agree.

use crate::number::DEFAULT_PRECISION;
use crate::{CalcError, Number, NumberError};
use serde::{Deserialize, Serialize};

/// Significant decimal digits used by every calculation (at least 50)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Precision(u32);

impl Precision {
    pub const MIN: u32 = DEFAULT_PRECISION as u32;

    pub fn new(digits: u32) -> Result<Self, CalcError> {
        if digits < Self::MIN {
            return Err(CalcError::invalid_config(format!(
                "precision must be at least {} digits, got {}",
                Self::MIN,
                digits
            )));
        }
        Ok(Self(digits))
    }

    pub fn digits(self) -> u32 {
        self.0
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u32> for Precision {
    type Error = CalcError;

    fn try_from(digits: u32) -> Result<Self, Self::Error> {
        Self::new(digits)
    }
}

impl From<Precision> for u32 {
    fn from(p: Precision) -> Self {
        p.0
    }
}

/// What a bisection solve does when it runs out of iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Return the last midpoint and log a warning
    #[default]
    BestEstimate,
    /// Fail with a CONVERGENCE error
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub exhaustion: ExhaustionPolicy,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_exhaustion(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// Precision in digits, in the form the transcendental functions take
    pub fn digits(&self) -> u32 {
        self.precision.digits()
    }

    /// Rescale a number to the configured precision
    pub fn lift(&self, n: Number) -> Number {
        n.at_precision(self.precision.digits() as usize)
    }

    /// Bring a native input into the decimal domain
    pub fn number(&self, value: f64) -> Result<Number, NumberError> {
        Ok(self.lift(Number::from_f64(value)?))
    }

    pub fn numbers(&self, values: &[f64]) -> Result<Vec<Number>, NumberError> {
        values.iter().map(|v| self.number(*v)).collect()
    }
}
