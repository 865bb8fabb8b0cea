//! Tally Core - Fundamental types
//!
//! This crate provides the core types used throughout Tally:
//! - `Number`: Arbitrary precision decimal numbers
//! - `Value`: Runtime values (numbers, text, objects, errors)
//! - `CalcError`: Structured calculation errors
//! - `EngineConfig`: Immutable precision and solver policy

mod number;
mod value;
mod error;
mod config;

pub use number::{Number, NumberError, DEFAULT_PRECISION};
pub use value::Value;
pub use error::{CalcError, CalcResult, codes};
pub use config::{EngineConfig, ExhaustionPolicy, Precision};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{CalcError, CalcResult, EngineConfig, ExhaustionPolicy, Number, Precision, Value};
    pub use crate::error::codes;
}
