//! Arbitrary precision numbers using dashu
//!
//! Uses dashu-float (DBig) for decimal arithmetic with a configurable number
//! of significant digits. Arithmetic on two values keeps the larger precision
//! of its operands, so rescaling the inputs of a calculation once is enough
//! to carry the configured precision through every intermediate result.

use dashu_float::ops::{Abs, SquareRoot};
use dashu_float::DBig;
use dashu_int::IBig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),

    #[error("Non-finite input: {0}")]
    NonFinite(f64),

    #[error("Overflow: result too large")]
    Overflow,
}

/// Default precision for calculations (significant decimal digits)
pub const DEFAULT_PRECISION: usize = 50;

/// Largest |x| handed to the exponential; e^x past this is far outside f64
const EXP_ARGUMENT_LIMIT: i64 = 100_000;

/// Arbitrary precision decimal number
///
/// All operations return Results or new Numbers - never panic.
#[derive(Debug, Clone)]
pub struct Number {
    inner: DBig,
}

impl Number {
    // ========== Construction ==========

    fn with_work_precision(val: DBig) -> DBig {
        val.with_precision(DEFAULT_PRECISION).value()
    }

    /// Create from string representation
    /// Supports: "123", "3.14", "1/3", "15e2", "-42"
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let s = s.trim();

        if s.contains('/') && !s.contains('.') && !s.contains('e') && !s.contains('E') {
            let parts: Vec<&str> = s.split('/').collect();
            if parts.len() == 2 {
                let num: DBig = parts[0]
                    .trim()
                    .parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;
                let den: DBig = parts[1]
                    .trim()
                    .parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;

                if den == DBig::ZERO {
                    return Err(NumberError::DivisionByZero);
                }

                let result = Self::with_work_precision(num) / Self::with_work_precision(den);
                return Ok(Self { inner: result });
            }
        }

        // Integer mantissa with exponent: significand * 10^exponent, exact
        if (s.contains('e') || s.contains('E')) && !s.contains('.') {
            let lower = s.to_lowercase();
            let parts: Vec<&str> = lower.split('e').collect();
            if parts.len() == 2 {
                let mantissa: IBig = parts[0]
                    .parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;
                let exp: isize = parts[1]
                    .parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;
                let result = DBig::from_parts(mantissa, exp);
                return Ok(Self { inner: Self::with_work_precision(result) });
            }
        }

        let inner: DBig = s
            .parse()
            .map_err(|_| NumberError::ParseError(s.to_string()))?;

        Ok(Self { inner: Self::with_work_precision(inner) })
    }

    /// Create from i64 with working precision
    pub fn from_i64(n: i64) -> Self {
        Self { inner: Self::with_work_precision(DBig::from(n)) }
    }

    /// Create from ratio (exact up to working precision)
    pub fn from_ratio(num: i64, den: i64) -> Result<Self, NumberError> {
        Self::from_i64(num).checked_div(&Self::from_i64(den))
    }

    /// Create from a native float.
    ///
    /// The value is taken at its shortest round-trip decimal form, so `0.1`
    /// becomes exactly one tenth rather than the nearest binary fraction.
    pub fn from_f64(f: f64) -> Result<Self, NumberError> {
        if !f.is_finite() {
            return Err(NumberError::NonFinite(f));
        }
        if f == 0.0 {
            return Ok(Self::zero());
        }
        // f64's Display never uses exponent notation
        Self::from_str(&f.to_string())
    }

    /// Exact `mantissa × 10^exponent`
    pub fn from_scientific(mantissa: i64, exponent: isize) -> Self {
        Self { inner: Self::with_work_precision(DBig::from_parts(IBig::from(mantissa), exponent)) }
    }

    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    pub fn one() -> Self {
        Self::from_i64(1)
    }

    /// Rescale to the given number of significant digits
    pub fn at_precision(self, digits: usize) -> Self {
        Self { inner: self.inner.with_precision(digits).value() }
    }

    // ========== Predicates ==========

    pub fn is_zero(&self) -> bool {
        self.inner == DBig::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.inner < DBig::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.inner > DBig::ZERO
    }

    pub fn is_integer(&self) -> bool {
        let floor_val = self.inner.clone().floor();
        self.inner == floor_val
    }

    // ========== Basic Arithmetic ==========

    pub fn add(&self, other: &Self) -> Self {
        Self { inner: &self.inner + &other.inner }
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self { inner: &self.inner - &other.inner }
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self { inner: &self.inner * &other.inner }
    }

    pub fn neg(&self) -> Self {
        Self { inner: -self.inner.clone() }
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            Err(NumberError::DivisionByZero)
        } else {
            Ok(Self { inner: &self.inner / &other.inner })
        }
    }

    /// Non-negative integer power by repeated squaring
    fn pow_unsigned(&self, exp: u64) -> Self {
        let mut result = Self::one();
        let mut base = self.clone();
        let mut remaining = exp;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(&base);
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul(&base);
            }
        }
        result
    }

    /// Integer power. Negative exponents divide, so `0^-n` is a division by zero.
    pub fn pow(&self, exp: i64) -> Result<Self, NumberError> {
        let magnitude = self.pow_unsigned(exp.unsigned_abs());
        if exp < 0 {
            Self::one().checked_div(&magnitude)
        } else {
            Ok(magnitude)
        }
    }

    /// Real-valued power: x^y = exp(y * ln(x)), exact for integer y
    pub fn pow_real(&self, exp: &Self, precision: u32) -> Result<Self, NumberError> {
        if exp.is_zero() {
            return Ok(Self::one());
        }

        if exp.is_integer() {
            if let Some(e) = exp.to_i64() {
                return self.pow(e);
            }
        }

        if self.is_zero() {
            return if exp.is_negative() {
                Err(NumberError::DivisionByZero)
            } else {
                Ok(Self::zero())
            };
        }

        if self.is_negative() {
            return Err(NumberError::DomainError(
                "fractional power of negative number".to_string(),
            ));
        }

        let ln_x = self.ln(precision)?;
        ln_x.mul(exp).exp(precision)
    }

    // ========== Transcendental Functions ==========

    pub fn sqrt(&self, precision: u32) -> Result<Self, NumberError> {
        if self.is_negative() {
            return Err(NumberError::DomainError(
                "square root of negative number".to_string(),
            ));
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }

        let val = self.inner.clone().with_precision(precision as usize).value();
        Ok(Self { inner: val.sqrt() })
    }

    /// Natural logarithm
    pub fn ln(&self, precision: u32) -> Result<Self, NumberError> {
        if self.inner <= DBig::ZERO {
            return Err(NumberError::DomainError(
                "logarithm of non-positive number".to_string(),
            ));
        }

        let val = self.inner.clone().with_precision(precision as usize).value();
        Ok(Self { inner: val.ln() })
    }

    /// Exponential function (e^x)
    ///
    /// Arguments beyond the limit overflow, or underflow to zero when negative.
    pub fn exp(&self, precision: u32) -> Result<Self, NumberError> {
        let limit = DBig::from(EXP_ARGUMENT_LIMIT);
        if self.inner > limit {
            return Err(NumberError::Overflow);
        }
        if self.inner < -limit {
            return Ok(Self::zero());
        }
        let val = self.inner.clone().with_precision(precision as usize).value();
        Ok(Self { inner: val.exp() })
    }

    // ========== Other Operations ==========

    pub fn abs(&self) -> Self {
        Self { inner: Abs::abs(self.inner.clone()) }
    }

    /// Largest integer <= x
    pub fn floor(&self) -> Self {
        Self { inner: self.inner.clone().floor() }
    }

    /// Smallest integer >= x
    pub fn ceil(&self) -> Self {
        Self { inner: self.inner.clone().ceil() }
    }

    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        self.to_plain_string().parse().ok()
    }

    /// Nearest f64, or None when the magnitude is outside the f64 range
    pub fn to_f64(&self) -> Option<f64> {
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        // The std parser rounds decimal text correctly, however long
        let parsed: f64 = format!("{}e{}", significand, exponent).parse().ok()?;
        if parsed.is_finite() {
            Some(parsed)
        } else {
            None
        }
    }

    /// Convert to f64 for return across the native boundary
    pub fn to_native(&self) -> Result<f64, NumberError> {
        self.to_f64().ok_or(NumberError::Overflow)
    }

    // ========== Display ==========

    /// Full decimal expansion without exponent notation
    pub fn to_plain_string(&self) -> String {
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let negative = significand < IBig::ZERO;
        let digits = if negative {
            (-significand).to_string()
        } else {
            significand.to_string()
        };

        let body = if digits == "0" {
            digits
        } else if exponent >= 0 {
            format!("{}{}", digits, "0".repeat(exponent as usize))
        } else {
            let shift = exponent.unsigned_abs();
            let expanded = if digits.len() > shift {
                let (int_part, frac_part) = digits.split_at(digits.len() - shift);
                format!("{}.{}", int_part, frac_part)
            } else {
                format!("0.{}{}", "0".repeat(shift - digits.len()), digits)
            };
            expanded.trim_end_matches('0').trim_end_matches('.').to_string()
        };

        if negative && body != "0" {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// Render with a fixed number of decimal places, rounding half away from zero
    pub fn as_decimal(&self, places: u32) -> String {
        let scale = Self::from_i64(10).pow_unsigned(places as u64);
        let half = Self::from_ratio(1, 2).unwrap_or_else(|_| Self::zero());
        let scaled = self.abs().mul(&scale).add(&half).floor();
        let digits = scaled.to_plain_string();

        let places = places as usize;
        let body = if places == 0 {
            digits
        } else {
            let padded = if digits.len() <= places {
                format!("{}{}", "0".repeat(places + 1 - digits.len()), digits)
            } else {
                digits
            };
            let (int_part, frac_part) = padded.split_at(padded.len() - places);
            format!("{}.{}", int_part, frac_part)
        };

        if self.is_negative() && !scaled.is_zero() {
            format!("-{}", body)
        } else {
            body
        }
    }
}

// ========== Trait Implementations ==========

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_plain_string())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.partial_cmp(&other.inner).unwrap_or(std::cmp::Ordering::Equal)
    }
}
