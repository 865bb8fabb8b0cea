//! Distribution shape: adjusted sample skewness and excess kurtosis

use tally_plugin::prelude::*;
use crate::dispersion::calculate_sample_std_dev;
use crate::helpers::{extract_numbers, mean_or_zero, number_result, on_native, standardized_moment_sum};

/// Fisher-Pearson adjusted skewness; 0 for fewer than three values or no spread
pub fn sample_skewness(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, calculate_sample_skewness)
}

pub fn calculate_sample_skewness(numbers: &[Number], precision: u32) -> CalcResult<Number> {
    let n = numbers.len() as i64;
    if n < 3 {
        return Ok(Number::zero());
    }
    let sd = calculate_sample_std_dev(numbers, precision)?;
    if sd.is_zero() {
        return Ok(Number::zero());
    }
    let m = mean_or_zero(numbers)?;

    Ok(skewness_factor(n)?.mul(&standardized_moment_sum(numbers, &m, &sd, 3)?))
}

/// n / ((n-1)(n-2)), built in decimals so large samples cannot overflow
fn skewness_factor(n: i64) -> CalcResult<Number> {
    let denominator = Number::from_i64(n - 1).mul(&Number::from_i64(n - 2));
    Ok(Number::from_i64(n).checked_div(&denominator)?)
}

/// n(n+1) / ((n-1)(n-2)(n-3)) and the bias correction 3(n-1)² / ((n-2)(n-3))
fn kurtosis_coefficients(n: i64) -> CalcResult<(Number, Number)> {
    let (n0, n1, n2, n3) = (
        Number::from_i64(n),
        Number::from_i64(n - 1),
        Number::from_i64(n - 2),
        Number::from_i64(n - 3),
    );
    let factor = n0.mul(&Number::from_i64(n + 1)).checked_div(&n1.mul(&n2).mul(&n3))?;
    let correction = Number::from_i64(3).mul(&n1).mul(&n1).checked_div(&n2.mul(&n3))?;
    Ok((factor, correction))
}

/// Adjusted excess kurtosis; 0 for fewer than four values or no spread
pub fn excess_kurtosis(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, calculate_excess_kurtosis)
}

pub fn calculate_excess_kurtosis(numbers: &[Number], precision: u32) -> CalcResult<Number> {
    let n = numbers.len() as i64;
    if n < 4 {
        return Ok(Number::zero());
    }
    let sd = calculate_sample_std_dev(numbers, precision)?;
    if sd.is_zero() {
        return Ok(Number::zero());
    }
    let m = mean_or_zero(numbers)?;

    let (factor, correction) = kurtosis_coefficients(n)?;
    let fourth = standardized_moment_sum(numbers, &m, &sd, 4)?;
    Ok(factor.mul(&fourth).sub(&correction))
}

// ============ Skewness ============

pub struct Skewness;

static SKEWNESS_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Sample values (at least 3)",
)];

static SKEWNESS_EXAMPLES: [&str; 1] = ["skewness([10, 12, 11, 14, 20, 15, 13]) → 1.3006"];

static SKEWNESS_RELATED: [&str; 2] = ["kurtosis", "stddev"];

impl FunctionPlugin for Skewness {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "skewness",
            description: "Adjusted sample skewness; 0 for fewer than three values",
            usage: "skewness(values)",
            args: &SKEWNESS_ARGS,
            returns: "Number",
            examples: &SKEWNESS_EXAMPLES,
            category: "statistics",
            source: Some("Skew = [n / ((n−1)(n−2))] · Σ((x − x̄)/s)³"),
            related: &SKEWNESS_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_sample_skewness(&numbers, ctx.precision()))
    }
}

// ============ Kurtosis ============

pub struct Kurtosis;

static KURTOSIS_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Sample values (at least 4)",
)];

static KURTOSIS_EXAMPLES: [&str; 1] = ["kurtosis([10, 12, 11, 14, 20, 15, 13]) → 2.0878"];

static KURTOSIS_RELATED: [&str; 2] = ["skewness", "stddev"];

impl FunctionPlugin for Kurtosis {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "kurtosis",
            description: "Adjusted excess kurtosis; 0 for fewer than four values",
            usage: "kurtosis(values)",
            args: &KURTOSIS_ARGS,
            returns: "Number",
            examples: &KURTOSIS_EXAMPLES,
            category: "statistics",
            source: Some("Kurt = [n(n+1) / ((n−1)(n−2)(n−3))] · Σ((x − x̄)/s)⁴ − 3(n−1)² / ((n−2)(n−3))"),
            related: &KURTOSIS_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_excess_kurtosis(&numbers, ctx.precision()))
    }
}
