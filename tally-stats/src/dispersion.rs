//! Dispersion: sample variance, standard deviation, mean absolute deviation,
//! coefficient of variation

use tally_plugin::prelude::*;
use crate::helpers::{count, extract_numbers, mean_or_zero, number_result, on_native, sum_of_squares};

/// Sample variance with Bessel's correction; 0 when fewer than two values
pub fn sample_variance(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, |nums, _| calculate_sample_variance(nums))
}

pub fn calculate_sample_variance(numbers: &[Number]) -> CalcResult<Number> {
    if numbers.len() < 2 {
        return Ok(Number::zero());
    }
    let m = mean_or_zero(numbers)?;
    let divisor = Number::from_i64(numbers.len() as i64 - 1);
    Ok(sum_of_squares(numbers, &m).checked_div(&divisor)?)
}

/// Sample standard deviation; 0 when fewer than two values
pub fn sample_std_dev(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, calculate_sample_std_dev)
}

pub fn calculate_sample_std_dev(numbers: &[Number], precision: u32) -> CalcResult<Number> {
    Ok(calculate_sample_variance(numbers)?.sqrt(precision)?)
}

/// Mean of |x - mean|; 0 for an empty sample
pub fn mean_absolute_deviation(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, |nums, _| calculate_mean_absolute_deviation(nums))
}

pub fn calculate_mean_absolute_deviation(numbers: &[Number]) -> CalcResult<Number> {
    if numbers.is_empty() {
        return Ok(Number::zero());
    }
    let m = mean_or_zero(numbers)?;
    let total = numbers
        .iter()
        .fold(Number::zero(), |acc, x| acc.add(&x.sub(&m).abs()));
    Ok(total.checked_div(&count(numbers))?)
}

/// Standard deviation relative to the mean; 0 when the mean is 0
pub fn coefficient_of_variation(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, calculate_coefficient_of_variation)
}

pub fn calculate_coefficient_of_variation(numbers: &[Number], precision: u32) -> CalcResult<Number> {
    let m = mean_or_zero(numbers)?;
    if m.is_zero() {
        return Ok(Number::zero());
    }
    let sd = calculate_sample_std_dev(numbers, precision)?;
    Ok(sd.checked_div(&m)?)
}

// ============ Variance ============

pub struct Variance;

static VARIANCE_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Sample values",
)];

static VARIANCE_EXAMPLES: [&str; 1] = ["variance([2, 4, 4, 4, 5, 5, 7, 9]) → 4.5714"];

static VARIANCE_RELATED: [&str; 2] = ["stddev", "cv"];

impl FunctionPlugin for Variance {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "variance",
            description: "Sample variance (n−1 divisor); 0 for fewer than two values",
            usage: "variance(values)",
            args: &VARIANCE_ARGS,
            returns: "Number",
            examples: &VARIANCE_EXAMPLES,
            category: "statistics",
            source: Some("s² = Σ(x − x̄)² / (n − 1)"),
            related: &VARIANCE_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_sample_variance(&numbers))
    }
}

// ============ Standard Deviation ============

pub struct Stddev;

static STDDEV_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Sample values",
)];

static STDDEV_EXAMPLES: [&str; 1] = ["stddev([2, 4, 4, 4, 5, 5, 7, 9]) → 2.1381"];

static STDDEV_RELATED: [&str; 3] = ["variance", "cv", "mad"];

impl FunctionPlugin for Stddev {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "stddev",
            description: "Sample standard deviation; 0 for fewer than two values",
            usage: "stddev(values)",
            args: &STDDEV_ARGS,
            returns: "Number",
            examples: &STDDEV_EXAMPLES,
            category: "statistics",
            source: Some("s = √(Σ(x − x̄)² / (n − 1))"),
            related: &STDDEV_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_sample_std_dev(&numbers, ctx.precision()))
    }
}

// ============ Mean Absolute Deviation ============

pub struct Mad;

static MAD_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Sample values",
)];

static MAD_EXAMPLES: [&str; 1] = ["mad([2, 4, 4, 4, 5, 5, 7, 9]) → 1.5"];

static MAD_RELATED: [&str; 1] = ["stddev"];

impl FunctionPlugin for Mad {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "mad",
            description: "Mean absolute deviation from the mean",
            usage: "mad(values)",
            args: &MAD_ARGS,
            returns: "Number",
            examples: &MAD_EXAMPLES,
            category: "statistics",
            source: Some("MAD = Σ|x − x̄| / n"),
            related: &MAD_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_mean_absolute_deviation(&numbers))
    }
}

// ============ Coefficient of Variation ============

pub struct Cv;

static CV_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Sample values",
)];

static CV_EXAMPLES: [&str; 1] = ["cv([2, 4, 4, 4, 5, 5, 7, 9]) → 0.4276"];

static CV_RELATED: [&str; 2] = ["stddev", "mean"];

impl FunctionPlugin for Cv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "cv",
            description: "Coefficient of variation (relative risk); 0 when the mean is 0",
            usage: "cv(values)",
            args: &CV_ARGS,
            returns: "Number",
            examples: &CV_EXAMPLES,
            category: "statistics",
            source: Some("CV = s / x̄"),
            related: &CV_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_coefficient_of_variation(&numbers, ctx.precision()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SAMPLE: [f64; 8] = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn test_sample_std_dev() {
        let sd = sample_std_dev(&SAMPLE, &cfg()).unwrap();
        assert!((sd - 2.1381).abs() < 1e-4, "stddev was {}", sd);
    }

    #[test]
    fn test_sample_variance() {
        let var = sample_variance(&SAMPLE, &cfg()).unwrap();
        assert!((var - 4.5714).abs() < 1e-4, "variance was {}", var);
        // 32 / 7 exactly, rounded once at the boundary
        assert_eq!(var, 32.0 / 7.0);
    }

    #[test]
    fn test_short_samples_are_zero() {
        assert_eq!(sample_variance(&[], &cfg()).unwrap(), 0.0);
        assert_eq!(sample_variance(&[3.0], &cfg()).unwrap(), 0.0);
        assert_eq!(sample_std_dev(&[3.0], &cfg()).unwrap(), 0.0);
    }

    #[test]
    fn test_mean_absolute_deviation() {
        assert_eq!(mean_absolute_deviation(&SAMPLE, &cfg()).unwrap(), 1.5);
        assert_eq!(mean_absolute_deviation(&[], &cfg()).unwrap(), 0.0);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let cv = coefficient_of_variation(&SAMPLE, &cfg()).unwrap();
        assert!((cv - 0.427618).abs() < 1e-6, "cv was {}", cv);
    }

    #[test]
    fn test_coefficient_of_variation_zero_mean() {
        assert_eq!(coefficient_of_variation(&[-1.0, 1.0], &cfg()).unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let err = sample_std_dev(&[1.0, f64::NAN], &cfg()).unwrap_err();
        assert_eq!(err.code, codes::NON_FINITE);
    }

    #[test]
    fn test_deterministic() {
        let a = sample_std_dev(&SAMPLE, &cfg()).unwrap();
        let b = sample_std_dev(&SAMPLE, &cfg()).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_stddev_plugin() {
        let args = vec![Value::List(SAMPLE.iter().map(|x| Value::from(*x as i64)).collect())];
        let result = Stddev.call(&args, &eval_ctx());
        assert_eq!(result.as_number().unwrap().as_decimal(4), "2.1381");
    }

    #[test]
    fn test_mad_plugin_error_propagates() {
        let args = vec![Value::List(vec![Value::from(1), Value::Error(CalcError::div_zero())])];
        let result = Mad.call(&args, &eval_ctx());
        assert_eq!(result.as_error().unwrap().code, codes::DIV_ZERO);
    }
}
