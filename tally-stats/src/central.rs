//! Central tendency: arithmetic mean and geometric mean of returns

use tally_plugin::prelude::*;
use crate::helpers::{count, extract_numbers, mean_or_zero, number_result, on_native};

/// Arithmetic mean; 0 for an empty sample
pub fn mean(values: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(values, cfg, |nums, _| calculate_mean(nums))
}

pub fn calculate_mean(numbers: &[Number]) -> CalcResult<Number> {
    mean_or_zero(numbers)
}

/// Compound average of periodic returns: (∏(1 + rᵢ))^(1/n) − 1; 0 for no returns
pub fn geometric_mean(returns: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
    on_native(returns, cfg, calculate_geometric_mean)
}

pub fn calculate_geometric_mean(returns: &[Number], precision: u32) -> CalcResult<Number> {
    if returns.is_empty() {
        return Ok(Number::zero());
    }

    let one = Number::one();
    let growth = returns.iter().fold(one.clone(), |acc, r| acc.mul(&one.add(r)));
    let root = one.checked_div(&count(returns))?;

    Ok(growth.pow_real(&root, precision)?.sub(&one))
}

// ============ Mean ============

pub struct Mean;

static MEAN_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    ArgKind::NumberList,
    "Numbers to average",
)];

static MEAN_EXAMPLES: [&str; 2] = ["mean(1, 2, 3, 4, 5) → 3", "mean([]) → 0"];

static MEAN_RELATED: [&str; 2] = ["geometric_mean", "stddev"];

impl FunctionPlugin for Mean {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "mean",
            description: "Arithmetic mean of values (0 for no values)",
            usage: "mean(values) or mean(a, b, c, ...)",
            args: &MEAN_ARGS,
            returns: "Number",
            examples: &MEAN_EXAMPLES,
            category: "statistics",
            source: Some("x̄ = Σx / n"),
            related: &MEAN_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let numbers = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_mean(&numbers))
    }
}

// ============ Geometric Mean ============

pub struct GeometricMean;

static GEOMEAN_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "returns",
    ArgKind::NumberList,
    "Periodic returns as fractions (0.10 = 10%)",
)];

static GEOMEAN_EXAMPLES: [&str; 1] = ["geometric_mean([0.10, 0.50, -0.10]) → 0.1409"];

static GEOMEAN_RELATED: [&str; 1] = ["mean"];

impl FunctionPlugin for GeometricMean {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "geometric_mean",
            description: "Time-weighted average return over several periods",
            usage: "geometric_mean(returns)",
            args: &GEOMEAN_ARGS,
            returns: "Number",
            examples: &GEOMEAN_EXAMPLES,
            category: "statistics",
            source: Some("G = (∏(1 + rᵢ))^(1/n) − 1"),
            related: &GEOMEAN_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let returns = match extract_numbers(args, ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_geometric_mean(&returns, ctx.precision()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], &cfg()).unwrap(), 5.0);
    }

    #[test]
    fn test_mean_empty_is_zero() {
        assert_eq!(mean(&[], &cfg()).unwrap(), 0.0);
    }

    #[test]
    fn test_mean_decimal_exact() {
        // 0.1 + 0.2 + 0.3 averages to exactly 0.2 in decimal
        assert_eq!(mean(&[0.1, 0.2, 0.3], &cfg()).unwrap(), 0.2);
    }

    #[test]
    fn test_geometric_mean() {
        let g = geometric_mean(&[0.10, 0.50, -0.10], &cfg()).unwrap();
        assert!((g - 0.1409).abs() < 1e-4, "geometric mean was {}", g);
    }

    #[test]
    fn test_geometric_mean_single_period() {
        assert_eq!(geometric_mean(&[0.25], &cfg()).unwrap(), 0.25);
    }

    #[test]
    fn test_geometric_mean_empty_is_zero() {
        assert_eq!(geometric_mean(&[], &cfg()).unwrap(), 0.0);
    }

    #[test]
    fn test_geometric_mean_total_loss() {
        // A -100% period wipes out the growth factor
        assert_eq!(geometric_mean(&[0.5, -1.0], &cfg()).unwrap(), -1.0);
    }

    #[test]
    fn test_geometric_mean_negative_growth_is_domain_error() {
        let err = geometric_mean(&[-1.5, 0.1], &cfg()).unwrap_err();
        assert_eq!(err.code, codes::DOMAIN_ERROR);
    }

    #[test]
    fn test_mean_plugin_varargs() {
        let args = vec![Value::from(1), Value::from(2), Value::from(3)];
        let result = Mean.call(&args, &eval_ctx());
        assert_eq!(result.as_number().unwrap().to_i64(), Some(2));
    }

    #[test]
    fn test_geometric_mean_plugin() {
        let args = vec![Value::List(vec![
            Value::Number(Number::from_str("0.10").unwrap()),
            Value::Number(Number::from_str("0.50").unwrap()),
            Value::Number(Number::from_str("-0.10").unwrap()),
        ])];
        let result = GeometricMean.call(&args, &eval_ctx());
        assert_eq!(result.as_number().unwrap().as_decimal(4), "0.1409");
    }
}
