//! Helper functions for statistical operations
//!
//! Common utilities for extracting inputs and shared sums.

use tally_core::{CalcError, CalcResult, EngineConfig, Number, Value};
use tally_plugin::EvalContext;

/// Extract numbers from arguments, handling both varargs and List.
/// Every number is rescaled to the context precision.
pub fn extract_numbers(args: &[Value], ctx: &EvalContext) -> Result<Vec<Number>, CalcError> {
    let mut numbers = Vec::new();

    for arg in args {
        match arg {
            Value::Number(n) => numbers.push(ctx.lift(n.clone())),
            Value::List(list) => {
                for item in list {
                    match item {
                        Value::Number(n) => numbers.push(ctx.lift(n.clone())),
                        Value::Error(e) => return Err(e.clone()),
                        other => return Err(CalcError::type_error("Number", other.type_name())),
                    }
                }
            }
            Value::Null => {}
            Value::Error(e) => return Err(e.clone()),
            other => return Err(CalcError::type_error("Number or List", other.type_name())),
        }
    }

    Ok(numbers)
}

/// Run a `calculate_*` function on native samples
pub fn on_native<F>(values: &[f64], cfg: &EngineConfig, f: F) -> CalcResult<f64>
where
    F: FnOnce(&[Number], u32) -> CalcResult<Number>,
{
    let numbers = cfg.numbers(values)?;
    Ok(f(&numbers, cfg.digits())?.to_native()?)
}

pub fn count(numbers: &[Number]) -> Number {
    Number::from_i64(numbers.len() as i64)
}

pub fn sum(numbers: &[Number]) -> Number {
    numbers.iter().fold(Number::zero(), |acc, n| acc.add(n))
}

/// Arithmetic mean, 0 for an empty sample
pub fn mean_or_zero(numbers: &[Number]) -> CalcResult<Number> {
    if numbers.is_empty() {
        return Ok(Number::zero());
    }
    Ok(sum(numbers).checked_div(&count(numbers))?)
}

/// Sum of squared deviations from the mean
pub fn sum_of_squares(numbers: &[Number], mean: &Number) -> Number {
    numbers.iter().fold(Number::zero(), |acc, x| {
        let dev = x.sub(mean);
        acc.add(&dev.mul(&dev))
    })
}

/// Sum of ((x - mean) / sd)^power
pub fn standardized_moment_sum(
    numbers: &[Number],
    mean: &Number,
    sd: &Number,
    power: i64,
) -> CalcResult<Number> {
    let mut total = Number::zero();
    for x in numbers {
        let z = x.sub(mean).checked_div(sd)?;
        total = total.add(&z.pow(power)?);
    }
    Ok(total)
}

pub fn number_result(result: CalcResult<Number>) -> Value {
    match result {
        Ok(n) => Value::Number(n),
        Err(e) => Value::Error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tally_plugin::PluginRegistry;

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    #[test]
    fn test_extract_numbers_mixed() {
        let args = vec![
            Value::from(1),
            Value::List(vec![Value::from(2), Value::from(3)]),
            Value::Null,
        ];
        let numbers = extract_numbers(&args, &eval_ctx()).unwrap();
        assert_eq!(numbers.len(), 3);
    }

    #[test]
    fn test_extract_numbers_rejects_text() {
        let args = vec![Value::List(vec![Value::from("x")])];
        assert!(extract_numbers(&args, &eval_ctx()).is_err());
    }

    #[test]
    fn test_mean_or_zero() {
        assert!(mean_or_zero(&[]).unwrap().is_zero());
        let nums = vec![Number::from_i64(1), Number::from_i64(2)];
        assert_eq!(mean_or_zero(&nums).unwrap().to_plain_string(), "1.5");
    }
}
