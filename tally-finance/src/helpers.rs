//! Common financial utilities

use tally_core::{CalcError, CalcResult, Number, Value};
use tally_plugin::{ArgKind, ArgMeta, EvalContext};

/// Upper bound on rows a schedule or cash-flow table may hold
pub const MAX_SCHEDULE_PERIODS: i64 = 1200;

/// floor(periods) as a row count, rejecting terms past `MAX_SCHEDULE_PERIODS`
pub fn schedule_length(periods: &Number, what: &str) -> CalcResult<i64> {
    periods
        .floor()
        .to_i64()
        .filter(|n| *n <= MAX_SCHEDULE_PERIODS)
        .map(|n| n.max(0))
        .ok_or_else(|| {
            CalcError::domain_error(format!("{} exceeds {} periods", what, MAX_SCHEDULE_PERIODS))
        })
}

/// Extract a Number from a Value, rescaled to the context precision
pub fn extract_number(value: &Value, func: &str, arg: &str, ctx: &EvalContext) -> Result<Number, CalcError> {
    match value {
        Value::Number(n) => Ok(ctx.lift(n.clone())),
        Value::Error(e) => Err(e.clone()),
        other => Err(CalcError::arg_type(func, arg, ArgKind::Number.as_str(), other.type_name())),
    }
}

/// Extract optional Number (may be missing or null)
pub fn extract_optional_number(
    args: &[Value],
    index: usize,
    func: &str,
    arg: &str,
    ctx: &EvalContext,
) -> Result<Option<Number>, CalcError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => extract_number(v, func, arg, ctx).map(Some),
    }
}

/// Extract the leading required Number arguments described by `meta`.
///
/// The returned vector has one entry per required argument, in order.
pub fn extract_args(
    args: &[Value],
    meta: &[ArgMeta],
    func: &str,
    ctx: &EvalContext,
) -> Result<Vec<Number>, CalcError> {
    let required: Vec<&ArgMeta> = meta.iter().filter(|a| !a.optional).collect();
    if args.len() < required.len() {
        return Err(CalcError::arg_count(func, required.len(), args.len()));
    }

    required
        .iter()
        .zip(args)
        .map(|(arg, value)| extract_number(value, func, arg.name, ctx))
        .collect()
}

/// Extract numbers from a list Value
pub fn extract_numbers_from_list(
    value: &Value,
    func: &str,
    arg: &str,
    ctx: &EvalContext,
) -> Result<Vec<Number>, CalcError> {
    match value {
        Value::List(items) => {
            let mut numbers = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Number(n) => numbers.push(ctx.lift(n.clone())),
                    Value::Error(e) => return Err(e.clone()),
                    other => {
                        return Err(CalcError::type_error(
                            "Number",
                            &format!("{}[{}]: {}", arg, i, other.type_name()),
                        ))
                    }
                }
            }
            Ok(numbers)
        }
        Value::Error(e) => Err(e.clone()),
        other => Err(CalcError::arg_type(func, arg, ArgKind::NumberList.as_str(), other.type_name())),
    }
}

/// (1 + rate)^nper; exact for integer nper
pub fn compound_factor(rate: &Number, nper: &Number, precision: u32) -> CalcResult<Number> {
    Ok(Number::one().add(rate).pow_real(nper, precision)?)
}

/// numerator / denominator, or 0 when the denominator is 0
pub fn ratio_or_zero(numerator: &Number, denominator: &Number) -> CalcResult<Number> {
    if denominator.is_zero() {
        return Ok(Number::zero());
    }
    Ok(numerator.checked_div(denominator)?)
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
    use tally_core::codes;
    use tally_plugin::PluginRegistry;

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    static ARGS: [ArgMeta; 3] = [
        ArgMeta::required("a", ArgKind::Number, "first"),
        ArgMeta::required("b", ArgKind::Number, "second"),
        ArgMeta::optional("c", ArgKind::Number, "third", "0"),
    ];

    #[test]
    fn test_extract_number_null_error() {
        let result = extract_number(&Value::Null, "test", "arg", &eval_ctx());
        assert_eq!(result.unwrap_err().code, codes::ARG_TYPE);
    }

    #[test]
    fn test_extract_args_counts_required_only() {
        let args = vec![Value::from(1), Value::from(2)];
        let nums = extract_args(&args, &ARGS, "test", &eval_ctx()).unwrap();
        assert_eq!(nums.len(), 2);

        let err = extract_args(&args[..1], &ARGS, "test", &eval_ctx()).unwrap_err();
        assert_eq!(err.code, codes::ARG_COUNT);
    }

    #[test]
    fn test_extract_args_names_bad_argument() {
        let args = vec![Value::from(1), Value::from("two")];
        let err = extract_args(&args, &ARGS, "test", &eval_ctx()).unwrap_err();
        assert!(err.message.contains("'b'"));
    }

    #[test]
    fn test_extract_optional_number() {
        let args = vec![Value::from(1), Value::Null];
        assert!(extract_optional_number(&args, 1, "t", "x", &eval_ctx()).unwrap().is_none());
        assert!(extract_optional_number(&args, 5, "t", "x", &eval_ctx()).unwrap().is_none());
        assert!(extract_optional_number(&args, 0, "t", "x", &eval_ctx()).unwrap().is_some());
    }

    #[test]
    fn test_compound_factor() {
        let rate = Number::from_str("0.1").unwrap();
        let result = compound_factor(&rate, &Number::from_i64(10), 50).unwrap();
        assert_eq!(result.as_decimal(10), "2.5937424601");
    }

    #[test]
    fn test_ratio_or_zero() {
        let ten = Number::from_i64(10);
        assert!(ratio_or_zero(&ten, &Number::zero()).unwrap().is_zero());
        assert_eq!(ratio_or_zero(&ten, &Number::from_i64(4)).unwrap().to_plain_string(), "2.5");
    }
}
