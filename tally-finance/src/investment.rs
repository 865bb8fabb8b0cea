//! Discounting and cash-flow analysis: future/present value, NPV, IRR, perpetuity

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{
    compound_factor, extract_args, extract_number, extract_numbers_from_list, number_result,
    ratio_or_zero,
};
use crate::solver::{bisect, BisectionConfig, Bracket, Slope};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureValueParams {
    pub pv: f64,
    pub rate: f64,
    pub periods: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentValueParams {
    pub fv: f64,
    pub rate: f64,
    pub periods: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpvParams {
    pub initial_investment: f64,
    /// Flows at t = 1, 2, ...
    pub cash_flows: Vec<f64>,
    pub discount_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrParams {
    /// Flows at t = 0, 1, ...
    pub cash_flows: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpetuityParams {
    pub pmt: f64,
    pub rate: f64,
}

pub fn future_value(p: &FutureValueParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_future_value(&cfg.number(p.pv)?, &cfg.number(p.rate)?, &cfg.number(p.periods)?, cfg.digits())?;
    Ok(value.to_native()?)
}

/// pv · (1 + r)^periods; fractional periods allowed
pub fn calculate_future_value(pv: &Number, rate: &Number, periods: &Number, precision: u32) -> CalcResult<Number> {
    Ok(pv.mul(&compound_factor(rate, periods, precision)?))
}

pub fn present_value(p: &PresentValueParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_present_value(&cfg.number(p.fv)?, &cfg.number(p.rate)?, &cfg.number(p.periods)?, cfg.digits())?;
    Ok(value.to_native()?)
}

pub fn calculate_present_value(fv: &Number, rate: &Number, periods: &Number, precision: u32) -> CalcResult<Number> {
    Ok(fv.checked_div(&compound_factor(rate, periods, precision)?)?)
}

pub fn npv(p: &NpvParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let flows = cfg.numbers(&p.cash_flows)?;
    let value = calculate_npv(&cfg.number(p.initial_investment)?, &flows, &cfg.number(p.discount_rate)?)?;
    Ok(value.to_native()?)
}

/// −initial + Σ CF_i / (1+r)^(i+1)
pub fn calculate_npv(initial_investment: &Number, cash_flows: &[Number], rate: &Number) -> CalcResult<Number> {
    discounted_sum(cash_flows, rate, 1).map(|sum| sum.sub(initial_investment))
}

/// Σ CF_i / (1+r)^(i + first_period)
fn discounted_sum(cash_flows: &[Number], rate: &Number, first_period: i64) -> CalcResult<Number> {
    let growth = Number::one().add(rate);
    let mut total = Number::zero();
    for (i, cf) in cash_flows.iter().enumerate() {
        let discount = growth.pow(i as i64 + first_period)?;
        total = total.add(&cf.checked_div(&discount)?);
    }
    Ok(total)
}

pub fn irr(p: &IrrParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let flows = cfg.numbers(&p.cash_flows)?;
    Ok(calculate_irr(&flows, cfg)?.to_native()?)
}

/// Rate at which the t = 0 based NPV of the flows is zero.
///
/// Bisection over (−0.999, 10) from 0.1. With more than one sign change the
/// root found is whichever the bracket narrows onto.
pub fn calculate_irr(cash_flows: &[Number], cfg: &EngineConfig) -> CalcResult<Number> {
    if cash_flows.is_empty() {
        return Err(CalcError::missing_input("cash_flows", "IRR"));
    }

    let bracket = Bracket::new(
        cfg.lift(Number::from_ratio(-999, 1000)?),
        cfg.lift(Number::from_i64(10)),
    );
    let guess = cfg.lift(Number::from_ratio(1, 10)?);

    // NPV above zero means the rate is still too low
    let outcome = bisect(
        |r| discounted_sum(cash_flows, r, 0),
        bracket,
        guess,
        Slope::Decreasing,
        &BisectionConfig::default(),
    )?;
    outcome.resolve(cfg.exhaustion, "IRR")
}

pub fn perpetuity(p: &PerpetuityParams, cfg: &EngineConfig) -> CalcResult<f64> {
    Ok(calculate_perpetuity(&cfg.number(p.pmt)?, &cfg.number(p.rate)?)?.to_native()?)
}

/// pmt / rate, 0 at a zero rate
pub fn calculate_perpetuity(pmt: &Number, rate: &Number) -> CalcResult<Number> {
    ratio_or_zero(pmt, rate)
}

// ============ FV ============

pub struct Fv;

static FV_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("pv", ArgKind::Number, "Present value"),
    ArgMeta::required("rate", ArgKind::Number, "Rate per period"),
    ArgMeta::required("periods", ArgKind::Number, "Number of periods (may be fractional)"),
];

static FV_EXAMPLES: [&str; 1] = ["fv(1000, 0.05, 10) → 1628.89"];

static FV_RELATED: [&str; 3] = ["pv", "tvm", "ear"];

impl FunctionPlugin for Fv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "fv",
            description: "Future value of a single sum",
            usage: "fv(pv, rate, periods)",
            args: &FV_ARGS,
            returns: "Number",
            examples: &FV_EXAMPLES,
            category: "finance/tvm",
            source: Some("FV = PV · (1 + r)^n"),
            related: &FV_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &FV_ARGS, "fv", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_future_value(&nums[0], &nums[1], &nums[2], ctx.precision()))
    }
}

// ============ PV ============

pub struct Pv;

static PV_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("fv", ArgKind::Number, "Future value"),
    ArgMeta::required("rate", ArgKind::Number, "Rate per period"),
    ArgMeta::required("periods", ArgKind::Number, "Number of periods (may be fractional)"),
];

static PV_EXAMPLES: [&str; 1] = ["pv(1628.89, 0.05, 10) → 1000.00"];

static PV_RELATED: [&str; 3] = ["fv", "npv", "tvm"];

impl FunctionPlugin for Pv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "pv",
            description: "Present value of a single future sum",
            usage: "pv(fv, rate, periods)",
            args: &PV_ARGS,
            returns: "Number",
            examples: &PV_EXAMPLES,
            category: "finance/tvm",
            source: Some("PV = FV / (1 + r)^n"),
            related: &PV_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &PV_ARGS, "pv", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_present_value(&nums[0], &nums[1], &nums[2], ctx.precision()))
    }
}

// ============ NPV ============

pub struct Npv;

static NPV_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("initial_investment", ArgKind::Number, "Outlay at t = 0 (positive)"),
    ArgMeta::required("cash_flows", ArgKind::NumberList, "Cash flows at t = 1, 2, ..."),
    ArgMeta::required("discount_rate", ArgKind::Number, "Discount rate per period"),
];

static NPV_EXAMPLES: [&str; 1] = ["npv(100, [10, 60, 80], 0.10) → 18.78"];

static NPV_RELATED: [&str; 2] = ["irr", "pv"];

impl FunctionPlugin for Npv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "npv",
            description: "Net present value of an investment",
            usage: "npv(initial_investment, cash_flows, discount_rate)",
            args: &NPV_ARGS,
            returns: "Number",
            examples: &NPV_EXAMPLES,
            category: "finance/analysis",
            source: Some("NPV = −I + Σ CFₜ / (1 + r)^t, t = 1..n"),
            related: &NPV_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        if args.len() < 3 {
            return Value::Error(CalcError::arg_count("npv", 3, args.len()));
        }
        let initial = match extract_number(&args[0], "npv", "initial_investment", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        let flows = match extract_numbers_from_list(&args[1], "npv", "cash_flows", ctx) {
            Ok(f) => f,
            Err(e) => return Value::Error(e),
        };
        let rate = match extract_number(&args[2], "npv", "discount_rate", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_npv(&initial, &flows, &rate))
    }
}

// ============ IRR ============

pub struct Irr;

static IRR_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "cash_flows",
    ArgKind::NumberList,
    "Cash flows starting at t = 0 (initial outlay negative)",
)];

static IRR_EXAMPLES: [&str; 2] = [
    "irr([-100, 110]) → 0.10",
    "irr([-1000, 300, 400, 500]) → 0.0890",
];

static IRR_RELATED: [&str; 2] = ["npv", "ytm"];

impl FunctionPlugin for Irr {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "irr",
            description: "Internal rate of return by bisection over (−99.9%, 1000%)",
            usage: "irr(cash_flows)",
            args: &IRR_ARGS,
            returns: "Number",
            examples: &IRR_EXAMPLES,
            category: "finance/analysis",
            source: Some("Σ CFₜ / (1 + IRR)^t = 0, t = 0..n"),
            related: &IRR_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        if args.is_empty() {
            return Value::Error(CalcError::arg_count("irr", 1, 0));
        }
        let flows = match extract_numbers_from_list(&args[0], "irr", "cash_flows", ctx) {
            Ok(f) => f,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_irr(&flows, &ctx.config))
    }
}

// ============ Perpetuity ============

pub struct Perpetuity;

static PERPETUITY_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("pmt", ArgKind::Number, "Payment per period"),
    ArgMeta::required("rate", ArgKind::Number, "Discount rate per period"),
];

static PERPETUITY_EXAMPLES: [&str; 1] = ["perpetuity(100, 0.05) → 2000"];

static PERPETUITY_RELATED: [&str; 2] = ["ddm", "pv"];

impl FunctionPlugin for Perpetuity {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "perpetuity",
            description: "Present value of a level perpetuity; 0 at a zero rate",
            usage: "perpetuity(pmt, rate)",
            args: &PERPETUITY_ARGS,
            returns: "Number",
            examples: &PERPETUITY_EXAMPLES,
            category: "finance/valuation",
            source: Some("PV = PMT / r"),
            related: &PERPETUITY_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &PERPETUITY_ARGS, "perpetuity", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_perpetuity(&nums[0], &nums[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    fn irr_of(flows: &[f64], cfg: &EngineConfig) -> CalcResult<f64> {
        irr(&IrrParams { cash_flows: flows.to_vec() }, cfg)
    }

    #[test]
    fn test_future_value() {
        let fv = future_value(&FutureValueParams { pv: 1000.0, rate: 0.05, periods: 10.0 }, &cfg()).unwrap();
        assert!((fv - 1628.89).abs() < 0.01, "fv was {}", fv);
    }

    #[test]
    fn test_present_value_inverts_future_value() {
        let fv = future_value(&FutureValueParams { pv: 1000.0, rate: 0.05, periods: 10.0 }, &cfg()).unwrap();
        let pv = present_value(&PresentValueParams { fv, rate: 0.05, periods: 10.0 }, &cfg()).unwrap();
        assert!((pv - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_periods() {
        let fv = future_value(&FutureValueParams { pv: 100.0, rate: 0.21, periods: 0.5 }, &cfg()).unwrap();
        assert!((fv - 110.0).abs() < 1e-9, "fv was {}", fv);
    }

    #[test]
    fn test_future_value_overflow() {
        let err = future_value(&FutureValueParams { pv: 1.0, rate: 0.05, periods: 1e30 }, &cfg()).unwrap_err();
        assert_eq!(err.code, codes::OVERFLOW);
    }

    #[test]
    fn test_npv() {
        let params = NpvParams { initial_investment: 100.0, cash_flows: vec![10.0, 60.0, 80.0], discount_rate: 0.10 };
        let value = npv(&params, &cfg()).unwrap();
        assert!((value - 18.7829).abs() < 1e-4, "npv was {}", value);
    }

    #[test]
    fn test_npv_no_flows() {
        let params = NpvParams { initial_investment: 50.0, cash_flows: vec![], discount_rate: 0.10 };
        assert_eq!(npv(&params, &cfg()).unwrap(), -50.0);
    }

    #[test]
    fn test_irr_simple() {
        let rate = irr_of(&[-100.0, 110.0], &cfg()).unwrap();
        assert!((rate - 0.10).abs() < 1e-9, "irr was {}", rate);
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let flows = [-1000.0, 300.0, 400.0, 500.0];
        let rate = irr_of(&flows, &cfg()).unwrap();

        let numbers = cfg().numbers(&flows).unwrap();
        let residual = discounted_sum(&numbers, &cfg().number(rate).unwrap(), 0).unwrap();
        assert!(residual.to_f64().unwrap().abs() < 1e-6);
        assert!((rate - 0.0890).abs() < 1e-4, "irr was {}", rate);
    }

    #[test]
    fn test_irr_empty_flows() {
        assert_eq!(irr_of(&[], &cfg()).unwrap_err().code, codes::MISSING_INPUT);
    }

    #[test]
    fn test_irr_without_sign_change() {
        // All inflows: NPV stays positive and the bracket collapses to 10
        let estimate = irr_of(&[100.0, 100.0], &cfg()).unwrap();
        assert!((estimate - 10.0).abs() < 1e-6, "estimate was {}", estimate);

        let strict = cfg().with_exhaustion(ExhaustionPolicy::Fail);
        assert_eq!(irr_of(&[100.0, 100.0], &strict).unwrap_err().code, codes::CONVERGENCE);
    }

    #[test]
    fn test_perpetuity() {
        assert_eq!(perpetuity(&PerpetuityParams { pmt: 100.0, rate: 0.05 }, &cfg()).unwrap(), 2000.0);
        assert_eq!(perpetuity(&PerpetuityParams { pmt: 100.0, rate: 0.0 }, &cfg()).unwrap(), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let params = NpvParams { initial_investment: 100.0, cash_flows: vec![10.0, 60.0, 80.0], discount_rate: 0.10 };
        let first = npv(&params, &cfg()).unwrap();
        let second = npv(&params, &cfg()).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_npv_plugin() {
        let args = vec![
            Value::from(100),
            Value::from(vec![Value::from(10), Value::from(60), Value::from(80)]),
            Value::Number(Number::from_str("0.10").unwrap()),
        ];
        let result = Npv.call(&args, &eval_ctx());
        assert_eq!(result.as_number().unwrap().as_decimal(2), "18.78");
    }

    #[test]
    fn test_irr_plugin_rejects_scalar() {
        let result = Irr.call(&[Value::from(5)], &eval_ctx());
        assert_eq!(result.as_error().unwrap().code, codes::ARG_TYPE);
    }

    #[test]
    fn test_params_deserialize() {
        let params: NpvParams = serde_json::from_str(
            r#"{"initialInvestment": 100, "cashFlows": [10, 60, 80], "discountRate": 0.1}"#,
        )
        .unwrap();
        assert_eq!(params.cash_flows.len(), 3);
    }
}
