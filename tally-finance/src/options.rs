//! European option pricing: Black-Scholes with a polynomial normal CDF

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{extract_args, number_result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackScholesParams {
    pub stock_price: f64,
    pub strike_price: f64,
    /// Years to expiry
    pub time: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPrices<T = f64> {
    pub call_price: T,
    pub put_price: T,
}

impl OptionPrices<Number> {
    pub fn to_native(&self) -> CalcResult<OptionPrices> {
        Ok(OptionPrices {
            call_price: self.call_price.to_native()?,
            put_price: self.put_price.to_native()?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::object([
            ("call_price", Value::Number(self.call_price)),
            ("put_price", Value::Number(self.put_price)),
        ])
    }
}

// Abramowitz & Stegun 26.2.17, |error| < 7.5e-8
const HASTINGS_A: [&str; 5] = ["0.31938153", "-0.356563782", "1.781477937", "-1.821255978", "1.330274429"];
const HASTINGS_P: &str = "0.2316419";
/// 1/√(2π), truncated as in the published table
const INV_SQRT_2PI: &str = "0.39894228";

fn constant(text: &str) -> CalcResult<Number> {
    Ok(Number::from_str(text)?)
}

/// Upper tail 1 − N(|x|)
fn upper_tail(x: &Number, precision: u32) -> CalcResult<Number> {
    let z = x.abs();
    let t = Number::one().checked_div(&Number::one().add(&constant(HASTINGS_P)?.mul(&z)))?;

    // Horner: t(a1 + t(a2 + t(a3 + t(a4 + t a5))))
    let mut poly = Number::zero();
    for a in HASTINGS_A.iter().rev() {
        poly = constant(a)?.add(&t.mul(&poly));
    }
    let poly = t.mul(&poly);

    let density = constant(INV_SQRT_2PI)?.mul(&z.mul(&z).checked_div(&Number::from_i64(-2))?.exp(precision)?);
    Ok(density.mul(&poly))
}

/// Standard normal CDF, symmetric so that N(x) + N(−x) = 1
pub fn normal_cdf(x: f64, cfg: &EngineConfig) -> CalcResult<f64> {
    Ok(calculate_normal_cdf(&cfg.number(x)?, cfg.digits())?.to_native()?)
}

pub fn calculate_normal_cdf(x: &Number, precision: u32) -> CalcResult<Number> {
    let tail = upper_tail(x, precision)?;
    if x.is_negative() {
        Ok(tail)
    } else {
        Ok(Number::one().sub(&tail))
    }
}

pub fn black_scholes(p: &BlackScholesParams, cfg: &EngineConfig) -> CalcResult<OptionPrices> {
    calculate_black_scholes(
        &cfg.number(p.stock_price)?,
        &cfg.number(p.strike_price)?,
        &cfg.number(p.time)?,
        &cfg.number(p.risk_free_rate)?,
        &cfg.number(p.volatility)?,
        cfg.digits(),
    )?
    .to_native()
}

/// European call and put on a non-dividend stock
pub fn calculate_black_scholes(
    spot: &Number,
    strike: &Number,
    time: &Number,
    rate: &Number,
    volatility: &Number,
    precision: u32,
) -> CalcResult<OptionPrices<Number>> {
    for (name, value) in [("stock_price", spot), ("strike_price", strike), ("time", time), ("volatility", volatility)] {
        if !value.is_positive() {
            return Err(CalcError::domain_error(format!("{} must be positive", name)));
        }
    }

    let sigma_root_t = volatility.mul(&time.sqrt(precision)?);
    let half_variance = volatility.mul(volatility).checked_div(&Number::from_i64(2))?;
    let drift = rate.add(&half_variance).mul(time);

    let d1 = spot.checked_div(strike)?.ln(precision)?.add(&drift).checked_div(&sigma_root_t)?;
    let d2 = d1.sub(&sigma_root_t);

    let discounted_strike = strike.mul(&rate.mul(time).neg().exp(precision)?);

    let call_price = spot
        .mul(&calculate_normal_cdf(&d1, precision)?)
        .sub(&discounted_strike.mul(&calculate_normal_cdf(&d2, precision)?));
    let put_price = discounted_strike
        .mul(&calculate_normal_cdf(&d2.neg(), precision)?)
        .sub(&spot.mul(&calculate_normal_cdf(&d1.neg(), precision)?));

    Ok(OptionPrices { call_price, put_price })
}

// ============ Black-Scholes ============

pub struct BlackScholes;

static BLACK_SCHOLES_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("stock_price", ArgKind::Number, "Current price of the underlying"),
    ArgMeta::required("strike_price", ArgKind::Number, "Strike price"),
    ArgMeta::required("time", ArgKind::Number, "Years to expiry"),
    ArgMeta::required("risk_free_rate", ArgKind::Number, "Continuously compounded risk-free rate"),
    ArgMeta::required("volatility", ArgKind::Number, "Annualized volatility"),
];

static BLACK_SCHOLES_EXAMPLES: [&str; 1] = [
    "black_scholes(100, 100, 1, 0.05, 0.2) → {call_price: 10.4506, put_price: 5.5735}",
];

static BLACK_SCHOLES_RELATED: [&str; 1] = ["norm_cdf"];

impl FunctionPlugin for BlackScholes {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "black_scholes",
            description: "European call and put prices under Black-Scholes",
            usage: "black_scholes(stock_price, strike_price, time, risk_free_rate, volatility)",
            args: &BLACK_SCHOLES_ARGS,
            returns: "Object",
            examples: &BLACK_SCHOLES_EXAMPLES,
            category: "finance/valuation",
            source: Some("C = S·N(d₁) − K·e^(−rT)·N(d₂), P = K·e^(−rT)·N(−d₂) − S·N(−d₁)"),
            related: &BLACK_SCHOLES_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &BLACK_SCHOLES_ARGS, "black_scholes", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        match calculate_black_scholes(&nums[0], &nums[1], &nums[2], &nums[3], &nums[4], ctx.precision()) {
            Ok(prices) => prices.into_value(),
            Err(e) => Value::Error(e),
        }
    }
}

// ============ Normal CDF ============

pub struct NormCdf;

static NORM_CDF_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", ArgKind::Number, "Standard score")];

static NORM_CDF_EXAMPLES: [&str; 2] = ["norm_cdf(0) → 0.5", "norm_cdf(1.96) → 0.975"];

static NORM_CDF_RELATED: [&str; 1] = ["black_scholes"];

impl FunctionPlugin for NormCdf {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "norm_cdf",
            description: "Standard normal cumulative distribution (polynomial approximation)",
            usage: "norm_cdf(x)",
            args: &NORM_CDF_ARGS,
            returns: "Number",
            examples: &NORM_CDF_EXAMPLES,
            category: "statistics",
            source: Some("N(x) = 1 − φ(x)·(a₁t + a₂t² + a₃t³ + a₄t⁴ + a₅t⁵), t = 1/(1 + px)"),
            related: &NORM_CDF_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &NORM_CDF_ARGS, "norm_cdf", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_normal_cdf(&nums[0], ctx.precision()))
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

    fn at_the_money() -> BlackScholesParams {
        BlackScholesParams { stock_price: 100.0, strike_price: 100.0, time: 1.0, risk_free_rate: 0.05, volatility: 0.2 }
    }

    #[test]
    fn test_normal_cdf_values() {
        assert!((normal_cdf(0.0, &cfg()).unwrap() - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96, &cfg()).unwrap() - 0.9750021).abs() < 1e-6);
        assert!((normal_cdf(-1.0, &cfg()).unwrap() - 0.1586553).abs() < 1e-6);
    }

    #[test]
    fn test_normal_cdf_symmetry() {
        for x in ["0.3", "1.25", "2.5", "4"] {
            let x = Number::from_str(x).unwrap();
            let sum = calculate_normal_cdf(&x, 50).unwrap().add(&calculate_normal_cdf(&x.neg(), 50).unwrap());
            assert_eq!(sum.as_decimal(40), Number::one().as_decimal(40));
        }
    }

    #[test]
    fn test_black_scholes() {
        let prices = black_scholes(&at_the_money(), &cfg()).unwrap();
        assert!((prices.call_price - 10.4506).abs() < 1e-3, "call was {}", prices.call_price);
        assert!((prices.put_price - 5.5735).abs() < 1e-3, "put was {}", prices.put_price);
        assert!(prices.put_price > 0.0);
    }

    #[test]
    fn test_put_call_parity() {
        let p = BlackScholesParams { stock_price: 110.0, strike_price: 95.0, time: 0.75, risk_free_rate: 0.03, volatility: 0.35 };
        let prices = black_scholes(&p, &cfg()).unwrap();
        let parity = p.stock_price - p.strike_price * (-p.risk_free_rate * p.time).exp();
        assert!((prices.call_price - prices.put_price - parity).abs() < 1e-2);
    }

    #[test]
    fn test_black_scholes_domain() {
        for p in [
            BlackScholesParams { stock_price: 0.0, ..at_the_money() },
            BlackScholesParams { strike_price: -1.0, ..at_the_money() },
            BlackScholesParams { time: 0.0, ..at_the_money() },
            BlackScholesParams { volatility: 0.0, ..at_the_money() },
        ] {
            assert_eq!(black_scholes(&p, &cfg()).unwrap_err().code, codes::DOMAIN_ERROR);
        }
    }

    #[test]
    fn test_black_scholes_plugin() {
        let args = vec![
            Value::from(100),
            Value::from(100),
            Value::from(1),
            Value::Number(Number::from_str("0.05").unwrap()),
            Value::Number(Number::from_str("0.2").unwrap()),
        ];
        let result = BlackScholes.call(&args, &eval_ctx());
        assert_eq!(result.get("call_price").as_number().unwrap().as_decimal(2), "10.45");
        assert_eq!(result.get("put_price").as_number().unwrap().as_decimal(2), "5.57");
    }
}
