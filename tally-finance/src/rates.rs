//! Rate conversions: effective annual rate and money-market yields

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{extract_args, number_result, ratio_or_zero};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveAnnualRateParams {
    pub nominal_rate: f64,
    pub compounding_periods: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDiscountYieldParams {
    pub face_value: f64,
    pub purchase_price: f64,
    pub days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveAnnualYieldParams {
    pub hpy: f64,
    pub days: f64,
}

/// The three quotes of a discount instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyMarketYields<T = f64> {
    pub bank_discount_yield: T,
    pub holding_period_yield: T,
    pub effective_annual_yield: T,
}

impl MoneyMarketYields<Number> {
    pub fn to_native(&self) -> CalcResult<MoneyMarketYields> {
        Ok(MoneyMarketYields {
            bank_discount_yield: self.bank_discount_yield.to_native()?,
            holding_period_yield: self.holding_period_yield.to_native()?,
            effective_annual_yield: self.effective_annual_yield.to_native()?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::object([
            ("bank_discount_yield", Value::Number(self.bank_discount_yield)),
            ("holding_period_yield", Value::Number(self.holding_period_yield)),
            ("effective_annual_yield", Value::Number(self.effective_annual_yield)),
        ])
    }
}

pub fn effective_annual_rate(p: &EffectiveAnnualRateParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let ear = calculate_effective_annual_rate(
        &cfg.number(p.nominal_rate)?,
        &cfg.number(p.compounding_periods)?,
        cfg.digits(),
    )?;
    Ok(ear.to_native()?)
}

/// (1 + r/n)^n − 1; 0 when n is 0
pub fn calculate_effective_annual_rate(nominal: &Number, periods: &Number, precision: u32) -> CalcResult<Number> {
    if periods.is_zero() {
        return Ok(Number::zero());
    }
    let periodic = nominal.checked_div(periods)?;
    let growth = Number::one().add(&periodic).pow_real(periods, precision)?;
    Ok(growth.sub(&Number::one()))
}

pub fn bank_discount_yield(p: &BankDiscountYieldParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let bdy = calculate_bank_discount_yield(
        &cfg.number(p.face_value)?,
        &cfg.number(p.purchase_price)?,
        &cfg.number(p.days)?,
    )?;
    Ok(bdy.to_native()?)
}

/// (F − P)/F · 360/days; 0 when F or days is 0
pub fn calculate_bank_discount_yield(face: &Number, price: &Number, days: &Number) -> CalcResult<Number> {
    if face.is_zero() || days.is_zero() {
        return Ok(Number::zero());
    }
    let discount = face.sub(price).checked_div(face)?;
    Ok(discount.mul(&Number::from_i64(360).checked_div(days)?))
}

pub fn effective_annual_yield(p: &EffectiveAnnualYieldParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let eay = calculate_effective_annual_yield(&cfg.number(p.hpy)?, &cfg.number(p.days)?, cfg.digits())?;
    Ok(eay.to_native()?)
}

/// (1 + hpy)^(365/days) − 1; 0 when days is 0
pub fn calculate_effective_annual_yield(hpy: &Number, days: &Number, precision: u32) -> CalcResult<Number> {
    if days.is_zero() {
        return Ok(Number::zero());
    }
    let exponent = Number::from_i64(365).checked_div(days)?;
    let growth = Number::one().add(hpy).pow_real(&exponent, precision)?;
    Ok(growth.sub(&Number::one()))
}

pub fn money_market_yields(p: &BankDiscountYieldParams, cfg: &EngineConfig) -> CalcResult<MoneyMarketYields> {
    calculate_money_market_yields(
        &cfg.number(p.face_value)?,
        &cfg.number(p.purchase_price)?,
        &cfg.number(p.days)?,
        cfg.digits(),
    )?
    .to_native()
}

/// Bank discount yield on face, holding-period yield (F − P)/P and its
/// annualized effective yield
pub fn calculate_money_market_yields(
    face: &Number,
    price: &Number,
    days: &Number,
    precision: u32,
) -> CalcResult<MoneyMarketYields<Number>> {
    let hpy = ratio_or_zero(&face.sub(price), price)?;
    Ok(MoneyMarketYields {
        bank_discount_yield: calculate_bank_discount_yield(face, price, days)?,
        effective_annual_yield: calculate_effective_annual_yield(&hpy, days, precision)?,
        holding_period_yield: hpy,
    })
}

// ============ EAR ============

pub struct Ear;

static EAR_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("nominal_rate", ArgKind::Number, "Stated annual rate"),
    ArgMeta::required("compounding_periods", ArgKind::Number, "Compounding periods per year"),
];

static EAR_EXAMPLES: [&str; 2] = [
    "ear(0.12, 12) → 0.126825",
    "ear(0.05, 0) → 0",
];

static EAR_RELATED: [&str; 2] = ["eay", "fv"];

impl FunctionPlugin for Ear {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ear",
            description: "Effective annual rate of a nominal rate; 0 with no compounding periods",
            usage: "ear(nominal_rate, compounding_periods)",
            args: &EAR_ARGS,
            returns: "Number",
            examples: &EAR_EXAMPLES,
            category: "finance/returns",
            source: Some("EAR = (1 + r/n)^n − 1"),
            related: &EAR_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &EAR_ARGS, "ear", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_effective_annual_rate(&nums[0], &nums[1], ctx.precision()))
    }
}

// ============ Bank Discount Yield ============

pub struct Bdy;

static BDY_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("face_value", ArgKind::Number, "Face (par) value"),
    ArgMeta::required("purchase_price", ArgKind::Number, "Purchase price"),
    ArgMeta::required("days", ArgKind::Number, "Days to maturity"),
];

static BDY_EXAMPLES: [&str; 1] = ["bdy(1000, 980, 90) → 0.08"];

static BDY_RELATED: [&str; 2] = ["eay", "money_market_yields"];

impl FunctionPlugin for Bdy {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "bdy",
            description: "Bank discount yield on a 360-day year",
            usage: "bdy(face_value, purchase_price, days)",
            args: &BDY_ARGS,
            returns: "Number",
            examples: &BDY_EXAMPLES,
            category: "finance/returns",
            source: Some("Rbd = (F − P)/F · 360/t"),
            related: &BDY_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &BDY_ARGS, "bdy", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_bank_discount_yield(&nums[0], &nums[1], &nums[2]))
    }
}

// ============ Effective Annual Yield ============

pub struct Eay;

static EAY_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("hpy", ArgKind::Number, "Holding-period yield"),
    ArgMeta::required("days", ArgKind::Number, "Days in the holding period"),
];

static EAY_EXAMPLES: [&str; 1] = ["eay(0.0204, 90) → 0.0853"];

static EAY_RELATED: [&str; 2] = ["bdy", "ear"];

impl FunctionPlugin for Eay {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "eay",
            description: "Effective annual yield on a 365-day year",
            usage: "eay(hpy, days)",
            args: &EAY_ARGS,
            returns: "Number",
            examples: &EAY_EXAMPLES,
            category: "finance/returns",
            source: Some("EAY = (1 + HPY)^(365/t) − 1"),
            related: &EAY_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &EAY_ARGS, "eay", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_effective_annual_yield(&nums[0], &nums[1], ctx.precision()))
    }
}

// ============ Money Market Yields ============

pub struct MoneyMarket;

static MONEY_MARKET_EXAMPLES: [&str; 1] = [
    "money_market_yields(1000, 980, 90) → {bank_discount_yield: 0.08, holding_period_yield: 0.0204, effective_annual_yield: 0.0853}",
];

static MONEY_MARKET_RELATED: [&str; 2] = ["bdy", "eay"];

impl FunctionPlugin for MoneyMarket {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "money_market_yields",
            description: "Bank discount, holding-period and effective annual yields of a discount instrument",
            usage: "money_market_yields(face_value, purchase_price, days)",
            args: &BDY_ARGS,
            returns: "Object",
            examples: &MONEY_MARKET_EXAMPLES,
            category: "finance/returns",
            source: Some("Rbd = (F − P)/F · 360/t, HPY = (F − P)/P, EAY = (1 + HPY)^(365/t) − 1"),
            related: &MONEY_MARKET_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &BDY_ARGS, "money_market_yields", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        match calculate_money_market_yields(&nums[0], &nums[1], &nums[2], ctx.precision()) {
            Ok(yields) => yields.into_value(),
            Err(e) => Value::Error(e),
        }
    }
}
