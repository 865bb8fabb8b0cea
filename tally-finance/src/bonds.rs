//! Fixed income: bond price, yield to maturity, duration, convexity
//!
//! Coupons are level and paid `frequency` times a year; the first coupon
//! falls one full period from now.

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{compound_factor, extract_args, extract_optional_number, number_result, schedule_length};
use crate::solver::{bisect, BisectionConfig, Bracket, Slope};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondParams {
    pub face_value: f64,
    pub coupon_rate: f64,
    pub market_rate: f64,
    pub years: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtmParams {
    pub current_price: f64,
    pub face_value: f64,
    pub coupon_rate: f64,
    pub years: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duration<T = f64> {
    /// Years
    pub macaulay: T,
    pub modified: T,
}

impl Duration<Number> {
    pub fn to_native(&self) -> CalcResult<Duration> {
        Ok(Duration {
            macaulay: self.macaulay.to_native()?,
            modified: self.modified.to_native()?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::object([
            ("macaulay", Value::Number(self.macaulay)),
            ("modified", Value::Number(self.modified)),
        ])
    }
}

/// A bond with its inputs already in the decimal domain
#[derive(Debug, Clone)]
pub struct Bond {
    pub face_value: Number,
    pub coupon_rate: Number,
    pub years: Number,
    pub frequency: Number,
}

impl Bond {
    pub fn new(face_value: Number, coupon_rate: Number, years: Number, frequency: Number) -> CalcResult<Self> {
        if !frequency.is_positive() {
            return Err(CalcError::domain_error("coupon frequency must be positive"));
        }
        Ok(Self { face_value, coupon_rate, years, frequency })
    }

    fn from_params(p: &BondParams, cfg: &EngineConfig) -> CalcResult<Self> {
        Self::new(
            cfg.number(p.face_value)?,
            cfg.number(p.coupon_rate)?,
            cfg.number(p.years)?,
            cfg.number(p.frequency)?,
        )
    }

    /// Coupon paid each period
    fn coupon(&self) -> CalcResult<Number> {
        Ok(self.face_value.mul(&self.coupon_rate).checked_div(&self.frequency)?)
    }

    fn periodic_rate(&self, market_rate: &Number) -> CalcResult<Number> {
        Ok(market_rate.checked_div(&self.frequency)?)
    }

    /// c(1 − (1+r)^−n)/r + F/(1+r)^n, or F + cn at a zero rate
    pub fn price(&self, market_rate: &Number, precision: u32) -> CalcResult<Number> {
        let r = self.periodic_rate(market_rate)?;
        let c = self.coupon()?;
        let n = self.years.mul(&self.frequency);

        if r.is_zero() {
            return Ok(self.face_value.add(&c.mul(&n)));
        }

        let factor = compound_factor(&r, &n, precision)?;
        let discount = Number::one().sub(&Number::one().checked_div(&factor)?);
        let coupons = c.mul(&discount).checked_div(&r)?;
        let principal = self.face_value.checked_div(&factor)?;
        Ok(coupons.add(&principal))
    }

    /// Discounted cash flows for t = 1..=floor(years · frequency), at most 1200
    fn discounted_flows(&self, r: &Number) -> CalcResult<Vec<(i64, Number)>> {
        let periods = schedule_length(&self.years.mul(&self.frequency), "bond term")?;
        if periods == 0 {
            return Err(CalcError::domain_error("bond has no coupon periods"));
        }

        let c = self.coupon()?;
        let growth = Number::one().add(r);
        let mut flows = Vec::with_capacity(periods as usize);
        for t in 1..=periods {
            let cash = if t == periods { c.add(&self.face_value) } else { c.clone() };
            flows.push((t, cash.checked_div(&growth.pow(t)?)?));
        }
        Ok(flows)
    }

    pub fn duration(&self, market_rate: &Number) -> CalcResult<Duration<Number>> {
        let r = self.periodic_rate(market_rate)?;
        let flows = self.discounted_flows(&r)?;

        let price = flows.iter().fold(Number::zero(), |acc, (_, pv)| acc.add(pv));
        if price.is_zero() {
            return Err(CalcError::domain_error("bond price is zero"));
        }
        let weighted = flows
            .iter()
            .fold(Number::zero(), |acc, (t, pv)| acc.add(&pv.mul(&Number::from_i64(*t))));

        // Duration in periods, then in years
        let periods = weighted.checked_div(&price)?;
        let macaulay = periods.checked_div(&self.frequency)?;
        let modified = macaulay.checked_div(&Number::one().add(&r))?;
        Ok(Duration { macaulay, modified })
    }

    pub fn convexity(&self, market_rate: &Number) -> CalcResult<Number> {
        let r = self.periodic_rate(market_rate)?;
        let flows = self.discounted_flows(&r)?;

        let price = flows.iter().fold(Number::zero(), |acc, (_, pv)| acc.add(pv));
        if price.is_zero() {
            return Err(CalcError::domain_error("bond price is zero"));
        }
        let weighted = flows.iter().fold(Number::zero(), |acc, (t, pv)| {
            acc.add(&pv.mul(&Number::from_i64(t * (t + 1))))
        });

        let growth = Number::one().add(&r);
        let scale = price
            .mul(&growth.mul(&growth))
            .mul(&self.frequency.mul(&self.frequency));
        Ok(weighted.checked_div(&scale)?)
    }
}

pub fn bond_price(p: &BondParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let bond = Bond::from_params(p, cfg)?;
    Ok(bond.price(&cfg.number(p.market_rate)?, cfg.digits())?.to_native()?)
}

pub fn ytm(p: &YtmParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let bond = Bond::new(
        cfg.number(p.face_value)?,
        cfg.number(p.coupon_rate)?,
        cfg.number(p.years)?,
        cfg.number(p.frequency)?,
    )?;
    Ok(calculate_ytm(&bond, &cfg.number(p.current_price)?, cfg)?.to_native()?)
}

/// Annual market rate at which the bond prices to `current_price`.
///
/// Bisection over (0, 1) from 0.05, accepting a price within 1e-4.
pub fn calculate_ytm(bond: &Bond, current_price: &Number, cfg: &EngineConfig) -> CalcResult<Number> {
    let precision = cfg.digits();
    let bracket = Bracket::new(cfg.lift(Number::zero()), cfg.lift(Number::one()));
    let guess = cfg.lift(Number::from_ratio(5, 100)?);
    let config = BisectionConfig::default().with_tolerance(Number::from_scientific(1, -4));

    // Price falls as the yield rises
    let outcome = bisect(
        |rate| Ok(bond.price(rate, precision)?.sub(current_price)),
        bracket,
        guess,
        Slope::Decreasing,
        &config,
    )?;
    outcome.resolve(cfg.exhaustion, "YTM")
}

pub fn duration(p: &BondParams, cfg: &EngineConfig) -> CalcResult<Duration> {
    let bond = Bond::from_params(p, cfg)?;
    bond.duration(&cfg.number(p.market_rate)?)?.to_native()
}

pub fn convexity(p: &BondParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let bond = Bond::from_params(p, cfg)?;
    Ok(bond.convexity(&cfg.number(p.market_rate)?)?.to_native()?)
}

static BOND_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("face_value", ArgKind::Number, "Face (par) value"),
    ArgMeta::required("coupon_rate", ArgKind::Number, "Annual coupon rate"),
    ArgMeta::required("market_rate", ArgKind::Number, "Annual market yield"),
    ArgMeta::required("years", ArgKind::Number, "Years to maturity"),
    ArgMeta::optional("frequency", ArgKind::Number, "Coupon payments per year", "2"),
];

/// Bond and market rate from `BOND_ARGS`-shaped arguments
fn bond_from_args(args: &[Value], func: &str, ctx: &EvalContext) -> CalcResult<(Bond, Number)> {
    let nums = extract_args(args, &BOND_ARGS, func, ctx)?;
    let frequency = extract_optional_number(args, 4, func, "frequency", ctx)?
        .unwrap_or_else(|| ctx.lift(Number::from_i64(2)));
    let bond = Bond::new(nums[0].clone(), nums[1].clone(), nums[3].clone(), frequency)?;
    Ok((bond, nums[2].clone()))
}

// ============ Bond Price ============

pub struct BondPrice;

static BOND_PRICE_EXAMPLES: [&str; 2] = [
    "bond_price(1000, 0.05, 0.05, 10) → 1000",
    "bond_price(1000, 0.06, 0.05, 10, 2) → 1077.95",
];

static BOND_PRICE_RELATED: [&str; 3] = ["ytm", "duration", "convexity"];

impl FunctionPlugin for BondPrice {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "bond_price",
            description: "Price of a level-coupon bond",
            usage: "bond_price(face_value, coupon_rate, market_rate, years, [frequency])",
            args: &BOND_ARGS,
            returns: "Number",
            examples: &BOND_PRICE_EXAMPLES,
            category: "finance/fixed-income",
            source: Some("P = C·(1 − (1 + r)^−n)/r + F/(1 + r)^n"),
            related: &BOND_PRICE_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let (bond, market_rate) = match bond_from_args(args, "bond_price", ctx) {
            Ok(b) => b,
            Err(e) => return Value::Error(e),
        };
        number_result(bond.price(&market_rate, ctx.precision()))
    }
}

// ============ YTM ============

pub struct Ytm;

static YTM_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("current_price", ArgKind::Number, "Market price of the bond"),
    ArgMeta::required("face_value", ArgKind::Number, "Face (par) value"),
    ArgMeta::required("coupon_rate", ArgKind::Number, "Annual coupon rate"),
    ArgMeta::required("years", ArgKind::Number, "Years to maturity"),
    ArgMeta::optional("frequency", ArgKind::Number, "Coupon payments per year", "2"),
];

static YTM_EXAMPLES: [&str; 1] = ["ytm(1077.95, 1000, 0.06, 10, 2) → 0.05"];

static YTM_RELATED: [&str; 2] = ["bond_price", "irr"];

impl FunctionPlugin for Ytm {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ytm",
            description: "Yield to maturity by bisection over (0%, 100%)",
            usage: "ytm(current_price, face_value, coupon_rate, years, [frequency])",
            args: &YTM_ARGS,
            returns: "Number",
            examples: &YTM_EXAMPLES,
            category: "finance/fixed-income",
            source: Some("P = Σ C/(1 + y)^t + F/(1 + y)^n, solved for y"),
            related: &YTM_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &YTM_ARGS, "ytm", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        let frequency = match extract_optional_number(args, 4, "ytm", "frequency", ctx) {
            Ok(f) => f.unwrap_or_else(|| ctx.lift(Number::from_i64(2))),
            Err(e) => return Value::Error(e),
        };
        let bond = match Bond::new(nums[1].clone(), nums[2].clone(), nums[3].clone(), frequency) {
            Ok(b) => b,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_ytm(&bond, &nums[0], &ctx.config))
    }
}

// ============ Duration ============

pub struct BondDuration;

static DURATION_EXAMPLES: [&str; 1] = [
    "duration(1000, 0.05, 0.05, 10, 1) → {macaulay: 8.1078, modified: 7.7217}",
];

static DURATION_RELATED: [&str; 2] = ["convexity", "bond_price"];

impl FunctionPlugin for BondDuration {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "duration",
            description: "Macaulay and modified duration in years",
            usage: "duration(face_value, coupon_rate, market_rate, years, [frequency])",
            args: &BOND_ARGS,
            returns: "Object",
            examples: &DURATION_EXAMPLES,
            category: "finance/fixed-income",
            source: Some("D = Σ t·PV(CFₜ) / P / f, D* = D / (1 + r)"),
            related: &DURATION_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let (bond, market_rate) = match bond_from_args(args, "duration", ctx) {
            Ok(b) => b,
            Err(e) => return Value::Error(e),
        };
        match bond.duration(&market_rate) {
            Ok(d) => d.into_value(),
            Err(e) => Value::Error(e),
        }
    }
}

// ============ Convexity ============

pub struct Convexity;

static CONVEXITY_EXAMPLES: [&str; 1] = ["convexity(1000, 0.05, 0.05, 10, 1) → 74.9977"];

static CONVEXITY_RELATED: [&str; 2] = ["duration", "bond_price"];

impl FunctionPlugin for Convexity {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "convexity",
            description: "Bond convexity in years squared",
            usage: "convexity(face_value, coupon_rate, market_rate, years, [frequency])",
            args: &BOND_ARGS,
            returns: "Number",
            examples: &CONVEXITY_EXAMPLES,
            category: "finance/fixed-income",
            source: Some("C = Σ PV(CFₜ)·t(t + 1) / (P·(1 + r)²·f²)"),
            related: &CONVEXITY_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let (bond, market_rate) = match bond_from_args(args, "convexity", ctx) {
            Ok(b) => b,
            Err(e) => return Value::Error(e),
        };
        number_result(bond.convexity(&market_rate))
    }
}
