//! Real estate: capitalization rate and mortgage amortization

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{compound_factor, extract_args, number_result, ratio_or_zero, schedule_length};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapRateParams {
    pub noi: f64,
    pub property_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationParams {
    pub loan_amount: f64,
    /// Fraction, compounded monthly
    pub annual_interest_rate: f64,
    pub loan_term_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSummary<T = f64> {
    pub monthly_payment: T,
    pub total_interest: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow<T = f64> {
    pub period: u32,
    pub interest: T,
    pub principal: T,
    /// Remaining balance after this payment, never negative
    pub balance: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amortization<T = f64> {
    pub summary: AmortizationSummary<T>,
    pub schedule: Vec<AmortizationRow<T>>,
}

impl Amortization<Number> {
    pub fn to_native(&self) -> CalcResult<Amortization> {
        let summary = AmortizationSummary {
            monthly_payment: self.summary.monthly_payment.to_native()?,
            total_interest: self.summary.total_interest.to_native()?,
        };
        let schedule = self
            .schedule
            .iter()
            .map(|row| {
                Ok(AmortizationRow {
                    period: row.period,
                    interest: row.interest.to_native()?,
                    principal: row.principal.to_native()?,
                    balance: row.balance.to_native()?,
                })
            })
            .collect::<CalcResult<Vec<_>>>()?;
        Ok(Amortization { summary, schedule })
    }

    pub fn into_value(self) -> Value {
        let summary = Value::object([
            ("monthly_payment", Value::Number(self.summary.monthly_payment)),
            ("total_interest", Value::Number(self.summary.total_interest)),
        ]);
        let schedule: Vec<Value> = self
            .schedule
            .into_iter()
            .map(|row| {
                Value::object([
                    ("period", Value::from(row.period as i64)),
                    ("interest", Value::Number(row.interest)),
                    ("principal", Value::Number(row.principal)),
                    ("balance", Value::Number(row.balance)),
                ])
            })
            .collect();
        Value::object([("summary", summary), ("schedule", Value::List(schedule))])
    }
}

pub fn cap_rate(p: &CapRateParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_cap_rate(&cfg.number(p.noi)?, &cfg.number(p.property_value)?)?;
    Ok(value.to_native()?)
}

/// NOI / value; 0 when the value is 0
pub fn calculate_cap_rate(noi: &Number, property_value: &Number) -> CalcResult<Number> {
    ratio_or_zero(noi, property_value)
}

pub fn amortization(p: &AmortizationParams, cfg: &EngineConfig) -> CalcResult<Amortization> {
    calculate_amortization(
        &cfg.number(p.loan_amount)?,
        &cfg.number(p.annual_interest_rate)?,
        &cfg.number(p.loan_term_years)?,
        cfg.digits(),
    )?
    .to_native()
}

/// Level monthly payment and its schedule.
///
/// Rows cover periods 1..=floor(12 · years), at most 1200; a balance pushed
/// below zero by the last payment is reported as 0.
pub fn calculate_amortization(
    principal: &Number,
    annual_rate: &Number,
    years: &Number,
    precision: u32,
) -> CalcResult<Amortization<Number>> {
    let months = years.mul(&Number::from_i64(12));
    if months.is_zero() {
        return Ok(Amortization {
            summary: AmortizationSummary { monthly_payment: Number::zero(), total_interest: Number::zero() },
            schedule: Vec::new(),
        });
    }

    let rows = schedule_length(&months, "loan term")?;

    let r = annual_rate.checked_div(&Number::from_i64(12))?;
    let payment = if r.is_zero() {
        principal.checked_div(&months)?
    } else {
        // P·r(1+r)^n / ((1+r)^n − 1)
        let factor = compound_factor(&r, &months, precision)?;
        principal.mul(&r.mul(&factor).checked_div(&factor.sub(&Number::one()))?)
    };
    let total_interest = payment.mul(&months).sub(principal);

    let mut schedule = Vec::with_capacity(rows as usize);
    let mut balance = principal.clone();
    for period in 1..=rows as u32 {
        let interest = balance.mul(&r);
        let principal_part = payment.sub(&interest);
        balance = balance.sub(&principal_part);
        if balance.is_negative() {
            balance = Number::zero();
        }
        schedule.push(AmortizationRow {
            period,
            interest,
            principal: principal_part,
            balance: balance.clone(),
        });
    }

    Ok(Amortization {
        summary: AmortizationSummary { monthly_payment: payment, total_interest },
        schedule,
    })
}

// ============ Cap Rate ============

pub struct CapRate;

static CAP_RATE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("noi", ArgKind::Number, "Net operating income"),
    ArgMeta::required("property_value", ArgKind::Number, "Current market value"),
];

static CAP_RATE_EXAMPLES: [&str; 1] = ["cap_rate(50000, 625000) → 0.08"];

static CAP_RATE_RELATED: [&str; 1] = ["amortization"];

impl FunctionPlugin for CapRate {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "cap_rate",
            description: "Capitalization rate; 0 when the property has no value",
            usage: "cap_rate(noi, property_value)",
            args: &CAP_RATE_ARGS,
            returns: "Number",
            examples: &CAP_RATE_EXAMPLES,
            category: "finance/real-estate",
            source: Some("Cap Rate = NOI / Value"),
            related: &CAP_RATE_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &CAP_RATE_ARGS, "cap_rate", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_cap_rate(&nums[0], &nums[1]))
    }
}

// ============ Amortization ============

pub struct AmortizationSchedule;

static AMORTIZATION_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("loan_amount", ArgKind::Number, "Amount borrowed"),
    ArgMeta::required("annual_interest_rate", ArgKind::Number, "Annual interest rate"),
    ArgMeta::required("loan_term_years", ArgKind::Number, "Term in years"),
];

static AMORTIZATION_EXAMPLES: [&str; 1] = [
    "amortization(100000, 0.05, 30) → {summary: {monthly_payment: 536.82, ...}, schedule: [360 items]}",
];

static AMORTIZATION_RELATED: [&str; 2] = ["tvm", "cap_rate"];

impl FunctionPlugin for AmortizationSchedule {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "amortization",
            description: "Monthly payment, total interest and schedule of a fixed-rate loan",
            usage: "amortization(loan_amount, annual_interest_rate, loan_term_years)",
            args: &AMORTIZATION_ARGS,
            returns: "Object",
            examples: &AMORTIZATION_EXAMPLES,
            category: "finance/lending",
            source: Some("M = P·r(1 + r)^n / ((1 + r)^n − 1), r = rate/12, n = 12·years"),
            related: &AMORTIZATION_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &AMORTIZATION_ARGS, "amortization", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        match calculate_amortization(&nums[0], &nums[1], &nums[2], ctx.precision()) {
            Ok(a) => a.into_value(),
            Err(e) => Value::Error(e),
        }
    }
}
