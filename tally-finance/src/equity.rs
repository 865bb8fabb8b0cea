//! Equity valuation and corporate finance: DDM, CAPM, WACC, DuPont

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{extract_args, number_result, ratio_or_zero};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DdmParams {
    pub dividend: f64,
    pub return_rate: f64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapmParams {
    pub risk_free_rate: f64,
    pub beta: f64,
    pub market_return: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaccParams {
    pub equity_value: f64,
    pub debt_value: f64,
    pub cost_of_equity: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DupontParams {
    pub net_income: f64,
    pub revenue: f64,
    pub assets: f64,
    pub equity: f64,
}

/// Three-step decomposition of return on equity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dupont<T = f64> {
    pub profit_margin: T,
    pub asset_turnover: T,
    pub equity_multiplier: T,
    pub roe: T,
}

impl Dupont<Number> {
    pub fn to_native(&self) -> CalcResult<Dupont> {
        Ok(Dupont {
            profit_margin: self.profit_margin.to_native()?,
            asset_turnover: self.asset_turnover.to_native()?,
            equity_multiplier: self.equity_multiplier.to_native()?,
            roe: self.roe.to_native()?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::object([
            ("profit_margin", Value::Number(self.profit_margin)),
            ("asset_turnover", Value::Number(self.asset_turnover)),
            ("equity_multiplier", Value::Number(self.equity_multiplier)),
            ("roe", Value::Number(self.roe)),
        ])
    }
}

pub fn ddm(p: &DdmParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_ddm(
        &cfg.number(p.dividend)?,
        &cfg.number(p.return_rate)?,
        &cfg.number(p.growth_rate)?,
    )?;
    Ok(value.to_native()?)
}

/// Gordon growth: D / (k − g); 0 unless k > g
pub fn calculate_ddm(dividend: &Number, required_return: &Number, growth: &Number) -> CalcResult<Number> {
    if required_return <= growth {
        return Ok(Number::zero());
    }
    Ok(dividend.checked_div(&required_return.sub(growth))?)
}

pub fn capm(p: &CapmParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_capm(
        &cfg.number(p.risk_free_rate)?,
        &cfg.number(p.beta)?,
        &cfg.number(p.market_return)?,
    );
    Ok(value.to_native()?)
}

/// rf + β(rm − rf)
pub fn calculate_capm(risk_free: &Number, beta: &Number, market_return: &Number) -> Number {
    risk_free.add(&beta.mul(&market_return.sub(risk_free)))
}

pub fn wacc(p: &WaccParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_wacc(
        &cfg.number(p.equity_value)?,
        &cfg.number(p.debt_value)?,
        &cfg.number(p.cost_of_equity)?,
        &cfg.number(p.cost_of_debt)?,
        &cfg.number(p.tax_rate)?,
    )?;
    Ok(value.to_native()?)
}

/// (E/V)Re + (D/V)Rd(1 − T); 0 when V = E + D is 0
pub fn calculate_wacc(
    equity: &Number,
    debt: &Number,
    cost_of_equity: &Number,
    cost_of_debt: &Number,
    tax_rate: &Number,
) -> CalcResult<Number> {
    let total = equity.add(debt);
    if total.is_zero() {
        return Ok(Number::zero());
    }
    let equity_part = equity.checked_div(&total)?.mul(cost_of_equity);
    let after_tax_debt = cost_of_debt.mul(&Number::one().sub(tax_rate));
    let debt_part = debt.checked_div(&total)?.mul(&after_tax_debt);
    Ok(equity_part.add(&debt_part))
}

pub fn dupont(p: &DupontParams, cfg: &EngineConfig) -> CalcResult<Dupont> {
    calculate_dupont(
        &cfg.number(p.net_income)?,
        &cfg.number(p.revenue)?,
        &cfg.number(p.assets)?,
        &cfg.number(p.equity)?,
    )?
    .to_native()
}

/// Each component is 0 on a zero denominator; ROE is their product
pub fn calculate_dupont(
    net_income: &Number,
    revenue: &Number,
    assets: &Number,
    equity: &Number,
) -> CalcResult<Dupont<Number>> {
    let profit_margin = ratio_or_zero(net_income, revenue)?;
    let asset_turnover = ratio_or_zero(revenue, assets)?;
    let equity_multiplier = ratio_or_zero(assets, equity)?;
    let roe = profit_margin.mul(&asset_turnover).mul(&equity_multiplier);
    Ok(Dupont { profit_margin, asset_turnover, equity_multiplier, roe })
}

// ============ DDM ============

pub struct Ddm;

static DDM_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("dividend", ArgKind::Number, "Next year's dividend"),
    ArgMeta::required("return_rate", ArgKind::Number, "Required rate of return"),
    ArgMeta::required("growth_rate", ArgKind::Number, "Constant dividend growth rate"),
];

static DDM_EXAMPLES: [&str; 2] = ["ddm(2, 0.10, 0.05) → 40", "ddm(2, 0.05, 0.05) → 0"];

static DDM_RELATED: [&str; 2] = ["capm", "perpetuity"];

impl FunctionPlugin for Ddm {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ddm",
            description: "Gordon growth model share value; 0 unless return exceeds growth",
            usage: "ddm(dividend, return_rate, growth_rate)",
            args: &DDM_ARGS,
            returns: "Number",
            examples: &DDM_EXAMPLES,
            category: "finance/valuation",
            source: Some("P₀ = D₁ / (k − g)"),
            related: &DDM_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &DDM_ARGS, "ddm", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_ddm(&nums[0], &nums[1], &nums[2]))
    }
}

// ============ CAPM ============

pub struct Capm;

static CAPM_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("risk_free_rate", ArgKind::Number, "Risk-free rate"),
    ArgMeta::required("beta", ArgKind::Number, "Systematic risk of the asset"),
    ArgMeta::required("market_return", ArgKind::Number, "Expected market return"),
];

static CAPM_EXAMPLES: [&str; 1] = ["capm(0.03, 1.2, 0.10) → 0.114"];

static CAPM_RELATED: [&str; 2] = ["wacc", "ddm"];

impl FunctionPlugin for Capm {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "capm",
            description: "Expected return under the capital asset pricing model",
            usage: "capm(risk_free_rate, beta, market_return)",
            args: &CAPM_ARGS,
            returns: "Number",
            examples: &CAPM_EXAMPLES,
            category: "finance/valuation",
            source: Some("E(R) = Rf + β(Rm − Rf)"),
            related: &CAPM_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &CAPM_ARGS, "capm", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        Value::Number(calculate_capm(&nums[0], &nums[1], &nums[2]))
    }
}

// ============ WACC ============

pub struct Wacc;

static WACC_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("equity_value", ArgKind::Number, "Market value of equity"),
    ArgMeta::required("debt_value", ArgKind::Number, "Market value of debt"),
    ArgMeta::required("cost_of_equity", ArgKind::Number, "Required return on equity"),
    ArgMeta::required("cost_of_debt", ArgKind::Number, "Pre-tax cost of debt"),
    ArgMeta::required("tax_rate", ArgKind::Number, "Corporate tax rate"),
];

static WACC_EXAMPLES: [&str; 1] = ["wacc(600, 400, 0.12, 0.06, 0.30) → 0.0888"];

static WACC_RELATED: [&str; 2] = ["capm", "npv"];

impl FunctionPlugin for Wacc {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "wacc",
            description: "Weighted average cost of capital; 0 when the firm has no value",
            usage: "wacc(equity_value, debt_value, cost_of_equity, cost_of_debt, tax_rate)",
            args: &WACC_ARGS,
            returns: "Number",
            examples: &WACC_EXAMPLES,
            category: "finance/corporate",
            source: Some("WACC = (E/V)·Re + (D/V)·Rd·(1 − T)"),
            related: &WACC_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &WACC_ARGS, "wacc", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_wacc(&nums[0], &nums[1], &nums[2], &nums[3], &nums[4]))
    }
}

// ============ DuPont ============

pub struct DupontAnalysis;

static DUPONT_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("net_income", ArgKind::Number, "Net income"),
    ArgMeta::required("revenue", ArgKind::Number, "Revenue"),
    ArgMeta::required("assets", ArgKind::Number, "Total assets"),
    ArgMeta::required("equity", ArgKind::Number, "Shareholders' equity"),
];

static DUPONT_EXAMPLES: [&str; 1] = [
    "dupont(100, 1000, 2000, 800) → {profit_margin: 0.1, asset_turnover: 0.5, equity_multiplier: 2.5, roe: 0.125}",
];

static DUPONT_RELATED: [&str; 1] = ["financial_ratios"];

impl FunctionPlugin for DupontAnalysis {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "dupont",
            description: "DuPont decomposition of return on equity",
            usage: "dupont(net_income, revenue, assets, equity)",
            args: &DUPONT_ARGS,
            returns: "Object",
            examples: &DUPONT_EXAMPLES,
            category: "finance/corporate",
            source: Some("ROE = (NI/Revenue) · (Revenue/Assets) · (Assets/Equity)"),
            related: &DUPONT_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &DUPONT_ARGS, "dupont", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        match calculate_dupont(&nums[0], &nums[1], &nums[2], &nums[3]) {
            Ok(d) => d.into_value(),
            Err(e) => Value::Error(e),
        }
    }
}
