//! Returns and portfolio risk

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{extract_args, extract_numbers_from_list, number_result, ratio_or_zero};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingPeriodReturnParams {
    pub beginning_value: f64,
    pub ending_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiParams {
    pub amount_gained: f64,
    pub amount_spent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReturnParams {
    pub weights: Vec<f64>,
    pub returns: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharpeRatioParams {
    pub portfolio_return: f64,
    pub risk_free_rate: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoAssetPortfolioParams {
    pub w1: f64,
    pub s1: f64,
    pub w2: f64,
    pub s2: f64,
    pub corr: f64,
}

pub fn holding_period_return(p: &HoldingPeriodReturnParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let hpr = calculate_holding_period_return(&cfg.number(p.beginning_value)?, &cfg.number(p.ending_value)?)?;
    Ok(hpr.to_native()?)
}

/// (end − begin)/begin; 0 when begin is 0
pub fn calculate_holding_period_return(beginning: &Number, ending: &Number) -> CalcResult<Number> {
    ratio_or_zero(&ending.sub(beginning), beginning)
}

pub fn roi(p: &RoiParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_roi(&cfg.number(p.amount_gained)?, &cfg.number(p.amount_spent)?)?;
    Ok(value.to_native()?)
}

/// (gained − spent)/spent; 0 when spent is 0
pub fn calculate_roi(gained: &Number, spent: &Number) -> CalcResult<Number> {
    ratio_or_zero(&gained.sub(spent), spent)
}

pub fn portfolio_return(p: &PortfolioReturnParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let value = calculate_portfolio_return(&cfg.numbers(&p.weights)?, &cfg.numbers(&p.returns)?)?;
    Ok(value.to_native()?)
}

/// Σ wᵢ rᵢ over equally long sequences
pub fn calculate_portfolio_return(weights: &[Number], returns: &[Number]) -> CalcResult<Number> {
    if weights.len() != returns.len() {
        return Err(CalcError::domain_error(format!(
            "{} weights for {} returns",
            weights.len(),
            returns.len()
        ))
        .with_suggestion("Give one weight per asset return"));
    }
    Ok(weights
        .iter()
        .zip(returns)
        .fold(Number::zero(), |acc, (w, r)| acc.add(&w.mul(r))))
}

pub fn sharpe_ratio(p: &SharpeRatioParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let sharpe = calculate_sharpe_ratio(
        &cfg.number(p.portfolio_return)?,
        &cfg.number(p.risk_free_rate)?,
        &cfg.number(p.std_dev)?,
    )?;
    Ok(sharpe.to_native()?)
}

/// (Rp − Rf)/σ; 0 when σ is 0
pub fn calculate_sharpe_ratio(portfolio_return: &Number, risk_free: &Number, std_dev: &Number) -> CalcResult<Number> {
    ratio_or_zero(&portfolio_return.sub(risk_free), std_dev)
}

pub fn two_asset_portfolio_std_dev(p: &TwoAssetPortfolioParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let sd = calculate_two_asset_std_dev(
        &cfg.number(p.w1)?,
        &cfg.number(p.s1)?,
        &cfg.number(p.w2)?,
        &cfg.number(p.s2)?,
        &cfg.number(p.corr)?,
        cfg.digits(),
    )?;
    Ok(sd.to_native()?)
}

/// √(w₁²σ₁² + w₂²σ₂² + 2w₁w₂σ₁σ₂ρ)
pub fn calculate_two_asset_std_dev(
    w1: &Number,
    s1: &Number,
    w2: &Number,
    s2: &Number,
    corr: &Number,
    precision: u32,
) -> CalcResult<Number> {
    let first = w1.mul(s1);
    let second = w2.mul(s2);
    let covariance = Number::from_i64(2).mul(&first).mul(&second).mul(corr);
    let variance = first.mul(&first).add(&second.mul(&second)).add(&covariance);

    if variance.is_negative() {
        return Err(CalcError::domain_error("portfolio variance is negative")
            .with_suggestion("Correlation must lie in [-1, 1]"));
    }
    Ok(variance.sqrt(precision)?)
}

// ============ HPR ============

pub struct Hpr;

static HPR_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("beginning_value", ArgKind::Number, "Value at the start of the period"),
    ArgMeta::required("ending_value", ArgKind::Number, "Value at the end, income included"),
];

static HPR_EXAMPLES: [&str; 1] = ["hpr(100, 110) → 0.10"];

static HPR_RELATED: [&str; 2] = ["roi", "geometric_mean"];

impl FunctionPlugin for Hpr {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "hpr",
            description: "Holding period return; 0 when the beginning value is 0",
            usage: "hpr(beginning_value, ending_value)",
            args: &HPR_ARGS,
            returns: "Number",
            examples: &HPR_EXAMPLES,
            category: "finance/returns",
            source: Some("HPR = (P₁ − P₀) / P₀"),
            related: &HPR_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &HPR_ARGS, "hpr", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_holding_period_return(&nums[0], &nums[1]))
    }
}

// ============ ROI ============

pub struct Roi;

static ROI_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("amount_gained", ArgKind::Number, "Total amount returned"),
    ArgMeta::required("amount_spent", ArgKind::Number, "Amount invested"),
];

static ROI_EXAMPLES: [&str; 1] = ["roi(1500, 1000) → 0.5"];

static ROI_RELATED: [&str; 1] = ["hpr"];

impl FunctionPlugin for Roi {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "roi",
            description: "Return on investment; 0 when nothing was spent",
            usage: "roi(amount_gained, amount_spent)",
            args: &ROI_ARGS,
            returns: "Number",
            examples: &ROI_EXAMPLES,
            category: "finance/returns",
            source: Some("ROI = (Gain − Cost) / Cost"),
            related: &ROI_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &ROI_ARGS, "roi", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_roi(&nums[0], &nums[1]))
    }
}

// ============ Portfolio Return ============

pub struct PortfolioReturn;

static PORTFOLIO_RETURN_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("weights", ArgKind::NumberList, "Asset weights"),
    ArgMeta::required("returns", ArgKind::NumberList, "Asset returns, one per weight"),
];

static PORTFOLIO_RETURN_EXAMPLES: [&str; 1] = ["portfolio_return([0.6, 0.4], [0.10, 0.05]) → 0.08"];

static PORTFOLIO_RETURN_RELATED: [&str; 2] = ["portfolio_std_dev", "sharpe"];

impl FunctionPlugin for PortfolioReturn {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "portfolio_return",
            description: "Weighted expected return of a portfolio",
            usage: "portfolio_return(weights, returns)",
            args: &PORTFOLIO_RETURN_ARGS,
            returns: "Number",
            examples: &PORTFOLIO_RETURN_EXAMPLES,
            category: "finance/portfolio",
            source: Some("E(Rp) = Σ wᵢ E(Rᵢ)"),
            related: &PORTFOLIO_RETURN_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        if args.len() < 2 {
            return Value::Error(CalcError::arg_count("portfolio_return", 2, args.len()));
        }
        let weights = match extract_numbers_from_list(&args[0], "portfolio_return", "weights", ctx) {
            Ok(w) => w,
            Err(e) => return Value::Error(e),
        };
        let returns = match extract_numbers_from_list(&args[1], "portfolio_return", "returns", ctx) {
            Ok(r) => r,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_portfolio_return(&weights, &returns))
    }
}

// ============ Sharpe Ratio ============

pub struct Sharpe;

static SHARPE_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("portfolio_return", ArgKind::Number, "Portfolio return"),
    ArgMeta::required("risk_free_rate", ArgKind::Number, "Risk-free rate"),
    ArgMeta::required("std_dev", ArgKind::Number, "Standard deviation of portfolio returns"),
];

static SHARPE_EXAMPLES: [&str; 1] = ["sharpe(0.12, 0.03, 0.15) → 0.6"];

static SHARPE_RELATED: [&str; 2] = ["portfolio_return", "stddev"];

impl FunctionPlugin for Sharpe {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "sharpe",
            description: "Sharpe ratio; 0 when volatility is 0",
            usage: "sharpe(portfolio_return, risk_free_rate, std_dev)",
            args: &SHARPE_ARGS,
            returns: "Number",
            examples: &SHARPE_EXAMPLES,
            category: "finance/portfolio",
            source: Some("S = (Rp − Rf) / σp"),
            related: &SHARPE_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &SHARPE_ARGS, "sharpe", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_sharpe_ratio(&nums[0], &nums[1], &nums[2]))
    }
}

// ============ Two-Asset Portfolio Risk ============

pub struct PortfolioStdDev;

static PORTFOLIO_STD_DEV_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("w1", ArgKind::Number, "Weight of asset 1"),
    ArgMeta::required("s1", ArgKind::Number, "Standard deviation of asset 1"),
    ArgMeta::required("w2", ArgKind::Number, "Weight of asset 2"),
    ArgMeta::required("s2", ArgKind::Number, "Standard deviation of asset 2"),
    ArgMeta::required("corr", ArgKind::Number, "Correlation between the assets"),
];

static PORTFOLIO_STD_DEV_EXAMPLES: [&str; 1] = ["portfolio_std_dev(0.5, 0.2, 0.5, 0.1, 0) → 0.1118"];

static PORTFOLIO_STD_DEV_RELATED: [&str; 2] = ["portfolio_return", "sharpe"];

impl FunctionPlugin for PortfolioStdDev {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "portfolio_std_dev",
            description: "Standard deviation of a two-asset portfolio",
            usage: "portfolio_std_dev(w1, s1, w2, s2, corr)",
            args: &PORTFOLIO_STD_DEV_ARGS,
            returns: "Number",
            examples: &PORTFOLIO_STD_DEV_EXAMPLES,
            category: "finance/portfolio",
            source: Some("σp = √(w₁²σ₁² + w₂²σ₂² + 2w₁w₂σ₁σ₂ρ)"),
            related: &PORTFOLIO_STD_DEV_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let nums = match extract_args(args, &PORTFOLIO_STD_DEV_ARGS, "portfolio_std_dev", ctx) {
            Ok(n) => n,
            Err(e) => return Value::Error(e),
        };
        number_result(calculate_two_asset_std_dev(
            &nums[0],
            &nums[1],
            &nums[2],
            &nums[3],
            &nums[4],
            ctx.precision(),
        ))
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

    #[test]
    fn test_holding_period_return() {
        let hpr = holding_period_return(&HoldingPeriodReturnParams { beginning_value: 100.0, ending_value: 110.0 }, &cfg()).unwrap();
        assert!((hpr - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominators_return_zero() {
        let hpr = holding_period_return(&HoldingPeriodReturnParams { beginning_value: 0.0, ending_value: 110.0 }, &cfg()).unwrap();
        assert_eq!(hpr, 0.0);

        let value = roi(&RoiParams { amount_gained: 50.0, amount_spent: 0.0 }, &cfg()).unwrap();
        assert_eq!(value, 0.0);

        let sharpe = sharpe_ratio(&SharpeRatioParams { portfolio_return: 0.1, risk_free_rate: 0.02, std_dev: 0.0 }, &cfg()).unwrap();
        assert_eq!(sharpe, 0.0);
    }

    #[test]
    fn test_roi() {
        let value = roi(&RoiParams { amount_gained: 1500.0, amount_spent: 1000.0 }, &cfg()).unwrap();
        assert_eq!(value, 0.5);
    }

    #[test]
    fn test_portfolio_return() {
        let params = PortfolioReturnParams { weights: vec![0.6, 0.4], returns: vec![0.10, 0.05] };
        let value = portfolio_return(&params, &cfg()).unwrap();
        assert!((value - 0.08).abs() < 1e-15);
    }

    #[test]
    fn test_portfolio_return_length_mismatch() {
        let params = PortfolioReturnParams { weights: vec![0.6, 0.4], returns: vec![0.10] };
        assert_eq!(portfolio_return(&params, &cfg()).unwrap_err().code, codes::DOMAIN_ERROR);
    }

    #[test]
    fn test_sharpe_ratio() {
        let value = sharpe_ratio(&SharpeRatioParams { portfolio_return: 0.12, risk_free_rate: 0.03, std_dev: 0.15 }, &cfg()).unwrap();
        assert!((value - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_two_asset_std_dev() {
        let uncorrelated = TwoAssetPortfolioParams { w1: 0.5, s1: 0.2, w2: 0.5, s2: 0.1, corr: 0.0 };
        let sd = two_asset_portfolio_std_dev(&uncorrelated, &cfg()).unwrap();
        assert!((sd - 0.0125f64.sqrt()).abs() < 1e-12);

        // Perfect correlation: risk is the weighted average
        let correlated = TwoAssetPortfolioParams { corr: 1.0, ..uncorrelated };
        let sd = two_asset_portfolio_std_dev(&correlated, &cfg()).unwrap();
        assert!((sd - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_two_asset_invalid_correlation() {
        let params = TwoAssetPortfolioParams { w1: 0.5, s1: 0.2, w2: 0.5, s2: 0.2, corr: -3.0 };
        assert_eq!(two_asset_portfolio_std_dev(&params, &cfg()).unwrap_err().code, codes::DOMAIN_ERROR);
    }

    #[test]
    fn test_portfolio_return_plugin() {
        let weights = Value::from(vec![
            Value::Number(Number::from_str("0.6").unwrap()),
            Value::Number(Number::from_str("0.4").unwrap()),
        ]);
        let returns = Value::from(vec![
            Value::Number(Number::from_str("0.10").unwrap()),
            Value::Number(Number::from_str("0.05").unwrap()),
        ]);
        let result = PortfolioReturn.call(&[weights, returns], &eval_ctx());
        assert_eq!(result.as_number().unwrap(), &Number::from_str("0.08").unwrap());
    }

    #[test]
    fn test_hpr_plugin_arg_count() {
        let result = Hpr.call(&[Value::from(100)], &eval_ctx());
        assert_eq!(result.as_error().unwrap().code, codes::ARG_COUNT);
    }
}
