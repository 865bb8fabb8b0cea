//! Balance-sheet ratios from whichever figures are available

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::extract_optional_number;

/// Any field may be missing; a ratio whose inputs are absent or zero is 0
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRatiosParams {
    #[serde(default)]
    pub current_assets: Option<f64>,
    #[serde(default)]
    pub current_liabilities: Option<f64>,
    #[serde(default)]
    pub inventory: Option<f64>,
    #[serde(default)]
    pub total_debt: Option<f64>,
    #[serde(default)]
    pub total_equity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRatios<T = f64> {
    pub current_ratio: T,
    pub quick_ratio: T,
    pub debt_to_equity: T,
}

impl FinancialRatios<Number> {
    pub fn to_native(&self) -> CalcResult<FinancialRatios> {
        Ok(FinancialRatios {
            current_ratio: self.current_ratio.to_native()?,
            quick_ratio: self.quick_ratio.to_native()?,
            debt_to_equity: self.debt_to_equity.to_native()?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::object([
            ("current_ratio", Value::Number(self.current_ratio)),
            ("quick_ratio", Value::Number(self.quick_ratio)),
            ("debt_to_equity", Value::Number(self.debt_to_equity)),
        ])
    }
}

/// Balance-sheet inputs in decimal form
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    pub current_assets: Option<Number>,
    pub current_liabilities: Option<Number>,
    pub inventory: Option<Number>,
    pub total_debt: Option<Number>,
    pub total_equity: Option<Number>,
}

impl BalanceSheet {
    pub fn from_params(p: &FinancialRatiosParams, cfg: &EngineConfig) -> CalcResult<Self> {
        let convert = |field: Option<f64>| field.map(|x| cfg.number(x)).transpose();
        Ok(Self {
            current_assets: convert(p.current_assets)?,
            current_liabilities: convert(p.current_liabilities)?,
            inventory: convert(p.inventory)?,
            total_debt: convert(p.total_debt)?,
            total_equity: convert(p.total_equity)?,
        })
    }
}

/// Both figures present and non-zero
fn usable<'a>(a: &'a Option<Number>, b: &'a Option<Number>) -> Option<(&'a Number, &'a Number)> {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_zero() && !b.is_zero() => Some((a, b)),
        _ => None,
    }
}

pub fn financial_ratios(p: &FinancialRatiosParams, cfg: &EngineConfig) -> CalcResult<FinancialRatios> {
    calculate_financial_ratios(&BalanceSheet::from_params(p, cfg)?)?.to_native()
}

pub fn calculate_financial_ratios(sheet: &BalanceSheet) -> CalcResult<FinancialRatios<Number>> {
    let (current_ratio, quick_ratio) = match usable(&sheet.current_assets, &sheet.current_liabilities) {
        Some((assets, liabilities)) => {
            let inventory = sheet.inventory.clone().unwrap_or_else(Number::zero);
            (
                assets.checked_div(liabilities)?,
                assets.sub(&inventory).checked_div(liabilities)?,
            )
        }
        None => (Number::zero(), Number::zero()),
    };

    let debt_to_equity = match usable(&sheet.total_debt, &sheet.total_equity) {
        Some((debt, equity)) => debt.checked_div(equity)?,
        None => Number::zero(),
    };

    Ok(FinancialRatios { current_ratio, quick_ratio, debt_to_equity })
}

// ============ Financial Ratios ============

pub struct Ratios;

static RATIOS_ARGS: [ArgMeta; 5] = [
    ArgMeta::optional("current_assets", ArgKind::Number, "Current assets", "null"),
    ArgMeta::optional("current_liabilities", ArgKind::Number, "Current liabilities", "null"),
    ArgMeta::optional("inventory", ArgKind::Number, "Inventory, excluded from quick assets", "0"),
    ArgMeta::optional("total_debt", ArgKind::Number, "Total debt", "null"),
    ArgMeta::optional("total_equity", ArgKind::Number, "Shareholders' equity", "null"),
];

static RATIOS_EXAMPLES: [&str; 2] = [
    "financial_ratios(200000, 100000, 50000, 300000, 600000) → {current_ratio: 2, quick_ratio: 1.5, debt_to_equity: 0.5}",
    "financial_ratios(total_debt: 300000, total_equity: 600000) → {current_ratio: 0, quick_ratio: 0, debt_to_equity: 0.5}",
];

static RATIOS_RELATED: [&str; 2] = ["dupont", "wacc"];

impl FunctionPlugin for Ratios {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "financial_ratios",
            description: "Current, quick and debt-to-equity ratios; unavailable ratios are 0",
            usage: "financial_ratios(current_assets?, current_liabilities?, inventory?, total_debt?, total_equity?)",
            args: &RATIOS_ARGS,
            returns: "Object",
            examples: &RATIOS_EXAMPLES,
            category: "finance/corporate",
            source: Some("Current = CA / CL, Quick = (CA − Inventory) / CL, D/E = Debt / Equity"),
            related: &RATIOS_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        if args.len() > RATIOS_ARGS.len() {
            return Value::Error(CalcError::arg_count("financial_ratios", RATIOS_ARGS.len(), args.len()));
        }

        let mut fields = Vec::with_capacity(RATIOS_ARGS.len());
        for (index, arg) in RATIOS_ARGS.iter().enumerate() {
            match extract_optional_number(args, index, "financial_ratios", arg.name, ctx) {
                Ok(n) => fields.push(n),
                Err(e) => return Value::Error(e),
            }
        }

        let mut fields = fields.into_iter();
        let sheet = BalanceSheet {
            current_assets: fields.next().flatten(),
            current_liabilities: fields.next().flatten(),
            inventory: fields.next().flatten(),
            total_debt: fields.next().flatten(),
            total_equity: fields.next().flatten(),
        };

        match calculate_financial_ratios(&sheet) {
            Ok(ratios) => ratios.into_value(),
            Err(e) => Value::Error(e),
        }
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

    fn full_sheet() -> FinancialRatiosParams {
        FinancialRatiosParams {
            current_assets: Some(200_000.0),
            current_liabilities: Some(100_000.0),
            inventory: Some(50_000.0),
            total_debt: Some(300_000.0),
            total_equity: Some(600_000.0),
        }
    }

    #[test]
    fn test_all_ratios() {
        let ratios = financial_ratios(&full_sheet(), &cfg()).unwrap();
        assert_eq!(ratios, FinancialRatios { current_ratio: 2.0, quick_ratio: 1.5, debt_to_equity: 0.5 });
    }

    #[test]
    fn test_inventory_defaults_to_zero() {
        let p = FinancialRatiosParams { inventory: None, ..full_sheet() };
        let ratios = financial_ratios(&p, &cfg()).unwrap();
        assert_eq!(ratios.quick_ratio, ratios.current_ratio);
    }

    #[test]
    fn test_missing_inputs_give_zero() {
        let p = FinancialRatiosParams { current_liabilities: None, total_equity: Some(0.0), ..full_sheet() };
        let ratios = financial_ratios(&p, &cfg()).unwrap();
        assert_eq!(ratios, FinancialRatios { current_ratio: 0.0, quick_ratio: 0.0, debt_to_equity: 0.0 });

        let empty = financial_ratios(&FinancialRatiosParams::default(), &cfg()).unwrap();
        assert_eq!(empty.debt_to_equity, 0.0);
    }

    #[test]
    fn test_params_deserialize_partial() {
        let p: FinancialRatiosParams =
            serde_json::from_str(r#"{"totalDebt": 300000, "totalEquity": 600000}"#).unwrap();
        assert!(p.current_assets.is_none());
        assert_eq!(financial_ratios(&p, &cfg()).unwrap().debt_to_equity, 0.5);
    }

    #[test]
    fn test_plugin_with_nulls() {
        let args = vec![Value::Null, Value::Null, Value::Null, Value::from(300000), Value::from(600000)];
        let result = Ratios.call(&args, &eval_ctx());
        assert_eq!(result.get("debt_to_equity").as_number().unwrap().as_decimal(1), "0.5");
        assert!(result.get("current_ratio").as_number().unwrap().is_zero());
    }

    #[test]
    fn test_plugin_short_argument_list() {
        let args = vec![Value::from(200000), Value::from(100000)];
        let result = Ratios.call(&args, &eval_ctx());
        assert_eq!(result.get("current_ratio").as_number().unwrap().as_decimal(0), "2");
        assert_eq!(result.get("quick_ratio").as_number().unwrap().as_decimal(0), "2");
    }

    #[test]
    fn test_plugin_rejects_text() {
        let args = vec![Value::Text("lots".into())];
        let result = Ratios.call(&args, &eval_ctx());
        assert_eq!(result.as_error().unwrap().code, codes::ARG_TYPE);
    }
}
