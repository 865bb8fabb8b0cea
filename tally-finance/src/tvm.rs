//! Time value of money: solve PV(1+r)^n + PMT((1+r)^n − 1)/r + FV = 0
//!
//! Ordinary annuity (payments at period end). The rate is an annual nominal
//! fraction, converted to a periodic rate with `periods_per_year`. Closed
//! forms cover FV, PV, PMT and N; the rate is found by bisection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_plugin::prelude::*;

use crate::helpers::{compound_factor, extract_optional_number, number_result};
use crate::solver::{bisect, BisectionConfig, Bracket, Slope};

/// The unknown being solved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TvmTarget {
    Fv,
    Pv,
    Pmt,
    N,
    Iy,
}

impl TvmTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            TvmTarget::Fv => "FV",
            TvmTarget::Pv => "PV",
            TvmTarget::Pmt => "PMT",
            TvmTarget::N => "N",
            TvmTarget::Iy => "IY",
        }
    }
}

impl FromStr for TvmTarget {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FV" => Ok(TvmTarget::Fv),
            "PV" => Ok(TvmTarget::Pv),
            "PMT" => Ok(TvmTarget::Pmt),
            "N" => Ok(TvmTarget::N),
            "IY" | "I/Y" | "RATE" => Ok(TvmTarget::Iy),
            other => Err(CalcError::new(
                codes::DOMAIN_ERROR,
                format!("Unknown TVM target '{}'", other),
            )
            .with_suggestion("Use one of FV, PV, PMT, N, IY")),
        }
    }
}

/// Loose TVM inputs: every field except the target may be absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvmParams<T = f64> {
    pub solve_for: TvmTarget,
    #[serde(default)]
    pub n: Option<T>,
    /// Annual nominal rate as a fraction
    #[serde(default)]
    pub rate: Option<T>,
    #[serde(default)]
    pub pv: Option<T>,
    #[serde(default)]
    pub pmt: Option<T>,
    #[serde(default)]
    pub fv: Option<T>,
    pub periods_per_year: T,
}

impl<T> TvmParams<T> {
    /// Pick the four knowns the target needs; an absent one is `MISSING_INPUT`
    pub fn into_query(self) -> CalcResult<TvmQuery<T>> {
        let target = self.solve_for.as_str();
        let need = |value: Option<T>, field: &str| {
            value.ok_or_else(|| CalcError::missing_input(field, target))
        };

        Ok(match self.solve_for {
            TvmTarget::Fv => TvmQuery::FutureValue {
                periods: need(self.n, "n")?,
                rate: need(self.rate, "rate")?,
                pv: need(self.pv, "pv")?,
                pmt: need(self.pmt, "pmt")?,
            },
            TvmTarget::Pv => TvmQuery::PresentValue {
                periods: need(self.n, "n")?,
                rate: need(self.rate, "rate")?,
                fv: need(self.fv, "fv")?,
                pmt: need(self.pmt, "pmt")?,
            },
            TvmTarget::Pmt => TvmQuery::Payment {
                periods: need(self.n, "n")?,
                rate: need(self.rate, "rate")?,
                pv: need(self.pv, "pv")?,
                fv: need(self.fv, "fv")?,
            },
            TvmTarget::N => TvmQuery::Periods {
                rate: need(self.rate, "rate")?,
                pv: need(self.pv, "pv")?,
                pmt: need(self.pmt, "pmt")?,
                fv: need(self.fv, "fv")?,
            },
            TvmTarget::Iy => TvmQuery::Rate {
                periods: need(self.n, "n")?,
                pv: need(self.pv, "pv")?,
                pmt: need(self.pmt, "pmt")?,
                fv: need(self.fv, "fv")?,
            },
        })
    }
}

/// A well-formed TVM problem: one variant per unknown, carrying its knowns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "solveFor", rename_all = "camelCase")]
pub enum TvmQuery<T = f64> {
    FutureValue { periods: T, rate: T, pv: T, pmt: T },
    PresentValue { periods: T, rate: T, fv: T, pmt: T },
    Payment { periods: T, rate: T, pv: T, fv: T },
    Periods { rate: T, pv: T, pmt: T, fv: T },
    Rate { periods: T, pv: T, pmt: T, fv: T },
}

impl<T> TvmQuery<T> {
    pub fn target(&self) -> TvmTarget {
        match self {
            TvmQuery::FutureValue { .. } => TvmTarget::Fv,
            TvmQuery::PresentValue { .. } => TvmTarget::Pv,
            TvmQuery::Payment { .. } => TvmTarget::Pmt,
            TvmQuery::Periods { .. } => TvmTarget::N,
            TvmQuery::Rate { .. } => TvmTarget::Iy,
        }
    }

    /// Convert every known, stopping at the first failure
    pub fn try_map<U, E, F>(self, mut f: F) -> Result<TvmQuery<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(match self {
            TvmQuery::FutureValue { periods, rate, pv, pmt } => TvmQuery::FutureValue {
                periods: f(periods)?,
                rate: f(rate)?,
                pv: f(pv)?,
                pmt: f(pmt)?,
            },
            TvmQuery::PresentValue { periods, rate, fv, pmt } => TvmQuery::PresentValue {
                periods: f(periods)?,
                rate: f(rate)?,
                fv: f(fv)?,
                pmt: f(pmt)?,
            },
            TvmQuery::Payment { periods, rate, pv, fv } => TvmQuery::Payment {
                periods: f(periods)?,
                rate: f(rate)?,
                pv: f(pv)?,
                fv: f(fv)?,
            },
            TvmQuery::Periods { rate, pv, pmt, fv } => TvmQuery::Periods {
                rate: f(rate)?,
                pv: f(pv)?,
                pmt: f(pmt)?,
                fv: f(fv)?,
            },
            TvmQuery::Rate { periods, pv, pmt, fv } => TvmQuery::Rate {
                periods: f(periods)?,
                pv: f(pv)?,
                pmt: f(pmt)?,
                fv: f(fv)?,
            },
        })
    }
}

/// Solve a native TVM problem
pub fn solve_tvm(query: &TvmQuery, periods_per_year: f64, cfg: &EngineConfig) -> CalcResult<f64> {
    let ppy = cfg.number(periods_per_year)?;
    let query = query.clone().try_map(|x| cfg.number(x))?;
    Ok(calculate_tvm(&query, &ppy, cfg)?.to_native()?)
}

/// Solve loose TVM inputs
pub fn tvm(params: &TvmParams, cfg: &EngineConfig) -> CalcResult<f64> {
    let periods_per_year = params.periods_per_year;
    let query = params.clone().into_query()?;
    solve_tvm(&query, periods_per_year, cfg)
}

pub fn calculate_tvm(
    query: &TvmQuery<Number>,
    periods_per_year: &Number,
    cfg: &EngineConfig,
) -> CalcResult<Number> {
    if !periods_per_year.is_positive() {
        return Err(CalcError::domain_error("periods_per_year must be positive"));
    }
    let precision = cfg.digits();
    let periodic = |rate: &Number| rate.checked_div(periods_per_year);

    match query {
        TvmQuery::FutureValue { periods, rate, pv, pmt } => {
            let r = periodic(rate)?;
            if r.is_zero() {
                return Ok(pv.add(&pmt.mul(periods)).neg());
            }
            let factor = compound_factor(&r, periods, precision)?;
            let annuity = pmt.mul(&factor.sub(&Number::one())).checked_div(&r)?;
            Ok(pv.mul(&factor).add(&annuity).neg())
        }
        TvmQuery::PresentValue { periods, rate, fv, pmt } => {
            let r = periodic(rate)?;
            if r.is_zero() {
                return Ok(fv.add(&pmt.mul(periods)).neg());
            }
            let factor = compound_factor(&r, periods, precision)?;
            let discounted_fv = fv.checked_div(&factor)?;
            let discount = Number::one().sub(&Number::one().checked_div(&factor)?);
            let annuity = pmt.mul(&discount).checked_div(&r)?;
            Ok(discounted_fv.add(&annuity).neg())
        }
        TvmQuery::Payment { periods, rate, pv, fv } => {
            let r = periodic(rate)?;
            if r.is_zero() {
                return Ok(pv.add(fv).checked_div(periods)?.neg());
            }
            let factor = compound_factor(&r, periods, precision)?;
            let annuity_factor = factor.sub(&Number::one()).checked_div(&r)?;
            Ok(pv.mul(&factor).add(fv).checked_div(&annuity_factor)?.neg())
        }
        TvmQuery::Periods { rate, pv, pmt, fv } => {
            let r = periodic(rate)?;
            solve_periods(&r, pv, pmt, fv, precision)
        }
        TvmQuery::Rate { periods, pv, pmt, fv } => {
            let r = solve_periodic_rate(periods, pv, pmt, fv, cfg)?;
            Ok(r.mul(periods_per_year))
        }
    }
}

fn solve_periods(
    r: &Number,
    pv: &Number,
    pmt: &Number,
    fv: &Number,
    precision: u32,
) -> CalcResult<Number> {
    if r.is_zero() {
        if pmt.is_zero() {
            return Err(CalcError::unsolvable("no rate and no payment"));
        }
        return Ok(pv.add(fv).checked_div(pmt)?.neg());
    }

    let pmt_over_r = pmt.checked_div(r)?;
    let numerator = pmt_over_r.sub(fv);
    let denominator = pmt_over_r.add(pv);
    if denominator.is_zero() {
        return Err(CalcError::unsolvable("log is undefined"));
    }
    let ratio = numerator.checked_div(&denominator)?;
    if !ratio.is_positive() {
        return Err(CalcError::unsolvable("log is undefined"));
    }

    let growth = Number::one().add(r).ln(precision)?;
    Ok(ratio.ln(precision)?.checked_div(&growth)?)
}

/// PV(1+r)^n + PMT((1+r)^n − 1)/r + FV, linear at r = 0
fn tvm_residual(
    r: &Number,
    periods: &Number,
    pv: &Number,
    pmt: &Number,
    fv: &Number,
    precision: u32,
) -> CalcResult<Number> {
    if r.is_zero() {
        return Ok(pv.add(fv).add(&pmt.mul(periods)));
    }
    let factor = compound_factor(r, periods, precision)?;
    let annuity = pmt.mul(&factor.sub(&Number::one())).checked_div(r)?;
    Ok(pv.mul(&factor).add(fv).add(&annuity))
}

fn solve_periodic_rate(
    periods: &Number,
    pv: &Number,
    pmt: &Number,
    fv: &Number,
    cfg: &EngineConfig,
) -> CalcResult<Number> {
    let slope = if pv.is_positive() || (pv.is_zero() && pmt.is_positive()) {
        Slope::Increasing
    } else {
        Slope::Decreasing
    };
    let bracket = Bracket::new(
        cfg.lift(Number::from_ratio(-999, 1000)?),
        cfg.lift(Number::from_i64(10)),
    );
    let guess = cfg.lift(Number::from_ratio(5, 100)?);
    let precision = cfg.digits();

    let outcome = bisect(
        |r| tvm_residual(r, periods, pv, pmt, fv, precision),
        bracket,
        guess,
        slope,
        &BisectionConfig::default(),
    )?;
    outcome.resolve(cfg.exhaustion, "TVM rate")
}

// ============ TVM ============

pub struct Tvm;

static TVM_ARGS: [ArgMeta; 7] = [
    ArgMeta::required("solve_for", ArgKind::Text, "Unknown to solve: FV, PV, PMT, N or IY"),
    ArgMeta::optional("n", ArgKind::Number, "Number of periods", "null"),
    ArgMeta::optional("rate", ArgKind::Number, "Annual nominal rate as a fraction", "null"),
    ArgMeta::optional("pv", ArgKind::Number, "Present value", "null"),
    ArgMeta::optional("pmt", ArgKind::Number, "Payment per period", "null"),
    ArgMeta::optional("fv", ArgKind::Number, "Future value", "null"),
    ArgMeta::optional("periods_per_year", ArgKind::Number, "Compounding periods per year", "1"),
];

static TVM_EXAMPLES: [&str; 3] = [
    "tvm(\"FV\", 10, 0.05, -1000, 0) → 1628.89",
    "tvm(\"PMT\", 360, 0.06, 200000, null, 0, 12) → -1199.10",
    "tvm(\"IY\", 10, null, -1000, 0, 1628.89) → 0.05",
];

static TVM_RELATED: [&str; 4] = ["fv", "pv", "npv", "amortization"];

impl FunctionPlugin for Tvm {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "tvm",
            description: "Solve the time value of money equation for FV, PV, PMT, N or I/Y",
            usage: "tvm(solve_for, n, rate, pv, pmt, fv, [periods_per_year])",
            args: &TVM_ARGS,
            returns: "Number",
            examples: &TVM_EXAMPLES,
            category: "finance/tvm",
            source: Some("PV(1+r)^n + PMT((1+r)^n − 1)/r + FV = 0, r = rate / periods_per_year"),
            related: &TVM_RELATED,
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        if args.is_empty() {
            return Value::Error(CalcError::arg_count("tvm", 1, 0));
        }

        let solve_for = match &args[0] {
            Value::Text(s) => match TvmTarget::from_str(s) {
                Ok(t) => t,
                Err(e) => return Value::Error(e),
            },
            Value::Error(e) => return Value::Error(e.clone()),
            other => {
                return Value::Error(CalcError::arg_type("tvm", "solve_for", "Text", other.type_name()))
            }
        };

        let mut knowns = Vec::with_capacity(5);
        for (index, name) in ["n", "rate", "pv", "pmt", "fv"].iter().enumerate() {
            match extract_optional_number(args, index + 1, "tvm", name, ctx) {
                Ok(n) => knowns.push(n),
                Err(e) => return Value::Error(e),
            }
        }
        let periods_per_year = match extract_optional_number(args, 6, "tvm", "periods_per_year", ctx) {
            Ok(n) => n.unwrap_or_else(|| ctx.lift(Number::one())),
            Err(e) => return Value::Error(e),
        };

        let mut knowns = knowns.into_iter();
        let params = TvmParams {
            solve_for,
            n: knowns.next().flatten(),
            rate: knowns.next().flatten(),
            pv: knowns.next().flatten(),
            pmt: knowns.next().flatten(),
            fv: knowns.next().flatten(),
            periods_per_year: periods_per_year.clone(),
        };

        number_result(
            params
                .into_query()
                .and_then(|query| calculate_tvm(&query, &periods_per_year, &ctx.config)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    fn strict() -> EngineConfig {
        EngineConfig::default().with_exhaustion(ExhaustionPolicy::Fail)
    }

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    fn mortgage_payment() -> f64 {
        let query = TvmQuery::Payment { periods: 360.0, rate: 0.06, pv: 200_000.0, fv: 0.0 };
        solve_tvm(&query, 12.0, &cfg()).unwrap()
    }

    #[test]
    fn test_future_value() {
        let query = TvmQuery::FutureValue { periods: 10.0, rate: 0.05, pv: -1000.0, pmt: 0.0 };
        let fv = solve_tvm(&query, 1.0, &cfg()).unwrap();
        assert!((fv - 1628.894627).abs() < 1e-5, "fv was {}", fv);
    }

    #[test]
    fn test_present_value_round_trip() {
        let query = TvmQuery::PresentValue { periods: 10.0, rate: 0.05, fv: 1628.894626777442, pmt: 0.0 };
        let pv = solve_tvm(&query, 1.0, &cfg()).unwrap();
        assert!((pv + 1000.0).abs() < 1e-9, "pv was {}", pv);
    }

    #[test]
    fn test_payment() {
        let pmt = mortgage_payment();
        assert!((pmt + 1199.10).abs() < 0.01, "pmt was {}", pmt);
    }

    #[test]
    fn test_periods_round_trip() {
        let query = TvmQuery::Periods { rate: 0.06, pv: 200_000.0, pmt: mortgage_payment(), fv: 0.0 };
        let n = solve_tvm(&query, 12.0, &cfg()).unwrap();
        assert!((n - 360.0).abs() < 1e-6, "n was {}", n);
    }

    #[test]
    fn test_rate_round_trip() {
        let query = TvmQuery::Rate { periods: 360.0, pv: 200_000.0, pmt: mortgage_payment(), fv: 0.0 };
        let rate = solve_tvm(&query, 12.0, &strict()).unwrap();
        assert!((rate - 0.06).abs() < 1e-9, "rate was {}", rate);
    }

    #[test]
    fn test_rate_for_savings() {
        // Invest 1000 now, receive 1628.89 in ten years
        let query = TvmQuery::Rate { periods: 10.0, pv: -1000.0, pmt: 0.0, fv: 1628.894626777442 };
        let rate = solve_tvm(&query, 1.0, &cfg()).unwrap();
        assert!((rate - 0.05).abs() < 1e-9, "rate was {}", rate);
    }

    #[test]
    fn test_zero_rate_forms() {
        let fv = solve_tvm(&TvmQuery::FutureValue { periods: 10.0, rate: 0.0, pv: -1000.0, pmt: -100.0 }, 1.0, &cfg()).unwrap();
        assert_eq!(fv, 2000.0);

        let pmt = solve_tvm(&TvmQuery::Payment { periods: 10.0, rate: 0.0, pv: 1000.0, fv: 0.0 }, 1.0, &cfg()).unwrap();
        assert_eq!(pmt, -100.0);

        let n = solve_tvm(&TvmQuery::Periods { rate: 0.0, pv: 1000.0, pmt: -100.0, fv: 0.0 }, 1.0, &cfg()).unwrap();
        assert_eq!(n, 10.0);
    }

    #[test]
    fn test_periods_unsolvable() {
        let query = TvmQuery::Periods { rate: 0.05, pv: -3000.0, pmt: 100.0, fv: 0.0 };
        let err = solve_tvm(&query, 1.0, &cfg()).unwrap_err();
        assert_eq!(err.code, codes::UNSOLVABLE);

        let query = TvmQuery::Periods { rate: 0.0, pv: 100.0, pmt: 0.0, fv: 0.0 };
        assert_eq!(solve_tvm(&query, 1.0, &cfg()).unwrap_err().code, codes::UNSOLVABLE);
    }

    #[test]
    fn test_rate_exhaustion_policies() {
        // Both balances positive: no rate closes the equation
        let query = TvmQuery::Rate { periods: 10.0, pv: 100.0, pmt: 0.0, fv: 100.0 };

        let estimate = solve_tvm(&query, 1.0, &cfg()).unwrap();
        assert!((estimate + 0.999).abs() < 1e-6, "estimate was {}", estimate);

        let err = solve_tvm(&query, 1.0, &strict()).unwrap_err();
        assert_eq!(err.code, codes::CONVERGENCE);
    }

    #[test]
    fn test_periods_per_year_must_be_positive() {
        let query = TvmQuery::FutureValue { periods: 10.0, rate: 0.05, pv: -1000.0, pmt: 0.0 };
        assert_eq!(solve_tvm(&query, 0.0, &cfg()).unwrap_err().code, codes::DOMAIN_ERROR);
    }

    #[test]
    fn test_missing_input_names_field() {
        let params = TvmParams {
            solve_for: TvmTarget::Fv,
            n: Some(10.0),
            rate: Some(0.05),
            pv: Some(-1000.0),
            pmt: None,
            fv: None,
            periods_per_year: 1.0,
        };
        let err = tvm(&params, &cfg()).unwrap_err();
        assert_eq!(err.code, codes::MISSING_INPUT);
        assert!(err.message.contains("'pmt'"));
        assert!(err.message.contains("FV"));
    }

    #[test]
    fn test_non_finite_input() {
        let query = TvmQuery::FutureValue { periods: 10.0, rate: f64::NAN, pv: -1000.0, pmt: 0.0 };
        assert_eq!(solve_tvm(&query, 1.0, &cfg()).unwrap_err().code, codes::NON_FINITE);
    }

    #[test]
    fn test_params_deserialize() {
        let params: TvmParams = serde_json::from_str(
            r#"{"solveFor": "PMT", "n": 360, "rate": 0.06, "pv": 200000, "fv": 0, "periodsPerYear": 12}"#,
        )
        .unwrap();
        assert_eq!(params.solve_for, TvmTarget::Pmt);
        let pmt = tvm(&params, &cfg()).unwrap();
        assert!((pmt + 1199.10).abs() < 0.01);
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!(TvmTarget::from_str("i/y").unwrap(), TvmTarget::Iy);
        assert_eq!(TvmTarget::from_str("pmt").unwrap(), TvmTarget::Pmt);
        assert!(TvmTarget::from_str("APR").is_err());
    }

    #[test]
    fn test_tvm_plugin() {
        let args = vec![
            Value::from("PMT"),
            Value::from(360),
            Value::Number(Number::from_str("0.06").unwrap()),
            Value::from(200000),
            Value::Null,
            Value::from(0),
            Value::from(12),
        ];
        let result = Tvm.call(&args, &eval_ctx());
        assert_eq!(result.as_number().unwrap().as_decimal(2), "-1199.10");
    }

    #[test]
    fn test_tvm_plugin_missing_input() {
        let args = vec![Value::from("FV"), Value::from(10)];
        let result = Tvm.call(&args, &eval_ctx());
        assert_eq!(result.as_error().unwrap().code, codes::MISSING_INPUT);
    }
}
