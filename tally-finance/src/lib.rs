//! Tally Finance Functions Plugin
//!
//! Time value of money, discounted cash flows, rate conversions, portfolio
//! returns, fixed income, equity valuation, option pricing, real estate and
//! balance-sheet ratios. All arithmetic runs on decimal `Number`s; results
//! convert to `f64` only at the boundary.
//!
//! Every calculator has a typed entry point taking a `*Params` struct and an
//! `EngineConfig`, a `calculate_*` function over `Number`s, and a plugin
//! registered by [`load_finance_library`]. Rate solvers (TVM rate, IRR, YTM)
//! share the bisection in [`solver`].

mod helpers;
pub mod solver;
mod tvm;
mod investment;
mod rates;
mod returns;
mod bonds;
mod equity;
mod options;
mod real_estate;
mod ratios;

pub use tvm::{calculate_tvm, solve_tvm, tvm, TvmParams, TvmQuery, TvmTarget};
pub use investment::{
    calculate_future_value, calculate_irr, calculate_npv, calculate_perpetuity, calculate_present_value,
    future_value, irr, npv, perpetuity, present_value, FutureValueParams, IrrParams, NpvParams,
    PerpetuityParams, PresentValueParams,
};
pub use rates::{
    bank_discount_yield, calculate_bank_discount_yield, calculate_effective_annual_rate,
    calculate_effective_annual_yield, calculate_money_market_yields, effective_annual_rate,
    effective_annual_yield, money_market_yields, BankDiscountYieldParams, EffectiveAnnualRateParams,
    EffectiveAnnualYieldParams, MoneyMarketYields,
};
pub use returns::{
    calculate_holding_period_return, calculate_portfolio_return, calculate_roi, calculate_sharpe_ratio,
    calculate_two_asset_std_dev, holding_period_return, portfolio_return, roi, sharpe_ratio,
    two_asset_portfolio_std_dev, HoldingPeriodReturnParams, PortfolioReturnParams, RoiParams,
    SharpeRatioParams, TwoAssetPortfolioParams,
};
pub use bonds::{bond_price, calculate_ytm, convexity, duration, ytm, Bond, BondParams, Duration, YtmParams};
pub use equity::{
    calculate_capm, calculate_ddm, calculate_dupont, calculate_wacc, capm, ddm, dupont, wacc, CapmParams,
    DdmParams, Dupont, DupontParams, WaccParams,
};
pub use options::{black_scholes, calculate_black_scholes, calculate_normal_cdf, normal_cdf, BlackScholesParams, OptionPrices};
pub use real_estate::{
    amortization, calculate_amortization, calculate_cap_rate, cap_rate, Amortization, AmortizationParams,
    AmortizationRow, AmortizationSummary, CapRateParams,
};
pub use ratios::{calculate_financial_ratios, financial_ratios, BalanceSheet, FinancialRatios, FinancialRatiosParams};

use tally_plugin::PluginRegistry;

/// Load finance functions into registry
pub fn load_finance_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // TVM (1 function)
        .with_function(tvm::Tvm)

        // Discounted cash flows (5 functions)
        .with_function(investment::Fv)
        .with_function(investment::Pv)
        .with_function(investment::Npv)
        .with_function(investment::Irr)
        .with_function(investment::Perpetuity)

        // Rates and yields (4 functions)
        .with_function(rates::Ear)
        .with_function(rates::Bdy)
        .with_function(rates::Eay)
        .with_function(rates::MoneyMarket)

        // Returns and portfolio (5 functions)
        .with_function(returns::Hpr)
        .with_function(returns::Roi)
        .with_function(returns::PortfolioReturn)
        .with_function(returns::Sharpe)
        .with_function(returns::PortfolioStdDev)

        // Fixed income (4 functions)
        .with_function(bonds::BondPrice)
        .with_function(bonds::Ytm)
        .with_function(bonds::BondDuration)
        .with_function(bonds::Convexity)

        // Equity and corporate (4 functions)
        .with_function(equity::Ddm)
        .with_function(equity::Capm)
        .with_function(equity::Wacc)
        .with_function(equity::DupontAnalysis)

        // Options (2 functions)
        .with_function(options::BlackScholes)
        .with_function(options::NormCdf)

        // Real estate and lending (2 functions)
        .with_function(real_estate::CapRate)
        .with_function(real_estate::AmortizationSchedule)

        // Ratios (1 function)
        .with_function(ratios::Ratios)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_functions_registered() {
        let registry = load_finance_library(PluginRegistry::new());
        for name in [
            "tvm", "fv", "pv", "npv", "irr", "perpetuity", "ear", "bdy", "eay", "money_market_yields", "hpr",
            "roi", "portfolio_return", "sharpe", "portfolio_std_dev", "bond_price", "ytm", "duration",
            "convexity", "ddm", "capm", "wacc", "dupont", "black_scholes", "norm_cdf", "cap_rate",
            "amortization", "financial_ratios",
        ] {
            assert!(registry.get_function(name).is_some(), "{} is not registered", name);
        }
    }

    #[test]
    fn test_every_function_documents_its_formula() {
        let registry = load_finance_library(PluginRegistry::new());
        let listing = registry.list_functions(None);
        let functions = listing.as_list().unwrap();
        assert_eq!(functions.len(), 28);
        for entry in functions {
            let name = entry.get("name");
            let name = name.as_text().unwrap();
            assert!(registry.get_function(name).unwrap().meta().source.is_some(), "{} has no formula", name);
        }
    }
}
