//! Tally - high-precision financial calculations
//!
//! The facade bundles the statistics and finance calculators into one
//! registry and evaluates them under a fixed `EngineConfig`.
//!
//! ```ignore
//! let tally = Tally::with_standard_library();
//! let fv = tally.call_named("fv", &args! { pv: 1000, rate: "0.05", periods: 10 });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tally_plugin::{EvalContext, PluginRegistry};

pub use tally_core::{CalcError, CalcResult, EngineConfig, ExhaustionPolicy, Number, Precision, Value};

/// Load every calculator into registry
pub fn load_standard_library(registry: PluginRegistry) -> PluginRegistry {
    let registry = tally_stats::load_stats_library(registry);
    tally_finance::load_finance_library(registry)
}

/// Create registry with statistics and finance calculators
pub fn standard_registry() -> PluginRegistry {
    load_standard_library(PluginRegistry::new())
}

/// Main Tally engine
#[derive(Clone)]
pub struct Tally {
    registry: Arc<PluginRegistry>,
    config: EngineConfig,
}

impl Tally {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            config: EngineConfig::default(),
        }
    }

    pub fn with_standard_library() -> Self {
        Self::new(standard_registry())
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn context(&self) -> EvalContext {
        EvalContext::new(self.registry.clone()).with_config(self.config)
    }

    /// Call a calculator with positional arguments
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        self.registry.call_function(name, args, &self.context())
    }

    /// Call a calculator with arguments keyed by their documented names
    pub fn call_named(&self, name: &str, args: &HashMap<String, Value>) -> Value {
        self.registry.call_named(name, args, &self.context())
    }

    pub fn help(&self, name: Option<&str>) -> Value {
        self.registry.help(name)
    }

    pub fn list_functions(&self, category: Option<&str>) -> Value {
        self.registry.list_functions(category)
    }

    pub fn categories(&self) -> Vec<&'static str> {
        self.registry.categories()
    }
}

impl Default for Tally {
    fn default() -> Self {
        Self::with_standard_library()
    }
}

/// Build a named-argument map; numeric strings are parsed as decimals
#[macro_export]
macro_rules! args {
    {} => { std::collections::HashMap::new() };
    { $($key:ident : $value:expr),* $(,)? } => {{
        let mut map = std::collections::HashMap::new();
        $(
            map.insert(stringify!($key).to_string(), $crate::arg_value($crate::Value::from($value)));
        )*
        map
    }};
}

#[doc(hidden)]
pub fn arg_value(value: Value) -> Value {
    match value {
        Value::Text(s) => Number::from_str(&s).map(Value::Number).unwrap_or(Value::Text(s)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::codes;

    fn test_tally() -> Tally {
        Tally::with_standard_library()
    }

    fn dec(s: &str) -> Value {
        Value::Number(Number::from_str(s).unwrap())
    }

    #[test]
    fn test_positional_call() {
        let tally = test_tally();
        let result = tally.call("fv", &[Value::from(1000), dec("0.05"), Value::from(10)]);
        assert_eq!(result.as_number().unwrap().as_decimal(6), "1628.894627");
    }

    #[test]
    fn test_named_call() {
        let tally = test_tally();
        let result = tally.call_named(
            "npv",
            &args! { initial_investment: 100, cash_flows: Value::List(vec![dec("10"), dec("60"), dec("80")]), discount_rate: "0.10" },
        );
        assert_eq!(result.as_number().unwrap().as_decimal(2), "18.78");
    }

    #[test]
    fn test_named_call_with_optional_defaults() {
        let tally = test_tally();
        let result = tally.call_named("tvm", &args! { solve_for: "FV", n: 10, rate: "0.05", pv: -1000, pmt: 0 });
        assert_eq!(result.as_number().unwrap().as_decimal(2), "1628.89");
    }

    #[test]
    fn test_statistics_and_finance_share_registry() {
        let tally = test_tally();
        let samples = Value::List([2i64, 4, 4, 4, 5, 5, 7, 9].into_iter().map(Value::from).collect());
        assert_eq!(tally.call("mean", &[samples]).as_number().unwrap().as_decimal(0), "5");

        let categories = tally.categories();
        assert!(categories.contains(&"statistics"));
        assert!(categories.contains(&"finance/tvm"));
    }

    #[test]
    fn test_unknown_function_suggests() {
        let tally = test_tally();
        let err = tally.call("npvv", &[]);
        let err = err.as_error().unwrap();
        assert_eq!(err.code, codes::UNDEFINED_FUNC);
        assert!(err.suggestion.as_deref().unwrap_or_default().contains("npv"));
    }

    #[test]
    fn test_help_and_listing() {
        let tally = test_tally();
        let help = tally.help(Some("ytm"));
        assert_eq!(help.get("name").as_text(), Some("ytm"));

        let bonds = tally.list_functions(Some("finance/fixed-income"));
        assert_eq!(bonds.as_list().unwrap().len(), 4);
    }

    #[test]
    fn test_strict_exhaustion_reaches_plugins() {
        let strict = test_tally().with_config(EngineConfig::default().with_exhaustion(ExhaustionPolicy::Fail));
        // all-positive flows have no root inside the bracket
        let flows = Value::List(vec![Value::from(100), Value::from(100)]);
        let result = strict.call("irr", &[flows.clone()]);
        assert_eq!(result.as_error().unwrap().code, codes::CONVERGENCE);

        let lenient = test_tally();
        assert!(lenient.call("irr", &[flows]).as_number().is_some());
    }

    #[test]
    fn test_precision_is_configurable() {
        let config = EngineConfig::default().with_precision(Precision::new(80).unwrap());
        let tally = test_tally().with_config(config);
        assert_eq!(tally.config().digits(), 80);
        let result = tally.call("ear", &[dec("0.12"), Value::from(12)]);
        assert_eq!(result.as_number().unwrap().as_decimal(6), "0.126825");
    }
}
