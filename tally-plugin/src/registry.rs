//! Plugin Registry

use crate::{EvalContext, FunctionMeta, FunctionPlugin};
use tally_core::{codes, CalcError, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Central calculator registry
pub struct PluginRegistry {
    functions: HashMap<String, Arc<dyn FunctionPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn with_function<F: FunctionPlugin + 'static>(mut self, f: F) -> Self {
        let name = f.meta().name.to_lowercase();
        self.functions.insert(name, Arc::new(f));
        self
    }

    pub fn get_function(&self, name: &str) -> Option<&dyn FunctionPlugin> {
        self.functions.get(&name.to_lowercase()).map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names in alphabetical order
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn call_function(&self, name: &str, args: &[Value], ctx: &EvalContext) -> Value {
        match self.get_function(name) {
            Some(f) => f.call(args, ctx),
            None => Value::Error(self.unknown_function(name)),
        }
    }

    /// Call with arguments keyed by their `ArgMeta` names.
    ///
    /// Absent optional arguments are passed as `Null`; absent required ones
    /// and unknown keys are errors.
    pub fn call_named(&self, name: &str, args: &HashMap<String, Value>, ctx: &EvalContext) -> Value {
        let f = match self.get_function(name) {
            Some(f) => f,
            None => return Value::Error(self.unknown_function(name)),
        };
        let meta = f.meta();

        let mut unknown: Vec<&str> = args
            .keys()
            .map(|k| k.as_str())
            .filter(|k| meta.arg(k).is_none())
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            let names: Vec<&str> = meta.args.iter().map(|a| a.name).collect();
            return Value::Error(CalcError::undefined_field(meta.name, &unknown, &names));
        }

        let mut positional = Vec::with_capacity(meta.args.len());
        for arg in meta.args {
            match args.get(arg.name) {
                Some(v) if !arg.kind.accepts(v) => {
                    return Value::Error(CalcError::arg_type(meta.name, arg.name, arg.kind.as_str(), v.type_name()))
                }
                Some(v) => positional.push(v.clone()),
                None if arg.optional => positional.push(Value::Null),
                None => {
                    return Value::Error(
                        CalcError::new(
                            codes::MISSING_INPUT,
                            format!("{}() requires argument '{}'", meta.name, arg.name),
                        )
                        .with_suggestion(format!("Use help('{}') for usage", meta.name)),
                    )
                }
            }
        }

        f.call(&positional, ctx)
    }

    fn unknown_function(&self, name: &str) -> CalcError {
        let similar = self.find_similar_functions(name);
        let err = CalcError::undefined_func(name);
        if similar.is_empty() {
            return err;
        }
        let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
        err.with_suggestion(format!(
            "Similar: {}. Use list_functions for the full list.",
            suggestions.join(", ")
        ))
    }

    /// Find function names similar to the given name (for error suggestions)
    fn find_similar_functions(&self, name: &str) -> Vec<String> {
        let name_lower = name.to_lowercase();
        let mut matches: Vec<(String, usize)> = self
            .functions
            .keys()
            .filter_map(|func_name| {
                let score = Self::similarity_score(&name_lower, func_name);
                if score >= 10 {
                    Some((func_name.clone(), score))
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }

    fn similarity_score(query: &str, candidate: &str) -> usize {
        let mut score = 0;

        if candidate.starts_with(query) {
            score += 100;
        } else if candidate.contains(query) {
            score += 50;
        } else if query.contains(candidate) {
            score += 30;
        }

        let query_chars: HashSet<char> = query.chars().collect();
        let candidate_chars: HashSet<char> = candidate.chars().collect();
        score += query_chars.intersection(&candidate_chars).count() * 2;

        let len_diff = query.len().abs_diff(candidate.len());
        if len_diff < 5 && score > 0 {
            score += 5 - len_diff;
        }

        score
    }

    pub fn help(&self, name: Option<&str>) -> Value {
        match name {
            Some(n) => self.help_for(n),
            None => self.general_help(),
        }
    }

    fn help_for(&self, name: &str) -> Value {
        match self.functions.get(&name.to_lowercase()) {
            Some(f) => Value::Object(Self::function_to_help(f.meta())),
            None => Value::Error(
                CalcError::new(codes::NOT_FOUND, format!("No calculator named '{}'", name))
                    .with_suggestion(self.unknown_function(name).suggestion.unwrap_or_default()),
            ),
        }
    }

    fn general_help(&self) -> Value {
        let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, f) in &self.functions {
            by_category
                .entry(f.meta().category.to_string())
                .or_default()
                .push(name.clone());
        }

        let categories = by_category
            .into_iter()
            .map(|(cat, mut names)| {
                names.sort();
                (cat, Value::List(names.into_iter().map(Value::Text).collect()))
            })
            .collect();

        Value::object([
            ("functions", Value::Object(categories)),
            ("usage", Value::from("Call help('name') for detailed help.")),
        ])
    }

    fn function_to_help(meta: FunctionMeta) -> HashMap<String, Value> {
        let mut help = HashMap::new();
        help.insert("name".to_string(), Value::from(meta.name));
        help.insert("description".to_string(), Value::from(meta.description));
        help.insert("usage".to_string(), Value::from(meta.usage));
        help.insert("returns".to_string(), Value::from(meta.returns));
        help.insert("category".to_string(), Value::from(meta.category));
        if let Some(formula) = meta.source {
            help.insert("formula".to_string(), Value::from(formula));
        }
        help.insert(
            "args".to_string(),
            Value::List(
                meta.args
                    .iter()
                    .map(|a| {
                        let mut arg = HashMap::new();
                        arg.insert("name".to_string(), Value::from(a.name));
                        arg.insert("type".to_string(), Value::from(a.kind.as_str()));
                        arg.insert("description".to_string(), Value::from(a.description));
                        arg.insert("optional".to_string(), Value::Bool(a.optional));
                        if let Some(default) = a.default {
                            arg.insert("default".to_string(), Value::from(default));
                        }
                        Value::Object(arg)
                    })
                    .collect(),
            ),
        );
        help.insert(
            "examples".to_string(),
            Value::List(meta.examples.iter().map(|e| Value::from(*e)).collect()),
        );
        help.insert(
            "related".to_string(),
            Value::List(meta.related.iter().map(|r| Value::from(*r)).collect()),
        );
        help
    }

    /// List calculators, optionally restricted to a category prefix
    /// ("finance" matches "finance/tvm").
    pub fn list_functions(&self, category: Option<&str>) -> Value {
        let funcs: Vec<Value> = self
            .function_names()
            .into_iter()
            .filter_map(|name| self.functions.get(name))
            .map(|f| f.meta())
            .filter(|meta| category.map_or(true, |c| meta.category.starts_with(c)))
            .map(|meta| {
                Value::object([
                    ("name", Value::from(meta.name)),
                    ("description", Value::from(meta.description)),
                    ("usage", Value::from(meta.usage)),
                    ("category", Value::from(meta.category)),
                ])
            })
            .collect();
        Value::List(funcs)
    }

    /// Distinct categories in alphabetical order
    pub fn categories(&self) -> Vec<&'static str> {
        let mut cats: Vec<&'static str> = self.functions.values().map(|f| f.meta().category).collect();
        cats.sort_unstable();
        cats.dedup();
        cats
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgKind, ArgMeta};
    use tally_core::Number;

    struct Scale;

    static SCALE_ARGS: [ArgMeta; 2] = [
        ArgMeta::required("value", ArgKind::Number, "Value to scale"),
        ArgMeta::optional("factor", ArgKind::Number, "Multiplier", "2"),
    ];

    impl FunctionPlugin for Scale {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "scale",
                description: "Multiply a value",
                usage: "scale(value, [factor])",
                args: &SCALE_ARGS,
                returns: "Number",
                examples: &["scale(3) → 6"],
                category: "test/math",
                source: Some("value × factor"),
                related: &[],
            }
        }

        fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
            let value = match args.first().and_then(|v| v.as_number()) {
                Some(n) => n.clone(),
                None => return Value::Error(CalcError::arg_type("scale", "value", "Number", "other")),
            };
            let factor = args
                .get(1)
                .and_then(|v| v.as_number())
                .cloned()
                .unwrap_or_else(|| Number::from_i64(2));
            Value::Number(value.mul(&factor))
        }
    }

    fn registry() -> Arc<PluginRegistry> {
        Arc::new(PluginRegistry::new().with_function(Scale))
    }

    fn ctx(registry: &Arc<PluginRegistry>) -> EvalContext {
        EvalContext::new(registry.clone())
    }

    #[test]
    fn test_call_function_case_insensitive() {
        let reg = registry();
        let result = reg.call_function("SCALE", &[Value::from(3)], &ctx(&reg));
        assert_eq!(result.as_number().and_then(|n| n.to_i64()), Some(6));
    }

    #[test]
    fn test_unknown_function_suggests_similar() {
        let reg = registry();
        let result = reg.call_function("scal", &[], &ctx(&reg));
        let err = result.as_error().unwrap();
        assert_eq!(err.code, codes::UNDEFINED_FUNC);
        assert!(err.suggestion.as_deref().unwrap_or("").contains("scale"));
    }

    #[test]
    fn test_call_named_binds_by_name() {
        let reg = registry();
        let mut args = HashMap::new();
        args.insert("factor".to_string(), Value::from(5));
        args.insert("value".to_string(), Value::from(3));
        let result = reg.call_named("scale", &args, &ctx(&reg));
        assert_eq!(result.as_number().and_then(|n| n.to_i64()), Some(15));
    }

    #[test]
    fn test_call_named_optional_defaults() {
        let reg = registry();
        let mut args = HashMap::new();
        args.insert("value".to_string(), Value::from(4));
        let result = reg.call_named("scale", &args, &ctx(&reg));
        assert_eq!(result.as_number().and_then(|n| n.to_i64()), Some(8));
    }

    #[test]
    fn test_call_named_missing_required() {
        let reg = registry();
        let result = reg.call_named("scale", &HashMap::new(), &ctx(&reg));
        assert_eq!(result.as_error().unwrap().code, codes::MISSING_INPUT);
    }

    #[test]
    fn test_call_named_unknown_argument() {
        let reg = registry();
        let mut args = HashMap::new();
        args.insert("value".to_string(), Value::from(4));
        args.insert("factr".to_string(), Value::from(4));
        let result = reg.call_named("scale", &args, &ctx(&reg));
        let err = result.as_error().unwrap();
        assert_eq!(err.code, codes::UNDEFINED_FIELD);
        assert!(err.message.contains("factr"));
    }

    #[test]
    fn test_call_named_checks_argument_kind() {
        let reg = registry();
        let mut args = HashMap::new();
        args.insert("value".to_string(), Value::Text("three".into()));
        let result = reg.call_named("scale", &args, &ctx(&reg));
        assert_eq!(result.as_error().unwrap().code, codes::ARG_TYPE);
    }

    #[test]
    fn test_meta_arity_and_lookup() {
        let meta = Scale.meta();
        assert_eq!(meta.arity(), 1);
        assert_eq!(meta.arg("factor").and_then(|a| a.default), Some("2"));
        assert!(meta.arg("missing").is_none());
        assert!(ArgKind::NumberList.accepts(&Value::List(vec![Value::from(1), Value::from(2)])));
        assert!(!ArgKind::NumberList.accepts(&Value::List(vec![Value::from("x")])));
        assert!(ArgKind::Text.accepts(&Value::Null));
    }

    #[test]
    fn test_help_for_function() {
        let reg = registry();
        let help = reg.help(Some("scale"));
        assert_eq!(help.get("usage").as_text(), Some("scale(value, [factor])"));
        assert_eq!(help.get("formula").as_text(), Some("value × factor"));
        assert_eq!(help.get("args").as_list().map(|a| a.len()), Some(2));
        assert!(reg.help(Some("nope")).is_error());
    }

    #[test]
    fn test_list_functions_by_category_prefix() {
        let reg = registry();
        assert_eq!(reg.list_functions(Some("test")).as_list().map(|l| l.len()), Some(1));
        assert_eq!(reg.list_functions(Some("finance")).as_list().map(|l| l.len()), Some(0));
        assert_eq!(reg.categories(), vec!["test/math"]);
    }
}
