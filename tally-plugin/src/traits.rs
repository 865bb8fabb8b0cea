//! Calculator traits and their static metadata

use tally_core::Value;
use crate::EvalContext;
use serde::Serialize;

/// What a calculator argument accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArgKind {
    Number,
    #[serde(rename = "List<Number>")]
    NumberList,
    Text,
}

impl ArgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::Number => "Number",
            ArgKind::NumberList => "List<Number>",
            ArgKind::Text => "Text",
        }
    }

    /// Whether `value` has this shape; `Null` stands for an absent argument
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null | Value::Error(_)) => true,
            (ArgKind::Number, Value::Number(_)) => true,
            (ArgKind::NumberList, Value::List(items)) => items.iter().all(|v| matches!(v, Value::Number(_))),
            (ArgKind::Text, Value::Text(_)) => true,
            _ => false,
        }
    }
}

/// One calculator argument, in call order
#[derive(Debug, Clone, Serialize)]
pub struct ArgMeta {
    pub name: &'static str,
    pub kind: ArgKind,
    pub description: &'static str,
    pub optional: bool,
    /// Shown in help; absent optional arguments reach the calculator as `Null`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl ArgMeta {
    pub const fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self { name, kind, description, optional: false, default: None }
    }

    pub const fn optional(name: &'static str, kind: ArgKind, description: &'static str, default: &'static str) -> Self {
        Self { name, kind, description, optional: true, default: Some(default) }
    }
}

/// Catalog entry for a calculator
#[derive(Debug, Clone, Serialize)]
pub struct FunctionMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub args: &'static [ArgMeta],
    pub returns: &'static str,
    pub examples: &'static [&'static str],
    /// Slash-separated, e.g. `finance/fixed-income`
    pub category: &'static str,
    /// Formula the calculator evaluates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    pub related: &'static [&'static str],
}

impl FunctionMeta {
    /// Number of arguments that must be supplied
    pub fn arity(&self) -> usize {
        self.args.iter().filter(|a| !a.optional).count()
    }

    pub fn arg(&self, name: &str) -> Option<&'static ArgMeta> {
        self.args.iter().find(|a| a.name == name)
    }
}

/// A pure calculator: same arguments and config, same result
pub trait FunctionPlugin: Send + Sync {
    fn meta(&self) -> FunctionMeta;
    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value;
}
