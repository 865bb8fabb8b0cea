//! JSON-RPC request handling for the MCP tools

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tally::Tally;
use tally_core::{Number, Value};
use tracing::{debug, info};

pub const PROTOCOL_VERSION: &str = "2025-11-25";
pub const SERVER_NAME: &str = "tally";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<JsonValue>,
    pub method: String,
    #[serde(default)]
    pub params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl McpError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: INVALID_PARAMS, message: message.into(), data: None }
    }
}

impl McpResponse {
    fn reply(id: Option<JsonValue>, result: Result<JsonValue, McpError>) -> Self {
        match result {
            Ok(r) => Self { jsonrpc: "2.0".to_string(), id, result: Some(r), error: None },
            Err(e) => Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(e) },
        }
    }

    /// Response to a line that is not valid JSON-RPC
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::reply(
            None,
            Err(McpError { code: PARSE_ERROR, message: format!("Parse error: {}", detail), data: None }),
        )
    }
}

pub fn handle_request(tally: &Tally, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tool_call(tally, &request.params),

        _ => Err(McpError {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {}", request.method),
            data: None,
        }),
    };

    McpResponse::reply(request.id.clone(), result)
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params
        .as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    let client_protocol = params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "High-precision financial calculations"
        },
        "capabilities": {
            "tools": { "listChanged": false }
        }
    }))
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    Ok(json!({
        "tools": [
            {
                "name": "calculate",
                "description": "Run a financial or statistical calculator. Numbers may be passed as JSON numbers or decimal strings; results come back as decimal strings.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "function": {
                            "type": "string",
                            "description": "Calculator name, e.g. npv, ytm, tvm, black_scholes"
                        },
                        "arguments": {
                            "description": "Arguments by name (object) or by position (array)",
                            "oneOf": [{ "type": "object" }, { "type": "array" }]
                        }
                    },
                    "required": ["function"]
                }
            },
            {
                "name": "help",
                "description": "Documentation for one calculator, or an overview by category",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Calculator name" }
                    }
                }
            },
            {
                "name": "list_functions",
                "description": "List calculators, optionally filtered by category prefix (e.g. finance/fixed-income)",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string", "description": "Category prefix" }
                    }
                }
            }
        ]
    }))
}

fn handle_tool_call(tally: &Tally, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match name {
        "calculate" => tool_calculate(tally, args),
        "help" => tool_help(tally, args),
        "list_functions" => tool_list_functions(tally, args),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

fn tool_calculate(tally: &Tally, args: JsonValue) -> Result<JsonValue, McpError> {
    let function = args
        .get("function")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing function argument"))?;

    let result = match args.get("arguments") {
        None | Some(JsonValue::Null) => tally.call(function, &[]),
        Some(JsonValue::Array(items)) => {
            let positional: Vec<Value> = items.iter().map(json_to_value).collect();
            tally.call(function, &positional)
        }
        Some(JsonValue::Object(obj)) => {
            let named: HashMap<String, Value> = obj.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect();
            tally.call_named(function, &named)
        }
        Some(other) => {
            return Err(McpError::invalid_params(format!(
                "arguments must be an object or an array, got {}",
                other
            )))
        }
    };

    debug!(function, is_error = result.is_error(), "calculated");

    let text = match &result {
        Value::Error(e) => format!("Error [{}]: {}", e.code, e.message),
        other => format!("{}({}) = {}", function, summarize_args(&args), other),
    };

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "data": value_to_json(&result),
        "isError": result.is_error()
    }))
}

fn summarize_args(args: &JsonValue) -> String {
    match args.get("arguments") {
        Some(JsonValue::Array(items)) => items.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "),
        Some(JsonValue::Object(obj)) => obj.iter().map(|(k, v)| format!("{}: {}", k, v)).collect::<Vec<_>>().join(", "),
        _ => String::new(),
    }
}

fn tool_help(tally: &Tally, args: JsonValue) -> Result<JsonValue, McpError> {
    let name = args.get("name").and_then(|v| v.as_str());
    let help = tally.help(name);

    Ok(json!({
        "content": [{ "type": "text", "text": format_help(&help) }],
        "data": value_to_json(&help),
        "isError": help.is_error()
    }))
}

fn format_help(help: &Value) -> String {
    match help {
        Value::Object(map) if map.contains_key("name") => {
            let mut out = String::new();
            if let Some(Value::Text(n)) = map.get("name") {
                out.push_str(&format!("# {}\n\n", n));
            }
            if let Some(Value::Text(d)) = map.get("description") {
                out.push_str(&format!("{}\n\n", d));
            }
            if let Some(Value::Text(u)) = map.get("usage") {
                out.push_str(&format!("**Usage:** `{}`\n\n", u));
            }
            if let Some(Value::Text(f)) = map.get("formula") {
                out.push_str(&format!("**Formula:** {}\n", f));
            }
            out
        }
        Value::Object(map) => {
            let mut out = String::from("# Calculators\n\n");
            if let Some(Value::Object(categories)) = map.get("functions") {
                let mut names: Vec<&String> = categories.keys().collect();
                names.sort();
                for category in names {
                    if let Some(Value::List(functions)) = categories.get(category) {
                        let functions: Vec<String> = functions.iter().map(|f| f.to_string()).collect();
                        out.push_str(&format!("- **{}**: {}\n", category, functions.join(", ")));
                    }
                }
            }
            out
        }
        Value::Error(e) => match &e.suggestion {
            Some(s) => format!("Error: {} ({})", e.message, s),
            None => format!("Error: {}", e.message),
        },
        other => other.to_string(),
    }
}

fn tool_list_functions(tally: &Tally, args: JsonValue) -> Result<JsonValue, McpError> {
    let category = args.get("category").and_then(|v| v.as_str());
    let functions = tally.list_functions(category);
    let count = functions.as_list().map_or(0, |l| l.len());
    Ok(json!({
        "content": [{ "type": "text", "text": format!("{} functions listed", count) }],
        "data": value_to_json(&functions)
    }))
}

/// JSON numbers and numeric strings both become decimals
pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            let text = n.to_string();
            match Number::from_str(&text) {
                Ok(n) => Value::Number(n),
                Err(_) => Value::Text(text),
            }
        }
        JsonValue::String(s) => match Number::from_str(s) {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(s.clone()),
        },
        JsonValue::Array(arr) => Value::List(arr.iter().map(json_to_value).collect()),
        JsonValue::Object(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect()),
    }
}

/// Numbers are rendered as exact decimal strings
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => JsonValue::String(n.to_plain_string()),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::List(l) => JsonValue::Array(l.iter().map(value_to_json).collect()),
        Value::Object(o) => JsonValue::Object(o.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect()),
        Value::Error(e) => json!({
            "_error": { "code": e.code, "message": e.message, "suggestion": e.suggestion }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: i64, method: &str, params: JsonValue) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    fn call_tool(tally: &Tally, name: &str, arguments: JsonValue) -> JsonValue {
        let response = handle_request(tally, &request(1, "tools/call", json!({ "name": name, "arguments": arguments })));
        assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
        response.result.unwrap()
    }

    #[test]
    fn test_initialize_echoes_protocol() {
        let tally = Tally::with_standard_library();
        let response = handle_request(
            &tally,
            &request(1, "initialize", json!({ "protocolVersion": "2024-11-05", "clientInfo": { "name": "test" } })),
        );
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[test]
    fn test_tools_list() {
        let tally = Tally::with_standard_library();
        let result = handle_request(&tally, &request(2, "tools/list", json!({}))).result.unwrap();
        let names: Vec<&str> = result["tools"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["calculate", "help", "list_functions"]);
    }

    #[test]
    fn test_calculate_named_arguments() {
        let tally = Tally::with_standard_library();
        let result = call_tool(
            &tally,
            "calculate",
            json!({ "function": "capm", "arguments": { "risk_free_rate": "0.03", "beta": 1.2, "market_return": "0.10" } }),
        );
        assert_eq!(result["isError"], false);
        assert_eq!(result["data"], "0.114");
    }

    #[test]
    fn test_calculate_positional_arguments() {
        let tally = Tally::with_standard_library();
        let result = call_tool(&tally, "calculate", json!({ "function": "irr", "arguments": [[-100, 110]] }));
        let irr: f64 = result["data"].as_str().unwrap().parse().unwrap();
        assert!((irr - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_record_result() {
        let tally = Tally::with_standard_library();
        let result = call_tool(
            &tally,
            "calculate",
            json!({ "function": "dupont", "arguments": [100, 1000, 2000, 800] }),
        );
        assert_eq!(result["data"]["profit_margin"], "0.1");
        assert_eq!(result["data"]["roe"], "0.125");
    }

    #[test]
    fn test_calculate_error_is_reported_in_result() {
        let tally = Tally::with_standard_library();
        let result = call_tool(&tally, "calculate", json!({ "function": "tvm", "arguments": { "solve_for": "FV", "n": 10 } }));
        assert_eq!(result["isError"], true);
        assert_eq!(result["data"]["_error"]["code"], "MISSING_INPUT");
    }

    #[test]
    fn test_calculate_unknown_function() {
        let tally = Tally::with_standard_library();
        let result = call_tool(&tally, "calculate", json!({ "function": "sharp", "arguments": [] }));
        assert_eq!(result["isError"], true);
        assert_eq!(result["data"]["_error"]["code"], "UNDEFINED_FUNC");
    }

    #[test]
    fn test_help_and_list_functions() {
        let tally = Tally::with_standard_library();
        let help = call_tool(&tally, "help", json!({ "name": "wacc" }));
        assert!(help["content"][0]["text"].as_str().unwrap().starts_with("# wacc"));

        let listing = call_tool(&tally, "list_functions", json!({ "category": "statistics" }));
        assert!(listing["data"].as_array().unwrap().iter().any(|f| f["name"] == "norm_cdf"));
    }

    #[test]
    fn test_protocol_errors() {
        let tally = Tally::with_standard_library();
        let unknown_method = handle_request(&tally, &request(3, "resources/list", json!({})));
        assert_eq!(unknown_method.error.unwrap().code, METHOD_NOT_FOUND);

        let unknown_tool = handle_request(&tally, &request(4, "tools/call", json!({ "name": "eval" })));
        assert_eq!(unknown_tool.error.unwrap().code, INVALID_PARAMS);

        let bad_arguments = handle_request(
            &tally,
            &request(5, "tools/call", json!({ "name": "calculate", "arguments": { "function": "npv", "arguments": 5 } })),
        );
        assert_eq!(bad_arguments.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn test_json_value_conversion() {
        assert_eq!(json_to_value(&json!("0.05")).as_number().unwrap().to_plain_string(), "0.05");
        assert_eq!(json_to_value(&json!(2.5)).as_number().unwrap().to_plain_string(), "2.5");
        assert_eq!(json_to_value(&json!("FV")).as_text(), Some("FV"));
        assert_eq!(value_to_json(&Value::Number(Number::from_str("1/4").unwrap())), json!("0.25"));
    }
}
