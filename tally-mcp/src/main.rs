//! Tally MCP Server
//!
//! Newline-delimited JSON-RPC over stdio. Logs go to stderr so stdout
//! carries protocol messages only.
//!
//! Tools:
//! - calculate: Run a calculator with named or positional arguments
//! - help: Documentation for a calculator or the whole catalog
//! - list_functions: List calculators, optionally by category
//!
//! Environment:
//! - TALLY_PRECISION: significant digits (at least 50)
//! - TALLY_STRICT_CONVERGENCE: `1` or `true` turns solver exhaustion into an error
//! - RUST_LOG: log filter (default `info`)

mod protocol;

use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tally::Tally;
use tally_core::{CalcError, EngineConfig, ExhaustionPolicy, Precision};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use protocol::{handle_request, McpRequest, McpResponse, PROTOCOL_VERSION, SERVER_VERSION};

/// Build the engine configuration from the environment
fn config_from_env() -> Result<EngineConfig, CalcError> {
    let mut config = EngineConfig::default();

    if let Ok(raw) = env::var("TALLY_PRECISION") {
        let digits: u32 = raw
            .trim()
            .parse()
            .map_err(|_| CalcError::invalid_config(format!("TALLY_PRECISION must be an integer, got '{}'", raw)))?;
        config = config.with_precision(Precision::new(digits)?);
    }

    if let Ok(raw) = env::var("TALLY_STRICT_CONVERGENCE") {
        if matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true") {
            config = config.with_exhaustion(ExhaustionPolicy::Fail);
        }
    }

    Ok(config)
}

fn write_response(response: &McpResponse) -> io::Result<()> {
    let line = serde_json::to_string(response).map_err(io::Error::other)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match config_from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(code = %e.code, "{}", e.message);
            return ExitCode::FAILURE;
        }
    };

    let tally = Tally::with_standard_library().with_config(config);

    info!(
        version = SERVER_VERSION,
        protocol = PROTOCOL_VERSION,
        precision = config.digits(),
        exhaustion = ?config.exhaustion,
        "Tally MCP server started"
    );

    let stdin = io::stdin();
    let reader = io::BufReader::new(stdin.lock());

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("error reading input: {}", e);
                return ExitCode::FAILURE;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: McpRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("error parsing request: {}", e);
                if let Err(e) = write_response(&McpResponse::parse_error(e)) {
                    error!("error writing response: {}", e);
                    return ExitCode::FAILURE;
                }
                continue;
            }
        };

        debug!(method = %request.method, "processing");
        let response = handle_request(&tally, &request);

        // Notifications get no response
        if request.id.is_none() {
            continue;
        }

        if let Err(e) = write_response(&response) {
            error!("error writing response: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!("client disconnected, shutting down");
    ExitCode::SUCCESS
}
