//! Folio MCP server binary
//!
//! Reads one JSON-RPC 2.0 request per line from stdin and writes responses
//! to stdout. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use folio_config::Config;
use folio_mcp::{JsonRpcRequest, McpServer};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "folio_mcp", version, about = "Document building and conversion over MCP")]
struct Args {
    /// Workspace root; holds `.folio/config.toml` and resolves relative sources
    #[arg(long, env = "FOLIO_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Debug-level logs
    #[arg(short, long)]
    verbose: bool,

    /// Logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let root = match args.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let config = Config::load(&root).context("failed to load configuration")?;

    folio_common::telemetry::init_tracing(args.verbose, args.json_logs || config.logging.json);
    tracing::info!("Folio MCP server starting in {}", root.display());

    let server = McpServer::new(config).context("failed to start server")?;
    let rt = Runtime::new().context("failed to create Tokio runtime")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        tracing::debug!("Received {} bytes", line.len());

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => match rt.block_on(server.handle_request(request)) {
                Some(resp) => serde_json::to_string(&resp),
                None => continue,
            },
            Err(e) => {
                tracing::error!("Failed to parse request: {}", e);
                Ok(serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": {
                        "code": folio_mcp::JsonRpcError::PARSE_ERROR,
                        "message": format!("Parse error: {}", e)
                    }
                })
                .to_string())
            }
        };

        let response_json = match response {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                continue;
            }
        };

        if let Err(e) = writeln!(stdout_lock, "{}", response_json) {
            tracing::error!("Failed to write response: {}", e);
            break;
        }
        if let Err(e) = stdout_lock.flush() {
            tracing::error!("Failed to flush stdout: {}", e);
            break;
        }
    }

    tracing::info!("Folio MCP server shutting down");
    Ok(())
}
