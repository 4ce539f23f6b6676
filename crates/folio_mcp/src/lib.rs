//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC 2.0 over stdio, one message per line. Tool calls are served by a
//! single [`FolioEngine`] owned by the [`McpServer`].
//!
//! CRITICAL: stdout is reserved EXCLUSIVELY for JSON-RPC responses.
//! All logs (Info/Warn/Error) MUST go to stderr to avoid protocol corruption.

pub mod sources;
pub mod tools;

use folio_common::{FolioError, Result};
use folio_config::Config;
use folio_core::FolioEngine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// `tools/call` request for `tool` with `arguments`
    pub fn tool_call(id: impl Into<Value>, tool: &str, arguments: Value) -> Self {
        Self::new(
            id,
            "tools/call",
            Some(json!({ "name": tool, "arguments": arguments })),
        )
    }
}

/// JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Text of the first content block of a tool result
    pub fn tool_text(&self) -> Option<&str> {
        self.result.as_ref()?.get("content")?.get(0)?.get("text")?.as_str()
    }
}

/// JSON-RPC error object
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Convert FolioError to JSON-RPC error
    pub fn from_folio_error(err: &FolioError) -> Self {
        let code = match err {
            FolioError::NotFound { .. } | FolioError::EmptyIndex => 1001,
            FolioError::AlreadyExists(_) => 1008,
            FolioError::ConversionFailed(_) => 1009,
            FolioError::ValidationError(_)
            | FolioError::InvalidInput(_)
            | FolioError::BadAnchor(_)
            | FolioError::WrongKind(_) => Self::INVALID_PARAMS,
            _ => Self::INTERNAL_ERROR,
        };

        let data = match err {
            FolioError::NotFound { known, .. } => Some(json!({ "known": known })),
            _ => None,
        };

        Self {
            code,
            message: err.to_string(),
            data,
        }
    }

    pub fn method_not_found(what: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Unknown method: {}", what),
            data: None,
        }
    }
}

impl From<FolioError> for JsonRpcError {
    fn from(err: FolioError) -> Self {
        Self::from_folio_error(&err)
    }
}

/// Tool-call server: configuration, engine and HTTP client for URL sources
pub struct McpServer {
    config: Config,
    engine: FolioEngine,
    http: reqwest::Client,
}

impl McpServer {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FolioError::NetworkError(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            engine: FolioEngine::new(&config),
            config,
            http,
        })
    }

    pub fn engine(&self) -> &FolioEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Handle a single JSON-RPC request. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Log to stderr only
        tracing::info!(target: "mcp", method = %request.method, "Handling MCP request");

        if request.id.is_none() || request.method.starts_with("notifications/") {
            tracing::debug!("Notification {} needs no response", request.method);
            return None;
        }

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(Value::String("pong".to_string())),
            "tools/list" => Ok(json!({ "tools": tools::definitions(self.config.rag.enabled) })),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: Some(value),
                error: None,
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(e),
            },
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": self.config.mcp.server_name,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": { "tools": { "listChanged": false } }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        #[derive(Deserialize)]
        struct CallParams {
            name: String,
            #[serde(default)]
            arguments: Option<Value>,
        }

        let params: CallParams = params
            .ok_or_else(|| FolioError::ValidationError("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| FolioError::ValidationError(format!("Invalid params: {}", e)))
            })?;

        if !tools::is_available(&params.name, self.config.rag.enabled) {
            return Err(JsonRpcError::method_not_found(&params.name));
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        match tools::call(self, &params.name, arguments).await {
            Ok(text) => Ok(json!({ "content": [{ "type": "text", "text": text }] })),
            Err(e) => {
                tracing::warn!(tool = %params.name, "Tool call failed: {}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(Config::with_root(std::path::Path::new("/tmp/folio-mcp-unit"))).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = server()
            .handle_request(JsonRpcRequest::new(1, "ping", None))
            .await
            .unwrap();
        assert_eq!(resp.result, Some(Value::String("pong".to_string())));
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        let mut note = JsonRpcRequest::new(1, "notifications/initialized", None);
        assert!(server.handle_request(note).await.is_none());

        note = JsonRpcRequest::new(1, "ping", None);
        note.id = None;
        assert!(server.handle_request(note).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = server()
            .handle_request(JsonRpcRequest::new(7, "resources/list", None))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_error_codes() {
        let not_found = JsonRpcError::from_folio_error(&FolioError::unknown_document(
            "x",
            vec!["a".to_string()],
        ));
        assert_eq!(not_found.code, 1001);
        assert_eq!(not_found.data, Some(json!({ "known": ["a"] })));

        let validation = JsonRpcError::from(FolioError::ValidationError("bad".to_string()));
        assert_eq!(validation.code, JsonRpcError::INVALID_PARAMS);

        let empty = JsonRpcError::from(FolioError::EmptyIndex);
        assert_eq!(empty.code, 1001);
        assert_eq!(empty.data, None);
        assert!(empty.message.starts_with("No document has been indexed yet"));

        let io = JsonRpcError::from(FolioError::IndexError("boom".to_string()));
        assert_eq!(io.code, JsonRpcError::INTERNAL_ERROR);
    }
}
