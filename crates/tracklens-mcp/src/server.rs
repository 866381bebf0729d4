//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Handle tool calls - execute tools via providers
//! 3. EOF on stdin - shut down

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::handlers::ToolHandler;
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::transport::{IncomingMessage, StdioTransport, Transport};

/// MCP server for tracklens.
pub struct McpServer {
    handler: ToolHandler,
    initialized: bool,
}

impl McpServer {
    pub fn new(handler: ToolHandler) -> Self {
        Self {
            handler,
            initialized: false,
        }
    }

    /// Run the server over stdin/stdout until EOF.
    pub async fn run(&mut self) -> tracklens_core::Result<()> {
        self.serve(StdioTransport::stdio()).await
    }

    /// Run the main loop over an arbitrary transport.
    pub async fn serve<R, W>(
        &mut self,
        mut transport: Transport<R, W>,
    ) -> tracklens_core::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            "Starting MCP server with {} tools",
            self.handler.available_tools().len()
        );

        loop {
            match transport.read_message().await {
                Ok(Some(msg)) => {
                    if let Some(resp) = self.handle_message(msg).await {
                        if let Err(e) = transport.write_response(&resp).await {
                            tracing::error!("Failed to write response: {}", e);
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("EOF received, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    let error_resp = JsonRpcResponse::error(
                        RequestId::Null,
                        JsonRpcError::parse_error(&e.to_string()),
                    );
                    if transport.write_response(&error_resp).await.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    async fn handle_message(&mut self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
            method => {
                tracing::warn!("Unknown method: {}", method);
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                tracing::info!("Client initialized");
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init_params) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init_params.client_info.name,
                        init_params.client_info.version,
                        init_params.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "tracklens".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.handler.available_tools(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        tracing::info!("Calling tool: {}", params.name);

        let result = self.handler.execute(&params.name, params.arguments).await;
        JsonRpcResponse::from_result(id, &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JSONRPC_VERSION;

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_response() {
        let mut server = McpServer::new(ToolHandler::new());

        let resp = server
            .handle_request(request(
                1,
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "test-client", "version": "1.0.0" }
                })),
            ))
            .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "tracklens");
        assert!(server.initialized);
    }

    #[tokio::test]
    async fn test_double_initialize_error() {
        let mut server = McpServer::new(ToolHandler::new());
        server.initialized = true;

        let resp = server.handle_request(request(1, "initialize", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_list_without_providers_is_empty() {
        let mut server = McpServer::new(ToolHandler::new());
        let resp = server.handle_request(request(2, "tools/list", None)).await;

        let result: ToolsListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.tools.is_empty());
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let mut server = McpServer::new(ToolHandler::new());
        let resp = server.handle_request(request(3, "tools/call", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_error_result() {
        let mut server = McpServer::new(ToolHandler::new());
        let resp = server
            .handle_request(request(
                4,
                "tools/call",
                Some(serde_json::json!({"name": "nope"})),
            ))
            .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut server = McpServer::new(ToolHandler::new());
        let resp = server.handle_request(request(5, "unknown/method", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_session() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
            "garbage\n",
        );
        let mut server = McpServer::new(ToolHandler::new());
        let mut output = Vec::new();
        let transport = Transport::new(input.as_bytes(), &mut output);

        server.serve(transport).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        // initialize, ping, parse error; the notification gets no reply
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["result"], serde_json::json!({}));
        assert_eq!(lines[2]["id"], Value::Null);
        assert_eq!(lines[2]["error"]["code"], JsonRpcError::PARSE_ERROR);
    }
}
