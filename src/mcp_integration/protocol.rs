//! MCP protocol layer for tool discovery and dispatch
//!
//! JSON-RPC 2.0 handling of the MCP lifecycle, tool, prompt and resource methods. Messages are
//! processed one at a time by [`FreshserviceMcpServer::handle_message`]; the stdio
//! and HTTP front ends only move bytes.

use super::core::FreshserviceMcpServer;
use super::prompts::{PromptArguments, find_prompt};
use super::resources::{BUILTIN_RESOURCES, find_resource};
use super::tools;
use crate::dispatcher::{Envelope, InvocationRequest};
use crate::upstream::Transport;
use log::{debug, info};
use serde_json::{Value, json};

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const RESOURCE_NOT_FOUND: i64 = -32002;

/// JSON-RPC error response.
pub fn error_response(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message.into()
        }
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

impl<T: Transport> FreshserviceMcpServer<T> {
    /// Get the list of available MCP tools as JSON
    ///
    /// One tool per catalog operation, in catalog order.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use freshservice_mcp::mcp_integration::FreshserviceMcpServer;
    /// use freshservice_mcp::upstream::ReqwestTransport;
    /// # fn example(server: FreshserviceMcpServer<ReqwestTransport>) {
    /// let tools = server.get_tools();
    /// println!("Available tools: {}", tools.len());
    /// # }
    /// ```
    pub fn get_tools(&self) -> Vec<Value> {
        self.dispatcher
            .list_operations()
            .iter()
            .map(tools::tool_definition)
            .collect()
    }

    /// Prompt definitions for `prompts/list`.
    pub fn get_prompts(&self) -> Vec<Value> {
        self.prompts.iter().map(|prompt| prompt.definition()).collect()
    }

    /// Execute a tool by name with arguments
    pub async fn execute_tool(&self, tool_name: &str, arguments: Value) -> Envelope {
        debug!("Executing MCP tool: {} with args: {}", tool_name, arguments);
        self.dispatcher
            .dispatch(InvocationRequest::new(tool_name, arguments))
            .await
    }

    /// Process one JSON-RPC message.
    ///
    /// Returns `None` for notifications, which are acknowledged without a response.
    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        let Some(object) = message.as_object() else {
            return Some(error_response(
                Value::Null,
                INVALID_REQUEST,
                "request must be a JSON object",
            ));
        };

        let id = object.get("id").cloned();
        let Some(method) = object.get("method").and_then(Value::as_str) else {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "missing 'method'",
            ));
        };

        let Some(id) = id else {
            debug!("Notification received: {}", method);
            return None;
        };

        let params = object.get("params").cloned().unwrap_or(Value::Null);
        Some(match method {
            "initialize" => self.initialize(id, &params),
            "ping" => success_response(id, json!({})),
            "tools/list" => success_response(id, json!({ "tools": self.get_tools() })),
            "tools/call" => self.call_tool(id, params).await,
            "prompts/list" => success_response(id, json!({ "prompts": self.get_prompts() })),
            "prompts/get" => self.get_prompt(id, &params),
            "resources/list" => success_response(
                id,
                json!({
                    "resources": BUILTIN_RESOURCES
                        .iter()
                        .map(|resource| resource.definition())
                        .collect::<Vec<_>>()
                }),
            ),
            "resources/read" => self.read_resource(id, &params),
            other => error_response(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
        })
    }

    fn initialize(&self, id: Value, params: &Value) -> Value {
        let client = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(
            "MCP session initialized by '{}' (requested protocol {})",
            client,
            params
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or("unspecified")
        );

        success_response(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false },
                    "prompts": { "listChanged": false },
                    "resources": { "subscribe": false, "listChanged": false }
                },
                "serverInfo": {
                    "name": self.server_info.name,
                    "version": self.server_info.version
                },
                "instructions": self.server_info.instructions
            }),
        )
    }

    async fn call_tool(&self, id: Value, params: Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "tools/call requires 'name'");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let envelope = self.execute_tool(name, arguments).await;
        let structured = envelope.to_json();
        success_response(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": structured.to_string()
                }],
                "structuredContent": structured,
                "isError": !envelope.is_success()
            }),
        )
    }

    fn get_prompt(&self, id: Value, params: &Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "prompts/get requires 'name'");
        };
        let arguments: PromptArguments = match params.get("arguments") {
            None | Some(Value::Null) => PromptArguments::new(),
            Some(Value::Object(arguments)) => arguments.clone(),
            Some(_) => {
                return error_response(id, INVALID_PARAMS, "'arguments' must be an object");
            }
        };

        let rendered = find_prompt(&self.prompts, name)
            .and_then(|prompt| Ok((prompt.description, prompt.render(&arguments)?)));
        match rendered {
            Ok((description, text)) => {
                debug!("Rendered prompt: {}", name);
                success_response(
                    id,
                    json!({
                        "description": description,
                        "messages": [{
                            "role": "user",
                            "content": { "type": "text", "text": text }
                        }]
                    }),
                )
            }
            Err(err) => error_response(id, INVALID_PARAMS, err.to_string()),
        }
    }

    fn read_resource(&self, id: Value, params: &Value) -> Value {
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "resources/read requires 'uri'");
        };
        match find_resource(uri) {
            Some(resource) => success_response(id, resource.contents()),
            None => error_response(id, RESOURCE_NOT_FOUND, format!("Resource not found: {uri}")),
        }
    }
}
