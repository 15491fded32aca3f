//! Core MCP integration infrastructure
//!
//! This module contains the server type shared by the protocol and transport layers.

use super::prompts::{PromptDescriptor, builtin_prompts};
use crate::dispatcher::Dispatcher;
use crate::upstream::Transport;

/// Identity advertised to MCP clients during `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
    /// Usage hints returned as `instructions`
    pub instructions: String,
}

impl Default for McpServerInfo {
    fn default() -> Self {
        Self {
            name: "freshservice_mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: "Freshservice ITSM tools. Every tool returns a JSON envelope: \
                           `success`, then `data` or `kind`/`message`/`retriable`. \
                           List tools walk all pages unless `page` is given. \
                           Guides are available as resources and common workflows as prompts."
                .to_string(),
        }
    }
}

/// MCP server exposing the catalog as tools, plus workflow prompts and guide
/// resources.
///
/// Transport-independent: [`handle_message`](Self::handle_message) processes one
/// JSON-RPC message, and the stdio and HTTP front ends feed it.
pub struct FreshserviceMcpServer<T: Transport> {
    pub(crate) dispatcher: Dispatcher<T>,
    pub(crate) server_info: McpServerInfo,
    pub(crate) prompts: Vec<PromptDescriptor>,
}

impl<T: Transport> FreshserviceMcpServer<T> {
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self {
            dispatcher,
            server_info: McpServerInfo::default(),
            prompts: builtin_prompts(),
        }
    }

    pub fn with_info(dispatcher: Dispatcher<T>, server_info: McpServerInfo) -> Self {
        Self {
            dispatcher,
            server_info,
            prompts: builtin_prompts(),
        }
    }

    pub fn server_info(&self) -> &McpServerInfo {
        &self.server_info
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }
}
