//! MCP (Model Context Protocol) integration
//!
//! Exposes every catalog operation as an MCP tool, alongside a fixed set of
//! workflow prompts and markdown guide resources. The protocol layer is
//! transport-independent; line-delimited stdio and HTTP (`POST /mcp`, feature
//! `server`) front ends feed it JSON-RPC messages.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   MCP client    │───▶│  JSON-RPC 2.0    │───▶│   Dispatcher    │
//! │ (stdio / HTTP)  │    │  (this module)   │    │  (operations)   │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - `core` - [`FreshserviceMcpServer`] and [`McpServerInfo`]
//! - `tools` - tool definitions rendered from operation descriptors
//! - `prompts` - workflow prompt templates
//! - `resources` - markdown usage guides
//! - `protocol` - `initialize`, `ping`, and the `tools/*`, `prompts/*`,
//!   `resources/*` methods
//! - `stdio` - line-delimited stdio loop
//! - `http` - axum router
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use freshservice_mcp::config::AdapterConfig;
//! use freshservice_mcp::dispatcher::Dispatcher;
//! use freshservice_mcp::mcp_integration::FreshserviceMcpServer;
//! use freshservice_mcp::upstream::ReqwestTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AdapterConfig::from_env()?;
//!     let dispatcher = Dispatcher::from_config(&config, ReqwestTransport::new()?)?;
//!     let server = Arc::new(FreshserviceMcpServer::new(dispatcher));
//!
//!     server.run_stdio().await?;
//!     Ok(())
//! }
//! ```

pub mod core;
#[cfg(feature = "server")]
pub mod http;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod stdio;
pub mod tools;


pub use self::core::{FreshserviceMcpServer, McpServerInfo};
pub use protocol::PROTOCOL_VERSION;
