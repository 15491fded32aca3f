//! Freshservice ITSM tools for the Model Context Protocol.
//!
//! Exposes a fixed catalog of Freshservice operations (tickets, changes, assets,
//! requesters, departments, service items, solutions) as MCP tools. Each call is
//! validated locally, rendered into a Freshservice REST request, executed under a
//! shared concurrency and rate budget with retries, and returned as a uniform
//! result or error envelope.
//!
//! # Core Components
//!
//! - [`OperationCatalog`] - Immutable table of operation descriptors
//! - [`Dispatcher`] - Validates, renders, executes and normalizes invocations
//! - [`UpstreamClient`] - Authenticated HTTP client with backoff
//! - [`Governor`] - Concurrency pool plus rate budget shared by all calls
//! - [`FreshserviceMcpServer`] - JSON-RPC front end over stdio or HTTP
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use freshservice_mcp::{AdapterConfig, Dispatcher, upstream::ReqwestTransport};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AdapterConfig::from_env()?;
//! let dispatcher = Dispatcher::from_config(&config, ReqwestTransport::new()?)?;
//!
//! let envelope = dispatcher
//!     .invoke("filter_tickets", json!({"status": "open", "priority": "urgent"}))
//!     .await;
//! println!("{}", envelope.to_json());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod governor;
pub mod mcp_integration;
pub mod pagination;
pub mod upstream;

pub use catalog::{OperationCatalog, OperationDescriptor};
pub use config::{AdapterConfig, Credential};
pub use dispatcher::{Dispatcher, Envelope, InvocationRequest};
pub use error::{AdapterError, AdapterResult, BuildError, ErrorKind, ValidationError};
pub use governor::Governor;
pub use mcp_integration::{FreshserviceMcpServer, McpServerInfo};
pub use upstream::UpstreamClient;
