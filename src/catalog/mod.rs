//! Operation catalog for Freshservice tools.
//!
//! The catalog is the single source of truth for which operations exist, what
//! arguments they accept, and how each maps onto an upstream endpoint.
//!
//! # Key Types
//!
//! - [`OperationCatalog`] - Immutable registry of operations keyed by name
//! - [`OperationDescriptor`] - Declarative description of a single operation
//! - [`ArgumentSpec`] - Argument schema entry with type and request location
//!
//! # Examples
//!
//! ```rust
//! use freshservice_mcp::catalog::OperationCatalog;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = OperationCatalog::freshservice()?;
//! let descriptor = catalog.lookup("get_ticket")?;
//! assert_eq!(descriptor.endpoint.path, "/tickets/{ticket_id}");
//! # Ok(())
//! # }
//! ```

pub mod builtin;
pub mod registry;
pub mod types;
pub mod validation;

pub use registry::OperationCatalog;
pub use types::{
    ArgumentConstraint, ArgumentLocation, ArgumentSpec, ArgumentType, Cardinality,
    EndpointTemplate, EnumVariant, FanOut, FieldKind, FieldMatch, NextPageSignal,
    OperationBuilder, OperationDescriptor, PaginationPolicy, PortalLink, ResponseField,
    ResponseShape,
};
pub use validation::{ValidatedArguments, validate_arguments};
