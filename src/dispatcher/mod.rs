//! Invocation Dispatcher.
//!
//! Turns `(operation name, arguments)` into exactly one [`Envelope`]:
//!
//! 1. resolve the operation in the [`OperationCatalog`](crate::catalog::OperationCatalog)
//! 2. validate arguments against its schema (no upstream traffic on failure)
//! 3. render the upstream request
//! 4. execute it through the retrying, governed upstream client, walking pages or
//!    fanning out as the descriptor declares
//! 5. normalize the response into a result or error envelope

pub mod core;
pub mod envelope;
pub mod normalize;
pub mod render;

pub use self::core::{Dispatcher, InvocationRequest};
pub use envelope::{Envelope, ErrorEnvelope, InvocationMetadata, ResultEnvelope};
pub use render::render_request;
