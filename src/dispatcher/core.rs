//! Core dispatcher infrastructure
//!
//! The [`Dispatcher`] is the single entry point for tool invocations. It resolves the
//! operation in the catalog, validates arguments, renders the upstream request,
//! executes it (walking pages or fanning out where the descriptor says so), and
//! shapes the outcome into an [`Envelope`]. Every failure is returned as an error
//! envelope; `dispatch` never panics and never returns a bare error.

use super::envelope::{Envelope, ErrorEnvelope, InvocationMetadata, ResultEnvelope};
use super::normalize;
use super::render::render_request;
use crate::catalog::{
    Cardinality, FanOut, OperationCatalog, OperationDescriptor, ValidatedArguments,
    validate_arguments,
};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult, BuildResult, ValidationError};
use crate::governor::{Governor, instant_after};
use crate::pagination::{PageWalker, collect_walk};
use crate::upstream::{Transport, UpstreamClient, UpstreamRequest};
use futures::future::join_all;
use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Transport-agnostic tool invocation handler.
pub struct Dispatcher<T: Transport> {
    catalog: Arc<OperationCatalog>,
    client: UpstreamClient<T>,
    default_timeout: Duration,
    max_pages: usize,
    /// Helpdesk base URL for portal links
    portal: String,
}

/// A single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// Operation name as listed in the catalog
    pub operation: String,
    /// JSON object of arguments
    pub arguments: Value,
    /// Deadline for the whole invocation; the configured default when unset
    pub timeout: Option<Duration>,
    /// Correlation id; generated when unset
    pub request_id: Option<String>,
}

impl InvocationRequest {
    pub fn new(operation: impl Into<String>, arguments: Value) -> Self {
        Self {
            operation: operation.into(),
            arguments,
            timeout: None,
            request_id: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

struct Output {
    data: Value,
    next_page: Option<u64>,
}

struct Failure {
    error: AdapterError,
    partial: Option<Vec<Value>>,
}

impl From<AdapterError> for Failure {
    fn from(error: AdapterError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

impl From<ValidationError> for Failure {
    fn from(error: ValidationError) -> Self {
        AdapterError::from(error).into()
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher over an existing catalog and client.
    pub fn new(
        catalog: Arc<OperationCatalog>,
        client: UpstreamClient<T>,
        config: &AdapterConfig,
    ) -> Self {
        Self {
            catalog,
            client,
            default_timeout: config.invocation_timeout,
            max_pages: config.max_pages,
            portal: config.base_url.clone(),
        }
    }

    /// Wire the built-in catalog, a governor and an upstream client from `config`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use freshservice_mcp::config::AdapterConfig;
    /// use freshservice_mcp::dispatcher::Dispatcher;
    /// use freshservice_mcp::upstream::ReqwestTransport;
    /// use serde_json::json;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = AdapterConfig::from_env()?;
    /// let dispatcher = Dispatcher::from_config(&config, ReqwestTransport::new()?)?;
    ///
    /// let envelope = dispatcher.invoke("get_ticket", json!({"ticket_id": 42})).await;
    /// println!("{}", envelope.to_json());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &AdapterConfig, transport: T) -> BuildResult<Self> {
        let catalog = Arc::new(OperationCatalog::freshservice()?);
        let governor = Arc::new(Governor::new(config.governor_config()));
        let client = UpstreamClient::new(transport, config, governor);
        Ok(Self::new(catalog, client, config))
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    pub fn client(&self) -> &UpstreamClient<T> {
        &self.client
    }

    /// Every operation, in catalog order.
    pub fn list_operations(&self) -> &[OperationDescriptor] {
        self.catalog.list()
    }

    /// Invoke `operation` with the default deadline.
    pub async fn invoke(&self, operation: &str, arguments: Value) -> Envelope {
        self.dispatch(InvocationRequest::new(operation, arguments))
            .await
    }

    /// Handle a structured invocation request.
    pub async fn dispatch(&self, request: InvocationRequest) -> Envelope {
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!(
            "Dispatching '{}' (request: '{}')",
            request.operation, request_id
        );

        let started = Instant::now();
        let mut metadata = InvocationMetadata::new(&request.operation, &request_id);
        let outcome = self.run(&request, &mut metadata).await;
        metadata.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(output) => {
                debug!(
                    "'{}' completed in {}ms (request: '{}')",
                    request.operation, metadata.elapsed_ms, request_id
                );
                Envelope::Success(ResultEnvelope {
                    success: true,
                    data: output.data,
                    next_page: output.next_page,
                    metadata,
                })
            }
            Err(failure) => {
                warn!(
                    "'{}' failed: {} (request: '{}')",
                    request.operation, failure.error, request_id
                );
                let envelope = ErrorEnvelope::from_error(&failure.error, metadata);
                Envelope::Failure(match failure.partial {
                    Some(items) => envelope.with_partial_items(items),
                    None => envelope,
                })
            }
        }
    }

    async fn run(
        &self,
        request: &InvocationRequest,
        metadata: &mut InvocationMetadata,
    ) -> Result<Output, Failure> {
        let descriptor = self.catalog.lookup(&request.operation)?;
        let args = validate_arguments(descriptor, &request.arguments).inspect_err(|error| {
            debug!("Rejected arguments for '{}': {}", descriptor.name, error);
        })?;
        let deadline = instant_after(
            Instant::now(),
            request.timeout.unwrap_or(self.default_timeout),
        );
        let upstream = render_request(descriptor, &args)?;

        if descriptor.pagination.is_paginated() {
            self.run_paginated(descriptor, &args, upstream, deadline, metadata)
                .await
        } else {
            Ok(self
                .run_single(descriptor, upstream, deadline, metadata)
                .await?)
        }
    }

    async fn run_paginated(
        &self,
        descriptor: &OperationDescriptor,
        args: &ValidatedArguments,
        upstream: UpstreamRequest,
        deadline: Instant,
        metadata: &mut InvocationMetadata,
    ) -> Result<Output, Failure> {
        let shape = &descriptor.response;
        let walker = PageWalker::new(&self.client, self.max_pages);
        let per_page = args
            .get_u64("per_page")
            .and_then(|n| u32::try_from(n).ok());

        if let Some(page) = args.get_u64("page") {
            let page = walker
                .fetch_page(descriptor, &upstream, page, per_page, deadline)
                .await?;
            let items = normalize::relay_items(shape, &self.portal, page.items);
            metadata.item_count = Some(items.len());
            metadata.pages_fetched = Some(1);
            return Ok(Output {
                data: Value::Array(items),
                next_page: page.next_page,
            });
        }

        let mut walk = walker.walk(descriptor, upstream, per_page, deadline);
        let collected = collect_walk(&mut walk).await;
        metadata.pages_fetched = Some(walk.pages_fetched());

        match collected {
            Ok(items) => {
                let items = normalize::relay_items(shape, &self.portal, items);
                metadata.item_count = Some(items.len());
                metadata.truncated = walk.truncated();
                Ok(Output {
                    data: Value::Array(items),
                    next_page: None,
                })
            }
            Err((error, partial)) => Err(Failure {
                error,
                partial: Some(normalize::relay_items(shape, &self.portal, partial)),
            }),
        }
    }

    async fn run_single(
        &self,
        descriptor: &OperationDescriptor,
        upstream: UpstreamRequest,
        deadline: Instant,
        metadata: &mut InvocationMetadata,
    ) -> AdapterResult<Output> {
        let response = self.client.execute(upstream, deadline).await?;
        if !response.is_success() {
            return Err(normalize::status_error(&response));
        }

        let shape = &descriptor.response;
        let data = match shape.cardinality {
            Cardinality::One => {
                let entity = normalize::extract_entity(shape, &response.body)?;
                let mut projected = normalize::project(shape, &self.portal, &entity);
                if let Some(fan_out) = &descriptor.fan_out {
                    self.resolve_fan_out(fan_out, &entity, &mut projected, deadline)
                        .await;
                }
                projected
            }
            Cardinality::Many => {
                let items = normalize::relay_items(
                    shape,
                    &self.portal,
                    normalize::extract_items(shape, &response.body)?,
                );
                metadata.item_count = Some(items.len());
                Value::Array(items)
            }
            Cardinality::FirstMatch => {
                let items = normalize::relay_items(
                    shape,
                    &self.portal,
                    normalize::extract_items(shape, &response.body)?,
                );
                metadata.item_count = Some(items.len());
                items
                    .into_iter()
                    .next()
                    .ok_or_else(|| AdapterError::UpstreamNotFound {
                        message: format!("no match for '{}'", descriptor.name),
                        body: None,
                    })?
            }
        };

        Ok(Output {
            data,
            next_page: None,
        })
    }

    /// Resolve every id in the fan-out source field concurrently.
    ///
    /// Concurrency is bounded by the governor. A failed lookup is reported in place
    /// without failing the invocation.
    async fn resolve_fan_out(
        &self,
        fan_out: &FanOut,
        source: &Value,
        target: &mut Value,
        deadline: Instant,
    ) {
        let Some(descriptor) = self.catalog.get(&fan_out.operation) else {
            return;
        };
        let ids = source
            .get(&fan_out.source_field)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(
            "Resolving {} '{}' lookup(s) via '{}'",
            ids.len(),
            fan_out.source_field,
            descriptor.name
        );

        let results = join_all(
            ids.iter()
                .map(|id| self.lookup_one(descriptor, &fan_out.argument, id, deadline)),
        )
        .await;

        let resolved = ids
            .iter()
            .zip(results)
            .map(|(id, result)| match result {
                Ok(entity) => entity,
                Err(error) => json!({
                    "id": id,
                    "error": {
                        "kind": error.kind(),
                        "message": error.to_string(),
                        "retriable": error.is_retriable(),
                    }
                }),
            })
            .collect();

        if let Some(object) = target.as_object_mut() {
            object.insert(fan_out.target_field.clone(), Value::Array(resolved));
        }
    }

    async fn lookup_one(
        &self,
        descriptor: &OperationDescriptor,
        argument: &str,
        id: &Value,
        deadline: Instant,
    ) -> AdapterResult<Value> {
        let mut arguments = Map::new();
        arguments.insert(argument.to_string(), id.clone());
        let args = validate_arguments(descriptor, &Value::Object(arguments))?;
        let request = render_request(descriptor, &args)?;

        let response = self.client.execute(request, deadline).await?;
        if !response.is_success() {
            return Err(normalize::status_error(&response));
        }
        let entity = normalize::extract_entity(&descriptor.response, &response.body)?;
        Ok(normalize::project(&descriptor.response, &self.portal, &entity))
    }
}
