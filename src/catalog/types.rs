//! Core descriptor types for catalog operations.
//!
//! An [`OperationDescriptor`] is pure data: its argument schema, where each argument
//! lands in the upstream request, the response shape to relay, and how results are
//! paginated. Descriptors are assembled with [`OperationBuilder`] and
//! [`ArgumentSpec`]'s chaining constructors.

use crate::upstream::HttpMethod;
use serde_json::Value;

/// A single tool operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    /// Unique tool name
    pub name: String,
    /// Human-readable description surfaced to tool consumers
    pub description: String,
    /// Declared arguments, in presentation order
    pub arguments: Vec<ArgumentSpec>,
    /// Cross-argument constraints
    pub constraints: Vec<ArgumentConstraint>,
    pub endpoint: EndpointTemplate,
    pub response: ResponseShape,
    pub pagination: PaginationPolicy,
    /// Follow-up lookups resolved concurrently after the primary call
    pub fan_out: Option<FanOut>,
}

impl OperationDescriptor {
    /// Start building a descriptor for `method path`.
    pub fn builder(
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> OperationBuilder {
        OperationBuilder {
            descriptor: OperationDescriptor {
                name: name.into(),
                description: String::new(),
                arguments: Vec::new(),
                constraints: Vec::new(),
                endpoint: EndpointTemplate {
                    method,
                    path: path.into(),
                    filter_param: "query".to_string(),
                },
                response: ResponseShape::default(),
                pagination: PaginationPolicy::None,
                fan_out: None,
            },
        }
    }

    /// Look up a declared argument by name.
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    /// Names of arguments that must be supplied and have no default.
    pub fn required_arguments(&self) -> impl Iterator<Item = &str> {
        self.arguments
            .iter()
            .filter(|arg| arg.required && arg.default.is_none())
            .map(|arg| arg.name.as_str())
    }
}

/// Fluent construction of an [`OperationDescriptor`].
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    descriptor: OperationDescriptor,
}

impl OperationBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.descriptor.description = text.into();
        self
    }

    pub fn argument(mut self, spec: ArgumentSpec) -> Self {
        self.descriptor.arguments.push(spec);
        self
    }

    /// Require at least one of the named arguments.
    pub fn at_least_one_of(mut self, names: &[&str]) -> Self {
        self.descriptor
            .constraints
            .push(ArgumentConstraint::AtLeastOneOf(
                names.iter().map(|n| n.to_string()).collect(),
            ));
        self
    }

    /// Query parameter that carries rendered filter clauses (default `query`).
    pub fn filter_param(mut self, param: impl Into<String>) -> Self {
        self.descriptor.endpoint.filter_param = param.into();
        self
    }

    /// Key of the response envelope that wraps the entity or collection.
    pub fn envelope(mut self, key: impl Into<String>) -> Self {
        self.descriptor.response.envelope_key = Some(key.into());
        self
    }

    /// Fields relayed for each entity.
    pub fn fields(mut self, fields: &[(&str, FieldKind)]) -> Self {
        self.descriptor.response.fields.extend(
            fields
                .iter()
                .map(|(name, kind)| ResponseField::new(*name, *kind)),
        );
        self
    }

    /// Relay only collection items whose `field` equals `value`.
    pub fn retain(mut self, field: impl Into<String>, value: Value) -> Self {
        self.descriptor.response.retain = Some(FieldMatch {
            field: field.into(),
            equals: value,
        });
        self
    }

    /// Add a portal URL under `field`, built from `path` and the entity's fields.
    pub fn portal_link(mut self, field: impl Into<String>, path: impl Into<String>) -> Self {
        self.descriptor.response.links.push(PortalLink {
            field: field.into(),
            path: path.into(),
        });
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.descriptor.response.cardinality = cardinality;
        self
    }

    /// Page-number pagination, adding the `page` and `per_page` control arguments.
    pub fn paginate_pages(
        mut self,
        per_page: u32,
        max_pages: Option<usize>,
        next: NextPageSignal,
    ) -> Self {
        self.descriptor.pagination = PaginationPolicy::PageNumber {
            per_page,
            max_pages,
            next,
        };
        self.descriptor.response.cardinality = Cardinality::Many;
        self.descriptor.arguments.push(
            ArgumentSpec::integer("page")
                .min(1)
                .control()
                .describe("Fetch only this page; omit to walk all pages"),
        );
        self.descriptor.arguments.push(
            ArgumentSpec::integer("per_page")
                .min(1)
                .max(i64::from(per_page.max(100)))
                .control()
                .describe("Items requested per page"),
        );
        self
    }

    /// Offset/limit pagination, adding the `page` control argument.
    pub fn paginate_offset(
        mut self,
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        limit: u32,
        max_pages: Option<usize>,
    ) -> Self {
        self.descriptor.pagination = PaginationPolicy::OffsetLimit {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit,
            max_pages,
        };
        self.descriptor.response.cardinality = Cardinality::Many;
        self.descriptor.arguments.push(
            ArgumentSpec::integer("page")
                .min(1)
                .control()
                .describe("Fetch only this batch; omit to walk all batches"),
        );
        self
    }

    pub fn fan_out(mut self, fan_out: FanOut) -> Self {
        self.descriptor.fan_out = Some(fan_out);
        self
    }

    pub fn build(self) -> OperationDescriptor {
        self.descriptor
    }
}

/// Declared type of an argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentType {
    String,
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Boolean,
    /// RFC 3339 timestamp, carried as a string
    DateTime,
    /// Closed set of labels, each with the value sent upstream
    Enum(Vec<EnumVariant>),
    /// Named sub-schema
    Object(Vec<ArgumentSpec>),
    Array(Box<ArgumentType>),
}

impl ArgumentType {
    /// Enumeration from `(label, wire value)` pairs.
    pub fn enumeration(variants: &[(&str, Value)]) -> Self {
        ArgumentType::Enum(
            variants
                .iter()
                .map(|(label, wire)| EnumVariant {
                    label: label.to_string(),
                    wire: wire.clone(),
                })
                .collect(),
        )
    }
}

/// One label of an enumerated argument.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    /// Label accepted from callers
    pub label: String,
    /// Value rendered into the upstream request
    pub wire: Value,
}

/// Where a validated argument is placed in the upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentLocation {
    /// Substituted for `{name}` in the endpoint path
    Path,
    Query { param: String },
    /// Top-level field of the JSON body
    Body { field: String },
    /// `field:value` clause of the endpoint's filter query
    Filter { field: String },
    /// Raw filter expression, combined with other clauses
    FilterExpression,
    /// Consumed by the adapter, never sent as-is
    Control,
}

/// Declared argument of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub arg_type: ArgumentType,
    pub required: bool,
    /// Value applied when the caller omits the argument
    pub default: Option<Value>,
    pub description: String,
    pub location: ArgumentLocation,
}

impl ArgumentSpec {
    /// Optional body argument named `name`.
    pub fn new(name: impl Into<String>, arg_type: ArgumentType) -> Self {
        let name = name.into();
        Self {
            location: ArgumentLocation::Body {
                field: name.clone(),
            },
            name,
            arg_type,
            required: false,
            default: None,
            description: String::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(
            name,
            ArgumentType::Integer {
                minimum: None,
                maximum: None,
            },
        )
    }

    /// Integer identifier, must be positive.
    pub fn id(name: impl Into<String>) -> Self {
        Self::integer(name).min(1)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::Boolean)
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::DateTime)
    }

    pub fn enumeration(name: impl Into<String>, variants: &[(&str, Value)]) -> Self {
        Self::new(name, ArgumentType::enumeration(variants))
    }

    pub fn object(name: impl Into<String>, fields: Vec<ArgumentSpec>) -> Self {
        Self::new(name, ArgumentType::Object(fields))
    }

    pub fn array(name: impl Into<String>, items: ArgumentType) -> Self {
        Self::new(name, ArgumentType::Array(Box::new(items)))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Lower bound for integer arguments.
    pub fn min(mut self, bound: i64) -> Self {
        if let ArgumentType::Integer { minimum, .. } = &mut self.arg_type {
            *minimum = Some(bound);
        }
        self
    }

    /// Upper bound for integer arguments.
    pub fn max(mut self, bound: i64) -> Self {
        if let ArgumentType::Integer { maximum, .. } = &mut self.arg_type {
            *maximum = Some(bound);
        }
        self
    }

    pub fn in_path(mut self) -> Self {
        self.location = ArgumentLocation::Path;
        self
    }

    pub fn in_query(self) -> Self {
        let param = self.name.clone();
        self.in_query_as(param)
    }

    pub fn in_query_as(mut self, param: impl Into<String>) -> Self {
        self.location = ArgumentLocation::Query {
            param: param.into(),
        };
        self
    }

    pub fn in_body_as(mut self, field: impl Into<String>) -> Self {
        self.location = ArgumentLocation::Body {
            field: field.into(),
        };
        self
    }

    pub fn in_filter(self) -> Self {
        let field = self.name.clone();
        self.in_filter_as(field)
    }

    pub fn in_filter_as(mut self, field: impl Into<String>) -> Self {
        self.location = ArgumentLocation::Filter {
            field: field.into(),
        };
        self
    }

    pub fn filter_expression(mut self) -> Self {
        self.location = ArgumentLocation::FilterExpression;
        self
    }

    pub fn control(mut self) -> Self {
        self.location = ArgumentLocation::Control;
        self
    }
}

/// Constraint spanning several arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentConstraint {
    AtLeastOneOf(Vec<String>),
}

/// HTTP method and path template of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    pub method: HttpMethod,
    /// Path relative to the API root, with `{name}` placeholders
    pub path: String,
    /// Query parameter carrying rendered filter clauses
    pub filter_param: String,
}

impl EndpointTemplate {
    /// Placeholder names appearing in the path, in order.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_names(&self.path)
    }
}

/// `{name}` placeholders of a path, in order.
fn placeholder_names(path: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        names.push(&rest[start + 1..start + len]);
        rest = &rest[start + len + 1..];
    }
    names
}

/// Web portal link added to each relayed entity.
///
/// `path` is relative to the helpdesk base URL and may reference entity fields as
/// `{field}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalLink {
    pub field: String,
    pub path: String,
}

impl PortalLink {
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_names(&self.path)
    }
}

/// Shape of the relayed response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseShape {
    /// Key wrapping the payload, e.g. `ticket` or `tickets`
    pub envelope_key: Option<String>,
    /// Relayed fields; empty relays every field
    pub fields: Vec<ResponseField>,
    /// Collection filter applied before projection
    pub retain: Option<FieldMatch>,
    pub cardinality: Cardinality,
    pub links: Vec<PortalLink>,
}

/// How many entities an operation yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// A single entity
    #[default]
    One,
    /// A collection
    Many,
    /// First entity of a collection; an empty collection is not-found
    FirstMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseField {
    pub name: String,
    pub kind: FieldKind,
}

impl ResponseField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Declared type of a relayed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    DateTime,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: String,
    pub equals: Value,
}

/// How the upstream signals another page is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPageSignal {
    /// `Link` header with `rel="next"`
    LinkHeader,
    /// A page holding exactly `per_page` items
    FullPage,
}

/// Pagination convention of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationPolicy {
    None,
    PageNumber {
        per_page: u32,
        /// Page cap; falls back to the adapter-wide cap when unset
        max_pages: Option<usize>,
        next: NextPageSignal,
    },
    OffsetLimit {
        offset_param: String,
        limit_param: String,
        limit: u32,
        max_pages: Option<usize>,
    },
}

impl PaginationPolicy {
    pub fn is_paginated(&self) -> bool {
        !matches!(self, PaginationPolicy::None)
    }

    /// Operation-specific page cap.
    pub fn max_pages(&self) -> Option<usize> {
        match self {
            PaginationPolicy::None => Some(1),
            PaginationPolicy::PageNumber { max_pages, .. }
            | PaginationPolicy::OffsetLimit { max_pages, .. } => *max_pages,
        }
    }
}

/// Concurrent follow-up lookups keyed by ids found in the primary result.
///
/// For each id in `source_field`, `operation` is invoked with `argument` set to the id.
/// Results (or per-item failures) are attached under `target_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub source_field: String,
    pub operation: String,
    pub argument: String,
    pub target_field: String,
}
