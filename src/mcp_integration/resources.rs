//! Usage guides exposed as MCP resources.
//!
//! Read-only markdown documents showing tool arguments for common tasks. Served
//! by `resources/list` and `resources/read` from a fixed table.

use serde_json::{Value, json};

const MARKDOWN: &str = "text/markdown";

/// A static resource document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDocument {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub text: &'static str,
}

impl ResourceDocument {
    const fn guide(
        uri: &'static str,
        name: &'static str,
        description: &'static str,
        text: &'static str,
    ) -> Self {
        Self {
            uri,
            name,
            description,
            mime_type: MARKDOWN,
            text,
        }
    }

    /// Entry for `resources/list`.
    pub fn definition(&self) -> Value {
        json!({
            "uri": self.uri,
            "name": self.name,
            "description": self.description,
            "mimeType": self.mime_type
        })
    }

    /// Body of a `resources/read` result.
    pub fn contents(&self) -> Value {
        json!({
            "contents": [{
                "uri": self.uri,
                "mimeType": self.mime_type,
                "text": self.text
            }]
        })
    }
}

pub const BUILTIN_RESOURCES: &[ResourceDocument] = &[
    ResourceDocument::guide(
        "freshservice://guides/ticket-operations",
        "Ticket operations",
        "Creating, reading, updating, noting and listing tickets",
        include_str!("guides/ticket-operations.md"),
    ),
    ResourceDocument::guide(
        "freshservice://guides/requesters-and-departments",
        "Requesters and departments",
        "Finding people and the departments they belong to",
        include_str!("guides/requesters-and-departments.md"),
    ),
    ResourceDocument::guide(
        "freshservice://guides/knowledge-base",
        "Knowledge base",
        "Searching solution articles and sharing portal links",
        include_str!("guides/knowledge-base.md"),
    ),
    ResourceDocument::guide(
        "freshservice://guides/service-catalog",
        "Service catalog",
        "Browsing and searching requestable items",
        include_str!("guides/service-catalog.md"),
    ),
    ResourceDocument::guide(
        "freshservice://guides/reporting",
        "Reporting",
        "Pagination metadata and filter combinations for reports",
        include_str!("guides/reporting.md"),
    ),
    ResourceDocument::guide(
        "freshservice://guides/change-management",
        "Change management",
        "Planning change requests with type, risk and impact",
        include_str!("guides/change-management.md"),
    ),
];

pub fn find_resource(uri: &str) -> Option<&'static ResourceDocument> {
    BUILTIN_RESOURCES.iter().find(|resource| resource.uri == uri)
}
