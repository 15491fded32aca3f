//! Built-in Freshservice v2 operation descriptors.
//!
//! Every tool the adapter exposes is declared here as data. Adding an operation means
//! adding a descriptor; the dispatcher needs no changes.

use super::types::{
    ArgumentSpec, ArgumentType, Cardinality, FanOut, FieldKind, NextPageSignal,
    OperationDescriptor,
};
use crate::upstream::HttpMethod;
use serde_json::{Value, json};

use super::types::FieldKind::{Array, Boolean, DateTime, Integer, Object, String as Text};

/// Items requested per page on list endpoints.
const PER_PAGE: u32 = 100;

const TICKET_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("subject", Text),
    ("description_text", Text),
    ("status", Integer),
    ("priority", Integer),
    ("source", Integer),
    ("type", Text),
    ("requester_id", Integer),
    ("responder_id", Integer),
    ("group_id", Integer),
    ("department_id", Integer),
    ("category", Text),
    ("due_by", DateTime),
    ("fr_due_by", DateTime),
    ("is_escalated", Boolean),
    ("tags", Array),
    ("created_at", DateTime),
    ("updated_at", DateTime),
];

const NOTE_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("body_text", Text),
    ("private", Boolean),
    ("user_id", Integer),
    ("ticket_id", Integer),
    ("created_at", DateTime),
];

const CHANGE_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("subject", Text),
    ("description_text", Text),
    ("status", Integer),
    ("priority", Integer),
    ("impact", Integer),
    ("risk", Integer),
    ("change_type", Integer),
    ("requester_id", Integer),
    ("agent_id", Integer),
    ("group_id", Integer),
    ("department_id", Integer),
    ("planned_start_date", DateTime),
    ("planned_end_date", DateTime),
    ("planning_fields", Object),
    ("created_at", DateTime),
    ("updated_at", DateTime),
];

const ASSET_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("display_id", Integer),
    ("name", Text),
    ("description", Text),
    ("asset_type_id", Integer),
    ("asset_tag", Text),
    ("impact", Text),
    ("usage_type", Text),
    ("user_id", Integer),
    ("department_id", Integer),
    ("location_id", Integer),
    ("agent_id", Integer),
    ("created_at", DateTime),
    ("updated_at", DateTime),
];

const REQUESTER_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("first_name", Text),
    ("last_name", Text),
    ("primary_email", Text),
    ("job_title", Text),
    ("department_ids", Array),
    ("work_phone_number", Text),
    ("mobile_phone_number", Text),
    ("active", Boolean),
    ("created_at", DateTime),
    ("updated_at", DateTime),
];

const DEPARTMENT_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("name", Text),
    ("description", Text),
    ("head_user_id", Integer),
    ("prime_user_id", Integer),
    ("domains", Array),
    ("created_at", DateTime),
    ("updated_at", DateTime),
];

const SERVICE_ITEM_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("display_id", Integer),
    ("name", Text),
    ("description", Text),
    ("short_description", Text),
    ("cost", Text),
    ("quantity", Integer),
    ("category_id", Integer),
    ("visibility", Integer),
    ("deleted", Boolean),
    ("icon_name", Text),
];

const ARTICLE_FIELDS: &[(&str, FieldKind)] = &[
    ("id", Integer),
    ("title", Text),
    ("description", Text),
    ("article_type", Integer),
    ("folder_id", Integer),
    ("category_id", Integer),
    ("thumbs_up", Integer),
    ("thumbs_down", Integer),
    ("tags", Array),
    ("keywords", Array),
    ("updated_at", DateTime),
];

fn ticket_status() -> Vec<(&'static str, Value)> {
    vec![
        ("open", json!(2)),
        ("pending", json!(3)),
        ("resolved", json!(4)),
        ("closed", json!(5)),
    ]
}

fn priority() -> Vec<(&'static str, Value)> {
    vec![
        ("low", json!(1)),
        ("medium", json!(2)),
        ("high", json!(3)),
        ("urgent", json!(4)),
    ]
}

fn ticket_source() -> Vec<(&'static str, Value)> {
    vec![
        ("email", json!(1)),
        ("portal", json!(2)),
        ("phone", json!(3)),
        ("chat", json!(4)),
        ("walkup", json!(9)),
        ("slack", json!(10)),
    ]
}

fn change_status() -> Vec<(&'static str, Value)> {
    vec![
        ("open", json!(1)),
        ("planning", json!(2)),
        ("awaiting_approval", json!(3)),
        ("pending_release", json!(4)),
        ("pending_review", json!(5)),
        ("closed", json!(6)),
    ]
}

fn impact() -> Vec<(&'static str, Value)> {
    vec![("low", json!(1)), ("medium", json!(2)), ("high", json!(3))]
}

fn risk() -> Vec<(&'static str, Value)> {
    vec![
        ("low", json!(1)),
        ("medium", json!(2)),
        ("high", json!(3)),
        ("very_high", json!(4)),
    ]
}

fn change_type() -> Vec<(&'static str, Value)> {
    vec![
        ("minor", json!(1)),
        ("standard", json!(2)),
        ("major", json!(3)),
        ("emergency", json!(4)),
    ]
}

fn asset_links() -> ArgumentSpec {
    ArgumentSpec::array(
        "assets",
        ArgumentType::Object(vec![
            ArgumentSpec::id("display_id")
                .required()
                .describe("Display id of the asset"),
        ]),
    )
    .describe("Assets to associate")
}

fn planning_section(name: &str) -> ArgumentSpec {
    ArgumentSpec::object(
        name,
        vec![ArgumentSpec::string("description").required()],
    )
}

/// All built-in operations, in presentation order.
pub fn operations() -> Vec<OperationDescriptor> {
    let mut operations = Vec::new();
    operations.extend(ticket_operations());
    operations.extend(change_operations());
    operations.extend(asset_operations());
    operations.extend(requester_operations());
    operations.extend(department_operations());
    operations.extend(service_item_operations());
    operations.extend(solution_operations());
    operations
}

fn ticket_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("list_tickets", HttpMethod::Get, "/tickets")
            .description("List tickets, optionally narrowed by a predefined filter or update time")
            .argument(
                ArgumentSpec::enumeration(
                    "filter",
                    &[
                        ("new_and_my_open", json!("new_and_my_open")),
                        ("watching", json!("watching")),
                        ("spam", json!("spam")),
                        ("deleted", json!("deleted")),
                    ],
                )
                .in_query()
                .describe("Predefined ticket filter"),
            )
            .argument(
                ArgumentSpec::date_time("updated_since")
                    .in_query()
                    .describe("Only tickets updated at or after this time"),
            )
            .argument(
                ArgumentSpec::enumeration("order_type", &[("asc", json!("asc")), ("desc", json!("desc"))])
                    .in_query()
                    .describe("Sort direction by creation time"),
            )
            .envelope("tickets")
            .fields(TICKET_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("filter_tickets", HttpMethod::Get, "/tickets/filter")
            .description("Find tickets matching field conditions (at most 300 results)")
            .argument(ArgumentSpec::enumeration("status", &ticket_status()).in_filter())
            .argument(ArgumentSpec::enumeration("priority", &priority()).in_filter())
            .argument(ArgumentSpec::id("agent_id").in_filter().describe("Assigned agent"))
            .argument(ArgumentSpec::id("group_id").in_filter().describe("Assigned group"))
            .argument(ArgumentSpec::id("department_id").in_filter())
            .at_least_one_of(&["status", "priority", "agent_id", "group_id", "department_id"])
            .envelope("tickets")
            .fields(TICKET_FIELDS)
            .paginate_pages(30, Some(10), NextPageSignal::FullPage)
            .build(),
        OperationDescriptor::builder("get_ticket", HttpMethod::Get, "/tickets/{ticket_id}")
            .description("Get a ticket by id")
            .argument(ArgumentSpec::id("ticket_id").required().in_path())
            .envelope("ticket")
            .fields(TICKET_FIELDS)
            .build(),
        OperationDescriptor::builder("create_ticket", HttpMethod::Post, "/tickets")
            .description("Create a ticket on behalf of a requester identified by email or id")
            .argument(ArgumentSpec::string("subject").required())
            .argument(
                ArgumentSpec::string("description")
                    .required()
                    .describe("HTML content of the ticket"),
            )
            .argument(ArgumentSpec::string("email").describe("Requester email"))
            .argument(ArgumentSpec::id("requester_id"))
            .argument(
                ArgumentSpec::enumeration("priority", &priority())
                    .required()
                    .default_value(json!("low")),
            )
            .argument(
                ArgumentSpec::enumeration("status", &ticket_status())
                    .required()
                    .default_value(json!("open")),
            )
            .argument(
                ArgumentSpec::enumeration("source", &ticket_source())
                    .default_value(json!("portal")),
            )
            .argument(ArgumentSpec::id("group_id"))
            .argument(ArgumentSpec::id("responder_id"))
            .argument(ArgumentSpec::id("department_id"))
            .argument(ArgumentSpec::array("tags", ArgumentType::String))
            .argument(ArgumentSpec::array("cc_emails", ArgumentType::String))
            .argument(asset_links())
            .at_least_one_of(&["email", "requester_id"])
            .envelope("ticket")
            .fields(TICKET_FIELDS)
            .build(),
        OperationDescriptor::builder("update_ticket", HttpMethod::Put, "/tickets/{ticket_id}")
            .description("Update fields of an existing ticket")
            .argument(ArgumentSpec::id("ticket_id").required().in_path())
            .argument(ArgumentSpec::string("subject"))
            .argument(ArgumentSpec::string("description"))
            .argument(ArgumentSpec::enumeration("status", &ticket_status()))
            .argument(ArgumentSpec::enumeration("priority", &priority()))
            .argument(ArgumentSpec::id("responder_id"))
            .argument(ArgumentSpec::id("group_id"))
            .argument(ArgumentSpec::array("tags", ArgumentType::String))
            .at_least_one_of(&[
                "subject",
                "description",
                "status",
                "priority",
                "responder_id",
                "group_id",
                "tags",
            ])
            .envelope("ticket")
            .fields(TICKET_FIELDS)
            .build(),
        OperationDescriptor::builder("add_ticket_note", HttpMethod::Post, "/tickets/{ticket_id}/notes")
            .description("Add a note to a ticket")
            .argument(ArgumentSpec::id("ticket_id").required().in_path())
            .argument(ArgumentSpec::string("body").required().describe("HTML content of the note"))
            .argument(
                ArgumentSpec::boolean("private")
                    .default_value(json!(true))
                    .describe("Hide the note from the requester"),
            )
            .argument(ArgumentSpec::array("notify_emails", ArgumentType::String))
            .envelope("conversation")
            .fields(NOTE_FIELDS)
            .build(),
    ]
}

fn change_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("list_changes", HttpMethod::Get, "/changes")
            .description("List change requests")
            .argument(
                ArgumentSpec::enumeration(
                    "filter",
                    &[
                        ("my_open", json!("my_open")),
                        ("unassigned", json!("unassigned")),
                        ("closed", json!("closed")),
                        ("release_requested", json!("release_requested")),
                    ],
                )
                .in_query(),
            )
            .argument(ArgumentSpec::date_time("updated_since").in_query())
            .envelope("changes")
            .fields(CHANGE_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("get_change", HttpMethod::Get, "/changes/{change_id}")
            .description("Get a change request by id")
            .argument(ArgumentSpec::id("change_id").required().in_path())
            .envelope("change")
            .fields(CHANGE_FIELDS)
            .build(),
        OperationDescriptor::builder("create_change", HttpMethod::Post, "/changes")
            .description("Create a change request with its planned window")
            .argument(ArgumentSpec::id("requester_id").required())
            .argument(ArgumentSpec::string("subject").required())
            .argument(ArgumentSpec::string("description").required())
            .argument(
                ArgumentSpec::enumeration("status", &change_status())
                    .required()
                    .default_value(json!("open")),
            )
            .argument(
                ArgumentSpec::enumeration("priority", &priority())
                    .required()
                    .default_value(json!("low")),
            )
            .argument(
                ArgumentSpec::enumeration("impact", &impact())
                    .required()
                    .default_value(json!("low")),
            )
            .argument(
                ArgumentSpec::enumeration("risk", &risk())
                    .required()
                    .default_value(json!("low")),
            )
            .argument(
                ArgumentSpec::enumeration("change_type", &change_type())
                    .required()
                    .default_value(json!("standard")),
            )
            .argument(ArgumentSpec::date_time("planned_start_date").required())
            .argument(ArgumentSpec::date_time("planned_end_date").required())
            .argument(ArgumentSpec::id("group_id"))
            .argument(ArgumentSpec::id("agent_id"))
            .argument(ArgumentSpec::id("department_id"))
            .argument(
                ArgumentSpec::object(
                    "planning_fields",
                    vec![
                        planning_section("reason_for_change"),
                        planning_section("change_impact"),
                        planning_section("rollout_plan"),
                        planning_section("backout_plan"),
                    ],
                )
                .describe("Planning sections, each with an HTML description"),
            )
            .argument(asset_links())
            .envelope("change")
            .fields(CHANGE_FIELDS)
            .build(),
    ]
}

fn asset_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("list_assets", HttpMethod::Get, "/assets")
            .description("List assets, optionally searching by name, asset tag or serial number")
            .argument(ArgumentSpec::string("name").in_filter())
            .argument(ArgumentSpec::string("asset_tag").in_filter())
            .argument(ArgumentSpec::string("serial_number").in_filter())
            .argument(
                ArgumentSpec::enumeration("include", &[("type_fields", json!("type_fields"))])
                    .in_query()
                    .describe("Embed asset-type specific fields"),
            )
            .filter_param("search")
            .envelope("assets")
            .fields(ASSET_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("get_asset", HttpMethod::Get, "/assets/{display_id}")
            .description("Get an asset by display id")
            .argument(ArgumentSpec::id("display_id").required().in_path())
            .envelope("asset")
            .fields(ASSET_FIELDS)
            .build(),
    ]
}

fn requester_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("search_requesters_by_name", HttpMethod::Get, "/requesters")
            .description("Find requesters by first name, last name, or both")
            .argument(ArgumentSpec::string("first_name").in_filter())
            .argument(ArgumentSpec::string("last_name").in_filter())
            .at_least_one_of(&["first_name", "last_name"])
            .envelope("requesters")
            .fields(REQUESTER_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("get_requesters_by_department_id", HttpMethod::Get, "/requesters")
            .description("List requesters belonging to a department")
            .argument(ArgumentSpec::id("department_id").required().in_filter())
            .envelope("requesters")
            .fields(REQUESTER_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("get_requester_by_id", HttpMethod::Get, "/requesters/{requester_id}")
            .description("Get a requester by id, with their departments resolved")
            .argument(ArgumentSpec::id("requester_id").required().in_path())
            .envelope("requester")
            .fields(REQUESTER_FIELDS)
            .fan_out(FanOut {
                source_field: "department_ids".into(),
                operation: "get_department_by_id".into(),
                argument: "department_id".into(),
                target_field: "departments".into(),
            })
            .build(),
    ]
}

fn department_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("list_departments", HttpMethod::Get, "/departments")
            .description("List all departments")
            .envelope("departments")
            .fields(DEPARTMENT_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("get_department_by_id", HttpMethod::Get, "/departments/{department_id}")
            .description("Get a department by id")
            .argument(ArgumentSpec::id("department_id").required().in_path())
            .envelope("department")
            .fields(DEPARTMENT_FIELDS)
            .build(),
        OperationDescriptor::builder("get_department_by_name", HttpMethod::Get, "/departments")
            .description("Get the first department whose name matches exactly")
            .argument(ArgumentSpec::string("name").required().in_filter())
            .envelope("departments")
            .fields(DEPARTMENT_FIELDS)
            .cardinality(Cardinality::FirstMatch)
            .build(),
    ]
}

fn service_item_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("list_service_items", HttpMethod::Get, "/service_catalog/items")
            .description("List service catalog items")
            .envelope("service_items")
            .fields(SERVICE_ITEM_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder("search_service_items", HttpMethod::Get, "/service_catalog/items")
            .description("Search service catalog items with a filter expression such as name:'Laptop'")
            .argument(
                ArgumentSpec::string("query")
                    .required()
                    .filter_expression()
                    .describe("Filter expression, e.g. name:'Laptop' AND visibility:1"),
            )
            .envelope("service_items")
            .fields(SERVICE_ITEM_FIELDS)
            .paginate_pages(PER_PAGE, None, NextPageSignal::LinkHeader)
            .build(),
        OperationDescriptor::builder(
            "get_service_item_by_id",
            HttpMethod::Get,
            "/service_catalog/items/{display_id}",
        )
        .description("Get a service catalog item by display id")
        .argument(ArgumentSpec::id("display_id").required().in_path())
        .envelope("service_item")
        .fields(SERVICE_ITEM_FIELDS)
        .build(),
    ]
}

fn solution_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::builder("search_solutions", HttpMethod::Get, "/solutions/articles/search")
            .description("Search published knowledge base articles")
            .argument(
                ArgumentSpec::string("search_term")
                    .required()
                    .in_query()
                    .describe("Keywords to search for"),
            )
            .envelope("articles")
            .retain("status", json!(2))
            .fields(ARTICLE_FIELDS)
            .portal_link("url", "/support/solutions/articles/{id}")
            .paginate_pages(PER_PAGE, None, NextPageSignal::FullPage)
            .build(),
    ]
}
