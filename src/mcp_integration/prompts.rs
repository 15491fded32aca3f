//! Prompt templates for common helpdesk workflows.
//!
//! Each template is a [`PromptDescriptor`]: a name, declared arguments, and a
//! render function producing one user message that walks the model through the
//! tools needed for the workflow. Served by `prompts/list` and `prompts/get`.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Map, Value, json};

const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];
const STATUSES: &[&str] = &["open", "pending", "resolved", "closed"];

/// Arguments passed to `prompts/get`.
pub type PromptArguments = Map<String, Value>;

/// Declared prompt argument. MCP prompt arguments are plain strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl PromptArgument {
    const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
        }
    }

    const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Prompt '{prompt}' requires argument '{argument}'")]
    MissingArgument { prompt: String, argument: String },

    #[error("Prompt argument '{argument}' {message}")]
    InvalidArgument { argument: String, message: String },
}

/// A named prompt template.
#[derive(Debug, Clone)]
pub struct PromptDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgument>,
    render: fn(&PromptArguments) -> Result<String, PromptError>,
}

impl PromptDescriptor {
    /// Entry for `prompts/list`.
    pub fn definition(&self) -> Value {
        let arguments: Vec<Value> = self
            .arguments
            .iter()
            .map(|arg| {
                json!({
                    "name": arg.name,
                    "description": arg.description,
                    "required": arg.required
                })
            })
            .collect();
        json!({
            "name": self.name,
            "description": self.description,
            "arguments": arguments
        })
    }

    /// Render the prompt text after checking required arguments are present.
    pub fn render(&self, arguments: &PromptArguments) -> Result<String, PromptError> {
        if let Some(missing) = self
            .arguments
            .iter()
            .find(|arg| arg.required && text(arguments, arg.name).is_none())
        {
            return Err(PromptError::MissingArgument {
                prompt: self.name.to_string(),
                argument: missing.name.to_string(),
            });
        }
        (self.render)(arguments)
    }
}

/// Look up a prompt by name.
pub fn find_prompt<'a>(
    prompts: &'a [PromptDescriptor],
    name: &str,
) -> Result<&'a PromptDescriptor, PromptError> {
    prompts
        .iter()
        .find(|prompt| prompt.name == name)
        .ok_or_else(|| PromptError::UnknownPrompt(name.to_string()))
}

/// The prompts served by the adapter, in listing order.
pub fn builtin_prompts() -> Vec<PromptDescriptor> {
    vec![
        PromptDescriptor {
            name: "create_ticket",
            description: "Draft and file a well-formed ticket",
            arguments: vec![
                PromptArgument::required("subject", "Ticket subject"),
                PromptArgument::required("description", "What happened"),
                PromptArgument::optional("priority", "low, medium, high or urgent (default medium)"),
                PromptArgument::optional("requester_email", "Email of the person affected"),
            ],
            render: render_create_ticket,
        },
        PromptDescriptor {
            name: "ticket_analysis",
            description: "Analyse a ticket and recommend next steps",
            arguments: vec![PromptArgument::required("ticket_id", "Ticket to analyse")],
            render: render_ticket_analysis,
        },
        PromptDescriptor {
            name: "bulk_ticket_report",
            description: "Summarise recent tickets matching optional filters",
            arguments: vec![
                PromptArgument::optional("status", "open, pending, resolved or closed"),
                PromptArgument::optional("priority", "low, medium, high or urgent"),
                PromptArgument::optional("agent_id", "Only tickets assigned to this agent"),
                PromptArgument::optional("days_back", "Look-back window in days (default 7)"),
            ],
            render: render_bulk_report,
        },
        PromptDescriptor {
            name: "escalation",
            description: "Escalate a ticket with an audit note",
            arguments: vec![
                PromptArgument::required("ticket_id", "Ticket to escalate"),
                PromptArgument::required("reason", "Why the ticket needs escalation"),
                PromptArgument::optional("urgency_level", "low, medium, high or urgent (default high)"),
            ],
            render: render_escalation,
        },
        PromptDescriptor {
            name: "knowledge_base",
            description: "Find or draft solution content for a topic",
            arguments: vec![
                PromptArgument::required("topic", "Subject to research"),
                PromptArgument::optional("article_type", "solution, faq or how_to (default solution)"),
            ],
            render: render_knowledge_base,
        },
        PromptDescriptor {
            name: "agent_workload",
            description: "Review open work for one agent or the whole desk",
            arguments: vec![PromptArgument::optional("agent_id", "Agent to review; omit for the desk")],
            render: render_agent_workload,
        },
        PromptDescriptor {
            name: "sla_monitoring",
            description: "Spot tickets at risk of breaching their due dates",
            arguments: vec![
                PromptArgument::optional("group_id", "Only tickets owned by this group"),
                PromptArgument::optional("priority_level", "low, medium, high or urgent"),
            ],
            render: render_sla_monitoring,
        },
    ]
}

/// Argument as trimmed text. Numbers are accepted for id-like arguments.
fn text(arguments: &PromptArguments, name: &str) -> Option<String> {
    match arguments.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn one_of(
    arguments: &PromptArguments,
    name: &str,
    allowed: &[&str],
) -> Result<Option<String>, PromptError> {
    match text(arguments, name) {
        Some(value) if allowed.contains(&value.as_str()) => Ok(Some(value)),
        Some(value) => Err(PromptError::InvalidArgument {
            argument: name.to_string(),
            message: format!("must be one of {}, got '{value}'", allowed.join(", ")),
        }),
        None => Ok(None),
    }
}

fn id(arguments: &PromptArguments, name: &str) -> Result<Option<u64>, PromptError> {
    text(arguments, name)
        .map(|value| {
            value.parse::<u64>().map_err(|_| PromptError::InvalidArgument {
                argument: name.to_string(),
                message: format!("must be a positive integer, got '{value}'"),
            })
        })
        .transpose()
}

fn required_id(arguments: &PromptArguments, name: &str) -> Result<u64, PromptError> {
    id(arguments, name)?.ok_or_else(|| PromptError::InvalidArgument {
        argument: name.to_string(),
        message: "is required".to_string(),
    })
}

fn required_text(arguments: &PromptArguments, name: &str) -> Result<String, PromptError> {
    text(arguments, name).ok_or_else(|| PromptError::InvalidArgument {
        argument: name.to_string(),
        message: "is required".to_string(),
    })
}

fn render_create_ticket(arguments: &PromptArguments) -> Result<String, PromptError> {
    let subject = required_text(arguments, "subject")?;
    let description = required_text(arguments, "description")?;
    let priority = one_of(arguments, "priority", PRIORITIES)?.unwrap_or_else(|| "medium".into());

    let mut call = json!({
        "subject": subject,
        "description": description,
        "priority": priority,
        "status": "open",
        "source": "portal"
    });
    let requester = match text(arguments, "requester_email") {
        Some(email) => {
            call["email"] = json!(email);
            format!("The requester is {email}.")
        }
        None => "No requester was given; ask for an email or a requester_id before filing.".into(),
    };

    Ok(format!(
        "File a new helpdesk ticket.\n\n\
         Subject: {subject}\n\
         Description: {description}\n\
         Priority: {priority}\n\
         {requester}\n\n\
         1. Tighten the description: what is affected, since when, and any error text.\n\
         2. Call `create_ticket` with:\n{call:#}\n\
         3. Report the new ticket id and its status back to the user."
    ))
}

fn render_ticket_analysis(arguments: &PromptArguments) -> Result<String, PromptError> {
    let ticket_id = required_id(arguments, "ticket_id")?;
    Ok(format!(
        "Analyse ticket #{ticket_id}.\n\n\
         1. Call `get_ticket` with {{\"ticket_id\": {ticket_id}}}.\n\
         2. If it has a requester_id, call `get_requester_by_id` to see who raised it.\n\
         3. Call `search_solutions` with the key terms of the subject to find known fixes.\n\n\
         Summarise the problem, its current status and priority, how long it has been open, \
         and recommend the next action. If the recommendation changes the ticket, propose the \
         `update_ticket` arguments but do not apply them without confirmation."
    ))
}

fn render_bulk_report(arguments: &PromptArguments) -> Result<String, PromptError> {
    let status = one_of(arguments, "status", STATUSES)?;
    let priority = one_of(arguments, "priority", PRIORITIES)?;
    let agent_id = id(arguments, "agent_id")?;
    let days_back = id(arguments, "days_back")?.unwrap_or(7);
    let since = (Utc::now() - ChronoDuration::days(days_back.min(3650) as i64))
        .format("%Y-%m-%dT00:00:00Z");

    let mut filters = Map::new();
    if let Some(status) = status {
        filters.insert("status".into(), json!(status));
    }
    if let Some(priority) = priority {
        filters.insert("priority".into(), json!(priority));
    }
    if let Some(agent_id) = agent_id {
        filters.insert("agent_id".into(), json!(agent_id));
    }

    let fetch = if filters.is_empty() {
        format!(
            "Call `list_tickets` with {}.",
            json!({"updated_since": since.to_string()})
        )
    } else {
        format!(
            "Call `filter_tickets` with {}, then keep only tickets created on or after {since}.",
            Value::Object(filters)
        )
    };

    Ok(format!(
        "Build a ticket report for the last {days_back} days.\n\n\
         {fetch}\n\
         If the result envelope says `truncated`, mention that the report is partial.\n\n\
         Report totals by status and priority, the oldest unresolved tickets, recurring \
         subjects, and any agent with an unusually large share."
    ))
}

fn render_escalation(arguments: &PromptArguments) -> Result<String, PromptError> {
    let ticket_id = required_id(arguments, "ticket_id")?;
    let reason = required_text(arguments, "reason")?;
    let urgency = one_of(arguments, "urgency_level", PRIORITIES)?.unwrap_or_else(|| "high".into());

    let note = json!({
        "ticket_id": ticket_id,
        "body": format!("Escalated ({urgency}): {reason}"),
        "private": true
    });
    let update = json!({"ticket_id": ticket_id, "priority": urgency});

    Ok(format!(
        "Escalate ticket #{ticket_id}.\n\
         Reason: {reason}\n\n\
         1. Call `get_ticket` with {{\"ticket_id\": {ticket_id}}} and confirm it is not already \
            resolved or closed.\n\
         2. Record the escalation with `add_ticket_note`:\n{note:#}\n\
         3. Raise the priority with `update_ticket`:\n{update:#}\n\
         4. If the ticket needs a different team, suggest a group_id for `update_ticket`.\n\n\
         Confirm each change back to the user."
    ))
}

fn render_knowledge_base(arguments: &PromptArguments) -> Result<String, PromptError> {
    let topic = required_text(arguments, "topic")?;
    let article_type = text(arguments, "article_type").unwrap_or_else(|| "solution".into());
    Ok(format!(
        "Research the knowledge base for \"{topic}\".\n\n\
         1. Call `search_solutions` with {}.\n\
         2. Open the returned `url` links for the closest matches.\n\
         3. If nothing covers the topic, draft a {article_type} article with a title, \
            symptoms, cause, and step-by-step resolution.\n\n\
         Cite existing articles by title and url.",
        json!({"search_term": topic})
    ))
}

fn render_agent_workload(arguments: &PromptArguments) -> Result<String, PromptError> {
    let scope = match id(arguments, "agent_id")? {
        Some(agent_id) => format!(
            "agent {agent_id}.\n\n\
             1. Call `filter_tickets` with {} and again with {}.",
            json!({"agent_id": agent_id, "status": "open"}),
            json!({"agent_id": agent_id, "status": "pending"})
        ),
        None => format!(
            "the whole desk.\n\n\
             1. Call `filter_tickets` with {} and again with {}, grouping results by responder_id.",
            json!({"status": "open"}),
            json!({"status": "pending"})
        ),
    };
    Ok(format!(
        "Review the current workload for {scope}\n\
         2. Count tickets by priority and flag any past their due_by time.\n\n\
         Recommend which tickets to tackle first and whether any should be reassigned."
    ))
}

fn render_sla_monitoring(arguments: &PromptArguments) -> Result<String, PromptError> {
    let mut filters = Map::new();
    filters.insert("status".into(), json!("open"));
    if let Some(group_id) = id(arguments, "group_id")? {
        filters.insert("group_id".into(), json!(group_id));
    }
    if let Some(priority) = one_of(arguments, "priority_level", PRIORITIES)? {
        filters.insert("priority".into(), json!(priority));
    }
    let open = Value::Object(filters.clone());
    filters.insert("status".into(), json!("pending"));
    let pending = Value::Object(filters);

    Ok(format!(
        "Check for tickets at risk of missing their due dates.\n\n\
         1. Call `filter_tickets` with {open} and again with {pending}.\n\
         2. Compare each ticket's due_by and fr_due_by against the current time.\n\n\
         List breached tickets first, then those due within the next four hours, with \
         ticket id, subject, priority and time remaining."
    ))
}
