use serde_json::{Value, json};

use super::ToolDef;
use crate::calendar::CalendarService;
use crate::calendar::request::{AttendeeSearch, FreeBusyQuery, decode};
use crate::error::CalendarResult;
use crate::mcp::format::{self, ToolOutput};

pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "search_attendees",
            description: "Search for potential attendees by email or name among people on your recent and upcoming events. A full email address is always returned as a match.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Email address, partial email or name"},
                    "max_results": {"type": "integer", "minimum": 1, "default": 10},
                    "domain": {"type": "string", "description": "Only return addresses in this domain, e.g. example.com"}
                },
                "required": ["query"]
            }),
        },
        ToolDef {
            name: "get_attendee_freebusy",
            description: "Check free/busy status for attendees during a time period.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "attendee_emails": {"type": "array", "items": {"type": "string"}, "minItems": 1},
                    "time_min": {"type": "string", "description": "Window start in RFC3339"},
                    "time_max": {"type": "string", "description": "Window end in RFC3339 (exclusive)"},
                    "timezone": {"type": "string", "default": "UTC"}
                },
                "required": ["attendee_emails", "time_min", "time_max"]
            }),
        },
    ]
}

pub async fn search_attendees(service: &CalendarService, args: Value) -> CalendarResult<ToolOutput> {
    let args: AttendeeSearch = decode(args)?;
    let query = args.query.clone();
    let emails = service.search_attendees(args).await?;
    Ok(format::attendee_matches(&query, &emails))
}

pub async fn get_attendee_freebusy(
    service: &CalendarService,
    args: Value,
) -> CalendarResult<ToolOutput> {
    let args: FreeBusyQuery = decode(args)?;
    let report = service.free_busy(args).await?;
    format::free_busy(&report)
}
