use serde_json::{Value, json};

use super::ToolDef;
use crate::calendar::CalendarService;
use crate::calendar::request::{ListEvents, OrderBy, OutputFormat, TimeFilter, decode};
use crate::error::CalendarResult;
use crate::mcp::format::{self, ToolOutput};

pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "list_events",
            description: "List calendar events for today, this week, next week (Monday-Friday) or a custom range. Declined events are hidden by default and overlapping events are flagged.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string", "default": "primary"},
                    "time_filter": {"type": "string", "enum": TimeFilter::ALL, "default": "today"},
                    "time_min": {"type": "string", "description": "Range start in RFC3339 (time_filter 'custom')"},
                    "time_max": {"type": "string", "description": "Range end in RFC3339 (time_filter 'custom')"},
                    "timezone": {"type": "string", "description": "Time zone for day boundaries", "default": "UTC"},
                    "max_results": {"type": "integer", "minimum": 1, "default": 250},
                    "show_deleted": {"type": "boolean", "default": false},
                    "order_by": {"type": "string", "enum": OrderBy::ALL, "default": "startTime"},
                    "show_declined": {"type": "boolean", "default": false},
                    "detect_overlaps": {"type": "boolean", "default": true},
                    "output_format": {"type": "string", "enum": OutputFormat::ALL, "default": "text"}
                }
            }),
        },
        ToolDef {
            name: "get_calendar_colors",
            description: "Get the available calendar and event colors with their IDs.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

pub async fn list_events(service: &CalendarService, args: Value) -> CalendarResult<ToolOutput> {
    let args: ListEvents = decode(args)?;
    let listing = service.list_events(&args).await?;
    tracing::debug!(
        filter = listing.filter.as_str(),
        count = listing.events.len(),
        "Listed events"
    );
    let data = format::listing_json(&listing);
    let text = match args.output_format {
        OutputFormat::Text => format::listing_text(&listing),
        OutputFormat::Json => serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string()),
    };
    Ok(ToolOutput::text(text).with_structured(data))
}

pub async fn get_calendar_colors(service: &CalendarService, _args: Value) -> CalendarResult<ToolOutput> {
    let colors = service.colors().await?;
    format::colors(&colors)
}
