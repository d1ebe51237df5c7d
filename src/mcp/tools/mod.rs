pub mod attendees;
pub mod events;
pub mod listing;

use serde_json::Value;

use crate::calendar::CalendarService;
use crate::error::CalendarResult;
use crate::mcp::format::ToolOutput;

/// A tool definition for the MCP tools/list response.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Get all registered MCP tool definitions.
pub fn all_tools() -> Vec<ToolDef> {
    let mut tools = Vec::new();
    tools.extend(events::tool_defs());
    tools.extend(attendees::tool_defs());
    tools.extend(listing::tool_defs());
    tools
}

pub fn is_registered(name: &str) -> bool {
    all_tools().iter().any(|t| t.name == name)
}

/// Dispatch a tools/call request to the appropriate handler. Callers check
/// [`is_registered`] first; an unknown name here is a domain error.
pub async fn dispatch(
    service: &CalendarService,
    tool_name: &str,
    arguments: Value,
) -> CalendarResult<ToolOutput> {
    match tool_name {
        "create_event" => events::create_event(service, arguments).await,
        "edit_event" => events::edit_event(service, arguments).await,
        "delete_event" => events::delete_event(service, arguments).await,
        "search_attendees" => attendees::search_attendees(service, arguments).await,
        "get_attendee_freebusy" => attendees::get_attendee_freebusy(service, arguments).await,
        "list_events" => listing::list_events(service, arguments).await,
        "get_calendar_colors" => listing::get_calendar_colors(service, arguments).await,
        _ => Err(crate::error::CalendarError::invalid(format!(
            "Unknown tool: {tool_name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique() {
        let tools = all_tools();
        let names: HashSet<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 7);
    }

    #[test]
    fn test_required_fields_are_declared_properties() {
        for tool in all_tools() {
            let schema = &tool.input_schema;
            assert_eq!(schema["type"], "object", "{}", tool.name);
            let required = schema["required"].as_array().cloned().unwrap_or_default();
            for field in required {
                let field = field.as_str().unwrap();
                assert!(
                    schema["properties"].get(field).is_some(),
                    "{} requires undeclared {field}",
                    tool.name
                );
            }
        }
    }

    #[test]
    fn test_event_kind_enum_comes_from_wire_values() {
        let create = all_tools().into_iter().find(|t| t.name == "create_event").unwrap();
        assert_eq!(
            create.input_schema["properties"]["eventType"]["enum"],
            serde_json::json!(["default", "focusTime", "workingLocation"])
        );
    }
}
