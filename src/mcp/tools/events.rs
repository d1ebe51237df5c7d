use serde_json::{Value, json};

use super::ToolDef;
use crate::calendar::CalendarService;
use crate::calendar::request::{
    AutoDeclineMode, ChatStatus, DeleteEvent, EventKind, EventUpdate, NewEvent, ReminderMethod,
    ResponseStatus, Visibility, WorkingLocationKind, decode,
};
use crate::error::CalendarResult;
use crate::mcp::format::{self, ToolOutput};

/// An enum schema that also admits `null`.
fn nullable_enum(values: &[&str]) -> Value {
    let mut items: Vec<Value> = values.iter().map(|v| json!(v)).collect();
    items.push(Value::Null);
    Value::Array(items)
}

fn attendees_schema(nullable: bool) -> Value {
    let kind = if nullable { json!(["array", "null"]) } else { json!("array") };
    json!({
        "type": kind,
        "items": {
            "oneOf": [
                {"type": "string", "description": "Attendee email address"},
                {
                    "type": "object",
                    "properties": {
                        "email": {"type": "string"},
                        "response_status": {"type": "string", "enum": ResponseStatus::ALL},
                        "display_name": {"type": "string"}
                    },
                    "required": ["email"]
                }
            ]
        },
        "description": "Attendees as email addresses or {email, response_status, display_name} objects"
    })
}

fn reminders_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "use_default": {"type": "boolean", "description": "Use the calendar's default reminders"},
            "overrides": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "method": {"type": "string", "enum": ReminderMethod::ALL},
                        "minutes": {"type": "integer", "minimum": 0}
                    },
                    "required": ["method", "minutes"]
                },
                "description": "Custom reminders; providing any turns calendar defaults off"
            }
        }
    })
}

fn working_location_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {"type": "string", "enum": WorkingLocationKind::ALL},
            "label": {"type": "string", "description": "Office or custom location name"}
        },
        "required": ["type"],
        "description": "Working location details (eventType 'workingLocation' only)"
    })
}

fn focus_time_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "autoDeclineMode": {"type": "string", "enum": AutoDeclineMode::ALL},
            "chatStatus": {"type": "string", "enum": ChatStatus::ALL},
            "declineMessage": {"type": "string"}
        },
        "description": "Focus time settings (eventType 'focusTime' only)"
    })
}

pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "create_event",
            description: "Create a new calendar event. Supports all-day and recurring events, attendees, reminders, Meet links, guest permissions, focus time and working location events.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string", "description": "Calendar ID", "default": "primary"},
                    "summary": {"type": "string", "description": "Event title"},
                    "description": {"type": "string", "description": "Event description"},
                    "location": {"type": "string", "description": "Event location"},
                    "start_time": {"type": "string", "description": "Start time in RFC3339, e.g. 2026-03-02T10:00:00-08:00"},
                    "end_time": {"type": "string", "description": "End time in RFC3339"},
                    "timezone": {"type": "string", "description": "IANA time zone, e.g. America/New_York", "default": "UTC"},
                    "all_day": {"type": "boolean", "description": "Use the dates of start_time/end_time as an all-day event", "default": false},
                    "attendees": attendees_schema(false),
                    "recurrence": {"type": "array", "items": {"type": "string"}, "description": "RRULE lines, e.g. RRULE:FREQ=DAILY;COUNT=10"},
                    "visibility": {"type": "string", "enum": Visibility::ALL, "default": "default"},
                    "send_notifications": {"type": "boolean", "default": true},
                    "guest_can_modify": {"type": "boolean", "default": false},
                    "guest_can_invite_others": {"type": "boolean", "default": true},
                    "guest_can_see_other_guests": {"type": "boolean", "default": true},
                    "create_meet_link": {"type": "boolean", "default": false},
                    "reminders": reminders_schema(),
                    "colorId": {"type": "string", "description": "Event color ID (see get_calendar_colors)"},
                    "eventType": {"type": "string", "enum": EventKind::ALL, "default": "default"},
                    "workingLocation": working_location_schema(),
                    "focusTimeProperties": focus_time_schema()
                },
                "required": ["summary", "start_time", "end_time"]
            }),
        },
        ToolDef {
            name: "edit_event",
            description: "Edit an existing event. Only the fields present are changed; null clears a field. Also used to RSVP through attendee response_status.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string", "default": "primary"},
                    "event_id": {"type": "string", "description": "ID of the event to edit"},
                    "summary": {"type": ["string", "null"]},
                    "description": {"type": ["string", "null"]},
                    "location": {"type": ["string", "null"]},
                    "start_time": {"type": "string", "description": "New start time in RFC3339"},
                    "end_time": {"type": "string", "description": "New end time in RFC3339"},
                    "timezone": {"type": "string"},
                    "all_day": {"type": "boolean"},
                    "attendees": attendees_schema(true),
                    "recurrence": {"type": ["array", "null"], "items": {"type": "string"}},
                    "visibility": {"type": ["string", "null"], "enum": nullable_enum(Visibility::ALL)},
                    "send_notifications": {"type": "boolean", "default": true},
                    "guest_can_modify": {"type": "boolean"},
                    "guest_can_invite_others": {"type": "boolean"},
                    "guest_can_see_other_guests": {"type": "boolean"},
                    "create_meet_link": {"type": "boolean", "default": false},
                    "reminders": reminders_schema(),
                    "colorId": {"type": ["string", "null"]},
                    "eventType": {"type": "string", "enum": EventKind::ALL},
                    "workingLocation": working_location_schema(),
                    "focusTimeProperties": focus_time_schema()
                },
                "required": ["event_id"]
            }),
        },
        ToolDef {
            name: "delete_event",
            description: "Delete a calendar event permanently.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string", "default": "primary"},
                    "event_id": {"type": "string", "description": "ID of the event to delete"},
                    "send_notifications": {"type": "boolean", "default": true}
                },
                "required": ["event_id"]
            }),
        },
    ]
}

pub async fn create_event(service: &CalendarService, args: Value) -> CalendarResult<ToolOutput> {
    let args: NewEvent = decode(args)?;
    let event = service.create_event(args).await?;
    format::created(&event)
}

pub async fn edit_event(service: &CalendarService, args: Value) -> CalendarResult<ToolOutput> {
    let args: EventUpdate = decode(args)?;
    let outcome = service.edit_event(args).await?;
    format::edited(&outcome)
}

pub async fn delete_event(service: &CalendarService, args: Value) -> CalendarResult<ToolOutput> {
    let args: DeleteEvent = decode(args)?;
    let event = service.delete_event(args).await?;
    Ok(format::deleted(&event))
}
