//! Rendering of calendar results into tool result payloads.
//!
//! Every tool answers with `{content: [{type: "text", text}], isError}`; data
//! results also carry the same data as `structuredContent`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::calendar::overlap::OverlapReport;
use crate::calendar::request::TimeFilter;
use crate::calendar::service::{EditOutcome, EventListing, FreeBusyReport};
use crate::calendar::types::{Bound, Colors, Event, EventDateTime};
use crate::error::{CalendarError, CalendarResult};

/// Longest description shown in the text listing, in characters.
const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Output of a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }

    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured = Some(value);
        self
    }

    pub fn into_result(self) -> Value {
        let mut result = json!({
            "content": [{"type": "text", "text": self.text}],
            "isError": false
        });
        if let (Some(structured), Some(map)) = (self.structured, result.as_object_mut()) {
            map.insert("structuredContent".to_string(), structured);
        }
        result
    }
}

/// Tool result for a failed calendar operation.
pub fn error_result(err: &CalendarError) -> Value {
    let text = format!("❌ Error [{}]: {err}", err.kind());
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": true
    })
}

pub fn to_json<T: Serialize>(value: &T) -> CalendarResult<Value> {
    serde_json::to_value(value).map_err(|e| CalendarError::Internal(e.into()))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn created(event: &Event) -> CalendarResult<ToolOutput> {
    let data = to_json(event)?;
    let text = format!(
        "✅ Event '{}' created successfully (ID: {})\n\n{}",
        event.display_title(),
        event.id.as_deref().unwrap_or("unknown"),
        pretty(&data)
    );
    Ok(ToolOutput::text(text).with_structured(data))
}

pub fn edited(outcome: &EditOutcome) -> CalendarResult<ToolOutput> {
    let data = to_json(&outcome.event)?;
    let headline = if outcome.changed {
        format!("✅ Event '{}' updated successfully", outcome.event.display_title())
    } else {
        format!(
            "ℹ️ No fields given for event '{}'; nothing was changed",
            outcome.event.display_title()
        )
    };
    Ok(ToolOutput::text(format!("{headline}\n\n{}", pretty(&data))).with_structured(data))
}

pub fn deleted(event: &Event) -> ToolOutput {
    ToolOutput::text(format!("✅ Event '{}' deleted successfully", event.display_title()))
        .with_structured(json!({"deleted": true, "id": event.id}))
}

pub fn colors(colors: &Colors) -> CalendarResult<ToolOutput> {
    let data = to_json(colors)?;
    let text = format!("🎨 Available Calendar Colors:\n\n{}", pretty(&data));
    Ok(ToolOutput::text(text).with_structured(data))
}

pub fn attendee_matches(query: &str, emails: &[String]) -> ToolOutput {
    let mut text = format!("🔍 Attendee search results for '{query}':\n\n");
    if emails.is_empty() {
        text.push_str("No attendees found. Please provide full email addresses.");
    }
    for (i, email) in emails.iter().enumerate() {
        let _ = writeln!(text, "{}. {email}", i + 1);
    }
    ToolOutput::text(text.trim_end().to_string()).with_structured(json!({ "attendees": emails }))
}

pub fn free_busy(report: &FreeBusyReport) -> CalendarResult<ToolOutput> {
    let tz: Tz = report.timezone.parse().unwrap_or(Tz::UTC);
    let stamp = |t: &DateTime<Utc>| t.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string();

    let mut text = format!(
        "📅 Free/Busy information from {} to {} ({}):\n\n",
        stamp(&report.time_min),
        stamp(&report.time_max),
        report.timezone
    );
    for attendee in &report.attendees {
        if attendee.available {
            let _ = writeln!(text, "✅ {}: available", attendee.email);
        } else if attendee.busy.is_empty() {
            let _ = writeln!(text, "⚠️ {}: unknown", attendee.email);
        } else {
            let _ = writeln!(text, "⛔ {}: busy", attendee.email);
        }
        for period in &attendee.busy {
            let _ = writeln!(text, "   - {} to {}", stamp(&period.start), stamp(&period.end));
        }
        for error in &attendee.errors {
            let _ = writeln!(text, "   - error: {error}");
        }
    }
    Ok(ToolOutput::text(text.trim_end().to_string()).with_structured(to_json(report)?))
}

/// Structured listing, also used as `structuredContent` for text listings.
pub fn listing_json(listing: &EventListing) -> Value {
    let events: Vec<Value> = listing
        .events
        .iter()
        .map(|e| Value::Object(event_entry(e, listing.overlaps.as_ref())))
        .collect();
    json!({
        "time_filter": listing.filter.as_str(),
        "time_min": listing.window.start.to_rfc3339(),
        "time_max": listing.window.end.to_rfc3339(),
        "total_count": listing.events.len(),
        "events": events,
    })
}

fn endpoint_json(endpoint: Option<&EventDateTime>) -> Value {
    let endpoint = endpoint.cloned().unwrap_or_default();
    json!({
        "dateTime": endpoint.date_time.map(|dt| dt.to_rfc3339()),
        "date": endpoint.date.map(|d| d.to_string()),
        "timeZone": endpoint.time_zone,
    })
}

fn event_entry(event: &Event, overlaps: Option<&OverlapReport>) -> Map<String, Value> {
    let text = |value: &Option<String>| Value::String(value.clone().unwrap_or_default());
    let id = event.id.clone().unwrap_or_default();

    let mut entry = Map::new();
    entry.insert("id".into(), Value::String(id.clone()));
    entry.insert("summary".into(), text(&event.summary));
    entry.insert("description".into(), text(&event.description));
    entry.insert("location".into(), text(&event.location));
    entry.insert("status".into(), text(&event.status));
    entry.insert(
        "eventType".into(),
        json!(event.event_type.as_deref().unwrap_or("default")),
    );
    entry.insert("start".into(), endpoint_json(event.start.as_ref()));
    entry.insert("end".into(), endpoint_json(event.end.as_ref()));

    if !event.attendees.is_empty() {
        let attendees: Vec<Value> = event
            .attendees
            .iter()
            .map(|a| {
                json!({
                    "email": a.email,
                    "displayName": a.display_name.clone().unwrap_or_default(),
                    "responseStatus": a.response_status.clone().unwrap_or_default(),
                    "self": a.is_self.unwrap_or(false),
                    "organizer": a.organizer.unwrap_or(false),
                })
            })
            .collect();
        entry.insert("attendees".into(), Value::Array(attendees));
    }

    if let Some(report) = overlaps {
        entry.insert("has_overlap".into(), json!(report.has_overlap(&id)));
        let others = report.overlapping_ids(&id);
        if !others.is_empty() {
            entry.insert("overlapping_event_ids".into(), json!(others));
        }
    }

    if let Some(color) = event.color_id.as_deref().filter(|c| !c.is_empty()) {
        entry.insert("colorId".into(), json!(color));
    }
    if let Some(link) = event.hangout_link.as_deref().filter(|l| !l.is_empty()) {
        entry.insert("hangoutLink".into(), json!(link));
    }
    if let Some(focus) = &event.focus_time_properties {
        entry.insert(
            "focusTimeProperties".into(),
            json!({
                "autoDeclineMode": focus.auto_decline_mode.clone().unwrap_or_default(),
                "chatStatus": focus.chat_status.clone().unwrap_or_default(),
            }),
        );
    }
    if let Some(place) = &event.working_location_properties {
        let mut props = Map::new();
        props.insert("type".into(), json!(place.kind));
        if let Some(custom) = &place.custom_location {
            props.insert("customLocation".into(), json!(custom.label));
        }
        if place.home_office.is_some() {
            props.insert("homeOffice".into(), json!(true));
        }
        if let Some(office) = &place.office_location {
            props.insert("officeLocation".into(), json!(office.label));
        }
        entry.insert("workingLocationProperties".into(), Value::Object(props));
    }
    entry
}

/// Human-readable listing grouped by start date.
pub fn listing_text(listing: &EventListing) -> String {
    let mut out = match listing.filter {
        TimeFilter::Today => "📅 Events for Today:\n\n".to_string(),
        TimeFilter::ThisWeek => "📅 Events for This Week (Monday-Friday):\n\n".to_string(),
        TimeFilter::NextWeek => "📅 Events for Next Week (Monday-Friday):\n\n".to_string(),
        TimeFilter::Custom => format!(
            "📅 Events from {} to {} UTC:\n\n",
            listing.window.start.format("%Y-%m-%d %H:%M"),
            listing.window.end.format("%Y-%m-%d %H:%M")
        ),
    };

    if listing.events.is_empty() {
        out.push_str("No events found for the specified time period.");
        return out;
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
    let mut undated = Vec::new();
    for event in &listing.events {
        match start_date(event) {
            Some(date) => by_date.entry(date).or_default().push(event),
            None => undated.push(event),
        }
    }

    let mut groups: Vec<(String, Vec<&Event>)> = by_date
        .into_iter()
        .map(|(date, events)| (date.format("%A, %B %-d, %Y").to_string(), events))
        .collect();
    if !undated.is_empty() {
        groups.push(("Unknown date".to_string(), undated));
    }

    for (i, (header, events)) in groups.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "## {header}");
        for event in events {
            let overlap = listing
                .overlaps
                .as_ref()
                .zip(event.id.as_deref())
                .is_some_and(|(report, id)| report.has_overlap(id));
            write_event(&mut out, event, overlap);
        }
    }

    let _ = write!(out, "\n📊 Total: {} events", listing.events.len());
    out
}

fn start_date(event: &Event) -> Option<NaiveDate> {
    match event.start.as_ref()?.bound()? {
        Bound::Date(date) => Some(date),
        Bound::DateTime(dt) => Some(dt.date_naive()),
    }
}

fn rsvp_marker(status: Option<&str>) -> &'static str {
    match status {
        Some("accepted") => " ✅",
        Some("declined") => " ❌",
        Some("tentative") => " ⏳",
        Some("needsAction") => " ❓",
        _ => "",
    }
}

fn chat_icon(status: &str) -> &'static str {
    if status == "doNotDisturb" { "🔕" } else { "💬" }
}

fn write_event(out: &mut String, event: &Event, has_overlap: bool) {
    let _ = writeln!(out, "### {}", event.display_title());

    let start = event.start.as_ref().and_then(EventDateTime::bound);
    let end = event.end.as_ref().and_then(EventDateTime::bound);
    match (start, end) {
        (Some(Bound::Date(_)), _) => out.push_str("🕐 **All Day**\n"),
        (Some(Bound::DateTime(s)), Some(Bound::DateTime(e))) => {
            let pattern = if s.date_naive() == e.date_naive() {
                "%-I:%M %p"
            } else {
                "%b %-d, %-I:%M %p"
            };
            let _ = writeln!(out, "🕐 **{} - {}**", s.format(pattern), e.format(pattern));
        }
        (Some(Bound::DateTime(s)), _) => {
            let _ = writeln!(out, "🕐 **{}**", s.format("%-I:%M %p"));
        }
        (None, _) => {}
    }

    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "📍 **Location:** {location}");
    }

    if !event.attendees.is_empty() {
        let names: Vec<String> = event
            .attendees
            .iter()
            .map(|a| {
                let name = a.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&a.email);
                format!("{name}{}", rsvp_marker(a.response_status.as_deref()))
            })
            .collect();
        let _ = writeln!(out, "👥 **Attendees:** {}", names.join(", "));
    }

    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        let preview: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        let ellipsis = if description.chars().count() > DESCRIPTION_PREVIEW_CHARS { "..." } else { "" };
        let _ = writeln!(out, "📝 **Description:** {preview}{ellipsis}");
    }

    let video = event
        .conference_data
        .iter()
        .flat_map(|c| c.entry_points.iter())
        .find(|p| p.entry_point_type == "video");
    if let Some(entry) = video {
        let _ = writeln!(out, "🔗 **Meeting Link:** {}", entry.uri);
    }

    if let Some(kind) = event.private_property("eventType") {
        let icon = match kind {
            "focusTime" => "🧠",
            "workingLocation" => "📍",
            _ => "📋",
        };
        let _ = writeln!(out, "{icon} **Event Type:** {kind}");
    }
    if let Some(place) = event.private_property("workingLocationType") {
        match event.private_property("workingLocationLabel") {
            Some(label) => {
                let _ = writeln!(out, "🏢 **Working Location:** {label} ({place})");
            }
            None => {
                let _ = writeln!(out, "🏢 **Working Location Type:** {place}");
            }
        }
    }

    let focus = event.focus_time_properties.as_ref();
    let focus_field = |api: Option<&String>, key: &str| {
        api.map(String::as_str)
            .filter(|v| !v.is_empty())
            .or_else(|| event.private_property(key))
            .map(str::to_string)
    };
    if let Some(mode) = focus_field(focus.and_then(|f| f.auto_decline_mode.as_ref()), "focusTimeAutoDeclineMode") {
        let _ = writeln!(out, "🛡️ **Auto-decline Mode:** {mode}");
    }
    if let Some(status) = focus_field(focus.and_then(|f| f.chat_status.as_ref()), "focusTimeChatStatus") {
        let _ = writeln!(out, "{} **Chat Status:** {status}", chat_icon(&status));
    }
    if let Some(message) = focus_field(focus.and_then(|f| f.decline_message.as_ref()), "focusTimeDeclineMessage") {
        let _ = writeln!(out, "📝 **Decline Message:** {message}");
    }

    if let Some(color) = event.color_id.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(out, "🎨 **Color ID:** {color}");
    }
    let _ = writeln!(out, "🆔 **Event ID:** {}", event.id.as_deref().unwrap_or_default());
    let icon = if has_overlap { "⚠️" } else { "✅" };
    let _ = writeln!(out, "{icon} **Has Overlap:** {has_overlap}");
    out.push('\n');
}
