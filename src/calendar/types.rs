//! Wire-level representation of events in the external calendar API.
//!
//! Field names follow the API's camelCase JSON. Read paths are lenient
//! (free-form strings for enumerations the upstream may extend); write paths
//! go through [`crate::calendar::mutation`], which only emits known values.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::patch::Patch;

pub const RESPONSE_DECLINED: &str = "declined";
pub const RESPONSE_NEEDS_ACTION: &str = "needsAction";

/// A full event as read from, or inserted into, the calendar API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guests_can_modify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guests_can_invite_others: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guests_can_see_other_guests: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_time_properties: Option<FocusTimeProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_location_properties: Option<WorkingLocationProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

impl Event {
    /// Title for messages; untitled events get a placeholder.
    pub fn display_title(&self) -> &str {
        match self.summary.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => "(No Title)",
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(
            self.start.as_ref().and_then(EventDateTime::bound),
            Some(Bound::Date(_))
        )
    }

    /// Start and end as instants, for timed events only.
    pub fn timed_interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.start.as_ref()?.bound()?;
        let end = self.end.as_ref()?.bound()?;
        match (start, end) {
            (Bound::DateTime(s), Bound::DateTime(e)) => {
                Some((s.with_timezone(&Utc), e.with_timezone(&Utc)))
            }
            _ => None,
        }
    }

    /// Private extended property lookup, empty values treated as missing.
    pub fn private_property(&self, key: &str) -> Option<&str> {
        self.extended_properties
            .as_ref()?
            .private
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// One endpoint of an event: either a calendar date (all-day) or an instant.
///
/// The API models this as two optional fields; construct through
/// [`EventDateTime::all_day`] or [`EventDateTime::timed`] so exactly one is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// The tagged view of an [`EventDateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl EventDateTime {
    pub fn all_day(date: NaiveDate, time_zone: Option<String>) -> Self {
        Self {
            date: Some(date),
            date_time: None,
            time_zone,
        }
    }

    pub fn timed(date_time: DateTime<FixedOffset>, time_zone: Option<String>) -> Self {
        Self {
            date: None,
            date_time: Some(date_time),
            time_zone,
        }
    }

    /// `None` when neither half is set. A date-time wins over a date.
    pub fn bound(&self) -> Option<Bound> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(Bound::DateTime(dt)),
            (None, Some(d)) => Some(Bound::Date(d)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

impl Attendee {
    pub fn has_declined(&self) -> bool {
        self.response_status.as_deref() == Some(RESPONSE_DECLINED)
    }
}

/// Reminder settings. `use_default` is always serialized: the API treats a
/// missing flag as `true`, which conflicts with any overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default)]
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_request: Option<CreateConferenceRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConferenceRequest {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_solution_key: Option<ConferenceSolutionKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub entry_point_type: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTimeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_decline_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decline_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingLocationProperties {
    #[serde(rename = "type")]
    pub kind: String,
    /// Present (as an empty object) for home office locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_office: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_location: Option<LocationLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_location: Option<LocationLabel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationLabel {
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub private: BTreeMap<String, String>,
}

/// An endpoint as written by a patch. Both halves are always serialized so a
/// switch between all-day and timed nulls out the half no longer in use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointWrite {
    pub date: Option<NaiveDate>,
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl From<EventDateTime> for EndpointWrite {
    fn from(value: EventDateTime) -> Self {
        Self {
            date: value.date,
            date_time: value.date_time,
            time_zone: value.time_zone,
        }
    }
}

/// Sparse event body for a PATCH call. Only fields that are not
/// [`Patch::Unset`] are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub summary: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub description: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub location: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub start: Patch<EndpointWrite>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub end: Patch<EndpointWrite>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub attendees: Patch<Vec<Attendee>>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub recurrence: Patch<Vec<String>>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub visibility: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub transparency: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub color_id: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub guests_can_modify: Patch<bool>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub guests_can_invite_others: Patch<bool>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub guests_can_see_other_guests: Patch<bool>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub reminders: Patch<Reminders>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub conference_data: Patch<ConferenceData>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub event_type: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub focus_time_properties: Patch<FocusTimeProperties>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub working_location_properties: Patch<WorkingLocationProperties>,
    #[serde(skip_serializing_if = "Patch::is_unset")]
    pub extended_properties: Patch<ExtendedProperties>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == EventPatch::default()
    }

    pub fn needs_conference_version(&self) -> bool {
        self.conference_data.is_present()
    }
}

/// Options shared by write calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub send_updates: bool,
    pub conference_data: bool,
}

/// Query for listing events in one calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub time_zone: String,
    pub max_results: usize,
    pub show_deleted: bool,
    pub order_by: String,
}

/// A single busy interval as returned by free/busy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyRequest {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub time_zone: String,
    pub items: Vec<FreeBusyItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeBusyItem {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: BTreeMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<TimePeriod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FreeBusyError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeBusyError {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Colors {
    #[serde(default)]
    pub calendar: BTreeMap<String, ColorDefinition>,
    #[serde(default)]
    pub event: BTreeMap<String, ColorDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorDefinition {
    pub background: String,
    pub foreground: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_round_trips_api_json() {
        let raw = json!({
            "id": "evt1",
            "summary": "Sync",
            "start": {"dateTime": "2026-03-02T10:00:00-08:00", "timeZone": "America/Los_Angeles"},
            "end": {"dateTime": "2026-03-02T11:00:00-08:00"},
            "attendees": [
                {"email": "me@example.com", "responseStatus": "declined", "self": true}
            ],
            "eventType": "outOfOffice",
            "someFieldWeDoNotModel": 42
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.id.as_deref(), Some("evt1"));
        assert_eq!(event.event_type.as_deref(), Some("outOfOffice"));
        assert_eq!(event.attendees[0].is_self, Some(true));
        assert!(event.attendees[0].has_declined());
        assert!(!event.is_all_day());

        let (start, end) = event.timed_interval().unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-02T18:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-02T19:00:00+00:00");
    }

    #[test]
    fn test_all_day_event_has_no_timed_interval() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let event = Event {
            start: Some(EventDateTime::all_day(date, None)),
            end: Some(EventDateTime::all_day(date.succ_opt().unwrap(), None)),
            ..Default::default()
        };
        assert!(event.is_all_day());
        assert!(event.timed_interval().is_none());
        assert_eq!(
            serde_json::to_value(event.start.unwrap()).unwrap(),
            json!({"date": "2026-03-02"})
        );
    }

    #[test]
    fn test_reminders_always_serialize_use_default() {
        let reminders = Reminders {
            use_default: false,
            overrides: vec![ReminderOverride {
                method: "popup".to_string(),
                minutes: 10,
            }],
        };
        assert_eq!(
            serde_json::to_value(&reminders).unwrap(),
            json!({"useDefault": false, "overrides": [{"method": "popup", "minutes": 10}]})
        );
    }

    #[test]
    fn test_empty_patch_serializes_to_empty_object() {
        let patch = EventPatch::default();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({}));
    }

    #[test]
    fn test_display_title_placeholder() {
        let mut event = Event::default();
        assert_eq!(event.display_title(), "(No Title)");
        event.summary = Some("Standup".to_string());
        assert_eq!(event.display_title(), "Standup");
    }
}
