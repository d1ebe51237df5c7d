//! Typed tool arguments.
//!
//! Every tool decodes its untyped argument object into one of these structs
//! right at the call boundary. Defaults live here as serde defaults; integer
//! fields accept whatever numeric shape a JSON client produced (see
//! [`coerce_int`]).

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::patch::Patch;
use crate::error::{CalendarError, CalendarResult};

pub const PRIMARY_CALENDAR: &str = "primary";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LIST_MAX_RESULTS: i64 = 250;
pub const DEFAULT_SEARCH_MAX_RESULTS: i64 = 10;

/// Declares a closed set of wire strings as an enum with `as_str` and the
/// list of accepted values (used by the tool schemas).
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }
    };
}

wire_enum!(Visibility {
    Default => "default",
    Public => "public",
    Private => "private",
    Confidential => "confidential",
});

wire_enum!(EventKind {
    Default => "default",
    FocusTime => "focusTime",
    WorkingLocation => "workingLocation",
});

wire_enum!(WorkingLocationKind {
    HomeOffice => "homeOffice",
    OfficeLocation => "officeLocation",
    CustomLocation => "customLocation",
});

wire_enum!(AutoDeclineMode {
    DeclineNone => "declineNone",
    DeclineAllConflictingInvitations => "declineAllConflictingInvitations",
    DeclineOnlyNewConflictingInvitations => "declineOnlyNewConflictingInvitations",
});

wire_enum!(ChatStatus {
    Available => "available",
    DoNotDisturb => "doNotDisturb",
});

wire_enum!(ReminderMethod {
    Email => "email",
    Popup => "popup",
});

wire_enum!(ResponseStatus {
    Accepted => "accepted",
    Declined => "declined",
    Tentative => "tentative",
    NeedsAction => "needsAction",
});

wire_enum!(TimeFilter {
    Today => "today",
    ThisWeek => "this_week",
    NextWeek => "next_week",
    Custom => "custom",
});

wire_enum!(OrderBy {
    StartTime => "startTime",
    Updated => "updated",
});

wire_enum!(OutputFormat {
    Text => "text",
    Json => "json",
});

impl Default for TimeFilter {
    fn default() -> Self {
        TimeFilter::Today
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        OrderBy::StartTime
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

impl EventKind {
    /// Lenient read of an upstream `eventType`; unknown kinds count as default.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("focusTime") => EventKind::FocusTime,
            Some("workingLocation") => EventKind::WorkingLocation,
            _ => EventKind::Default,
        }
    }
}

/// An attendee as given by the caller: a bare email or a detailed object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttendeeArg {
    Email(String),
    Detailed {
        email: String,
        #[serde(default)]
        response_status: Option<ResponseStatus>,
        #[serde(default)]
        display_name: Option<String>,
    },
}

impl AttendeeArg {
    pub fn email(&self) -> &str {
        match self {
            AttendeeArg::Email(email) => email,
            AttendeeArg::Detailed { email, .. } => email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemindersArg {
    #[serde(default)]
    pub use_default: Option<bool>,
    #[serde(default)]
    pub overrides: Vec<ReminderOverrideArg>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReminderOverrideArg {
    pub method: ReminderMethod,
    #[serde(deserialize_with = "lenient_int")]
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkingLocationArg {
    #[serde(rename = "type")]
    pub kind: WorkingLocationKind,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTimeArg {
    #[serde(default, alias = "auto_decline_mode")]
    pub auto_decline_mode: Option<AutoDeclineMode>,
    #[serde(default, alias = "chat_status")]
    pub chat_status: Option<ChatStatus>,
    #[serde(default, alias = "decline_message")]
    pub decline_message: Option<String>,
}

/// Arguments of `create_event`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    #[serde(default = "primary_calendar")]
    pub calendar_id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub attendees: Vec<AttendeeArg>,
    #[serde(default)]
    pub recurrence: Vec<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default = "yes")]
    pub send_notifications: bool,
    #[serde(default)]
    pub guest_can_modify: bool,
    #[serde(default = "yes")]
    pub guest_can_invite_others: bool,
    #[serde(default = "yes")]
    pub guest_can_see_other_guests: bool,
    #[serde(default)]
    pub create_meet_link: bool,
    #[serde(default)]
    pub reminders: Option<RemindersArg>,
    #[serde(default, rename = "colorId", alias = "color_id")]
    pub color_id: Option<String>,
    #[serde(default, rename = "eventType", alias = "event_type")]
    pub event_type: Option<EventKind>,
    #[serde(default, rename = "workingLocation", alias = "working_location")]
    pub working_location: Option<WorkingLocationArg>,
    #[serde(default, rename = "focusTimeProperties", alias = "focus_time_properties")]
    pub focus_time: Option<FocusTimeArg>,
}

/// Arguments of `edit_event`. Every field other than the ids keeps the
/// absent / null / value distinction.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUpdate {
    #[serde(default = "primary_calendar")]
    pub calendar_id: String,
    pub event_id: String,
    #[serde(default)]
    pub summary: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub location: Patch<String>,
    #[serde(default)]
    pub start_time: Patch<String>,
    #[serde(default)]
    pub end_time: Patch<String>,
    #[serde(default)]
    pub timezone: Patch<String>,
    #[serde(default)]
    pub all_day: Patch<bool>,
    #[serde(default)]
    pub attendees: Patch<Vec<AttendeeArg>>,
    #[serde(default)]
    pub recurrence: Patch<Vec<String>>,
    #[serde(default)]
    pub visibility: Patch<Visibility>,
    #[serde(default = "yes")]
    pub send_notifications: bool,
    #[serde(default)]
    pub guest_can_modify: Patch<bool>,
    #[serde(default)]
    pub guest_can_invite_others: Patch<bool>,
    #[serde(default)]
    pub guest_can_see_other_guests: Patch<bool>,
    #[serde(default)]
    pub create_meet_link: bool,
    #[serde(default)]
    pub reminders: Patch<RemindersArg>,
    #[serde(default, rename = "colorId", alias = "color_id")]
    pub color_id: Patch<String>,
    #[serde(default, rename = "eventType", alias = "event_type")]
    pub event_type: Patch<EventKind>,
    #[serde(default, rename = "workingLocation", alias = "working_location")]
    pub working_location: Patch<WorkingLocationArg>,
    #[serde(default, rename = "focusTimeProperties", alias = "focus_time_properties")]
    pub focus_time: Patch<FocusTimeArg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteEvent {
    #[serde(default = "primary_calendar")]
    pub calendar_id: String,
    pub event_id: String,
    #[serde(default = "yes")]
    pub send_notifications: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListEvents {
    #[serde(default = "primary_calendar")]
    pub calendar_id: String,
    #[serde(default)]
    pub time_filter: TimeFilter,
    #[serde(default)]
    pub time_min: Option<String>,
    #[serde(default)]
    pub time_max: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_list_max_results", deserialize_with = "lenient_int")]
    pub max_results: i64,
    #[serde(default)]
    pub show_deleted: bool,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default)]
    pub show_declined: bool,
    #[serde(default = "yes")]
    pub detect_overlaps: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FreeBusyQuery {
    pub attendee_emails: Vec<String>,
    pub time_min: String,
    pub time_max: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendeeSearch {
    pub query: String,
    #[serde(default = "default_search_max_results", deserialize_with = "lenient_int")]
    pub max_results: i64,
    #[serde(default)]
    pub domain: Option<String>,
}

fn primary_calendar() -> String {
    PRIMARY_CALENDAR.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_list_max_results() -> i64 {
    DEFAULT_LIST_MAX_RESULTS
}

fn default_search_max_results() -> i64 {
    DEFAULT_SEARCH_MAX_RESULTS
}

fn yes() -> bool {
    true
}

/// Decode a tool's argument object. Shape problems become domain errors so
/// they reach the caller as a tool error result.
pub fn decode<T: DeserializeOwned>(arguments: Value) -> CalendarResult<T> {
    serde_json::from_value(arguments).map_err(|e| CalendarError::invalid(e.to_string()))
}

/// Integer view of a JSON value: integers, floats without a fractional part,
/// and decimal strings.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    coerce_int(&value).ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

pub fn parse_instant(field: &str, raw: &str) -> CalendarResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| CalendarError::invalid(format!("{field} must be an RFC3339 timestamp ({e}): '{raw}'")))
}

pub fn parse_timezone(raw: &str) -> CalendarResult<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| CalendarError::invalid(format!("unknown timezone '{raw}'")))
}

/// Reject a blank required string argument.
pub fn require_text<'a>(field: &str, value: &'a str) -> CalendarResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CalendarError::invalid(format!("{field} is required")));
    }
    Ok(trimmed)
}
