//! Event mutation engine.
//!
//! [`build_event`] turns `create_event` arguments into a full event body.
//! [`build_patch`] turns `edit_event` arguments into a sparse [`EventPatch`]
//! that carries only the fields the caller mentioned, checked against the
//! event as it currently exists upstream.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Days, FixedOffset, NaiveDate};

use super::patch::Patch;
use super::request::{
    AttendeeArg, AutoDeclineMode, ChatStatus, EventKind, EventUpdate, FocusTimeArg, NewEvent,
    RemindersArg, Visibility, WorkingLocationArg, WorkingLocationKind, parse_instant,
    parse_timezone, require_text,
};
use super::types::{
    Attendee, Bound, ConferenceData, ConferenceSolutionKey, CreateConferenceRequest, Event,
    EventDateTime, EventPatch, ExtendedProperties, FocusTimeProperties, LocationLabel,
    RESPONSE_NEEDS_ACTION, ReminderOverride, Reminders, WorkingLocationProperties, WriteOptions,
};
use crate::error::{CalendarError, CalendarResult};

pub const DEFAULT_DECLINE_MESSAGE: &str =
    "I'm currently in focus time and unable to attend meetings. Please reach out if this is urgent.";
const TRANSPARENT: &str = "transparent";
const MEET_SOLUTION: &str = "hangoutsMeet";

// Private extended property keys mirroring the event kind.
const PROP_EVENT_TYPE: &str = "eventType";
const PROP_WL_TYPE: &str = "workingLocationType";
const PROP_WL_LABEL: &str = "workingLocationLabel";
const PROP_FT_DECLINE_MODE: &str = "focusTimeAutoDeclineMode";
const PROP_FT_CHAT_STATUS: &str = "focusTimeChatStatus";
const PROP_FT_MESSAGE: &str = "focusTimeDeclineMessage";
const KIND_PROPS: [&str; 6] = [
    PROP_EVENT_TYPE,
    PROP_WL_TYPE,
    PROP_WL_LABEL,
    PROP_FT_DECLINE_MODE,
    PROP_FT_CHAT_STATUS,
    PROP_FT_MESSAGE,
];

/// Build a complete event for insertion. All validation happens here, before
/// anything is sent upstream.
pub fn build_event(args: &NewEvent) -> CalendarResult<(Event, WriteOptions)> {
    let summary = require_text("summary", &args.summary)?;
    let tz = parse_timezone(&args.timezone)?.name().to_string();
    let start = parse_instant("start_time", &args.start_time)?;
    let end = parse_instant("end_time", &args.end_time)?;
    let (start, end) = endpoints(start, end, args.all_day, Some(tz))?;

    let kind = args.event_type.unwrap_or(EventKind::Default);
    check_kind_blocks(kind, args.working_location.is_some(), args.focus_time.is_some())?;

    let mut event = Event {
        summary: Some(summary.to_string()),
        description: args.description.clone(),
        location: args.location.clone(),
        start: Some(start),
        end: Some(end),
        attendees: to_attendees(&args.attendees)?,
        recurrence: args.recurrence.clone(),
        visibility: Some(args.visibility.unwrap_or(Visibility::Default).as_str().to_string()),
        color_id: args.color_id.clone().filter(|c| !c.is_empty()),
        guests_can_modify: Some(args.guest_can_modify),
        guests_can_invite_others: Some(args.guest_can_invite_others),
        guests_can_see_other_guests: Some(args.guest_can_see_other_guests),
        reminders: args.reminders.as_ref().map(to_reminders).transpose()?,
        event_type: args.event_type.map(|k| k.as_str().to_string()),
        ..Default::default()
    };

    let mut private = BTreeMap::new();
    match kind {
        EventKind::WorkingLocation => {
            let props = working_location_properties(args.working_location.as_ref());
            event.visibility = Some(Visibility::Public.as_str().to_string());
            event.transparency = Some(TRANSPARENT.to_string());
            mirror_working_location(&mut private, &props);
            event.working_location_properties = Some(props);
        }
        EventKind::FocusTime => {
            let props = focus_time_properties(args.focus_time.as_ref());
            mirror_focus_time(&mut private, &props);
            event.focus_time_properties = Some(props);
        }
        EventKind::Default => {}
    }
    if let Some(kind) = args.event_type {
        private.insert(PROP_EVENT_TYPE.to_string(), kind.as_str().to_string());
    }
    if !private.is_empty() {
        event.extended_properties = Some(ExtendedProperties { private });
    }

    if args.create_meet_link {
        event.conference_data = Some(meet_request());
    }

    let options = WriteOptions {
        send_updates: args.send_notifications,
        conference_data: args.create_meet_link,
    };
    Ok((event, options))
}

/// Build the sparse update for `edit_event`. `existing` is the event as it is
/// upstream right now; it is only read to validate the merged result.
pub fn build_patch(update: EventUpdate, existing: &Event) -> CalendarResult<EventPatch> {
    let mut patch = EventPatch {
        summary: update.summary,
        description: update.description,
        location: update.location,
        recurrence: update.recurrence.clear_to_default(),
        visibility: update.visibility.map(|v| v.as_str().to_string()),
        color_id: update.color_id,
        guests_can_modify: not_null(update.guest_can_modify, "guest_can_modify")?,
        guests_can_invite_others: not_null(update.guest_can_invite_others, "guest_can_invite_others")?,
        guests_can_see_other_guests: not_null(
            update.guest_can_see_other_guests,
            "guest_can_see_other_guests",
        )?,
        ..Default::default()
    };

    patch.attendees = match update.attendees.clear_to_default() {
        Patch::Set(list) => Patch::Set(to_attendees(&list)?),
        other => other.map(|_| Vec::new()),
    };

    patch.reminders = match update.reminders {
        Patch::Set(arg) => Patch::Set(to_reminders(&arg)?),
        Patch::Clear => Patch::Set(Reminders {
            use_default: true,
            overrides: Vec::new(),
        }),
        Patch::Unset => Patch::Unset,
    };

    if update.create_meet_link {
        patch.conference_data = Patch::Set(meet_request());
    }

    let times = TimeChange {
        start_time: update.start_time.into_required("start_time")?,
        end_time: update.end_time.into_required("end_time")?,
        timezone: update.timezone.into_required("timezone")?,
        all_day: update.all_day.into_required("all_day")?,
    };
    if let Some((start, end)) = times.resolve(existing)? {
        patch.start = Patch::Set(start.into());
        patch.end = Patch::Set(end.into());
    }

    apply_kind_change(
        &mut patch,
        existing,
        update.event_type.into_required("eventType")?,
        update.working_location,
        update.focus_time,
    )?;

    Ok(patch)
}

fn not_null<T>(value: Patch<T>, field: &str) -> CalendarResult<Patch<T>> {
    match value {
        Patch::Clear => Err(CalendarError::invalid(format!("{field} cannot be null"))),
        other => Ok(other),
    }
}

/// Turn two instants into a pair of endpoints in the requested mode.
///
/// All-day events use the calendar dates of the instants with an exclusive
/// end, so an end date that is not after the start becomes start + 1 day.
fn endpoints(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    all_day: bool,
    tz: Option<String>,
) -> CalendarResult<(EventDateTime, EventDateTime)> {
    if all_day {
        if end < start {
            return Err(CalendarError::invalid("start_time must not be after end_time"));
        }
        let start_date = start.date_naive();
        let end_date = exclusive_end(start_date, end.date_naive())?;
        Ok((
            EventDateTime::all_day(start_date, tz.clone()),
            EventDateTime::all_day(end_date, tz),
        ))
    } else {
        if start >= end {
            return Err(CalendarError::invalid("start_time must be before end_time"));
        }
        Ok((
            EventDateTime::timed(start, tz.clone()),
            EventDateTime::timed(end, tz),
        ))
    }
}

fn exclusive_end(start: NaiveDate, end: NaiveDate) -> CalendarResult<NaiveDate> {
    if end > start {
        return Ok(end);
    }
    start
        .checked_add_days(Days::new(1))
        .ok_or_else(|| CalendarError::invalid("start_time is out of range"))
}

/// The time-related fields of an edit, already stripped of `null`.
struct TimeChange {
    start_time: Option<String>,
    end_time: Option<String>,
    timezone: Option<String>,
    all_day: Option<bool>,
}

impl TimeChange {
    /// Merge with the existing endpoints. `None` when the edit does not touch
    /// time at all; otherwise both endpoints, re-validated.
    fn resolve(self, existing: &Event) -> CalendarResult<Option<(EventDateTime, EventDateTime)>> {
        let existing_all_day = existing.is_all_day();
        let all_day = self.all_day.unwrap_or(existing_all_day);
        let mode_changes = all_day != existing_all_day;
        let times_given = self.start_time.is_some() || self.end_time.is_some();

        if !times_given && self.timezone.is_none() && !mode_changes {
            return Ok(None);
        }
        if mode_changes && (self.start_time.is_none() || self.end_time.is_none()) {
            return Err(CalendarError::invalid(
                "changing all_day requires both start_time and end_time",
            ));
        }

        let tz = match &self.timezone {
            Some(raw) => Some(parse_timezone(raw)?.name().to_string()),
            None => existing.start.as_ref().and_then(|s| s.time_zone.clone()),
        };

        let current = |endpoint: &Option<EventDateTime>, field: &str| {
            endpoint
                .as_ref()
                .and_then(EventDateTime::bound)
                .ok_or_else(|| CalendarError::invalid(format!("existing event has no {field} time")))
        };
        let start = match &self.start_time {
            Some(raw) => to_bound(parse_instant("start_time", raw)?, all_day),
            None => current(&existing.start, "start")?,
        };
        let end = match &self.end_time {
            Some(raw) => to_bound(parse_instant("end_time", raw)?, all_day),
            None => current(&existing.end, "end")?,
        };

        let (start, end) = match (start, end) {
            (Bound::Date(s), Bound::Date(e)) => {
                let e = if self.start_time.is_some() && self.end_time.is_some() {
                    exclusive_end(s, e)?
                } else {
                    e
                };
                if s >= e {
                    return Err(CalendarError::invalid("event would end before it starts"));
                }
                (EventDateTime::all_day(s, tz.clone()), EventDateTime::all_day(e, tz))
            }
            (Bound::DateTime(s), Bound::DateTime(e)) => {
                if s >= e {
                    return Err(CalendarError::invalid("start_time must be before end_time"));
                }
                (EventDateTime::timed(s, tz.clone()), EventDateTime::timed(e, tz))
            }
            _ => {
                return Err(CalendarError::invalid(
                    "start and end must both be all-day or both be timed",
                ));
            }
        };
        Ok(Some((start, end)))
    }
}

fn to_bound(instant: DateTime<FixedOffset>, all_day: bool) -> Bound {
    if all_day {
        Bound::Date(instant.date_naive())
    } else {
        Bound::DateTime(instant)
    }
}

fn to_attendees(args: &[AttendeeArg]) -> CalendarResult<Vec<Attendee>> {
    let mut seen = HashSet::new();
    let mut attendees = Vec::with_capacity(args.len());
    for arg in args {
        let email = require_text("attendee email", arg.email())?;
        if !seen.insert(email.to_lowercase()) {
            return Err(CalendarError::invalid(format!("duplicate attendee: {email}")));
        }
        let mut attendee = Attendee {
            email: email.to_string(),
            ..Default::default()
        };
        if let AttendeeArg::Detailed {
            response_status,
            display_name,
            ..
        } = arg
        {
            attendee.response_status = Some(
                response_status
                    .map(|s| s.as_str())
                    .unwrap_or(RESPONSE_NEEDS_ACTION)
                    .to_string(),
            );
            attendee.display_name = display_name.clone();
        }
        attendees.push(attendee);
    }
    Ok(attendees)
}

/// Overrides always force `use_default` off; the upstream rejects both at once.
fn to_reminders(arg: &RemindersArg) -> CalendarResult<Reminders> {
    let mut overrides = Vec::with_capacity(arg.overrides.len());
    for o in &arg.overrides {
        if o.minutes < 0 {
            return Err(CalendarError::invalid("reminder minutes must not be negative"));
        }
        overrides.push(ReminderOverride {
            method: o.method.as_str().to_string(),
            minutes: o.minutes,
        });
    }
    Ok(Reminders {
        use_default: overrides.is_empty() && arg.use_default.unwrap_or(true),
        overrides,
    })
}

fn meet_request() -> ConferenceData {
    ConferenceData {
        create_request: Some(CreateConferenceRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            conference_solution_key: Some(ConferenceSolutionKey {
                kind: MEET_SOLUTION.to_string(),
            }),
        }),
        entry_points: Vec::new(),
    }
}

fn check_kind_blocks(kind: EventKind, working_location: bool, focus_time: bool) -> CalendarResult<()> {
    if working_location && kind != EventKind::WorkingLocation {
        return Err(CalendarError::invalid(
            "workingLocation is only valid with eventType 'workingLocation'",
        ));
    }
    if focus_time && kind != EventKind::FocusTime {
        return Err(CalendarError::invalid(
            "focusTimeProperties is only valid with eventType 'focusTime'",
        ));
    }
    Ok(())
}

/// Home office when the caller gave no location block.
fn working_location_properties(arg: Option<&WorkingLocationArg>) -> WorkingLocationProperties {
    let kind = arg.map(|a| a.kind).unwrap_or(WorkingLocationKind::HomeOffice);
    let label = || LocationLabel {
        label: arg.and_then(|a| a.label.clone()).unwrap_or_default(),
    };
    let mut props = WorkingLocationProperties {
        kind: kind.as_str().to_string(),
        ..Default::default()
    };
    match kind {
        WorkingLocationKind::HomeOffice => props.home_office = Some(serde_json::json!({})),
        WorkingLocationKind::OfficeLocation => props.office_location = Some(label()),
        WorkingLocationKind::CustomLocation => props.custom_location = Some(label()),
    }
    props
}

fn focus_time_properties(arg: Option<&FocusTimeArg>) -> FocusTimeProperties {
    let arg = arg.cloned().unwrap_or_default();
    let message = arg
        .decline_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DECLINE_MESSAGE.to_string());
    FocusTimeProperties {
        auto_decline_mode: Some(
            arg.auto_decline_mode
                .unwrap_or(AutoDeclineMode::DeclineOnlyNewConflictingInvitations)
                .as_str()
                .to_string(),
        ),
        chat_status: Some(
            arg.chat_status
                .unwrap_or(ChatStatus::DoNotDisturb)
                .as_str()
                .to_string(),
        ),
        decline_message: Some(message),
    }
}

fn mirror_working_location(private: &mut BTreeMap<String, String>, props: &WorkingLocationProperties) {
    let label = props
        .office_location
        .as_ref()
        .or(props.custom_location.as_ref())
        .map(|l| l.label.clone())
        .unwrap_or_default();
    private.insert(PROP_WL_TYPE.to_string(), props.kind.clone());
    private.insert(PROP_WL_LABEL.to_string(), label);
}

fn mirror_focus_time(private: &mut BTreeMap<String, String>, props: &FocusTimeProperties) {
    let mut put = |key: &str, value: &Option<String>| {
        private.insert(key.to_string(), value.clone().unwrap_or_default());
    };
    put(PROP_FT_DECLINE_MODE, &props.auto_decline_mode);
    put(PROP_FT_CHAT_STATUS, &props.chat_status);
    put(PROP_FT_MESSAGE, &props.decline_message);
}

/// Event kind handling for an edit.
///
/// A switch to working location forces public visibility and transparency,
/// replacing any visibility sent in the same edit. Kind-specific blocks are
/// only accepted when the resulting kind matches. The private mirror is
/// rewritten as a whole from the existing map; keys that no longer apply are
/// blanked so upstream merging cannot resurrect them.
fn apply_kind_change(
    patch: &mut EventPatch,
    existing: &Event,
    new_kind: Option<EventKind>,
    working_location: Patch<WorkingLocationArg>,
    focus_time: Patch<FocusTimeArg>,
) -> CalendarResult<()> {
    let current = EventKind::from_wire(existing.event_type.as_deref());
    let kind = new_kind.unwrap_or(current);
    check_kind_blocks(
        kind,
        working_location.as_set().is_some(),
        focus_time.as_set().is_some(),
    )?;

    let mut private = existing
        .extended_properties
        .as_ref()
        .map(|p| p.private.clone())
        .unwrap_or_default();
    let before = private.clone();

    if let Some(new_kind) = new_kind {
        patch.event_type = Patch::Set(new_kind.as_str().to_string());
        for key in KIND_PROPS {
            if private.contains_key(key) {
                private.insert(key.to_string(), String::new());
            }
        }
        private.insert(PROP_EVENT_TYPE.to_string(), new_kind.as_str().to_string());
    }

    match kind {
        EventKind::WorkingLocation => {
            let props = match working_location {
                Patch::Set(arg) => Some(working_location_properties(Some(&arg))),
                Patch::Clear => {
                    return Err(CalendarError::invalid(
                        "workingLocation cannot be null on a working location event",
                    ));
                }
                Patch::Unset if new_kind.is_some() => Some(
                    existing
                        .working_location_properties
                        .clone()
                        .unwrap_or_else(|| working_location_properties(None)),
                ),
                Patch::Unset => None,
            };
            if let Some(props) = props {
                mirror_working_location(&mut private, &props);
                patch.working_location_properties = Patch::Set(props);
            }
            if new_kind.is_some() || patch.visibility.is_present() {
                patch.visibility = Patch::Set(Visibility::Public.as_str().to_string());
                patch.transparency = Patch::Set(TRANSPARENT.to_string());
            }
        }
        EventKind::FocusTime => {
            let props = match focus_time {
                Patch::Set(arg) => Some(focus_time_properties(Some(&arg))),
                Patch::Clear => Some(focus_time_properties(None)),
                Patch::Unset if new_kind.is_some() => Some(
                    existing
                        .focus_time_properties
                        .clone()
                        .unwrap_or_else(|| focus_time_properties(None)),
                ),
                Patch::Unset => None,
            };
            if let Some(props) = props {
                mirror_focus_time(&mut private, &props);
                patch.focus_time_properties = Patch::Set(props);
            }
        }
        EventKind::Default => {
            if working_location == Patch::Clear {
                patch.working_location_properties = Patch::Clear;
                for key in [PROP_WL_TYPE, PROP_WL_LABEL] {
                    if private.contains_key(key) {
                        private.insert(key.to_string(), String::new());
                    }
                }
            }
            if focus_time == Patch::Clear {
                patch.focus_time_properties = Patch::Clear;
                for key in [PROP_FT_DECLINE_MODE, PROP_FT_CHAT_STATUS, PROP_FT_MESSAGE] {
                    if private.contains_key(key) {
                        private.insert(key.to_string(), String::new());
                    }
                }
            }
        }
    }

    if private != before {
        patch.extended_properties = Patch::Set(ExtendedProperties { private });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::request::decode;
    use serde_json::{Value, json};

    fn new_event(extra: Value) -> NewEvent {
        let mut args = json!({
            "summary": "Sync",
            "start_time": "2026-03-02T10:00:00Z",
            "end_time": "2026-03-02T11:00:00Z"
        });
        if let (Some(base), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        decode(args).unwrap()
    }

    fn update(args: Value) -> EventUpdate {
        let mut args = args;
        args["event_id"] = json!("evt1");
        decode(args).unwrap()
    }

    fn existing() -> Event {
        let (event, _) = build_event(&new_event(json!({
            "location": "Room 1",
            "attendees": ["a@example.com", "b@example.com"],
            "recurrence": ["RRULE:FREQ=WEEKLY"],
            "timezone": "America/New_York"
        })))
        .unwrap();
        Event {
            id: Some("evt1".into()),
            ..event
        }
    }

    fn instant_of(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn instant(endpoint: &Value) -> DateTime<FixedOffset> {
        instant_of(endpoint["dateTime"].as_str().unwrap())
    }

    fn patch_json(args: Value) -> Value {
        serde_json::to_value(build_patch(update(args), &existing()).unwrap()).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let (event, options) = build_event(&new_event(json!({}))).unwrap();
        assert_eq!(event.visibility.as_deref(), Some("default"));
        assert_eq!(event.guests_can_modify, Some(false));
        assert_eq!(event.guests_can_invite_others, Some(true));
        assert_eq!(event.guests_can_see_other_guests, Some(true));
        assert!(event.attendees.is_empty());
        assert!(event.event_type.is_none());
        assert_eq!(event.start.unwrap().time_zone.as_deref(), Some("UTC"));
        assert!(options.send_updates);
        assert!(!options.conference_data);
    }

    #[test]
    fn test_create_rejects_inverted_or_empty_interval() {
        let inverted = new_event(json!({"end_time": "2026-03-02T09:00:00Z"}));
        assert!(build_event(&inverted).is_err());
        let empty = new_event(json!({"end_time": "2026-03-02T10:00:00Z"}));
        let err = build_event(&empty).unwrap_err();
        assert!(err.to_string().contains("start_time must be before end_time"));
    }

    #[test]
    fn test_create_rejects_bad_timezone_and_blank_summary() {
        assert!(build_event(&new_event(json!({"timezone": "Nowhere/Else"}))).is_err());
        assert!(build_event(&new_event(json!({"summary": " "}))).is_err());
    }

    #[test]
    fn test_create_all_day_uses_exclusive_end() {
        let (event, _) = build_event(&new_event(json!({
            "all_day": true,
            "start_time": "2026-03-02T00:00:00Z",
            "end_time": "2026-03-02T00:00:00Z"
        })))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&event.end).unwrap(),
            json!({"date": "2026-03-03", "timeZone": "UTC"})
        );
    }

    #[test]
    fn test_create_rejects_duplicate_attendees() {
        let args = new_event(json!({"attendees": ["a@example.com", "A@Example.com"]}));
        let err = build_event(&args).unwrap_err();
        assert!(err.to_string().contains("duplicate attendee"));
    }

    #[test]
    fn test_reminder_overrides_force_use_default_false() {
        let (event, _) = build_event(&new_event(json!({
            "reminders": {"use_default": true, "overrides": [{"method": "popup", "minutes": 10.0}]}
        })))
        .unwrap();
        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(
            body["reminders"],
            json!({"useDefault": false, "overrides": [{"method": "popup", "minutes": 10}]})
        );
    }

    #[test]
    fn test_working_location_forces_public_and_transparent() {
        let (event, _) = build_event(&new_event(json!({
            "visibility": "private",
            "eventType": "workingLocation",
            "workingLocation": {"type": "officeLocation", "label": "HQ"}
        })))
        .unwrap();
        assert_eq!(event.visibility.as_deref(), Some("public"));
        assert_eq!(event.transparency.as_deref(), Some("transparent"));
        let props = event.working_location_properties.as_ref().unwrap();
        assert_eq!(props.office_location.as_ref().unwrap().label, "HQ");
        assert_eq!(event.private_property("workingLocationLabel"), Some("HQ"));
        assert_eq!(event.private_property("eventType"), Some("workingLocation"));
    }

    #[test]
    fn test_home_office_marker_is_empty_object() {
        let (event, _) = build_event(&new_event(json!({"eventType": "workingLocation"}))).unwrap();
        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(
            body["workingLocationProperties"],
            json!({"type": "homeOffice", "homeOffice": {}})
        );
    }

    #[test]
    fn test_focus_time_defaults() {
        let (event, _) = build_event(&new_event(json!({
            "eventType": "focusTime",
            "focusTimeProperties": {"chatStatus": "available", "declineMessage": ""}
        })))
        .unwrap();
        let props = event.focus_time_properties.unwrap();
        assert_eq!(props.chat_status.as_deref(), Some("available"));
        assert_eq!(
            props.auto_decline_mode.as_deref(),
            Some("declineOnlyNewConflictingInvitations")
        );
        assert_eq!(props.decline_message.as_deref(), Some(DEFAULT_DECLINE_MESSAGE));
    }

    #[test]
    fn test_kind_block_without_matching_kind_rejected() {
        let args = new_event(json!({"workingLocation": {"type": "homeOffice"}}));
        assert!(build_event(&args).is_err());
    }

    #[test]
    fn test_meet_link_sets_conference_request() {
        let (event, options) = build_event(&new_event(json!({"create_meet_link": true}))).unwrap();
        let request = event.conference_data.unwrap().create_request.unwrap();
        assert!(!request.request_id.is_empty());
        assert_eq!(request.conference_solution_key.unwrap().kind, "hangoutsMeet");
        assert!(options.conference_data);
    }

    #[test]
    fn test_patch_summary_only_touches_summary() {
        assert_eq!(patch_json(json!({"summary": "Renamed"})), json!({"summary": "Renamed"}));
    }

    #[test]
    fn test_patch_empty_summary_is_a_value() {
        assert_eq!(patch_json(json!({"summary": ""})), json!({"summary": ""}));
    }

    #[test]
    fn test_clearing_focus_block_on_default_event_blanks_mirrored_props() {
        let mut event = existing();
        event.extended_properties = Some(ExtendedProperties {
            private: BTreeMap::from([
                (PROP_FT_CHAT_STATUS.to_string(), "doNotDisturb".to_string()),
                (PROP_FT_MESSAGE.to_string(), "Heads down".to_string()),
            ]),
        });
        let patch = build_patch(update(json!({"focusTimeProperties": null})), &event).unwrap();
        let json = serde_json::to_value(patch).unwrap();
        assert_eq!(json["focusTimeProperties"], Value::Null);
        assert_eq!(
            json["extendedProperties"]["private"],
            json!({"focusTimeChatStatus": "", "focusTimeDeclineMessage": ""})
        );
    }

    #[test]
    fn test_patch_null_clears_optional_text() {
        assert_eq!(patch_json(json!({"location": null})), json!({"location": null}));
    }

    #[test]
    fn test_patch_empty_attendees_clears_and_missing_keeps() {
        assert_eq!(patch_json(json!({"attendees": []})), json!({"attendees": []}));
        assert_eq!(patch_json(json!({"attendees": null})), json!({"attendees": []}));
        assert!(build_patch(update(json!({})), &existing()).unwrap().is_empty());
    }

    #[test]
    fn test_patch_rsvp_update() {
        let body = patch_json(json!({
            "attendees": [{"email": "a@example.com", "response_status": "accepted"}]
        }));
        assert_eq!(
            body,
            json!({"attendees": [{"email": "a@example.com", "responseStatus": "accepted"}]})
        );
    }

    #[test]
    fn test_patch_reminders_keep_use_default_false() {
        let body = patch_json(json!({"reminders": {"overrides": [{"method": "email", "minutes": 30}]}}));
        assert_eq!(
            body,
            json!({"reminders": {"useDefault": false, "overrides": [{"method": "email", "minutes": 30}]}})
        );
    }

    #[test]
    fn test_patch_null_on_required_shape_rejected() {
        for field in ["start_time", "all_day", "guest_can_modify", "eventType"] {
            let mut args = json!({});
            args[field] = Value::Null;
            assert!(build_patch(update(args), &existing()).is_err(), "{field}");
        }
    }

    #[test]
    fn test_patch_end_only_revalidates_against_existing_start() {
        let err = build_patch(update(json!({"end_time": "2026-03-02T09:00:00Z"})), &existing())
            .unwrap_err();
        assert!(err.to_string().contains("start_time must be before end_time"));

        let body = patch_json(json!({"end_time": "2026-03-02T12:00:00Z"}));
        assert_eq!(instant(&body["start"]), instant_of("2026-03-02T10:00:00Z"));
        assert_eq!(instant(&body["end"]), instant_of("2026-03-02T12:00:00Z"));
        assert_eq!(body["end"]["timeZone"], json!("America/New_York"));
    }

    #[test]
    fn test_patch_timezone_only_reemits_endpoints() {
        let body = patch_json(json!({"timezone": "Europe/Paris"}));
        assert_eq!(body["start"]["timeZone"], json!("Europe/Paris"));
        assert_eq!(body["end"]["timeZone"], json!("Europe/Paris"));
        assert_eq!(instant(&body["start"]), instant_of("2026-03-02T10:00:00Z"));
    }

    #[test]
    fn test_patch_switch_to_all_day_nulls_date_time() {
        assert!(build_patch(update(json!({"all_day": true})), &existing()).is_err());
        let body = patch_json(json!({
            "all_day": true,
            "start_time": "2026-03-05T00:00:00Z",
            "end_time": "2026-03-05T00:00:00Z"
        }));
        assert_eq!(
            body["start"],
            json!({"date": "2026-03-05", "dateTime": null, "timeZone": "America/New_York"})
        );
        assert_eq!(body["end"]["date"], json!("2026-03-06"));
    }

    #[test]
    fn test_patch_working_location_overrides_visibility_in_same_payload() {
        let body = patch_json(json!({"eventType": "workingLocation", "visibility": "private"}));
        assert_eq!(body["visibility"], json!("public"));
        assert_eq!(body["transparency"], json!("transparent"));
        assert_eq!(body["eventType"], json!("workingLocation"));
        assert_eq!(body["workingLocationProperties"]["type"], json!("homeOffice"));
        assert_eq!(
            body["extendedProperties"]["private"]["eventType"],
            json!("workingLocation")
        );
    }

    #[test]
    fn test_patch_visibility_on_existing_working_location_stays_public() {
        let (wl, _) = build_event(&new_event(json!({"eventType": "workingLocation"}))).unwrap();
        let patch = build_patch(update(json!({"visibility": "private"})), &wl).unwrap();
        assert_eq!(patch.visibility, Patch::Set("public".to_string()));
    }

    #[test]
    fn test_patch_focus_block_requires_focus_kind() {
        let err = build_patch(
            update(json!({"focusTimeProperties": {"chatStatus": "available"}})),
            &existing(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("focusTime"));
    }
}
