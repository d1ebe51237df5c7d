//! Calendar operations behind the tools.
//!
//! Every upstream call runs under a per-call deadline. Requests are processed
//! one at a time, so a slow upstream call delays the next request; running
//! several clients against one service would need a concurrent front end.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::api::CalendarApi;
use super::mutation::{build_event, build_patch};
use super::overlap::{self, OverlapReport, intervals_overlap};
use super::request::{
    AttendeeSearch, DeleteEvent, EventUpdate, FreeBusyQuery, ListEvents, NewEvent, TimeFilter,
    parse_timezone, require_text,
};
use super::types::{
    Colors, Event, EventQuery, FreeBusyItem, FreeBusyRequest, TimePeriod, WriteOptions,
};
use super::window::{self, TimeWindow};
use crate::error::{CalendarError, CalendarResult};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Attendee search looks at events this far back and ahead.
const SEARCH_PAST_DAYS: i64 = 90;
const SEARCH_FUTURE_DAYS: i64 = 30;
const SEARCH_SCAN_LIMIT: usize = 1000;

pub fn is_valid_email(candidate: &str) -> bool {
    candidate.len() <= 254 && EMAIL_RE.is_match(candidate)
}

/// Whether the caller declined `event`.
///
/// The attendee flagged `self` wins; otherwise the attendee matching
/// `identity`. Without a known identity any declined attendee counts.
pub fn is_declined(event: &Event, identity: Option<&str>) -> bool {
    if let Some(me) = event.attendees.iter().find(|a| a.is_self == Some(true)) {
        return me.has_declined();
    }
    match identity {
        Some(identity) => event
            .attendees
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(identity) && a.has_declined()),
        None => event.attendees.iter().any(|a| a.has_declined()),
    }
}

/// Result of an edit. `changed` is false when the edit carried no fields and
/// nothing was written.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub event: Event,
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct EventListing {
    pub filter: TimeFilter,
    pub window: TimeWindow,
    pub events: Vec<Event>,
    pub overlaps: Option<OverlapReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FreeBusyReport {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub timezone: String,
    pub attendees: Vec<AttendeeAvailability>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendeeAvailability {
    pub email: String,
    pub available: bool,
    pub busy: Vec<TimePeriod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub struct CalendarService {
    api: Arc<dyn CalendarApi>,
    identity: OnceCell<String>,
    call_timeout: Duration,
}

impl CalendarService {
    pub fn new(api: Arc<dyn CalendarApi>, call_timeout: Duration) -> Self {
        Self {
            api,
            identity: OnceCell::new(),
            call_timeout,
        }
    }

    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = CalendarResult<T>>,
    ) -> CalendarResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_secs = self.call_timeout.as_secs(), "Calendar call timed out");
                Err(CalendarError::Timeout(self.call_timeout))
            }
        }
    }

    /// The caller's email address, fetched once and then reused.
    pub async fn identity(&self) -> CalendarResult<&str> {
        let id = self
            .identity
            .get_or_try_init(|| self.call("primary_calendar_id", self.api.primary_calendar_id()))
            .await?;
        Ok(id.as_str())
    }

    /// Identity for declined filtering; failures fall back to `None`.
    async fn identity_for_filtering(&self) -> Option<String> {
        match self.identity().await {
            Ok(id) => Some(id.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve caller identity; treating any declined attendee as declined");
                None
            }
        }
    }

    pub async fn create_event(&self, args: NewEvent) -> CalendarResult<Event> {
        let (event, options) = build_event(&args)?;
        let created = self
            .call("insert_event", self.api.insert_event(&args.calendar_id, &event, options))
            .await?;
        tracing::info!(
            calendar_id = %args.calendar_id,
            event_id = created.id.as_deref().unwrap_or_default(),
            "Created event"
        );
        Ok(created)
    }

    /// Patch an event. The current event is read first so the merged result
    /// can be validated; only the fields in `args` are sent back.
    pub async fn edit_event(&self, args: EventUpdate) -> CalendarResult<EditOutcome> {
        let event_id = require_text("event_id", &args.event_id)?.to_string();
        let calendar_id = args.calendar_id.clone();
        let options = WriteOptions {
            send_updates: args.send_notifications,
            conference_data: args.create_meet_link,
        };

        let existing = self
            .call("get_event", self.api.get_event(&calendar_id, &event_id))
            .await?;
        let patch = build_patch(args, &existing)?;
        if patch.is_empty() {
            tracing::info!(event_id = %event_id, "Edit carried no changes; nothing written");
            return Ok(EditOutcome {
                event: existing,
                changed: false,
            });
        }

        let options = WriteOptions {
            conference_data: options.conference_data || patch.needs_conference_version(),
            ..options
        };
        let event = self
            .call(
                "patch_event",
                self.api.patch_event(&calendar_id, &event_id, &patch, options),
            )
            .await?;
        tracing::info!(event_id = %event_id, "Patched event");
        Ok(EditOutcome {
            event,
            changed: true,
        })
    }

    /// Delete an event and return it as it was. A missing event is an error,
    /// and exactly one delete call is made.
    pub async fn delete_event(&self, args: DeleteEvent) -> CalendarResult<Event> {
        let event_id = require_text("event_id", &args.event_id)?;
        let existing = self
            .call("get_event", self.api.get_event(&args.calendar_id, event_id))
            .await?;
        self.call(
            "delete_event",
            self.api
                .delete_event(&args.calendar_id, event_id, args.send_notifications),
        )
        .await?;
        tracing::info!(event_id, "Deleted event");
        Ok(existing)
    }

    pub async fn list_events(&self, args: &ListEvents) -> CalendarResult<EventListing> {
        self.list_events_at(args, Utc::now()).await
    }

    pub(crate) async fn list_events_at(
        &self,
        args: &ListEvents,
        now: DateTime<Utc>,
    ) -> CalendarResult<EventListing> {
        let tz = parse_timezone(&args.timezone)?;
        if args.max_results < 1 {
            return Err(CalendarError::invalid("max_results must be at least 1"));
        }
        let window = window::resolve(
            args.time_filter,
            args.time_min.as_deref(),
            args.time_max.as_deref(),
            tz,
            now,
        )?;
        let query = EventQuery {
            time_min: window.start,
            time_max: window.end,
            time_zone: tz.name().to_string(),
            max_results: usize::try_from(args.max_results).unwrap_or(usize::MAX),
            show_deleted: args.show_deleted,
            order_by: args.order_by.as_str().to_string(),
        };
        let mut events = self
            .call("list_events", self.api.list_events(&args.calendar_id, &query))
            .await?;

        let needs_identity = !args.show_declined && events.iter().any(|e| !e.attendees.is_empty());
        let identity = if needs_identity {
            self.identity_for_filtering().await
        } else {
            None
        };
        if !args.show_declined {
            let before = events.len();
            events.retain(|e| !is_declined(e, identity.as_deref()));
            tracing::debug!(hidden = before - events.len(), "Filtered declined events");
        }

        let overlaps = args.detect_overlaps.then(|| {
            overlap::detect(&events, |e| {
                !args.show_declined && is_declined(e, identity.as_deref())
            })
        });

        Ok(EventListing {
            filter: args.time_filter,
            window,
            events,
            overlaps,
        })
    }

    pub async fn free_busy(&self, args: FreeBusyQuery) -> CalendarResult<FreeBusyReport> {
        if args.attendee_emails.is_empty() {
            return Err(CalendarError::invalid("attendee_emails must not be empty"));
        }
        let tz = parse_timezone(&args.timezone)?;
        let window = TimeWindow::parse(&args.time_min, &args.time_max)?;
        let request = FreeBusyRequest {
            time_min: window.start,
            time_max: window.end,
            time_zone: tz.name().to_string(),
            items: args
                .attendee_emails
                .iter()
                .map(|email| FreeBusyItem { id: email.clone() })
                .collect(),
        };
        let mut response = self.call("free_busy", self.api.free_busy(&request)).await?;

        let attendees = args
            .attendee_emails
            .iter()
            .map(|email| {
                let calendar = response.calendars.remove(email).unwrap_or_default();
                let busy: Vec<TimePeriod> = calendar
                    .busy
                    .into_iter()
                    .filter(|p| intervals_overlap(p.start, p.end, window.start, window.end))
                    .collect();
                AttendeeAvailability {
                    email: email.clone(),
                    available: busy.is_empty() && calendar.errors.is_empty(),
                    busy,
                    errors: calendar
                        .errors
                        .into_iter()
                        .map(|e| format!("{}: {}", e.domain, e.reason))
                        .collect(),
                }
            })
            .collect();

        Ok(FreeBusyReport {
            time_min: window.start,
            time_max: window.end,
            timezone: tz.name().to_string(),
            attendees,
        })
    }

    /// Suggest attendee addresses. A well-formed email query is returned as is;
    /// other matches come from attendees on the caller's recent and upcoming
    /// events.
    pub async fn search_attendees(&self, args: AttendeeSearch) -> CalendarResult<Vec<String>> {
        let query = require_text("query", &args.query)?.to_lowercase();
        if args.max_results < 1 {
            return Err(CalendarError::invalid("max_results must be at least 1"));
        }
        let limit = usize::try_from(args.max_results).unwrap_or(usize::MAX);
        let domain = args
            .domain
            .as_deref()
            .map(|d| d.trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty());
        let in_domain = |email: &str| match &domain {
            Some(domain) => email
                .to_lowercase()
                .rsplit_once('@')
                .is_some_and(|(_, host)| host == domain),
            None => true,
        };

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        if is_valid_email(&query) && in_domain(query.as_str()) {
            seen.insert(query.clone());
            results.push(query.clone());
        }

        let now = Utc::now();
        let scan = EventQuery {
            time_min: now - chrono::Duration::days(SEARCH_PAST_DAYS),
            time_max: now + chrono::Duration::days(SEARCH_FUTURE_DAYS),
            time_zone: "UTC".to_string(),
            max_results: SEARCH_SCAN_LIMIT,
            show_deleted: false,
            order_by: "startTime".to_string(),
        };
        let events = self
            .call("list_events", self.api.list_events("primary", &scan))
            .await?;

        for attendee in events.iter().flat_map(|e| e.attendees.iter()) {
            if results.len() >= limit {
                break;
            }
            let email = attendee.email.to_lowercase();
            let name_matches = attendee
                .display_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&query));
            if (email.contains(&query) || name_matches) && in_domain(email.as_str()) && seen.insert(email) {
                results.push(attendee.email.clone());
            }
        }

        results.truncate(limit);
        Ok(results)
    }

    pub async fn colors(&self) -> CalendarResult<Colors> {
        self.call("colors", self.api.colors()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::memory::InMemoryCalendar;
    use crate::calendar::request::decode;
    use crate::calendar::types::Attendee;
    use serde_json::json;

    fn service() -> (Arc<InMemoryCalendar>, CalendarService) {
        let api = Arc::new(InMemoryCalendar::new());
        let service = CalendarService::new(api.clone(), Duration::from_secs(5));
        (api, service)
    }

    async fn create(service: &CalendarService, summary: &str, start: &str, end: &str) -> Event {
        let args = decode(json!({"summary": summary, "start_time": start, "end_time": end}))
            .unwrap();
        service.create_event(args).await.unwrap()
    }

    fn attendee(email: &str, status: &str, is_self: Option<bool>) -> Attendee {
        Attendee {
            email: email.into(),
            response_status: Some(status.into()),
            is_self,
            ..Default::default()
        }
    }

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_is_declined_precedence() {
        let mut event = Event::default();
        event.attendees = vec![
            attendee("other@example.com", "declined", None),
            attendee("me@example.com", "accepted", Some(true)),
        ];
        assert!(!is_declined(&event, None));

        event.attendees = vec![
            attendee("other@example.com", "accepted", None),
            attendee("Me@Example.com", "declined", None),
        ];
        assert!(is_declined(&event, Some("me@example.com")));

        event.attendees = vec![attendee("other@example.com", "declined", None)];
        assert!(!is_declined(&event, Some("me@example.com")));
        assert!(is_declined(&event, None));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("jane.doe+cal@example.co.uk"));
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@localhost"));
    }

    #[tokio::test]
    async fn test_create_rejects_before_calling_upstream() {
        let (api, service) = service();
        let args = decode(json!({
            "summary": "Backwards",
            "start_time": "2026-03-02T11:00:00Z",
            "end_time": "2026-03-02T10:00:00Z"
        }))
        .unwrap();
        assert!(service.create_event(args).await.is_err());
        assert_eq!(api.event_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_edit_writes_nothing() {
        let (api, service) = service();
        let created = create(&service, "Sync", "2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z").await;
        let args = decode(json!({"event_id": created.id})).unwrap();
        let outcome = service.edit_event(args).await.unwrap();
        assert!(!outcome.changed);
        assert_eq!(api.patch_calls(), 0);
    }

    #[tokio::test]
    async fn test_edit_missing_event_is_not_found() {
        let (_api, service) = service();
        let args = decode(json!({"event_id": "nope", "summary": "x"})).unwrap();
        let err = service.edit_event(args).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_delete_calls_upstream_once_and_reports_missing() {
        let (api, service) = service();
        let created = create(&service, "Sync", "2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z").await;
        let args = decode(json!({"event_id": created.id})).unwrap();
        let deleted = service.delete_event(args).await.unwrap();
        assert_eq!(deleted.summary.as_deref(), Some("Sync"));
        assert_eq!(api.delete_calls(), 1);

        let again = decode(json!({"event_id": created.id})).unwrap();
        let err = service.delete_event(again).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(api.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_list_hides_declined_and_flags_overlaps() {
        let (api, service) = service();
        let a = create(&service, "Sync", "2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z").await;
        let b = create(&service, "Review", "2026-03-02T10:30:00Z", "2026-03-02T11:30:00Z").await;
        let declined = create(&service, "Skip", "2026-03-02T10:00:00Z", "2026-03-02T12:00:00Z").await;
        api.set_attendees(
            declined.id.as_deref().unwrap(),
            vec![attendee("me@example.com", "declined", None)],
        );

        let args: ListEvents = decode(json!({
            "time_filter": "custom",
            "time_min": "2026-03-02T00:00:00Z",
            "time_max": "2026-03-03T00:00:00Z"
        }))
        .unwrap();
        let listing = service.list_events_at(&args, at("2026-03-02T08:00:00Z")).await.unwrap();
        assert_eq!(listing.events.len(), 2);
        let overlaps = listing.overlaps.unwrap();
        let (a, b) = (a.id.unwrap(), b.id.unwrap());
        assert!(overlaps.has_overlap(&a));
        assert_eq!(overlaps.overlapping_ids(&a), vec![b.clone()]);
        assert_eq!(overlaps.overlapping_ids(&b), vec![a.clone()]);
    }

    #[tokio::test]
    async fn test_list_show_declined_counts_declined_overlaps() {
        let (api, service) = service();
        let a = create(&service, "Sync", "2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z").await;
        let declined = create(&service, "Skip", "2026-03-02T10:30:00Z", "2026-03-02T12:00:00Z").await;
        api.set_attendees(
            declined.id.as_deref().unwrap(),
            vec![attendee("me@example.com", "declined", Some(true))],
        );

        let args: ListEvents = decode(json!({
            "time_filter": "today",
            "show_declined": true
        }))
        .unwrap();
        let listing = service.list_events_at(&args, at("2026-03-02T08:00:00Z")).await.unwrap();
        assert_eq!(listing.events.len(), 2);
        assert!(listing.overlaps.unwrap().has_overlap(a.id.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_identity_is_fetched_once() {
        let (api, service) = service();
        assert_eq!(service.identity().await.unwrap(), "me@example.com");
        assert_eq!(service.identity().await.unwrap(), "me@example.com");
        assert_eq!(api.identity_calls(), 1);
    }

    #[tokio::test]
    async fn test_free_busy_touching_boundary_is_free() {
        let (api, service) = service();
        api.set_busy(
            "jane@example.com",
            vec![TimePeriod {
                start: at("2026-03-02T13:00:00Z"),
                end: at("2026-03-02T14:00:00Z"),
            }],
        );
        api.set_busy(
            "joe@example.com",
            vec![TimePeriod {
                start: at("2026-03-02T13:30:00Z"),
                end: at("2026-03-02T14:30:00Z"),
            }],
        );
        let args = decode(json!({
            "attendee_emails": ["jane@example.com", "joe@example.com"],
            "time_min": "2026-03-02T14:00:00Z",
            "time_max": "2026-03-02T15:00:00Z"
        }))
        .unwrap();
        let report = service.free_busy(args).await.unwrap();
        assert!(report.attendees[0].available);
        assert!(report.attendees[0].busy.is_empty());
        assert!(!report.attendees[1].available);
        assert_eq!(report.attendees[1].busy.len(), 1);
    }

    #[tokio::test]
    async fn test_search_attendees() {
        let (api, service) = service();
        let now = Utc::now();
        let start = (now + chrono::Duration::days(1)).to_rfc3339();
        let end = (now + chrono::Duration::days(1) + chrono::Duration::hours(1)).to_rfc3339();
        let event = create(&service, "Planning", &start, &end).await;
        api.set_attendees(
            event.id.as_deref().unwrap(),
            vec![
                Attendee {
                    email: "alice@corp.com".into(),
                    display_name: Some("Alice Smith".into()),
                    ..Default::default()
                },
                attendee("alex@other.org", "accepted", None),
            ],
        );

        let found = service
            .search_attendees(decode(json!({"query": "smith"})).unwrap())
            .await
            .unwrap();
        assert_eq!(found, vec!["alice@corp.com".to_string()]);

        let in_domain = service
            .search_attendees(decode(json!({"query": "al", "domain": "corp.com"})).unwrap())
            .await
            .unwrap();
        assert_eq!(in_domain, vec!["alice@corp.com".to_string()]);

        let direct = service
            .search_attendees(decode(json!({"query": "new@person.io", "max_results": 1})).unwrap())
            .await
            .unwrap();
        assert_eq!(direct, vec!["new@person.io".to_string()]);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let api = Arc::new(InMemoryCalendar::new().with_delay(Duration::from_millis(200)));
        let service = CalendarService::new(api, Duration::from_millis(20));
        let err = service.colors().await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }
}
