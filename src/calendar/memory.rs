//! In-memory [`CalendarApi`] for tests.
//!
//! Patches are applied the way the REST API applies them to top-level keys:
//! a present key replaces the stored value and `null` removes it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::api::CalendarApi;
use super::types::{
    Attendee, ColorDefinition, Colors, Event, EventPatch, EventQuery, FreeBusyCalendar,
    FreeBusyError, FreeBusyRequest, FreeBusyResponse, TimePeriod, WriteOptions,
};
use crate::error::{CalendarError, CalendarResult};

pub const IDENTITY: &str = "me@example.com";

#[derive(Default)]
pub struct InMemoryCalendar {
    events: Mutex<BTreeMap<String, Event>>,
    busy: Mutex<HashMap<String, Vec<TimePeriod>>>,
    next_id: AtomicUsize,
    patch_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    identity_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call sleep first, for deadline tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn event(&self, id: &str) -> Option<Event> {
        self.events.lock().unwrap().get(id).cloned()
    }

    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub fn set_attendees(&self, id: &str, attendees: Vec<Attendee>) {
        if let Some(event) = self.events.lock().unwrap().get_mut(id) {
            event.attendees = attendees;
        }
    }

    pub fn set_busy(&self, email: &str, periods: Vec<TimePeriod>) {
        self.busy.lock().unwrap().insert(email.to_string(), periods);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn merge(event: &Event, patch: &EventPatch) -> Event {
    let mut stored = serde_json::to_value(event).unwrap();
    let changes = serde_json::to_value(patch).unwrap();
    if let (Some(stored), Some(changes)) = (stored.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            if value.is_null() {
                stored.remove(key);
            } else {
                stored.insert(key.clone(), value.clone());
            }
        }
    }
    serde_json::from_value::<Event>(strip_nulls(stored)).unwrap()
}

/// Nested nulls (e.g. the unused half of an endpoint) are dropped the way the
/// API drops them.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

fn in_window(event: &Event, query: &EventQuery) -> bool {
    if let Some((start, end)) = event.timed_interval() {
        return start < query.time_max && query.time_min < end;
    }
    let dates = event
        .start
        .as_ref()
        .and_then(|s| s.date)
        .zip(event.end.as_ref().and_then(|e| e.date));
    match dates {
        Some((start, end)) => {
            start < query.time_max.date_naive() && query.time_min.date_naive() < end
        }
        None => false,
    }
}

#[async_trait]
impl CalendarApi for InMemoryCalendar {
    async fn insert_event(
        &self,
        _calendar_id: &str,
        event: &Event,
        _options: WriteOptions,
    ) -> CalendarResult<Event> {
        self.pause().await;
        let id = format!("evt{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = Event {
            id: Some(id.clone()),
            status: Some("confirmed".to_string()),
            ..event.clone()
        };
        self.events.lock().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    async fn patch_event(
        &self,
        _calendar_id: &str,
        event_id: &str,
        patch: &EventPatch,
        _options: WriteOptions,
    ) -> CalendarResult<Event> {
        self.pause().await;
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        let mut events = self.events.lock().unwrap();
        let event = events
            .get_mut(event_id)
            .ok_or_else(|| CalendarError::NotFound(format!("event {event_id}")))?;
        *event = merge(event, patch);
        Ok(event.clone())
    }

    async fn get_event(&self, _calendar_id: &str, event_id: &str) -> CalendarResult<Event> {
        self.pause().await;
        self.event(event_id)
            .ok_or_else(|| CalendarError::NotFound(format!("event {event_id}")))
    }

    async fn delete_event(
        &self,
        _calendar_id: &str,
        event_id: &str,
        _send_updates: bool,
    ) -> CalendarResult<()> {
        self.pause().await;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .remove(event_id)
            .map(|_| ())
            .ok_or_else(|| CalendarError::NotFound(format!("event {event_id}")))
    }

    async fn list_events(&self, _calendar_id: &str, query: &EventQuery) -> CalendarResult<Vec<Event>> {
        self.pause().await;
        let mut events: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| in_window(e, query))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start.as_ref().and_then(|s| s.bound()));
        events.truncate(query.max_results);
        Ok(events)
    }

    async fn free_busy(&self, request: &FreeBusyRequest) -> CalendarResult<FreeBusyResponse> {
        self.pause().await;
        let busy = self.busy.lock().unwrap();
        let calendars = request
            .items
            .iter()
            .map(|item| {
                let calendar = match busy.get(&item.id) {
                    Some(periods) => FreeBusyCalendar {
                        busy: periods.clone(),
                        errors: Vec::new(),
                    },
                    None => FreeBusyCalendar {
                        busy: Vec::new(),
                        errors: vec![FreeBusyError {
                            domain: "global".to_string(),
                            reason: "notFound".to_string(),
                        }],
                    },
                };
                (item.id.clone(), calendar)
            })
            .collect();
        Ok(FreeBusyResponse { calendars })
    }

    async fn primary_calendar_id(&self) -> CalendarResult<String> {
        self.pause().await;
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IDENTITY.to_string())
    }

    async fn colors(&self) -> CalendarResult<Colors> {
        self.pause().await;
        let color = |background: &str| ColorDefinition {
            background: background.to_string(),
            foreground: "#1d1d1d".to_string(),
        };
        Ok(Colors {
            calendar: BTreeMap::from([("1".to_string(), color("#ac725e"))]),
            event: BTreeMap::from([
                ("1".to_string(), color("#a4bdfc")),
                ("2".to_string(), color("#7ae7bf")),
            ]),
        })
    }
}
