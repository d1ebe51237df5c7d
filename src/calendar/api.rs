use async_trait::async_trait;

use super::types::{
    Colors, Event, EventPatch, EventQuery, FreeBusyRequest, FreeBusyResponse, WriteOptions,
};
use crate::error::CalendarResult;

/// Typed access to the remote calendar service.
///
/// Implementations perform exactly one upstream request per call (listing may
/// page) and never retry. A missing event is reported as
/// [`crate::error::CalendarError::NotFound`].
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &Event,
        options: WriteOptions,
    ) -> CalendarResult<Event>;

    /// Send a sparse update; only the fields present in `patch` are written.
    async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &EventPatch,
        options: WriteOptions,
    ) -> CalendarResult<Event>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> CalendarResult<Event>;

    async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        send_updates: bool,
    ) -> CalendarResult<()>;

    /// Expanded (single-instance) events in the query window, at most
    /// `query.max_results` of them.
    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> CalendarResult<Vec<Event>>;

    async fn free_busy(&self, request: &FreeBusyRequest) -> CalendarResult<FreeBusyResponse>;

    /// Id of the caller's primary calendar, which is their email address.
    async fn primary_calendar_id(&self) -> CalendarResult<String>;

    async fn colors(&self) -> CalendarResult<Colors>;
}
