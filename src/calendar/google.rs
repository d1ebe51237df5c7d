//! REST implementation of [`CalendarApi`] for the Google Calendar v3 API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::api::CalendarApi;
use super::auth::Credentials;
use super::types::{
    Colors, Event, EventPatch, EventQuery, FreeBusyRequest, FreeBusyResponse, WriteOptions,
};
use crate::config::Config;
use crate::error::{CalendarError, CalendarResult};

/// Upper bound the API accepts for one page of events.
const MAX_PAGE_SIZE: usize = 2500;

const TRANSPORT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Event>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GoogleCalendar {
    client: Client,
    base: Url,
    credentials: Credentials,
}

impl GoogleCalendar {
    pub fn new(config: &Config, credentials: Credentials) -> anyhow::Result<Self> {
        let mut base = Url::parse(&config.api_base)
            .map_err(|e| anyhow::anyhow!("invalid GCAL_API_BASE '{}': {e}", config.api_base))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("GCAL_API_BASE '{}' cannot be used as a base URL", config.api_base);
        }
        // Drop a trailing slash so joined segments don't produce '//'.
        if let Ok(mut segments) = base.path_segments_mut() {
            segments.pop_if_empty();
        }
        let client = Client::builder()
            .timeout(transport_timeout(config.call_timeout))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> CalendarResult<RequestBuilder> {
        let token = self
            .credentials
            .access_token
            .as_deref()
            .ok_or_else(|| CalendarError::AuthRequired {
                message: "no access token available".to_string(),
                reauth_url: self.credentials.reauth_url.clone(),
            })?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> CalendarResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        tracing::debug!(status = status.as_u16(), %message, "Calendar API error response");

        Err(match status {
            StatusCode::UNAUTHORIZED => CalendarError::AuthRequired {
                message,
                reauth_url: self.credentials.reauth_url.clone(),
            },
            StatusCode::NOT_FOUND | StatusCode::GONE => CalendarError::NotFound(message),
            _ => CalendarError::Upstream {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> CalendarResult<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Socket-level limit. Kept above the service deadline so a slow call
/// surfaces as a timeout rather than a transport error.
fn transport_timeout(call_timeout: Duration) -> Duration {
    call_timeout + TRANSPORT_TIMEOUT_SLACK
}

fn write_query(options: WriteOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![(
        "sendUpdates",
        if options.send_updates { "all" } else { "none" }.to_string(),
    )];
    if options.conference_data {
        query.push(("conferenceDataVersion", "1".to_string()));
    }
    query
}

#[async_trait]
impl CalendarApi for GoogleCalendar {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &Event,
        options: WriteOptions,
    ) -> CalendarResult<Event> {
        let url = self.url(&["calendars", calendar_id, "events"]);
        let request = self
            .request(Method::POST, url)?
            .query(&write_query(options))
            .json(event);
        self.send_json(request).await
    }

    async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &EventPatch,
        options: WriteOptions,
    ) -> CalendarResult<Event> {
        let url = self.url(&["calendars", calendar_id, "events", event_id]);
        let request = self
            .request(Method::PATCH, url)?
            .query(&write_query(options))
            .json(patch);
        self.send_json(request).await
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> CalendarResult<Event> {
        let url = self.url(&["calendars", calendar_id, "events", event_id]);
        self.send_json(self.request(Method::GET, url)?).await
    }

    async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        send_updates: bool,
    ) -> CalendarResult<()> {
        let url = self.url(&["calendars", calendar_id, "events", event_id]);
        let options = WriteOptions {
            send_updates,
            conference_data: false,
        };
        let request = self.request(Method::DELETE, url)?.query(&write_query(options));
        self.send(request).await?;
        Ok(())
    }

    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> CalendarResult<Vec<Event>> {
        let url = self.url(&["calendars", calendar_id, "events"]);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = query.max_results.saturating_sub(events.len());
            if remaining == 0 {
                break;
            }
            let mut params = vec![
                ("timeMin", query.time_min.to_rfc3339()),
                ("timeMax", query.time_max.to_rfc3339()),
                ("timeZone", query.time_zone.clone()),
                ("singleEvents", "true".to_string()),
                ("showDeleted", query.show_deleted.to_string()),
                ("orderBy", query.order_by.clone()),
                ("maxResults", remaining.min(MAX_PAGE_SIZE).to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let request = self.request(Method::GET, url.clone())?.query(&params);
            let page: EventsPage = self.send_json(request).await?;
            tracing::debug!(count = page.items.len(), calendar_id, "Fetched event page");
            events.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        events.truncate(query.max_results);
        Ok(events)
    }

    async fn free_busy(&self, request: &FreeBusyRequest) -> CalendarResult<FreeBusyResponse> {
        let url = self.url(&["freeBusy"]);
        self.send_json(self.request(Method::POST, url)?.json(request)).await
    }

    async fn primary_calendar_id(&self) -> CalendarResult<String> {
        let url = self.url(&["calendars", "primary"]);
        let entry: CalendarEntry = self.send_json(self.request(Method::GET, url)?).await?;
        Ok(entry.id)
    }

    async fn colors(&self) -> CalendarResult<Colors> {
        let url = self.url(&["colors"]);
        self.send_json(self.request(Method::GET, url)?).await
    }
}
