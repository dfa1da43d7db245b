use crate::domain::models::BusyInterval;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{parse_rfc3339_utc, GoogleCalendarEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const FREE_BUSY_ENDPOINT: &str = "https://www.googleapis.com/calendar/v3/freeBusy";

#[derive(Debug, Clone)]
pub struct ListEventsRequest {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub max_results: u32,
}

#[async_trait]
pub trait GoogleCalendarClient: Send + Sync {
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError>;

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<GoogleCalendarEvent, InfraError>;

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<GoogleCalendarEvent, InfraError>;

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError>;

    async fn query_free_busy(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        calendar_ids: &[String],
    ) -> Result<Vec<BusyInterval>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
    api_key: String,
}

impl ReqwestGoogleCalendarClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            InfraError::Provider(format!("failed building calendar http client: {error}"))
        })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Provider(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn api_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("google calendar api error: http {}", status.as_u16())
        } else {
            format!("google calendar api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Provider(message)
    }

    fn events_endpoint(calendar_id: &str) -> Result<Url, InfraError> {
        let mut url = Url::parse(CALENDAR_API_BASE)
            .map_err(|error| InfraError::Provider(format!("invalid calendar api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Provider("calendar api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("calendars");
            segments.push(calendar_id);
            segments.push("events");
        }
        Ok(url)
    }

    fn event_endpoint(calendar_id: &str, event_id: &str) -> Result<Url, InfraError> {
        let mut url = Self::events_endpoint(calendar_id)?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Provider("calendar events URL cannot be a base".to_string())
            })?;
            segments.push(event_id);
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .bearer_auth(access_token)
            .query(&[("key", self.api_key.as_str())])
    }

    async fn send_for_body(request: RequestBuilder, action: &str) -> Result<String, InfraError> {
        let response = request.send().await.map_err(|error| {
            InfraError::Provider(format!("network error while {action}: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Provider(format!("failed reading response while {action}: {error}"))
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(InfraError::NotSignedIn);
        }
        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }
        Ok(body)
    }
}

#[derive(Debug, serde::Deserialize)]
struct EventsPageResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
}

#[derive(Debug, serde::Serialize)]
struct FreeBusyRequest<'a> {
    #[serde(rename = "timeMin")]
    time_min: String,
    #[serde(rename = "timeMax")]
    time_max: String,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, serde::Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyPeriod>,
}

#[derive(Debug, serde::Deserialize)]
struct FreeBusyPeriod {
    start: String,
    end: String,
}

#[async_trait]
impl GoogleCalendarClient for ReqwestGoogleCalendarClient {
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = Self::events_endpoint(calendar_id)?;
        let req = self
            .authorized(self.client.get(endpoint), access_token)
            .query(&[
                ("timeMin", request.time_min.to_rfc3339()),
                ("timeMax", request.time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("showDeleted", "false".to_string()),
                ("maxResults", request.max_results.to_string()),
            ]);

        let body = Self::send_for_body(req, "listing calendar events").await?;
        let parsed: EventsPageResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::Provider(format!("invalid events list payload: {error}; body={body}"))
        })?;
        Ok(parsed.items.unwrap_or_default())
    }

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<GoogleCalendarEvent, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = Self::events_endpoint(calendar_id)?;
        let req = self
            .authorized(self.client.post(endpoint), access_token)
            .json(event);
        let body = Self::send_for_body(req, "creating event").await?;

        let parsed: GoogleCalendarEvent = serde_json::from_str(&body).map_err(|error| {
            InfraError::Provider(format!("invalid event create payload: {error}; body={body}"))
        })?;
        if parsed.id.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(InfraError::Provider(
                "event create response did not include id".to_string(),
            ));
        }
        Ok(parsed)
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<GoogleCalendarEvent, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;
        Self::ensure_non_empty(event_id, "event id")?;

        let endpoint = Self::event_endpoint(calendar_id, event_id)?;
        let req = self
            .authorized(self.client.put(endpoint), access_token)
            .json(event);
        let body = Self::send_for_body(req, "updating event").await?;

        serde_json::from_str(&body).map_err(|error| {
            InfraError::Provider(format!("invalid event update payload: {error}; body={body}"))
        })
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;
        Self::ensure_non_empty(event_id, "event id")?;

        let endpoint = Self::event_endpoint(calendar_id, event_id)?;
        let req = self.authorized(self.client.delete(endpoint), access_token);
        Self::send_for_body(req, "deleting event").await?;
        Ok(())
    }

    async fn query_free_busy(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        calendar_ids: &[String],
    ) -> Result<Vec<BusyInterval>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        if calendar_ids.is_empty() {
            return Ok(Vec::new());
        }

        let payload = FreeBusyRequest {
            time_min: time_min.to_rfc3339(),
            time_max: time_max.to_rfc3339(),
            items: calendar_ids
                .iter()
                .map(|id| FreeBusyItem { id: id.as_str() })
                .collect(),
        };
        let req = self
            .authorized(self.client.post(FREE_BUSY_ENDPOINT), access_token)
            .json(&payload);
        let body = Self::send_for_body(req, "querying free/busy").await?;

        let parsed: FreeBusyResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::Provider(format!("invalid free/busy payload: {error}; body={body}"))
        })?;
        busy_intervals(parsed, calendar_ids)
    }
}

fn busy_intervals(
    response: FreeBusyResponse,
    calendar_ids: &[String],
) -> Result<Vec<BusyInterval>, InfraError> {
    let mut intervals = Vec::new();
    for calendar_id in calendar_ids {
        let Some(calendar) = response.calendars.get(calendar_id) else {
            continue;
        };
        for period in &calendar.busy {
            intervals.push(BusyInterval {
                start: parse_rfc3339_utc(&period.start, "busy.start")?,
                end: parse_rfc3339_utc(&period.end, "busy.end")?,
            });
        }
    }
    Ok(intervals)
}
