//! Google Calendar v3 client implementing the CalendarPort.
//!
//! Only the four event operations the engine needs. HTTP status codes are
//! classified into the domain's calendar failure kinds so the retry layer
//! and the reconciler can react without knowing about HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use sheetsync_core::payload::EventPayload;
use sheetsync_core::ports::{CalendarPort, DestinationEvent};
use sheetsync_domain::{CalendarFailure, Result, SheetSyncError};
use tracing::{debug, instrument};

use crate::auth::AccessTokenProvider;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar destination client.
pub struct GoogleCalendarClient {
    http: Client,
    base_url: String,
    calendar_id: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl GoogleCalendarClient {
    /// Create a client for the given destination calendar.
    pub fn new(calendar_id: impl Into<String>, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http: Client::new(),
            base_url: CALENDAR_API_BASE.to_string(),
            calendar_id: calendar_id.into(),
            tokens,
        }
    }

    /// Point the client at a different API base (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }

    async fn bearer(&self) -> Result<String> {
        self.tokens.access_token().await
    }
}

fn event_body(payload: &EventPayload) -> serde_json::Value {
    let mut body = json!({
        "summary": payload.summary,
        "start": {
            "dateTime": payload.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": payload.time_zone,
        },
        "end": {
            "dateTime": payload.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": payload.time_zone,
        },
    });
    if let Some(description) = &payload.description {
        body["description"] = json!(description);
    }
    if let Some(color_id) = &payload.color_id {
        body["colorId"] = json!(color_id);
    }
    if payload.focus_time {
        body["eventType"] = json!("focusTime");
    }
    body
}

fn transport_error(err: reqwest::Error) -> SheetSyncError {
    SheetSyncError::calendar(CalendarFailure::Network, format!("calendar request failed: {err}"))
}

/// Map a non-success response onto the failure taxonomy.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let kind = match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => CalendarFailure::RateLimited,
        StatusCode::NOT_FOUND | StatusCode::GONE => CalendarFailure::NotFound,
        _ => CalendarFailure::Api,
    };
    let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
    Err(SheetSyncError::calendar(kind, format!("calendar API error ({status}): {detail}")))
}

#[derive(Debug, Deserialize)]
struct EventResource {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait]
impl CalendarPort for GoogleCalendarClient {
    #[instrument(skip(self, payload), fields(summary = %payload.summary))]
    async fn create_event(&self, payload: &EventPayload) -> Result<String> {
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(self.bearer().await?)
            .json(&event_body(payload))
            .send()
            .await
            .map_err(transport_error)?;

        let created: EventResource = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                SheetSyncError::calendar(
                    CalendarFailure::Api,
                    format!("failed to parse insert response: {e}"),
                )
            })?;

        debug!(event_id = %created.id, "created calendar event");
        Ok(created.id)
    }

    #[instrument(skip(self, payload))]
    async fn update_event(
        &self,
        destination_event_id: &str,
        payload: &EventPayload,
    ) -> Result<()> {
        let response = self
            .http
            .put(self.event_url(destination_event_id))
            .bearer_auth(self.bearer().await?)
            .json(&event_body(payload))
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;
        debug!(event_id = destination_event_id, "updated calendar event");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, destination_event_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.event_url(destination_event_id))
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;
        debug!(event_id = destination_event_id, "deleted calendar event");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_event(&self, destination_event_id: &str) -> Result<DestinationEvent> {
        let response = self
            .http
            .get(self.event_url(destination_event_id))
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(transport_error)?;

        let event: EventResource = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                SheetSyncError::calendar(
                    CalendarFailure::Api,
                    format!("failed to parse event response: {e}"),
                )
            })?;

        Ok(DestinationEvent {
            id: event.id,
            status: event.status.unwrap_or_else(|| "confirmed".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::StaticTokenProvider;

    fn payload() -> EventPayload {
        let start = Utc.with_ymd_and_hms(2025, 8, 7, 10, 0, 0).unwrap();
        EventPayload {
            summary: "Planning".into(),
            description: Some("Agenda".into()),
            start,
            end: start + Duration::hours(1),
            time_zone: "Africa/Cairo".into(),
            color_id: Some("4".into()),
            focus_time: false,
        }
    }

    async fn client(server: &MockServer) -> GoogleCalendarClient {
        GoogleCalendarClient::new("primary", Arc::new(StaticTokenProvider::new("tok")))
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn create_event_posts_payload_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Planning",
                "colorId": "4",
                "start": {"dateTime": "2025-08-07T10:00:00Z", "timeZone": "Africa/Cairo"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt-123",
                "status": "confirmed",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).await.create_event(&payload()).await.unwrap();
        assert_eq!(id, "evt-123");
    }

    #[tokio::test]
    async fn rate_limit_responses_classify_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server).await.create_event(&payload()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn missing_event_classifies_as_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).await.get_event("gone").await.unwrap_err();
        assert!(err.is_missing_destination());
    }

    #[tokio::test]
    async fn get_event_defaults_missing_status_to_confirmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/evt-9"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "evt-9"})),
            )
            .mount(&server)
            .await;

        let event = client(&server).await.get_event("evt-9").await.unwrap();
        assert_eq!(event.id, "evt-9");
        assert!(!event.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_status_round_trips() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/evt-c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"id": "evt-c", "status": "cancelled"}),
            ))
            .mount(&server)
            .await;

        let event = client(&server).await.get_event("evt-c").await.unwrap();
        assert!(event.is_cancelled());
    }

    #[tokio::test]
    async fn delete_event_accepts_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-d"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.delete_event("evt-d").await.unwrap();
    }

    #[tokio::test]
    async fn focus_time_payload_sets_event_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"eventType": "focusTime"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "evt-f"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut p = payload();
        p.focus_time = true;
        client(&server).await.create_event(&p).await.unwrap();
    }
}
