use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::store::RelevanceStore;
use crate::api::dto::{
    CreateNoteRequest, GeofenceRegistrationResponse, GeofenceReminderRequest, NoteResponse,
    RelevantNotesRequest, TimeReminderRequest, TimeReminderResponse,
};
use crate::api::response::ErrorBody;
use crate::config::ClientConfig;
use crate::error::{AnchorError, Result};

/// HTTP client for the relevance and reminder endpoints.
///
/// Only talks to the server. Results are handed back to the caller; the local
/// stores are driven by platform events, not by API responses.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnchorError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// `POST /api/notes`
    pub async fn create_note(&self, note: &CreateNoteRequest) -> Result<NoteResponse> {
        let request = self.client.post(self.url("api/notes")?).json(note);
        self.send_json(request).await
    }

    /// `GET /api/notes/{id}`
    pub async fn get_note(&self, note_id: i64) -> Result<NoteResponse> {
        let request = self.client.get(self.url(&format!("api/notes/{note_id}"))?);
        self.send_json(request).await
    }

    /// `POST /api/notes/relevant-notes`
    pub async fn relevant_notes(
        &self,
        now: DateTime<Utc>,
        inside_geofence_ids: Vec<String>,
    ) -> Result<Vec<NoteResponse>> {
        let body = RelevantNotesRequest {
            now_utc: now,
            inside_geofence_ids: Some(inside_geofence_ids),
        };
        let request = self.client.post(self.url("api/notes/relevant-notes")?).json(&body);
        self.send_json(request).await
    }

    /// Asks the server for relevant notes using the device's current
    /// active-geofence set.
    pub async fn relevant_notes_for(
        &self,
        active_geofences: &RelevanceStore,
        now: DateTime<Utc>,
    ) -> Result<Vec<NoteResponse>> {
        let inside: Vec<String> = active_geofences.get_all().into_iter().collect();
        debug!(inside = inside.len(), "Fetching relevant notes");
        self.relevant_notes(now, inside).await
    }

    /// `GET /api/geofences`
    pub async fn list_geofences(&self) -> Result<Vec<GeofenceRegistrationResponse>> {
        let request = self.client.get(self.url("api/geofences")?);
        self.send_json(request).await
    }

    /// `PUT /api/notes/{id}/reminder/time`
    pub async fn set_time_reminder(
        &self,
        note_id: i64,
        trigger_at: DateTime<Utc>,
    ) -> Result<TimeReminderResponse> {
        let body = TimeReminderRequest {
            trigger_at_utc: trigger_at,
        };
        let request = self
            .client
            .put(self.url(&format!("api/notes/{note_id}/reminder/time"))?)
            .json(&body);
        self.send_json(request).await
    }

    /// `PUT /api/notes/{id}/reminder/geofence`
    pub async fn set_geofence_reminder(
        &self,
        note_id: i64,
        geofence: &GeofenceReminderRequest,
    ) -> Result<NoteResponse> {
        let request = self
            .client
            .put(self.url(&format!("api/notes/{note_id}/reminder/geofence"))?)
            .json(geofence);
        self.send_json(request).await
    }

    /// `DELETE /api/notes/{id}/reminder`
    pub async fn clear_reminders(&self, note_id: i64) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("api/notes/{note_id}/reminder"))?);
        self.send(request).await.map(|_| ())
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    async fn send(&self, mut request: RequestBuilder) -> Result<reqwest::Response> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        Err(AnchorError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn note_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Buy milk",
            "text": "",
            "pinned": false,
            "createdAt": "2025-06-01T10:00:00Z",
            "lastEdited": "2025-06-01T11:00:00Z",
            "tags": [],
            "geofence": {
                "id": format!("note_{id}"),
                "latitude": 52.52,
                "longitude": 13.405,
                "radius": 150,
                "addressName": "Market"
            },
            "reminderTimeUtc": null,
            "image": null,
            "audio": null,
            "hasPhoto": false,
            "hasAudio": false
        })
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(
            &server.uri(),
            Some("tok-a".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_relevant_notes_sends_camel_case_body_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notes/relevant-notes"))
            .and(header("Authorization", "Bearer tok-a"))
            .and(body_json(json!({
                "nowUtc": "2025-06-01T12:00:00Z",
                "insideGeofenceIds": ["note_4"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([note_json(4)])))
            .expect(1)
            .mount(&server)
            .await;

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let notes = assert_ok!(
            client(&server)
                .relevant_notes(now, vec!["note_4".to_string()])
                .await
        );

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, 4);
        assert_eq!(notes[0].geofence.as_ref().unwrap().id, "note_4");
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/99/reminder"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "not_found", "message": "Note 99 not found" }
            })))
            .mount(&server)
            .await;

        let err = assert_err!(client(&server).clear_reminders(99).await);

        match err {
            AnchorError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Note 99 not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!AnchorError::Api {
            status: 404,
            message: String::new()
        }
        .is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/geofences"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = assert_err!(client(&server).list_geofences().await);

        assert!(err.is_retryable());
        assert!(matches!(err, AnchorError::Api { status: 503, ref message } if message == "unavailable"));
    }

    #[tokio::test]
    async fn test_set_time_reminder_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/notes/7/reminder/time"))
            .and(body_json(json!({ "triggerAtUtc": "2025-06-01T18:30:00Z" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "noteId": 7,
                "reminderTimeUtc": "2025-06-01T18:30:00Z"
            })))
            .mount(&server)
            .await;

        let at = Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap();
        let response = assert_ok!(client(&server).set_time_reminder(7, at).await);

        assert_eq!(response.note_id, 7);
        assert_eq!(response.reminder_time_utc, at);
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anchor/api/geofences"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "geofenceId": "note_1", "latitude": 1.0, "longitude": 2.0, "radiusMeters": 50 }
            ])))
            .mount(&server)
            .await;

        let api = ApiClient::new(
            &format!("{}/anchor", server.uri()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let geofences = assert_ok!(api.list_geofences().await);

        assert_eq!(geofences[0].geofence_id, "note_1");
        assert_eq!(geofences[0].radius_meters, 50);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::new("not a url", None, Duration::from_secs(1));
        assert!(matches!(result, Err(AnchorError::UrlParse(_))));
    }
}
