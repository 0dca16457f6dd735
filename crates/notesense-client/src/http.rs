//! HTTP implementation of [`NoteTransport`] against the notes REST API.
//!
//! Every request carries the session's bearer token and a fresh
//! `x-request-id`. A 401 answer invalidates the [`Session`] before the error
//! is returned, so callers only have to propagate it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::field::Empty;
use tracing::{debug, instrument, warn, Span};
use uuid::Uuid;

use notesense_core::defaults;
use notesense_core::logging;
use notesense_core::{
    CreateNoteRequest, Error, KanbanNotes, KanbanUpdate, Note, NoteId, NotePatch, NoteTransport,
    Result, SearchRequest, Session,
};

use crate::config::ClientConfig;

// =============================================================================
// RESPONSE ENVELOPES
// =============================================================================

#[derive(Deserialize)]
struct NoteEnvelope {
    note: Note,
}

#[derive(Deserialize)]
struct NotesEnvelope {
    #[serde(deserialize_with = "nullable_list")]
    notes: Vec<Note>,
}

/// `null` decodes as an empty list; a missing key is still an error.
fn nullable_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Note>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Note>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// SHARED REQUEST PLUMBING
// =============================================================================

/// Build a reqwest client with the given timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

/// Bearer token of the session, or `Unauthorized` without touching the network.
pub(crate) fn require_bearer(session: &Session) -> Result<String> {
    session
        .bearer()
        .ok_or_else(|| Error::Unauthorized("no session credential".to_string()))
}

/// Attach auth and correlation headers, send, and map the status.
pub(crate) async fn send_authorized(
    session: &Session,
    builder: RequestBuilder,
) -> Result<Response> {
    let token = require_bearer(session)?;
    let request_id = Uuid::now_v7();
    let span = Span::current();
    span.record(logging::REQUEST_ID, tracing::field::display(request_id));

    let started = Instant::now();
    let response = builder
        .bearer_auth(token)
        .header(defaults::REQUEST_ID_HEADER, request_id.to_string())
        .send()
        .await?;
    span.record(logging::STATUS, response.status().as_u16());
    span.record(logging::DURATION_MS, started.elapsed().as_millis() as u64);

    check_status(session, response).await
}

/// Turn non-2xx answers into errors. 401 also invalidates `session`.
pub(crate) async fn check_status(session: &Session, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = body.trim().to_string();

    if status == StatusCode::UNAUTHORIZED {
        warn!(status = status.as_u16(), "Server rejected session credential");
        session.invalidate();
        let message = if message.is_empty() {
            "credential rejected".to_string()
        } else {
            message
        };
        return Err(Error::Unauthorized(message));
    }

    Err(Error::Transport {
        status: status.as_u16(),
        message: if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            message
        },
    })
}

/// Decode a JSON body, reporting shape mismatches as `InvalidResponse`.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::InvalidResponse(e.to_string()))
}

// =============================================================================
// NOTE CLIENT
// =============================================================================

/// Notes API client.
#[derive(Debug, Clone)]
pub struct HttpNoteClient {
    client: Client,
    base_url: Url,
    session: Session,
}

impl HttpNoteClient {
    /// Create a client for `config.api_url` bound to `session`.
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| Error::Config(format!("invalid api_url {}: {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "api_url cannot take a path: {}",
                config.api_url
            )));
        }
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{api_url}/notes/{segments...}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("notes").extend(segments);
        }
        url
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        send_authorized(&self.session, builder).await
    }

    async fn note(&self, builder: RequestBuilder) -> Result<Note> {
        let response = self.send(builder).await?;
        let envelope: NoteEnvelope = decode(response).await?;
        Ok(envelope.note)
    }

    async fn notes(&self, builder: RequestBuilder) -> Result<Vec<Note>> {
        let response = self.send(builder).await?;
        let envelope: NotesEnvelope = decode(response).await?;
        Span::current().record(logging::RESULT_COUNT, envelope.notes.len());
        Ok(envelope.notes)
    }
}

#[async_trait]
impl NoteTransport for HttpNoteClient {
    #[instrument(skip(self), fields(op = "list", request_id = Empty, status = Empty, duration_ms = Empty, result_count = Empty))]
    async fn list_notes(&self) -> Result<Vec<Note>> {
        self.notes(self.client.get(self.url(&[]))).await
    }

    #[instrument(skip(self), fields(op = "get", note_id = %id, request_id = Empty, status = Empty, duration_ms = Empty))]
    async fn get_note(&self, id: &NoteId) -> Result<Note> {
        self.note(self.client.get(self.url(&[id.as_str()]))).await
    }

    #[instrument(skip(self, req), fields(op = "create", request_id = Empty, status = Empty, duration_ms = Empty))]
    async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let note = self.note(self.client.post(self.url(&[])).json(&req)).await?;
        debug!(note_id = %note.id, "Note created");
        Ok(note)
    }

    #[instrument(skip(self, patch), fields(op = "update", note_id = %id, request_id = Empty, status = Empty, duration_ms = Empty))]
    async fn update_note(&self, id: &NoteId, patch: NotePatch) -> Result<Note> {
        let url = self.url(&[id.as_str()]);
        self.note(self.client.patch(url).json(&patch)).await
    }

    #[instrument(skip(self), fields(op = "delete", note_id = %id, request_id = Empty, status = Empty, duration_ms = Empty))]
    async fn delete_note(&self, id: &NoteId) -> Result<()> {
        self.send(self.client.delete(self.url(&[id.as_str()]))).await?;
        Ok(())
    }

    #[instrument(skip(self, req), fields(op = "search", query = %req.q, request_id = Empty, status = Empty, duration_ms = Empty, result_count = Empty))]
    async fn search_notes(&self, req: SearchRequest) -> Result<Vec<Note>> {
        self.notes(self.client.post(self.url(&["search"])).json(&req)).await
    }

    #[instrument(skip(self), fields(op = "kanban_list", request_id = Empty, status = Empty, duration_ms = Empty, result_count = Empty))]
    async fn list_kanban(&self) -> Result<KanbanNotes> {
        let response = self.send(self.client.get(self.url(&["kanban"]))).await?;
        let kanban: KanbanNotes = decode(response).await?;
        Span::current().record(logging::RESULT_COUNT, kanban.len());
        Ok(kanban)
    }

    #[instrument(skip(self, update), fields(op = "update_kanban", note_id = %id, request_id = Empty, status = Empty, duration_ms = Empty))]
    async fn update_kanban(&self, id: &NoteId, update: KanbanUpdate) -> Result<Note> {
        let url = self.url(&["kanban", "note", id.as_str()]);
        self.note(self.client.patch(url).json(&update)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_envelope_null_is_empty() {
        let envelope: NotesEnvelope = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert!(envelope.notes.is_empty());
    }

    #[test]
    fn test_notes_envelope_missing_key_fails() {
        assert!(serde_json::from_str::<NotesEnvelope>(r#"{"items": []}"#).is_err());
    }

    #[test]
    fn test_note_envelope_requires_note() {
        assert!(serde_json::from_str::<NoteEnvelope>(r#"{"id": "n1"}"#).is_err());
    }

    #[test]
    fn test_url_layout() {
        let config = ClientConfig::for_server("http://localhost:8080");
        let client = HttpNoteClient::new(&config, Session::in_memory()).unwrap();
        assert_eq!(client.url(&[]).as_str(), "http://localhost:8080/api/notes");
        assert_eq!(
            client.url(&["kanban", "note", "n1"]).as_str(),
            "http://localhost:8080/api/notes/kanban/note/n1"
        );
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_url_encodes_note_id() {
        let config = ClientConfig::for_server("http://localhost:8080/");
        let client = HttpNoteClient::new(&config, Session::in_memory()).unwrap();
        assert_eq!(
            client.url(&["a/b?c#d"]).as_str(),
            "http://localhost:8080/api/notes/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig {
            api_url: String::new(),
            ..ClientConfig::for_server("http://localhost:8080")
        };
        let err = HttpNoteClient::new(&config, Session::in_memory()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_signed_out_client_fails_locally() {
        // port 9 (discard) is never contacted: the bearer check fails first
        let config = ClientConfig::for_server("http://127.0.0.1:9");
        let client = HttpNoteClient::new(&config, Session::in_memory()).unwrap();
        let err = client.list_notes().await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
