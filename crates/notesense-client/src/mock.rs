//! In-memory note transport for deterministic testing.
//!
//! Behaves like a tiny notes server: it assigns ids, applies patches,
//! answers searches and groups notes for the kanban endpoint. Every call is
//! logged, and failures can be injected per operation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notesense_client::mock::{MockFailure, MockNoteTransport};
//! use notesense_core::{Note, NoteTransport};
//!
//! # async fn demo() {
//! let transport = MockNoteTransport::new().with_notes(vec![Note::new("n1", "Groceries")]);
//! transport.fail_next("update", MockFailure::Transport(500));
//!
//! let notes = transport.list_notes().await.unwrap();
//! assert_eq!(notes.len(), 1);
//! assert_eq!(transport.call_count("list"), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use notesense_core::defaults;
use notesense_core::{
    CreateNoteRequest, Error, KanbanNotes, KanbanUpdate, Note, NoteId, NotePatch, NoteStatus,
    NoteTransport, Result, SearchRequest, Session,
};

/// Failure to inject into an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Non-2xx answer with the given status.
    Transport(u16),
    /// 401; also invalidates the attached session.
    Unauthorized,
    /// The request never reached the server.
    Network,
    /// 200 with a body that does not match the schema.
    Malformed,
}

/// A logged transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: &'static str,
    pub note_id: Option<NoteId>,
    pub patch: Option<NotePatch>,
}

#[derive(Default)]
struct MockState {
    notes: Vec<Note>,
    failures: HashMap<&'static str, MockFailure>,
    one_shot: HashMap<&'static str, MockFailure>,
}

/// Mock transport for testing.
#[derive(Clone)]
pub struct MockNoteTransport {
    state: Arc<Mutex<MockState>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    next_id: Arc<AtomicU64>,
    latency_ms: u64,
    session: Option<Session>,
}

impl Default for MockNoteTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNoteTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            call_log: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            latency_ms: 0,
            session: None,
        }
    }

    /// Seed the server-side note set.
    pub fn with_notes(self, notes: Vec<Note>) -> Self {
        self.state().notes = notes;
        self
    }

    /// Simulated latency for every call (honours paused tokio time).
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Require `session` to be authenticated, like the HTTP client does.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Fail every call to `operation` until [`clear_failures`](Self::clear_failures).
    pub fn fail_operation(&self, operation: &'static str, failure: MockFailure) {
        self.state().failures.insert(operation, failure);
    }

    /// Fail only the next call to `operation`.
    pub fn fail_next(&self, operation: &'static str, failure: MockFailure) {
        self.state().one_shot.insert(operation, failure);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failures.clear();
        state.one_shot.clear();
    }

    /// Server-side copy of a note.
    pub fn note(&self, id: &NoteId) -> Option<Note> {
        self.state().notes.iter().find(|n| &n.id == id).cloned()
    }

    /// Server-side note set.
    pub fn notes(&self) -> Vec<Note> {
        self.state().notes.clone()
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    /// Number of calls to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.log().iter().filter(|c| c.operation == operation).count()
    }

    /// Total number of calls.
    pub fn total_calls(&self) -> usize {
        self.log().len()
    }

    pub fn clear_calls(&self) {
        self.log().clear()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log the call, then apply auth, latency and injected failures.
    async fn begin(
        &self,
        operation: &'static str,
        note_id: Option<&NoteId>,
        patch: Option<&NotePatch>,
    ) -> Result<()> {
        if let Some(session) = &self.session {
            if !session.is_authenticated() {
                return Err(Error::Unauthorized("no session credential".to_string()));
            }
        }

        self.log().push(MockCall {
            operation,
            note_id: note_id.cloned(),
            patch: patch.cloned(),
        });

        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }

        let failure = {
            let mut state = self.state();
            state
                .one_shot
                .remove(operation)
                .or_else(|| state.failures.get(operation).copied())
        };
        match failure {
            None => Ok(()),
            Some(MockFailure::Transport(status)) => Err(Error::Transport {
                status,
                message: format!("mock {operation} failure"),
            }),
            Some(MockFailure::Unauthorized) => {
                if let Some(session) = &self.session {
                    session.invalidate();
                }
                Err(Error::Unauthorized("credential rejected".to_string()))
            }
            Some(MockFailure::Network) => {
                Err(Error::Request(format!("mock {operation}: connection refused")))
            }
            Some(MockFailure::Malformed) => Err(Error::InvalidResponse(format!(
                "mock {operation}: missing field"
            ))),
        }
    }

    fn not_found(id: &NoteId) -> Error {
        Error::Transport {
            status: 404,
            message: format!("note {id} not found"),
        }
    }

    fn with_note<T>(&self, id: &NoteId, f: impl FnOnce(&mut Note) -> T) -> Result<T> {
        let mut state = self.state();
        let note = state
            .notes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        Ok(f(note))
    }
}

fn matches_search(note: &Note, req: &SearchRequest) -> bool {
    let q = req.q.trim().to_lowercase();
    let text_ok = q.is_empty()
        || note.title.to_lowercase().contains(&q)
        || note.content.to_lowercase().contains(&q);
    let category_ok =
        req.categories.is_empty() || req.categories.iter().any(|c| note.has_category(c));
    text_ok && category_ok
}

#[async_trait]
impl NoteTransport for MockNoteTransport {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        self.begin("list", None, None).await?;
        Ok(self.notes())
    }

    async fn get_note(&self, id: &NoteId) -> Result<Note> {
        self.begin("get", Some(id), None).await?;
        self.note(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        self.begin("create", None, None).await?;
        let id = format!("note-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut note = Note::new(id, req.title)
            .with_content(req.content)
            .with_categories(req.categories);
        note.emoji = req.emoji;
        note.user_id = self.session.as_ref().and_then(|s| s.user()).map(|u| u.id);
        self.state().notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: &NoteId, patch: NotePatch) -> Result<Note> {
        self.begin("update", Some(id), Some(&patch)).await?;
        self.with_note(id, |note| {
            patch.apply_to(note);
            note.updated_at = Utc::now();
            note.clone()
        })
    }

    async fn delete_note(&self, id: &NoteId) -> Result<()> {
        self.begin("delete", Some(id), None).await?;
        let mut state = self.state();
        let before = state.notes.len();
        state.notes.retain(|n| &n.id != id);
        if state.notes.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn search_notes(&self, req: SearchRequest) -> Result<Vec<Note>> {
        self.begin("search", None, None).await?;
        Ok(self
            .state()
            .notes
            .iter()
            .filter(|n| matches_search(n, &req))
            .cloned()
            .collect())
    }

    async fn list_kanban(&self) -> Result<KanbanNotes> {
        self.begin("kanban_list", None, None).await?;
        let mut kanban = KanbanNotes::default();
        for note in self.state().notes.iter().cloned() {
            match note.status {
                NoteStatus::Backlog => kanban.backlog.push(note),
                NoteStatus::Todo => kanban.todo.push(note),
                NoteStatus::InProgress => kanban.in_progress.push(note),
                NoteStatus::Done => kanban.done.push(note),
            }
        }
        Ok(kanban)
    }

    async fn update_kanban(&self, id: &NoteId, update: KanbanUpdate) -> Result<Note> {
        self.begin("update_kanban", Some(id), None).await?;
        if let Some(priority) = update.priority {
            if priority > defaults::MAX_PRIORITY {
                return Err(Error::Transport {
                    status: 400,
                    message: format!("invalid priority {priority}"),
                });
            }
        }
        self.with_note(id, |note| {
            if let Some(status) = update.status {
                note.status = status;
            }
            if let Some(priority) = update.priority {
                note.priority = priority;
            }
            note.updated_at = Utc::now();
            note.clone()
        })
    }
}
