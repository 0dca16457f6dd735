//! The notes workspace: one signed-in user's view of their notes.
//!
//! Wires the transport to the local store, the debounced mutation queue,
//! the search debouncer and the kanban board. Reads degrade to an empty
//! result on failure; writes propagate their errors, and deletes and kanban
//! moves roll their optimistic change back when the server refuses them.
//! Any `Unauthorized` error tears the workspace down.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use notesense_core::defaults;
use notesense_core::{
    CreateNoteRequest, Error, FieldEdit, FileUploader, KanbanUpdate, Note, NoteField, NoteId,
    NotePatch, NoteTransport, Result, SearchRequest, Session, SessionEvent,
};

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::filter::NoteFilter;
use crate::kanban::{BoardColumn, BoardPosition, KanbanBoard, MoveOutcome};
use crate::mutation::{MutationEvent, MutationQueue};
use crate::store::SharedNoteStore;

/// Workspace lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// A search (immediate or debounced) replaced the store contents.
    SearchCompleted { query: String, result_count: usize },
    /// Store, board and timers were cleared.
    TornDown,
}

struct Shared {
    store: SharedNoteStore,
    board: Mutex<KanbanBoard>,
    mutations: MutationQueue,
    searches: Debouncer<()>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl Shared {
    fn board(&self) -> MutexGuard<'_, KanbanBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn teardown(&self) {
        let edits = self.mutations.cancel_all();
        let searches = self.searches.cancel_all();
        self.store.write(|s| s.clear());
        self.board().clear();
        info!(
            dropped_edits = edits,
            dropped_searches = searches,
            "Workspace torn down"
        );
        let _ = self.events.send(WorkspaceEvent::TornDown);
    }

    /// Tear down on `Unauthorized`, then hand the error back.
    fn fail(&self, e: Error) -> Error {
        if e.is_unauthorized() {
            self.teardown();
        }
        e
    }

    /// Read failure policy: `Unauthorized` propagates, anything else is
    /// logged and becomes an empty collection.
    fn degrade_read(&self, op: &str, e: Error) -> Result<usize> {
        if e.is_unauthorized() {
            return Err(self.fail(e));
        }
        warn!(op, error = %e, "Read failed; showing no notes");
        self.store.write(|s| s.load(Vec::new()));
        Ok(0)
    }
}

/// Blank query and no categories lists everything; otherwise search.
async fn run_search(
    transport: &dyn NoteTransport,
    shared: &Shared,
    req: SearchRequest,
) -> Result<usize> {
    let query = req.q.clone();
    let (op, result) = if req.q.trim().is_empty() && req.categories.is_empty() {
        ("list", transport.list_notes().await)
    } else {
        ("search", transport.search_notes(req).await)
    };
    let count = match result {
        Ok(notes) => {
            let count = notes.len();
            shared.store.write(|s| s.load(notes));
            count
        }
        Err(e) => shared.degrade_read(op, e)?,
    };
    debug!(query = %query, result_count = count, "Search applied");
    let _ = shared.events.send(WorkspaceEvent::SearchCompleted {
        query,
        result_count: count,
    });
    Ok(count)
}

/// Note-taking session state for one user.
pub struct NotesWorkspace {
    transport: Arc<dyn NoteTransport>,
    uploader: Option<Arc<dyn FileUploader>>,
    shared: Arc<Shared>,
    config: SyncConfig,
    session_watch: Option<JoinHandle<()>>,
}

impl NotesWorkspace {
    pub fn new(transport: Arc<dyn NoteTransport>, config: SyncConfig) -> Self {
        let store = SharedNoteStore::new();
        let mutations = MutationQueue::new(Arc::clone(&transport), store.clone());
        let (events, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            uploader: None,
            shared: Arc::new(Shared {
                store,
                board: Mutex::new(KanbanBoard::new()),
                mutations,
                searches: Debouncer::new(),
                events,
            }),
            config,
            session_watch: None,
        }
    }

    /// Enable [`create_note_with_files`](Self::create_note_with_files).
    pub fn with_uploader(mut self, uploader: Arc<dyn FileUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Tear down when `session` signs out or a background flush is rejected
    /// with 401. Must be called inside a tokio runtime.
    pub fn bind_session(&mut self, session: &Session) {
        let mut session_rx = session.subscribe();
        let mut mutation_rx = self.shared.mutations.subscribe();
        let shared = Arc::downgrade(&self.shared);

        if let Some(previous) = self.session_watch.take() {
            previous.abort();
        }
        self.session_watch = Some(tokio::spawn(async move {
            loop {
                let expired = tokio::select! {
                    event = session_rx.recv() => match event {
                        Ok(SessionEvent::SignedOut { .. }) => true,
                        Ok(SessionEvent::SignedIn(_)) | Err(RecvError::Lagged(_)) => false,
                        Err(RecvError::Closed) => break,
                    },
                    event = mutation_rx.recv() => match event {
                        Ok(MutationEvent::Failed { unauthorized, .. }) => unauthorized,
                        Ok(MutationEvent::Flushed { .. }) | Err(RecvError::Lagged(_)) => false,
                        Err(RecvError::Closed) => break,
                    },
                };
                if expired {
                    match shared.upgrade() {
                        Some(shared) => shared.teardown(),
                        None => break,
                    }
                }
            }
        }));
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedNoteStore {
        &self.shared.store
    }

    /// All notes in display order.
    pub fn notes(&self) -> Vec<Note> {
        self.shared.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.shared.events.subscribe()
    }

    pub fn mutation_events(&self) -> broadcast::Receiver<MutationEvent> {
        self.shared.mutations.subscribe()
    }

    /// Field edits waiting for their debounce timer.
    pub fn pending_edits(&self) -> usize {
        self.shared.mutations.pending_count()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Reload every note from the server.
    #[instrument(skip(self), fields(op = "refresh"))]
    pub async fn refresh(&self) -> Result<usize> {
        match self.transport.list_notes().await {
            Ok(notes) => {
                let count = notes.len();
                self.shared.store.write(|s| s.load(notes));
                Ok(count)
            }
            Err(e) => self.shared.degrade_read("list", e),
        }
    }

    /// Search now. A blank query with no categories lists all notes.
    #[instrument(skip(self, categories), fields(op = "search"))]
    pub async fn search(&self, query: &str, categories: &[String]) -> Result<usize> {
        let req = SearchRequest::new(query).with_categories(categories.to_vec());
        run_search(self.transport.as_ref(), &self.shared, req).await
    }

    /// Search once typing pauses. Each call supersedes the previous one.
    pub fn schedule_search(&self, query: &str, categories: &[String]) {
        let req = SearchRequest::new(query).with_categories(categories.to_vec());
        let transport = Arc::clone(&self.transport);
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);

        self.shared
            .searches
            .schedule((), self.config.search_delay(), move || async move {
                if let Some(shared) = shared.upgrade() {
                    // failures are already logged by the read policy
                    let _ = run_search(transport.as_ref(), &shared, req).await;
                }
            });
    }

    /// Fetch one note and merge it into the store.
    #[instrument(skip(self), fields(op = "open", note_id = %id))]
    pub async fn open_note(&self, id: &NoteId) -> Result<Note> {
        let revision = self.shared.store.read(|s| s.revision(id));
        let note = self
            .transport
            .get_note(id)
            .await
            .map_err(|e| self.shared.fail(e))?;
        self.shared.store.write(|s| {
            if s.contains(id) {
                s.reconcile(note.clone(), revision);
            } else {
                s.upsert(note.clone());
            }
        });
        Ok(note)
    }

    /// Notes passing `filter`, in store order.
    pub fn visible_notes(&self, filter: &NoteFilter) -> Vec<Note> {
        self.shared
            .store
            .read(|s| filter.apply(s.notes()).into_iter().cloned().collect())
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Create a note and put it at the top of the list.
    #[instrument(skip(self, req), fields(op = "create"))]
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let note = self
            .transport
            .create_note(req)
            .await
            .map_err(|e| self.shared.fail(e))?;
        self.shared.store.write(|s| s.insert_at(0, note.clone()));
        info!(note_id = %note.id, "Note created");
        Ok(note)
    }

    /// Upload `paths`, then create the note with their file ids attached.
    #[instrument(skip(self, req, paths), fields(op = "create_with_files", files = paths.len()))]
    pub async fn create_note_with_files(
        &self,
        req: CreateNoteRequest,
        paths: &[&Path],
    ) -> Result<Note> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| Error::Config("no file uploader configured".to_string()))?;
        let uploaded = uploader
            .upload_many(paths)
            .await
            .map_err(|e| self.shared.fail(e))?;
        let ids = uploaded.into_iter().map(|f| f.id).collect();
        self.create_note(req.with_attachments(ids)).await
    }

    /// Apply an edit locally now and write it once typing pauses.
    pub fn edit(&self, id: &NoteId, edit: FieldEdit) -> Result<()> {
        let patch = edit.clone().into_patch();
        self.shared.store.write(|s| s.patch_local(id, &patch))?;
        self.shared
            .mutations
            .schedule(id.clone(), edit, self.config.edit_delay());
        Ok(())
    }

    /// Write `patch` immediately, superseding pending edits of the same fields.
    #[instrument(skip(self, patch), fields(op = "save", note_id = %id))]
    pub async fn save(&self, id: &NoteId, patch: NotePatch) -> Result<Note> {
        if patch.is_empty() {
            return self
                .shared
                .store
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("note {id}")));
        }
        for (field, set) in [
            (NoteField::Title, patch.title.is_some()),
            (NoteField::Content, patch.content.is_some()),
            (NoteField::Emoji, patch.emoji.is_some()),
            (NoteField::Categories, patch.categories.is_some()),
        ] {
            if set {
                self.shared.mutations.cancel_field(id, field);
            }
        }

        let revision = self.shared.store.write(|s| s.patch_local(id, &patch))?;
        let note = self
            .transport
            .update_note(id, patch)
            .await
            .map_err(|e| self.shared.fail(e))?;
        self.shared
            .store
            .write(|s| s.reconcile(note.clone(), revision));
        Ok(note)
    }

    /// Tag a note with `category` and save right away.
    pub async fn add_category(&self, id: &NoteId, category: &str) -> Result<Note> {
        let note = self
            .shared
            .store
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        if note.has_category(category) {
            return Ok(note);
        }
        let mut categories = note.categories;
        categories.push(category.to_string());
        self.save(id, NotePatch::categories(categories)).await
    }

    /// Remove `category` from a note and save right away.
    pub async fn remove_category(&self, id: &NoteId, category: &str) -> Result<Note> {
        let note = self
            .shared
            .store
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        if !note.has_category(category) {
            return Ok(note);
        }
        let categories = note
            .categories
            .into_iter()
            .filter(|c| c != category)
            .collect();
        self.save(id, NotePatch::categories(categories)).await
    }

    /// Delete a note. Pending edits are dropped first; the note reappears
    /// in place if the server refuses.
    #[instrument(skip(self), fields(op = "delete", note_id = %id))]
    pub async fn delete_note(&self, id: &NoteId) -> Result<()> {
        self.shared.mutations.cancel_note(id);
        let removed = self.shared.store.write(|s| s.remove(id));

        match self.transport.delete_note(id).await {
            Ok(()) => {
                info!("Note deleted");
                Ok(())
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    if let Some((index, note)) = removed {
                        warn!(error = %e, "Delete failed; restoring note");
                        self.shared.store.write(|s| s.insert_at(index, note));
                    }
                }
                Err(self.shared.fail(e))
            }
        }
    }

    /// Discard pending edits of a note whose editor closed.
    pub fn close_note(&self, id: &NoteId) -> usize {
        self.shared.mutations.cancel_note(id)
    }

    // =========================================================================
    // KANBAN
    // =========================================================================

    /// Fetch the kanban endpoint, merge its notes into the store and take
    /// its column order.
    #[instrument(skip(self), fields(op = "refresh_kanban"))]
    pub async fn refresh_kanban(&self) -> Result<usize> {
        let kanban = match self.transport.list_kanban().await {
            Ok(kanban) => kanban,
            Err(e) if e.is_unauthorized() => return Err(self.shared.fail(e)),
            Err(e) => {
                warn!(error = %e, "Kanban fetch failed; keeping current board");
                return Ok(0);
            }
        };
        let seeded = KanbanBoard::from_kanban(&kanban);
        let count = kanban.len();
        self.shared.store.write(|s| {
            for note in kanban.into_notes() {
                s.upsert(note);
            }
        });
        let notes = self.shared.store.snapshot();
        let mut board = self.shared.board();
        *board = seeded;
        board.sync_with(&notes);
        Ok(count)
    }

    /// Current board, derived from the store's statuses.
    pub fn board(&self) -> Vec<BoardColumn> {
        let notes = self.shared.store.snapshot();
        let mut board = self.shared.board();
        board.sync_with(&notes);
        board.resolve(&notes)
    }

    /// Drag a card. The board and the note's status change optimistically,
    /// then the destination status is sent (same-column reorders included);
    /// both revert if the server refuses.
    ///
    /// Returns the moved note, or `None` for a drop on the source slot.
    #[instrument(skip(self), fields(op = "move_card"))]
    pub async fn move_card(&self, from: BoardPosition, to: BoardPosition) -> Result<Option<Note>> {
        let notes = self.shared.store.snapshot();
        let outcome = {
            let mut board = self.shared.board();
            board.sync_with(&notes);
            board.move_card(from, to)?
        };

        let (note_id, target, snapshot) = match outcome {
            MoveOutcome::Unchanged => {
                debug!("Card dropped on its own slot");
                return Ok(None);
            }
            MoveOutcome::Moved {
                note_id,
                to,
                snapshot,
                ..
            } => (note_id, to, snapshot),
        };

        let (previous, revision) = self.shared.store.write(|s| {
            let previous = s.set_status(&note_id, target);
            (previous, s.revision(&note_id))
        });

        match self.transport.update_status(&note_id, target).await {
            Ok(note) => {
                self.shared
                    .store
                    .write(|s| s.reconcile(note.clone(), revision));
                info!(note_id = %note_id, status = %target, "Card moved");
                Ok(Some(note))
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    warn!(note_id = %note_id, error = %e, "Move failed; reverting board");
                    self.shared.board().restore(snapshot);
                    if let Some(previous) = previous {
                        self.shared
                            .store
                            .write(|s| s.set_status(&note_id, previous));
                    }
                }
                Err(self.shared.fail(e))
            }
        }
    }

    /// Set a card's priority (0..=3), reverting locally on failure.
    #[instrument(skip(self), fields(op = "set_priority", note_id = %id))]
    pub async fn set_priority(&self, id: &NoteId, priority: u8) -> Result<Note> {
        let update = KanbanUpdate::priority(priority)?;
        let (previous, revision) = self.shared.store.write(|s| {
            let previous = s.set_priority(id, priority);
            (previous, s.revision(id))
        });

        match self.transport.update_kanban(id, update).await {
            Ok(note) => {
                self.shared
                    .store
                    .write(|s| s.reconcile(note.clone(), revision));
                Ok(note)
            }
            Err(e) => {
                if let (false, Some(previous)) = (e.is_unauthorized(), previous) {
                    self.shared.store.write(|s| s.set_priority(id, previous));
                }
                Err(self.shared.fail(e))
            }
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Cancel every timer and forget all notes.
    pub fn teardown(&self) {
        self.shared.teardown();
    }
}

impl Drop for NotesWorkspace {
    fn drop(&mut self) {
        if let Some(watch) = self.session_watch.take() {
            watch.abort();
        }
    }
}
