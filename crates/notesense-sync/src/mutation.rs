//! Debounced write-back of optimistic field edits.
//!
//! One timer per `(note, field)`. A flush sends exactly one
//! `update(note, {field: value})` carrying the latest value. Failed flushes
//! are logged and reported on the event channel; they are not retried and
//! the optimistic local value stays in place.
//!
//! Different fields of the same note flush independently, so two PATCHes
//! for one note can be in flight at once. The store's revision check keeps
//! a late response from overwriting newer local edits, but the server may
//! still apply the two PATCHes in either order.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use notesense_core::defaults;
use notesense_core::{FieldEdit, NoteField, NoteId, NoteTransport};

use crate::debounce::Debouncer;
use crate::store::SharedNoteStore;

/// Outcome of a debounced flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent {
    /// The server accepted the edit. `applied` is false when the response
    /// was stale and the local copy was kept.
    Flushed {
        note_id: NoteId,
        field: NoteField,
        applied: bool,
    },
    /// The server call failed. The local value is unchanged.
    Failed {
        note_id: NoteId,
        field: NoteField,
        error: String,
        unauthorized: bool,
    },
}

/// Debounced mutation queue keyed by `(note, field)`.
pub struct MutationQueue {
    transport: Arc<dyn NoteTransport>,
    store: SharedNoteStore,
    timers: Arc<Debouncer<(NoteId, NoteField)>>,
    events: broadcast::Sender<MutationEvent>,
}

impl MutationQueue {
    pub fn new(transport: Arc<dyn NoteTransport>, store: SharedNoteStore) -> Self {
        let (events, _) = broadcast::channel(defaults::EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            store,
            timers: Arc::new(Debouncer::new()),
            events,
        }
    }

    /// Record `edit` as the latest value for its `(note, field)` and
    /// (re)start that key's timer.
    pub fn schedule(&self, note_id: NoteId, edit: FieldEdit, delay: Duration) {
        let field = edit.field();
        let transport = Arc::clone(&self.transport);
        let store = self.store.clone();
        let timers = Arc::downgrade(&self.timers);
        let events = self.events.clone();
        let id = note_id.clone();

        let reset = self.timers.schedule((note_id, field), delay, move || async move {
            flush(transport, store, timers, events, id, edit).await;
        });
        if reset {
            debug!(field = %field, "Pending edit superseded");
        }
    }

    /// Discard pending edits for one note. Returns how many were dropped.
    pub fn cancel_note(&self, note_id: &NoteId) -> usize {
        let dropped = self.timers.cancel_where(|(id, _)| id == note_id);
        if dropped > 0 {
            debug!(note_id = %note_id, dropped, "Pending edits cancelled");
        }
        dropped
    }

    /// Discard the pending edit for one field of a note.
    pub fn cancel_field(&self, note_id: &NoteId, field: NoteField) -> bool {
        self.timers.cancel(&(note_id.clone(), field))
    }

    /// Discard every pending edit.
    pub fn cancel_all(&self) -> usize {
        self.timers.cancel_all()
    }

    pub fn is_pending(&self, note_id: &NoteId, field: NoteField) -> bool {
        self.timers.is_pending(&(note_id.clone(), field))
    }

    pub fn pending_count(&self) -> usize {
        self.timers.pending_count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
        self.events.subscribe()
    }
}

async fn flush(
    transport: Arc<dyn NoteTransport>,
    store: SharedNoteStore,
    timers: Weak<Debouncer<(NoteId, NoteField)>>,
    events: broadcast::Sender<MutationEvent>,
    note_id: NoteId,
    edit: FieldEdit,
) {
    let field = edit.field();
    let revision = store.read(|s| s.revision(&note_id));

    match transport.update_note(&note_id, edit.into_patch()).await {
        Ok(note) => {
            let applied = store.write(|s| s.reconcile(note, revision));
            debug!(note_id = %note_id, field = %field, applied, "Edit flushed");
            let _ = events.send(MutationEvent::Flushed {
                note_id,
                field,
                applied,
            });
        }
        Err(e) => {
            let unauthorized = e.is_unauthorized();
            warn!(note_id = %note_id, field = %field, error = %e, "Edit flush failed");
            if unauthorized {
                if let Some(timers) = timers.upgrade() {
                    let dropped = timers.cancel_all();
                    info!(dropped, "Session rejected; pending edits discarded");
                }
            }
            let _ = events.send(MutationEvent::Failed {
                note_id,
                field,
                error: e.to_string(),
                unauthorized,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesense_client::mock::{MockFailure, MockNoteTransport};
    use notesense_core::{Note, NotePatch};

    const DELAY: Duration = Duration::from_millis(500);

    fn setup() -> (MockNoteTransport, SharedNoteStore, MutationQueue) {
        setup_with_latency(0)
    }

    fn setup_with_latency(
        latency_ms: u64,
    ) -> (MockNoteTransport, SharedNoteStore, MutationQueue) {
        let transport = MockNoteTransport::new()
            .with_notes(vec![Note::new("n1", "old")])
            .with_latency_ms(latency_ms);
        let store = SharedNoteStore::new();
        store.write(|s| s.load(transport.notes()));
        let queue = MutationQueue::new(Arc::new(transport.clone()), store.clone());
        (transport, store, queue)
    }

    fn type_title(store: &SharedNoteStore, queue: &MutationQueue, title: &str) {
        let id = NoteId::new("n1");
        store
            .write(|s| s.patch_local(&id, &NotePatch::title(title)))
            .unwrap();
        queue.schedule(id, FieldEdit::Title(title.to_string()), DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_sends_one_update_with_last_value() {
        let (transport, store, queue) = setup();

        for title in ["G", "Gr", "Gro", "Groceries"] {
            type_title(&store, &queue, title);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(transport.call_count("update"), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(transport.call_count("update"), 1);
        assert_eq!(
            transport.calls()[0].patch,
            Some(NotePatch::title("Groceries"))
        );
        assert_eq!(transport.note(&"n1".into()).unwrap().title, "Groceries");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fields_flush_independently() {
        let (transport, _store, queue) = setup();
        let id = NoteId::new("n1");
        queue.schedule(id.clone(), FieldEdit::Title("t".into()), DELAY);
        queue.schedule(id.clone(), FieldEdit::Content("c".into()), DELAY);
        assert!(queue.is_pending(&id, NoteField::Title));
        assert!(queue.is_pending(&id, NoteField::Content));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(transport.call_count("update"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_note_sends_nothing() {
        let (transport, store, queue) = setup();
        type_title(&store, &queue, "draft");
        assert_eq!(queue.cancel_note(&"n1".into()), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.call_count("update"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_keeps_local_value() {
        let (transport, store, queue) = setup();
        let mut events = queue.subscribe();
        transport.fail_next("update", MockFailure::Transport(500));

        type_title(&store, &queue, "local");
        tokio::time::sleep(Duration::from_millis(600)).await;

        match events.recv().await.unwrap() {
            MutationEvent::Failed { unauthorized, .. } => assert!(!unauthorized),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(store.get(&"n1".into()).unwrap().title, "local");
        assert_eq!(transport.note(&"n1".into()).unwrap().title, "old");
        // no retry
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.call_count("update"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_does_not_clobber_newer_edit() {
        let (_transport, store, queue) = setup_with_latency(1_000);
        let mut events = queue.subscribe();

        type_title(&store, &queue, "first");
        // timer fires at 500ms, response lands at 1500ms
        tokio::time::sleep(Duration::from_millis(700)).await;
        store
            .write(|s| s.patch_local(&"n1".into(), &NotePatch::title("second")))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(
            events.recv().await.unwrap(),
            MutationEvent::Flushed {
                note_id: "n1".into(),
                field: NoteField::Title,
                applied: false
            }
        );
        assert_eq!(store.get(&"n1".into()).unwrap().title, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_flush_drops_other_pending_edits() {
        let (transport, store, queue) = setup();
        transport.fail_next("update", MockFailure::Unauthorized);

        type_title(&store, &queue, "a");
        queue.schedule(
            "n1".into(),
            FieldEdit::Content("later".into()),
            Duration::from_secs(2),
        );

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(queue.pending_count(), 0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(transport.call_count("update"), 1);
    }
}
