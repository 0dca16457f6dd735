//! Local note store: the display copy of the user's notes.
//!
//! Entries are unique by id. Every local mutation bumps a per-note revision
//! counter; server responses are applied through [`LocalNoteStore::reconcile`]
//! only when no newer local change has happened since the request was made.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use notesense_core::{Error, Note, NoteId, NotePatch, NoteStatus, Result};

/// Ordered, id-unique collection of notes.
#[derive(Debug, Default, Clone)]
pub struct LocalNoteStore {
    notes: Vec<Note>,
    revisions: HashMap<NoteId, u64>,
}

impl LocalNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection (after a list or search).
    ///
    /// Duplicate ids in `notes` collapse to their first occurrence.
    /// Revision counters are kept so responses to requests issued before
    /// the load still compare against the right value.
    pub fn load(&mut self, notes: Vec<Note>) {
        let mut loaded: Vec<Note> = Vec::with_capacity(notes.len());
        for note in notes {
            if loaded.iter().any(|n| n.id == note.id) {
                trace!(note_id = %note.id, "Dropping duplicate note in load");
                continue;
            }
            loaded.push(note);
        }
        debug!(result_count = loaded.len(), "Store loaded");
        self.notes = loaded;
    }

    /// Insert or replace by id. Existing entries keep their position; new
    /// ones are appended.
    pub fn upsert(&mut self, note: Note) {
        match self.position(&note.id) {
            Some(index) => self.notes[index] = note,
            None => self.notes.push(note),
        }
    }

    /// Insert `note` at `index` (clamped), replacing any entry with the same id.
    pub fn insert_at(&mut self, index: usize, note: Note) {
        if let Some(existing) = self.position(&note.id) {
            self.notes.remove(existing);
        }
        let index = index.min(self.notes.len());
        self.notes.insert(index, note);
    }

    /// Remove by id, returning the former position and note.
    pub fn remove(&mut self, id: &NoteId) -> Option<(usize, Note)> {
        let index = self.position(id)?;
        self.bump(id);
        Some((index, self.notes.remove(index)))
    }

    /// Apply an optimistic edit in place and return the note's new revision.
    pub fn patch_local(&mut self, id: &NoteId, patch: &NotePatch) -> Result<u64> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        patch.apply_to(&mut self.notes[index]);
        Ok(self.bump(id))
    }

    /// Optimistically set a note's kanban status. Returns the previous status.
    pub fn set_status(&mut self, id: &NoteId, status: NoteStatus) -> Option<NoteStatus> {
        let index = self.position(id)?;
        let previous = std::mem::replace(&mut self.notes[index].status, status);
        self.bump(id);
        Some(previous)
    }

    /// Optimistically set a note's kanban priority. Returns the previous one.
    pub fn set_priority(&mut self, id: &NoteId, priority: u8) -> Option<u8> {
        let index = self.position(id)?;
        let previous = std::mem::replace(&mut self.notes[index].priority, priority);
        self.bump(id);
        Some(previous)
    }

    /// Current revision of a note (0 if it was never mutated locally).
    pub fn revision(&self, id: &NoteId) -> u64 {
        self.revisions.get(id).copied().unwrap_or(0)
    }

    /// Apply a server copy of a note if it answers the latest local revision.
    ///
    /// Returns `false` (and leaves the store alone) when the note changed
    /// locally after `revision` was taken, or is no longer in the store.
    pub fn reconcile(&mut self, note: Note, revision: u64) -> bool {
        let current = self.revision(&note.id);
        if current != revision {
            debug!(
                note_id = %note.id,
                revision,
                current,
                "Ignoring stale server response"
            );
            return false;
        }
        match self.position(&note.id) {
            Some(index) => {
                self.notes[index] = note;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.position(id).is_some()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Drop all notes and revision history.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.revisions.clear();
    }

    fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|n| &n.id == id)
    }

    fn bump(&mut self, id: &NoteId) -> u64 {
        let revision = self.revisions.entry(id.clone()).or_insert(0);
        *revision += 1;
        *revision
    }
}

/// Thread-safe handle to a [`LocalNoteStore`].
///
/// Every accessor runs its closure under the lock, so each optimistic
/// read-modify-write is atomic. Closures must not await.
#[derive(Debug, Default, Clone)]
pub struct SharedNoteStore {
    inner: Arc<Mutex<LocalNoteStore>>,
}

impl SharedNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with shared access.
    pub fn read<T>(&self, f: impl FnOnce(&LocalNoteStore) -> T) -> T {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access.
    pub fn write<T>(&self, f: impl FnOnce(&mut LocalNoteStore) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copy of all notes in display order.
    pub fn snapshot(&self) -> Vec<Note> {
        self.read(|s| s.notes().to_vec())
    }

    pub fn get(&self, id: &NoteId) -> Option<Note> {
        self.read(|s| s.get(id).cloned())
    }
}
