//! Core traits for NoteSense backends.
//!
//! The sync engine only talks to the server through these traits, so the
//! HTTP client and the in-memory mock are interchangeable.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE TRANSPORT
// =============================================================================

/// Request/response operations against the notes API.
///
/// Every call requires an authenticated session. Implementations fail with
/// [`crate::Error::Unauthorized`] without contacting the server when no
/// credential is bound.
#[async_trait]
pub trait NoteTransport: Send + Sync {
    /// `GET /notes`: all notes owned by the session user.
    async fn list_notes(&self) -> Result<Vec<Note>>;

    /// `GET /notes/{id}`
    async fn get_note(&self, id: &NoteId) -> Result<Note>;

    /// `POST /notes`
    async fn create_note(&self, req: CreateNoteRequest) -> Result<Note>;

    /// `PATCH /notes/{id}` with only the fields set in `patch`.
    async fn update_note(&self, id: &NoteId, patch: NotePatch) -> Result<Note>;

    /// `DELETE /notes/{id}`
    async fn delete_note(&self, id: &NoteId) -> Result<()>;

    /// `POST /notes/search`
    async fn search_notes(&self, req: SearchRequest) -> Result<Vec<Note>>;

    /// `GET /notes/kanban`: notes grouped into the four status buckets.
    async fn list_kanban(&self) -> Result<KanbanNotes>;

    /// `PATCH /notes/kanban/note/{id}`
    async fn update_kanban(&self, id: &NoteId, update: KanbanUpdate) -> Result<Note>;

    /// Move a note to another kanban column.
    async fn update_status(&self, id: &NoteId, status: NoteStatus) -> Result<Note> {
        self.update_kanban(id, KanbanUpdate::status(status)).await
    }
}

// =============================================================================
// FILE UPLOADS
// =============================================================================

/// Attachment upload service.
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Upload a single file and return the server's record of it.
    async fn upload(&self, path: &Path) -> Result<UploadedFile>;

    /// Upload several files. Fails on the first failed upload.
    async fn upload_many(&self, paths: &[&Path]) -> Result<Vec<UploadedFile>> {
        let mut uploaded = Vec::with_capacity(paths.len());
        for path in paths {
            uploaded.push(self.upload(path).await?);
        }
        Ok(uploaded)
    }
}
