//! Core data models for NoteSense.
//!
//! These types mirror the JSON the notes API speaks (camelCase field names)
//! and are shared by the transport, the local store and the kanban board.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::defaults;
use crate::error::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque, server-assigned note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Kanban status of a note. The four states are mutually exclusive.
///
/// Decoding is lenient: the server keeps status as free text, so spellings
/// are matched trimmed and case-insensitively, and anything unrecognised
/// (including `""` and `null`) becomes [`Backlog`](Self::Backlog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum NoteStatus {
    #[default]
    #[serde(rename = "backlog")]
    Backlog,
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl NoteStatus {
    /// All statuses in board column order.
    pub const ALL: [NoteStatus; 4] = [
        NoteStatus::Backlog,
        NoteStatus::Todo,
        NoteStatus::InProgress,
        NoteStatus::Done,
    ];

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Human-readable column title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Match one of the spellings the server groups into a column.
    fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "backlog" => Some(Self::Backlog),
            "todo" | "to_do" | "to-do" => Some(Self::Todo),
            "in_progress" | "in-progress" | "inprogress" | "in progress" => Some(Self::InProgress),
            "done" | "completed" => Some(Self::Done),
            _ => None,
        }
    }

    /// Column position on the board (0..4).
    pub fn column_index(&self) -> usize {
        match self {
            Self::Backlog => 0,
            Self::Todo => 1,
            Self::InProgress => 2,
            Self::Done => 3,
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NoteStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Self::from_wire).unwrap_or_default())
    }
}

impl FromStr for NoteStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown note status: {}", s.trim())))
    }
}

// =============================================================================
// NOTE
// =============================================================================

/// A user-authored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub emoji: String,
    /// Unique category tags in display order.
    #[serde(default, deserialize_with = "deserialize_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub status: NoteStatus,
    /// Kanban card priority, 0 (none) to 3 (high).
    #[serde(default)]
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Build a note with empty content, stamped now. Mostly useful for
    /// fixtures and in-memory transports.
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: None,
            title: title.into(),
            content: String::new(),
            emoji: String::new(),
            categories: Vec::new(),
            status: NoteStatus::Backlog,
            priority: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = dedup_categories(categories.into_iter().map(Into::into));
        self
    }

    pub fn with_status(mut self, status: NoteStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the note carries `category` (exact match).
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Drop duplicate categories, keeping the first occurrence of each.
pub fn dedup_categories<I>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for category in categories {
        if !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

fn deserialize_categories<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(dedup_categories(raw.unwrap_or_default()))
}

// =============================================================================
// EDITS
// =============================================================================

/// Note fields that can be edited from the note editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteField {
    Title,
    Content,
    Emoji,
    Categories,
}

impl NoteField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
            Self::Emoji => "emoji",
            Self::Categories => "categories",
        }
    }
}

impl fmt::Display for NoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-field edit with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Title(String),
    Content(String),
    Emoji(String),
    Categories(Vec<String>),
}

impl FieldEdit {
    pub fn field(&self) -> NoteField {
        match self {
            Self::Title(_) => NoteField::Title,
            Self::Content(_) => NoteField::Content,
            Self::Emoji(_) => NoteField::Emoji,
            Self::Categories(_) => NoteField::Categories,
        }
    }

    /// A patch touching only this field.
    pub fn into_patch(self) -> NotePatch {
        let mut patch = NotePatch::default();
        match self {
            Self::Title(v) => patch.title = Some(v),
            Self::Content(v) => patch.content = Some(v),
            Self::Emoji(v) => patch.emoji = Some(v),
            Self::Categories(v) => patch.categories = Some(dedup_categories(v)),
        }
        patch
    }
}

/// Partial update of a note. `None` fields are left untouched and omitted
/// from the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn categories(categories: Vec<String>) -> Self {
        Self {
            categories: Some(dedup_categories(categories)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.emoji.is_none()
            && self.categories.is_none()
    }

    /// Apply the patch in place.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(emoji) = &self.emoji {
            note.emoji = emoji.clone();
        }
        if let Some(categories) = &self.categories {
            note.categories = dedup_categories(categories.iter().cloned());
        }
    }
}

impl From<FieldEdit> for NotePatch {
    fn from(edit: FieldEdit) -> Self {
        edit.into_patch()
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Body of `POST /notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub emoji: String,
    pub categories: Vec<String>,
    /// Attachment file ids returned by the upload service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl CreateNoteRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            emoji: defaults::NOTE_EMOJIS[0].to_string(),
            categories: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// The "new note" request: untitled, empty, random emoji.
    pub fn untitled() -> Self {
        let emoji = defaults::NOTE_EMOJIS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("📝");
        Self {
            emoji: emoji.to_string(),
            ..Self::new(defaults::UNTITLED_NOTE_TITLE, "")
        }
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = dedup_categories(categories);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Body of `POST /notes/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl SearchRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }
}

/// Body of `PATCH /notes/kanban/note/{id}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<NoteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

impl KanbanUpdate {
    pub fn status(status: NoteStatus) -> Self {
        Self {
            status: Some(status),
            priority: None,
        }
    }

    /// Priority change; rejects values above [`defaults::MAX_PRIORITY`].
    pub fn priority(priority: u8) -> crate::Result<Self> {
        if priority > defaults::MAX_PRIORITY {
            return Err(Error::InvalidInput(format!(
                "priority must be 0..={}, got {priority}",
                defaults::MAX_PRIORITY
            )));
        }
        Ok(Self {
            status: None,
            priority: Some(priority),
        })
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Body of `GET /notes/kanban`: notes grouped by status.
///
/// The server spells bucket keys in PascalCase and may add an
/// `Uncategorized` bucket for notes with an unknown status; those land in
/// the backlog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanNotes {
    #[serde(default, alias = "Backlog", deserialize_with = "nullable_notes")]
    pub backlog: Vec<Note>,
    #[serde(default, alias = "Todo", deserialize_with = "nullable_notes")]
    pub todo: Vec<Note>,
    #[serde(
        default,
        alias = "InProgress",
        alias = "in-progress",
        deserialize_with = "nullable_notes"
    )]
    pub in_progress: Vec<Note>,
    #[serde(default, alias = "Done", deserialize_with = "nullable_notes")]
    pub done: Vec<Note>,
    #[serde(
        default,
        alias = "Uncategorized",
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "nullable_notes"
    )]
    pub uncategorized: Vec<Note>,
}

fn nullable_notes<'de, D>(deserializer: D) -> Result<Vec<Note>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Note>>::deserialize(deserializer)?.unwrap_or_default())
}

impl KanbanNotes {
    pub fn bucket(&self, status: NoteStatus) -> &[Note] {
        match status {
            NoteStatus::Backlog => &self.backlog,
            NoteStatus::Todo => &self.todo,
            NoteStatus::InProgress => &self.in_progress,
            NoteStatus::Done => &self.done,
        }
    }

    /// Flatten into one list, stamping each note with the status of the
    /// bucket it came from.
    pub fn into_notes(self) -> Vec<Note> {
        let buckets = [
            (NoteStatus::Backlog, self.backlog),
            (NoteStatus::Backlog, self.uncategorized),
            (NoteStatus::Todo, self.todo),
            (NoteStatus::InProgress, self.in_progress),
            (NoteStatus::Done, self.done),
        ];
        buckets
            .into_iter()
            .flat_map(|(status, notes)| {
                notes.into_iter().map(move |mut note| {
                    note.status = status;
                    note
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
            + self.todo.len()
            + self.in_progress.len()
            + self.done.len()
            + self.uncategorized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of an uploaded attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Audio,
    Document,
    Video,
}

/// Response of the attachment upload service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    #[serde(default, rename = "userID", alias = "userId")]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mime_type: String,
    /// Text extracted from images by the server's OCR pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note_json() -> serde_json::Value {
        json!({
            "id": "n1",
            "userId": "u1",
            "title": "Groceries",
            "content": "milk",
            "emoji": "📝",
            "categories": ["Personal", "Personal", "Work"],
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:05:00.123456789Z"
        })
    }

    #[test]
    fn test_note_decodes_server_shape() {
        let note: Note = serde_json::from_value(note_json()).unwrap();
        assert_eq!(note.id, NoteId::new("n1"));
        assert_eq!(note.user_id.as_deref(), Some("u1"));
        assert_eq!(note.title, "Groceries");
        // duplicates dropped, order kept
        assert_eq!(note.categories, vec!["Personal", "Work"]);
        // server omitted status and priority
        assert_eq!(note.status, NoteStatus::Backlog);
        assert_eq!(note.priority, 0);
    }

    #[test]
    fn test_note_null_categories() {
        let mut value = note_json();
        value["categories"] = serde_json::Value::Null;
        let note: Note = serde_json::from_value(value).unwrap();
        assert!(note.categories.is_empty());
    }

    #[test]
    fn test_note_serializes_camel_case() {
        let note: Note = serde_json::from_value(note_json()).unwrap();
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("userId").is_some());
        assert_eq!(value["status"], "backlog");
    }

    #[test]
    fn test_status_aliases() {
        let s: NoteStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(s, NoteStatus::InProgress);
        let s: NoteStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(s, NoteStatus::InProgress);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"in_progress\"");
    }

    #[test]
    fn test_status_accepts_server_spellings() {
        for (raw, expected) in [
            (json!("completed"), NoteStatus::Done),
            (json!(" Done "), NoteStatus::Done),
            (json!("inprogress"), NoteStatus::InProgress),
            (json!("In Progress"), NoteStatus::InProgress),
            (json!("TODO"), NoteStatus::Todo),
            (json!(""), NoteStatus::Backlog),
            (json!("archived"), NoteStatus::Backlog),
            (json!(null), NoteStatus::Backlog),
        ] {
            let status: NoteStatus = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(status, expected, "decoding {raw}");
        }
    }

    #[test]
    fn test_note_list_with_free_text_statuses_decodes() {
        let statuses = ["completed", "inprogress", "Done", "", "archived"];
        let notes: Vec<Note> = serde_json::from_value(json!(statuses
            .iter()
            .map(|s| {
                let mut n = note_json();
                n["status"] = json!(s);
                n
            })
            .collect::<Vec<_>>()))
        .unwrap();
        let decoded: Vec<NoteStatus> = notes.iter().map(|n| n.status).collect();
        assert_eq!(
            decoded,
            vec![
                NoteStatus::Done,
                NoteStatus::InProgress,
                NoteStatus::Done,
                NoteStatus::Backlog,
                NoteStatus::Backlog,
            ]
        );
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Done".parse::<NoteStatus>().unwrap(), NoteStatus::Done);
        assert_eq!("to-do".parse::<NoteStatus>().unwrap(), NoteStatus::Todo);
        assert_eq!("completed".parse::<NoteStatus>().unwrap(), NoteStatus::Done);
        assert!("later".parse::<NoteStatus>().is_err());
    }

    #[test]
    fn test_status_column_order() {
        for (i, status) in NoteStatus::ALL.iter().enumerate() {
            assert_eq!(status.column_index(), i);
        }
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = NotePatch::title("Hello");
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "title": "Hello" }));
        assert!(!patch.is_empty());
        assert!(NotePatch::default().is_empty());
    }

    #[test]
    fn test_patch_apply_dedups_categories() {
        let mut note = Note::new("n1", "t");
        let patch = NotePatch {
            categories: Some(vec!["a".into(), "b".into(), "a".into()]),
            emoji: Some("💡".into()),
            ..Default::default()
        };
        patch.apply_to(&mut note);
        assert_eq!(note.categories, vec!["a", "b"]);
        assert_eq!(note.emoji, "💡");
        assert_eq!(note.title, "t");
    }

    #[test]
    fn test_field_edit_into_patch() {
        let edit = FieldEdit::Content("body".into());
        assert_eq!(edit.field(), NoteField::Content);
        assert_eq!(edit.into_patch(), NotePatch::content("body"));
    }

    #[test]
    fn test_untitled_request_uses_palette() {
        let req = CreateNoteRequest::untitled();
        assert_eq!(req.title, defaults::UNTITLED_NOTE_TITLE);
        assert!(req.content.is_empty());
        assert!(defaults::NOTE_EMOJIS.contains(&req.emoji.as_str()));
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn test_kanban_update_priority_bounds() {
        assert!(KanbanUpdate::priority(3).is_ok());
        assert!(KanbanUpdate::priority(4).is_err());
        let body = serde_json::to_value(KanbanUpdate::status(NoteStatus::Done)).unwrap();
        assert_eq!(body, json!({ "status": "done" }));
    }

    #[test]
    fn test_kanban_notes_into_notes_stamps_status() {
        let mut n = note_json();
        n["status"] = json!("backlog");
        let kanban: KanbanNotes = serde_json::from_value(json!({
            "backlog": [],
            "in-progress": [n],
        }))
        .unwrap();
        assert_eq!(kanban.len(), 1);
        assert_eq!(kanban.bucket(NoteStatus::InProgress).len(), 1);
        let notes = kanban.into_notes();
        assert_eq!(notes[0].status, NoteStatus::InProgress);
    }

    #[test]
    fn test_kanban_notes_server_casing() {
        let kanban: KanbanNotes = serde_json::from_value(json!({
            "Backlog": [],
            "Todo": null,
            "InProgress": [],
            "Done": [note_json()],
            "Uncategorized": [note_json()],
        }))
        .unwrap();
        assert_eq!(kanban.done.len(), 1);
        assert_eq!(kanban.len(), 2);
        let statuses: Vec<NoteStatus> = kanban.into_notes().iter().map(|n| n.status).collect();
        assert_eq!(statuses, vec![NoteStatus::Backlog, NoteStatus::Done]);
    }

    #[test]
    fn test_kanban_uncategorized_bucket_decodes() {
        let mut archived = note_json();
        archived["id"] = json!("n2");
        archived["status"] = json!("archived");
        let mut blank = note_json();
        blank["id"] = json!("n3");
        blank["status"] = json!("");
        let kanban: KanbanNotes = serde_json::from_value(json!({
            "Backlog": [],
            "Todo": [],
            "InProgress": [],
            "Done": [],
            "Uncategorized": [archived, blank],
        }))
        .unwrap();
        assert_eq!(kanban.uncategorized.len(), 2);
        let notes = kanban.into_notes();
        assert!(notes.iter().all(|n| n.status == NoteStatus::Backlog));
    }

    #[test]
    fn test_uploaded_file_decodes() {
        let file: UploadedFile = serde_json::from_value(json!({
            "id": "f1",
            "userID": "u1",
            "name": "scan.png",
            "type": "image",
            "path": "/uploads/scan.png",
            "size": 2048,
            "mimeType": "image/png",
            "ocrText": "hello"
        }))
        .unwrap();
        assert_eq!(file.kind, FileKind::Image);
        assert_eq!(file.user_id.as_deref(), Some("u1"));
        assert_eq!(file.ocr_text.as_deref(), Some("hello"));
    }
}
