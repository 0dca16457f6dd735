//! Centralized default constants for the NoteSense client.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic numbers.

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Default base URL for the notes API (note routes live under `/notes`).
pub const API_URL: &str = "http://localhost:8080/api";

/// Default base URL for the authentication routes (`/login`, `/signup`, `/logout`).
pub const AUTH_URL: &str = "http://localhost:8080";

/// Default base URL for the attachment upload service (`/files`).
pub const FILES_URL: &str = "http://localhost:8080";

/// Timeout for note and auth requests in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for attachment uploads in seconds.
pub const UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Largest attachment the upload service accepts (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_API_URL: &str = "NOTESENSE_API_URL";
pub const ENV_AUTH_URL: &str = "NOTESENSE_AUTH_URL";
pub const ENV_FILES_URL: &str = "NOTESENSE_FILES_URL";
pub const ENV_TIMEOUT_SECS: &str = "NOTESENSE_TIMEOUT_SECS";
pub const ENV_CREDENTIALS: &str = "NOTESENSE_CREDENTIALS";
pub const ENV_EDIT_DEBOUNCE_MS: &str = "NOTESENSE_EDIT_DEBOUNCE_MS";
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "NOTESENSE_SEARCH_DEBOUNCE_MS";

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Quiet period before a title/content/emoji edit is written to the server.
pub const EDIT_DEBOUNCE_MS: u64 = 500;

/// Quiet period before a search query is sent.
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Session and mutation event broadcast channel capacity.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// NOTES
// =============================================================================

/// Title given to notes created from the "new note" action.
pub const UNTITLED_NOTE_TITLE: &str = "Untitled Note";

/// Emoji palette new notes pick from.
pub const NOTE_EMOJIS: &[&str] = &[
    "📝", "✏️", "📚", "💭", "💡", "🎯", "📌", "🌟", "✨", "📖",
];

/// Category tags every catalog starts with.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Personal 👤",
    "Work 💼",
    "Ideas 💭",
    "Tasks 📋",
    "Study 📚",
];

/// Highest kanban card priority (priorities run 0..=MAX_PRIORITY).
pub const MAX_PRIORITY: u8 = 3;
