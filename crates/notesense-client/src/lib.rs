//! # notesense-client
//!
//! HTTP clients for the NoteSense server.
//!
//! - [`HttpNoteClient`]: the [`NoteTransport`] for `/api/notes`
//! - [`AuthClient`]: login, signup and logout
//! - [`FileClient`]: multipart attachment uploads ([`FileUploader`])
//!
//! All three share one [`Session`]; a 401 from any of them clears it.

pub mod auth;
pub mod config;
pub mod files;
pub mod http;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use notesense_core::*;

pub use auth::AuthClient;
pub use config::{default_credentials_path, ClientConfig};
pub use files::{mime_for_path, FileClient};
pub use http::HttpNoteClient;
