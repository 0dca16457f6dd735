//! # notesense-core
//!
//! Core types, traits, and session handling for the NoteSense client.
//!
//! This crate provides the data model shared with the notes API, the
//! transport and upload traits the sync engine is written against, and the
//! authenticated [`Session`] every request goes through.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorCategory, Result};
pub use models::*;
pub use session::{
    CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore, Session,
    SessionEvent, SignOutReason, UserProfile,
};
pub use traits::*;
