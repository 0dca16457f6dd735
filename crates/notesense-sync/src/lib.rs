//! # notesense-sync
//!
//! Client-side state synchronization for NoteSense.
//!
//! The [`NotesWorkspace`] keeps an optimistic local copy of the user's notes
//! ([`SharedNoteStore`]), writes field edits back through a debounced
//! [`MutationQueue`], partitions notes into a [`KanbanBoard`], and filters
//! them by text and category ([`NoteFilter`], [`CategoryCatalog`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use notesense_core::{FieldEdit, NoteId, NoteTransport};
//! use notesense_sync::{NoteFilter, NotesWorkspace, SyncConfig};
//!
//! # async fn demo(transport: Arc<dyn NoteTransport>) -> notesense_core::Result<()> {
//! let workspace = NotesWorkspace::new(transport, SyncConfig::from_env());
//! workspace.refresh().await?;
//!
//! let id = NoteId::new("n1");
//! workspace.edit(&id, FieldEdit::Title("Groceries".into()))?;
//!
//! let visible = workspace.visible_notes(&NoteFilter::new("grocer"));
//! # let _ = visible;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod debounce;
pub mod filter;
pub mod kanban;
pub mod mutation;
pub mod store;
pub mod workspace;

pub use config::SyncConfig;
pub use debounce::Debouncer;
pub use filter::{collect_categories, filter_notes, CategoryCatalog, NoteFilter};
pub use kanban::{BoardColumn, BoardPosition, KanbanBoard, MoveOutcome};
pub use mutation::{MutationEvent, MutationQueue};
pub use store::{LocalNoteStore, SharedNoteStore};
pub use workspace::{NotesWorkspace, WorkspaceEvent};
