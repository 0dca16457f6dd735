//! Kanban board: four status columns of note ids.
//!
//! The board only orders ids; note data stays in the local store. Column
//! membership always follows each note's `status`, while the order inside a
//! column is drop order and survives re-syncs.

use notesense_core::{Error, KanbanNotes, Note, NoteId, NoteStatus, Result};

/// A card slot on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPosition {
    pub status: NoteStatus,
    pub index: usize,
}

impl BoardPosition {
    pub fn new(status: NoteStatus, index: usize) -> Self {
        Self { status, index }
    }
}

/// Result of a drag-and-drop.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Dropped where it was picked up.
    Unchanged,
    /// The card moved. `snapshot` is the board before the move, for revert.
    Moved {
        note_id: NoteId,
        from: NoteStatus,
        to: NoteStatus,
        snapshot: KanbanBoard,
    },
}

impl MoveOutcome {
    /// True when the move crossed columns and needs a status update.
    pub fn changes_status(&self) -> bool {
        matches!(self, Self::Moved { from, to, .. } if from != to)
    }
}

/// Column contents resolved against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub status: NoteStatus,
    pub notes: Vec<Note>,
}

/// Ordered note ids per status column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KanbanBoard {
    columns: [Vec<NoteId>; 4],
}

impl KanbanBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition `notes` by status, keeping their relative order.
    pub fn from_notes(notes: &[Note]) -> Self {
        let mut board = Self::new();
        for note in notes {
            board.columns[note.status.column_index()].push(note.id.clone());
        }
        board
    }

    /// Board in the order the kanban endpoint returned.
    pub fn from_kanban(kanban: &KanbanNotes) -> Self {
        let mut board = Self::new();
        for status in NoteStatus::ALL {
            board.columns[status.column_index()] =
                kanban.bucket(status).iter().map(|n| n.id.clone()).collect();
        }
        for note in &kanban.uncategorized {
            if board.position(&note.id).is_none() {
                board.columns[NoteStatus::Backlog.column_index()].push(note.id.clone());
            }
        }
        board
    }

    /// Bring the board in line with `notes`.
    ///
    /// Cards whose note is gone or changed status leave their column; cards
    /// that stayed keep their order; newcomers append in `notes` order.
    pub fn sync_with(&mut self, notes: &[Note]) {
        for status in NoteStatus::ALL {
            self.columns[status.column_index()].retain(|id| {
                notes
                    .iter()
                    .any(|n| &n.id == id && n.status == status)
            });
        }
        for note in notes {
            if self.position(&note.id).is_none() {
                self.columns[note.status.column_index()].push(note.id.clone());
            }
        }
    }

    pub fn column(&self, status: NoteStatus) -> &[NoteId] {
        &self.columns[status.column_index()]
    }

    /// Where a note's card currently sits.
    pub fn position(&self, id: &NoteId) -> Option<BoardPosition> {
        NoteStatus::ALL.iter().find_map(|status| {
            self.columns[status.column_index()]
                .iter()
                .position(|c| c == id)
                .map(|index| BoardPosition::new(*status, index))
        })
    }

    /// Move the card at `from` to `to`.
    ///
    /// The destination index is clamped to the column length. A drop on the
    /// source slot changes nothing.
    pub fn move_card(&mut self, from: BoardPosition, to: BoardPosition) -> Result<MoveOutcome> {
        if from == to {
            return Ok(MoveOutcome::Unchanged);
        }
        let source = &self.columns[from.status.column_index()];
        if from.index >= source.len() {
            return Err(Error::InvalidInput(format!(
                "no card at {} index {}",
                from.status, from.index
            )));
        }

        let snapshot = self.clone();
        let note_id = self.columns[from.status.column_index()].remove(from.index);
        let target = &mut self.columns[to.status.column_index()];
        let index = to.index.min(target.len());
        target.insert(index, note_id.clone());

        Ok(MoveOutcome::Moved {
            note_id,
            from: from.status,
            to: to.status,
            snapshot,
        })
    }

    /// Put back a snapshot taken by [`move_card`](Self::move_card).
    pub fn restore(&mut self, snapshot: KanbanBoard) {
        *self = snapshot;
    }

    /// Resolve every column against `notes`. Ids without a note are skipped.
    pub fn resolve(&self, notes: &[Note]) -> Vec<BoardColumn> {
        NoteStatus::ALL
            .iter()
            .map(|status| BoardColumn {
                status: *status,
                notes: self.columns[status.column_index()]
                    .iter()
                    .filter_map(|id| notes.iter().find(|n| &n.id == id).cloned())
                    .collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> Vec<Note> {
        vec![
            Note::new("a", "a"),
            Note::new("b", "b").with_status(NoteStatus::Todo),
            Note::new("c", "c"),
            Note::new("d", "d").with_status(NoteStatus::Done),
        ]
    }

    fn column(board: &KanbanBoard, status: NoteStatus) -> Vec<&str> {
        board.column(status).iter().map(NoteId::as_str).collect()
    }

    #[test]
    fn test_from_notes_partitions_by_status() {
        let board = KanbanBoard::from_notes(&notes());
        assert_eq!(column(&board, NoteStatus::Backlog), vec!["a", "c"]);
        assert_eq!(column(&board, NoteStatus::Todo), vec!["b"]);
        assert!(board.column(NoteStatus::InProgress).is_empty());
        assert_eq!(column(&board, NoteStatus::Done), vec!["d"]);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn test_move_across_columns() {
        let mut board = KanbanBoard::from_notes(&notes());
        let outcome = board
            .move_card(
                BoardPosition::new(NoteStatus::Backlog, 0),
                BoardPosition::new(NoteStatus::Todo, 0),
            )
            .unwrap();
        assert!(outcome.changes_status());
        assert_eq!(column(&board, NoteStatus::Backlog), vec!["c"]);
        assert_eq!(column(&board, NoteStatus::Todo), vec!["a", "b"]);
    }

    #[test]
    fn test_drop_on_source_is_noop() {
        let mut board = KanbanBoard::from_notes(&notes());
        let before = board.clone();
        let pos = BoardPosition::new(NoteStatus::Backlog, 1);
        assert_eq!(board.move_card(pos, pos).unwrap(), MoveOutcome::Unchanged);
        assert_eq!(board, before);
    }

    #[test]
    fn test_reorder_within_column() {
        let mut board = KanbanBoard::from_notes(&notes());
        let outcome = board
            .move_card(
                BoardPosition::new(NoteStatus::Backlog, 0),
                BoardPosition::new(NoteStatus::Backlog, 1),
            )
            .unwrap();
        assert!(!outcome.changes_status());
        assert_eq!(column(&board, NoteStatus::Backlog), vec!["c", "a"]);
    }

    #[test]
    fn test_destination_index_is_clamped() {
        let mut board = KanbanBoard::from_notes(&notes());
        board
            .move_card(
                BoardPosition::new(NoteStatus::Backlog, 0),
                BoardPosition::new(NoteStatus::Done, 99),
            )
            .unwrap();
        assert_eq!(column(&board, NoteStatus::Done), vec!["d", "a"]);
    }

    #[test]
    fn test_bad_source_index() {
        let mut board = KanbanBoard::from_notes(&notes());
        let err = board
            .move_card(
                BoardPosition::new(NoteStatus::InProgress, 0),
                BoardPosition::new(NoteStatus::Done, 0),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_restore_snapshot() {
        let mut board = KanbanBoard::from_notes(&notes());
        let before = board.clone();
        let outcome = board
            .move_card(
                BoardPosition::new(NoteStatus::Todo, 0),
                BoardPosition::new(NoteStatus::Done, 0),
            )
            .unwrap();
        if let MoveOutcome::Moved { snapshot, .. } = outcome {
            board.restore(snapshot);
        }
        assert_eq!(board, before);
    }

    #[test]
    fn test_sync_keeps_drop_order_and_follows_status() {
        let mut notes = notes();
        let mut board = KanbanBoard::from_notes(&notes);
        board
            .move_card(
                BoardPosition::new(NoteStatus::Backlog, 1),
                BoardPosition::new(NoteStatus::Backlog, 0),
            )
            .unwrap();

        // d reopened elsewhere, e created, b deleted
        notes[3].status = NoteStatus::InProgress;
        notes.push(Note::new("e", "e"));
        notes.remove(1);
        board.sync_with(&notes);

        assert_eq!(column(&board, NoteStatus::Backlog), vec!["c", "a", "e"]);
        assert!(board.column(NoteStatus::Todo).is_empty());
        assert_eq!(column(&board, NoteStatus::InProgress), vec!["d"]);
        assert!(board.column(NoteStatus::Done).is_empty());
    }

    #[test]
    fn test_resolve_returns_four_columns() {
        let notes = notes();
        let board = KanbanBoard::from_notes(&notes);
        let columns = board.resolve(&notes);
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].status, NoteStatus::Backlog);
        assert_eq!(columns[0].notes.len(), 2);
        assert_eq!(columns[3].notes[0].title, "d");
    }
}
