use crate::{CellPos, ColorIndex, Result};

use super::{EditOverlay, PendingCell, UndoAction, UndoHistory, UndoState};

/// Outcome of putting failed commit items back into the overlay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Cells that are pending again with their original color.
    pub restored: Vec<CellPos>,
    /// Cells the user drew over again while the commit was in flight; the newer edit wins.
    pub superseded: Vec<CellPos>,
    /// Cells that could not be restored because the overlay was full.
    pub dropped: Vec<CellPos>,
}

/// Overlay plus its undo history. All overlay mutations go through here.
#[derive(Debug, Default, Clone)]
pub struct EditState {
    overlay: EditOverlay,
    history: UndoHistory,
}

impl EditState {
    pub fn new(capacity: usize) -> Self {
        Self {
            overlay: EditOverlay::new(capacity),
            history: UndoHistory::new(),
        }
    }

    pub fn overlay(&self) -> &EditOverlay {
        &self.overlay
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Stages `color` at `pos`.
    ///
    /// Returns `Ok(false)` without recording history if the cell already
    /// holds `color`, and [`crate::EngineError::OverlayFull`] if `pos` is new
    /// and the overlay is at capacity.
    pub fn set_pixel(&mut self, pos: CellPos, color: ColorIndex) -> Result<bool> {
        let previous = self.overlay.get(pos);
        if previous == Some(color) {
            return Ok(false);
        }
        self.overlay.insert(pos, color)?;
        self.history.push(UndoAction { pos, previous, new: color });
        Ok(true)
    }

    /// Drops every pending edit together with both history stacks.
    pub fn clear(&mut self) {
        self.overlay.clear();
        self.history.clear();
    }

    /// Snapshot of all pending edits, leaving an empty overlay and history behind.
    pub fn take_snapshot(&mut self) -> Vec<PendingCell> {
        let snapshot = self.overlay.snapshot();
        self.clear();
        snapshot
    }

    /// Re-adds cells whose commit failed.
    ///
    /// A cell that is already pending again is left alone, and nothing is
    /// added beyond the overlay capacity. Restores are not undoable; like any
    /// other change to the overlay they invalidate the redo stack.
    pub fn restore(&mut self, cells: impl IntoIterator<Item = PendingCell>) -> RestoreSummary {
        let mut summary = RestoreSummary::default();
        for cell in cells {
            if self.overlay.contains(cell.pos) {
                summary.superseded.push(cell.pos);
            } else if self.overlay.insert(cell.pos, cell.color).is_ok() {
                summary.restored.push(cell.pos);
            } else {
                summary.dropped.push(cell.pos);
            }
        }
        if !summary.restored.is_empty() {
            self.history.clear_redo();
        }
        summary
    }
}

impl UndoState for EditState {
    fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn undo(&mut self) -> Result<Option<CellPos>> {
        let Some(action) = self.history.pop_undo() else {
            return Ok(None);
        };
        let applied = match action.previous {
            None => {
                self.overlay.remove(action.pos);
                Ok(None)
            }
            Some(color) => self.overlay.insert(action.pos, color),
        };
        if let Err(err) = applied {
            self.history.push_undo(action);
            return Err(err);
        }
        self.history.push_redo(action);
        Ok(Some(action.pos))
    }

    fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn redo(&mut self) -> Result<Option<CellPos>> {
        let Some(action) = self.history.pop_redo() else {
            return Ok(None);
        };
        if let Err(err) = self.overlay.insert(action.pos, action.new) {
            self.history.push_redo(action);
            return Err(err);
        }
        self.history.push_undo(action);
        Ok(Some(action.pos))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{EngineError, MAX_BATCH};

    fn contents(state: &EditState) -> HashMap<CellPos, ColorIndex> {
        state.overlay().iter().map(|c| (c.pos, c.color)).collect()
    }

    #[test]
    fn repeat_edit_is_idempotent() {
        let mut state = EditState::new(MAX_BATCH);
        let pos = CellPos::new(3, 4);
        assert!(state.set_pixel(pos, 5).unwrap());
        assert!(!state.set_pixel(pos, 5).unwrap());
        assert_eq!(state.overlay().len(), 1);
        assert_eq!(state.history().undo_len(), 1);
    }

    #[test]
    fn undo_to_unedited_removes_cell() {
        let mut state = EditState::new(MAX_BATCH);
        let pos = CellPos::new(1, 1);
        state.set_pixel(pos, 9).unwrap();
        assert_eq!(state.undo().unwrap(), Some(pos));
        assert!(!state.overlay().contains(pos));
        assert!(state.overlay().is_empty());
    }

    #[test]
    fn undo_restores_previous_pending_color() {
        let mut state = EditState::new(MAX_BATCH);
        let pos = CellPos::new(1, 1);
        state.set_pixel(pos, 9).unwrap();
        state.set_pixel(pos, 10).unwrap();
        state.undo().unwrap();
        assert_eq!(state.overlay().get(pos), Some(9));
        state.undo().unwrap();
        assert_eq!(state.overlay().get(pos), None);
    }

    #[test]
    fn undo_then_redo_restores_overlay() {
        let mut state = EditState::new(MAX_BATCH);
        for i in 0..10u32 {
            state.set_pixel(CellPos::new(i, i % 3), (i % 7) as u8 + 1).unwrap();
        }
        state.set_pixel(CellPos::new(2, 2), 42).unwrap();
        let before = contents(&state);

        for _ in 0..11 {
            state.undo().unwrap();
        }
        assert!(state.overlay().is_empty());
        for _ in 0..11 {
            state.redo().unwrap();
        }
        assert_eq!(contents(&state), before);
        assert!(!state.can_redo());
    }

    #[test]
    fn new_edit_after_undo_clears_redo() {
        let mut state = EditState::new(MAX_BATCH);
        state.set_pixel(CellPos::new(0, 0), 1).unwrap();
        state.undo().unwrap();
        assert!(state.can_redo());
        state.set_pixel(CellPos::new(5, 5), 2).unwrap();
        assert!(!state.can_redo());
        assert_eq!(state.redo().unwrap(), None);
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut state = EditState::new(MAX_BATCH);
        assert_eq!(state.undo().unwrap(), None);
        assert_eq!(state.redo().unwrap(), None);
    }

    #[test]
    fn capacity_rejects_new_cells_only() {
        let mut state = EditState::new(MAX_BATCH);
        for i in 0..MAX_BATCH as u32 {
            state.set_pixel(CellPos::new(i % 100, i / 100), 1).unwrap();
        }
        let before = contents(&state);
        assert_eq!(
            state.set_pixel(CellPos::new(500, 500), 1),
            Err(EngineError::OverlayFull { capacity: MAX_BATCH })
        );
        assert_eq!(state.overlay().len(), MAX_BATCH);
        assert_eq!(contents(&state), before);
        assert_eq!(state.history().undo_len(), MAX_BATCH);

        // Recoloring an existing cell is still allowed.
        assert!(state.set_pixel(CellPos::new(0, 0), 2).unwrap());
    }

    #[test]
    fn clear_drops_history() {
        let mut state = EditState::new(MAX_BATCH);
        state.set_pixel(CellPos::new(0, 0), 1).unwrap();
        state.set_pixel(CellPos::new(1, 0), 1).unwrap();
        state.undo().unwrap();
        state.clear();
        assert!(state.overlay().is_empty());
        assert!(!state.can_undo());
        assert!(!state.can_redo());
    }

    #[test]
    fn restore_keeps_newer_edits() {
        let mut state = EditState::new(MAX_BATCH);
        state.set_pixel(CellPos::new(0, 0), 1).unwrap();
        state.set_pixel(CellPos::new(1, 0), 2).unwrap();
        let snapshot = state.take_snapshot();
        assert!(state.overlay().is_empty());

        state.set_pixel(CellPos::new(1, 0), 7).unwrap();
        let summary = state.restore(snapshot);
        assert_eq!(summary.restored, vec![CellPos::new(0, 0)]);
        assert_eq!(summary.superseded, vec![CellPos::new(1, 0)]);
        assert_eq!(state.overlay().get(CellPos::new(1, 0)), Some(7));
        assert_eq!(state.overlay().get(CellPos::new(0, 0)), Some(1));
        // Only the new edit is undoable.
        assert_eq!(state.history().undo_len(), 1);
    }

    #[test]
    fn restore_never_exceeds_capacity() {
        let mut state = EditState::new(2);
        state.set_pixel(CellPos::new(0, 0), 1).unwrap();
        let snapshot = state.take_snapshot();
        state.set_pixel(CellPos::new(5, 0), 1).unwrap();
        state.set_pixel(CellPos::new(6, 0), 1).unwrap();

        let summary = state.restore(snapshot);
        assert_eq!(summary.dropped, vec![CellPos::new(0, 0)]);
        assert_eq!(state.overlay().len(), 2);
    }

    #[test]
    fn restore_invalidates_redo() {
        let mut state = EditState::new(MAX_BATCH);
        let pos = CellPos::new(1, 1);
        state.set_pixel(pos, 3).unwrap();
        let snapshot = state.take_snapshot();

        // Drawn and undone while the commit was in flight.
        state.set_pixel(pos, 9).unwrap();
        state.undo().unwrap();
        assert!(state.can_redo());

        let summary = state.restore(snapshot);
        assert_eq!(summary.restored, vec![pos]);
        assert!(!state.can_redo());
        assert_eq!(state.redo().unwrap(), None);
        assert_eq!(state.undo().unwrap(), None);
        assert_eq!(state.overlay().get(pos), Some(3));
    }

    #[test]
    fn restore_without_changes_keeps_redo() {
        let mut state = EditState::new(MAX_BATCH);
        state.set_pixel(CellPos::new(0, 0), 1).unwrap();
        let snapshot = state.take_snapshot();
        state.set_pixel(CellPos::new(0, 0), 2).unwrap();
        state.set_pixel(CellPos::new(4, 4), 5).unwrap();
        state.undo().unwrap();

        let summary = state.restore(snapshot);
        assert_eq!(summary.superseded, vec![CellPos::new(0, 0)]);
        assert!(state.can_redo());
    }
}
