use crate::{CellPos, ColorIndex, Result};

/// Trait for types that support undo/redo of overlay edits.
///
/// `undo`/`redo` return the single cell they touched so a consumer can
/// repaint just that cell.
pub trait UndoState {
    fn undo_description(&self) -> Option<String>;
    fn can_undo(&self) -> bool;
    fn undo(&mut self) -> Result<Option<CellPos>>;

    fn redo_description(&self) -> Option<String>;
    fn can_redo(&self) -> bool;
    fn redo(&mut self) -> Result<Option<CellPos>>;
}

/// One overlay mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoAction {
    pub pos: CellPos,
    /// Pending color before the edit, `None` if the cell had no pending edit.
    pub previous: Option<ColorIndex>,
    pub new: ColorIndex,
}

impl UndoAction {
    pub fn description(&self) -> String {
        format!("Draw pixel {}", self.pos)
    }
}

/// Linear undo/redo history.
#[derive(Debug, Default, Clone)]
pub struct UndoHistory {
    undo_stack: Vec<UndoAction>,
    redo_stack: Vec<UndoAction>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new edit. Invalidates everything that could have been redone.
    pub fn push(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }

    pub fn pop_undo(&mut self) -> Option<UndoAction> {
        self.undo_stack.pop()
    }

    /// Puts a redone action back without touching the redo stack.
    pub fn push_undo(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
    }

    pub fn push_redo(&mut self, action: UndoAction) {
        self.redo_stack.push(action);
    }

    pub fn pop_redo(&mut self) -> Option<UndoAction> {
        self.redo_stack.pop()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(UndoAction::description)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(UndoAction::description)
    }

    /// Forgets everything that could be redone.
    pub fn clear_redo(&mut self) {
        self.redo_stack.clear();
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(x: u32, new: ColorIndex) -> UndoAction {
        UndoAction {
            pos: CellPos::new(x, 0),
            previous: None,
            new,
        }
    }

    #[test]
    fn push_clears_redo() {
        let mut history = UndoHistory::new();
        history.push(action(0, 1));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.push(action(1, 2));
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn push_undo_keeps_redo() {
        let mut history = UndoHistory::new();
        history.push_redo(action(0, 1));
        history.push_redo(action(1, 1));
        let redone = history.pop_redo().unwrap();
        history.push_undo(redone);
        assert_eq!(history.redo_len(), 1);
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn descriptions_name_the_cell() {
        let mut history = UndoHistory::new();
        assert_eq!(history.undo_description(), None);
        history.push(action(7, 1));
        assert_eq!(history.undo_description().as_deref(), Some("Draw pixel (7, 0)"));
    }
}
