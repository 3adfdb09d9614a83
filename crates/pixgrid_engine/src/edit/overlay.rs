use std::collections::HashMap;

use crate::{CellPos, ColorIndex, EngineError, Result};

/// Maximum number of unsaved cells, also the largest commit batch.
pub const MAX_BATCH: usize = 1000;

/// A pending edit: the color the user wants at `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingCell {
    pub pos: CellPos,
    pub color: ColorIndex,
}

impl PendingCell {
    pub const fn new(pos: CellPos, color: ColorIndex) -> Self {
        Self { pos, color }
    }
}

/// Capacity bounded map from cell to pending color.
///
/// `len() <= capacity()` holds after every operation.
#[derive(Debug, Clone)]
pub struct EditOverlay {
    cells: HashMap<CellPos, ColorIndex>,
    capacity: usize,
}

impl Default for EditOverlay {
    fn default() -> Self {
        Self::new(MAX_BATCH)
    }
}

impl EditOverlay {
    /// Empty overlay holding at most `capacity` cells.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: HashMap::new(),
            capacity,
        }
    }

    /// Maximum number of pending cells.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True if no new cell can be added.
    pub fn is_full(&self) -> bool {
        self.cells.len() >= self.capacity
    }

    /// Pending color at `pos`, if any.
    pub fn get(&self, pos: CellPos) -> Option<ColorIndex> {
        self.cells.get(&pos).copied()
    }

    /// Whether `pos` has a pending edit.
    pub fn contains(&self, pos: CellPos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Pending cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = PendingCell> + '_ {
        self.cells.iter().map(|(pos, color)| PendingCell::new(*pos, *color))
    }

    /// Whether `pos` could be inserted without breaking the capacity bound.
    pub fn accepts(&self, pos: CellPos) -> bool {
        self.contains(pos) || !self.is_full()
    }

    /// Sets `pos` to `color`, returning the previous pending color.
    pub(crate) fn insert(&mut self, pos: CellPos, color: ColorIndex) -> Result<Option<ColorIndex>> {
        if !self.accepts(pos) {
            return Err(EngineError::OverlayFull { capacity: self.capacity });
        }
        Ok(self.cells.insert(pos, color))
    }

    /// Drops the pending edit at `pos`.
    pub(crate) fn remove(&mut self, pos: CellPos) -> Option<ColorIndex> {
        self.cells.remove(&pos)
    }

    /// Drops every pending edit.
    pub(crate) fn clear(&mut self) {
        self.cells.clear();
    }

    /// All pending cells in row-major order.
    pub fn snapshot(&self) -> Vec<PendingCell> {
        let mut cells: Vec<PendingCell> = self.iter().collect();
        cells.sort_by_key(|cell| (cell.pos.y, cell.pos.x));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing() {
        let mut overlay = EditOverlay::new(2);
        assert_eq!(overlay.insert(CellPos::new(1, 1), 3).unwrap(), None);
        assert_eq!(overlay.insert(CellPos::new(1, 1), 4).unwrap(), Some(3));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn full_overlay_accepts_only_known_cells() {
        let mut overlay = EditOverlay::new(2);
        overlay.insert(CellPos::new(0, 0), 1).unwrap();
        overlay.insert(CellPos::new(1, 0), 1).unwrap();
        assert!(overlay.is_full());
        assert_eq!(
            overlay.insert(CellPos::new(2, 0), 1),
            Err(EngineError::OverlayFull { capacity: 2 })
        );
        assert!(overlay.insert(CellPos::new(1, 0), 5).is_ok());
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn snapshot_is_row_major() {
        let mut overlay = EditOverlay::default();
        overlay.insert(CellPos::new(5, 1), 1).unwrap();
        overlay.insert(CellPos::new(9, 0), 2).unwrap();
        overlay.insert(CellPos::new(0, 1), 3).unwrap();
        let order: Vec<CellPos> = overlay.snapshot().iter().map(|c| c.pos).collect();
        assert_eq!(order, vec![CellPos::new(9, 0), CellPos::new(0, 1), CellPos::new(5, 1)]);
    }
}
