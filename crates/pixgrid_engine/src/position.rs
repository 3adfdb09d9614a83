use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Coordinate of a single canvas cell.
///
/// Used as the overlay key, so two distinct cells can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CellPos {
    pub x: u32,
    pub y: u32,
}

impl CellPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Converts a linear cursor into a coordinate of a row-major grid.
    pub fn from_offset(offset: usize, width: u32) -> Self {
        let width = width.max(1) as usize;
        Self {
            x: (offset % width) as u32,
            y: (offset / width) as u32,
        }
    }

    /// Linear cursor of this cell in a row-major grid of the given width.
    pub fn to_offset(self, width: u32) -> usize {
        self.y as usize * width as usize + self.x as usize
    }

    pub fn is_inside(self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

impl From<(u32, u32)> for CellPos {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_conversion_wraps_rows() {
        assert_eq!(CellPos::from_offset(0, 1000), CellPos::new(0, 0));
        assert_eq!(CellPos::from_offset(10_000, 1000), CellPos::new(0, 10));
        assert_eq!(CellPos::from_offset(10_000, 3), CellPos::new(1, 3333));
        assert_eq!(CellPos::new(1, 3333).to_offset(3), 10_000);
    }

    #[test]
    fn inside_checks_both_axes() {
        assert!(CellPos::new(9, 4).is_inside(10, 5));
        assert!(!CellPos::new(10, 4).is_inside(10, 5));
        assert!(!CellPos::new(0, 5).is_inside(10, 5));
    }
}
