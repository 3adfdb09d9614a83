use crate::{BACKGROUND, CellPos, ColorIndex, EngineError, Result};

/// Committed-state cache of the remote canvas.
///
/// The buffer is row-major and only ever overwritten by fetched data, never by
/// local edits. `version` increases once per completed resync so readers can
/// tell whether they need to repaint.
#[derive(Debug, Default, Clone)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    buffer: Vec<ColorIndex>,
    version: u64,
}

impl PixelGrid {
    /// Empty grid, sized later by [`PixelGrid::initialize`].
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the buffer has been allocated.
    pub fn is_initialized(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Allocates the zero filled buffer.
    ///
    /// Sizing twice with the same dimensions is a no-op, resizing is refused.
    pub fn initialize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        if self.is_initialized() {
            if self.width == width && self.height == height {
                return Ok(());
            }
            return Err(EngineError::DimensionMismatch {
                width: self.width,
                height: self.height,
                new_width: width,
                new_height: height,
            });
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(EngineError::InvalidDimensions { width, height })?;
        self.width = width;
        self.height = height;
        self.buffer = vec![BACKGROUND; len];
        Ok(())
    }

    /// Overwrites `colors.len()` contiguous cells starting at the linear cursor `offset`.
    pub fn write_range(&mut self, offset: usize, colors: &[ColorIndex]) -> Result<()> {
        if !self.is_initialized() {
            return Err(EngineError::NotInitialized);
        }
        let capacity = self.buffer.len();
        let Some(end) = offset.checked_add(colors.len()).filter(|end| *end <= capacity) else {
            return Err(EngineError::OutOfBounds {
                offset,
                len: colors.len(),
                capacity,
            });
        };
        self.buffer[offset..end].copy_from_slice(colors);
        Ok(())
    }

    /// Marks the buffer as refreshed and returns the new version.
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Number of completed resyncs.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True if the grid changed since a reader observed `seen_version`.
    pub fn is_newer_than(&self, seen_version: u64) -> bool {
        self.version > seen_version
    }

    /// Width in cells, 0 before initialization.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells, 0 before initialization.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`, `None` before initialization.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.is_initialized().then_some((self.width, self.height))
    }

    /// Number of cells in the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True before initialization.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The whole row-major buffer.
    pub fn cells(&self) -> &[ColorIndex] {
        &self.buffer
    }

    /// Whether `pos` lies on the canvas.
    pub fn contains(&self, pos: CellPos) -> bool {
        self.is_initialized() && pos.is_inside(self.width, self.height)
    }

    /// Committed color at `pos`, `None` off the canvas.
    pub fn get(&self, pos: CellPos) -> Option<ColorIndex> {
        if !self.contains(pos) {
            return None;
        }
        self.buffer.get(pos.to_offset(self.width)).copied()
    }

    /// Fails with [`EngineError::CellOutOfRange`] unless `pos` is on the canvas.
    pub fn check_bounds(&self, pos: CellPos) -> Result<()> {
        if !self.is_initialized() {
            return Err(EngineError::NotInitialized);
        }
        if !pos.is_inside(self.width, self.height) {
            return Err(EngineError::CellOutOfRange {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
