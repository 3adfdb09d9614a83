//! Unified error types for pixgrid_engine

use thiserror::Error;

/// Main error type for engine operations.
///
/// Every remote failure is converted into one of these before it leaves the
/// engine, so the presentation layer never sees a raw transport error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // === Remote reads ===
    #[error("Canvas metadata unavailable: {message}")]
    MetadataFetch { message: String },

    #[error("Credit balance unavailable: {message}")]
    CreditFetch { message: String },

    #[error("Pixel chunk at offset {offset} failed: {message}")]
    BufferFetch { offset: usize, message: String },

    // === Commit ===
    #[error("Save failed: {message}. {unsaved} pixels unsaved")]
    CommitTransport { message: String, unsaved: usize },

    #[error("Save interrupted: {message}")]
    CommitAborted { message: String },

    #[error("Nothing to save, place at least one pixel before saving")]
    NothingToCommit,

    #[error("Login to save your art")]
    NotSignedIn,

    #[error("Saving {needed} pixels needs {needed} credits but only {available} are available ({deficit} more needed)")]
    InsufficientCredits { needed: u64, available: u64, deficit: u64 },

    // === Editing ===
    #[error("At most {capacity} unsaved pixels are allowed, save before drawing more")]
    OverlayFull { capacity: usize },

    #[error("Cell ({x}, {y}) lies outside the {width}x{height} canvas")]
    CellOutOfRange { x: u32, y: u32, width: u32, height: u32 },

    // === Grid ===
    #[error("Canvas has not been sized yet")]
    NotInitialized,

    #[error("Invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Canvas is {width}x{height}, refusing to resize to {new_width}x{new_height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        new_width: u32,
        new_height: u32,
    },

    #[error("Writing {len} cells at offset {offset} exceeds the {capacity} cells of the canvas")]
    OutOfBounds { offset: usize, len: usize, capacity: usize },

    // === Configuration ===
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn metadata(msg: impl std::fmt::Display) -> Self {
        Self::MetadataFetch { message: msg.to_string() }
    }

    pub fn credits(msg: impl std::fmt::Display) -> Self {
        Self::CreditFetch { message: msg.to_string() }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig { message: msg.into() }
    }

    /// Advisory errors reject a user action without changing any state.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            Self::NothingToCommit | Self::NotSignedIn | Self::InsufficientCredits { .. } | Self::OverlayFull { .. } | Self::CellOutOfRange { .. }
        )
    }
}
