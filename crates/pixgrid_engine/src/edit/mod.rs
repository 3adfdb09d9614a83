//! Unsaved edits layered over the committed canvas.
//!
//! - `overlay.rs` - capacity bounded map of pending cell colors
//! - `undo_stack.rs` - linear undo/redo history of overlay mutations
//! - `state.rs` - the two combined; every mutation goes through here

mod overlay;
mod state;
mod undo_stack;

pub use overlay::*;
pub use state::*;
pub use undo_stack::*;
