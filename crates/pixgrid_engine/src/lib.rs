#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_lossless,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]
//! Client-side engine for a shared, finite pixel canvas.
//!
//! The engine keeps a versioned replica of the remote canvas ([`PixelGrid`]),
//! an overlay of unsaved edits with undo/redo ([`EditState`]), the view
//! transform ([`Viewport`]) and the commit/resync protocol that keeps the
//! overlay and the remote truth eventually consistent ([`Engine`]).

mod error;
pub use error::*;

mod position;
pub use position::*;

mod palette;
pub use palette::*;

mod grid;
pub use grid::*;

pub mod edit;
pub use edit::*;

mod viewport;
pub use viewport::*;

mod credits;
pub use credits::*;

mod units;
pub use units::*;

pub mod remote;
pub use remote::*;

mod fetcher;
pub use fetcher::*;

mod single_flight;
pub use single_flight::*;

mod commit;
pub use commit::*;

mod events;
pub use events::*;

mod config;
pub use config::*;

mod engine;
pub use engine::*;
