//! Seams to the host platform: where UI snapshots come from and where back
//! presses and notifications go.

pub mod tree;

pub use tree::{Bounds, ScreenSnapshot, UiElement, Walk};

use std::sync::Arc;

/// Read access to the current foreground UI.
pub trait ElementTreeSource: Send {
    /// The latest foreground snapshot, or `None` when the host could not
    /// provide one (transient; the tick is skipped).
    fn foreground_snapshot(&self) -> Option<Arc<ScreenSnapshot>>;
}

/// Global "navigate back" action. Fire-and-forget and safe to repeat.
pub trait BackAction: Send + Sync {
    fn invoke_back(&self);
}

/// Transient on-screen message. Must never block or fail back into the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
