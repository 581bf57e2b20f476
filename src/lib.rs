//! Freehand sketch canvas with snapshot-based undo/redo.
//!
//! [`DrawingSession`] is the embeddable component: feed it pointer and key
//! events, read back its [`DrawingSurface`], export it as PNG.

pub mod config;
pub mod export;
pub mod history;
pub mod input;
pub mod logging;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod utility;

pub use history::History;
pub use input::{InputEvent, Key, KeyChord, PointerTracker, ShortcutAction, Shortcuts, SurfaceBounds};
pub use session::{DrawingSession, ExportBackground, ListenerId, SessionConfig, WHITE_RGB};
pub use stroke::{paint_segment, Point, StrokeStyle};
pub use surface::{DrawingSurface, Snapshot};
