//! termdock-mux: per-project terminal tabs, split view, and input broadcast.
//!
//! # Architecture
//!
//! - [`SessionRegistry`] — Ordered tabs of one workspace and the active tab.
//! - [`PaneLayout`] — Unsplit, or exactly two distinct sessions side by side or stacked.
//! - [`BroadcastRouter`] — Sends input to one session or to every session of a workspace.
//! - [`Workspace`] — One opened project: registry, layout, and broadcast flag.
//! - [`Multiplexer`] — Owns every workspace and drives all of the above from a
//!   single control thread.

pub mod config;
mod error;
mod factory;
pub mod layout;
mod multiplexer;
mod registry;
mod router;
#[cfg(test)]
mod test_support;
mod workspace;

pub use config::{load_json, MuxConfig, Profile, ProjectSettings, SessionConfig};
pub use error::{ConfigError, MuxError};
pub use layout::{Orientation, Pane, PaneLayout, Split, SwapOutcome, Toggle};
pub use multiplexer::Multiplexer;
pub use registry::SessionRegistry;
pub use router::BroadcastRouter;
pub use workspace::Workspace;

pub use termdock_pty::{SessionEvent, SessionId, TermSize, TerminalSession};
