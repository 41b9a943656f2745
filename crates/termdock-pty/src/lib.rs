//! termdock-pty: pseudo-terminal sessions for termdock.
//!
//! This crate sits between the OS (a real shell process on a PTY) and the
//! multiplexer. It spawns shells with the computed environment, reads their
//! output on a dedicated thread per session, and writes user input back.
//!
//! # Architecture
//!
//! - [`PtySpawner`] — Creates PTY processes; [`NativePtySpawner`] is the real one.
//! - [`TerminalSession`] — Owns one PTY process, its identity, and its name.
//! - [`SessionEvent`] — Output and exit notifications, tagged with the session ID.
//! - [`env`] — Environment computation shared by every spawned shell.

pub mod env;
mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
mod io_thread;
pub mod pty;
pub mod session;

pub use error::PtyError;
pub use pty::{
    default_shell, ChildWaiter, NativePtySpawner, PtyControl, PtySpawner, SpawnCommand,
    SpawnedPty, TermSize,
};
pub use session::{
    event_channel, EventReceiver, EventSender, SessionEvent, SessionId, SessionOptions,
    TerminalSession,
};
