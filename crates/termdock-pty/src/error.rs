use std::io;

use thiserror::Error;

/// Errors from PTY operations.
#[derive(Error, Debug)]
pub enum PtyError {
    /// The shell could not be launched (missing program, permission denied,
    /// no PTY available). A session that fails this way is never registered.
    #[error("PTY spawn failed: {0}")]
    Spawn(String),

    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("PTY resize failed: {0}")]
    Resize(String),

    #[error("PTY kill failed: {0}")]
    Kill(String),
}
