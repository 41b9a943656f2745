use std::io;
use std::path::PathBuf;

use termdock_pty::PtyError;
use thiserror::Error;

/// Errors surfaced by the multiplexer. Everything else degrades to a no-op.
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("failed to start terminal session: {0}")]
    Spawn(#[from] PtyError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
