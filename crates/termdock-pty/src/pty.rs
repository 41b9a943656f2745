use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};

use crate::error::PtyError;

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<TermSize> for PtySize {
    fn from(size: TermSize) -> Self {
        PtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// Everything needed to launch a process on a fresh pseudo-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete environment; the child inherits nothing else.
    pub env: BTreeMap<String, String>,
    pub size: TermSize,
}

/// Control half of a spawned PTY, owned by the session.
pub trait PtyControl: Send {
    /// Propagate new geometry to the process.
    fn resize(&mut self, size: TermSize) -> Result<(), PtyError>;

    /// Request termination. Does not wait for the process to exit.
    fn kill(&mut self) -> Result<(), PtyError>;
}

/// Exit-status half of a spawned PTY, owned by the I/O thread.
pub trait ChildWaiter: Send {
    /// Block until the process exits and return its exit code.
    fn wait(&mut self) -> Result<u32, PtyError>;
}

/// A freshly spawned PTY split into its control, input, output, and exit
/// halves.
pub struct SpawnedPty {
    pub control: Box<dyn PtyControl>,
    /// User input -> shell. May block while the process is not reading.
    pub writer: Box<dyn Write + Send>,
    pub reader: Box<dyn Read + Send>,
    pub child: Box<dyn ChildWaiter>,
}

/// Creates pseudo-terminal processes.
pub trait PtySpawner: Send + Sync {
    fn spawn(&self, command: &SpawnCommand) -> Result<SpawnedPty, PtyError>;
}

/// Spawns real processes through the platform PTY system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySpawner;

impl PtySpawner for NativePtySpawner {
    fn spawn(&self, command: &SpawnCommand) -> Result<SpawnedPty, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(command.size.into())
            .map_err(|e| PtyError::Spawn(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&command.program);
        cmd.args(&command.args);
        cmd.cwd(&command.cwd);
        cmd.env_clear();
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            PtyError::Spawn(format!("failed to spawn {}: {e}", command.program))
        })?;
        // Only the child may hold the slave side, so the reader sees EOF on exit.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Spawn(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Spawn(format!("failed to take writer: {e}")))?;

        let killer = child.clone_killer();

        Ok(SpawnedPty {
            control: Box::new(NativeControl {
                master: pair.master,
                killer,
            }),
            writer,
            reader,
            child: Box::new(NativeChild(child)),
        })
    }
}

struct NativeControl {
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl PtyControl for NativeControl {
    fn resize(&mut self, size: TermSize) -> Result<(), PtyError> {
        self.master
            .resize(size.into())
            .map_err(|e| PtyError::Resize(format!("{e}")))
    }

    fn kill(&mut self) -> Result<(), PtyError> {
        self.killer
            .kill()
            .map_err(|e| PtyError::Kill(format!("{e}")))
    }
}

struct NativeChild(Box<dyn Child + Send + Sync>);

impl ChildWaiter for NativeChild {
    fn wait(&mut self) -> Result<u32, PtyError> {
        let status = self.0.wait()?;
        Ok(status.exit_code())
    }
}

/// Returns the user's default shell, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}
