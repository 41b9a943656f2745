use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::env::{build_environment, parse_env_overrides};
use crate::error::PtyError;
use crate::io_thread::{self, InputSender, PtyState, SharedPty};
use crate::pty::{default_shell, PtySpawner, SpawnCommand, SpawnedPty, TermSize};

/// Unique identifier for a terminal session. Never reused by a multiplexer.
pub type SessionId = u64;

/// Events a session emits toward the presentation layer.
///
/// For a given session, `Output` events arrive in the order the process
/// produced them and `Exited` is always the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Output { id: SessionId, data: Vec<u8> },
    Exited { id: SessionId, code: u32 },
}

impl SessionEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::Output { id, .. } | SessionEvent::Exited { id, .. } => *id,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create the channel every session of a multiplexer reports into.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// How to launch a session's shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Shell program; `$SHELL` (then `/bin/sh`) when unset or blank.
    pub shell: Option<String>,
    /// Newline-delimited `KEY=VALUE` overrides.
    pub env_overrides: Option<String>,
    /// Line typed into the shell after `startup_delay`, first session only.
    pub startup_command: Option<String>,
    pub first_in_workspace: bool,
    /// Pass `-l` so the shell loads the user's profile.
    pub login: bool,
    pub size: TermSize,
    pub startup_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            shell: None,
            env_overrides: None,
            startup_command: None,
            first_in_workspace: false,
            login: true,
            size: TermSize::default(),
            startup_delay: Duration::from_millis(500),
        }
    }
}

impl SessionOptions {
    /// The startup line to send, if this session should send one.
    fn startup_line(&self) -> Option<String> {
        if !self.first_in_workspace {
            return None;
        }
        self.startup_command
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// One terminal tab: a PTY-backed process plus its identity and name.
///
/// The backing process is owned exclusively by the session. Output and exit
/// are reported on the [`EventSender`] the session was created with; input and
/// geometry go through [`write`](Self::write) and [`resize`](Self::resize),
/// both of which quietly do nothing once the process is gone.
pub struct TerminalSession {
    id: SessionId,
    name: String,
    cwd: PathBuf,
    program: String,
    size: TermSize,
    exit_code: Option<u32>,
    pty: SharedPty,
    /// Dropped on kill, which ends the writer thread.
    input: Option<InputSender>,
}

impl TerminalSession {
    /// Spawn a shell for a new session and start forwarding its output.
    ///
    /// Fails with [`PtyError::Spawn`] when the shell cannot be launched; no
    /// process is left behind in that case.
    pub fn create(
        id: SessionId,
        name: impl Into<String>,
        cwd: &Path,
        options: &SessionOptions,
        spawner: &dyn PtySpawner,
        events: EventSender,
    ) -> Result<Self, PtyError> {
        let command = spawn_command(cwd, options);
        let SpawnedPty {
            control,
            writer,
            reader,
            child,
        } = spawner.spawn(&command)?;

        let pty: SharedPty = Arc::new(Mutex::new(PtyState {
            control,
            alive: true,
        }));

        let (input, input_rx) = mpsc::unbounded_channel();
        if let Err(e) = io_thread::start_writer_thread(id, writer, input_rx) {
            io_thread::reap_unstarted(id, &pty, child);
            return Err(PtyError::Spawn(format!("failed to start input thread: {e}")));
        }

        // On failure the process is already reaped and the writer ends with `input`.
        if let Err(e) = io_thread::start_io_thread(id, Arc::clone(&pty), reader, child, events) {
            return Err(PtyError::Spawn(format!("failed to start I/O thread: {e}")));
        }

        if let Some(line) = options.startup_line() {
            let timer = io_thread::start_startup_timer(
                id,
                Arc::clone(&pty),
                input.clone(),
                line,
                options.startup_delay,
            );
            if let Err(e) = timer {
                log::warn!("session {id}: could not schedule startup command: {e}");
            }
        }

        log::info!(
            "spawned session {id} ({}) in {}",
            command.program,
            command.cwd.display()
        );

        Ok(Self {
            id,
            name: name.into(),
            cwd: command.cwd,
            program: command.program,
            size: command.size,
            exit_code: None,
            pty,
            input: Some(input),
        })
    }

    /// Returns the session's unique identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The shell program the session was launched with.
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn size(&self) -> TermSize {
        self.size
    }

    /// `false` once the session was killed or its process exited.
    pub fn is_alive(&self) -> bool {
        io_thread::lock(&self.pty).alive
    }

    /// Exit code, once the exit event has been recorded.
    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    /// Record the code carried by this session's exit event.
    pub fn record_exit(&mut self, code: u32) {
        self.exit_code = Some(code);
    }

    /// Queue raw input for the process. Never blocks; does nothing once the
    /// process is gone.
    pub fn write(&self, data: &[u8]) {
        if data.is_empty() || !self.is_alive() {
            return;
        }
        let Some(input) = &self.input else {
            return;
        };
        if input.send(data.to_vec()).is_err() {
            log::debug!("session {}: dropped {} input bytes", self.id, data.len());
        }
    }

    /// Propagate new geometry. Repeating the current size is free.
    pub fn resize(&mut self, size: TermSize) {
        if size == self.size {
            return;
        }
        let mut state = io_thread::lock(&self.pty);
        if !state.alive {
            return;
        }
        match state.control.resize(size) {
            Ok(()) => self.size = size,
            Err(e) => log::debug!("session {}: resize ignored: {e}", self.id),
        }
    }

    /// Request termination and mark the session dead immediately.
    ///
    /// OS teardown happens asynchronously; the I/O thread still reports the
    /// exit event once the process is gone.
    pub fn kill(&mut self) {
        let mut state = io_thread::lock(&self.pty);
        if !state.alive {
            return;
        }
        state.alive = false;
        self.input = None;
        if let Err(e) = state.control.kill() {
            log::warn!("session {}: {e}", self.id);
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.kill();
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cwd", &self.cwd)
            .field("program", &self.program)
            .field("size", &self.size)
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

/// Build the spawn command: shell, login flag, cwd, and full environment.
fn spawn_command(cwd: &Path, options: &SessionOptions) -> SpawnCommand {
    let program = options
        .shell
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_shell);

    let args = if options.login {
        vec!["-l".to_string()]
    } else {
        Vec::new()
    };

    let home = std::env::var("HOME").ok();
    let cwd = if cwd.as_os_str().is_empty() {
        home.as_deref().map_or_else(|| PathBuf::from("/"), PathBuf::from)
    } else {
        cwd.to_path_buf()
    };

    let overrides = parse_env_overrides(options.env_overrides.as_deref().unwrap_or_default());
    let env = build_environment(std::env::vars(), &overrides, home.as_deref());

    SpawnCommand {
        program,
        args,
        cwd,
        env,
        size: options.size,
    }
}
