//! In-memory PTY spawner for tests.
//!
//! [`FakeSpawner`] records every spawn, and each [`FakeProcess`] records the
//! input, resizes, and kill requests it receives. Tests drive the output side
//! with [`FakeProcess::emit`] and [`FakeProcess::exit`].

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::PtyError;
use crate::pty::{ChildWaiter, PtyControl, PtySpawner, SpawnCommand, SpawnedPty, TermSize};

/// Exit code reported for a fake process that was killed (128 + SIGHUP).
pub const KILLED_EXIT_CODE: u32 = 129;

#[derive(Default)]
struct SpawnerState {
    processes: Vec<FakeProcess>,
    failing: Vec<String>,
}

/// A [`PtySpawner`] that never touches the OS.
#[derive(Clone, Default)]
pub struct FakeSpawner {
    state: Arc<Mutex<SpawnerState>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later spawn of `program` fail with [`PtyError::Spawn`].
    pub fn fail_program(&self, program: impl Into<String>) {
        lock(&self.state).failing.push(program.into());
    }

    /// All processes spawned so far, in spawn order.
    pub fn processes(&self) -> Vec<FakeProcess> {
        lock(&self.state).processes.clone()
    }

    pub fn process(&self, index: usize) -> Option<FakeProcess> {
        lock(&self.state).processes.get(index).cloned()
    }

    pub fn spawn_count(&self) -> usize {
        lock(&self.state).processes.len()
    }
}

impl PtySpawner for FakeSpawner {
    fn spawn(&self, command: &SpawnCommand) -> Result<SpawnedPty, PtyError> {
        let mut state = lock(&self.state);
        if state.failing.contains(&command.program) {
            return Err(PtyError::Spawn(format!(
                "failed to spawn {}: No such file or directory",
                command.program
            )));
        }

        let (tx, rx) = mpsc::channel();
        let process = FakeProcess {
            command: command.clone(),
            state: Arc::new(Mutex::new(ProcessState {
                input: Vec::new(),
                resizes: Vec::new(),
                kill_requests: 0,
                input_held: false,
                output: Some(tx),
                exit_code: None,
            })),
        };
        state.processes.push(process.clone());

        Ok(SpawnedPty {
            control: Box::new(FakeControl(process.clone())),
            writer: Box::new(FakeWriter(process.clone())),
            reader: Box::new(FakeReader {
                rx,
                pending: Vec::new(),
            }),
            child: Box::new(FakeChild(process)),
        })
    }
}

struct ProcessState {
    input: Vec<u8>,
    resizes: Vec<TermSize>,
    kill_requests: usize,
    /// While set, writes block as if the process stopped reading its input.
    input_held: bool,
    /// Dropped on exit, which the reader observes as EOF.
    output: Option<Sender<Vec<u8>>>,
    exit_code: Option<u32>,
}

/// Handle onto one fake process.
#[derive(Clone)]
pub struct FakeProcess {
    command: SpawnCommand,
    state: Arc<Mutex<ProcessState>>,
}

impl FakeProcess {
    /// The command this process was spawned with.
    pub fn command(&self) -> &SpawnCommand {
        &self.command
    }

    /// Every byte written to the process so far.
    pub fn input(&self) -> Vec<u8> {
        lock(&self.state).input.clone()
    }

    pub fn input_string(&self) -> String {
        String::from_utf8_lossy(&self.input()).into_owned()
    }

    pub fn resizes(&self) -> Vec<TermSize> {
        lock(&self.state).resizes.clone()
    }

    pub fn kill_requests(&self) -> usize {
        lock(&self.state).kill_requests
    }

    pub fn was_killed(&self) -> bool {
        self.kill_requests() > 0
    }

    pub fn has_exited(&self) -> bool {
        lock(&self.state).exit_code.is_some()
    }

    /// Stop consuming input: writes block until [`release_input`](Self::release_input)
    /// or exit.
    pub fn hold_input(&self) {
        lock(&self.state).input_held = true;
    }

    pub fn release_input(&self) {
        lock(&self.state).input_held = false;
    }

    /// Produce output as if the process wrote `data` to its terminal.
    /// Ignored once the process has exited.
    pub fn emit(&self, data: &[u8]) {
        // An empty chunk would read as EOF.
        if data.is_empty() {
            return;
        }
        if let Some(tx) = &lock(&self.state).output {
            let _ = tx.send(data.to_vec());
        }
    }

    /// Terminate the process with `code`. Ignored if it already exited.
    pub fn exit(&self, code: u32) {
        let mut state = lock(&self.state);
        if state.exit_code.is_none() {
            state.exit_code = Some(code);
            state.output = None;
        }
    }
}

struct FakeControl(FakeProcess);

impl PtyControl for FakeControl {
    fn resize(&mut self, size: TermSize) -> Result<(), PtyError> {
        lock(&self.0.state).resizes.push(size);
        Ok(())
    }

    fn kill(&mut self) -> Result<(), PtyError> {
        lock(&self.0.state).kill_requests += 1;
        self.0.exit(KILLED_EXIT_CODE);
        Ok(())
    }
}

struct FakeWriter(FakeProcess);

impl Write for FakeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        loop {
            {
                let mut state = lock(&self.0.state);
                if state.exit_code.is_some() {
                    return Err(io::Error::from(io::ErrorKind::BrokenPipe));
                }
                if !state.input_held {
                    state.input.extend_from_slice(data);
                    return Ok(data.len());
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FakeChild(FakeProcess);

impl ChildWaiter for FakeChild {
    fn wait(&mut self) -> Result<u32, PtyError> {
        Ok(lock(&self.0.state).exit_code.unwrap_or(0))
    }
}

struct FakeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for FakeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
