//! Per-session I/O threads.
//!
//! Each session gets two dedicated OS threads because PTY reads and writes
//! both block. The reader forwards output as session events; the writer drains
//! an input queue, so a process that stops reading its input never stalls the
//! control thread. The reader and the child's exit status are owned by the
//! reader thread directly (not behind the session mutex). Output is sent in the
//! order it is read, and the exit event is always the last event the thread
//! sends.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::pty::{ChildWaiter, PtyControl};
use crate::session::{EventSender, SessionEvent, SessionId};

/// Control half of a session, shared with the startup timer and I/O thread.
pub(crate) struct PtyState {
    pub control: Box<dyn PtyControl>,
    /// Cleared on kill or once the process has exited; all I/O stops after.
    pub alive: bool,
}

pub(crate) type SharedPty = Arc<Mutex<PtyState>>;

/// Queue of input chunks for a session's writer thread.
pub(crate) type InputSender = mpsc::UnboundedSender<Vec<u8>>;
pub(crate) type InputReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

pub(crate) fn lock(shared: &SharedPty) -> std::sync::MutexGuard<'_, PtyState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start the writer for a session. It runs until every [`InputSender`] is
/// dropped or the PTY stops accepting input.
pub(crate) fn start_writer_thread(
    id: SessionId,
    writer: Box<dyn Write + Send>,
    input: InputReceiver,
) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("pty-write-{id}"))
        .spawn(move || write_loop(id, writer, input))
        .map(|_| ())
}

fn write_loop(id: SessionId, mut writer: Box<dyn Write + Send>, mut input: InputReceiver) {
    while let Some(data) = input.blocking_recv() {
        if let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) {
            log::debug!("session {id}: input closed: {e}");
            break;
        }
    }
}

type ReadHalves = (Box<dyn Read + Send>, Box<dyn ChildWaiter>);

/// Start the read loop for a session on a dedicated OS thread.
///
/// If the thread cannot be started the process is killed and reaped here.
pub(crate) fn start_io_thread(
    id: SessionId,
    shared: SharedPty,
    reader: Box<dyn Read + Send>,
    child: Box<dyn ChildWaiter>,
    events: EventSender,
) -> io::Result<()> {
    // The halves go through a slot so they are still ours if spawn fails.
    let slot: Arc<Mutex<Option<ReadHalves>>> = Arc::new(Mutex::new(Some((reader, child))));
    let handoff = Arc::clone(&slot);
    let thread_shared = Arc::clone(&shared);

    let spawned = thread::Builder::new()
        .name(format!("pty-io-{id}"))
        .spawn(move || {
            let halves = handoff.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some((reader, child)) = halves {
                io_loop(id, thread_shared, reader, child, events);
            }
        });

    if let Err(e) = spawned {
        let halves = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some((_reader, child)) = halves {
            reap_unstarted(id, &shared, child);
        }
        return Err(e);
    }
    Ok(())
}

/// Kill a process whose reader thread never ran and collect its exit status.
pub(crate) fn reap_unstarted(id: SessionId, shared: &SharedPty, mut child: Box<dyn ChildWaiter>) {
    {
        let mut state = lock(shared);
        state.alive = false;
        if let Err(e) = state.control.kill() {
            log::warn!("session {id}: {e}");
        }
    }
    if let Err(e) = child.wait() {
        log::warn!("session {id}: failed to collect exit status: {e}");
    }
}

fn io_loop(
    id: SessionId,
    shared: SharedPty,
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn ChildWaiter>,
    events: EventSender,
) {
    let mut buf = vec![0u8; 65536];

    loop {
        // Blocks until data is available or the PTY closes.
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            // EIO once the child side of the PTY is gone.
            Err(_) => break,
        };

        // Keep draining even with no listener, so the child never blocks on
        // a full PTY buffer and is reaped below.
        let _ = events.send(SessionEvent::Output {
            id,
            data: buf[..n].to_vec(),
        });
    }

    let code = match child.wait() {
        Ok(code) => code,
        Err(e) => {
            log::warn!("session {id}: failed to collect exit status: {e}");
            1
        }
    };

    // Flip the flag before announcing the exit so no write can follow it.
    lock(&shared).alive = false;

    log::debug!("session {id} exited with code {code}");
    let _ = events.send(SessionEvent::Exited { id, code });
}

/// Queue `command` followed by a carriage return once `delay` has passed,
/// unless the session was killed or exited in the meantime.
pub(crate) fn start_startup_timer(
    id: SessionId,
    shared: SharedPty,
    input: InputSender,
    command: String,
    delay: Duration,
) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("pty-startup-{id}"))
        .spawn(move || {
            thread::sleep(delay);

            if !lock(&shared).alive {
                return;
            }
            if input.send(format!("{command}\r").into_bytes()).is_err() {
                log::debug!("session {id}: startup command not delivered");
            }
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeSpawner;
    use crate::pty::{PtySpawner, SpawnCommand, SpawnedPty, TermSize};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Instant;

    fn spawn_fake(spawner: &FakeSpawner) -> SpawnedPty {
        spawner
            .spawn(&SpawnCommand {
                program: "/bin/fake-sh".to_string(),
                args: Vec::new(),
                cwd: PathBuf::from("/"),
                env: BTreeMap::new(),
                size: TermSize::default(),
            })
            .unwrap()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    #[test]
    fn test_reap_unstarted_kills_and_waits() {
        let spawner = FakeSpawner::new();
        let SpawnedPty { control, child, .. } = spawn_fake(&spawner);
        let shared: SharedPty = Arc::new(Mutex::new(PtyState {
            control,
            alive: true,
        }));

        reap_unstarted(1, &shared, child);

        let process = spawner.process(0).unwrap();
        assert!(!lock(&shared).alive);
        assert!(process.was_killed());
        assert!(process.has_exited());
    }

    #[test]
    fn test_writer_preserves_order_and_stops_on_exit() {
        let spawner = FakeSpawner::new();
        let SpawnedPty { writer, .. } = spawn_fake(&spawner);
        let process = spawner.process(0).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        start_writer_thread(1, writer, rx).unwrap();

        tx.send(b"a".to_vec()).unwrap();
        tx.send(b"b".to_vec()).unwrap();
        tx.send(b"c".to_vec()).unwrap();
        assert!(wait_for(|| process.input_string() == "abc"));

        process.exit(0);
        let _ = tx.send(b"late".to_vec());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(process.input_string(), "abc");
    }
}
