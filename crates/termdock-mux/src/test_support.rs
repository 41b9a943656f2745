use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use termdock_pty::fake::FakeSpawner;
use termdock_pty::{
    event_channel, EventReceiver, EventSender, SessionEvent, SessionId, SessionOptions,
    TerminalSession,
};

use crate::config::MuxConfig;
use crate::factory::SessionFactory;

/// A session backed by a fake process, for tests that only need identity.
pub fn fake_session(spawner: &FakeSpawner, events: &EventSender, id: SessionId) -> TerminalSession {
    let options = SessionOptions {
        shell: Some("/bin/test-sh".to_string()),
        ..SessionOptions::default()
    };
    TerminalSession::create(
        id,
        format!("Terminal {id}"),
        Path::new("/tmp"),
        &options,
        spawner,
        events.clone(),
    )
    .expect("fake spawn cannot fail")
}

pub fn test_config() -> MuxConfig {
    MuxConfig {
        default_shell: Some("/bin/test-sh".to_string()),
        startup_delay_ms: 10,
        ..MuxConfig::default()
    }
}

pub fn fake_factory() -> (SessionFactory, FakeSpawner, EventReceiver) {
    let spawner = FakeSpawner::new();
    let (tx, rx) = event_channel();
    let factory = SessionFactory::new(Arc::new(spawner.clone()), tx, test_config());
    (factory, spawner, rx)
}

pub async fn recv(rx: &mut EventReceiver) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

/// Poll `condition` for up to three seconds.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
