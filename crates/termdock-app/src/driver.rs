//! Interactive loop: stdin lines in, visible terminal output out.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use termdock_mux::{Multiplexer, MuxError, Pane, SessionEvent, SessionId, SwapOutcome};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::commands::{self, Command};

enum Input {
    Line(Option<String>),
    Event(Option<SessionEvent>),
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Read stdin lines on a plain OS thread.
///
/// A blocked stdin read cannot be cancelled, so it must not live on the
/// runtime: the driver would otherwise wait for one more line before exiting.
pub fn stdin_lines() -> io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

pub struct Driver {
    mux: Multiplexer,
    root: PathBuf,
}

impl Driver {
    pub fn new(mux: Multiplexer, root: PathBuf) -> Self {
        Self { mux, root }
    }

    /// Run until `:quit`, end of input, or every session has exited.
    pub async fn run<W>(
        mut self,
        mut lines: mpsc::UnboundedReceiver<String>,
        mut out: W,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            let input = tokio::select! {
                line = lines.recv() => Input::Line(line),
                event = self.mux.next_event() => Input::Event(event),
            };

            match input {
                Input::Line(None) => break,
                Input::Line(Some(line)) => match commands::parse(&line) {
                    Ok(command) => {
                        if self.execute(command) == Flow::Quit {
                            break;
                        }
                    }
                    Err(msg) => eprintln!("{msg}"),
                },
                Input::Event(None) => break,
                Input::Event(Some(SessionEvent::Output { id, data })) => {
                    if self.is_visible(id) {
                        out.write_all(&data).await?;
                        out.flush().await?;
                    }
                }
                Input::Event(Some(SessionEvent::Exited { id, code })) => {
                    eprintln!("[session {id} exited with code {code}]");
                    if !self.any_alive() {
                        log::info!("all sessions in {} have exited", self.root.display());
                        break;
                    }
                }
            }
        }

        self.mux.shutdown();
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Flow {
        let root = self.root.clone();
        let result: Result<(), MuxError> = match command {
            Command::Input(text) => {
                if let Some(id) = self.active_id() {
                    self.mux.send_input(&root, id, text.as_bytes());
                }
                Ok(())
            }
            Command::New(name) => self.mux.create_session(&root, &root, name).map(|_| ()),
            Command::Switch(index) => {
                self.mux.switch_session(&root, index);
                Ok(())
            }
            Command::Close(index) => {
                let index = index.or_else(|| self.active_index());
                if !index.is_some_and(|i| self.mux.close_session(&root, i)) {
                    eprintln!("cannot close that tab");
                }
                Ok(())
            }
            Command::Split(orientation) => self.mux.toggle_split(&root, orientation),
            Command::Unsplit => {
                self.mux.exit_split(&root);
                Ok(())
            }
            Command::Swap => {
                let secondary = self
                    .mux
                    .workspace(&root)
                    .and_then(|ws| ws.layout().split().map(|s| s.secondary()));
                let outcome = match secondary {
                    Some(id) => self.mux.swap_pane(&root, Pane::Primary, id),
                    None => SwapOutcome::Unchanged,
                };
                if outcome == SwapOutcome::Unchanged {
                    eprintln!("not in split view");
                }
                Ok(())
            }
            Command::Broadcast => {
                let on = self.mux.toggle_broadcast(&root);
                eprintln!("broadcast {}", if on { "on" } else { "off" });
                Ok(())
            }
            Command::Rename(name) => {
                if let Some(index) = self.active_index() {
                    self.mux.rename_session(&root, index, name);
                }
                Ok(())
            }
            Command::Move { from, to } => {
                if !self.mux.move_session(&root, from, to) {
                    eprintln!("cannot move tab {} to {}", from + 1, to + 1);
                }
                Ok(())
            }
            Command::Resize(size) => {
                self.mux.resize_active(&root, size);
                Ok(())
            }
            Command::List => {
                self.list();
                Ok(())
            }
            Command::Quit => return Flow::Quit,
        };

        if let Err(e) = result {
            eprintln!("error: {e}");
        }
        Flow::Continue
    }

    fn list(&self) {
        let Some(ws) = self.mux.workspace(&self.root) else {
            return;
        };
        let active = ws.registry().active_id();
        for (i, session) in ws.registry().iter().enumerate() {
            let marker = if Some(session.id()) == active { '*' } else { ' ' };
            let pane = match ws.layout().pane_of(session.id()) {
                Some(Pane::Primary) => " [primary]",
                Some(Pane::Secondary) => " [secondary]",
                None => "",
            };
            let status = match session.exit_code() {
                Some(code) => format!(" (exited {code})"),
                None => String::new(),
            };
            eprintln!("{marker} {} {}{pane}{status}", i + 1, session.name());
        }
        if ws.is_broadcasting() {
            eprintln!("  broadcast on");
        }
    }

    fn active_id(&self) -> Option<SessionId> {
        self.mux.workspace(&self.root)?.registry().active_id()
    }

    fn active_index(&self) -> Option<usize> {
        self.mux.workspace(&self.root)?.registry().active_index()
    }

    /// The active tab and both panes of a split are on screen.
    fn is_visible(&self, id: SessionId) -> bool {
        let Some(ws) = self.mux.workspace(&self.root) else {
            return false;
        };
        ws.registry().active_id() == Some(id) || ws.layout().contains(id)
    }

    fn any_alive(&self) -> bool {
        self.mux
            .workspace(&self.root)
            .is_some_and(|ws| ws.registry().iter().any(|s| s.is_alive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use termdock_mux::{MuxConfig, ProjectSettings};
    use termdock_pty::fake::FakeSpawner;

    fn driver() -> (Driver, FakeSpawner) {
        let spawner = FakeSpawner::new();
        let mut mux = Multiplexer::with_spawner(MuxConfig::default(), Arc::new(spawner.clone()));
        let root = PathBuf::from("/proj");
        mux.open_workspace(&root, ProjectSettings::default()).unwrap();
        (Driver::new(mux, root), spawner)
    }

    async fn run(driver: Driver, lines: mpsc::UnboundedReceiver<String>) -> Vec<u8> {
        let mut out = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), driver.run(lines, &mut out))
            .await
            .expect("driver did not return")
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_returns_once_every_session_exited_with_input_open() {
        let (driver, spawner) = driver();
        // The sender stays alive: input never reaches end of file.
        let (_input, lines) = mpsc::unbounded_channel();
        let process = spawner.process(0).unwrap();
        process.emit(b"bye\r\n");
        process.exit(0);

        let out = run(driver, lines).await;

        assert_eq!(out, b"bye\r\n");
    }

    #[tokio::test]
    async fn test_quit_kills_every_session() {
        let (driver, spawner) = driver();
        let (input, lines) = mpsc::unbounded_channel();
        input.send(":new logs".to_string()).unwrap();
        input.send(":quit".to_string()).unwrap();

        run(driver, lines).await;

        assert_eq!(spawner.spawn_count(), 2);
        assert!(spawner.processes().iter().all(|p| p.was_killed()));
    }

    #[tokio::test]
    async fn test_end_of_input_stops_the_loop() {
        let (driver, spawner) = driver();
        let (input, lines) = mpsc::unbounded_channel::<String>();
        drop(input);

        run(driver, lines).await;

        assert!(spawner.process(0).unwrap().was_killed());
    }

    #[tokio::test]
    async fn test_background_output_is_not_shown() {
        let (driver, spawner) = driver();
        let (input, lines) = mpsc::unbounded_channel();
        input.send(":new".to_string()).unwrap();

        let task = tokio::spawn(run(driver, lines));
        let first = spawner.process(0).unwrap();
        while spawner.spawn_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let second = spawner.process(1).unwrap();
        first.emit(b"hidden");
        second.emit(b"shown");
        tokio::time::sleep(Duration::from_millis(50)).await;
        first.exit(0);
        second.exit(0);

        let out = task.await.unwrap();
        assert_eq!(out, b"shown");
    }
}
