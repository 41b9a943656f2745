use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use termdock_pty::{
    event_channel, EventReceiver, NativePtySpawner, PtySpawner, SessionEvent, SessionId,
    TermSize, TerminalSession,
};

use crate::config::{MuxConfig, ProjectSettings};
use crate::error::MuxError;
use crate::factory::SessionFactory;
use crate::layout::{Orientation, Pane, SwapOutcome};
use crate::workspace::Workspace;

/// Manages the terminal sessions of every open workspace.
///
/// The `Multiplexer` is owned by a single control thread, which performs
/// every create/switch/close/split operation and drains session events via
/// [`next_event`](Self::next_event). Each session's process runs on its own;
/// its output reaches the control thread tagged with the session ID.
///
/// At most one workspace is focused, and only the focused workspace may be
/// split. Dropping the multiplexer kills every session.
pub struct Multiplexer {
    factory: SessionFactory,
    workspaces: HashMap<PathBuf, Workspace>,
    focused: Option<PathBuf>,
    events: EventReceiver,
}

impl Multiplexer {
    /// Create a multiplexer that spawns real shells.
    pub fn new(config: MuxConfig) -> Self {
        Self::with_spawner(config, Arc::new(NativePtySpawner))
    }

    pub fn with_spawner(config: MuxConfig, spawner: Arc<dyn PtySpawner>) -> Self {
        let (tx, rx) = event_channel();
        Self {
            factory: SessionFactory::new(spawner, tx, config),
            workspaces: HashMap::new(),
            focused: None,
            events: rx,
        }
    }

    pub fn config(&self) -> &MuxConfig {
        self.factory.config()
    }

    /// Open (or re-open) a project and focus it.
    ///
    /// A workspace without tabs gets its first one, `Terminal 1`, in the
    /// project root. Settings apply to sessions created from now on. Returns
    /// the active session.
    pub fn open_workspace(
        &mut self,
        root: &Path,
        settings: ProjectSettings,
    ) -> Result<SessionId, MuxError> {
        self.focus_workspace(root);

        let ws = self
            .workspaces
            .entry(root.to_path_buf())
            .or_insert_with(|| Workspace::new(root, ProjectSettings::default()));
        ws.set_settings(settings);

        if let Some(id) = ws.registry().active_id() {
            return Ok(id);
        }
        ws.create_tab(&mut self.factory, root, Some("Terminal 1".to_string()))
    }

    /// Make `root` the focused workspace. Leaving a workspace ends its split
    /// view; its sessions stay open in the background.
    pub fn focus_workspace(&mut self, root: &Path) {
        for (path, ws) in self.workspaces.iter_mut() {
            if path.as_path() != root && ws.exit_split() {
                log::debug!("left split view in {}", path.display());
            }
        }
        self.focused = Some(root.to_path_buf());
    }

    pub fn focused_workspace(&self) -> Option<&Path> {
        self.focused.as_deref()
    }

    pub fn workspace(&self, root: &Path) -> Option<&Workspace> {
        self.workspaces.get(root)
    }

    pub fn workspace_roots(&self) -> impl Iterator<Item = &Path> {
        self.workspaces.keys().map(PathBuf::as_path)
    }

    pub fn session(&self, id: SessionId) -> Option<&TerminalSession> {
        self.workspaces.values().find_map(|ws| ws.session(id))
    }

    /// Open a new tab in `cwd`, registering the workspace if needed.
    pub fn create_session(
        &mut self,
        root: &Path,
        cwd: &Path,
        name: Option<String>,
    ) -> Result<SessionId, MuxError> {
        let ws = self
            .workspaces
            .entry(root.to_path_buf())
            .or_insert_with(|| Workspace::new(root, ProjectSettings::default()));
        ws.create_tab(&mut self.factory, cwd, name)
    }

    pub fn switch_session(&mut self, root: &Path, index: usize) {
        if let Some(ws) = self.workspaces.get_mut(root) {
            ws.switch_to(index);
        }
    }

    pub fn close_session(&mut self, root: &Path, index: usize) -> bool {
        self.workspaces
            .get_mut(root)
            .is_some_and(|ws| ws.close_tab(index))
    }

    pub fn rename_session(&mut self, root: &Path, index: usize, name: impl Into<String>) -> bool {
        self.workspaces
            .get_mut(root)
            .is_some_and(|ws| ws.rename_tab(index, name))
    }

    pub fn move_session(&mut self, root: &Path, from: usize, to: usize) -> bool {
        self.workspaces
            .get_mut(root)
            .is_some_and(|ws| ws.move_tab(from, to))
    }

    /// Split `primary` with `secondary`, or with a new session when `None`.
    /// Focuses the workspace.
    pub fn split_session(
        &mut self,
        root: &Path,
        primary: SessionId,
        secondary: Option<SessionId>,
        orientation: Orientation,
    ) -> Result<bool, MuxError> {
        if !self.workspaces.contains_key(root) {
            return Ok(false);
        }
        self.focus_workspace(root);
        match self.workspaces.get_mut(root) {
            Some(ws) => ws.enter_split(&mut self.factory, primary, secondary, orientation),
            None => Ok(false),
        }
    }

    /// Toggle split view the way the split buttons do. Focuses the workspace.
    pub fn toggle_split(&mut self, root: &Path, orientation: Orientation) -> Result<(), MuxError> {
        if !self.workspaces.contains_key(root) {
            return Ok(());
        }
        self.focus_workspace(root);
        match self.workspaces.get_mut(root) {
            Some(ws) => ws.toggle_split(&mut self.factory, orientation),
            None => Ok(()),
        }
    }

    pub fn exit_split(&mut self, root: &Path) -> bool {
        self.workspaces
            .get_mut(root)
            .is_some_and(Workspace::exit_split)
    }

    pub fn swap_pane(&mut self, root: &Path, pane: Pane, id: SessionId) -> SwapOutcome {
        match self.workspaces.get_mut(root) {
            Some(ws) => ws.swap_into(pane, id),
            None => SwapOutcome::Unchanged,
        }
    }

    pub fn set_split_ratio(&mut self, root: &Path, ratio: f32) -> bool {
        self.workspaces
            .get_mut(root)
            .is_some_and(|ws| ws.set_split_ratio(ratio))
    }

    /// Resize one session wherever it lives.
    pub fn resize_session(&mut self, id: SessionId, size: TermSize) -> bool {
        self.workspaces
            .values_mut()
            .any(|ws| ws.resize_session(id, size))
    }

    /// Resize the active session of `root`.
    pub fn resize_active(&mut self, root: &Path, size: TermSize) {
        if let Some(ws) = self.workspaces.get_mut(root) {
            ws.resize_active(size);
        }
    }

    /// Deliver input typed into `origin`, fanning out in broadcast mode.
    pub fn send_input(&self, root: &Path, origin: SessionId, data: &[u8]) {
        if let Some(ws) = self.workspaces.get(root) {
            ws.route_input(origin, data);
        }
    }

    /// Flip broadcast mode for `root` and return the new state.
    pub fn toggle_broadcast(&mut self, root: &Path) -> bool {
        self.workspaces
            .get_mut(root)
            .is_some_and(Workspace::toggle_broadcast)
    }

    /// Kill every session of `root` and forget the workspace.
    pub fn kill_workspace(&mut self, root: &Path) -> bool {
        let Some(mut ws) = self.workspaces.remove(root) else {
            return false;
        };
        let count = ws.registry().len();
        ws.kill_all();
        if self.focused.as_deref() == Some(root) {
            self.focused = None;
        }
        log::info!("killed {count} session(s) in {}", root.display());
        true
    }

    /// Kill every session of every workspace.
    pub fn shutdown(&mut self) {
        let roots: Vec<PathBuf> = self.workspaces.keys().cloned().collect();
        for root in roots {
            self.kill_workspace(&root);
        }
    }

    /// Wait for the next output or exit event from any session.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.events.recv().await?;
        self.observe(&event);
        Some(event)
    }

    /// Take the next pending event without waiting.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        let event = self.events.try_recv().ok()?;
        self.observe(&event);
        Some(event)
    }

    fn observe(&mut self, event: &SessionEvent) {
        let SessionEvent::Exited { id, code } = *event else {
            return;
        };
        let close = self.config().close_on_exit;
        if let Some(ws) = self.workspaces.values_mut().find(|ws| ws.contains(id)) {
            ws.handle_exit(id, code, close);
        }
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
