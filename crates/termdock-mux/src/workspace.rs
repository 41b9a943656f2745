//! One opened project: its tabs, its split view, and its broadcast flag.

use std::path::{Path, PathBuf};

use termdock_pty::{SessionId, TermSize, TerminalSession};

use crate::config::ProjectSettings;
use crate::error::MuxError;
use crate::factory::SessionFactory;
use crate::layout::{Orientation, Pane, PaneLayout, Split, SwapOutcome, Toggle};
use crate::registry::SessionRegistry;
use crate::router::BroadcastRouter;

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    settings: ProjectSettings,
    registry: SessionRegistry,
    layout: PaneLayout,
    router: BroadcastRouter,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, settings: ProjectSettings) -> Self {
        Self {
            root: root.into(),
            settings,
            registry: SessionRegistry::new(),
            layout: PaneLayout::new(),
            router: BroadcastRouter::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Replace the settings used for sessions created from now on.
    pub fn set_settings(&mut self, settings: ProjectSettings) {
        self.settings = settings;
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &PaneLayout {
        &self.layout
    }

    pub fn is_broadcasting(&self) -> bool {
        self.router.is_enabled()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.registry.position(id).is_some()
    }

    pub fn session(&self, id: SessionId) -> Option<&TerminalSession> {
        self.registry.by_id(id)
    }

    /// Open a new tab in `cwd` and make it active.
    ///
    /// The project's startup command is only sent by the first tab.
    pub(crate) fn create_tab(
        &mut self,
        factory: &mut SessionFactory,
        cwd: &Path,
        name: Option<String>,
    ) -> Result<SessionId, MuxError> {
        let first = self.registry.is_empty();
        let name = name.unwrap_or_else(|| format!("Terminal {}", self.registry.len() + 1));
        let config = self.settings.session_config(cwd);

        let session = factory.spawn(name, &config, first)?;
        let id = session.id();
        self.registry.push(session);
        Ok(id)
    }

    /// Activate the tab at `index`.
    ///
    /// While split, activating a tab that is not on screen swaps it into the
    /// pane holding the currently active session instead of leaving split view.
    pub fn switch_to(&mut self, index: usize) {
        let Some(target) = self.registry.get(index).map(TerminalSession::id) else {
            log::debug!("{}: no tab at index {index}", self.root.display());
            return;
        };

        if let Some(split) = self.layout.split().copied() {
            if !split.contains(target) {
                let pane = match self.registry.active_id() {
                    Some(active) if active == split.primary() => Pane::Primary,
                    _ => Pane::Secondary,
                };
                self.layout.swap_into(pane, target);
            }
        }

        self.registry.set_active(index);
    }

    /// Close the tab at `index` and kill its process.
    ///
    /// The last remaining tab is never closed. Closing a paned tab leaves
    /// split view and activates the session from the other pane first.
    pub fn close_tab(&mut self, index: usize) -> bool {
        if self.registry.len() <= 1 {
            log::debug!("{}: keeping the last tab open", self.root.display());
            return false;
        }
        let Some(id) = self.registry.get(index).map(TerminalSession::id) else {
            return false;
        };

        if let Some(pane) = self.layout.pane_of(id) {
            let remaining = self.layout.exit().map(|split| split.get(pane.other()));
            if let Some(position) = remaining.and_then(|r| self.registry.position(r)) {
                self.registry.set_active(position);
            }
        }

        let Some(mut session) = self.registry.remove(index) else {
            return false;
        };
        session.kill();
        log::info!("closed session {id} in {}", self.root.display());
        true
    }

    pub fn rename_tab(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.registry.get_mut(index) {
            Some(session) => {
                session.set_name(name);
                true
            }
            None => false,
        }
    }

    pub fn move_tab(&mut self, from: usize, to: usize) -> bool {
        self.registry.move_session(from, to)
    }

    /// Show `primary` and `secondary` side by side (or stacked).
    ///
    /// Without a `secondary`, a new tab is opened in the project root to fill
    /// it. Any current split is replaced in one step. Returns `false` (and
    /// changes nothing) when either session is unknown or both are the same.
    pub(crate) fn enter_split(
        &mut self,
        factory: &mut SessionFactory,
        primary: SessionId,
        secondary: Option<SessionId>,
        orientation: Orientation,
    ) -> Result<bool, MuxError> {
        if !self.contains(primary) {
            return Ok(false);
        }
        let secondary = match secondary {
            Some(id) if self.contains(id) => id,
            Some(_) => return Ok(false),
            None => {
                let root = self.root.clone();
                self.create_tab(factory, &root, None)?
            }
        };

        let Some(split) = Split::new(primary, secondary, orientation) else {
            log::debug!("{}: refusing to split session {primary} with itself", self.root.display());
            return Ok(false);
        };
        self.layout.enter(split);

        // Focus lands on the primary pane.
        if let Some(position) = self.registry.position(primary) {
            self.registry.set_active(position);
        }
        Ok(true)
    }

    /// Leave split view. Both sessions stay open as tabs.
    pub fn exit_split(&mut self) -> bool {
        self.layout.exit().is_some()
    }

    /// Split request from the UI: same orientation toggles off, another
    /// orientation re-arranges the current pair, and when unsplit the active
    /// tab is split with a fresh one.
    pub(crate) fn toggle_split(
        &mut self,
        factory: &mut SessionFactory,
        orientation: Orientation,
    ) -> Result<(), MuxError> {
        match self.layout.toggle(orientation) {
            Toggle::Exit => {
                self.layout.exit();
            }
            Toggle::Reorient(split) => self.layout.enter(split),
            Toggle::Enter => {
                if let Some(primary) = self.registry.active_id() {
                    self.enter_split(factory, primary, None, orientation)?;
                }
            }
        }
        Ok(())
    }

    /// Put session `id` into `pane`. See [`PaneLayout::swap_into`].
    pub fn swap_into(&mut self, pane: Pane, id: SessionId) -> SwapOutcome {
        if !self.contains(id) {
            return SwapOutcome::Unchanged;
        }
        self.layout.swap_into(pane, id)
    }

    pub fn set_split_ratio(&mut self, ratio: f32) -> bool {
        self.layout.set_ratio(ratio)
    }

    /// Send input typed into `origin` to its target sessions.
    pub fn route_input(&self, origin: SessionId, data: &[u8]) {
        for id in self.router.targets(origin, &self.registry.ids()) {
            if let Some(session) = self.registry.by_id(id) {
                session.write(data);
            }
        }
    }

    /// Flip broadcast mode and return the new state.
    pub fn toggle_broadcast(&mut self) -> bool {
        self.router.toggle()
    }

    pub fn resize_session(&mut self, id: SessionId, size: TermSize) -> bool {
        match self.registry.by_id_mut(id) {
            Some(session) => {
                session.resize(size);
                true
            }
            None => false,
        }
    }

    pub fn resize_active(&mut self, size: TermSize) {
        if let Some(session) = self.registry.active_mut() {
            session.resize(size);
        }
    }

    /// Record a process exit. With `close` the tab is closed as well,
    /// subject to the usual last-tab rule.
    pub(crate) fn handle_exit(&mut self, id: SessionId, code: u32, close: bool) {
        if let Some(session) = self.registry.by_id_mut(id) {
            session.record_exit(code);
        }
        if close {
            if let Some(index) = self.registry.position(id) {
                self.close_tab(index);
            }
        }
    }

    /// Kill every session and leave split view.
    pub fn kill_all(&mut self) {
        self.layout.exit();
        for mut session in self.registry.drain() {
            session.kill();
        }
    }
}
