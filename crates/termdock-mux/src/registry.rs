use termdock_pty::{SessionId, TerminalSession};

/// Ordered tabs of one workspace plus the active tab.
///
/// Insertion order is tab order. `active` is a valid index whenever the
/// registry is non-empty, and [`remove`](Self::remove) never takes the last
/// session away.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<TerminalSession>,
    active: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TerminalSession> {
        self.sessions.iter()
    }

    /// Session IDs in tab order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(TerminalSession::id).collect()
    }

    pub fn get(&self, index: usize) -> Option<&TerminalSession> {
        self.sessions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TerminalSession> {
        self.sessions.get_mut(index)
    }

    pub fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    pub fn by_id(&self, id: SessionId) -> Option<&TerminalSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn by_id_mut(&mut self, id: SessionId) -> Option<&mut TerminalSession> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    /// Index of the active tab, or `None` when there are no tabs.
    pub fn active_index(&self) -> Option<usize> {
        (!self.sessions.is_empty()).then_some(self.active)
    }

    pub fn active(&self) -> Option<&TerminalSession> {
        self.sessions.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut TerminalSession> {
        self.sessions.get_mut(self.active)
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active().map(TerminalSession::id)
    }

    /// Append a session and make it active. Returns its index.
    pub fn push(&mut self, session: TerminalSession) -> usize {
        self.sessions.push(session);
        self.active = self.sessions.len() - 1;
        self.active
    }

    /// Make `index` active. Out-of-range indices are ignored.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.sessions.len() {
            return false;
        }
        self.active = index;
        true
    }

    /// Take the session at `index` out of the registry.
    ///
    /// Refused (returns `None`) when it is the only session or the index is out
    /// of range. The active index is kept as is unless it falls off the end, in
    /// which case the new last tab becomes active.
    pub fn remove(&mut self, index: usize) -> Option<TerminalSession> {
        if self.sessions.len() <= 1 || index >= self.sessions.len() {
            return None;
        }
        let session = self.sessions.remove(index);
        if self.active >= self.sessions.len() {
            self.active = self.sessions.len() - 1;
        }
        Some(session)
    }

    /// Move the tab at `from` to position `to`. The active session stays
    /// active, wherever it ends up.
    pub fn move_session(&mut self, from: usize, to: usize) -> bool {
        let len = self.sessions.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }
        let active_id = self.active_id();
        let session = self.sessions.remove(from);
        self.sessions.insert(to, session);
        if let Some(index) = active_id.and_then(|id| self.position(id)) {
            self.active = index;
        }
        true
    }

    /// Remove every session, leaving the registry empty.
    pub fn drain(&mut self) -> Vec<TerminalSession> {
        self.active = 0;
        std::mem::take(&mut self.sessions)
    }
}
