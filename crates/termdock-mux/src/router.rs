//! Input routing for a workspace: one session, or all of them in broadcast
//! mode.

use termdock_pty::SessionId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastRouter {
    enabled: bool,
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip broadcast mode and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Sessions that should receive input typed into `origin`.
    ///
    /// In broadcast mode every member receives it exactly once, the origin
    /// included; otherwise only the origin does.
    pub fn targets(&self, origin: SessionId, members: &[SessionId]) -> Vec<SessionId> {
        if !self.enabled {
            return vec![origin];
        }
        let mut targets = Vec::with_capacity(members.len());
        for &id in members {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_routes_to_origin_only() {
        let router = BroadcastRouter::new();
        assert_eq!(router.targets(2, &[1, 2, 3]), vec![2]);
    }

    #[test]
    fn test_enabled_routes_to_every_member_once() {
        let mut router = BroadcastRouter::new();
        assert!(router.toggle());
        assert_eq!(router.targets(1, &[1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(router.targets(1, &[1, 2, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_toggle_flips_back() {
        let mut router = BroadcastRouter::new();
        router.toggle();
        assert!(!router.toggle());
        assert!(!router.is_enabled());
    }
}
