use std::sync::Arc;

use termdock_pty::{EventSender, PtyError, PtySpawner, SessionId, TerminalSession};

use crate::config::{MuxConfig, SessionConfig};

/// Spawns sessions with unique IDs, all reporting into one event channel.
pub(crate) struct SessionFactory {
    spawner: Arc<dyn PtySpawner>,
    events: EventSender,
    config: MuxConfig,
    next_id: SessionId,
}

impl SessionFactory {
    pub fn new(spawner: Arc<dyn PtySpawner>, events: EventSender, config: MuxConfig) -> Self {
        Self {
            spawner,
            events,
            config,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Spawn a session. IDs are only consumed by successful spawns and are
    /// never handed out twice.
    pub fn spawn(
        &mut self,
        name: String,
        config: &SessionConfig,
        first_in_workspace: bool,
    ) -> Result<TerminalSession, PtyError> {
        let id = self.next_id;
        let options = self.config.session_options(config, first_in_workspace);
        let session = TerminalSession::create(
            id,
            name,
            &config.cwd,
            &options,
            self.spawner.as_ref(),
            self.events.clone(),
        )?;
        self.next_id += 1;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_factory;
    use std::path::PathBuf;

    #[test]
    fn test_ids_increment_and_skip_failures() {
        let (mut factory, spawner, _rx) = fake_factory();
        let config = SessionConfig {
            cwd: PathBuf::from("/p"),
            ..SessionConfig::default()
        };

        let a = factory.spawn("a".to_string(), &config, true).unwrap();
        spawner.fail_program("/bin/broken");
        let broken = SessionConfig {
            shell: Some("/bin/broken".to_string()),
            ..config.clone()
        };
        assert!(factory.spawn("x".to_string(), &broken, false).is_err());
        let b = factory.spawn("b".to_string(), &config, false).unwrap();

        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(spawner.spawn_count(), 2);
    }

    #[test]
    fn test_spawn_uses_config_shell() {
        let (mut factory, spawner, _rx) = fake_factory();
        let config = SessionConfig {
            cwd: PathBuf::from("/p"),
            ..SessionConfig::default()
        };

        let _session = factory.spawn("a".to_string(), &config, false).unwrap();

        let process = spawner.process(0).unwrap();
        assert_eq!(process.command().program, "/bin/test-sh");
        assert_eq!(process.command().cwd, PathBuf::from("/p"));
        assert_eq!(factory.config().cols, 80);
    }
}
