//! Configuration shapes: per-session input, saved project settings, terminal
//! profiles, and multiplexer defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use termdock_pty::{SessionOptions, TermSize};

use crate::error::ConfigError;

/// Configuration input for one session.
///
/// Field names are part of the saved-settings format and must not change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cwd: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Newline-delimited `KEY=VALUE` overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup: Option<String>,
}

/// Terminal settings saved for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Typed into the first terminal of the project once its shell is up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup: Option<String>,
}

/// A terminal profile providing shell and environment defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl ProjectSettings {
    /// Layer project settings over a profile: the profile supplies shell and
    /// env defaults, anything set on the project wins.
    pub fn over_profile(&self, profile: Option<&Profile>) -> ProjectSettings {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        ProjectSettings {
            shell: non_empty(&self.shell).or_else(|| profile.and_then(|p| non_empty(&p.shell))),
            env: non_empty(&self.env).or_else(|| profile.and_then(|p| non_empty(&p.env))),
            startup: self.startup.clone(),
        }
    }

    /// The session configuration for a terminal opened in `cwd`.
    pub fn session_config(&self, cwd: &Path) -> SessionConfig {
        SessionConfig {
            cwd: cwd.to_path_buf(),
            shell: self.shell.clone(),
            env: self.env.clone(),
            startup: self.startup.clone(),
        }
    }
}

/// Multiplexer-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Geometry a new session starts with, before the first resize.
    pub cols: u16,
    pub rows: u16,
    /// Delay before a startup command is typed into a new shell.
    pub startup_delay_ms: u64,
    /// Launch shells with `-l`.
    pub login_shell: bool,
    /// Shell used when neither project nor profile names one.
    /// `$SHELL`, then `/bin/sh`, when unset.
    pub default_shell: Option<String>,
    /// Close a tab when its process exits instead of leaving it inert.
    pub close_on_exit: bool,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            startup_delay_ms: 500,
            login_shell: true,
            default_shell: None,
            close_on_exit: false,
        }
    }
}

impl MuxConfig {
    pub fn initial_size(&self) -> TermSize {
        TermSize::new(self.cols, self.rows)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Spawn options for `config`. The startup command is only carried for
    /// the first session of a workspace.
    pub fn session_options(&self, config: &SessionConfig, first_in_workspace: bool) -> SessionOptions {
        SessionOptions {
            shell: config
                .shell
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| self.default_shell.clone()),
            env_overrides: config.env.clone(),
            startup_command: config.startup.clone().filter(|_| first_in_workspace),
            first_in_workspace,
            login: self.login_shell,
            size: self.initial_size(),
            startup_delay: self.startup_delay(),
        }
    }
}

/// Read a JSON settings file into `T`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_field_names() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"cwd": "/home/x", "shell": "/bin/zsh", "env": "A=1\nB=2", "startup": "make"}"#,
        )
        .unwrap();
        assert_eq!(config.cwd, PathBuf::from("/home/x"));
        assert_eq!(config.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(config.env.as_deref(), Some("A=1\nB=2"));
        assert_eq!(config.startup.as_deref(), Some("make"));

        let minimal: SessionConfig = serde_json::from_str(r#"{"cwd": "/"}"#).unwrap();
        assert_eq!(minimal.shell, None);
        assert_eq!(serde_json::to_string(&minimal).unwrap(), r#"{"cwd":"/"}"#);
    }

    #[test]
    fn test_project_overrides_profile() {
        let profile = Profile {
            name: Some("work".to_string()),
            shell: Some("/bin/bash".to_string()),
            env: Some("FROM=profile".to_string()),
        };
        let project = ProjectSettings {
            shell: None,
            env: Some("FROM=project".to_string()),
            startup: Some("npm start".to_string()),
        };

        let merged = project.over_profile(Some(&profile));
        assert_eq!(merged.shell.as_deref(), Some("/bin/bash"));
        assert_eq!(merged.env.as_deref(), Some("FROM=project"));
        assert_eq!(merged.startup.as_deref(), Some("npm start"));
    }

    #[test]
    fn test_blank_project_values_fall_back_to_profile() {
        let profile = Profile {
            shell: Some("/bin/fish".to_string()),
            ..Profile::default()
        };
        let project = ProjectSettings {
            shell: Some("  ".to_string()),
            ..ProjectSettings::default()
        };
        assert_eq!(
            project.over_profile(Some(&profile)).shell.as_deref(),
            Some("/bin/fish")
        );
        assert_eq!(project.over_profile(None).shell, None);
    }

    #[test]
    fn test_session_options_startup_only_first() {
        let config = MuxConfig::default();
        let session = SessionConfig {
            cwd: PathBuf::from("/p"),
            startup: Some("make".to_string()),
            ..SessionConfig::default()
        };

        let first = config.session_options(&session, true);
        assert_eq!(first.startup_command.as_deref(), Some("make"));
        assert!(first.first_in_workspace);
        assert!(first.login);
        assert_eq!(first.size, TermSize::new(80, 24));
        assert_eq!(first.startup_delay, Duration::from_millis(500));

        let later = config.session_options(&session, false);
        assert_eq!(later.startup_command, None);
    }

    #[test]
    fn test_default_shell_fallback() {
        let config = MuxConfig {
            default_shell: Some("/bin/zsh".to_string()),
            ..MuxConfig::default()
        };
        let options = config.session_options(&SessionConfig::default(), false);
        assert_eq!(options.shell.as_deref(), Some("/bin/zsh"));
    }

    #[test]
    fn test_mux_config_partial_json() {
        let config: MuxConfig = serde_json::from_str(r#"{"cols": 120, "close_on_exit": true}"#).unwrap();
        assert_eq!(config.initial_size(), TermSize::new(120, 24));
        assert!(config.close_on_exit);
        assert!(config.login_shell);
    }

    #[test]
    fn test_load_json_errors_name_the_file() {
        let missing = std::env::temp_dir().join("termdock-no-such-settings.json");
        let err = load_json::<ProjectSettings>(&missing).unwrap_err();
        assert!(err.to_string().contains("termdock-no-such-settings.json"));

        let bad = std::env::temp_dir().join(format!("termdock-bad-{}.json", std::process::id()));
        fs::write(&bad, "{ not json").unwrap();
        let err = load_json::<ProjectSettings>(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = fs::remove_file(&bad);
    }
}
