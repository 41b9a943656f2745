//! Environment computation for spawned shells.
//!
//! Every session starts from a snapshot of the parent environment, overlays
//! the user's `KEY=VALUE` overrides, forces the terminal capability variables,
//! and appends common tool install directories to `PATH` so CLIs installed via
//! Homebrew, npm, or nvm resolve even when the GUI was launched without a login
//! environment.

use std::collections::BTreeMap;

/// Terminal type advertised to every session.
pub const TERM: &str = "xterm-256color";

/// Color capability advertised to every session.
pub const COLORTERM: &str = "truecolor";

/// Parse newline-delimited `KEY=VALUE` overrides.
///
/// Blank lines, lines without `=`, and lines with an empty key are ignored.
/// Key and value are trimmed; the value may itself contain `=`.
pub fn parse_env_overrides(text: &str) -> BTreeMap<String, String> {
    let mut overrides = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        overrides.insert(key.to_string(), value.trim().to_string());
    }

    overrides
}

/// Tool directories appended to `PATH`, in order.
///
/// Entries under the home directory are skipped when `home` is unknown.
pub fn extra_path_dirs(home: Option<&str>) -> Vec<String> {
    let mut dirs = vec![
        "/usr/local/bin".to_string(),
        "/opt/homebrew/bin".to_string(),
    ];
    if let Some(home) = home.filter(|h| !h.is_empty()) {
        dirs.push(format!("{home}/.local/bin"));
        dirs.push(format!("{home}/.npm-global/bin"));
        dirs.push(format!("{home}/.nvm/versions/node/*/bin"));
    }
    dirs.push("/opt/local/bin".to_string());
    dirs
}

/// Append the tool directories to `base`, dropping empty segments and
/// skipping directories already present.
pub fn extend_path(base: Option<&str>, home: Option<&str>) -> String {
    let mut segments: Vec<String> = base
        .unwrap_or_default()
        .split(':')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    for dir in extra_path_dirs(home) {
        if !segments.contains(&dir) {
            segments.push(dir);
        }
    }

    segments.join(":")
}

/// Compute the full environment for a session.
///
/// `PATH` is always derived from the parent environment's `PATH`; an override
/// of `PATH` is replaced by the extended parent value.
pub fn build_environment<I>(
    base: I,
    overrides: &BTreeMap<String, String>,
    home: Option<&str>,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = base.into_iter().collect();
    let path = extend_path(env.get("PATH").map(String::as_str), home);

    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.insert("TERM".to_string(), TERM.to_string());
    env.insert("COLORTERM".to_string(), COLORTERM.to_string());
    env.insert("PATH".to_string(), path);

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_ignores_blank_and_malformed_lines() {
        let parsed = parse_env_overrides("FOO=bar\nBAZ=qux\nmalformed\n\n");

        let mut expected = BTreeMap::new();
        expected.insert("FOO".to_string(), "bar".to_string());
        expected.insert("BAZ".to_string(), "qux".to_string());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_trims_and_splits_on_first_equals() {
        let parsed = parse_env_overrides("  KEY =  a=b  \r\n=orphan\n");

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("KEY").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_later_lines_win() {
        let parsed = parse_env_overrides("A=1\nA=2");
        assert_eq!(parsed.get("A").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_extend_path_appends_in_order() {
        let path = extend_path(Some("/usr/bin:/bin"), Some("/home/x"));
        assert_eq!(
            path,
            "/usr/bin:/bin:/usr/local/bin:/opt/homebrew/bin:/home/x/.local/bin:\
             /home/x/.npm-global/bin:/home/x/.nvm/versions/node/*/bin:/opt/local/bin"
        );
    }

    #[test]
    fn test_extend_path_drops_empty_segments_and_duplicates() {
        let path = extend_path(Some(":/usr/local/bin::/bin:"), None);
        assert_eq!(path, "/usr/local/bin:/bin:/opt/homebrew/bin:/opt/local/bin");
    }

    #[test]
    fn test_extend_path_without_base() {
        let path = extend_path(None, None);
        assert_eq!(path, "/usr/local/bin:/opt/homebrew/bin:/opt/local/bin");
    }

    #[test]
    fn test_build_environment_layers() {
        let base = vars(&[("PATH", "/bin"), ("TERM", "dumb"), ("EDITOR", "vi")]);
        let overrides = parse_env_overrides("EDITOR=nvim\nCOLORTERM=no\nPATH=/nope");

        let env = build_environment(base, &overrides, None);

        assert_eq!(env["EDITOR"], "nvim");
        assert_eq!(env["TERM"], TERM);
        assert_eq!(env["COLORTERM"], COLORTERM);
        assert_eq!(env["PATH"], "/bin:/usr/local/bin:/opt/homebrew/bin:/opt/local/bin");
    }
}
