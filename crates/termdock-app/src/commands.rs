//! Line commands understood by the driver.
//!
//! Plain lines are typed into the active terminal. Lines starting with `:`
//! control the multiplexer; `::` escapes a literal leading colon.

use termdock_mux::{Orientation, TermSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Text for the active terminal, already terminated with `\r`.
    Input(String),
    New(Option<String>),
    /// Zero-based tab index.
    Switch(usize),
    /// Close the given zero-based tab, or the active one.
    Close(Option<usize>),
    Split(Orientation),
    Unsplit,
    /// Exchange the two panes.
    Swap,
    Broadcast,
    Rename(String),
    Move { from: usize, to: usize },
    Resize(TermSize),
    List,
    Quit,
}

pub const HELP: &str = "\
commands:
  :new [NAME]        open a tab
  :tab N             switch to tab N
  :close [N]         close tab N (default: active)
  :split h|v         toggle split view
  :unsplit           leave split view
  :swap              exchange the two panes
  :broadcast         toggle typing into every tab
  :rename NAME       rename the active tab
  :move FROM TO      reorder tabs
  :resize COLS ROWS  resize the active tab
  :list              list tabs
  :quit              close everything and exit
  ::TEXT             send TEXT starting with ':'";

/// Parse one input line.
pub fn parse(line: &str) -> Result<Command, String> {
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Command::Input(format!("{line}\r")));
    };
    if rest.starts_with(':') {
        return Ok(Command::Input(format!("{rest}\r")));
    }

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (name, args.as_slice()) {
        ("new", []) => Ok(Command::New(None)),
        ("new", name) => Ok(Command::New(Some(name.join(" ")))),
        ("tab", [n]) => tab_index(n).map(Command::Switch),
        ("close", []) => Ok(Command::Close(None)),
        ("close", [n]) => tab_index(n).map(|i| Command::Close(Some(i))),
        ("split", [dir]) => orientation(dir).map(Command::Split),
        ("unsplit", []) => Ok(Command::Unsplit),
        ("swap", []) => Ok(Command::Swap),
        ("broadcast", []) => Ok(Command::Broadcast),
        ("rename", name) if !name.is_empty() => Ok(Command::Rename(name.join(" "))),
        ("move", [from, to]) => Ok(Command::Move {
            from: tab_index(from)?,
            to: tab_index(to)?,
        }),
        ("resize", [cols, rows]) => Ok(Command::Resize(TermSize::new(
            number(cols)?,
            number(rows)?,
        ))),
        ("list", []) => Ok(Command::List),
        ("quit" | "q", []) => Ok(Command::Quit),
        ("" | "help", _) => Err(HELP.to_string()),
        _ => Err(format!("unknown command `:{rest}`, try :help")),
    }
}

/// Tabs are numbered from 1 for people and from 0 for the multiplexer.
fn tab_index(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("`{s}` is not a tab number")),
    }
}

fn number(s: &str) -> Result<u16, String> {
    s.parse::<u16>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| format!("`{s}` is not a valid size"))
}

fn orientation(s: &str) -> Result<Orientation, String> {
    match s {
        "h" | "horizontal" => Ok(Orientation::Horizontal),
        "v" | "vertical" => Ok(Orientation::Vertical),
        _ => Err(format!("`{s}` is not a direction, use h or v")),
    }
}
