mod commands;
mod driver;

use std::path::PathBuf;

use clap::Parser;
use termdock_mux::{load_json, Multiplexer, MuxConfig, Profile, ProjectSettings};

use driver::Driver;

/// Terminal tabs, split view, and broadcast input for a project directory.
///
/// Plain lines are typed into the active tab; `:help` lists commands.
#[derive(Debug, Parser)]
#[command(name = "termdock", version, about)]
struct Args {
    /// Project directory to open (defaults to the current directory).
    dir: Option<PathBuf>,

    /// Project settings JSON (`shell`, `env`, `startup`).
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Profile JSON supplying fallback `shell` and `env`.
    #[arg(long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Multiplexer config JSON.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial terminal width.
    #[arg(long)]
    cols: Option<u16>,

    /// Initial terminal height.
    #[arg(long)]
    rows: Option<u16>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let root = match args.dir {
        Some(dir) => dir.canonicalize()?,
        None => std::env::current_dir().unwrap_or_else(|_| dirs_or_cwd()),
    };
    if !root.is_dir() {
        return Err(format!("{} is not a directory", root.display()).into());
    }

    let mut config: MuxConfig = match &args.config {
        Some(path) => load_json(path)?,
        None => MuxConfig::default(),
    };
    if let Some(cols) = args.cols.filter(|&c| c > 0) {
        config.cols = cols;
    }
    if let Some(rows) = args.rows.filter(|&r| r > 0) {
        config.rows = rows;
    }

    let profile: Option<Profile> = args.profile.as_deref().map(load_json::<Profile>).transpose()?;
    let settings: ProjectSettings = match &args.settings {
        Some(path) => load_json(path)?,
        None => ProjectSettings::default(),
    };

    let mut mux = Multiplexer::new(config);
    let id = mux.open_workspace(&root, settings.over_profile(profile.as_ref()))?;
    log::info!("opened {} (session {id})", root.display());

    let lines = driver::stdin_lines()?;
    Driver::new(mux, root).run(lines, tokio::io::stdout()).await?;
    Ok(())
}

/// Fallback directory when current_dir() fails.
fn dirs_or_cwd() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
