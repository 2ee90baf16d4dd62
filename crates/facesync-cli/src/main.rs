use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use facesync_cli::logging;
use facesync_core::runner::{self, Action};
use facesync_core::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "facesync", about = "Propagate recognized faces to media catalog tags")]
struct Cli {
    /// Action to perform
    #[arg(short, long, value_enum)]
    action: ActionArg,

    /// Config file (default: $FACESYNC_CONFIG or $XDG_CONFIG_HOME/facesync/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(short, long)]
    logfile: Option<PathBuf>,

    /// Resync all files, not only unsynced ones (set_tags only)
    #[arg(short, long)]
    resync: bool,

    /// Don't modify either database
    #[arg(short, long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum ActionArg {
    SetTags,
    RemoveTags,
    SyncNew,
    SyncDeleted,
}

impl Cli {
    fn action(&self) -> Action {
        match self.action {
            ActionArg::SetTags => Action::SetTags {
                resync: self.resync,
            },
            ActionArg::RemoveTags => Action::RemoveTags,
            ActionArg::SyncNew => Action::SyncNew,
            ActionArg::SyncDeleted => Action::SyncDeleted,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.logfile.as_deref())?;

    let config = Config::load_or_default(cli.config.as_deref())?;
    let action = cli.action();
    let outcome = runner::run(&config, action, cli.dry_run)
        .with_context(|| format!("{} failed", action.name()))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
