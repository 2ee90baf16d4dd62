use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use facesync_cli::{inspect, logging};
use facesync_core::store::open_face_store;
use facesync_core::types::Commit;
use facesync_core::{Config, FaceStore};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facedb", about = "Inspect and maintain the face database")]
struct Cli {
    /// Action to perform
    #[arg(short, long, value_enum)]
    action: ActionArg,

    /// Config file (default: $FACESYNC_CONFIG or $XDG_CONFIG_HOME/facesync/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File or folder the action applies to
    #[arg(short, long)]
    file: Option<String>,

    /// Also write logs to this file
    #[arg(short, long)]
    logfile: Option<PathBuf>,

    /// Comma separated names for find_files_by_names
    #[arg(short, long, value_delimiter = ',')]
    names: Vec<String>,

    /// Don't modify the database
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum ActionArg {
    GetNames,
    GetFaces,
    PrintDetails,
    PrintStat,
    GetFolders,
    GetFiles,
    FindFilesByNames,
    RemoveFile,
    UpdateFilepaths,
}

impl Cli {
    fn file(&self) -> Result<&str> {
        match self.file.as_deref() {
            Some(f) => Ok(f),
            None => bail!("--file is required for this action"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.logfile.as_deref())?;

    let config = Config::load_or_default(cli.config.as_deref())?;
    let db = open_face_store(&config.files.db, cli.dry_run)
        .with_context(|| format!("failed to open {}", config.files.db.display()))?;

    match cli.action {
        ActionArg::GetNames => {
            let names = db.db().get_names(cli.file()?)?;
            println!("{}", serde_json::to_string_pretty(&names)?);
        }
        ActionArg::GetFaces => {
            let files = db.get_faces(cli.file()?)?.collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        ActionArg::PrintDetails => {
            let filename = cli.file()?;
            if !db.db().file_exists(filename)? {
                println!("File not found");
                return Ok(());
            }
            let mut faces = db.get_faces(filename)?;
            match faces.next().transpose()? {
                Some(file) => print!("{}", inspect::details(&file)),
                None => println!("File: {filename}"),
            }
        }
        ActionArg::PrintStat => {
            print!("{}", inspect::stats(&db.db().stats()?));
            let split = config.recognition.encodings_split;
            print!("{}", inspect::encodings(db.get_all_encodings(split)?));
        }
        ActionArg::GetFolders => {
            for folder in db.db().get_folders()? {
                println!("{folder}");
            }
        }
        ActionArg::GetFiles => {
            for file in db.get_files(cli.file.as_deref())? {
                println!("{file}");
            }
        }
        ActionArg::FindFilesByNames => {
            if cli.names.is_empty() {
                bail!("--names is required for find_files_by_names");
            }
            for file in db.find_files_by_names(&cli.names, cli.file.as_deref())? {
                println!("{file}");
            }
        }
        ActionArg::RemoveFile => {
            db.remove(cli.file()?, Commit::Now)?;
        }
        ActionArg::UpdateFilepaths => {
            let root = cli.file()?;
            let update = db.update_filepaths(root, Path::new(root))?;
            tracing::info!(removed = update.removed, moved = update.moved, "file paths updated");
        }
    }
    Ok(())
}
