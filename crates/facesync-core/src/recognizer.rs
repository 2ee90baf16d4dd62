//! Face recognizer seam.
//!
//! Detection and encoding happen outside this crate. A [`Recognizer`] turns a
//! media file into face records; [`CommandRecognizer`] delegates to an
//! external program that prints them as JSON.

use crate::types::NewFace;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecognizerError {
    /// The input file is missing or cannot be read. Sync passes skip these.
    #[error("unreadable input {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("recognizer command not configured")]
    NotConfigured,
    #[error("failed to run recognizer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("recognizer failed on {path}: {stderr}")]
    Failed { path: String, stderr: String },
    #[error("bad recognizer output for {path}: {source}")]
    BadOutput {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RecognizerError {
    /// Errors that concern one input file and should not abort a run.
    pub fn is_per_file(&self) -> bool {
        matches!(self, RecognizerError::Unreadable { .. })
    }
}

/// Produces face records for one media file.
pub trait Recognizer {
    fn recognize(&mut self, filename: &str) -> Result<Vec<NewFace>, RecognizerError>;
}

/// Runs `program args... <file>` and parses stdout as a JSON array of faces.
///
/// Exit status 2 from the program marks the input as unreadable.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

const EXIT_UNREADABLE: i32 = 2;

impl CommandRecognizer {
    /// Build from a command line split into program and arguments.
    pub fn new(command: &[String]) -> Result<Self, RecognizerError> {
        let (program, args) = command.split_first().ok_or(RecognizerError::NotConfigured)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Recognizer for CommandRecognizer {
    fn recognize(&mut self, filename: &str) -> Result<Vec<NewFace>, RecognizerError> {
        let path = Path::new(filename);
        if let Err(e) = std::fs::metadata(path) {
            return Err(RecognizerError::Unreadable {
                path: filename.to_string(),
                reason: e.to_string(),
            });
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|source| RecognizerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if output.status.code() == Some(EXIT_UNREADABLE) {
                return Err(RecognizerError::Unreadable {
                    path: filename.to_string(),
                    reason: stderr,
                });
            }
            return Err(RecognizerError::Failed {
                path: filename.to_string(),
                stderr,
            });
        }

        let faces: Vec<NewFace> =
            serde_json::from_slice(&output.stdout).map_err(|source| RecognizerError::BadOutput {
                path: filename.to_string(),
                source,
            })?;
        tracing::debug!(filename, faces = faces.len(), "recognized");
        Ok(faces)
    }
}
