//! TOML configuration shared by the binaries and the daemon.
//!
//! ```toml
//! [files]
//! db = "/home/me/.local/share/facesync/faces.db"
//!
//! [catalog]
//! db = "/home/me/.local/share/facesync/catalog.db"
//! folders = ["/photos/2023/", "/photos/2024*"]
//!
//! [recognition]
//! names = ["alice", "bob"]
//! min_video_face_count = 10
//!
//! [recognizer]
//! command = ["face-recognize", "--json"]
//! ```

use crate::media;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: FilesSection,
    pub catalog: CatalogSection,
    pub recognition: RecognitionSection,
    pub recognizer: RecognizerSection,
}

/// Face store location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub db: PathBuf,
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            db: data_dir().join("faces.db"),
        }
    }
}

/// External media catalog and the folders kept in sync with it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub db: PathBuf,
    pub folders: Vec<String>,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            db: data_dir().join("catalog.db"),
            folders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionSection {
    /// Managed person names; only these become tags.
    pub names: Vec<String>,
    /// Distinct frames a name needs before a video is tagged with it.
    pub min_video_face_count: usize,
    /// Media extensions picked up by `sync_new`, with leading dot.
    pub extensions: Vec<String>,
    /// Number of shards for the cached encoding set.
    pub encodings_split: usize,
}

impl Default for RecognitionSection {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            min_video_face_count: 10,
            extensions: media::IMAGE_EXTS
                .iter()
                .chain(media::VIDEO_EXTS)
                .map(|e| e.to_string())
                .collect(),
            encodings_split: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecognizerSection {
    /// Program and arguments; the media path is appended.
    pub command: Vec<String>,
}

impl Config {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(path, &text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// A missing file at the default location yields the built-in defaults;
    /// an explicitly given path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::info!(path = %path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }
}

/// `$FACESYNC_CONFIG`, else `$XDG_CONFIG_HOME/facesync/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("FACESYNC_CONFIG") {
        return PathBuf::from(path);
    }
    xdg_dir("XDG_CONFIG_HOME", ".config")
        .join("facesync")
        .join("config.toml")
}

/// `$XDG_DATA_HOME/facesync`.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share").join("facesync")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(home_relative)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let text = r#"
            [files]
            db = "/data/faces.db"

            [catalog]
            db = "/data/catalog.db"
            folders = ["/photos/2023/", "/photos/2024*"]

            [recognition]
            names = ["alice", "bob"]
            min_video_face_count = 3
            extensions = [".jpg"]
            encodings_split = 4

            [recognizer]
            command = ["recognize", "--json"]
        "#;
        let config = Config::parse(Path::new("test.toml"), text).unwrap();
        assert_eq!(config.files.db, PathBuf::from("/data/faces.db"));
        assert_eq!(config.catalog.folders.len(), 2);
        assert_eq!(config.recognition.names, vec!["alice", "bob"]);
        assert_eq!(config.recognition.min_video_face_count, 3);
        assert_eq!(config.recognition.extensions, vec![".jpg"]);
        assert_eq!(config.recognition.encodings_split, 4);
        assert_eq!(config.recognizer.command, vec!["recognize", "--json"]);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::parse(Path::new("test.toml"), "[recognition]\nnames = [\"alice\"]\n")
            .unwrap();
        assert_eq!(config.recognition.names, vec!["alice"]);
        assert_eq!(config.recognition.min_video_face_count, 10);
        assert_eq!(config.recognition.encodings_split, 1);
        assert!(config.recognition.extensions.iter().any(|e| e == ".mp4"));
        assert!(config.files.db.ends_with("facesync/faces.db"));
        assert!(config.recognizer.command.is_empty());
    }

    #[test]
    fn test_bad_config_reports_path() {
        let err = Config::parse(Path::new("broken.toml"), "[files\n").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load_or_default(Some(&path)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[catalog]\nfolders = [\"/p/\"]\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.catalog.folders, vec!["/p/"]);
    }
}
