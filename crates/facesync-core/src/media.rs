//! Media-type helpers: extension classification and directory listing.

use std::path::Path;
use walkdir::WalkDir;

pub const IMAGE_EXTS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".bmp", ".gif", ".tif", ".tiff", ".webp", ".heic",
];

pub const VIDEO_EXTS: &[&str] = &[
    ".mp4", ".mov", ".m4v", ".avi", ".mkv", ".mts", ".m2ts", ".3gp", ".wmv", ".webm", ".mpg",
];

/// Lowercased extension including the leading dot, or "" if there is none.
pub fn low_ext(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

pub fn has_ext<S: AsRef<str>>(path: &str, exts: &[S]) -> bool {
    let ext = low_ext(path);
    exts.iter().any(|e| e.as_ref().eq_ignore_ascii_case(&ext))
}

pub fn is_image(path: &str) -> bool {
    has_ext(path, IMAGE_EXTS)
}

pub fn is_video(path: &str) -> bool {
    has_ext(path, VIDEO_EXTS)
}

/// Strip a trailing `*` wildcard marker from a folder prefix.
pub fn strip_wildcard(prefix: &str) -> &str {
    prefix.strip_suffix('*').unwrap_or(prefix)
}

/// Recursively list regular files under `root` whose extension is in `exts`.
///
/// Unreadable entries are logged and skipped. Result is sorted.
pub fn list_files(root: &Path, exts: &[&str]) -> Vec<String> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = entry.path().to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 path");
            continue;
        };
        if has_ext(path, exts) {
            files.push(path.to_string());
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_low_ext() {
        assert_eq!(low_ext("/a/b/IMG_1.JPG"), ".jpg");
        assert_eq!(low_ext("/a/b/clip.Mp4"), ".mp4");
        assert_eq!(low_ext("/a/b/README"), "");
    }

    #[test]
    fn test_classification() {
        assert!(is_image("x.jpeg"));
        assert!(!is_image("x.mov"));
        assert!(is_video("x.MOV"));
        assert!(has_ext("x.JPG", &[".jpg"]));
    }

    #[test]
    fn test_strip_wildcard() {
        assert_eq!(strip_wildcard("/photos/2020*"), "/photos/2020");
        assert_eq!(strip_wildcard("/photos/"), "/photos/");
    }

    #[test]
    fn test_list_files_recursive_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/one.jpg"), b"").unwrap();
        fs::write(dir.path().join("a/b/two.PNG"), b"").unwrap();
        fs::write(dir.path().join("a/b/notes.txt"), b"").unwrap();

        let files = list_files(dir.path(), IMAGE_EXTS);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a/b/two.PNG"));
        assert!(files[1].ends_with("a/one.jpg"));
    }
}
