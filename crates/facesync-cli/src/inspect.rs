//! Human-readable reports printed by `facedb`.

use facesync_core::store::{AllEncodings, StoreStats};
use facesync_core::FileFaces;
use std::fmt::Write;

/// One line per face: frame, box, name and distance.
pub fn details(file: &FileFaces) -> String {
    let mut out = format!("File: {}\n", file.filename);
    for face in &file.faces {
        let b = face.face_box;
        let _ = writeln!(
            out,
            "\tFrame: {}\tBox: ({}, {}, {}, {})\tName: {}\tDist: {}",
            face.frame, b.left, b.bottom, b.right, b.top, face.name, face.distance
        );
    }
    out
}

pub fn stats(stats: &StoreStats) -> String {
    let mut out = String::from("Person count\n");
    for (name, count) in &stats.per_name {
        let _ = writeln!(out, "{count}\t{name}");
    }
    let _ = writeln!(out, "Total faces: {}", stats.total_faces);
    let _ = writeln!(out, "Total files: {}", stats.total_files);
    out
}

/// Size of the recognition encoding cache and of each shard.
pub fn encodings(all: &AllEncodings) -> String {
    let sizes: Vec<String> = all.shards.iter().map(|s| s.len().to_string()).collect();
    format!(
        "Encodings: {} in {} shards ({})\n",
        all.len(),
        all.shards.len(),
        sizes.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use facesync_core::store::SqliteFaceStore;
    use facesync_core::types::{Commit, Encoding, FaceBox, NewFace};
    use facesync_core::FaceStore;

    #[test]
    fn test_details_lists_every_face() {
        let face = NewFace {
            face_box: FaceBox::from((1, 2, 3, 4)),
            encoding: Encoding::new(vec![]),
            landmarks: None,
            name: "alice".to_string(),
            distance: 0.25,
            frame: 7,
            pattern: String::new(),
        };
        let file = FileFaces {
            filename: "/p/a.jpg".to_string(),
            faces: vec![face.with_id(1)],
        };
        assert_eq!(
            details(&file),
            "File: /p/a.jpg\n\tFrame: 7\tBox: (1, 2, 3, 4)\tName: alice\tDist: 0.25\n"
        );
    }

    #[test]
    fn test_stats_report() {
        let s = StoreStats {
            per_name: vec![("bob".to_string(), 3), ("".to_string(), 1)],
            total_faces: 4,
            total_files: 2,
        };
        assert_eq!(
            stats(&s),
            "Person count\n3\tbob\n1\t\nTotal faces: 4\nTotal files: 2\n"
        );
    }

    #[test]
    fn test_encodings_report_uses_split() {
        let store = SqliteFaceStore::open_in_memory().unwrap();
        for f in ["/p/a.jpg", "/p/b.jpg", "/p/c.jpg"] {
            let face = NewFace {
                face_box: FaceBox::from((0, 1, 1, 0)),
                encoding: Encoding::new(vec![0.5; 4]),
                landmarks: None,
                name: "alice".to_string(),
                distance: 0.3,
                frame: 0,
                pattern: String::new(),
            };
            store.insert(f, &[face], Commit::Now).unwrap();
        }
        let all = store.get_all_encodings(2).unwrap();
        assert_eq!(encodings(all), "Encodings: 3 in 2 shards (2, 1)\n");
    }
}
