use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row id of a face record.
pub type FaceId = i64;

/// Face bounding box in source-image pixels, stored as `(left, bottom, right, top)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32, i32, i32)", into = "(i32, i32, i32, i32)")]
pub struct FaceBox {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl From<(i32, i32, i32, i32)> for FaceBox {
    fn from((left, bottom, right, top): (i32, i32, i32, i32)) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }
}

impl From<FaceBox> for (i32, i32, i32, i32) {
    fn from(b: FaceBox) -> Self {
        (b.left, b.bottom, b.right, b.top)
    }
}

/// Named landmark point groups (e.g. "left_eye" -> [(x, y), ...]).
pub type Landmarks = BTreeMap<String, Vec<(i32, i32)>>;

/// Face encoding vector produced by the recognizer.
///
/// The store treats the contents as opaque; only the length is checked on decode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Suffix marking a low-confidence classification.
pub const WEAK_SUFFIX: &str = "_weak";

/// A face as produced by the recognizer, before it has a row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFace {
    #[serde(rename = "box")]
    pub face_box: FaceBox,
    pub encoding: Encoding,
    #[serde(default)]
    pub landmarks: Option<Landmarks>,
    /// Classified person name; empty when unmatched.
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "dist")]
    pub distance: f64,
    /// Video frame index, 0 for still images.
    #[serde(default)]
    pub frame: i64,
    #[serde(default)]
    pub pattern: String,
}

impl NewFace {
    /// Attach the row id assigned on insert.
    pub fn with_id(self, id: FaceId) -> Face {
        Face {
            id,
            face_box: self.face_box,
            encoding: self.encoding,
            landmarks: self.landmarks,
            name: self.name,
            distance: self.distance,
            frame: self.frame,
            pattern: self.pattern,
        }
    }
}

/// A stored face record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    #[serde(rename = "box")]
    pub face_box: FaceBox,
    pub encoding: Encoding,
    pub landmarks: Option<Landmarks>,
    pub name: String,
    pub distance: f64,
    pub frame: i64,
    pub pattern: String,
}

impl Face {
    pub fn is_unmatched(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_weak(&self) -> bool {
        self.name.ends_with(WEAK_SUFFIX)
    }
}

/// One element of every face query: a file and its faces, ordered by face id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFaces {
    pub filename: String,
    pub faces: Vec<Face>,
}

/// Commit control accepted by every mutating store method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Make this mutation (and any pending deferred ones) durable immediately.
    Now,
    /// Join the open transaction; durable only after a later commit.
    Deferred,
}
