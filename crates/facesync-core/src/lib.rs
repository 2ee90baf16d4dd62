//! facesync-core: face record store and tag synchronization engine.
//!
//! Recognized faces live in a SQLite [`FaceStore`] grouped by media file.
//! [`TagSynchronizer`] propagates their names as `person:` tags to an
//! external media catalog behind [`TagStore`].

pub mod codec;
pub mod config;
pub mod media;
pub mod readonly;
pub mod recognizer;
pub mod runner;
pub mod store;
pub mod sync;
pub mod tags;
mod txn;
pub mod types;

pub use config::Config;
pub use readonly::ReadOnly;
pub use recognizer::{CommandRecognizer, Recognizer};
pub use store::{open_face_store, FaceStore, SqliteFaceStore};
pub use sync::TagSynchronizer;
pub use tags::{open_tag_store, TagStore};
pub use types::{Commit, Face, FileFaces, NewFace};
