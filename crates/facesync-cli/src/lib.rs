//! Shared pieces of the `facesync` and `facedb` binaries.

pub mod inspect;
pub mod logging;
