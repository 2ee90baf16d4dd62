//! Storage-boundary codecs for face columns.
//!
//! Encodings persist as little-endian `f32` blobs. Boxes and landmarks persist
//! as JSON text.

use crate::types::{Encoding, FaceBox, Landmarks};
use thiserror::Error;

const F32_SIZE: usize = std::mem::size_of::<f32>();

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("encoding blob length {0} is not a multiple of 4")]
    BadEncodingLength(usize),
    #[error("json column: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize an encoding vector into its blob form.
pub fn encode_encoding(encoding: &Encoding) -> Vec<u8> {
    encoding.values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Deserialize an encoding blob.
pub fn decode_encoding(blob: &[u8]) -> Result<Encoding, CodecError> {
    if blob.len() % F32_SIZE != 0 {
        return Err(CodecError::BadEncodingLength(blob.len()));
    }
    let values = blob
        .chunks_exact(F32_SIZE)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(Encoding { values })
}

pub fn encode_box(face_box: &FaceBox) -> Result<String, CodecError> {
    Ok(serde_json::to_string(face_box)?)
}

pub fn decode_box(text: &str) -> Result<FaceBox, CodecError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_landmarks(landmarks: Option<&Landmarks>) -> Result<Option<String>, CodecError> {
    landmarks
        .map(serde_json::to_string)
        .transpose()
        .map_err(CodecError::from)
}

/// `NULL` and JSON `null` both decode to `None`.
pub fn decode_landmarks(text: Option<&str>) -> Result<Option<Landmarks>, CodecError> {
    match text {
        None => Ok(None),
        Some(t) => Ok(serde_json::from_str::<Option<Landmarks>>(t)?),
    }
}
