//! Typed model-loading and value-store errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading or dereferencing model assets.
///
/// Everything here is fatal for the call that hit it: there is no retry
/// path inside the library.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Neither the plain nor the `.zst` variant of a required file exists.
    #[error("missing required data file for: {path}")]
    MissingAsset { path: PathBuf },

    /// Underlying file I/O failed.
    #[error("model i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A model file held malformed JSON.
    #[error("malformed model json: {0}")]
    Json(#[from] serde_json::Error),

    /// A node referenced a parent that is not in the network.
    #[error("node '{node}' references unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },

    /// Two nodes share a case-folded name.
    #[error("duplicate node name '{name}' (names are case-insensitive)")]
    DuplicateNode { name: String },

    /// A parent was declared after its child in the sampling order.
    #[error("node '{node}' appears before its parent '{parent}' in sampling order")]
    OrderViolation { node: String, parent: String },

    /// A value-index token contained bytes outside the base-85 alphabet,
    /// or decoded to more than 8 bytes.
    #[error("invalid value-index token '{token}'")]
    BadToken { token: String },

    /// A decoded token index has no entry in `values.json`.
    #[error("value index {index} out of range (dictionary holds {len})")]
    IndexOutOfRange { index: u64, len: usize },

    /// An offset in `values.json` was not a hex integer.
    #[error("malformed offset '{offset}' in values index")]
    BadOffset { offset: String },

    /// The data file ended before `offset + len`.
    #[error("short read at offset {offset}: wanted {len} bytes")]
    ShortRead { offset: u64, len: usize },

    /// A dictionary entry was not valid UTF-8.
    #[error("value at offset {offset} is not utf-8")]
    NotUtf8 { offset: u64 },
}
