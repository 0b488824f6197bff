//! Error types for the blob2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RecoverError`]: **Fatal**: recovery cannot proceed at all (no text
//!   encoding matched, nothing carvable in the buffer, unreadable input
//!   file). Returned as `Err(RecoverError)` from the top-level `recover*`
//!   functions.
//!
//! * [`ImageRejected`]: **Non-fatal**: one carved image failed to decode
//!   but the others are fine. Stored inside
//!   [`crate::output::RecoveryResult::rejected_images`] so callers can see
//!   what was skipped.
//!
//! A trailer that cannot be repaired is neither: it is reported as
//! [`crate::pipeline::xref::XrefStatus::Unrepairable`] and the un-repaired
//! PDF is still returned.

use std::path::PathBuf;
use thiserror::Error;

/// Number of leading bytes quoted in error messages.
pub const HEAD_LEN: usize = 16;

/// Render the first [`HEAD_LEN`] bytes of a buffer as upper-case hex.
pub fn head_hex(bytes: &[u8]) -> String {
    hex::encode_upper(&bytes[..bytes.len().min(HEAD_LEN)])
}

/// All fatal errors returned by the blob2pdf library.
#[derive(Debug, Error)]
pub enum RecoverError {
    // ── Decoding errors ───────────────────────────────────────────────────
    /// No text-layer heuristic matched the dump.
    #[error("Text does not look like Base64, a data: URL, a decimal list or hex.\nFirst characters: {head:?}")]
    UnrecognizedEncoding { head: String },

    /// Hex payload had an odd number of digits and the policy is `fail`.
    #[error("Hex payload has an odd number of digits ({digits})\nUse --odd-hex drop to discard the trailing nibble.")]
    TruncatedHex { digits: usize },

    /// A `data:...;base64,` URL whose payload is not valid Base64.
    #[error("data: URL declares base64 but the payload does not decode: {detail}")]
    InvalidDataUrl { detail: String },

    // ── Recovery errors ───────────────────────────────────────────────────
    /// Image spans were found but none decoded as a usable raster.
    #[error("Found {found} image span(s) but none decoded as a usable image.\nFirst error: {first_error}")]
    NoValidImages {
        found: usize,
        first_error: String,
        dump: Vec<u8>,
    },

    /// The decoded buffer holds neither a `%PDF-` header nor a carvable image.
    #[error("Decoded {len} bytes contain no %PDF- header and no JPEG/PNG image.\nFirst bytes: {head}")]
    NotAPdf {
        len: usize,
        head: String,
        dump: Vec<u8>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Input dump was not found at the given path.
    #[error("Dump file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the input dump failed for another reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact would be written over the dump it was recovered from.
    #[error("Refusing to overwrite the input dump '{path}'\nUse -o to write into another directory.")]
    OutputIsInput { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecoverError {
    /// The undecodable buffer, when the error carries one.
    ///
    /// Callers are expected to persist it for manual inspection before
    /// surfacing the error.
    pub fn diagnostic_dump(&self) -> Option<&[u8]> {
        match self {
            RecoverError::NotAPdf { dump, .. } | RecoverError::NoValidImages { dump, .. } => {
                Some(dump)
            }
            _ => None,
        }
    }

    pub(crate) fn not_a_pdf(buffer: &[u8]) -> Self {
        RecoverError::NotAPdf {
            len: buffer.len(),
            head: head_hex(buffer),
            dump: buffer.to_vec(),
        }
    }
}

/// A non-fatal error for a single carved image.
///
/// The image is skipped; the remaining images still become pages.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Image {index} ({kind} at offset {offset}) rejected: {detail}")]
pub struct ImageRejected {
    /// Position of the image in the carved sequence (0-based).
    pub index: usize,
    /// `jpg` or `png`.
    pub kind: String,
    /// Byte offset of the image inside the decoded buffer.
    pub offset: usize,
    pub detail: String,
}
