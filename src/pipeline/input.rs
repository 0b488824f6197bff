//! Input resolution: turn a dump file or a column value into a [`BlobValue`].
//!
//! A database driver hands back either octets (IMAGE/VARBINARY columns) or a
//! string (TEXT/VARCHAR columns holding Base64, hex, ...). Text exported to a
//! file has lost its declared charset, so [`RawText::from_bytes`] tries the
//! encodings a dump is realistically written in, first full decode wins:
//! UTF-8, UTF-16LE, UTF-16BE, then Latin-1, which maps every byte and so
//! always succeeds.

use crate::error::RecoverError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A raw column value, as obtained from a file or a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobValue {
    /// Textual rendering of the bytes (Base64, hex, decimal, data: URL).
    Text(String),
    /// The octets themselves.
    Bytes(Vec<u8>),
}

impl From<String> for BlobValue {
    fn from(s: String) -> Self {
        BlobValue::Text(s)
    }
}

impl From<&str> for BlobValue {
    fn from(s: &str) -> Self {
        BlobValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for BlobValue {
    fn from(b: Vec<u8>) -> Self {
        BlobValue::Bytes(b)
    }
}

impl From<&[u8]> for BlobValue {
    fn from(b: &[u8]) -> Self {
        BlobValue::Bytes(b.to_vec())
    }
}

impl From<RawText> for BlobValue {
    fn from(t: RawText) -> Self {
        BlobValue::Text(t.text)
    }
}

/// Character encoding a dump file was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

/// The full textual content of a dump. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText {
    text: String,
    encoding: TextEncoding,
}

impl RawText {
    /// Decode file bytes as text, trying each supported encoding in turn.
    ///
    /// A leading byte-order mark is dropped.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let (text, encoding) = if let Ok(s) = std::str::from_utf8(bytes) {
            (s.to_string(), TextEncoding::Utf8)
        } else if let Some(s) = decode_utf16(bytes, u16::from_le_bytes) {
            (s, TextEncoding::Utf16Le)
        } else if let Some(s) = decode_utf16(bytes, u16::from_be_bytes) {
            (s, TextEncoding::Utf16Be)
        } else {
            (latin1_to_string(bytes), TextEncoding::Latin1)
        };
        let text = match text.strip_prefix('\u{FEFF}') {
            Some(rest) => rest.to_string(),
            None => text,
        };
        debug!("Read {} bytes of dump text as {:?}", bytes.len(), encoding);
        Self { text, encoding }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

fn decode_utf16(bytes: &[u8], word: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|c| word([c[0], c[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Map each byte to the code point of the same value.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`latin1_to_string`] for code points ≤ U+00FF.
///
/// Returns `None` when the text holds a character outside Latin-1.
pub fn string_to_latin1(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

/// Read a dump file.
///
/// With `binary` the file content is taken as the octets themselves;
/// otherwise it is decoded as text via [`RawText::from_bytes`].
pub fn read_dump(path: &Path, binary: bool) -> Result<(BlobValue, Option<TextEncoding>), RecoverError> {
    let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
    Ok(classify(bytes, binary))
}

pub(crate) fn classify(bytes: Vec<u8>, binary: bool) -> (BlobValue, Option<TextEncoding>) {
    if binary {
        (BlobValue::Bytes(bytes), None)
    } else {
        let text = RawText::from_bytes(&bytes);
        let encoding = text.encoding();
        (BlobValue::from(text), Some(encoding))
    }
}

pub(crate) fn read_error(path: &Path, e: std::io::Error) -> RecoverError {
    match e.kind() {
        std::io::ErrorKind::NotFound => RecoverError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => RecoverError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => RecoverError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_wins_first() {
        let t = RawText::from_bytes(b"JVBERi0xLjQK");
        assert_eq!(t.encoding(), TextEncoding::Utf8);
        assert_eq!(t.as_str(), "JVBERi0xLjQK");
    }

    #[test]
    fn utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "AB12".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let t = RawText::from_bytes(&bytes);
        assert_eq!(t.encoding(), TextEncoding::Utf16Le);
        assert_eq!(t.as_str(), "AB12");
    }

    #[test]
    fn utf16be_when_le_has_lone_surrogate() {
        // 0xD800 read little-endian from [0x00, 0xD8] is a lone high surrogate,
        // but big-endian it is U+00D8.
        let bytes = [0x00, 0xD8, 0x00, 0x41];
        assert!(std::str::from_utf8(&bytes).is_err());
        let t = RawText::from_bytes(&bytes);
        assert_eq!(t.encoding(), TextEncoding::Utf16Be);
        assert_eq!(t.as_str(), "\u{D8}A");
    }

    #[test]
    fn latin1_is_last_resort() {
        // Odd length rules out UTF-16, 0xFF rules out UTF-8.
        let bytes = [0x41, 0xFF, 0x42];
        let t = RawText::from_bytes(&bytes);
        assert_eq!(t.encoding(), TextEncoding::Latin1);
        assert_eq!(t.as_str(), "A\u{FF}B");
        assert_eq!(string_to_latin1(t.as_str()).unwrap(), bytes.to_vec());
    }

    #[test]
    fn latin1_rejects_wide_chars() {
        assert!(string_to_latin1("€").is_none());
    }

    #[test]
    fn read_dump_missing_file() {
        let err = read_dump(Path::new("/definitely/not/here.txt"), false).unwrap_err();
        assert!(matches!(err, RecoverError::FileNotFound { .. }));
    }

    #[test]
    fn read_dump_binary_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0x25, 0x50, 0xFF]).unwrap();
        let (value, enc) = read_dump(&path, true).unwrap();
        assert_eq!(value, BlobValue::Bytes(vec![0x25, 0x50, 0xFF]));
        assert!(enc.is_none());
    }
}
