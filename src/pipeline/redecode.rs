//! Double-decode detection: a decoded buffer that is itself text.
//!
//! Dumps are sometimes encoded twice, e.g. a decimal list of the ASCII
//! characters of a hex dump. After the text layer is stripped, the bytes
//! still read as hex or decimal. This stage peels off exactly one more layer
//! and never recurses: genuine binary data that happens to look textual must
//! not be reinterpreted over and over.

use crate::config::RecoveryConfig;
use crate::pipeline::decode::{digit_runs, parse_decimal_list};
use crate::pipeline::input::latin1_to_string;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// Which second layer was removed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedecodeKind {
    Hex,
    Decimal,
}

/// Output of [`maybe_redecode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redecoded<'a> {
    pub kind: Option<RedecodeKind>,
    pub bytes: Cow<'a, [u8]>,
}

static RE_DECIMAL_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s,;0-9]+$").unwrap());

/// Decode `bytes` once more when they are an ASCII rendering of hex or decimal.
///
/// Returns the input unchanged (borrowed) otherwise.
pub fn maybe_redecode<'a>(bytes: &'a [u8], config: &RecoveryConfig) -> Redecoded<'a> {
    let unchanged = Redecoded {
        kind: None,
        bytes: Cow::Borrowed(bytes),
    };
    if !config.redecode {
        return unchanged;
    }

    let text = latin1_to_string(bytes);
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.len() >= config.min_redecode_len
        && compact.len() % 2 == 0
        && compact.chars().all(|c| c.is_ascii_hexdigit())
    {
        if let Ok(decoded) = hex::decode(&compact) {
            debug!("Buffer is ASCII hex; decoded second layer → {} bytes", decoded.len());
            return Redecoded {
                kind: Some(RedecodeKind::Hex),
                bytes: Cow::Owned(decoded),
            };
        }
    }

    if RE_DECIMAL_TEXT.is_match(&text) {
        if let Some(decoded) = parse_decimal_list(&digit_runs(&text)) {
            debug!(
                "Buffer is an ASCII decimal list; decoded second layer → {} bytes",
                decoded.len()
            );
            return Redecoded {
                kind: Some(RedecodeKind::Decimal),
                bytes: Cow::Owned(decoded),
            };
        }
    }

    unchanged
}
