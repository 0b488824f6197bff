//! Text-layer decoding: dump text → best-guess raw bytes.
//!
//! The dump's encoding is never declared (except for `data:` URLs), and the
//! candidate encodings overlap: upper-case hex is valid Base64 alphabet, and
//! the digit runs of hex text can parse as a decimal list. Each candidate is
//! a [`DecodeStrategy`]; [`decode`] evaluates them in a fixed priority order
//! and the first one that produces bytes wins.
//!
//! ```text
//! RawPdfText ─▶ DataUrlBase64 ─▶ PureBase64 ─▶ DecimalList ─▶ DirtyHex
//! ```
//!
//! A strategy that does not apply returns [`StrategyOutcome::Skipped`] and the
//! next one runs. Only an explicit declaration that turns out wrong (a
//! `data:;base64,` URL that does not decode) or an odd hex payload under
//! [`OddHexPolicy::Fail`] stops the chain with an error.

use crate::config::{OddHexPolicy, RecoveryConfig};
use crate::error::RecoverError;
use crate::pipeline::input::{string_to_latin1, TextEncoding};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, info};

/// Which textual encoding the dump was found to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingGuess {
    DataUrlBase64,
    PureBase64,
    DecimalList,
    DirtyHex,
    /// Octets taken as-is (binary column, or text already holding a PDF).
    Raw,
}

/// Result of running one strategy against the dump text.
#[derive(Debug)]
pub enum StrategyOutcome {
    /// The strategy recognised the text and produced bytes.
    Decoded(Vec<u8>),
    /// The strategy does not apply; try the next one.
    Skipped(Cow<'static, str>),
    /// The strategy applies and the text is broken; stop here.
    Failed(RecoverError),
}

/// One candidate text encoding.
pub trait DecodeStrategy: Send + Sync {
    /// The encoding this strategy recognises.
    fn guess(&self) -> EncodingGuess;

    /// Try to decode `text`.
    fn attempt(&self, text: &str, config: &RecoveryConfig) -> StrategyOutcome;
}

/// Bytes produced by the winning strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub guess: EncodingGuess,
    pub bytes: Vec<u8>,
}

/// The strategies in priority order.
pub fn default_strategies() -> [&'static dyn DecodeStrategy; 5] {
    [
        &RawPdfText { source: None },
        &DataUrlBase64,
        &PureBase64,
        &DecimalList,
        &DirtyHex,
    ]
}

/// Decode dump text with the default strategy order.
pub fn decode(text: &str, config: &RecoveryConfig) -> Result<Decoded, RecoverError> {
    decode_with(text, &default_strategies(), config)
}

/// Decode text read from a dump file with `source` encoding.
///
/// Same order as [`decode`]; a text that already is a PDF is turned back into
/// the file's own octets.
pub fn decode_dump(
    text: &str,
    source: Option<TextEncoding>,
    config: &RecoveryConfig,
) -> Result<Decoded, RecoverError> {
    let raw = RawPdfText { source };
    let strategies: [&dyn DecodeStrategy; 5] =
        [&raw, &DataUrlBase64, &PureBase64, &DecimalList, &DirtyHex];
    decode_with(text, &strategies, config)
}

/// Decode dump text, evaluating `strategies` in order.
pub fn decode_with(
    text: &str,
    strategies: &[&dyn DecodeStrategy],
    config: &RecoveryConfig,
) -> Result<Decoded, RecoverError> {
    for strategy in strategies {
        match strategy.attempt(text, config) {
            StrategyOutcome::Decoded(bytes) => {
                info!(
                    "Decoded dump as {:?} → {} bytes",
                    strategy.guess(),
                    bytes.len()
                );
                return Ok(Decoded {
                    guess: strategy.guess(),
                    bytes,
                });
            }
            StrategyOutcome::Skipped(reason) => {
                debug!("{:?} skipped: {}", strategy.guess(), reason);
            }
            StrategyOutcome::Failed(e) => return Err(e),
        }
    }
    Err(RecoverError::UnrecognizedEncoding {
        head: text.trim().chars().take(32).collect(),
    })
}

// ── Shared helpers ───────────────────────────────────────────────────────────

static RE_BASE64: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap());

static RE_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

static RE_HEX_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^0-9A-Fa-f])(?:0[xX]|\\x)").unwrap());

/// Standard alphabet, canonical padding, non-zero trailing bits tolerated.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Like [`BASE64`] but padding optional (data: URLs are often unpadded).
const BASE64_UNPADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Remove every whitespace character.
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether compacted text has the shape of a Base64 payload.
pub fn looks_like_base64(compact: &str, min_len: usize) -> bool {
    compact.len() >= min_len && RE_BASE64.is_match(compact)
}

/// All maximal ASCII digit runs of `text`.
pub fn digit_runs(text: &str) -> Vec<&str> {
    RE_DIGIT_RUN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Parse digit runs as bytes, preserving order.
///
/// `None` when there are no runs or any run falls outside `0..=255`.
pub fn parse_decimal_list(runs: &[&str]) -> Option<Vec<u8>> {
    if runs.is_empty() {
        return None;
    }
    runs.iter().map(|r| r.parse::<u8>().ok()).collect()
}

/// Strip `0x` / `0X` / `\x` prefixes and every non-hex character.
pub fn clean_hex(text: &str) -> String {
    let unprefixed = RE_HEX_PREFIX.replace_all(text.trim(), "$1");
    unprefixed.chars().filter(char::is_ascii_hexdigit).collect()
}

// ── Strategies ───────────────────────────────────────────────────────────────

/// Text that already is a PDF (a binary dump read back as text).
///
/// Without this the digit runs of `%PDF-1.4` would read as a decimal list.
/// Text read as UTF-8 goes back through UTF-8 so multi-byte sequences keep
/// their length; any other source maps chars ≤ U+00FF to single bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPdfText {
    /// Encoding the text was read with, when it came from a file.
    pub source: Option<TextEncoding>,
}

impl DecodeStrategy for RawPdfText {
    fn guess(&self) -> EncodingGuess {
        EncodingGuess::Raw
    }

    fn attempt(&self, text: &str, config: &RecoveryConfig) -> StrategyOutcome {
        if !config.detect_raw_pdf_text {
            return StrategyOutcome::Skipped("disabled".into());
        }
        let body = text.trim_start();
        if !body.starts_with("%PDF-") {
            return StrategyOutcome::Skipped("no %PDF- at start of text".into());
        }
        let bytes = match self.source {
            Some(TextEncoding::Utf8) => body.as_bytes().to_vec(),
            _ => string_to_latin1(body).unwrap_or_else(|| body.as_bytes().to_vec()),
        };
        StrategyOutcome::Decoded(bytes)
    }
}

/// `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlBase64;

impl DecodeStrategy for DataUrlBase64 {
    fn guess(&self) -> EncodingGuess {
        EncodingGuess::DataUrlBase64
    }

    fn attempt(&self, text: &str, _config: &RecoveryConfig) -> StrategyOutcome {
        let s = text.trim();
        let is_data_url = s
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
        let Some((_, payload)) = s.split_once(";base64,").filter(|_| is_data_url) else {
            return StrategyOutcome::Skipped("not a data:;base64, URL".into());
        };
        match BASE64_UNPADDED.decode(compact(payload)) {
            Ok(bytes) => StrategyOutcome::Decoded(bytes),
            Err(e) => StrategyOutcome::Failed(RecoverError::InvalidDataUrl {
                detail: e.to_string(),
            }),
        }
    }
}

/// Bare Base64, whitespace anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureBase64;

impl DecodeStrategy for PureBase64 {
    fn guess(&self) -> EncodingGuess {
        EncodingGuess::PureBase64
    }

    fn attempt(&self, text: &str, config: &RecoveryConfig) -> StrategyOutcome {
        let compact = compact(text);
        if !looks_like_base64(&compact, config.min_base64_len) {
            return StrategyOutcome::Skipped("not Base64 alphabet".into());
        }
        if config.hex_only_defers_base64 && compact.chars().all(|c| c.is_ascii_hexdigit()) {
            return StrategyOutcome::Skipped("only hex digits, deferring to hex".into());
        }
        match BASE64.decode(&compact) {
            Ok(bytes) => StrategyOutcome::Decoded(bytes),
            Err(e) => StrategyOutcome::Skipped(format!("Base64 decode failed: {e}").into()),
        }
    }
}

/// Decimal byte values separated by anything non-digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalList;

impl DecodeStrategy for DecimalList {
    fn guess(&self) -> EncodingGuess {
        EncodingGuess::DecimalList
    }

    fn attempt(&self, text: &str, config: &RecoveryConfig) -> StrategyOutcome {
        if config.hex_prefix_defers_decimal && RE_HEX_PREFIX.is_match(text.trim()) {
            return StrategyOutcome::Skipped("0x / \\x prefixes present".into());
        }
        let runs = digit_runs(text);
        if runs.is_empty() {
            return StrategyOutcome::Skipped("no digit runs".into());
        }
        if config.decimal_guard.rejects(text, runs.len()) {
            return StrategyOutcome::Skipped(
                format!("hex letters with only {} digit runs", runs.len()).into(),
            );
        }
        match parse_decimal_list(&runs) {
            Some(bytes) => StrategyOutcome::Decoded(bytes),
            None => StrategyOutcome::Skipped("digit run outside 0..=255".into()),
        }
    }
}

/// Hex contaminated with prefixes, escapes, separators or line breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirtyHex;

impl DecodeStrategy for DirtyHex {
    fn guess(&self) -> EncodingGuess {
        EncodingGuess::DirtyHex
    }

    fn attempt(&self, text: &str, config: &RecoveryConfig) -> StrategyOutcome {
        let mut cleaned = clean_hex(text);
        if cleaned.is_empty() {
            return StrategyOutcome::Skipped("no hex digits".into());
        }
        if cleaned.len() % 2 != 0 {
            match config.odd_hex {
                OddHexPolicy::Fail => {
                    return StrategyOutcome::Failed(RecoverError::TruncatedHex {
                        digits: cleaned.len(),
                    })
                }
                OddHexPolicy::Drop => {
                    debug!("Dropping trailing nibble of {}-digit hex", cleaned.len());
                    cleaned.pop();
                }
            }
        }
        match hex::decode(&cleaned) {
            Ok(bytes) => StrategyOutcome::Decoded(bytes),
            Err(e) => StrategyOutcome::Failed(RecoverError::Internal(format!(
                "cleaned hex failed to decode: {e}"
            ))),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use proptest::prelude::*;

    proptest! {
        /// Property: a clean Base64 string decodes to what the reference decoder gives
        #[test]
        fn base64_matches_reference(bytes in prop::collection::vec(any::<u8>(), 6..512)) {
            let s = STANDARD.encode(&bytes);
            prop_assume!(!s.chars().all(|c| c.is_ascii_hexdigit()));
            let d = decode(&s, &RecoveryConfig::default()).unwrap();
            prop_assert_eq!(d.bytes, STANDARD.decode(&s).unwrap());
        }

        /// Property: upper-case hex of any buffer decodes back to it
        #[test]
        fn hex_round_trip(bytes in prop::collection::vec(any::<u8>(), 1..512)) {
            let s = hex::encode_upper(&bytes);
            // Digit runs of the hex must not all be byte-sized decimals, and a
            // pure-digit hex could be read as decimal; exclude both.
            let runs = digit_runs(&s);
            prop_assume!(parse_decimal_list(&runs).is_none()
                || RecoveryConfig::default().decimal_guard.rejects(&s, runs.len()));
            let d = decode(&s, &RecoveryConfig::default()).unwrap();
            prop_assert_eq!(d.bytes, bytes);
        }
    }
}
