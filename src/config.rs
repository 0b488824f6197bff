//! Configuration types for dump recovery.
//!
//! All recovery behaviour is controlled through [`RecoveryConfig`], built
//! via its [`RecoveryConfigBuilder`]. The ambiguous heuristics (decimal vs
//! hex, odd-length hex) are explicit knobs here rather than constants buried
//! in the decoders, so two runs with different outcomes can be diffed by
//! their configs alone.

use crate::error::RecoverError;
use crate::pipeline::raster::{ImageCrateDecoder, RasterDecoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one recovery run.
///
/// Built via [`RecoveryConfig::builder()`] or using
/// [`RecoveryConfig::default()`].
///
/// # Example
/// ```rust
/// use blob2pdf::{OddHexPolicy, RecoveryConfig};
///
/// let config = RecoveryConfig::builder()
///     .odd_hex(OddHexPolicy::Drop)
///     .xref_window(4096)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RecoveryConfig {
    /// What to do with a hex payload that has an odd digit count. Default: `Fail`.
    pub odd_hex: OddHexPolicy,

    /// Guard against reading hex text as a decimal list.
    /// Default: `HexLetters { min_runs: 10 }`.
    pub decimal_guard: DecimalGuard,

    /// Skip the Base64 attempt when every character is a hex digit. Default: true.
    ///
    /// Upper-case hex is also valid Base64 alphabet, and decodes "successfully"
    /// into garbage whenever its length is a multiple of four.
    pub hex_only_defers_base64: bool,

    /// Skip the decimal-list attempt when the text carries `0x` / `\x` prefixes.
    /// Default: true.
    ///
    /// `0x25 0x50` has digit runs `0 25 0 50` that all fit in a byte.
    pub hex_prefix_defers_decimal: bool,

    /// Take a text that already starts with `%PDF-` as raw bytes. Default: true.
    pub detect_raw_pdf_text: bool,

    /// Minimum compact length for the pure-Base64 path. Default: 8.
    pub min_base64_len: usize,

    /// Run the double-decode pass on the decoded buffer. Default: true.
    pub redecode: bool,

    /// Minimum compact length for the double-decode hex path. Default: 8.
    pub min_redecode_len: usize,

    /// Attempt trailer repair when `startxref` is wrong. Default: true.
    pub xref_repair: bool,

    /// Bytes scanned after the `startxref` offset for an xref stream object. Default: 2048.
    pub xref_window: usize,

    /// Bytes scanned before a `/Type /XRef` tag for its `obj` header. Default: 200.
    pub xref_backtrack: usize,

    /// Image decoder used by the carving fallback.
    /// `None` disables image repackaging (it fails with `NoValidImages`).
    pub raster_decoder: Option<Arc<dyn RasterDecoder>>,

    /// Resolution assumed for carved images when sizing pages. Default: 72.
    pub image_dpi: f32,

    /// Return each carved image as its own artifact. Default: true.
    pub emit_carved_images: bool,

    /// Return every additional `%PDF-` span as its own artifact. Default: true.
    pub emit_embedded_pdfs: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            odd_hex: OddHexPolicy::default(),
            decimal_guard: DecimalGuard::default(),
            hex_only_defers_base64: true,
            hex_prefix_defers_decimal: true,
            detect_raw_pdf_text: true,
            min_base64_len: 8,
            redecode: true,
            min_redecode_len: 8,
            xref_repair: true,
            xref_window: 2048,
            xref_backtrack: 200,
            raster_decoder: Some(Arc::new(ImageCrateDecoder)),
            image_dpi: 72.0,
            emit_carved_images: true,
            emit_embedded_pdfs: true,
        }
    }
}

impl fmt::Debug for RecoveryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryConfig")
            .field("odd_hex", &self.odd_hex)
            .field("decimal_guard", &self.decimal_guard)
            .field("hex_only_defers_base64", &self.hex_only_defers_base64)
            .field("hex_prefix_defers_decimal", &self.hex_prefix_defers_decimal)
            .field("detect_raw_pdf_text", &self.detect_raw_pdf_text)
            .field("min_base64_len", &self.min_base64_len)
            .field("redecode", &self.redecode)
            .field("min_redecode_len", &self.min_redecode_len)
            .field("xref_repair", &self.xref_repair)
            .field("xref_window", &self.xref_window)
            .field("xref_backtrack", &self.xref_backtrack)
            .field(
                "raster_decoder",
                &self.raster_decoder.as_ref().map(|_| "<dyn RasterDecoder>"),
            )
            .field("image_dpi", &self.image_dpi)
            .field("emit_carved_images", &self.emit_carved_images)
            .field("emit_embedded_pdfs", &self.emit_embedded_pdfs)
            .finish()
    }
}

impl RecoveryConfig {
    /// Create a new builder for `RecoveryConfig`.
    pub fn builder() -> RecoveryConfigBuilder {
        RecoveryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RecoveryConfig`].
#[derive(Debug)]
pub struct RecoveryConfigBuilder {
    config: RecoveryConfig,
}

impl RecoveryConfigBuilder {
    pub fn odd_hex(mut self, policy: OddHexPolicy) -> Self {
        self.config.odd_hex = policy;
        self
    }

    pub fn decimal_guard(mut self, guard: DecimalGuard) -> Self {
        self.config.decimal_guard = guard;
        self
    }

    pub fn hex_only_defers_base64(mut self, v: bool) -> Self {
        self.config.hex_only_defers_base64 = v;
        self
    }

    pub fn hex_prefix_defers_decimal(mut self, v: bool) -> Self {
        self.config.hex_prefix_defers_decimal = v;
        self
    }

    pub fn detect_raw_pdf_text(mut self, v: bool) -> Self {
        self.config.detect_raw_pdf_text = v;
        self
    }

    pub fn min_base64_len(mut self, n: usize) -> Self {
        self.config.min_base64_len = n;
        self
    }

    pub fn redecode(mut self, v: bool) -> Self {
        self.config.redecode = v;
        self
    }

    pub fn min_redecode_len(mut self, n: usize) -> Self {
        self.config.min_redecode_len = n;
        self
    }

    pub fn xref_repair(mut self, v: bool) -> Self {
        self.config.xref_repair = v;
        self
    }

    pub fn xref_window(mut self, n: usize) -> Self {
        self.config.xref_window = n;
        self
    }

    pub fn xref_backtrack(mut self, n: usize) -> Self {
        self.config.xref_backtrack = n;
        self
    }

    pub fn raster_decoder(mut self, decoder: Arc<dyn RasterDecoder>) -> Self {
        self.config.raster_decoder = Some(decoder);
        self
    }

    /// Remove the image decoder; the carving fallback then always fails.
    pub fn without_raster_decoder(mut self) -> Self {
        self.config.raster_decoder = None;
        self
    }

    pub fn image_dpi(mut self, dpi: f32) -> Self {
        self.config.image_dpi = dpi;
        self
    }

    pub fn emit_carved_images(mut self, v: bool) -> Self {
        self.config.emit_carved_images = v;
        self
    }

    pub fn emit_embedded_pdfs(mut self, v: bool) -> Self {
        self.config.emit_embedded_pdfs = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RecoveryConfig, RecoverError> {
        let c = &self.config;
        if !(c.image_dpi.is_finite() && c.image_dpi > 0.0) {
            return Err(RecoverError::InvalidConfig(format!(
                "image DPI must be positive, got {}",
                c.image_dpi
            )));
        }
        if c.min_base64_len < 4 {
            return Err(RecoverError::InvalidConfig(format!(
                "minimum Base64 length must be ≥ 4, got {}",
                c.min_base64_len
            )));
        }
        if c.xref_window == 0 {
            return Err(RecoverError::InvalidConfig(
                "xref window must be ≥ 1".into(),
            ));
        }
        if let DecimalGuard::HexLetters { min_runs: 0 } = c.decimal_guard {
            return Err(RecoverError::InvalidConfig(
                "decimal guard min_runs must be ≥ 1 (use Disabled instead)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Handling of a hex payload with an odd number of digits.
///
/// Dumps cut off mid-byte are common, but dropping the nibble hides the
/// truncation, so the default refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddHexPolicy {
    /// Discard the trailing nibble and decode the rest.
    Drop,
    /// Fail with [`RecoverError::TruncatedHex`]. (default)
    #[default]
    Fail,
}

/// Guard on the decimal-list path against misreading hex text.
///
/// `"0A 1B 2C"` has digit runs `0`, `1`, `2` that all fit in a byte. When the
/// text also contains hex letters and only a handful of digit runs, it is far
/// more likely to be hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalGuard {
    /// Accept any text whose digit runs all fit in a byte.
    Disabled,
    /// Reject the decimal path when hex letters A–F are present and fewer
    /// than `min_runs` digit runs were found.
    HexLetters { min_runs: usize },
}

impl Default for DecimalGuard {
    fn default() -> Self {
        DecimalGuard::HexLetters { min_runs: 10 }
    }
}

impl DecimalGuard {
    /// Whether the guard vetoes a decimal reading of `text` with `runs` digit runs.
    pub fn rejects(&self, text: &str, runs: usize) -> bool {
        match *self {
            DecimalGuard::Disabled => false,
            DecimalGuard::HexLetters { min_runs } => {
                runs < min_runs && text.chars().any(|c| matches!(c, 'a'..='f' | 'A'..='F'))
            }
        }
    }
}
