//! # blob2pdf
//!
//! Recover PDF documents from text dumps of database BLOB columns.
//!
//! ## Why this crate?
//!
//! Binary columns exported through SQL clients, CSV tools or log lines come
//! out as text: Base64, `data:` URLs, hex with `0x` prefixes and line breaks,
//! comma-separated decimal bytes, sometimes two of those stacked. The
//! encoding is rarely declared, the payload is often padded or cut short, and
//! the PDF inside may sit behind a few stray bytes or carry a stale
//! `startxref`. This crate peels the text layer off heuristically, carves the
//! PDF out by its signatures and patches the trailer. When no PDF is present
//! but images are, it rebuilds a PDF from them, one page per image.
//!
//! ## Pipeline Overview
//!
//! ```text
//! dump text / octets
//!  │
//!  ├─ 1. Input     settle the text encoding (UTF-8, UTF-16, Latin-1)
//!  ├─ 2. Decode    data: URL → Base64 → decimal list → dirty hex
//!  ├─ 3. Redecode  one more pass if the bytes are still hex/decimal text
//!  ├─ 4. Scan      %PDF- … %%EOF, JPEG SOI … EOI, PNG … IEND
//!  ├─ 5. Assemble  align + trim the PDF, or build one from the images
//!  └─ 6. Xref      validate startxref, rewrite the trailer if it is wrong
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blob2pdf::{recover_text, RecoveryConfig};
//!
//! let dump = std::fs::read_to_string("column.txt")?;
//! let result = recover_text(&dump, &RecoveryConfig::default())?;
//! std::fs::write("column.pdf", result.pdf())?;
//! eprintln!("{:?} via {:?}, trailer {:?}", result.encoding, result.method, result.xref);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `blob2pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! blob2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod recover;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DecimalGuard, OddHexPolicy, RecoveryConfig, RecoveryConfigBuilder};
pub use error::{ImageRejected, RecoverError};
pub use output::{Artifact, ArtifactKind, RecoveryMethod, RecoveryResult, RecoveryStats};
pub use pipeline::decode::EncodingGuess;
pub use pipeline::input::{BlobValue, RawText, TextEncoding};
pub use pipeline::raster::{ImageCrateDecoder, RasterDecoder};
pub use pipeline::xref::{XrefRepairer, XrefStatus};
pub use recover::{
    recover, recover_bytes, recover_file, recover_file_sync, recover_text, recover_to_dir,
    SavedRecovery,
};
