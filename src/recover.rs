//! Top-level recovery entry points.
//!
//! ## Flow
//!
//! ```text
//! BlobValue ─▶ decode ─▶ maybe_redecode ─▶ [PdfCarve, ImageRepack] ─▶ xref
//! ```
//!
//! The recovery strategies run in order over the decoded buffer; the first
//! one that produces a PDF wins. A strategy that finds nothing to work on is
//! skipped. When every strategy is skipped the buffer is not a PDF, and the
//! error carries it so the caller can keep it for inspection.
//!
//! A carved PDF whose trailer stays unrepairable is not structurally valid.
//! If the buffer also holds images, they are repacked as well and returned
//! next to it as [`ArtifactKind::FallbackImagesPdf`].
//!
//! The in-memory functions ([`recover`], [`recover_text`], [`recover_bytes`])
//! are synchronous and pure. The file functions read with `tokio::fs` and run
//! the CPU-bound core on the blocking pool.

use crate::config::RecoveryConfig;
use crate::error::{ImageRejected, RecoverError};
use crate::output::{header_hex, Artifact, ArtifactKind, RecoveryMethod, RecoveryResult, RecoveryStats};
use crate::pipeline::assemble::{align_to_pdf, images_to_pdf, trim_to_last_eof, CarvedImage};
use crate::pipeline::decode::{self, EncodingGuess};
use crate::pipeline::input::{self, BlobValue, TextEncoding};
use crate::pipeline::redecode::maybe_redecode;
use crate::pipeline::scan::{find_image_spans, find_pdf_spans};
use crate::pipeline::xref::{UnrepairableReason, XrefCheck, XrefRepairer, XrefStatus};
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

// ── Recovery strategies ──────────────────────────────────────────────────

/// A PDF produced by one [`RecoveryStrategy`], before trailer repair.
#[derive(Debug)]
pub struct Recovered {
    pub pdf: Vec<u8>,
    pub pages: Option<usize>,
    /// Artifacts besides the PDF (carved images, embedded PDFs).
    pub extras: Vec<Artifact>,
    pub rejected: Vec<ImageRejected>,
}

/// Result of running one strategy over the decoded buffer.
#[derive(Debug)]
pub enum RecoveryOutcome {
    Recovered(Recovered),
    /// Nothing for this strategy in the buffer; try the next one.
    Skipped(Cow<'static, str>),
    /// The strategy applies but could not produce a PDF; stop here.
    Failed(RecoverError),
}

/// One way of getting a PDF out of a decoded buffer.
pub trait RecoveryStrategy: Send + Sync {
    fn method(&self) -> RecoveryMethod;

    fn attempt(&self, buffer: &[u8], config: &RecoveryConfig) -> RecoveryOutcome;
}

/// Carve the document from the first `%PDF-` to the last `%%EOF`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfCarve;

impl RecoveryStrategy for PdfCarve {
    fn method(&self) -> RecoveryMethod {
        RecoveryMethod::PdfCarve
    }

    fn attempt(&self, buffer: &[u8], config: &RecoveryConfig) -> RecoveryOutcome {
        let Some(aligned) = align_to_pdf(buffer) else {
            return RecoveryOutcome::Skipped("no %PDF- header".into());
        };
        let skipped = buffer.len() - aligned.len();
        if skipped > 0 {
            debug!("Dropped {} bytes before %PDF-", skipped);
        }
        let pdf = trim_to_last_eof(aligned);
        if pdf.len() < aligned.len() {
            debug!("Dropped {} bytes after last %%EOF", aligned.len() - pdf.len());
        }

        let mut extras = Vec::new();
        if config.emit_embedded_pdfs {
            for (i, span) in find_pdf_spans(buffer).iter().enumerate().skip(1) {
                debug!("Embedded PDF #{} at {}..{}", i + 1, span.start, span.end);
                extras.push(Artifact::new(
                    ArtifactKind::EmbeddedPdf { index: i + 1 },
                    trim_to_last_eof(span.slice(buffer)).to_vec(),
                ));
            }
        }

        RecoveryOutcome::Recovered(Recovered {
            pdf: pdf.to_vec(),
            pages: None,
            extras,
            rejected: Vec::new(),
        })
    }
}

/// Rebuild a PDF from every carvable JPEG/PNG, one image per page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRepack;

impl RecoveryStrategy for ImageRepack {
    fn method(&self) -> RecoveryMethod {
        RecoveryMethod::ImageRepack
    }

    fn attempt(&self, buffer: &[u8], config: &RecoveryConfig) -> RecoveryOutcome {
        let spans = find_image_spans(buffer);
        if spans.is_empty() {
            return RecoveryOutcome::Skipped("no JPEG/PNG signatures".into());
        }
        info!("Carved {} image(s) from buffer", spans.len());

        let images: Vec<CarvedImage<'_>> = spans
            .iter()
            .map(|s| CarvedImage {
                kind: s.kind,
                offset: s.start,
                bytes: s.slice(buffer),
            })
            .collect();

        match images_to_pdf(&images, config.raster_decoder.as_deref(), config.image_dpi) {
            Ok(built) => {
                let extras = if config.emit_carved_images {
                    images
                        .iter()
                        .enumerate()
                        .map(|(index, img)| {
                            Artifact::new(
                                ArtifactKind::CarvedImage {
                                    index,
                                    kind: img.kind,
                                },
                                img.bytes.to_vec(),
                            )
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                RecoveryOutcome::Recovered(Recovered {
                    pdf: built.pdf,
                    pages: Some(built.pages),
                    extras,
                    rejected: built.rejected,
                })
            }
            Err(e) => RecoveryOutcome::Failed(e),
        }
    }
}

/// The recovery strategies in priority order.
pub fn default_recovery_strategies() -> [&'static dyn RecoveryStrategy; 2] {
    [&PdfCarve, &ImageRepack]
}

// ── In-memory entry points ───────────────────────────────────────────────

/// Recover a PDF from a column value.
///
/// Text values go through the text-layer decoders; byte values are used
/// as-is. Both then get one double-decode pass.
///
/// # Errors
/// Decoding errors ([`RecoverError::UnrecognizedEncoding`],
/// [`RecoverError::TruncatedHex`], [`RecoverError::InvalidDataUrl`]), and
/// [`RecoverError::NotAPdf`] / [`RecoverError::NoValidImages`] carrying the
/// decoded buffer. A trailer that cannot be repaired is not an error.
pub fn recover(
    value: impl Into<BlobValue>,
    config: &RecoveryConfig,
) -> Result<RecoveryResult, RecoverError> {
    recover_value(value.into(), None, config)
}

/// Recover a PDF from dump text.
pub fn recover_text(text: &str, config: &RecoveryConfig) -> Result<RecoveryResult, RecoverError> {
    recover(text, config)
}

/// Recover a PDF from raw octets.
pub fn recover_bytes(bytes: &[u8], config: &RecoveryConfig) -> Result<RecoveryResult, RecoverError> {
    recover(bytes, config)
}

fn recover_value(
    value: BlobValue,
    text_encoding: Option<TextEncoding>,
    config: &RecoveryConfig,
) -> Result<RecoveryResult, RecoverError> {
    let start = Instant::now();

    // ── Step 1: Strip the text layer ─────────────────────────────────────
    let (input_len, encoding, decoded) = match value {
        BlobValue::Text(text) => {
            let d = decode::decode_dump(&text, text_encoding, config)?;
            (text.chars().count(), d.guess, d.bytes)
        }
        BlobValue::Bytes(bytes) => {
            debug!("Binary value, {} bytes used as-is", bytes.len());
            (bytes.len(), EncodingGuess::Raw, bytes)
        }
    };

    // ── Step 2: Double-decode ────────────────────────────────────────────
    let redecoded = maybe_redecode(&decoded, config);
    let redecode_kind = redecoded.kind;
    let buffer = redecoded.bytes;

    let header = header_hex(&buffer);
    info!("Decoded buffer: {} bytes, header {}", buffer.len(), header);

    // ── Step 3: Scan ─────────────────────────────────────────────────────
    let pdf_spans = find_pdf_spans(&buffer);
    let image_spans = find_image_spans(&buffer);
    debug!(
        "Signatures: {} PDF span(s), {} image span(s)",
        pdf_spans.len(),
        image_spans.len()
    );

    // ── Step 4: Recovery strategies ──────────────────────────────────────
    let (method, recovered) = run_strategies(&buffer, &default_recovery_strategies(), config)?;

    // ── Step 5: Trailer ──────────────────────────────────────────────────
    let (xref, repaired) = settle_trailer(&recovered.pdf, config);

    let primary_kind = match method {
        RecoveryMethod::PdfCarve => ArtifactKind::ConvertedPdf,
        RecoveryMethod::ImageRepack => ArtifactKind::ImagesPdf,
    };
    let Recovered {
        pdf,
        mut pages,
        extras,
        mut rejected,
    } = recovered;
    let mut artifacts = vec![Artifact::new(primary_kind, pdf)];
    if let Some(bytes) = repaired {
        artifacts.push(Artifact::new(ArtifactKind::RepairedPdf, bytes));
    }
    artifacts.extend(extras);

    // ── Step 6: Image fallback for an unrepairable carve ─────────────────
    if method == RecoveryMethod::PdfCarve
        && matches!(xref, XrefStatus::Unrepairable { .. })
        && !image_spans.is_empty()
    {
        match ImageRepack.attempt(&buffer, config) {
            RecoveryOutcome::Recovered(fallback) => {
                info!(
                    "Trailer unrepairable; also rebuilt {} page(s) from images",
                    fallback.pages.unwrap_or_default()
                );
                artifacts.push(Artifact::new(ArtifactKind::FallbackImagesPdf, fallback.pdf));
                artifacts.extend(fallback.extras);
                pages = fallback.pages;
                rejected.extend(fallback.rejected);
            }
            RecoveryOutcome::Skipped(reason) => debug!("Image fallback skipped: {}", reason),
            RecoveryOutcome::Failed(e) => warn!("Image fallback failed: {}", e),
        }
    }

    let stats = RecoveryStats {
        input_len,
        decoded_len: buffer.len(),
        artifact_count: artifacts.len(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Recovered via {:?}: {} artifact(s) in {}ms",
        method, stats.artifact_count, stats.total_duration_ms
    );

    Ok(RecoveryResult {
        encoding,
        text_encoding,
        redecoded: redecode_kind,
        header_hex: header,
        method,
        pdf_spans,
        image_spans,
        xref,
        pages,
        artifacts,
        rejected_images: rejected,
        stats,
    })
}

/// Evaluate `strategies` in order over the decoded buffer.
pub fn run_strategies(
    buffer: &[u8],
    strategies: &[&dyn RecoveryStrategy],
    config: &RecoveryConfig,
) -> Result<(RecoveryMethod, Recovered), RecoverError> {
    for strategy in strategies {
        match strategy.attempt(buffer, config) {
            RecoveryOutcome::Recovered(r) => return Ok((strategy.method(), r)),
            RecoveryOutcome::Skipped(reason) => {
                debug!("{:?} skipped: {}", strategy.method(), reason);
            }
            RecoveryOutcome::Failed(e) => return Err(with_dump(e, buffer)),
        }
    }
    Err(RecoverError::not_a_pdf(buffer))
}

/// Attach the decoded buffer to a failure that should carry one.
fn with_dump(e: RecoverError, buffer: &[u8]) -> RecoverError {
    match e {
        RecoverError::NoValidImages {
            found,
            first_error,
            dump,
        } if dump.is_empty() => RecoverError::NoValidImages {
            found,
            first_error,
            dump: buffer.to_vec(),
        },
        other => other,
    }
}

/// Validate the trailer and repair it when allowed.
fn settle_trailer(pdf: &[u8], config: &RecoveryConfig) -> (XrefStatus, Option<Vec<u8>>) {
    match XrefRepairer::from_config(config) {
        Some(repairer) => {
            let r = repairer.repair(pdf);
            (r.status, r.repaired)
        }
        None => {
            let check = XrefRepairer::new(config.xref_window, config.xref_backtrack).check(pdf);
            let status = match check {
                XrefCheck::Valid { offset, target } => XrefStatus::Valid { offset, target },
                XrefCheck::Unrepairable { reason } => XrefStatus::Unrepairable { reason },
                XrefCheck::Broken { declared, .. } => {
                    warn!("startxref {} is wrong and repair is disabled", declared);
                    XrefStatus::Unrepairable {
                        reason: UnrepairableReason::Disabled,
                    }
                }
            };
            (status, None)
        }
    }
}

// ── File entry points ────────────────────────────────────────────────────

/// Recover a PDF from a dump file.
///
/// With `binary` the file holds the octets themselves; otherwise it is read
/// as text (UTF-8, UTF-16LE/BE, then Latin-1).
pub async fn recover_file(
    path: impl AsRef<Path>,
    binary: bool,
    config: &RecoveryConfig,
) -> Result<RecoveryResult, RecoverError> {
    let path = path.as_ref();
    info!("Recovering {}", path.display());
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| input::read_error(path, e))?;

    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let (value, text_encoding) = input::classify(bytes, binary);
        recover_value(value, text_encoding, &config)
    })
    .await
    .map_err(|e| RecoverError::Internal(format!("recovery task failed: {e}")))?
}

/// Synchronous wrapper around [`recover_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn recover_file_sync(
    path: impl AsRef<Path>,
    binary: bool,
    config: &RecoveryConfig,
) -> Result<RecoveryResult, RecoverError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RecoverError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(recover_file(path, binary, config))
}

/// A recovery result together with the files written for it.
#[derive(Debug)]
pub struct SavedRecovery {
    pub result: RecoveryResult,
    pub written: Vec<PathBuf>,
}

/// Recover a dump file and write every artifact into `out_dir`.
///
/// Files are named after the input's stem (see [`Artifact::file_name`]) and
/// written atomically: temp file in `out_dir`, then rename. When recovery
/// fails with a buffer attached, `<stem>.dump.bin` is written before the
/// error is returned.
///
/// # Errors
/// [`RecoverError::OutputIsInput`] when an artifact name resolves to `path`
/// itself; nothing is written then.
pub async fn recover_to_dir(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    binary: bool,
    config: &RecoveryConfig,
) -> Result<SavedRecovery, RecoverError> {
    let path = path.as_ref();
    let out_dir = out_dir.as_ref().to_path_buf();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recovered".to_string());

    tokio::fs::create_dir_all(&out_dir)
        .await
        .map_err(|e| RecoverError::OutputWriteFailed {
            path: out_dir.clone(),
            source: e,
        })?;

    match recover_file(path, binary, config).await {
        Ok(result) => {
            let artifacts = result.artifacts.clone();
            ensure_input_untouched(path, &out_dir, &stem, &artifacts).await?;
            let written = write_on_blocking_pool(out_dir, stem, artifacts).await?;
            Ok(SavedRecovery { result, written })
        }
        Err(e) => {
            if let Some(dump) = e.diagnostic_dump() {
                let raw = vec![Artifact::new(ArtifactKind::RawDump, dump.to_vec())];
                let saved = match ensure_input_untouched(path, &out_dir, &stem, &raw).await {
                    Ok(()) => write_on_blocking_pool(out_dir, stem, raw).await,
                    Err(guard) => Err(guard),
                };
                match saved {
                    Ok(written) => {
                        for p in &written {
                            warn!("Recovery failed; raw buffer kept at {}", p.display());
                        }
                    }
                    Err(write_err) => warn!("Could not keep raw buffer: {}", write_err),
                }
            }
            Err(e)
        }
    }
}

/// Fail when any artifact would land on the input file.
async fn ensure_input_untouched(
    input: &Path,
    out_dir: &Path,
    stem: &str,
    artifacts: &[Artifact],
) -> Result<(), RecoverError> {
    let Ok(input) = tokio::fs::canonicalize(input).await else {
        return Ok(());
    };
    for artifact in artifacts {
        let target = out_dir.join(artifact.file_name(stem));
        if let Ok(resolved) = tokio::fs::canonicalize(&target).await {
            if resolved == input {
                return Err(RecoverError::OutputIsInput { path: target });
            }
        }
    }
    Ok(())
}

async fn write_on_blocking_pool(
    out_dir: PathBuf,
    stem: String,
    artifacts: Vec<Artifact>,
) -> Result<Vec<PathBuf>, RecoverError> {
    tokio::task::spawn_blocking(move || write_artifacts(&out_dir, &stem, &artifacts))
        .await
        .map_err(|e| RecoverError::Internal(format!("write task failed: {e}")))?
}

/// Write artifacts into `dir`, each through a temp file and rename.
pub fn write_artifacts(
    dir: &Path,
    stem: &str,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, RecoverError> {
    artifacts
        .iter()
        .map(|artifact| {
            let path = dir.join(artifact.file_name(stem));
            let write_err = |e: std::io::Error| RecoverError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            };
            let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
            tmp.write_all(&artifact.bytes).map_err(write_err)?;
            tmp.persist(&path).map_err(|e| write_err(e.error))?;
            debug!("Wrote {} ({} bytes)", path.display(), artifact.len);
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec();
        let xref_at = pdf.len();
        pdf.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n0000000009 00000 n \n");
        pdf.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
        pdf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_at).as_bytes());
        pdf
    }

    #[test]
    fn binary_pdf_with_prefix_and_suffix() {
        let pdf = minimal_pdf();
        let mut buf = b"JUNK!".to_vec();
        buf.extend_from_slice(&pdf);
        buf.extend_from_slice(b"\x00\x00\x00");
        let r = recover_bytes(&buf, &RecoveryConfig::default()).unwrap();
        assert_eq!(r.encoding, EncodingGuess::Raw);
        assert_eq!(r.method, RecoveryMethod::PdfCarve);
        assert_eq!(r.pdf(), &pdf[..]);
        assert!(matches!(r.xref, XrefStatus::Valid { .. }));
        assert!(r.artifact(ArtifactKind::RepairedPdf).is_none());
        assert_eq!(r.header_hex, "4A554E4B21255044");
    }

    #[test]
    fn hex_text_recovers() {
        let pdf = minimal_pdf();
        let r = recover_text(&hex::encode_upper(&pdf), &RecoveryConfig::default()).unwrap();
        assert_eq!(r.encoding, EncodingGuess::DirtyHex);
        assert_eq!(r.pdf(), &pdf[..]);
    }

    #[test]
    fn broken_trailer_gets_repaired_artifact() {
        let pdf = minimal_pdf();
        let text = String::from_utf8(pdf.clone()).unwrap();
        let broken = text.replace(
            &text[text.rfind("startxref").unwrap()..],
            "startxref\n123456\n%%EOF\n",
        );
        let r = recover_bytes(broken.as_bytes(), &RecoveryConfig::default()).unwrap();
        assert!(matches!(r.xref, XrefStatus::Repaired { declared: 123_456, .. }));
        assert_eq!(r.artifacts.len(), 2);
        assert_eq!(r.pdf(), &pdf[..]);
        assert_eq!(
            r.artifact(ArtifactKind::ConvertedPdf).unwrap().bytes,
            broken.as_bytes()
        );
    }

    #[test]
    fn repair_disabled_reports_disabled() {
        let cfg = RecoveryConfig::builder().xref_repair(false).build().unwrap();
        let r = recover_bytes(b"%PDF-1.4\nxref\nstartxref\n999\n%%EOF", &cfg).unwrap();
        assert_eq!(
            r.xref,
            XrefStatus::Unrepairable {
                reason: UnrepairableReason::Disabled
            }
        );
        assert_eq!(r.artifacts.len(), 1);
    }

    #[test]
    fn embedded_pdfs_are_extra_artifacts() {
        let pdf = minimal_pdf();
        let mut buf = pdf.clone();
        buf.extend_from_slice(&pdf);
        let r = recover_bytes(&buf, &RecoveryConfig::default()).unwrap();
        assert_eq!(r.pdf_spans.len(), 2);
        let part = r.artifact(ArtifactKind::EmbeddedPdf { index: 2 }).unwrap();
        assert_eq!(part.bytes, pdf);

        let cfg = RecoveryConfig::builder()
            .emit_embedded_pdfs(false)
            .build()
            .unwrap();
        let r = recover_bytes(&buf, &cfg).unwrap();
        assert!(r.artifact(ArtifactKind::EmbeddedPdf { index: 2 }).is_none());
    }

    #[test]
    fn not_a_pdf_carries_buffer() {
        let err = recover_text("SGVsbG8gV29ybGQh", &RecoveryConfig::default()).unwrap_err();
        match err {
            RecoverError::NotAPdf { len, ref dump, .. } => {
                assert_eq!(len, 12);
                assert_eq!(dump, b"Hello World!");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn no_valid_images_carries_buffer() {
        let buf = [0xFF, 0xD8, 0x00, 0x01, 0xFF, 0xD9];
        let err = recover_bytes(&buf, &RecoveryConfig::default()).unwrap_err();
        assert!(matches!(err, RecoverError::NoValidImages { found: 1, .. }));
        assert_eq!(err.diagnostic_dump(), Some(&buf[..]));
    }

    #[test]
    fn unrepairable_carve_falls_back_to_images() {
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(5, 3))
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        let mut buf = b"%PDF-1.4\n1 0 obj\n<< /Length 9 >>\nstream\n".to_vec();
        buf.extend_from_slice(&jpeg);

        let r = recover_bytes(&buf, &RecoveryConfig::default()).unwrap();
        assert_eq!(r.method, RecoveryMethod::PdfCarve);
        assert_eq!(
            r.xref,
            XrefStatus::Unrepairable {
                reason: UnrepairableReason::NoStartxref
            }
        );
        assert_eq!(r.pdf(), &buf[..]);
        let fallback = r.artifact(ArtifactKind::FallbackImagesPdf).unwrap();
        assert!(fallback.bytes.starts_with(b"%PDF-"));
        assert_eq!(r.pages, Some(1));
        assert_eq!(r.carved_images().count(), 1);
    }

    #[test]
    fn valid_carve_does_not_repack_images() {
        let mut buf = minimal_pdf();
        buf.extend_from_slice(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9]);
        let r = recover_bytes(&buf, &RecoveryConfig::default()).unwrap();
        assert_eq!(r.image_spans.len(), 1);
        assert!(r.artifact(ArtifactKind::FallbackImagesPdf).is_none());
        assert_eq!(r.pages, None);
    }

    #[test]
    fn strategy_order_is_pdf_first() {
        let methods: Vec<_> = default_recovery_strategies()
            .iter()
            .map(|s| s.method())
            .collect();
        assert_eq!(
            methods,
            vec![RecoveryMethod::PdfCarve, RecoveryMethod::ImageRepack]
        );
    }

    #[test]
    fn write_artifacts_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            Artifact::new(ArtifactKind::ConvertedPdf, b"%PDF-x".to_vec()),
            Artifact::new(ArtifactKind::RawDump, vec![0, 1]),
        ];
        let written = write_artifacts(dir.path(), "d", &artifacts).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("d.pdf"), dir.path().join("d.dump.bin")]
        );
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"%PDF-x");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
