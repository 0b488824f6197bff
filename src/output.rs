//! Output types returned by the recovery functions.

use crate::error::ImageRejected;
use crate::pipeline::decode::EncodingGuess;
use crate::pipeline::input::TextEncoding;
use crate::pipeline::redecode::RedecodeKind;
use crate::pipeline::scan::{Span, SpanKind};
use crate::pipeline::xref::XrefStatus;
use serde::{Deserialize, Serialize};

/// Number of leading bytes reported as the decoded buffer's header.
pub const HEADER_LEN: usize = 8;

/// Which recovery strategy produced the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMethod {
    /// A `%PDF-` document was carved out of the buffer.
    PdfCarve,
    /// Carved JPEG/PNG images were repackaged, one per page.
    ImageRepack,
}

/// What an [`Artifact`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The carved and trimmed PDF.
    ConvertedPdf,
    /// The carved PDF with a rewritten trailer.
    RepairedPdf,
    /// PDF built from carved images.
    ImagesPdf,
    /// PDF built from carved images next to a carved PDF whose trailer could
    /// not be repaired.
    FallbackImagesPdf,
    /// One carved image, 0-based in buffer order.
    CarvedImage { index: usize, kind: SpanKind },
    /// A further `%PDF-` span; `index` is its 1-based position among all spans.
    EmbeddedPdf { index: usize },
    /// The decoded buffer itself, kept when nothing could be recovered.
    RawDump,
}

/// A named byte buffer produced by recovery.
///
/// Where it is stored is up to the caller; [`Artifact::file_name`] gives the
/// naming used by [`crate::recover_to_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub len: usize,
    /// First bytes as upper-case hex.
    pub header_hex: String,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            len: bytes.len(),
            header_hex: header_hex(&bytes),
            bytes,
        }
    }

    /// File name for this artifact next to an input called `stem`.
    pub fn file_name(&self, stem: &str) -> String {
        match self.kind {
            ArtifactKind::ConvertedPdf | ArtifactKind::ImagesPdf => format!("{stem}.pdf"),
            ArtifactKind::RepairedPdf => format!("{stem}.repaired.pdf"),
            ArtifactKind::FallbackImagesPdf => format!("{stem}.images.pdf"),
            ArtifactKind::CarvedImage { index, kind } => {
                format!("{stem}_img{:02}.{}", index + 1, kind.extension())
            }
            ArtifactKind::EmbeddedPdf { index } => format!("{stem}_part{index}.pdf"),
            ArtifactKind::RawDump => format!("{stem}.dump.bin"),
        }
    }
}

/// First [`HEADER_LEN`] bytes as upper-case hex.
pub fn header_hex(bytes: &[u8]) -> String {
    hex::encode_upper(&bytes[..bytes.len().min(HEADER_LEN)])
}

/// Timing and size figures for one recovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStats {
    /// Characters of dump text, or bytes of a binary value.
    pub input_len: usize,
    pub decoded_len: usize,
    pub artifact_count: usize,
    pub total_duration_ms: u64,
}

/// Everything one recovery run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryResult {
    /// Text layer that was stripped.
    pub encoding: EncodingGuess,
    /// Character encoding of the dump file, when read from one as text.
    pub text_encoding: Option<TextEncoding>,
    /// Second layer removed by the double-decode pass.
    pub redecoded: Option<RedecodeKind>,
    /// Header of the fully decoded buffer.
    pub header_hex: String,
    pub method: RecoveryMethod,
    pub pdf_spans: Vec<Span>,
    pub image_spans: Vec<Span>,
    /// Trailer state of the primary PDF.
    pub xref: XrefStatus,
    /// Page count, known only when a PDF was built from images.
    pub pages: Option<usize>,
    pub artifacts: Vec<Artifact>,
    /// Carved images skipped because they did not decode.
    pub rejected_images: Vec<ImageRejected>,
    pub stats: RecoveryStats,
}

impl RecoveryResult {
    /// The best PDF: repaired if a repair happened, otherwise the original.
    pub fn pdf(&self) -> &[u8] {
        self.artifact(ArtifactKind::RepairedPdf)
            .or_else(|| self.artifact(ArtifactKind::ConvertedPdf))
            .or_else(|| self.artifact(ArtifactKind::ImagesPdf))
            .map(|a| a.bytes.as_slice())
            .unwrap_or_default()
    }

    /// First artifact of exactly `kind`.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// Carved image artifacts, in buffer order.
    pub fn carved_images(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.kind, ArtifactKind::CarvedImage { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        let a = |kind| Artifact::new(kind, Vec::new()).file_name("dump");
        assert_eq!(a(ArtifactKind::ConvertedPdf), "dump.pdf");
        assert_eq!(a(ArtifactKind::RepairedPdf), "dump.repaired.pdf");
        assert_eq!(a(ArtifactKind::ImagesPdf), "dump.pdf");
        assert_eq!(a(ArtifactKind::FallbackImagesPdf), "dump.images.pdf");
        assert_eq!(
            a(ArtifactKind::CarvedImage {
                index: 0,
                kind: SpanKind::Png
            }),
            "dump_img01.png"
        );
        assert_eq!(a(ArtifactKind::EmbeddedPdf { index: 2 }), "dump_part2.pdf");
        assert_eq!(a(ArtifactKind::RawDump), "dump.dump.bin");
    }

    #[test]
    fn artifact_header() {
        let a = Artifact::new(ArtifactKind::ConvertedPdf, b"%PDF-1.7\n%%EOF".to_vec());
        assert_eq!(a.len, 14);
        assert_eq!(a.header_hex, "255044462D312E37");
    }

    #[test]
    fn bytes_not_serialised() {
        let a = Artifact::new(ArtifactKind::RawDump, vec![1, 2, 3]);
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("bytes").is_none());
        assert_eq!(json["kind"]["type"], "raw_dump");
        assert_eq!(json["len"], 3);
    }
}
