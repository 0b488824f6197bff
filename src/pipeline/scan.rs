//! Signature scanning: locate embedded PDFs and images inside a buffer.
//!
//! Carving works on signatures alone, without trusting any container
//! metadata: a PDF runs from `%PDF-` to the next `%%EOF`, a JPEG from SOI to
//! the next EOI, a PNG from its 8-byte signature to the end of the next
//! `IEND` chunk. Within one family, scanning resumes strictly after the
//! previous match, so spans never overlap.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const PDF_MAGIC: &[u8] = b"%PDF-";
pub const PDF_EOF: &[u8] = b"%%EOF";
pub const JPEG_SOI: &[u8] = &[0xFF, 0xD8];
pub const JPEG_EOI: &[u8] = &[0xFF, 0xD9];
pub const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// `IEND` chunk type followed by its CRC.
pub const PNG_IEND: &[u8] = &[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];

/// Kind of embedded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Pdf,
    Jpg,
    Png,
}

impl SpanKind {
    /// File extension for a carved object of this kind.
    pub fn extension(self) -> &'static str {
        match self {
            SpanKind::Pdf => "pdf",
            SpanKind::Jpg => "jpg",
            SpanKind::Png => "png",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A detected object: `buffer[start..end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    /// Exclusive.
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.start..self.end]
    }
}

/// Position of the first `needle` at or after `from`.
pub fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Position of the last `needle`.
pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Index just past any CR/LF bytes starting at `pos`.
pub fn skip_eol(buffer: &[u8], mut pos: usize) -> usize {
    while pos < buffer.len() && matches!(buffer[pos], b'\r' | b'\n') {
        pos += 1;
    }
    pos
}

/// Every `%PDF-` … `%%EOF` span, in order.
///
/// The end includes the marker and any CR/LF right after it. A header with
/// no `%%EOF` after it is a truncated PDF and extends to the end of the buffer.
pub fn find_pdf_spans(buffer: &[u8]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_from(buffer, PDF_MAGIC, pos) {
        let end = match find_from(buffer, PDF_EOF, start) {
            Some(eof) => skip_eol(buffer, eof + PDF_EOF.len()),
            None => buffer.len(),
        };
        spans.push(Span {
            kind: SpanKind::Pdf,
            start,
            end,
        });
        pos = end;
    }
    spans
}

fn find_delimited(buffer: &[u8], kind: SpanKind, head: &[u8], tail: &[u8]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_from(buffer, head, pos) {
        // No terminator after this header means none after any later one.
        let Some(tail_at) = find_from(buffer, tail, start + head.len()) else {
            break;
        };
        let end = tail_at + tail.len();
        spans.push(Span { kind, start, end });
        pos = end;
    }
    spans
}

/// Every complete JPEG (`FF D8` … `FF D9`), in order.
pub fn find_jpeg_spans(buffer: &[u8]) -> Vec<Span> {
    find_delimited(buffer, SpanKind::Jpg, JPEG_SOI, JPEG_EOI)
}

/// Every complete PNG (signature … `IEND` + CRC), in order.
pub fn find_png_spans(buffer: &[u8]) -> Vec<Span> {
    find_delimited(buffer, SpanKind::Png, PNG_SIGNATURE, PNG_IEND)
}

/// JPEG and PNG spans merged into one list ordered by start offset.
pub fn find_image_spans(buffer: &[u8]) -> Vec<Span> {
    let mut spans = find_jpeg_spans(buffer);
    spans.extend(find_png_spans(buffer));
    spans.sort_by_key(|s| s.start);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_png(body: &[u8]) -> Vec<u8> {
        let mut v = PNG_SIGNATURE.to_vec();
        v.extend_from_slice(body);
        v.extend_from_slice(&[0, 0, 0, 0]);
        v.extend_from_slice(PNG_IEND);
        v
    }

    #[test]
    fn pdf_span_with_junk_prefix() {
        let buf = b"junk!%PDF-1.4\nbody\n%%EOF\r\n";
        let spans = find_pdf_spans(buf);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 5);
        assert_eq!(spans[0].end, buf.len());
    }

    #[test]
    fn truncated_pdf_extends_to_end() {
        let buf = b"%PDF-1.4\n1 0 obj\n%%EOF\n%PDF-1.5\n2 0 obj";
        let spans = find_pdf_spans(buf);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].slice(buf), b"%PDF-1.4\n1 0 obj\n%%EOF\n");
        assert_eq!(spans[1].slice(buf), b"%PDF-1.5\n2 0 obj");
    }

    #[test]
    fn no_signatures_is_empty() {
        assert!(find_pdf_spans(b"hello").is_empty());
        assert!(find_image_spans(b"hello").is_empty());
        assert!(find_image_spans(b"").is_empty());
    }

    #[test]
    fn jpeg_without_eoi_is_ignored() {
        let buf = [0x00, 0xFF, 0xD8, 0xFF, 0xE0, 0x01];
        assert!(find_jpeg_spans(&buf).is_empty());
    }

    #[test]
    fn jpeg_spans_do_not_overlap() {
        let buf = [
            0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0x00, 0xFF, 0xD8, 0x02, 0xFF, 0xD9,
        ];
        let spans = find_jpeg_spans(&buf);
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end), (0, 5));
        assert_eq!((spans[1].start, spans[1].end), (6, 11));
    }

    #[test]
    fn mixed_images_keep_buffer_order() {
        let mut buf = vec![0xAA; 3];
        buf.extend_from_slice(&[0xFF, 0xD8, 0x11, 0xFF, 0xD9]);
        let png_at = buf.len();
        buf.extend(fake_png(b"IHDR"));
        let jpeg2_at = buf.len();
        buf.extend_from_slice(&[0xFF, 0xD8, 0x22, 0xFF, 0xD9]);

        let spans = find_image_spans(&buf);
        let kinds: Vec<_> = spans.iter().map(|s| (s.kind, s.start)).collect();
        assert_eq!(
            kinds,
            vec![
                (SpanKind::Jpg, 3),
                (SpanKind::Png, png_at),
                (SpanKind::Jpg, jpeg2_at)
            ]
        );
        assert_eq!(spans[1].end, jpeg2_at);
    }

    #[test]
    fn rfind_and_find_from() {
        let hay = b"xref startxref xref";
        assert_eq!(rfind(hay, b"xref"), Some(15));
        assert_eq!(find_from(hay, b"xref", 1), Some(10));
        assert_eq!(find_from(hay, b"xref", 100), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn assert_disjoint(spans: &[Span]) -> Result<(), TestCaseError> {
        for pair in spans.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
            prop_assert!(pair[0].end <= pair[1].start);
        }
        Ok(())
    }

    proptest! {
        /// Property: spans of one family never overlap
        #[test]
        fn same_kind_spans_never_overlap(
            chunks in prop::collection::vec(
                prop_oneof![
                    Just(JPEG_SOI.to_vec()),
                    Just(JPEG_EOI.to_vec()),
                    Just(PNG_SIGNATURE.to_vec()),
                    Just(PNG_IEND.to_vec()),
                    Just(PDF_MAGIC.to_vec()),
                    Just(PDF_EOF.to_vec()),
                    prop::collection::vec(any::<u8>(), 0..8),
                ],
                0..40,
            )
        ) {
            let buf: Vec<u8> = chunks.concat();
            assert_disjoint(&find_jpeg_spans(&buf))?;
            assert_disjoint(&find_png_spans(&buf))?;
            assert_disjoint(&find_pdf_spans(&buf))?;
        }

        /// Property: mixed image spans come back sorted by start
        #[test]
        fn image_spans_sorted(buf in prop::collection::vec(any::<u8>(), 0..2048)) {
            let spans = find_image_spans(&buf);
            prop_assert!(spans.windows(2).all(|p| p[0].start <= p[1].start));
        }
    }
}
