//! PDF assembly: trim a carved PDF, or build one from carved images.
//!
//! Two independent operations:
//!
//! * [`trim_to_last_eof`] cuts trailing garbage after the final `%%EOF`
//!   (dumps of fixed-width columns are often padded or followed by noise).
//! * [`images_to_pdf`] writes a minimal PDF with one page per image, in
//!   input order, each image filling its page.
//!
//! The writer is deliberately small: a catalog, a page tree, and per page an
//! image XObject plus a one-line content stream, followed by a classic xref
//! table. No fonts, no object streams.

use crate::error::{ImageRejected, RecoverError};
use crate::pipeline::raster::{RasterDecoder, RasterImage};
use crate::pipeline::scan::{find_from, rfind, skip_eol, SpanKind, PDF_EOF, PDF_MAGIC};
use tracing::{debug, info, warn};

/// Truncate right after the last `%%EOF` and any CR/LF following it.
///
/// Without a `%%EOF` the input is returned whole: some producers omit the
/// marker, and a truncated PDF is still worth handing to a reader. The result
/// is never longer than the input.
pub fn trim_to_last_eof(pdf: &[u8]) -> &[u8] {
    match rfind(pdf, PDF_EOF) {
        Some(idx) => &pdf[..skip_eol(pdf, idx + PDF_EOF.len())],
        None => pdf,
    }
}

/// The buffer from its first `%PDF-` header onwards, if it has one.
pub fn align_to_pdf(buffer: &[u8]) -> Option<&[u8]> {
    find_from(buffer, PDF_MAGIC, 0).map(|start| &buffer[start..])
}

/// One carved image handed to [`images_to_pdf`].
#[derive(Debug, Clone, Copy)]
pub struct CarvedImage<'a> {
    pub kind: SpanKind,
    /// Offset of the image in the decoded buffer (diagnostics only).
    pub offset: usize,
    pub bytes: &'a [u8],
}

/// PDF built from carved images.
#[derive(Debug, Clone)]
pub struct ImagesPdf {
    pub pdf: Vec<u8>,
    pub pages: usize,
    /// Images skipped because they did not decode.
    pub rejected: Vec<ImageRejected>,
}

/// Build a PDF with one page per decodable image, in input order.
///
/// Images that fail to decode are skipped and reported in
/// [`ImagesPdf::rejected`]. Fails with [`RecoverError::NoValidImages`] when no
/// image survives, including when `decoder` is `None`. The error's `dump` is
/// left empty; the caller owns the full buffer.
pub fn images_to_pdf(
    images: &[CarvedImage<'_>],
    decoder: Option<&dyn RasterDecoder>,
    dpi: f32,
) -> Result<ImagesPdf, RecoverError> {
    let Some(decoder) = decoder else {
        return Err(RecoverError::NoValidImages {
            found: images.len(),
            first_error: "no raster decoder configured".into(),
            dump: Vec::new(),
        });
    };

    let mut rasters = Vec::with_capacity(images.len());
    let mut rejected = Vec::new();
    for (index, image) in images.iter().enumerate() {
        match decoder.decode(image.kind, image.bytes) {
            Ok(raster) => rasters.push(raster),
            Err(e) => {
                warn!(
                    "Skipping {} at offset {}: {}",
                    image.kind, image.offset, e
                );
                rejected.push(ImageRejected {
                    index,
                    kind: image.kind.to_string(),
                    offset: image.offset,
                    detail: e.to_string(),
                });
            }
        }
    }

    if rasters.is_empty() {
        let first_error = rejected
            .first()
            .map(|r| r.detail.clone())
            .unwrap_or_else(|| "no images found".to_string());
        return Err(RecoverError::NoValidImages {
            found: images.len(),
            first_error,
            dump: Vec::new(),
        });
    }

    let pdf = write_image_pdf(&rasters, dpi);
    info!(
        "Built {}-page PDF from images ({} skipped, {} bytes)",
        rasters.len(),
        rejected.len(),
        pdf.len()
    );
    Ok(ImagesPdf {
        pdf,
        pages: rasters.len(),
        rejected,
    })
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FIRST_PAGE_ID: usize = 3;
const OBJECTS_PER_PAGE: usize = 3;

/// Serialise the rasters as a PDF, one full-bleed page each.
fn write_image_pdf(rasters: &[RasterImage], dpi: f32) -> Vec<u8> {
    let page_id = |i: usize| FIRST_PAGE_ID + i * OBJECTS_PER_PAGE;
    let scale = 72.0 / dpi;

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(3 + rasters.len() * OBJECTS_PER_PAGE);
    objects.push(
        format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID).into_bytes(),
    );
    let kids = (0..rasters.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            rasters.len()
        )
        .into_bytes(),
    );

    for (i, raster) in rasters.iter().enumerate() {
        let image_id = page_id(i) + 1;
        let content_id = page_id(i) + 2;
        let w = pdf_number(raster.width as f32 * scale);
        let h = pdf_number(raster.height as f32 * scale);

        objects.push(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /XObject << /Im0 {} 0 R >> >> /Contents {} 0 R >>",
                PAGES_ID, w, h, image_id, content_id
            )
            .into_bytes(),
        );
        objects.push(image_object(raster));
        objects.push(stream_object(
            format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", w, h).as_bytes(),
        ));
        debug!("Page {}: {}x{} pt", i + 1, w, h);
    }

    let info_id = objects.len() + 1;
    objects.push(b"<< /Producer (blob2pdf) >>".to_vec());

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            CATALOG_ID,
            info_id,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn image_object(raster: &RasterImage) -> Vec<u8> {
    let mut obj = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
         /BitsPerComponent 8 /Filter {} /Length {} >>\nstream\n",
        raster.width,
        raster.height,
        raster.color_space.as_pdf_name(),
        raster.filter.as_pdf_name(),
        raster.data.len()
    )
    .into_bytes();
    obj.extend_from_slice(&raster.data);
    obj.extend_from_slice(b"\nendstream");
    obj
}

fn stream_object(content: &[u8]) -> Vec<u8> {
    let mut obj = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    obj.extend_from_slice(content);
    obj.extend_from_slice(b"\nendstream");
    obj
}

/// Integers without a fraction, otherwise up to three decimals.
fn pdf_number(v: f32) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.3}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::raster::ImageCrateDecoder;
    use crate::pipeline::scan::{find_image_spans, PNG_IEND, PNG_SIGNATURE};
    use crate::pipeline::xref::{XrefCheck, XrefRepairer};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 120, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg).unwrap();
        buf
    }

    fn corrupt_png() -> Vec<u8> {
        let mut v = PNG_SIGNATURE.to_vec();
        v.extend_from_slice(b"\x00\x00\x00\x0DIHDRgarbage");
        v.extend_from_slice(PNG_IEND);
        v
    }

    fn count(hay: &[u8], needle: &[u8]) -> usize {
        hay.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn trim_drops_trailing_garbage() {
        let pdf = b"%PDF-1.4\nx\n%%EOF\r\n\x00\x00junk";
        assert_eq!(trim_to_last_eof(pdf), b"%PDF-1.4\nx\n%%EOF\r\n");
    }

    #[test]
    fn trim_keeps_incremental_updates() {
        let pdf = b"%PDF-1.4\n%%EOF\nupdate\n%%EOF\npad";
        assert_eq!(trim_to_last_eof(pdf), b"%PDF-1.4\n%%EOF\nupdate\n%%EOF\n");
    }

    #[test]
    fn trim_without_eof_is_identity() {
        let pdf = b"%PDF-1.4\nno end";
        assert_eq!(trim_to_last_eof(pdf), pdf);
    }

    #[test]
    fn align_skips_prefix() {
        assert_eq!(align_to_pdf(b"12345%PDF-1.7"), Some(&b"%PDF-1.7"[..]));
        assert_eq!(align_to_pdf(b"nothing"), None);
    }

    #[test]
    fn empty_image_list_fails() {
        let err = images_to_pdf(&[], Some(&ImageCrateDecoder), 72.0).unwrap_err();
        assert!(matches!(err, RecoverError::NoValidImages { found: 0, .. }));
    }

    #[test]
    fn missing_decoder_fails() {
        let j = jpeg(4, 4);
        let images = [CarvedImage {
            kind: SpanKind::Jpg,
            offset: 0,
            bytes: &j,
        }];
        let err = images_to_pdf(&images, None, 72.0).unwrap_err();
        assert!(err.to_string().contains("no raster decoder"));
    }

    #[test]
    fn corrupt_image_is_skipped() {
        let j = jpeg(10, 8);
        let p = corrupt_png();
        let images = [
            CarvedImage {
                kind: SpanKind::Jpg,
                offset: 0,
                bytes: &j,
            },
            CarvedImage {
                kind: SpanKind::Png,
                offset: j.len(),
                bytes: &p,
            },
        ];
        let out = images_to_pdf(&images, Some(&ImageCrateDecoder), 72.0).unwrap();
        assert_eq!(out.pages, 1);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].index, 1);
        assert_eq!(out.rejected[0].kind, "png");
        assert!(out.pdf.starts_with(b"%PDF-1.4"));
        assert_eq!(count(&out.pdf, b"/Count 1"), 1);
        assert_eq!(count(&out.pdf, b"/MediaBox [0 0 10 8]"), 1);
        assert_eq!(count(&out.pdf, b"/DCTDecode"), 1);
    }

    #[test]
    fn built_pdf_has_valid_trailer() {
        let j = jpeg(6, 6);
        let spans = find_image_spans(&j);
        let images: Vec<_> = spans
            .iter()
            .map(|s| CarvedImage {
                kind: s.kind,
                offset: s.start,
                bytes: s.slice(&j),
            })
            .collect();
        let out = images_to_pdf(&images, Some(&ImageCrateDecoder), 72.0).unwrap();
        assert_eq!(trim_to_last_eof(&out.pdf), &out.pdf[..]);
        assert!(matches!(
            XrefRepairer::default().check(&out.pdf),
            XrefCheck::Valid { .. }
        ));
    }

    #[test]
    fn dpi_scales_page_size() {
        let j = jpeg(144, 72);
        let images = [CarvedImage {
            kind: SpanKind::Jpg,
            offset: 0,
            bytes: &j,
        }];
        let out = images_to_pdf(&images, Some(&ImageCrateDecoder), 144.0).unwrap();
        assert_eq!(count(&out.pdf, b"/MediaBox [0 0 72 36]"), 1);
    }

    #[test]
    fn pdf_number_format() {
        assert_eq!(pdf_number(72.0), "72");
        assert_eq!(pdf_number(7.5), "7.5");
        assert_eq!(pdf_number(1.0 / 3.0), "0.333");
    }
}
