//! Raster decoding for the image-carving fallback.
//!
//! Rebuilding a PDF from carved images needs an image codec. It is injected
//! as a [`RasterDecoder`] through [`crate::RecoveryConfig::raster_decoder`]
//! rather than probed at runtime; without one, image repackaging fails with
//! [`crate::RecoverError::NoValidImages`].
//!
//! The default [`ImageCrateDecoder`] uses the `image` crate. Baseline JPEGs in
//! RGB or gray are embedded unchanged (`/DCTDecode`); everything else
//! (palette, alpha, 16-bit, CMYK) is normalised to 8-bit RGB and deflated.

use crate::pipeline::scan::SpanKind;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ColorType, ImageFormat};
use std::io::Write;
use thiserror::Error;
use tracing::debug;

/// Why a carved image could not be used.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("not an image kind: {0}")]
    Unsupported(SpanKind),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("deflate failed: {0}")]
    Encode(#[from] std::io::Error),
}

/// PDF colour space of an image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfColorSpace {
    DeviceRgb,
    DeviceGray,
}

impl PdfColorSpace {
    pub fn as_pdf_name(self) -> &'static str {
        match self {
            PdfColorSpace::DeviceRgb => "/DeviceRGB",
            PdfColorSpace::DeviceGray => "/DeviceGray",
        }
    }
}

/// Stream filter of an image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfFilter {
    /// Original JPEG bytes.
    Dct,
    /// zlib-deflated 8-bit samples.
    Flate,
}

impl PdfFilter {
    pub fn as_pdf_name(self) -> &'static str {
        match self {
            PdfFilter::Dct => "/DCTDecode",
            PdfFilter::Flate => "/FlateDecode",
        }
    }
}

/// An image ready to be written as a PDF image XObject.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub color_space: PdfColorSpace,
    pub filter: PdfFilter,
    /// Stream bytes, already encoded for `filter`.
    pub data: Vec<u8>,
}

/// Image codec capability used by [`crate::pipeline::assemble::images_to_pdf`].
pub trait RasterDecoder: Send + Sync {
    /// Decode one carved image into a PDF-embeddable raster.
    fn decode(&self, kind: SpanKind, bytes: &[u8]) -> Result<RasterImage, RasterError>;
}

/// [`RasterDecoder`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl RasterDecoder for ImageCrateDecoder {
    fn decode(&self, kind: SpanKind, bytes: &[u8]) -> Result<RasterImage, RasterError> {
        let format = match kind {
            SpanKind::Jpg => ImageFormat::Jpeg,
            SpanKind::Png => ImageFormat::Png,
            SpanKind::Pdf => return Err(RasterError::Unsupported(kind)),
        };
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| RasterError::Decode(e.to_string()))?;
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(RasterError::Empty { width, height });
        }

        if kind == SpanKind::Jpg {
            let passthrough = match (img.color(), jpeg_components(bytes)) {
                (ColorType::Rgb8, Some(3)) => Some(PdfColorSpace::DeviceRgb),
                (ColorType::L8, Some(1)) => Some(PdfColorSpace::DeviceGray),
                _ => None,
            };
            if let Some(color_space) = passthrough {
                debug!("JPEG {}x{} embedded as DCT", width, height);
                return Ok(RasterImage {
                    width,
                    height,
                    color_space,
                    filter: PdfFilter::Dct,
                    data: bytes.to_vec(),
                });
            }
        }

        let rgb = img.to_rgb8();
        let data = deflate(rgb.as_raw())?;
        debug!(
            "{} {}x{} ({:?}) normalised to RGB, {} bytes deflated",
            kind,
            width,
            height,
            img.color(),
            data.len()
        );
        Ok(RasterImage {
            width,
            height,
            color_space: PdfColorSpace::DeviceRgb,
            filter: PdfFilter::Flate,
            data,
        })
    }
}

/// zlib-compress `bytes` for a `/FlateDecode` stream.
pub fn deflate(bytes: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Component count from the first start-of-frame marker of a JPEG.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // FF Cn, length(2), precision(1), height(2), width(2), components(1)
            return bytes.get(pos + 9).copied();
        }
        pos += 2 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn rgb_jpeg_passes_through() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 7, Rgb([200, 10, 10])));
        let bytes = encode(&img, ImageFormat::Jpeg);
        let r = ImageCrateDecoder.decode(SpanKind::Jpg, &bytes).unwrap();
        assert_eq!((r.width, r.height), (12, 7));
        assert_eq!(r.filter, PdfFilter::Dct);
        assert_eq!(r.color_space, PdfColorSpace::DeviceRgb);
        assert_eq!(r.data, bytes);
    }

    #[test]
    fn gray_jpeg_passes_through_as_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 5, Luma([90])));
        let bytes = encode(&img, ImageFormat::Jpeg);
        let r = ImageCrateDecoder.decode(SpanKind::Jpg, &bytes).unwrap();
        assert_eq!(r.color_space, PdfColorSpace::DeviceGray);
        assert_eq!(r.filter, PdfFilter::Dct);
    }

    #[test]
    fn rgba_png_is_normalised() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 128])));
        let bytes = encode(&img, ImageFormat::Png);
        let r = ImageCrateDecoder.decode(SpanKind::Png, &bytes).unwrap();
        assert_eq!(r.filter, PdfFilter::Flate);
        assert_eq!(r.color_space, PdfColorSpace::DeviceRgb);

        let mut inflated = Vec::new();
        use std::io::Read;
        flate2::read::ZlibDecoder::new(&r.data[..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated.len(), 4 * 3 * 3);
        assert_eq!(&inflated[..3], &[1, 2, 3]);
    }

    #[test]
    fn corrupt_png_is_rejected() {
        let mut bytes = crate::pipeline::scan::PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"not really a png");
        bytes.extend_from_slice(crate::pipeline::scan::PNG_IEND);
        let err = ImageCrateDecoder.decode(SpanKind::Png, &bytes).unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[test]
    fn pdf_kind_is_unsupported() {
        let err = ImageCrateDecoder.decode(SpanKind::Pdf, b"%PDF-").unwrap_err();
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn sof_component_count() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        assert_eq!(jpeg_components(&encode(&img, ImageFormat::Jpeg)), Some(3));
        assert_eq!(jpeg_components(&[0xFF, 0xD8, 0x00]), None);
    }
}
