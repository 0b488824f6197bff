//! Pipeline stages for BLOB-dump recovery.
//!
//! Each submodule implements exactly one transformation step and works on
//! in-memory buffers only; file handling lives in [`crate::recover`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ redecode ──▶ scan ──┬──▶ assemble (trim) ──▶ xref
//! (text)    (layer 1)  (layer 2)   (carve) │
//!                                          └──▶ assemble (images) ◀── raster
//! ```
//!
//! 1. [`input`]    read the dump and settle its text encoding
//! 2. [`decode`]   strip the text layer with an ordered strategy list
//! 3. [`redecode`] peel one more layer when the bytes are still hex/decimal
//! 4. [`scan`]     locate `%PDF-`, JPEG and PNG signatures
//! 5. [`assemble`] trim a carved PDF, or rebuild one page per image
//! 6. [`raster`]   image codec capability used by the image fallback
//! 7. [`xref`]     validate and patch `startxref`

pub mod assemble;
pub mod decode;
pub mod input;
pub mod raster;
pub mod redecode;
pub mod scan;
pub mod xref;
