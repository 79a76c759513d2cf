//! Detector image format decoding.
//!
//! This module provides a trait-based system for decoding vendor detector
//! image files into [`Image`](crate::Image)s. New formats are added by
//! implementing the `ImageDecoder` trait and registering the decoder.
//!
//! ## Supported Formats
//!
//! - **Rigaku RAXIS**: fixed-layout binary header, tail-anchored 16-bit pixels
//! - **XSDataImage**: XML document with an encoded, checksummed array payload
//!
//! ## Usage
//!
//! ```rust,ignore
//! use detio::format::DecoderRegistry;
//!
//! let registry = DecoderRegistry::new();
//! let decoded = registry.decode_file("frame_0001.img")?;
//! for warning in &decoded.warnings {
//!     eprintln!("{}", warning.message);
//! }
//! let (rows, cols) = decoded.image.dimensions();
//! ```

mod error;
pub mod formats;
mod header;
pub mod raster;
mod registry;
mod traits;

pub use error::DecodeError;
pub use header::{DecodedHeader, FieldKind, HeaderFieldSpec, HeaderSchema, HeaderValue};
pub use raster::Endian;
pub use registry::DecoderRegistry;
pub use traits::{DecodeWarning, Decoded, ImageDecoder, ReadSeek, WarningKind, WarningSeverity};
