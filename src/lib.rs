//! detio - Detector Image I/O
//!
//! Decoders for vendor detector image files used in X-ray crystallography
//! and scattering. Each decoder turns a file into an [`Image`]: a header
//! mapping in file order plus a numeric grid in host byte order.
//!
//! Decoders are stateless apart from their configuration, so distinct
//! files can be decoded from several threads at once.

pub mod config;
pub mod format;
mod image;

pub use config::{DecoderConfig, LogLevel, RaxisConfig};
pub use format::{DecodeError, Decoded, DecoderRegistry, ImageDecoder};
pub use image::{ElementType, Image, ImageGrid, Statistics};
