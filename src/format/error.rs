//! Error types for detector image decoding.

use thiserror::Error;

/// Fatal errors that abort decoding of the current file.
///
/// Recoverable oddities (unknown payload encoding, unknown element type,
/// unparsable shape entries) are reported as
/// [`DecodeWarning`](crate::format::DecodeWarning)s instead.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// I/O error while reading or seeking the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The encoded payload is not valid for its declared encoding
    #[error("Payload decoding error: {0}")]
    Payload(#[from] data_encoding::DecodeError),

    /// Sample count does not fit the requested grid shape
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A header field extends past the end of the header block
    #[error(
        "Header truncated at field '{field}': needs {needed} bytes at offset {offset}, \
         only {available} available"
    )]
    HeaderTruncated {
        /// Name of the field that could not be read
        field: &'static str,
        /// Byte offset at which the field starts
        offset: usize,
        /// Number of bytes the field needs
        needed: usize,
        /// Total length of the header block
        available: usize,
    },

    /// Image dimensions are absent or invalid
    #[error("Missing or invalid dimensions in {format} image: {reason}")]
    MissingDimensions {
        /// Format being decoded
        format: &'static str,
        /// What was wrong with the dimensions
        reason: String,
    },

    /// A required header field or XML element is absent
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// The pixel block computed from the header is larger than the file
    #[error("Expected data block of {size} bytes exceeds file length of {file_len} bytes")]
    BlockTooLarge {
        /// Computed pixel block size in bytes
        size: u64,
        /// Length of the file in bytes
        file_len: u64,
    },

    /// Product of the declared shape disagrees with the declared size
    #[error("Shape {shape:?} does not match declared size {size}")]
    SizeMismatch {
        /// Declared shape
        shape: Vec<usize>,
        /// Declared element count
        size: usize,
    },

    /// Decoded payload length disagrees with the declared element count
    #[error("Decoded payload is {actual} bytes, expected {expected}")]
    PayloadLength {
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    /// MD5 digest of the decoded payload disagrees with the declared one
    #[error("Checksum mismatch: declared {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Declared hex digest
        expected: String,
        /// Computed hex digest
        actual: String,
    },

    /// No registered decoder can handle the input
    #[error("No decoder could handle {hint}")]
    UnknownFormat {
        /// Filename or other description of the input
        hint: String,
    },
}

impl DecodeError {
    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a missing dimensions error.
    pub fn missing_dimensions(format: &'static str, reason: impl Into<String>) -> Self {
        Self::MissingDimensions {
            format,
            reason: reason.into(),
        }
    }
}
