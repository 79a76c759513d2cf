//! Trait definitions for detector image decoders.

use std::io::{Read, Seek};

use crate::format::error::DecodeError;
use crate::image::Image;

/// A seekable byte source.
///
/// Blanket-implemented for every `Read + Seek` type so decoders can be
/// used as trait objects.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Trait for detector image format decoders.
///
/// Each format (RAXIS, XSDataImage) implements this trait to turn a byte
/// stream into an [`Image`]. Decoders hold only immutable configuration,
/// so one instance may decode many files, from any thread.
pub trait ImageDecoder: Send + Sync {
    /// Unique identifier for this decoder (e.g., "raxis", "xsd").
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// File extensions this decoder handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check if this decoder can likely handle data starting with `head`.
    ///
    /// Used for format detection when the extension is unknown or
    /// ambiguous. Implementations should look at magic bytes only.
    fn can_decode(&self, head: &[u8]) -> bool;

    /// Decode an image from `reader`.
    ///
    /// Fatal problems abort with a [`DecodeError`] and no image. Problems
    /// the decoder worked around are listed in [`Decoded::warnings`].
    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<Decoded, DecodeError>;
}

/// Result of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    /// The decoded image.
    pub image: Image,

    /// Substitutions made while decoding (e.g., default encodings).
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    /// Create a result without warnings.
    pub fn new(image: Image) -> Self {
        Self {
            image,
            warnings: Vec::new(),
        }
    }

    /// Attach warnings.
    pub fn with_warnings(mut self, warnings: Vec<DecodeWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if a warning of the given kind was raised.
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Discard warnings and keep the image.
    pub fn into_image(self) -> Image {
        self.image
    }
}

/// Category of a non-fatal decoding problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Payload encoding missing or not recognised; base64 was assumed
    UnknownEncoding,
    /// Element type missing or not recognised; int32 was assumed
    UnknownElementType,
    /// A shape or size entry was not an integer and was skipped
    InvalidNumber,
}

/// Warning generated while decoding.
#[derive(Debug, Clone)]
pub struct DecodeWarning {
    /// What kind of substitution happened.
    pub kind: WarningKind,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl DecodeWarning {
    /// Create a new warning.
    pub fn new(kind: WarningKind, message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
        }
    }

    /// Create a warning-level warning.
    pub fn warning(kind: WarningKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, WarningSeverity::Warning)
    }

    /// Create an error-level warning, for substitutions that may corrupt data.
    pub fn error(kind: WarningKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, WarningSeverity::Error)
    }

    /// Record the warning in the log and return it.
    pub(crate) fn logged(self) -> Self {
        log::warn!("{}", self.message);
        self
    }
}

/// Severity level for decode warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Something was substituted; the data is most likely intact.
    Warning,
    /// A substitution that may misinterpret pixel data.
    Error,
}
