//! Decoder registry for selecting a detector image format.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::DecoderConfig;
use crate::format::error::DecodeError;
use crate::format::formats::{RaxisDecoder, XsdDecoder};
use crate::format::traits::{Decoded, ImageDecoder, ReadSeek};

/// Number of leading bytes handed to [`ImageDecoder::can_decode`].
const SNIFF_LEN: u64 = 512;

/// Registry of available image decoders.
///
/// All built-in decoders are registered on creation. A caller can pick a
/// decoder explicitly by id, or let the registry choose one from the file
/// extension and leading bytes.
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn ImageDecoder>>,
}

impl DecoderRegistry {
    /// Create a registry with all built-in decoders and default settings.
    pub fn new() -> Self {
        Self::with_config(&DecoderConfig::default())
    }

    /// Create a registry with all built-in decoders configured from `config`.
    pub fn with_config(config: &DecoderConfig) -> Self {
        let mut registry = Self {
            decoders: Vec::new(),
        };

        registry.register(Box::new(RaxisDecoder::with_config(&config.raxis)));
        registry.register(Box::new(XsdDecoder));

        registry
    }

    /// Register a decoder, replacing any existing one with the same id.
    pub fn register(&mut self, decoder: Box<dyn ImageDecoder>) {
        self.decoders.retain(|d| d.id() != decoder.id());
        self.decoders.push(decoder);
    }

    /// Get a decoder by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn ImageDecoder> {
        self.decoders
            .iter()
            .find(|d| d.id() == id)
            .map(|d| d.as_ref())
    }

    /// Find decoders handling a file extension (case-insensitive, no dot).
    pub fn by_extension(&self, ext: &str) -> Vec<&dyn ImageDecoder> {
        let ext = ext.to_lowercase();
        self.decoders
            .iter()
            .filter(|d| d.extensions().iter().any(|e| *e == ext))
            .map(|d| d.as_ref())
            .collect()
    }

    /// Find the first decoder recognising the leading bytes of a file.
    pub fn detect(&self, head: &[u8]) -> Option<&dyn ImageDecoder> {
        self.decoders
            .iter()
            .find(|d| d.can_decode(head))
            .map(|d| d.as_ref())
    }

    /// All supported file extensions, sorted and deduplicated.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .decoders
            .iter()
            .flat_map(|d| d.extensions().iter().copied())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Check if a filename has a supported extension.
    pub fn is_supported_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.supported_extensions()
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }

    /// Get all registered decoders.
    pub fn decoders(&self) -> &[Box<dyn ImageDecoder>] {
        &self.decoders
    }

    /// Open and decode a file.
    ///
    /// The file handle lives only for the duration of this call.
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<Decoded, DecodeError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let filename = path.file_name().and_then(|n| n.to_str());
        self.decode(&mut file, filename)
    }

    /// Decode from a seekable source, choosing a decoder automatically.
    ///
    /// Tries decoders in this order:
    /// 1. By file extension (if filename provided)
    /// 2. By magic byte detection
    ///
    /// If every candidate fails, the first candidate's error is returned.
    pub fn decode(
        &self,
        reader: &mut dyn ReadSeek,
        filename: Option<&str>,
    ) -> Result<Decoded, DecodeError> {
        let mut head = Vec::new();
        (&mut *reader).take(SNIFF_LEN).read_to_end(&mut head)?;

        let mut candidates: Vec<&dyn ImageDecoder> = filename
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| self.by_extension(ext))
            .unwrap_or_default();
        if let Some(detected) = self.detect(&head) {
            if !candidates.iter().any(|c| c.id() == detected.id()) {
                candidates.push(detected);
            }
        }

        let mut first_error = None;
        for decoder in candidates {
            reader.seek(SeekFrom::Start(0))?;
            match decoder.decode(reader) {
                Ok(decoded) => {
                    log::debug!("Decoded with {} decoder", decoder.id());
                    return Ok(decoded);
                }
                Err(e) => {
                    log::trace!("Decoder {} failed: {}", decoder.id(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| DecodeError::UnknownFormat {
            hint: filename.unwrap_or("input").to_string(),
        }))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
