//! XSDataImage XML format.
//!
//! An XSDataImage file is a small XML document carrying an array: its
//! `shape` (one element per axis), `size`, numpy-style `dtype`, the
//! payload encoding under `coding/value`, the encoded payload in `data`
//! and optionally an MD5 digest of the raw bytes under `md5sum/value`.
//!
//! Unknown encodings and element types do not abort decoding; base64 and
//! int32 are assumed instead and a warning is attached to the result.

use std::io::Read;

use data_encoding::{BASE32, BASE64, HEXLOWER, HEXUPPER};
use md5::{Digest, Md5};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::format::error::DecodeError;
use crate::format::header::{DecodedHeader, HeaderValue};
use crate::format::raster::{self, Endian};
use crate::format::traits::{Decoded, DecodeWarning, ImageDecoder, ReadSeek, WarningKind};
use crate::image::{ElementType, Image};

/// Element type assumed when `dtype` is missing or unknown.
pub const DEFAULT_ELEMENT_TYPE: ElementType = ElementType::I32;

/// Byte order of the payload unless `dtype` says otherwise.
pub const DEFAULT_PAYLOAD_ORDER: Endian = Endian::Little;

/// Text encoding of the `data` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    Base64,
    Base32,
    Base16,
}

impl Coding {
    /// Parse a `coding/value` name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "base64" => Some(Self::Base64),
            "base32" => Some(Self::Base32),
            "base16" => Some(Self::Base16),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Base32 => "base32",
            Self::Base16 => "base16",
        }
    }

    /// Decode payload text. Whitespace inside the text is ignored.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, data_encoding::DecodeError> {
        let compact: Vec<u8> = text
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        match self {
            Self::Base64 => BASE64.decode(&compact),
            Self::Base32 => BASE32.decode(&compact),
            Self::Base16 => HEXUPPER.decode(&compact),
        }
    }

    /// Encode raw bytes.
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => BASE64.encode(bytes),
            Self::Base32 => BASE32.encode(bytes),
            Self::Base16 => HEXUPPER.encode(bytes),
        }
    }
}

/// Resolve a numpy-style dtype (`"int32"`, `"<u2"`, `">f8"`, ...).
///
/// Returns the element type and the byte order named by an explicit
/// `<`/`>` prefix, if any.
pub fn parse_dtype(dtype: &str) -> Option<(ElementType, Option<Endian>)> {
    let dtype = dtype.trim();
    let (order, code) = match dtype.chars().next()? {
        '<' => (Some(Endian::Little), &dtype[1..]),
        '>' => (Some(Endian::Big), &dtype[1..]),
        '=' | '|' => (None, &dtype[1..]),
        _ => (None, dtype),
    };

    let element_type = match code {
        "int8" | "i1" | "b" => ElementType::I8,
        "uint8" | "u1" | "B" => ElementType::U8,
        "int16" | "i2" | "h" => ElementType::I16,
        "uint16" | "u2" | "H" => ElementType::U16,
        "int32" | "i4" | "i" => ElementType::I32,
        "uint32" | "u4" | "I" => ElementType::U32,
        "int64" | "i8" | "l" | "q" | "int" => ElementType::I64,
        "uint64" | "u8" | "L" | "Q" => ElementType::U64,
        "float32" | "f4" | "f" => ElementType::F32,
        "float64" | "f8" | "d" | "float" | "double" => ElementType::F64,
        _ => return None,
    };
    Some((element_type, order))
}

/// Raw values pulled out of the document.
#[derive(Debug, Default)]
struct XsdFields {
    shape: Vec<usize>,
    size: Option<usize>,
    dtype: Option<String>,
    coding: Option<String>,
    data: Option<String>,
    md5: Option<String>,
}

impl XsdFields {
    fn parse(xml: &str, warnings: &mut Vec<DecodeWarning>) -> Result<Self, DecodeError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut fields = Self::default();
        // Open elements and the text collected directly inside each
        let mut path: Vec<String> = Vec::new();
        let mut texts: Vec<String> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    texts.push(String::new());
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    fields.accept(&name, "", &path, warnings);
                }
                Event::Text(e) => {
                    if let Some(text) = texts.last_mut() {
                        text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(text) = texts.last_mut() {
                        text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(_) => {
                    if let (Some(name), Some(text)) = (path.pop(), texts.pop()) {
                        fields.accept(&name, &text, &path, warnings);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(fields)
    }

    /// Record a closed element. Later occurrences override earlier ones,
    /// except for `shape`, which accumulates.
    fn accept(
        &mut self,
        name: &str,
        text: &str,
        ancestors: &[String],
        warnings: &mut Vec<DecodeWarning>,
    ) {
        let text = text.trim();
        let inside = |tag: &str| ancestors.iter().any(|a| a == tag);

        match name {
            "shape" => match text.parse() {
                Ok(dim) => self.shape.push(dim),
                Err(_) => warnings.push(
                    DecodeWarning::warning(
                        WarningKind::InvalidNumber,
                        format!("XSD: unable to convert shape '{}' to an integer", text),
                    )
                    .logged(),
                ),
            },
            "size" => match text.parse() {
                Ok(size) => self.size = Some(size),
                Err(_) => warnings.push(
                    DecodeWarning::warning(
                        WarningKind::InvalidNumber,
                        format!("XSD: unable to convert size '{}' to an integer", text),
                    )
                    .logged(),
                ),
            },
            "dtype" => self.dtype = Some(text.to_string()),
            "data" => self.data = Some(text.to_string()),
            "value" if inside("coding") => self.coding = Some(text.to_string()),
            "value" if inside("md5sum") => {
                self.md5 = (!text.is_empty()).then(|| text.to_string());
            }
            _ => {}
        }
    }
}

/// Decoder for XSDataImage XML files.
#[derive(Debug, Clone, Copy, Default)]
pub struct XsdDecoder;

impl XsdDecoder {
    const MAGIC: &'static [u8] = b"XSDataImage";

    /// Decode an XSDataImage document from the current position of `reader`.
    pub fn decode_stream<R: Read + ?Sized>(&self, reader: &mut R) -> Result<Decoded, DecodeError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.decode_document(&String::from_utf8_lossy(&bytes))
    }

    /// Decode an XSDataImage document held in memory.
    pub fn decode_document(&self, xml: &str) -> Result<Decoded, DecodeError> {
        let mut warnings = Vec::new();
        let fields = XsdFields::parse(xml, &mut warnings)?;
        log::debug!(
            "XSD: shape={:?} size={:?} dtype={:?} coding={:?} md5={:?}",
            fields.shape,
            fields.size,
            fields.dtype,
            fields.coding,
            fields.md5
        );

        if fields.shape.len() < 2 {
            return Err(DecodeError::missing_dimensions(
                "XSD",
                format!("need at least 2 shape entries, found {}", fields.shape.len()),
            ));
        }
        let size = fields.size.ok_or_else(|| DecodeError::missing_field("size"))?;
        let count = fields
            .shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
        if count != Some(size) {
            return Err(DecodeError::SizeMismatch {
                shape: fields.shape,
                size,
            });
        }

        let (element_type, declared_order) = match fields.dtype.as_deref().and_then(parse_dtype) {
            Some(resolved) => resolved,
            None => {
                warnings.push(
                    DecodeWarning::error(
                        WarningKind::UnknownElementType,
                        format!(
                            "XSD: unrecognised dtype {:?}, defaulting to {}",
                            fields.dtype, DEFAULT_ELEMENT_TYPE
                        ),
                    )
                    .logged(),
                );
                (DEFAULT_ELEMENT_TYPE, None)
            }
        };

        let coding = match fields.coding.as_deref().and_then(Coding::parse) {
            Some(coding) => coding,
            None => {
                warnings.push(
                    DecodeWarning::warning(
                        WarningKind::UnknownEncoding,
                        format!(
                            "XSD: unable to recognise encoding {:?}, expected base64, base32 \
                             or base16; assuming base64",
                            fields.coding
                        ),
                    )
                    .logged(),
                );
                Coding::Base64
            }
        };

        let data = fields
            .data
            .as_deref()
            .ok_or_else(|| DecodeError::missing_field("data"))?;
        let payload = coding.decode(data)?;

        if let Some(expected) = &fields.md5 {
            let actual = HEXLOWER.encode(&Md5::digest(&payload));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(DecodeError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let order = declared_order.unwrap_or(DEFAULT_PAYLOAD_ORDER);
        let grid = raster::decode_pixels(payload, element_type, order, &fields.shape)?;

        let mut header = DecodedHeader::with_capacity(5);
        header.insert("shape", HeaderValue::Shape(fields.shape.clone()));
        header.insert("size", HeaderValue::UInt(size as u64));
        header.insert(
            "dtype",
            HeaderValue::Text(
                fields
                    .dtype
                    .unwrap_or_else(|| element_type.name().to_string()),
            ),
        );
        header.insert(
            "coding",
            HeaderValue::Text(fields.coding.unwrap_or_else(|| coding.name().to_string())),
        );
        if let Some(md5) = fields.md5 {
            header.insert("md5", HeaderValue::Text(md5));
        }

        log::info!(
            "XSD: loaded {:?} {} array ({} encoded)",
            fields.shape,
            element_type,
            coding.name()
        );

        Ok(Decoded::new(Image::new(header, grid)).with_warnings(warnings))
    }
}

impl ImageDecoder for XsdDecoder {
    fn id(&self) -> &'static str {
        "xsd"
    }

    fn display_name(&self) -> &'static str {
        "XSDataImage (XML)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xsd", "xml"]
    }

    fn can_decode(&self, head: &[u8]) -> bool {
        [Self::MAGIC, b"<shape>".as_slice(), b"<data>".as_slice()]
            .iter()
            .any(|tag| head.windows(tag.len()).any(|w| w == *tag))
    }

    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<Decoded, DecodeError> {
        self.decode_stream(reader)
    }
}
