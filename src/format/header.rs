//! Declarative fixed-layout header schemas and their decoder.
//!
//! A schema is an ordered list of named fields. Field offsets are never
//! stored; they follow from the cumulative width of the fields before.
//!
//! ```rust,ignore
//! use detio::format::{Endian, FieldKind, HeaderFieldSpec, HeaderSchema};
//!
//! const SCHEMA: HeaderSchema = HeaderSchema::new(&[
//!     HeaderFieldSpec::bytes("Name", 8),
//!     HeaderFieldSpec::int("Width"),
//!     HeaderFieldSpec::remainder("Rest"),
//! ]);
//!
//! let header = SCHEMA.decode(&block, Endian::Big)?;
//! ```

use crate::format::error::DecodeError;
use crate::format::raster::Endian;

/// How a header field is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Fixed number of bytes, kept verbatim (not NUL-trimmed)
    FixedBytes(usize),
    /// 4-byte IEEE float
    Float32,
    /// 4-byte signed integer
    Int32,
    /// Everything left in the block; only valid as the last field
    Remainder,
}

/// One named field of a [`HeaderSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl HeaderFieldSpec {
    pub const fn bytes(name: &'static str, len: usize) -> Self {
        Self {
            name,
            kind: FieldKind::FixedBytes(len),
        }
    }

    pub const fn float(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Float32,
        }
    }

    pub const fn int(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Int32,
        }
    }

    pub const fn remainder(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Remainder,
        }
    }
}

/// Immutable, ordered header layout for one file format.
#[derive(Debug, Clone, Copy)]
pub struct HeaderSchema {
    fields: &'static [HeaderFieldSpec],
}

impl HeaderSchema {
    /// Build a schema, rejecting a `Remainder` field anywhere but last.
    ///
    /// Evaluated in a `const` item, a misplaced remainder fails compilation.
    pub const fn new(fields: &'static [HeaderFieldSpec]) -> Self {
        let mut i = 0;
        while i < fields.len() {
            if matches!(fields[i].kind, FieldKind::Remainder) && i + 1 != fields.len() {
                panic!("Remainder field must be the last field of a header schema");
            }
            i += 1;
        }
        Self { fields }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &'static [HeaderFieldSpec] {
        self.fields
    }

    /// Combined width of all fixed-size fields.
    pub fn fixed_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match f.kind {
                FieldKind::FixedBytes(n) => n,
                FieldKind::Float32 | FieldKind::Int32 => 4,
                FieldKind::Remainder => 0,
            })
            .sum()
    }

    /// Byte offset at which the named field starts.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in self.fields {
            if field.name == name {
                return Some(offset);
            }
            offset += match field.kind {
                FieldKind::FixedBytes(n) => n,
                FieldKind::Float32 | FieldKind::Int32 => 4,
                FieldKind::Remainder => return None,
            };
        }
        None
    }

    /// Decode `block` field by field.
    ///
    /// Decoding stops quietly once the block is exhausted at a field
    /// boundary, so shorter header revisions simply lack their trailing
    /// fields. A field that starts inside the block but runs past its end
    /// is a [`DecodeError::HeaderTruncated`].
    pub fn decode(&self, block: &[u8], order: Endian) -> Result<DecodedHeader, DecodeError> {
        let mut header = DecodedHeader::with_capacity(self.fields.len());
        let mut cursor = 0;

        for field in self.fields {
            let value = match field.kind {
                FieldKind::FixedBytes(n) => {
                    HeaderValue::Bytes(take(block, cursor, n, field.name)?.to_vec())
                }
                FieldKind::Float32 => {
                    HeaderValue::Float(order.read_f32(take(block, cursor, 4, field.name)?))
                }
                FieldKind::Int32 => {
                    HeaderValue::Int(order.read_i32(take(block, cursor, 4, field.name)?))
                }
                FieldKind::Remainder => {
                    let rest = block.get(cursor..).unwrap_or_default();
                    header.insert(field.name, HeaderValue::Bytes(rest.to_vec()));
                    break;
                }
            };
            cursor += match field.kind {
                FieldKind::FixedBytes(n) => n,
                _ => 4,
            };
            header.insert(field.name, value);

            if cursor == block.len() {
                log::trace!("Header block exhausted after field '{}'", field.name);
                break;
            }
        }

        Ok(header)
    }
}

fn take<'a>(
    block: &'a [u8],
    offset: usize,
    needed: usize,
    field: &'static str,
) -> Result<&'a [u8], DecodeError> {
    block
        .get(offset..offset + needed)
        .ok_or(DecodeError::HeaderTruncated {
            field,
            offset,
            needed,
            available: block.len(),
        })
}

/// A decoded header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Raw bytes, exactly as stored
    Bytes(Vec<u8>),
    Float(f32),
    Int(i32),
    UInt(u64),
    Text(String),
    /// Array shape, outermost axis first
    Shape(Vec<usize>),
}

impl HeaderValue {
    /// Bytes as text with trailing NULs and surrounding spaces removed.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Bytes(b) => Some(
                String::from_utf8_lossy(b)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string(),
            ),
            Self::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(_) => write!(f, "{}", self.as_text().unwrap_or_default()),
            Self::Float(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
            Self::Shape(dims) => write!(f, "{:?}", dims),
        }
    }
}

/// Ordered field-name to value mapping produced by a decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedHeader {
    entries: Vec<(String, HeaderValue)>,
}

impl DecodedHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Set a field, keeping its original position if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: HeaderValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            HeaderValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name)?.as_text()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
