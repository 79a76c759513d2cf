//! Raw pixel block handling shared by the decoders.
//!
//! Covers byte-order normalization, tail-anchored block reads and the
//! RAXIS high-bit intensity correction.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::format::error::DecodeError;
use crate::image::{ElementType, ImageGrid};

/// Byte order of multi-byte values in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Most significant byte first
    Big,
    /// Least significant byte first
    Little,
}

impl Endian {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// Read a 32-bit float from the first four bytes of `bytes`.
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        match self {
            Self::Big => BigEndian::read_f32(bytes),
            Self::Little => LittleEndian::read_f32(bytes),
        }
    }

    /// Read a 32-bit signed integer from the first four bytes of `bytes`.
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        match self {
            Self::Big => BigEndian::read_i32(bytes),
            Self::Little => LittleEndian::read_i32(bytes),
        }
    }
}

/// Whether data stored in `order` must be swapped to reach host order.
pub fn swap_needed(order: Endian) -> bool {
    order != Endian::native()
}

/// Reverse the bytes of every `width`-byte element in place.
///
/// Applying it twice restores the original bytes.
pub fn byteswap_elements(bytes: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for element in bytes.chunks_exact_mut(width) {
        element.reverse();
    }
}

/// Bring `bytes` from `order` into host order.
pub fn normalize_to_native(bytes: &mut [u8], width: usize, order: Endian) {
    if swap_needed(order) {
        log::debug!("Swapping {} bytes of {}-byte elements", bytes.len(), width);
        byteswap_elements(bytes, width);
    }
}

/// Read the last `size` bytes of `reader`.
///
/// The block position is derived from the end of the stream rather than
/// from any offset declared in the file.
pub fn read_tail_block<R: Read + Seek + ?Sized>(
    reader: &mut R,
    size: u64,
) -> Result<Vec<u8>, DecodeError> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let too_large = DecodeError::BlockTooLarge { size, file_len };

    if size > file_len {
        log::error!(
            "Expected data block of {} bytes is larger than the {} byte file",
            size,
            file_len
        );
        return Err(too_large);
    }
    let (Ok(back), Ok(len)) = (i64::try_from(size), usize::try_from(size)) else {
        return Err(too_large);
    };

    reader.seek(SeekFrom::End(-back))?;
    let mut block = vec![0u8; len];
    reader.read_exact(&mut block)?;
    Ok(block)
}

/// Apply the high-bit correction to one raw RAXIS sample.
///
/// Values with the top bit set are reinterpreted as `(v - 65536) * ratio`;
/// all others pass through unchanged.
pub fn correct_value(raw: u16, ratio: f32) -> f32 {
    if raw >= 0x8000 {
        (f32::from(raw) - 65536.0) * ratio
    } else {
        f32::from(raw)
    }
}

/// Apply [`correct_value`] to every sample.
pub fn correct_sign_bit(raw: &[u16], ratio: f32) -> Vec<f32> {
    raw.iter().map(|&v| correct_value(v, ratio)).collect()
}

/// Interpret host-order `bytes` as elements of `element_type` laid out in `shape`.
pub fn grid_from_native_bytes(
    bytes: &[u8],
    element_type: ElementType,
    shape: &[usize],
) -> Result<ImageGrid, DecodeError> {
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
    let expected = count.and_then(|n| n.checked_mul(element_type.byte_width()));
    let (Some(count), Some(expected)) = (count, expected) else {
        return Err(DecodeError::PayloadLength {
            expected: usize::MAX,
            actual: bytes.len(),
        });
    };
    if bytes.len() != expected {
        return Err(DecodeError::PayloadLength {
            expected,
            actual: bytes.len(),
        });
    }

    let dim = IxDyn(shape);

    macro_rules! typed {
        ($variant:ident, $t:ty, $read:ident) => {{
            let mut values = vec![<$t>::default(); count];
            NativeEndian::$read(bytes, &mut values);
            ImageGrid::$variant(ArrayD::from_shape_vec(dim, values)?)
        }};
    }

    let grid = match element_type {
        ElementType::U8 => ImageGrid::U8(ArrayD::from_shape_vec(dim, bytes.to_vec())?),
        ElementType::I8 => {
            let values = bytes.iter().map(|&b| b as i8).collect();
            ImageGrid::I8(ArrayD::from_shape_vec(dim, values)?)
        }
        ElementType::U16 => typed!(U16, u16, read_u16_into),
        ElementType::I16 => typed!(I16, i16, read_i16_into),
        ElementType::U32 => typed!(U32, u32, read_u32_into),
        ElementType::I32 => typed!(I32, i32, read_i32_into),
        ElementType::U64 => typed!(U64, u64, read_u64_into),
        ElementType::I64 => typed!(I64, i64, read_i64_into),
        ElementType::F32 => typed!(F32, f32, read_f32_into),
        ElementType::F64 => typed!(F64, f64, read_f64_into),
    };
    Ok(grid)
}

/// Normalize `bytes` from `order` and build a grid from them.
pub fn decode_pixels(
    mut bytes: Vec<u8>,
    element_type: ElementType,
    order: Endian,
    shape: &[usize],
) -> Result<ImageGrid, DecodeError> {
    normalize_to_native(&mut bytes, element_type.byte_width(), order);
    grid_from_native_bytes(&bytes, element_type, shape)
}
