//! Rigaku RAXIS image plate format.
//!
//! A RAXIS file starts with a header block of (at least) 1400 bytes with a
//! fixed field layout, followed by an unsigned 16-bit pixel block that
//! always sits at the very end of the file. The header's record length is
//! unreliable, so the pixel block is located from the end of the file.
//!
//! The most significant bit of each stored pixel is a flag rather than a
//! magnitude bit: flagged values are scaled by the header's photomultiplier
//! ratio. The vendor claims this always holds, but counter-examples are
//! known to exist; the literal rule is applied regardless.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{ByteOrder, NativeEndian};
use ndarray::Array2;

use crate::config::RaxisConfig;
use crate::format::error::DecodeError;
use crate::format::header::{DecodedHeader, HeaderFieldSpec as F, HeaderSchema};
use crate::format::raster::{self, Endian};
use crate::format::traits::{Decoded, ImageDecoder, ReadSeek};
use crate::image::{ElementType, Image, ImageGrid};

/// Size of the header block read from the start of the file.
pub const RAXIS_HEADER_LEN: usize = 1400;

/// Element type of the stored pixel block.
pub const RAXIS_PIXEL_TYPE: ElementType = ElementType::U16;

pub const FIELD_X_PIXELS: &str = "X Pixels";
pub const FIELD_Y_PIXELS: &str = "Y Pixels";
pub const FIELD_PM_RATIO: &str = "Photomultiplier Ratio";

/// RAXIS header layout.
///
/// Lower-case names belong to a non-standardised block and may not be
/// accurate for every instrument.
pub const RAXIS_SCHEMA: HeaderSchema = HeaderSchema::new(&[
    F::bytes("InstrumentType", 10),
    F::bytes("Version", 10),
    F::bytes("Crystal Name", 20),
    F::bytes("Crystal System", 12),
    F::float("A"),
    F::float("B"),
    F::float("C"),
    F::float("Alpha"),
    F::float("Beta"),
    F::float("Gamma"),
    F::bytes("Space Group", 12),
    F::float("Mosaicity"),
    F::bytes("Memo", 80),
    F::bytes("Date", 12),
    F::bytes("Reserved Space 1", 84),
    F::bytes("User", 20),
    F::bytes("Xray Target", 4),
    F::float("Wavelength"),
    F::bytes("Monochromator", 20),
    F::float("Monochromator 2theta"),
    F::bytes("Collimator", 20),
    F::bytes("Filter", 4),
    F::float("Crystal-to-detector Distance"),
    F::float("Generator Voltage"),
    F::float("Generator Current"),
    F::bytes("Focus", 12),
    F::bytes("Xray Memo", 80),
    // 1 = cylindrical, 0 = flat
    F::int("IP shape"),
    // 1 = weissenberg
    F::float("Oscillation Type"),
    F::bytes("Reserved Space 2", 56),
    F::bytes("Crystal Mount (spindle axis)", 4),
    F::bytes("Crystal Mount (beam axis)", 4),
    // degrees
    F::float("Phi Datum"),
    F::float("Phi Oscillation Start"),
    F::float("Phi Oscillation Stop"),
    F::int("Frame Number"),
    // minutes
    F::float("Exposure Time"),
    F::float("Direct beam X position"),
    F::float("Direct beam Y position"),
    F::float("Omega Angle"),
    F::float("Chi Angle"),
    F::float("2Theta Angle"),
    F::float("Mu Angle"),
    F::bytes("Image Template", 204),
    F::int(FIELD_X_PIXELS),
    F::int(FIELD_Y_PIXELS),
    // mm
    F::float("X Pixel Length"),
    F::float("Y Pixel Length"),
    F::int("Record Length"),
    F::int("Total"),
    F::int("Starting Line"),
    F::int("IP Number"),
    F::float(FIELD_PM_RATIO),
    F::float("Fade Time (to start of read)"),
    F::float("Fade Time (to end of read)"),
    F::bytes("Host Type/Endian", 10),
    F::bytes("IP Type", 10),
    // 0 = left to right, 1 = right to left
    F::int("Horizontal Scan"),
    // 0 = down to up, 1 = up to down
    F::int("Vertical Scan"),
    // 0 = front, 1 = back
    F::int("Front/Back Scan"),
    F::float("Pixel Shift (RAXIS V)"),
    F::float("Even/Odd Intensity Ratio (RAXIS V)"),
    // RAPID only
    F::int("Magic number"),
    F::int("Number of Axes"),
    F::float("Goniometer Vector ax.1.1"),
    F::float("Goniometer Vector ax.1.2"),
    F::float("Goniometer Vector ax.1.3"),
    F::float("Goniometer Vector ax.2.1"),
    F::float("Goniometer Vector ax.2.2"),
    F::float("Goniometer Vector ax.2.3"),
    F::float("Goniometer Vector ax.3.1"),
    F::float("Goniometer Vector ax.3.2"),
    F::float("Goniometer Vector ax.3.3"),
    F::float("Goniometer Vector ax.4.1"),
    F::float("Goniometer Vector ax.4.2"),
    F::float("Goniometer Vector ax.4.3"),
    F::float("Goniometer Vector ax.5.1"),
    F::float("Goniometer Vector ax.5.2"),
    F::float("Goniometer Vector ax.5.3"),
    F::float("Goniometer Start ax.1"),
    F::float("Goniometer Start ax.2"),
    F::float("Goniometer Start ax.3"),
    F::float("Goniometer Start ax.4"),
    F::float("Goniometer Start ax.5"),
    F::float("Goniometer End ax.1"),
    F::float("Goniometer End ax.2"),
    F::float("Goniometer End ax.3"),
    F::float("Goniometer End ax.4"),
    F::float("Goniometer End ax.5"),
    F::float("Goniometer Offset ax.1"),
    F::float("Goniometer Offset ax.2"),
    F::float("Goniometer Offset ax.3"),
    F::float("Goniometer Offset ax.4"),
    F::float("Goniometer Offset ax.5"),
    F::int("Goniometer Scan Axis"),
    F::bytes("Axes Names", 40),
    F::bytes("file", 16),
    F::bytes("cmnt", 20),
    F::bytes("smpl", 20),
    F::int("iext"),
    F::int("reso"),
    F::int("save"),
    F::int("dint"),
    F::int("byte"),
    F::int("init"),
    F::int("ipus"),
    F::int("dexp"),
    F::int("expn"),
    F::bytes("posx", 20),
    F::bytes("posy", 20),
    F::int("xray"),
    F::remainder("Header Leftovers"),
]);

/// Decoder for Rigaku RAXIS images.
#[derive(Debug, Clone)]
pub struct RaxisDecoder {
    byte_order: Endian,
    header_len: usize,
}

impl RaxisDecoder {
    /// Instrument type prefixes seen at the start of RAXIS headers.
    const MAGIC: &'static [&'static [u8]] = &[b"RAXIS", b"R-AXIS"];

    /// Create a decoder with the format defaults (big-endian, 1400-byte header).
    pub fn new() -> Self {
        Self::with_config(&RaxisConfig::default())
    }

    /// Create a decoder from configuration.
    pub fn with_config(config: &RaxisConfig) -> Self {
        Self {
            byte_order: config.byte_order,
            header_len: config.header_len,
        }
    }

    /// Override the byte order of header numbers and pixels.
    pub fn with_byte_order(mut self, byte_order: Endian) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn byte_order(&self) -> Endian {
        self.byte_order
    }

    /// Decode a RAXIS image from any seekable source.
    ///
    /// The source is read twice: once from the start for the header, once
    /// from the end for the pixel block.
    pub fn decode_stream<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Decoded, DecodeError> {
        let block = self.read_header_block(reader)?;
        let header = RAXIS_SCHEMA.decode(&block, self.byte_order)?;
        log::debug!(
            "RAXIS: decoded {} header fields from {} bytes",
            header.len(),
            block.len()
        );

        let (rows, cols) = Self::dimensions(&header)?;
        let ratio = header
            .get_float(FIELD_PM_RATIO)
            .ok_or_else(|| DecodeError::missing_field(FIELD_PM_RATIO))?;

        let size = rows as u64 * cols as u64 * RAXIS_PIXEL_TYPE.byte_width() as u64;
        let mut pixels = raster::read_tail_block(reader, size)?;
        raster::normalize_to_native(&mut pixels, RAXIS_PIXEL_TYPE.byte_width(), self.byte_order);

        let mut raw = vec![0u16; pixels.len() / 2];
        NativeEndian::read_u16_into(&pixels, &mut raw);
        let corrected = raster::correct_sign_bit(&raw, ratio);
        let grid = Array2::from_shape_vec((rows, cols), corrected)?.into_dyn();

        log::info!(
            "RAXIS: loaded {}x{} image (photomultiplier ratio {})",
            rows,
            cols,
            ratio
        );

        Ok(Decoded::new(Image::new(header, ImageGrid::F32(grid))))
    }

    /// Read up to `header_len` bytes from the start of the source.
    fn read_header_block<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Vec<u8>, DecodeError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut block = Vec::new();
        (&mut *reader)
            .take(self.header_len as u64)
            .read_to_end(&mut block)?;
        if block.len() < self.header_len {
            log::debug!(
                "RAXIS: header block is only {} of {} bytes",
                block.len(),
                self.header_len
            );
        }
        Ok(block)
    }

    /// `(rows, cols)` from the `Y Pixels` / `X Pixels` fields.
    fn dimensions(header: &DecodedHeader) -> Result<(usize, usize), DecodeError> {
        let read = |field: &'static str| -> Result<usize, DecodeError> {
            let value = header.get_int(field).ok_or_else(|| {
                DecodeError::missing_dimensions("RAXIS", format!("'{}' is absent", field))
            })?;
            match usize::try_from(value) {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(DecodeError::missing_dimensions(
                    "RAXIS",
                    format!("'{}' is {}", field, value),
                )),
            }
        };
        Ok((read(FIELD_Y_PIXELS)?, read(FIELD_X_PIXELS)?))
    }
}

impl Default for RaxisDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageDecoder for RaxisDecoder {
    fn id(&self) -> &'static str {
        "raxis"
    }

    fn display_name(&self) -> &'static str {
        "Rigaku RAXIS"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["img"]
    }

    fn can_decode(&self, head: &[u8]) -> bool {
        Self::MAGIC.iter().any(|magic| head.starts_with(magic))
    }

    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<Decoded, DecodeError> {
        self.decode_stream(reader)
    }
}
