//! Tests for the Rigaku RAXIS decoder.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::format::formats::{
    FIELD_PM_RATIO, FIELD_X_PIXELS, FIELD_Y_PIXELS, RAXIS_HEADER_LEN, RAXIS_SCHEMA, RaxisDecoder,
};
use crate::config::RaxisConfig;
use crate::format::traits::ImageDecoder;
use crate::format::{DecodeError, DecoderRegistry, Endian, HeaderValue};
use crate::image::{ElementType, ImageGrid};

/// Description of a synthetic RAXIS file.
struct Fixture {
    x_pixels: i32,
    y_pixels: i32,
    ratio: f32,
    pixels: Vec<u16>,
    /// Vendor padding between the header block and the pixels
    padding: usize,
    order: Endian,
}

impl Fixture {
    fn new(x_pixels: i32, y_pixels: i32, ratio: f32, pixels: Vec<u16>) -> Self {
        Self {
            x_pixels,
            y_pixels,
            ratio,
            pixels,
            padding: 0,
            order: Endian::Big,
        }
    }

    fn header(&self) -> Vec<u8> {
        let mut header = vec![0u8; RAXIS_HEADER_LEN];
        header[..10].copy_from_slice(b"R-AXIS4   ");
        header[10..20].copy_from_slice(b"V1.0      ");

        let put_i32 = |buf: &mut [u8], field: &str, value: i32| {
            let at = RAXIS_SCHEMA.offset_of(field).unwrap();
            match self.order {
                Endian::Big => BigEndian::write_i32(&mut buf[at..at + 4], value),
                Endian::Little => LittleEndian::write_i32(&mut buf[at..at + 4], value),
            }
        };
        put_i32(&mut header[..], FIELD_X_PIXELS, self.x_pixels);
        put_i32(&mut header[..], FIELD_Y_PIXELS, self.y_pixels);
        put_i32(&mut header[..], "Frame Number", 17);

        let at = RAXIS_SCHEMA.offset_of(FIELD_PM_RATIO).unwrap();
        match self.order {
            Endian::Big => BigEndian::write_f32(&mut header[at..at + 4], self.ratio),
            Endian::Little => LittleEndian::write_f32(&mut header[at..at + 4], self.ratio),
        }
        header
    }

    fn bytes(&self) -> Vec<u8> {
        let mut bytes = self.header();
        bytes.resize(bytes.len() + self.padding, 0xAA);
        for &v in &self.pixels {
            let encoded = match self.order {
                Endian::Big => v.to_be_bytes(),
                Endian::Little => v.to_le_bytes(),
            };
            bytes.extend_from_slice(&encoded);
        }
        bytes
    }
}

fn grid_values(grid: &ImageGrid) -> Vec<f32> {
    match grid {
        ImageGrid::F32(arr) => arr.iter().copied().collect(),
        other => panic!("expected f32 grid, got {}", other.element_type()),
    }
}

#[test]
fn test_raxis_format_metadata() {
    let decoder = RaxisDecoder::new();

    assert_eq!(decoder.id(), "raxis");
    assert_eq!(decoder.display_name(), "Rigaku RAXIS");
    assert!(decoder.extensions().contains(&"img"));
    assert_eq!(decoder.byte_order(), Endian::Big);
    assert!(decoder.can_decode(b"RAXIS-IV++"));
    assert!(decoder.can_decode(b"R-AXIS4   "));
    assert!(!decoder.can_decode(b"<?xml"));
}

#[test]
fn test_raxis_schema_layout() {
    assert_eq!(RAXIS_SCHEMA.fields().len(), 112);
    assert_eq!(RAXIS_SCHEMA.fixed_len(), 1160);
    assert_eq!(RAXIS_SCHEMA.offset_of(FIELD_X_PIXELS), Some(768));
    assert_eq!(RAXIS_SCHEMA.offset_of(FIELD_Y_PIXELS), Some(772));
    assert_eq!(RAXIS_SCHEMA.offset_of(FIELD_PM_RATIO), Some(800));
    assert_eq!(RAXIS_SCHEMA.offset_of("Header Leftovers"), Some(1160));
}

#[test]
fn test_raxis_decode() {
    // 2 rows x 3 cols
    let fixture = Fixture::new(3, 2, 2.0, vec![100, 40000, 0, 32768, 65535, 7]);
    let mut cursor = Cursor::new(fixture.bytes());

    let decoded = RaxisDecoder::new().decode_stream(&mut cursor).unwrap();
    let image = decoded.image;

    assert!(decoded.warnings.is_empty());
    assert_eq!(image.dimensions(), (2, 3));
    assert_eq!(image.grid().shape(), &[2, 3]);
    assert_eq!(image.element_type(), ElementType::F32);
    assert_eq!(
        grid_values(image.grid()),
        vec![100.0, -51072.0, 0.0, -65536.0, -2.0, 7.0]
    );
}

#[test]
fn test_raxis_oversized_header_len() {
    let fixture = Fixture::new(2, 2, 1.0, vec![1, 2, 3, 4]);
    let mut cursor = Cursor::new(fixture.bytes());

    let config = RaxisConfig {
        byte_order: Endian::Big,
        header_len: usize::MAX,
    };
    let image = RaxisDecoder::with_config(&config)
        .decode_stream(&mut cursor)
        .unwrap()
        .into_image();

    assert_eq!(image.dimensions(), (2, 2));
    assert_eq!(grid_values(image.grid()), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_raxis_dimensions_follow_header() {
    let fixture = Fixture::new(4, 3, 1.0, vec![1; 12]);
    let mut cursor = Cursor::new(fixture.bytes());
    let image = RaxisDecoder::new()
        .decode_stream(&mut cursor)
        .unwrap()
        .into_image();

    let header = image.header();
    let rows = header.get_int(FIELD_Y_PIXELS).unwrap() as usize;
    let cols = header.get_int(FIELD_X_PIXELS).unwrap() as usize;
    assert_eq!(image.dimensions(), (rows, cols));
    assert_eq!(image.grid().shape(), &[rows, cols]);
}

#[test]
fn test_raxis_header_fields() {
    let fixture = Fixture::new(2, 2, 8.0, vec![0; 4]);
    let mut cursor = Cursor::new(fixture.bytes());
    let image = RaxisDecoder::new()
        .decode_stream(&mut cursor)
        .unwrap()
        .into_image();
    let header = image.header();

    assert_eq!(header.len(), RAXIS_SCHEMA.fields().len());
    assert_eq!(header.keys().next(), Some("InstrumentType"));
    assert_eq!(header.get_text("InstrumentType").as_deref(), Some("R-AXIS4"));
    // Stored verbatim, trailing spaces included
    assert_eq!(
        header.get("InstrumentType"),
        Some(&HeaderValue::Bytes(b"R-AXIS4   ".to_vec()))
    );
    assert_eq!(header.get_int("Frame Number"), Some(17));
    assert_eq!(header.get_float(FIELD_PM_RATIO), Some(8.0));
    match header.get("Header Leftovers") {
        Some(HeaderValue::Bytes(rest)) => assert_eq!(rest.len(), RAXIS_HEADER_LEN - 1160),
        other => panic!("unexpected leftovers {:?}", other),
    }
}

#[test]
fn test_raxis_pixels_anchored_to_file_end() {
    let mut fixture = Fixture::new(2, 2, 1.0, vec![1, 2, 3, 4]);
    fixture.padding = 333;
    let mut cursor = Cursor::new(fixture.bytes());

    let image = RaxisDecoder::new()
        .decode_stream(&mut cursor)
        .unwrap()
        .into_image();
    assert_eq!(grid_values(image.grid()), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_raxis_little_endian() {
    let mut fixture = Fixture::new(2, 1, 3.0, vec![0x0102, 0x8001]);
    fixture.order = Endian::Little;
    let mut cursor = Cursor::new(fixture.bytes());

    let decoder = RaxisDecoder::new().with_byte_order(Endian::Little);
    let image = decoder.decode_stream(&mut cursor).unwrap().into_image();

    assert_eq!(image.dimensions(), (1, 2));
    assert_eq!(
        grid_values(image.grid()),
        vec![258.0, (32769.0 - 65536.0) * 3.0]
    );
}

#[test]
fn test_raxis_block_too_large() {
    // Header claims 100 x 100 pixels but the file is far too short
    let fixture = Fixture::new(100, 100, 1.0, vec![0; 10]);
    let bytes = fixture.bytes();
    let file_len = bytes.len() as u64;
    let mut cursor = Cursor::new(bytes);

    match RaxisDecoder::new().decode_stream(&mut cursor) {
        Err(DecodeError::BlockTooLarge { size, file_len: len }) => {
            assert_eq!(size, 100 * 100 * 2);
            assert_eq!(len, file_len);
        }
        other => panic!("expected BlockTooLarge, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_raxis_missing_dimensions() {
    for (x, y) in [(0, 4), (4, 0), (-3, 4)] {
        let fixture = Fixture::new(x, y, 1.0, vec![0; 16]);
        let mut cursor = Cursor::new(fixture.bytes());
        let result = RaxisDecoder::new().decode_stream(&mut cursor);
        assert!(
            matches!(result, Err(DecodeError::MissingDimensions { .. })),
            "x={} y={}",
            x,
            y
        );
    }
}

#[test]
fn test_raxis_short_header_omits_dimensions() {
    // File ends exactly after "X Pixels": header decodes, "Y Pixels" is absent
    let fixture = Fixture::new(2, 2, 1.0, vec![]);
    let bytes = fixture.bytes()[..772].to_vec();
    let mut cursor = Cursor::new(bytes);

    match RaxisDecoder::new().decode_stream(&mut cursor) {
        Err(DecodeError::MissingDimensions { reason, .. }) => {
            assert!(reason.contains(FIELD_Y_PIXELS));
        }
        other => panic!("expected MissingDimensions, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_raxis_header_truncated_mid_field() {
    let fixture = Fixture::new(2, 2, 1.0, vec![]);
    let bytes = fixture.bytes()[..770].to_vec();
    let mut cursor = Cursor::new(bytes);

    assert!(matches!(
        RaxisDecoder::new().decode_stream(&mut cursor),
        Err(DecodeError::HeaderTruncated {
            field: FIELD_X_PIXELS,
            offset: 768,
            ..
        })
    ));
}

#[test]
fn test_raxis_header_decode_deterministic() {
    let bytes = Fixture::new(3, 3, 1.5, vec![5; 9]).bytes();
    let block = &bytes[..RAXIS_HEADER_LEN];

    let first = RAXIS_SCHEMA.decode(block, Endian::Big).unwrap();
    let second = RAXIS_SCHEMA.decode(block, Endian::Big).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_raxis_statistics() {
    let fixture = Fixture::new(2, 2, 1.0, vec![0, 10, 20, 30]);
    let mut cursor = Cursor::new(fixture.bytes());
    let image = RaxisDecoder::new()
        .decode_stream(&mut cursor)
        .unwrap()
        .into_image();

    let stats = image.stats();
    assert_eq!(stats.min, 0.0);
    assert_eq!(stats.max, 30.0);
    assert!((stats.mean - 15.0).abs() < 1e-9);
}

#[test]
fn test_raxis_concurrent_decoding() {
    let decoder = RaxisDecoder::new();
    let files: Vec<Vec<u8>> = (1..=4u16)
        .map(|n| Fixture::new(2, 2, 1.0, vec![n; 4]).bytes())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|bytes| {
                let decoder = &decoder;
                scope.spawn(move || {
                    let mut cursor = Cursor::new(bytes.clone());
                    decoder.decode_stream(&mut cursor).unwrap().into_image()
                })
            })
            .collect();

        for (n, handle) in handles.into_iter().enumerate() {
            let image = handle.join().unwrap();
            assert_eq!(grid_values(image.grid()), vec![(n + 1) as f32; 4]);
        }
    });
}

#[test]
fn test_raxis_decode_file_via_registry() {
    let fixture = Fixture::new(3, 2, 2.0, vec![1, 2, 3, 4, 5, 40000]);
    let mut file = tempfile::Builder::new().suffix(".img").tempfile().unwrap();
    file.write_all(&fixture.bytes()).unwrap();
    file.flush().unwrap();

    let decoded = DecoderRegistry::new().decode_file(file.path()).unwrap();
    assert_eq!(decoded.image.dimensions(), (2, 3));
    assert_eq!(
        grid_values(decoded.image.grid()),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, -51072.0]
    );
}
