//! In-memory detector image: header mapping plus a numeric grid.

use std::sync::OnceLock;

use ndarray::ArrayD;

use crate::format::DecodedHeader;

/// Numeric encoding of each grid sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Unsigned 8-bit integer
    U8,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 64-bit integer
    U64,
    /// Signed 64-bit integer
    I64,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn byte_width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Canonical numpy-style name (e.g. `"int32"`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::U64 => "uint64",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid samples, one variant per element type.
///
/// Values are always in host-native order and already corrected to
/// logical intensities.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageGrid {
    U8(ArrayD<u8>),
    I8(ArrayD<i8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    U32(ArrayD<u32>),
    I32(ArrayD<i32>),
    U64(ArrayD<u64>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! for_each_grid {
    ($grid:expr, $arr:ident => $body:expr) => {
        match $grid {
            ImageGrid::U8($arr) => $body,
            ImageGrid::I8($arr) => $body,
            ImageGrid::U16($arr) => $body,
            ImageGrid::I16($arr) => $body,
            ImageGrid::U32($arr) => $body,
            ImageGrid::I32($arr) => $body,
            ImageGrid::U64($arr) => $body,
            ImageGrid::I64($arr) => $body,
            ImageGrid::F32($arr) => $body,
            ImageGrid::F64($arr) => $body,
        }
    };
}

impl ImageGrid {
    /// Element type of the samples.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::U8(_) => ElementType::U8,
            Self::I8(_) => ElementType::I8,
            Self::U16(_) => ElementType::U16,
            Self::I16(_) => ElementType::I16,
            Self::U32(_) => ElementType::U32,
            Self::I32(_) => ElementType::I32,
            Self::U64(_) => ElementType::U64,
            Self::I64(_) => ElementType::I64,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
        }
    }

    /// Grid shape, outermost axis first.
    pub fn shape(&self) -> &[usize] {
        for_each_grid!(self, a => a.shape())
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        for_each_grid!(self, a => a.len())
    }

    /// Whether the grid holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All samples widened to `f64`, in logical (row-major) order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        for_each_grid!(self, a => a.iter().map(|v| v.widen()).collect())
    }
}

/// Lossy widening used for statistics.
trait Widen {
    fn widen(&self) -> f64;
}

macro_rules! impl_widen {
    ($($t:ty),*) => {
        $(impl Widen for $t {
            fn widen(&self) -> f64 {
                f64::from(*self)
            }
        })*
    };
}

impl_widen!(u8, i8, u16, i16, u32, i32, f32, f64);

impl Widen for u64 {
    fn widen(&self) -> f64 {
        *self as f64
    }
}

impl Widen for i64 {
    fn widen(&self) -> f64 {
        *self as f64
    }
}

/// Summary statistics over every grid sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
}

impl Statistics {
    fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
                stddev: f64::NAN,
            };
        }

        let n = values.len() as f64;
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        let mean = sum / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Self {
            min,
            max,
            mean,
            stddev: variance.sqrt(),
        }
    }
}

/// A decoded detector image.
///
/// Statistics are derived from the grid on first request and cached;
/// replacing the grid drops the cache.
#[derive(Debug, Clone)]
pub struct Image {
    header: DecodedHeader,
    grid: ImageGrid,
    stats: OnceLock<Statistics>,
}

impl Image {
    /// Create an image from a header and its grid.
    pub fn new(header: DecodedHeader, grid: ImageGrid) -> Self {
        Self {
            header,
            grid,
            stats: OnceLock::new(),
        }
    }

    /// Header fields in file order.
    pub fn header(&self) -> &DecodedHeader {
        &self.header
    }

    /// Replace the header.
    pub fn set_header(&mut self, header: DecodedHeader) {
        self.header = header;
    }

    /// The sample grid.
    pub fn grid(&self) -> &ImageGrid {
        &self.grid
    }

    /// Replace the grid, invalidating cached statistics.
    pub fn set_grid(&mut self, grid: ImageGrid) {
        self.grid = grid;
        self.stats = OnceLock::new();
    }

    /// `(rows, cols)` taken from the two outermost grid axes.
    pub fn dimensions(&self) -> (usize, usize) {
        let shape = self.grid.shape();
        let rows = shape.first().copied().unwrap_or(0);
        let cols = shape.get(1).copied().unwrap_or(1);
        (rows, cols)
    }

    /// Element type of the grid.
    pub fn element_type(&self) -> ElementType {
        self.grid.element_type()
    }

    /// Lazily computed min/max/mean/stddev of the grid.
    pub fn stats(&self) -> Statistics {
        *self
            .stats
            .get_or_init(|| Statistics::compute(&self.grid.to_f64_vec()))
    }

    /// Split into header and grid.
    pub fn into_parts(self) -> (DecodedHeader, ImageGrid) {
        (self.header, self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn grid_2x2() -> ImageGrid {
        ImageGrid::I32(ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1, 2, 3, 4]).unwrap())
    }

    #[test]
    fn test_element_type_widths() {
        assert_eq!(ElementType::U16.byte_width(), 2);
        assert_eq!(ElementType::I32.byte_width(), 4);
        assert_eq!(ElementType::F64.byte_width(), 8);
        assert_eq!(ElementType::I8.name(), "int8");
    }

    #[test]
    fn test_dimensions_and_type() {
        let image = Image::new(DecodedHeader::new(), grid_2x2());
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.element_type(), ElementType::I32);
        assert_eq!(image.grid().len(), 4);
    }

    #[test]
    fn test_statistics() {
        let image = Image::new(DecodedHeader::new(), grid_2x2());
        let stats = image.stats();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.stddev - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_set_grid_resets_statistics() {
        let mut image = Image::new(DecodedHeader::new(), grid_2x2());
        assert_eq!(image.stats().max, 4.0);

        image.set_grid(ImageGrid::F32(
            ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![-5.0, 10.0]).unwrap(),
        ));
        assert_eq!(image.stats().max, 10.0);
        assert_eq!(image.stats().min, -5.0);
    }
}
