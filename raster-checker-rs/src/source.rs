//! Raster source abstraction and the backend driver registry.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::error::SourceError;

/// Spatial bounding rectangle of a raster, in its coordinate reference system.
///
/// Extents describe fixed grid geometry and are compared exactly, never with
/// a tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterExtent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl RasterExtent {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }
}

impl fmt::Display for RasterExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{} : {},{}",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

/// Pixel encoding of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RasterDataType {
    Byte,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl fmt::Display for RasterDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Precomputed statistics for one band, as reported by the source.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BandStatistics {
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Per-band metadata reported by a source.
#[derive(Debug, Clone)]
pub struct BandInfo {
    pub source_data_type: RasterDataType,
    pub data_type: RasterDataType,
    pub has_no_data_value: bool,
    pub no_data_value: f64,
    pub statistics: BandStatistics,
}

/// A rectangular window of pixel values read from one band, row-major.
/// Values are f64 with NaN marking nodata or unreadable cells.
#[derive(Debug, Clone)]
pub struct Block {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl Block {
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Self {
        Self {
            width,
            height,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Value at (row, col), NaN when the cell is nodata or out of range.
    pub fn value_at(&self, row: usize, col: usize) -> f64 {
        if row >= self.height || col >= self.width {
            return f64::NAN;
        }
        self.values
            .get(row * self.width + col)
            .copied()
            .unwrap_or(f64::NAN)
    }
}

/// A 2D gridded dataset with one or more bands over a spatial extent.
pub trait RasterSource: fmt::Debug {
    /// False when the source opened but its contents are unusable.
    fn is_valid(&self) -> bool;

    fn band_count(&self) -> usize;

    /// Grid width in cells.
    fn width(&self) -> usize;

    /// Grid height in cells.
    fn height(&self) -> usize;

    fn extent(&self) -> RasterExtent;

    /// Per-band metadata. Band numbers are 1-based, matching raster convention.
    fn band(&self, band: usize) -> Option<&BandInfo>;

    /// Read a window of pixel values at the requested size. Returns None when
    /// the band is out of range, the extent does not match the source, or the
    /// requested size would require resampling.
    fn read_block(
        &self,
        band: usize,
        extent: &RasterExtent,
        width: usize,
        height: usize,
    ) -> Option<Block>;
}

type SourceOpener = fn(&str) -> Result<Box<dyn RasterSource>, SourceError>;

lazy_static! {
    static ref SOURCE_OPENERS: HashMap<&'static str, SourceOpener> = {
        let mut openers: HashMap<&'static str, SourceOpener> = HashMap::new();
        openers.insert("asciigrid", crate::backends::ascii_grid::open);
        openers.insert("png", crate::backends::png::open);
        openers
    };
}

/// Open a raster source. `source_type` selects the backend driver and
/// `location` is an opaque locator meaningful to that backend (currently a
/// file path for both built-in backends).
pub fn open_source(
    source_type: &str,
    location: &str,
) -> Result<Box<dyn RasterSource>, SourceError> {
    let opener = SOURCE_OPENERS
        .get(source_type)
        .ok_or_else(|| SourceError::UnknownSourceType(source_type.to_string()))?;
    opener(location)
}

/// Registered source type ids, sorted.
pub fn source_types() -> Vec<&'static str> {
    let mut types: Vec<_> = SOURCE_OPENERS.keys().copied().collect();
    types.sort_unstable();
    types
}
