//! ESRI ASCII grid backend (type id `asciigrid`).
//!
//! Single-band text rasters: a short `name value` header block followed by
//! row-major cell values. Cells equal to the declared `NODATA_value` surface
//! as NaN in blocks while the declared value itself stays in the band
//! metadata. Band statistics are computed once at open time over valid cells.

use std::fs;

use log::info;

use crate::error::SourceError;
use crate::source::{
    BandInfo, BandStatistics, Block, RasterDataType, RasterExtent, RasterSource,
};

pub(crate) fn open(location: &str) -> Result<Box<dyn RasterSource>, SourceError> {
    let contents = fs::read_to_string(location).map_err(|source| SourceError::Io {
        location: location.to_string(),
        source,
    })?;
    let grid = AsciiGrid::parse(location, &contents)?;
    info!(
        "Opened ASCII grid {} ({}x{})",
        location, grid.width, grid.height
    );
    Ok(Box::new(grid))
}

#[derive(Debug)]
struct AsciiGrid {
    width: usize,
    height: usize,
    extent: RasterExtent,
    band: BandInfo,
    // Row-major, nodata already mapped to NaN
    values: Vec<f64>,
}

impl AsciiGrid {
    fn parse(location: &str, contents: &str) -> Result<Self, SourceError> {
        let malformed = |message: String| SourceError::Malformed {
            location: location.to_string(),
            message,
        };

        let mut ncols: Option<usize> = None;
        let mut nrows: Option<usize> = None;
        let mut xll: Option<f64> = None;
        let mut yll: Option<f64> = None;
        let mut cellsize: Option<f64> = None;
        let mut nodata: Option<f64> = None;
        let mut xll_is_center = false;
        let mut yll_is_center = false;
        let mut values: Vec<f64> = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let first = tokens.next().unwrap_or("");
            if first.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                let value = tokens
                    .next()
                    .ok_or_else(|| malformed(format!("header `{}` has no value", first)))?;
                match first.to_ascii_lowercase().as_str() {
                    "ncols" => ncols = Some(parse_count(value, "ncols", &malformed)?),
                    "nrows" => nrows = Some(parse_count(value, "nrows", &malformed)?),
                    "xllcorner" => xll = Some(parse_number(value, "xllcorner", &malformed)?),
                    "yllcorner" => yll = Some(parse_number(value, "yllcorner", &malformed)?),
                    "xllcenter" => {
                        xll = Some(parse_number(value, "xllcenter", &malformed)?);
                        xll_is_center = true;
                    }
                    "yllcenter" => {
                        yll = Some(parse_number(value, "yllcenter", &malformed)?);
                        yll_is_center = true;
                    }
                    "cellsize" => cellsize = Some(parse_number(value, "cellsize", &malformed)?),
                    "nodata_value" => {
                        nodata = Some(parse_number(value, "NODATA_value", &malformed)?)
                    }
                    other => return Err(malformed(format!("unknown header `{}`", other))),
                }
            } else {
                for token in line.split_whitespace() {
                    values.push(parse_number(token, "cell value", &malformed)?);
                }
            }
        }

        let width = ncols.ok_or_else(|| malformed("missing ncols header".to_string()))?;
        let height = nrows.ok_or_else(|| malformed("missing nrows header".to_string()))?;
        let mut x_min = xll.ok_or_else(|| malformed("missing xllcorner header".to_string()))?;
        let mut y_min = yll.ok_or_else(|| malformed("missing yllcorner header".to_string()))?;
        let cellsize = cellsize.ok_or_else(|| malformed("missing cellsize header".to_string()))?;
        if cellsize <= 0.0 {
            return Err(malformed(format!("cellsize {} is not positive", cellsize)));
        }
        if xll_is_center {
            x_min -= cellsize / 2.0;
        }
        if yll_is_center {
            y_min -= cellsize / 2.0;
        }
        if values.len() != width * height {
            return Err(malformed(format!(
                "expected {} cell values, found {}",
                width * height,
                values.len()
            )));
        }

        if let Some(nodata) = nodata {
            for value in &mut values {
                if *value == nodata {
                    *value = f64::NAN;
                }
            }
        }

        let extent = RasterExtent::new(
            x_min,
            y_min,
            x_min + width as f64 * cellsize,
            y_min + height as f64 * cellsize,
        );
        let band = BandInfo {
            source_data_type: RasterDataType::Float64,
            data_type: RasterDataType::Float64,
            has_no_data_value: nodata.is_some(),
            no_data_value: nodata.unwrap_or(f64::NAN),
            statistics: compute_statistics(&values),
        };

        Ok(Self {
            width,
            height,
            extent,
            band,
            values,
        })
    }
}

fn parse_count(
    token: &str,
    header: &str,
    malformed: &impl Fn(String) -> SourceError,
) -> Result<usize, SourceError> {
    token
        .parse::<usize>()
        .map_err(|_| malformed(format!("invalid {} `{}`", header, token)))
}

fn parse_number(
    token: &str,
    what: &str,
    malformed: &impl Fn(String) -> SourceError,
) -> Result<f64, SourceError> {
    token
        .parse::<f64>()
        .map_err(|_| malformed(format!("invalid {} `{}`", what, token)))
}

/// Population statistics over valid (non-nodata) cells. All NaN when the
/// raster holds no valid cell at all.
pub(crate) fn compute_statistics(values: &[f64]) -> BandStatistics {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return BandStatistics {
            minimum: f64::NAN,
            maximum: f64::NAN,
            mean: f64::NAN,
            std_dev: f64::NAN,
        };
    }
    let count = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / count;
    let variance = valid.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    BandStatistics {
        minimum: valid.iter().copied().fold(f64::INFINITY, f64::min),
        maximum: valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std_dev: variance.sqrt(),
    }
}

impl RasterSource for AsciiGrid {
    fn is_valid(&self) -> bool {
        true
    }

    fn band_count(&self) -> usize {
        1
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn extent(&self) -> RasterExtent {
        self.extent
    }

    fn band(&self, band: usize) -> Option<&BandInfo> {
        (band == 1).then_some(&self.band)
    }

    fn read_block(
        &self,
        band: usize,
        extent: &RasterExtent,
        width: usize,
        height: usize,
    ) -> Option<Block> {
        if band != 1 || *extent != self.extent || width != self.width || height != self.height {
            return None;
        }
        Some(Block::new(width, height, self.values.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = "\
ncols 4
nrows 3
xllcorner 0.0
yllcorner 0.0
cellsize 10.0
NODATA_value -9999
1.5 2.5 3.5 4.5
5.5 6.5 -9999 8.5
9.5 10.5 11.5 12.5
";

    #[test]
    fn test_parse_header_and_extent() {
        let grid = AsciiGrid::parse("test.asc", GRID).unwrap();
        assert_eq!(grid.width, 4);
        assert_eq!(grid.height, 3);
        assert_eq!(grid.extent, RasterExtent::new(0.0, 0.0, 40.0, 30.0));
        assert!(grid.band.has_no_data_value);
        assert_eq!(grid.band.no_data_value, -9999.0);
    }

    #[test]
    fn test_nodata_cells_read_as_nan() {
        let grid = AsciiGrid::parse("test.asc", GRID).unwrap();
        let extent = grid.extent;
        let block = grid.read_block(1, &extent, 4, 3).unwrap();
        assert!(block.value_at(1, 2).is_nan());
        assert_eq!(block.value_at(0, 0), 1.5);
        assert_eq!(block.value_at(2, 3), 12.5);
    }

    #[test]
    fn test_statistics_exclude_nodata() {
        let grid = AsciiGrid::parse("test.asc", GRID).unwrap();
        let stats = grid.band.statistics;
        assert_eq!(stats.minimum, 1.5);
        assert_eq!(stats.maximum, 12.5);
        // 11 valid cells, -9999 excluded
        assert!((stats.mean - 6.954545454545454).abs() < 1e-12);
    }

    #[test]
    fn test_xllcenter_shifts_extent() {
        let contents = "\
ncols 2
nrows 2
xllcenter 5.0
yllcenter 5.0
cellsize 10.0
1 2
3 4
";
        let grid = AsciiGrid::parse("test.asc", contents).unwrap();
        assert_eq!(grid.extent, RasterExtent::new(0.0, 0.0, 20.0, 20.0));
        assert!(!grid.band.has_no_data_value);
    }

    #[test]
    fn test_cell_count_mismatch_is_malformed() {
        let contents = "\
ncols 2
nrows 2
xllcorner 0
yllcorner 0
cellsize 1
1 2 3
";
        let err = AsciiGrid::parse("test.asc", contents).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_read_block_rejects_other_shape() {
        let grid = AsciiGrid::parse("test.asc", GRID).unwrap();
        let extent = grid.extent;
        assert!(grid.read_block(2, &extent, 4, 3).is_none());
        assert!(grid.read_block(1, &extent, 2, 3).is_none());
        let other = RasterExtent::new(0.0, 0.0, 1.0, 1.0);
        assert!(grid.read_block(1, &other, 4, 3).is_none());
    }
}
