//! The comparison engine: opens two raster sources and checks that they
//! describe the same content, accumulating a structured report.

use log::{info, warn};

use crate::report::{ComparisonResult, ReportRow, RowScope};
use crate::source::{open_source, RasterSource};

/// Default number of significant decimal digits held by statistic
/// comparisons. Float precision is about 7 decimal digits, double about 16.
pub const DEFAULT_TOLERANCE_PLACES: i32 = 6;

/// Standard deviation aggregates floating-point error from every cell, so it
/// gets a much coarser tolerance.
pub const STD_DEV_TOLERANCE_PLACES: i32 = 1;

/// Magnitude-derived comparison tolerance: `10^round(log10(|value|) - places)`.
///
/// A fixed absolute tolerance is wrong across the dynamic range rasters can
/// have, so the acceptance band is sized to the order of magnitude of the
/// expected value, holding roughly `places` significant decimal digits.
/// `log10(0)` is -inf, which makes an expected value of exactly zero match
/// exactly.
pub fn tolerance(value: f64, places: i32) -> f64 {
    10f64.powf((value.abs().log10() - places as f64).round())
}

/// True when both values are NaN (two unreadable cells are consistent),
/// otherwise when the absolute difference is within `tol`.
pub fn values_match(verified: f64, expected: f64, tol: f64) -> bool {
    (verified.is_nan() && expected.is_nan()) || (verified - expected).abs() <= tol
}

/// Compares a "verified" raster source against an "expected" reference.
///
/// Scalar metadata compares exactly; band statistics compare within a
/// magnitude-derived tolerance; pixel values compare exactly. Open failures
/// and grid shape mismatches abort the run, every other mismatch is recorded
/// and comparison continues so the report shows the complete per-band
/// breakdown.
pub struct RasterChecker;

impl RasterChecker {
    pub fn new() -> Self {
        Self
    }

    /// Open both sources and compare them. The result is always returned;
    /// open failures surface as failing error rows.
    pub fn run_test(
        &self,
        verified_type: &str,
        verified_location: &str,
        expected_type: &str,
        expected_location: &str,
    ) -> ComparisonResult {
        info!(
            "Comparing {}:{} against {}:{}",
            verified_type, verified_location, expected_type, expected_location
        );
        let mut report = ReportBuilder::new(
            format!("{}:{}", verified_type, verified_location),
            format!("{}:{}", expected_type, expected_location),
        );

        let verified = match open_source(verified_type, verified_location) {
            Ok(source) => Some(source),
            Err(err) => {
                report.error(format!(
                    "Cannot open source {} with URI: {} ({})",
                    verified_type, verified_location, err
                ));
                None
            }
        };
        let expected = match open_source(expected_type, expected_location) {
            Ok(source) => Some(source),
            Err(err) => {
                report.error(format!(
                    "Cannot open source {} with URI: {} ({})",
                    expected_type, expected_location, err
                ));
                None
            }
        };
        let (Some(verified), Some(expected)) = (verified, expected) else {
            return report.finish();
        };

        let mut valid = true;
        if !verified.is_valid() {
            report.error(format!(
                "Source {} with URI {} is not valid",
                verified_type, verified_location
            ));
            valid = false;
        }
        if !expected.is_valid() {
            report.error(format!(
                "Source {} with URI {} is not valid",
                expected_type, expected_location
            ));
            valid = false;
        }
        if !valid {
            return report.finish();
        }

        self.compare_opened(verified.as_ref(), expected.as_ref(), &mut report);
        report.finish()
    }

    /// Compare two already opened sources. Useful for driving the engine
    /// with custom [`RasterSource`] implementations.
    pub fn compare_sources(
        &self,
        verified: &dyn RasterSource,
        expected: &dyn RasterSource,
    ) -> ComparisonResult {
        let mut report = ReportBuilder::new(String::new(), String::new());
        self.compare_opened(verified, expected, &mut report);
        report.finish()
    }

    fn compare_opened(
        &self,
        verified: &dyn RasterSource,
        expected: &dyn RasterSource,
        report: &mut ReportBuilder,
    ) {
        let mut shape_ok = true;
        shape_ok &= report.compare_int(
            RowScope::Global,
            "Band count",
            verified.band_count() as i64,
            expected.band_count() as i64,
        );
        shape_ok &= report.compare_int(
            RowScope::Global,
            "Width",
            verified.width() as i64,
            expected.width() as i64,
        );
        shape_ok &= report.compare_int(
            RowScope::Global,
            "Height",
            verified.height() as i64,
            expected.height() as i64,
        );
        // Extents describe the grid geometry, no tolerance applies
        shape_ok &= report.compare_display(
            RowScope::Global,
            "Extent",
            verified.extent().to_string(),
            expected.extent().to_string(),
            verified.extent() == expected.extent(),
        );
        if !shape_ok {
            // Per-band comparison is meaningless on mismatched grids
            warn!("Raster shapes differ, skipping band comparison");
            return;
        }

        let width = expected.width();
        let height = expected.height();
        let extent = expected.extent();

        for band in 1..=expected.band_count() {
            let scope = RowScope::Band { band };
            let (Some(verified_band), Some(expected_band)) =
                (verified.band(band), expected.band(band))
            else {
                report.error(format!("Cannot read metadata for band {}", band));
                continue;
            };

            // Data types may differ without making the value comparison
            // meaningless, so a mismatch does not end the band
            let mut types_ok = true;
            types_ok &= report.compare_display(
                scope,
                "Source data type",
                verified_band.source_data_type.to_string(),
                expected_band.source_data_type.to_string(),
                verified_band.source_data_type == expected_band.source_data_type,
            );
            types_ok &= report.compare_display(
                scope,
                "Data type",
                verified_band.data_type.to_string(),
                expected_band.data_type.to_string(),
                verified_band.data_type == expected_band.data_type,
            );

            let mut nodata_ok = report.compare_display(
                scope,
                "No data (NULL) value existence flag",
                verified_band.has_no_data_value.to_string(),
                expected_band.has_no_data_value.to_string(),
                verified_band.has_no_data_value == expected_band.has_no_data_value,
            );
            if verified_band.has_no_data_value && expected_band.has_no_data_value {
                nodata_ok &= report.compare_f64(
                    scope,
                    "No data (NULL) value",
                    verified_band.no_data_value,
                    expected_band.no_data_value,
                    0.0,
                );
            }

            // Min/max may slightly differ between sources; for big numbers the
            // absolute difference can be large, e.g. a Float32 minimum near
            // -3.332e+38 reproduced with an error around 1.5e+24
            let verified_stats = verified_band.statistics;
            let expected_stats = expected_band.statistics;
            let mut stats_ok = true;
            stats_ok &= report.compare_f64(
                scope,
                "Minimum value",
                verified_stats.minimum,
                expected_stats.minimum,
                tolerance(expected_stats.minimum, DEFAULT_TOLERANCE_PLACES),
            );
            stats_ok &= report.compare_f64(
                scope,
                "Maximum value",
                verified_stats.maximum,
                expected_stats.maximum,
                tolerance(expected_stats.maximum, DEFAULT_TOLERANCE_PLACES),
            );

            // Cells count comparison stays disabled: some backends exclude
            // nodata cells from the count and some do not

            stats_ok &= report.compare_f64(
                scope,
                "Mean",
                verified_stats.mean,
                expected_stats.mean,
                tolerance(expected_stats.mean, DEFAULT_TOLERANCE_PLACES),
            );
            stats_ok &= report.compare_f64(
                scope,
                "Standard deviation",
                verified_stats.std_dev,
                expected_stats.std_dev,
                tolerance(expected_stats.std_dev, STD_DEV_TOLERANCE_PLACES),
            );

            if !(types_ok && nodata_ok && stats_ok) {
                warn!("Band {} metadata comparison failed", band);
                // build the value table anyway so that values are available
            }

            let expected_block = expected.read_block(band, &extent, width, height);
            let verified_block = verified.read_block(band, &extent, width, height);
            let (Some(verified_block), Some(expected_block)) = (verified_block, expected_block)
            else {
                report.error(format!("Cannot read raster block for band {}", band));
                continue;
            };

            for row in 0..height {
                for col in 0..width {
                    report.compare_pixel(
                        band,
                        row,
                        col,
                        verified_block.value_at(row, col),
                        expected_block.value_at(row, col),
                    );
                }
            }
        }
    }
}

impl Default for RasterChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates report rows during one run.
struct ReportBuilder {
    verified_source: String,
    expected_source: String,
    rows: Vec<ReportRow>,
}

impl ReportBuilder {
    fn new(verified_source: String, expected_source: String) -> Self {
        Self {
            verified_source,
            expected_source,
            rows: Vec::new(),
        }
    }

    fn finish(self) -> ComparisonResult {
        ComparisonResult::new(self.verified_source, self.expected_source, self.rows)
    }

    fn error(&mut self, message: String) {
        self.rows.push(ReportRow {
            scope: RowScope::Error,
            label: message,
            verified: String::new(),
            expected: String::new(),
            passed: false,
            difference: None,
            tolerance: None,
        });
    }

    fn compare_int(&mut self, scope: RowScope, label: &str, verified: i64, expected: i64) -> bool {
        let passed = verified == expected;
        self.rows.push(ReportRow {
            scope,
            label: label.to_string(),
            verified: verified.to_string(),
            expected: expected.to_string(),
            passed,
            difference: Some((verified - expected).to_string()),
            tolerance: None,
        });
        passed
    }

    fn compare_f64(
        &mut self,
        scope: RowScope,
        label: &str,
        verified: f64,
        expected: f64,
        tol: f64,
    ) -> bool {
        let passed = values_match(verified, expected, tol);
        self.rows.push(ReportRow {
            scope,
            label: label.to_string(),
            verified: format_value(verified),
            expected: format_value(expected),
            passed,
            difference: difference(verified, expected),
            tolerance: Some(format_value(tol)),
        });
        passed
    }

    fn compare_display(
        &mut self,
        scope: RowScope,
        label: &str,
        verified: String,
        expected: String,
        passed: bool,
    ) -> bool {
        self.rows.push(ReportRow {
            scope,
            label: label.to_string(),
            verified,
            expected,
            passed,
            difference: None,
            tolerance: None,
        });
        passed
    }

    /// Pixel values must be reproduced exactly, including NaN nodata cells.
    fn compare_pixel(
        &mut self,
        band: usize,
        row: usize,
        col: usize,
        verified: f64,
        expected: f64,
    ) -> bool {
        let passed = values_match(verified, expected, 0.0);
        self.rows.push(ReportRow {
            scope: RowScope::Pixel { band, row, col },
            label: format!("({}, {})", row, col),
            verified: format_value(verified),
            expected: format_value(expected),
            passed,
            difference: difference(verified, expected),
            tolerance: None,
        });
        passed
    }
}

fn difference(verified: f64, expected: f64) -> Option<String> {
    if verified.is_nan() || expected.is_nan() {
        None
    } else {
        Some(format_value(verified - expected))
    }
}

fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !magnitude.is_nan() && (magnitude < 1e-4 || magnitude >= 1e15) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}
