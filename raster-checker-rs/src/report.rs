//! Structured comparison report and its renderers.
//!
//! The checker records every comparison as one [`ReportRow`]; rendering to
//! text, HTML or JSON is a pure function over the ordered row sequence.

use serde::Serialize;

const TAB_STYLE: &str = "border-spacing: 0px; border-width: 1px 1px 0 0; border-style: solid;";
const CELL_STYLE: &str =
    "border-width: 0 0 1px 1px; border-style: solid; font-size: smaller; text-align: center;";
const OK_STYLE: &str = "background: #00ff00;";
const ERR_STYLE: &str = "background: #ff0000;";
const ERR_MSG_STYLE: &str = "color: #ff0000;";

/// Where in the comparison a row was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowScope {
    /// A terminal error notice (open failure, unreadable block).
    Error,
    /// Global raster metadata: band count, dimensions, extent.
    Global,
    /// Per-band metadata and statistics.
    Band { band: usize },
    /// A single pixel value comparison.
    Pixel { band: usize, row: usize, col: usize },
}

/// One comparison outcome: the two compared values as display strings, a
/// pass flag, and the numeric difference and tolerance where applicable.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub scope: RowScope,
    pub label: String,
    pub verified: String,
    pub expected: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,
}

/// Aggregate outcome of one checker run. Immutable once returned; `passed`
/// is false exactly when at least one row failed.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    passed: bool,
    verified_source: String,
    expected_source: String,
    rows: Vec<ReportRow>,
}

impl ComparisonResult {
    pub(crate) fn new(
        verified_source: String,
        expected_source: String,
        rows: Vec<ReportRow>,
    ) -> Self {
        let passed = rows.iter().all(|row| row.passed);
        Self {
            passed,
            verified_source,
            expected_source,
            rows,
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn verified_source(&self) -> &str {
        &self.verified_source
    }

    pub fn expected_source(&self) -> &str {
        &self.expected_source
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn failing_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|row| !row.passed)
    }
}

/// Render the report as a plain-text table for terminal use. Passing pixels
/// are summarized per band rather than listed.
pub fn render_text(result: &ComparisonResult) -> String {
    let mut text = String::new();

    if !result.verified_source().is_empty() {
        text += &format!("Verified: {}\n", result.verified_source());
        text += &format!("Expected: {}\n", result.expected_source());
        text += "\n";
    }

    for row in result.rows() {
        match row.scope {
            RowScope::Error => text += &format!("[FAIL] Error: {}\n", row.label),
            RowScope::Global | RowScope::Band { .. } => text += &text_row(row),
            RowScope::Pixel { .. } => {}
        }
    }

    for band in band_numbers(result) {
        let pixels: Vec<_> = result
            .rows()
            .iter()
            .filter(|row| matches!(row.scope, RowScope::Pixel { band: b, .. } if b == band))
            .collect();
        if pixels.is_empty() {
            continue;
        }
        let mismatched = pixels.iter().filter(|row| !row.passed).count();
        text += &format!(
            "Band {}: {} pixels compared, {} mismatched\n",
            band,
            pixels.len(),
            mismatched
        );
        for row in pixels.iter().filter(|row| !row.passed) {
            text += &text_row(row);
        }
    }

    text += &format!(
        "\nResult: {}\n",
        if result.passed() { "PASS" } else { "FAIL" }
    );
    text
}

fn text_row(row: &ReportRow) -> String {
    let mut line = format!(
        "[{}] {}: {} {} {}",
        if row.passed { " OK " } else { "FAIL" },
        row.label,
        row.verified,
        if row.passed { "==" } else { "!=" },
        row.expected
    );
    if let Some(difference) = &row.difference {
        line += &format!(" (difference {}", difference);
        if let Some(tolerance) = &row.tolerance {
            line += &format!(", tolerance {}", tolerance);
        }
        line += ")";
    }
    line += "\n";
    line
}

/// Render the report as a self-contained HTML fragment: one table of global
/// metadata, then per band a metadata table and the full pixel value grid.
pub fn render_html(result: &ComparisonResult) -> String {
    let mut html = String::new();

    for row in result.rows() {
        if row.scope == RowScope::Error {
            html += &format!(
                "<font style='{}'>Error: {}</font><br>\n",
                ERR_MSG_STYLE, row.label
            );
        }
    }

    if !result.verified_source().is_empty() {
        html += &format!(
            "Verified URI: {}<br>\n",
            result.verified_source().replace('&', "&amp;")
        );
        html += &format!(
            "Expected URI: {}<br>\n",
            result.expected_source().replace('&', "&amp;")
        );
    }

    let global_rows: Vec<_> = result
        .rows()
        .iter()
        .filter(|row| row.scope == RowScope::Global)
        .collect();
    if !global_rows.is_empty() {
        html += "<br>\n";
        html += &format!("<table style='{}'>\n", TAB_STYLE);
        html += &compare_head();
        for row in global_rows {
            html += &html_row(row);
        }
        html += "</table>\n";
    }

    for band in band_numbers(result) {
        html += &format!("<h3>Band {}</h3>\n", band);
        html += &format!("<table style='{}'>\n", TAB_STYLE);
        html += &compare_head();
        for row in result.rows() {
            if row.scope == (RowScope::Band { band }) {
                html += &html_row(row);
            }
        }
        html += "</table>\n<br>\n";
        html += &pixel_table(result, band);
    }

    html
}

fn compare_head() -> String {
    let mut html = String::new();
    html += "<tr>";
    for title in [
        "Param name",
        "Verified value",
        "Expected value",
        "Difference",
        "Tolerance",
    ] {
        html += &format!("<th style='{}'>{}</th>", CELL_STYLE, title);
    }
    html += "</tr>\n";
    html
}

fn html_row(row: &ReportRow) -> String {
    let mut html = String::new();
    html += "<tr>\n";
    html += &format!(
        "<td style='{0}'>{1}</td><td style='{0} {2}'>{3}</td><td style='{0}'>{4}</td>\n",
        CELL_STYLE,
        row.label,
        if row.passed { OK_STYLE } else { ERR_STYLE },
        row.verified,
        row.expected
    );
    html += &format!(
        "<td style='{}'>{}</td>\n",
        CELL_STYLE,
        row.difference.as_deref().unwrap_or("")
    );
    html += &format!(
        "<td style='{}'>{}</td>\n",
        CELL_STYLE,
        row.tolerance.as_deref().unwrap_or("")
    );
    html += "</tr>\n";
    html
}

fn pixel_table(result: &ComparisonResult, band: usize) -> String {
    let pixels: Vec<_> = result
        .rows()
        .iter()
        .filter(|row| matches!(row.scope, RowScope::Pixel { band: b, .. } if b == band))
        .collect();
    if pixels.is_empty() {
        return String::new();
    }

    let mut html = String::new();
    html += "<table><tr>";
    html += "<td>Data comparison</td>";
    html += &format!(
        "<td style='{} {} border: 1px solid'>correct&nbsp;value</td>",
        CELL_STYLE, OK_STYLE
    );
    html += "<td></td>";
    html += &format!(
        "<td style='{} {} border: 1px solid'>wrong&nbsp;value<br>expected value</td>",
        CELL_STYLE, ERR_STYLE
    );
    html += "</tr></table>\n<br>\n";

    html += &format!("<table style='{}'>", TAB_STYLE);
    let mut first = true;
    for pixel in pixels {
        if matches!(pixel.scope, RowScope::Pixel { col: 0, .. }) {
            if !first {
                html += "</tr>";
            }
            html += "<tr>";
        }
        first = false;
        let value = if pixel.passed {
            pixel.verified.clone()
        } else {
            format!("{}<br>{}", pixel.verified, pixel.expected)
        };
        html += &format!(
            "<td style='{} {}'>{}</td>",
            CELL_STYLE,
            if pixel.passed { OK_STYLE } else { ERR_STYLE },
            value
        );
    }
    html += "</tr></table>\n";
    html
}

fn band_numbers(result: &ComparisonResult) -> std::ops::RangeInclusive<usize> {
    let max_band = result
        .rows()
        .iter()
        .filter_map(|row| match row.scope {
            RowScope::Band { band } | RowScope::Pixel { band, .. } => Some(band),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    1..=max_band
}
