#![doc = include_str!("../README.md")]

pub mod backends;
pub mod checker;
pub mod error;
pub mod report;
pub mod source;

pub use checker::{tolerance, values_match, RasterChecker};
pub use error::SourceError;
pub use report::{ComparisonResult, ReportRow, RowScope};
pub use source::{
    open_source, BandInfo, BandStatistics, Block, RasterDataType, RasterExtent, RasterSource,
};
pub use serde_json;
