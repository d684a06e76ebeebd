//! Built-in raster source backends. Each backend registers an opener in the
//! source registry under its type id.

pub mod ascii_grid;
pub mod png;
