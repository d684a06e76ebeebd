//! PNG backend (type id `png`): each color channel is exposed as one raster
//! band. There is no georeferencing in a plain PNG, so the extent is the
//! pixel space `(0, 0, width, height)` and no band has a nodata value.

use std::fs::File;
use std::io::BufReader;

use log::info;

use super::ascii_grid::compute_statistics;
use crate::error::SourceError;
use crate::source::{BandInfo, Block, RasterDataType, RasterExtent, RasterSource};

pub(crate) fn open(location: &str) -> Result<Box<dyn RasterSource>, SourceError> {
    let file = File::open(location).map_err(|source| SourceError::Io {
        location: location.to_string(),
        source,
    })?;
    let decode = |source| SourceError::Decode {
        location: location.to_string(),
        source,
    };

    let mut decoder = ::png::Decoder::new(BufReader::new(file));
    // Expand palette and sub-byte depths so samples are always 8 or 16 bit
    decoder.set_transformations(::png::Transformations::EXPAND);
    let mut reader = decoder.read_info().map_err(decode)?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).map_err(decode)?;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let channels = frame.color_type.samples();
    let data_type = match frame.bit_depth {
        ::png::BitDepth::Eight => RasterDataType::Byte,
        ::png::BitDepth::Sixteen => RasterDataType::UInt16,
        other => {
            return Err(SourceError::Unsupported {
                location: location.to_string(),
                message: format!("bit depth {:?}", other),
            })
        }
    };

    let bytes = &buf[..frame.buffer_size()];
    let samples: Vec<f64> = match data_type {
        RasterDataType::Byte => bytes.iter().map(|b| *b as f64).collect(),
        _ => bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]) as f64)
            .collect(),
    };

    // De-interleave channels into per-band planes
    let mut planes: Vec<Vec<f64>> = (0..channels)
        .map(|_| Vec::with_capacity(width * height))
        .collect();
    for (index, sample) in samples.iter().enumerate() {
        planes[index % channels].push(*sample);
    }
    let bands = planes
        .iter()
        .map(|plane| BandInfo {
            source_data_type: data_type,
            data_type,
            has_no_data_value: false,
            no_data_value: f64::NAN,
            statistics: compute_statistics(plane),
        })
        .collect();

    info!(
        "Opened PNG {} ({}x{}, {} bands)",
        location, width, height, channels
    );
    Ok(Box::new(PngSource {
        width,
        height,
        extent: RasterExtent::new(0.0, 0.0, width as f64, height as f64),
        bands,
        planes,
    }))
}

#[derive(Debug)]
struct PngSource {
    width: usize,
    height: usize,
    extent: RasterExtent,
    bands: Vec<BandInfo>,
    planes: Vec<Vec<f64>>,
}

impl RasterSource for PngSource {
    fn is_valid(&self) -> bool {
        !self.planes.is_empty()
    }

    fn band_count(&self) -> usize {
        self.bands.len()
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
        self.bands.get(band.wrapping_sub(1))
    }

    fn read_block(
        &self,
        band: usize,
        extent: &RasterExtent,
        width: usize,
        height: usize,
    ) -> Option<Block> {
        if band == 0 || *extent != self.extent || width != self.width || height != self.height {
            return None;
        }
        let plane = self.planes.get(band - 1)?;
        Some(Block::new(width, height, plane.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;

    fn write_rgb_png(path: &std::path::Path, width: u32, height: u32, pixels: &[u8]) {
        let file = File::create(path).unwrap();
        let mut encoder = ::png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(::png::ColorType::Rgb);
        encoder.set_depth(::png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(pixels).unwrap();
    }

    #[test]
    fn test_open_rgb_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        // 2x1: red pixel, then blue pixel
        write_rgb_png(&path, 2, 1, &[255, 0, 0, 0, 0, 255]);

        let source = open(path.to_str().unwrap()).unwrap();
        assert!(source.is_valid());
        assert_eq!(source.band_count(), 3);
        assert_eq!(source.width(), 2);
        assert_eq!(source.height(), 1);
        assert_eq!(source.extent(), RasterExtent::new(0.0, 0.0, 2.0, 1.0));

        let red = source.band(1).unwrap();
        assert_eq!(red.data_type, RasterDataType::Byte);
        assert!(!red.has_no_data_value);
        assert_eq!(red.statistics.minimum, 0.0);
        assert_eq!(red.statistics.maximum, 255.0);

        let extent = source.extent();
        let block = source.read_block(1, &extent, 2, 1).unwrap();
        assert_eq!(block.value_at(0, 0), 255.0);
        assert_eq!(block.value_at(0, 1), 0.0);
        let blue = source.read_block(3, &extent, 2, 1).unwrap();
        assert_eq!(blue.value_at(0, 1), 255.0);
    }

    #[test]
    fn test_open_missing_file() {
        let err = open("/nonexistent/picture.png").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn test_open_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not a png at all").unwrap();
        let err = open(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }
}
