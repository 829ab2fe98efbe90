//! Reading maps row by row through the computational region

use std::path::Path;
use crate::error::{Error, Result};
use crate::formats::tiff::writer::parse_nodata;
use crate::formats::tiff::{tags, BlockLayout, GeoInfo, RowDecoder, TiffReader};
use crate::types::{DataType, Dimensions};
use super::Region;

/// An open map, read in region rows with nulls as `None`
pub struct RasterReader {
    name: String,
    tiff: TiffReader,
    decoder: RowDecoder,
    data_type: DataType,
    dimensions: Dimensions,
    nodata: Option<f64>,
    geo: Option<GeoInfo>,
    region: Region,
    mask: Option<Box<RasterReader>>,
    native_row: Vec<f64>,
    mask_row: Vec<Option<f64>>,
}

impl RasterReader {
    pub(crate) fn open(name: &str, path: &Path, region: Region) -> Result<Self> {
        let mut tiff = TiffReader::open(path)?;
        let directory = tiff.read()?;
        let ifd = directory
            .main_ifd()
            .ok_or_else(|| Error::InvalidFormat(format!("<{}> has no image directory", name)))?;

        let layout = BlockLayout::from_ifd(ifd, &mut tiff)?;
        let nodata = match ifd.get_entry(tags::GDAL_NODATA) {
            Some(entry) => parse_nodata(&tiff.read_tag_ascii(entry)?),
            None => None,
        };
        let geo = GeoInfo::from_ifd(ifd, &mut tiff)?;

        let data_type = layout.data_type;
        let nodata = match data_type {
            DataType::F32 => nodata.map(|v| v as f32 as f64),
            _ => nodata,
        };
        let dimensions = Dimensions::new(layout.width, layout.height);
        // unwritten blocks read as null when there is a null value to use
        let decoder = RowDecoder::new(layout, tiff.byte_order(), nodata.unwrap_or(0.0));

        log::debug!(
            "opened <{}>: {}x{} {}, nodata {:?}",
            name, dimensions.width, dimensions.height, data_type, nodata
        );

        Ok(Self {
            name: name.to_string(),
            tiff,
            decoder,
            data_type,
            dimensions,
            nodata,
            geo,
            region,
            mask: None,
            native_row: vec![0.0; dimensions.width as usize],
            mask_row: Vec::new(),
        })
    }

    /// Hides every cell the mask holds null or zero for
    pub(crate) fn with_mask(mut self, mask: RasterReader) -> Self {
        self.mask_row = vec![None; self.region.cols];
        self.mask = Some(Box::new(mask));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Native extent of the map, independent of the region
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Georeferencing of the region window rather than the stored map
    pub fn window_geo_info(&self) -> Option<GeoInfo> {
        self.geo
            .as_ref()
            .map(|geo| geo.shifted(self.region.row_offset, self.region.col_offset))
    }

    fn is_null(&self, value: f64) -> bool {
        value.is_nan() || self.nodata == Some(value)
    }

    /// Reads region row `row` into `buf`
    pub fn get_row(&mut self, buf: &mut [Option<f64>], row: usize) -> Result<()> {
        if buf.len() != self.region.cols {
            return Err(Error::RowLength {
                got: buf.len(),
                expected: self.region.cols,
            });
        }
        if row >= self.region.rows {
            return Err(Error::OutOfBounds(format!(
                "row {} of a region with {} rows",
                row, self.region.rows
            )));
        }

        buf.fill(None);

        if let Some(map_row) = self.region.map_row(row, self.dimensions.height) {
            self.decoder.read_row(&mut self.tiff, map_row, &mut self.native_row)?;

            for (col, cell) in buf.iter_mut().enumerate() {
                if let Some(map_col) = self.region.map_col(col, self.dimensions.width) {
                    let value = self.native_row[map_col as usize];
                    if !self.is_null(value) {
                        *cell = Some(value);
                    }
                }
            }
        }

        if let Some(mask) = self.mask.as_mut() {
            mask.get_row(&mut self.mask_row, row)?;
            for (cell, keep) in buf.iter_mut().zip(&self.mask_row) {
                if keep.map_or(true, |v| v == 0.0) {
                    *cell = None;
                }
            }
        }

        Ok(())
    }
}
