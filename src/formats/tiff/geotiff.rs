//! GeoTIFF georeferencing carried from an input map to its output

use crate::error::Result;
use crate::io::SeekableWriter;
use super::ifd::IFD;
use super::reader::TiffReader;
use super::tags;
use super::writer::{TagValue, TiffWriter};

/// GeoTIFF tags of one image, kept as stored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoInfo {
    /// Model pixel scale (ScaleX, ScaleY, ScaleZ)
    pub pixel_scale: Option<Vec<f64>>,
    /// Model tiepoints (pixel coord -> geo coord mapping)
    pub tiepoints: Vec<TiePoint>,
    /// 4x4 model transformation, row major
    pub transformation: Option<Vec<f64>>,
    pub geo_keys: Option<Vec<u16>>,
    pub geo_doubles: Option<Vec<f64>>,
    pub geo_ascii: Option<String>,
}

/// Represents a GeoTIFF tiepoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiePoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pixel_z: f64,
    pub geo_x: f64,
    pub geo_y: f64,
    pub geo_z: f64,
}

/// GeoKey constants
mod geo_keys {
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
}

impl GeoInfo {
    /// Extracts GeoTIFF information from an IFD, `None` when the image is
    /// not georeferenced
    pub fn from_ifd(ifd: &IFD, reader: &mut TiffReader) -> Result<Option<Self>> {
        if !ifd.is_geotiff() {
            return Ok(None);
        }

        let mut geo_info = GeoInfo::default();

        if let Some(entry) = ifd.get_entry(tags::MODEL_PIXEL_SCALE) {
            geo_info.pixel_scale = Some(reader.read_tag_doubles(entry)?);
        }

        if let Some(entry) = ifd.get_entry(tags::MODEL_TIEPOINT) {
            let values = reader.read_tag_doubles(entry)?;
            for chunk in values.chunks_exact(6) {
                geo_info.tiepoints.push(TiePoint {
                    pixel_x: chunk[0],
                    pixel_y: chunk[1],
                    pixel_z: chunk[2],
                    geo_x: chunk[3],
                    geo_y: chunk[4],
                    geo_z: chunk[5],
                });
            }
        }

        if let Some(entry) = ifd.get_entry(tags::MODEL_TRANSFORMATION) {
            geo_info.transformation = Some(reader.read_tag_doubles(entry)?);
        }

        if let Some(entry) = ifd.get_entry(tags::GEO_KEY_DIRECTORY) {
            geo_info.geo_keys = Some(reader.read_tag_u16s(entry)?);
        }

        if let Some(entry) = ifd.get_entry(tags::GEO_DOUBLE_PARAMS) {
            geo_info.geo_doubles = Some(reader.read_tag_doubles(entry)?);
        }

        if let Some(entry) = ifd.get_entry(tags::GEO_ASCII_PARAMS) {
            geo_info.geo_ascii = Some(reader.read_tag_ascii(entry)?);
        }

        Ok(Some(geo_info))
    }

    /// EPSG code of the projected or geographic CRS, if the key directory
    /// names one directly
    pub fn epsg_code(&self) -> Option<u16> {
        let keys = self.geo_keys.as_ref()?;
        if keys.len() < 4 {
            return None;
        }

        let mut geographic = None;
        for key in keys[4..].chunks_exact(4).take(keys[3] as usize) {
            // location 0 means the value is stored in the entry itself
            if key[1] != 0 {
                continue;
            }
            match key[0] {
                geo_keys::PROJECTED_CS_TYPE => return Some(key[3]),
                geo_keys::GEOGRAPHIC_TYPE => geographic = Some(key[3]),
                _ => {}
            }
        }
        geographic
    }

    /// Georeferencing of the window whose first cell is `(row_offset,
    /// col_offset)` in this image
    pub fn shifted(&self, row_offset: i64, col_offset: i64) -> Self {
        let mut shifted = self.clone();
        let (dr, dc) = (row_offset as f64, col_offset as f64);

        for tp in &mut shifted.tiepoints {
            tp.pixel_x -= dc;
            tp.pixel_y -= dr;
        }

        if let Some(m) = shifted.transformation.as_mut().filter(|m| m.len() == 16) {
            m[3] += m[0] * dc + m[1] * dr;
            m[7] += m[4] * dc + m[5] * dr;
            m[11] += m[8] * dc + m[9] * dr;
        }

        shifted
    }

    /// Copies the georeferencing into a file being written
    pub fn write_tags<W: SeekableWriter>(&self, writer: &mut TiffWriter<W>) {
        if let Some(ref scale) = self.pixel_scale {
            writer.set_tag(tags::MODEL_PIXEL_SCALE, TagValue::Double(scale.clone()));
        }

        if !self.tiepoints.is_empty() {
            let values = self
                .tiepoints
                .iter()
                .flat_map(|tp| [tp.pixel_x, tp.pixel_y, tp.pixel_z, tp.geo_x, tp.geo_y, tp.geo_z])
                .collect();
            writer.set_tag(tags::MODEL_TIEPOINT, TagValue::Double(values));
        }

        if let Some(ref m) = self.transformation {
            writer.set_tag(tags::MODEL_TRANSFORMATION, TagValue::Double(m.clone()));
        }

        if let Some(ref keys) = self.geo_keys {
            writer.set_tag(tags::GEO_KEY_DIRECTORY, TagValue::Short(keys.clone()));
        }

        if let Some(ref doubles) = self.geo_doubles {
            writer.set_tag(tags::GEO_DOUBLE_PARAMS, TagValue::Double(doubles.clone()));
        }

        if let Some(ref ascii) = self.geo_ascii {
            writer.set_tag(tags::GEO_ASCII_PARAMS, TagValue::Ascii(ascii.clone()));
        }
    }
}

impl std::fmt::Display for GeoInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.epsg_code() {
            Some(epsg) => write!(f, "EPSG:{}", epsg)?,
            None => write!(f, "unknown CRS")?,
        }

        if let Some(scale) = self.pixel_scale.as_ref().filter(|s| s.len() >= 2) {
            write!(f, ", pixel size {} x {}", scale[0], scale[1])?;
        }

        if let Some(tp) = self.tiepoints.first() {
            write!(f, ", origin ({}, {})", tp.geo_x, tp.geo_y)?;
        }

        Ok(())
    }
}
