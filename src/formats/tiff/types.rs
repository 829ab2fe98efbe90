//! TIFF data structures

use super::ifd::IFD;
use crate::io::ByteOrder;
use std::fmt;

/// Represents the directory structure of a TIFF or BigTIFF file
#[derive(Debug)]
pub struct Tiff {
    /// Whether this is BigTIFF format
    pub is_big_tiff: bool,
    /// Byte order of the file
    pub byte_order: ByteOrder,
    /// Image File Directories
    pub ifds: Vec<IFD>,
}

impl Tiff {
    /// Creates a new TIFF structure
    pub fn new(is_big_tiff: bool, byte_order: ByteOrder) -> Self {
        Self {
            is_big_tiff,
            byte_order,
            ifds: Vec::new(),
        }
    }

    /// Adds an IFD to this TIFF
    pub fn add_ifd(&mut self, ifd: IFD) {
        self.ifds.push(ifd);
    }

    /// Returns the main (first) IFD, which holds the full resolution raster
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// Returns the number of IFDs
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }
}

impl fmt::Display for Tiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}), {} IFD(s)",
            if self.is_big_tiff { "BigTIFF" } else { "TIFF" },
            self.byte_order,
            self.ifds.len()
        )?;

        if let Some(ifd) = self.main_ifd() {
            if let Some(dims) = ifd.dimensions() {
                write!(f, ", {} x {}", dims.width, dims.height)?;
            }
            if let Some(data_type) = ifd.data_type() {
                write!(f, ", {}", data_type)?;
            }
            if let Some(compression) = ifd.compression() {
                write!(f, ", compression {}", compression)?;
            }
            if let Some(tile_dims) = ifd.tile_dimensions() {
                write!(f, ", tiles {} x {}", tile_dims.width, tile_dims.height)?;
            }
            if ifd.is_geotiff() {
                write!(f, ", GeoTIFF")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tiff::ifd::IFDEntry;
    use crate::formats::tiff::tags;

    #[test]
    fn test_tiff_creation() {
        let tiff = Tiff::new(false, ByteOrder::LittleEndian);
        assert!(!tiff.is_big_tiff);
        assert_eq!(tiff.ifd_count(), 0);
        assert!(tiff.main_ifd().is_none());
    }

    #[test]
    fn test_main_ifd() {
        let mut tiff = Tiff::new(false, ByteOrder::LittleEndian);
        let mut ifd = IFD::new(0, 1000);
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, tags::field_types::LONG, 1, 1024));
        tiff.add_ifd(ifd);
        tiff.add_ifd(IFD::new(1, 2000));

        let main = tiff.main_ifd().unwrap();
        assert_eq!(main.number, 0);
        assert_eq!(main.get_tag_value(tags::IMAGE_WIDTH), Some(1024));
    }

    #[test]
    fn test_display() {
        let mut tiff = Tiff::new(true, ByteOrder::BigEndian);
        let mut ifd = IFD::new(0, 8);
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, tags::field_types::LONG, 1, 1024));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, tags::field_types::LONG, 1, 768));
        ifd.add_entry(IFDEntry::new(tags::BITS_PER_SAMPLE, tags::field_types::SHORT, 1, 32));
        ifd.add_entry(IFDEntry::new(tags::SAMPLE_FORMAT, tags::field_types::SHORT, 1, 3));
        tiff.add_ifd(ifd);

        let output = format!("{}", tiff);
        assert!(output.contains("BigTIFF"));
        assert!(output.contains("1024 x 768"));
        assert!(output.contains("F32"));
    }
}
