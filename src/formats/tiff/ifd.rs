//! Image File Directory (IFD) structures

use std::collections::HashMap;
use crate::io::ByteOrder;
use crate::types::{Dimensions, DataType};
use super::tags::{self, field_types};

/// Represents an Image File Directory entry
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// The value itself for a single inline integer, otherwise the offset
    /// of the values in the file
    pub value_offset: u64,
    /// Raw bytes of the value field, in file byte order
    pub inline: [u8; 8],
}

impl IFDEntry {
    /// Creates a new IFD entry whose raw value field is `value_offset` in
    /// little-endian order
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline: value_offset.to_le_bytes(),
        }
    }

    /// Builds an entry from the raw value field read out of a directory
    ///
    /// `raw` holds 4 meaningful bytes for classic TIFF and 8 for BigTIFF.
    pub fn parse(
        tag: u16,
        field_type: u16,
        count: u64,
        raw: [u8; 8],
        is_big_tiff: bool,
        byte_order: ByteOrder,
    ) -> Self {
        let mut entry = Self {
            tag,
            field_type,
            count,
            value_offset: 0,
            inline: raw,
        };

        let single_inline = count == 1 && entry.is_inline(is_big_tiff);
        entry.value_offset = match (single_inline, field_type) {
            (true, field_types::BYTE) => raw[0] as u64,
            (true, field_types::SHORT) => decode_u16(&raw, byte_order) as u64,
            (true, field_types::LONG) => decode_u32(&raw, byte_order) as u64,
            _ if is_big_tiff => decode_u64(&raw, byte_order),
            _ => decode_u32(&raw, byte_order) as u64,
        };
        entry
    }

    /// Returns the size in bytes of this field type
    pub fn field_type_size(&self) -> usize {
        use super::tags::field_types::*;
        match self.field_type {
            BYTE | ASCII | SBYTE | UNDEFINED => 1,
            SHORT | SSHORT => 2,
            LONG | SLONG | FLOAT => 4,
            RATIONAL | SRATIONAL | DOUBLE | LONG8 | SLONG8 | IFD8 => 8,
            _ => 1,
        }
    }

    /// Returns whether the value is stored inline (in value_offset field)
    pub fn is_inline(&self, is_big_tiff: bool) -> bool {
        let total_size = self.field_type_size() as u64 * self.count;
        let inline_size = if is_big_tiff { 8 } else { 4 };
        total_size <= inline_size
    }
}

fn decode_u16(raw: &[u8; 8], order: ByteOrder) -> u16 {
    let bytes = [raw[0], raw[1]];
    match order {
        ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
        ByteOrder::BigEndian => u16::from_be_bytes(bytes),
    }
}

fn decode_u32(raw: &[u8; 8], order: ByteOrder) -> u32 {
    let bytes = [raw[0], raw[1], raw[2], raw[3]];
    match order {
        ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        ByteOrder::BigEndian => u32::from_be_bytes(bytes),
    }
}

fn decode_u64(raw: &[u8; 8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::LittleEndian => u64::from_le_bytes(*raw),
        ByteOrder::BigEndian => u64::from_be_bytes(*raw),
    }
}

/// Represents an Image File Directory
#[derive(Debug, Clone)]
pub struct IFD {
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in file
    pub offset: u64,
    /// Entries in this IFD
    pub entries: Vec<IFDEntry>,
    /// Tag map for quick lookup
    tag_map: HashMap<u16, usize>,
}

impl IFD {
    /// Creates a new IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            number,
            offset,
            entries: Vec::new(),
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry to this IFD
    pub fn add_entry(&mut self, entry: IFDEntry) {
        let index = self.entries.len();
        self.tag_map.insert(entry.tag, index);
        self.entries.push(entry);
    }

    /// Gets an entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).and_then(|&idx| self.entries.get(idx))
    }

    /// Gets the value of a single-valued integer tag
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag).map(|e| e.value_offset)
    }

    /// Returns image dimensions if available
    pub fn dimensions(&self) -> Option<Dimensions> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some(Dimensions::new(width, height))
    }

    /// Returns compression type
    pub fn compression(&self) -> Option<u64> {
        self.get_tag_value(tags::COMPRESSION)
    }

    /// Returns samples per pixel
    pub fn samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Returns bits per sample
    pub fn bits_per_sample(&self) -> Option<u64> {
        self.get_tag_value(tags::BITS_PER_SAMPLE)
    }

    /// Returns sample format (1=unsigned, 2=signed, 3=float)
    pub fn sample_format(&self) -> u64 {
        self.get_tag_value(tags::SAMPLE_FORMAT).unwrap_or(1)
    }

    /// Returns the predictor (1=none, 2=horizontal differencing)
    pub fn predictor(&self) -> u64 {
        self.get_tag_value(tags::PREDICTOR).unwrap_or(1)
    }

    /// Determines the cell data type based on TIFF tags
    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_tiff(self.sample_format(), self.bits_per_sample()?)
    }

    /// Returns whether this IFD represents a tiled image
    pub fn is_tiled(&self) -> bool {
        self.get_entry(tags::TILE_WIDTH).is_some()
    }

    /// Returns tile dimensions if tiled
    pub fn tile_dimensions(&self) -> Option<Dimensions> {
        let width = self.get_tag_value(tags::TILE_WIDTH)?;
        let height = self.get_tag_value(tags::TILE_LENGTH)?;
        Some(Dimensions::new(width, height))
    }

    /// Rows per strip; a missing tag means the whole image is one strip
    pub fn rows_per_strip(&self) -> Option<u64> {
        let height = self.dimensions()?.height;
        let rows = self.get_tag_value(tags::ROWS_PER_STRIP).unwrap_or(height);
        Some(rows.clamp(1, height.max(1)))
    }

    /// Returns number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns all GeoTIFF related tags
    pub fn geotiff_tags(&self) -> Vec<&IFDEntry> {
        self.entries.iter()
            .filter(|e| {
                matches!(e.tag,
                    tags::MODEL_PIXEL_SCALE |
                    tags::MODEL_TIEPOINT |
                    tags::MODEL_TRANSFORMATION |
                    tags::GEO_KEY_DIRECTORY |
                    tags::GEO_DOUBLE_PARAMS |
                    tags::GEO_ASCII_PARAMS
                )
            })
            .collect()
    }

    /// Checks if this IFD has GeoTIFF tags
    pub fn is_geotiff(&self) -> bool {
        !self.geotiff_tags().is_empty()
    }
}
