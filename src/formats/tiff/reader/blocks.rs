//! Strip and tile decoding into whole image rows

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::formats::tiff::{tags, IFD};
use crate::io::ByteOrder;
use crate::types::DataType;
use super::TiffReader;

/// Where the blocks of an image live and how they are encoded
///
/// Strips are treated as tiles that span the full width.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub width: u64,
    pub height: u64,
    pub block_width: u64,
    pub block_height: u64,
    pub data_type: DataType,
    pub compression: Compression,
    pub predictor: u64,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

impl BlockLayout {
    /// Collects the layout of the image described by `ifd`
    pub fn from_ifd(ifd: &IFD, reader: &mut TiffReader) -> Result<Self> {
        let dims = ifd.dimensions().ok_or(Error::MissingTag(tags::IMAGE_WIDTH))?;

        let samples = ifd.samples_per_pixel();
        if samples != 1 {
            return Err(Error::Unsupported(format!(
                "{} samples per pixel, only single band rasters are read",
                samples
            )));
        }

        let bits = ifd.bits_per_sample().unwrap_or(1);
        let data_type = ifd.data_type().ok_or_else(|| {
            Error::Unsupported(format!(
                "sample format {} with {} bits per sample",
                ifd.sample_format(),
                bits
            ))
        })?;

        let compression = Compression::from_tag(ifd.compression().unwrap_or(1))?;
        if compression == Compression::Jpeg {
            if ifd.get_entry(tags::JPEG_TABLES).is_some() {
                return Err(Error::Unsupported("JPEG with shared JPEGTables".to_string()));
            }
            if data_type != DataType::U8 {
                return Err(Error::Unsupported(format!("JPEG with {} samples", data_type)));
            }
        }

        let predictor = ifd.predictor();
        match predictor {
            1 => {}
            2 if !data_type.is_float() => {}
            _ => {
                return Err(Error::Unsupported(format!(
                    "predictor {} for {} samples",
                    predictor, data_type
                )))
            }
        }

        let (block_width, block_height, offsets_tag, counts_tag) = if ifd.is_tiled() {
            let tile = ifd.tile_dimensions().ok_or(Error::MissingTag(tags::TILE_LENGTH))?;
            (tile.width, tile.height, tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            let rows = ifd.rows_per_strip().ok_or(Error::MissingTag(tags::IMAGE_LENGTH))?;
            (dims.width, rows, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        if block_width == 0 || block_height == 0 {
            return Err(Error::InvalidFormat(format!(
                "block size {}x{}",
                block_width, block_height
            )));
        }

        let offsets_entry = ifd.get_entry(offsets_tag).ok_or(Error::MissingTag(offsets_tag))?;
        let counts_entry = ifd.get_entry(counts_tag).ok_or(Error::MissingTag(counts_tag))?;
        let offsets = reader.read_tag_u64s(offsets_entry)?;
        let byte_counts = reader.read_tag_u64s(counts_entry)?;

        let layout = Self {
            width: dims.width,
            height: dims.height,
            block_width,
            block_height,
            data_type,
            compression,
            predictor,
            offsets,
            byte_counts,
        };

        let expected = layout.blocks_across() * layout.blocks_down();
        if (layout.offsets.len() as u64) < expected || (layout.byte_counts.len() as u64) < expected {
            return Err(Error::InvalidFormat(format!(
                "{} blocks expected, {} offsets and {} byte counts found",
                expected,
                layout.offsets.len(),
                layout.byte_counts.len()
            )));
        }

        Ok(layout)
    }

    pub fn blocks_across(&self) -> u64 {
        self.width.div_ceil(self.block_width)
    }

    pub fn blocks_down(&self) -> u64 {
        self.height.div_ceil(self.block_height)
    }

    /// Whether a block was never written (GDAL sparse files)
    fn is_sparse(&self, index: usize) -> bool {
        self.offsets[index] == 0 || self.byte_counts[index] == 0
    }
}

/// Decodes image rows, keeping the most recent row of blocks
pub struct RowDecoder {
    layout: BlockLayout,
    byte_order: ByteOrder,
    fill: f64,
    cached_block_row: Option<u64>,
    cache: Vec<f64>,
}

impl RowDecoder {
    /// `fill` is what cells of unwritten blocks read as
    pub fn new(layout: BlockLayout, byte_order: ByteOrder, fill: f64) -> Self {
        Self {
            layout,
            byte_order,
            fill,
            cached_block_row: None,
            cache: Vec::new(),
        }
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Decodes image row `row` into `out`, which must hold one value per
    /// column
    pub fn read_row(&mut self, reader: &mut TiffReader, row: u64, out: &mut [f64]) -> Result<()> {
        let width = self.layout.width as usize;
        if row >= self.layout.height {
            return Err(Error::OutOfBounds(format!(
                "row {} of an image with {} rows",
                row, self.layout.height
            )));
        }
        if out.len() != width {
            return Err(Error::RowLength { got: out.len(), expected: width });
        }

        let block_row = row / self.layout.block_height;
        if self.cached_block_row != Some(block_row) {
            self.load_block_row(reader, block_row)?;
        }

        let start = (row % self.layout.block_height) as usize * width;
        out.copy_from_slice(&self.cache[start..start + width]);
        Ok(())
    }

    fn load_block_row(&mut self, reader: &mut TiffReader, block_row: u64) -> Result<()> {
        let layout = &self.layout;
        let width = layout.width as usize;
        let block_width = layout.block_width as usize;
        let sample_size = layout.data_type.size();
        let rows = layout.block_height.min(layout.height - block_row * layout.block_height) as usize;

        self.cached_block_row = None;
        self.cache.clear();
        self.cache.resize(rows * width, self.fill);

        for across in 0..layout.blocks_across() {
            let index = (block_row * layout.blocks_across() + across) as usize;
            if layout.is_sparse(index) {
                continue;
            }

            let raw = reader.read_block_bytes(layout.offsets[index], layout.byte_counts[index])?;
            let mut data = layout.compression.decompress(&raw)?;

            let needed = rows * block_width * sample_size;
            if data.len() < needed {
                return Err(Error::InvalidFormat(format!(
                    "block {} decodes to {} bytes, {} needed",
                    index,
                    data.len(),
                    needed
                )));
            }

            if layout.predictor == 2 {
                undo_horizontal_predictor(&mut data[..needed], block_width, sample_size, self.byte_order);
            }

            let first_col = across as usize * block_width;
            let cols = block_width.min(width - first_col);
            for r in 0..rows {
                let src = &data[r * block_width * sample_size..];
                let dst = &mut self.cache[r * width + first_col..r * width + first_col + cols];
                for (c, cell) in dst.iter_mut().enumerate() {
                    *cell = layout.data_type.decode_sample(&src[c * sample_size..], self.byte_order);
                }
            }
        }

        self.cached_block_row = Some(block_row);
        Ok(())
    }
}

/// Reverses TIFF predictor 2: each sample was stored as the difference
/// from its left neighbour, with wrapping integer arithmetic
pub fn undo_horizontal_predictor(
    data: &mut [u8],
    row_samples: usize,
    sample_size: usize,
    order: ByteOrder,
) {
    let row_bytes = row_samples * sample_size;
    if row_bytes == 0 {
        return;
    }

    if sample_size == 1 {
        for row in data.chunks_exact_mut(row_bytes) {
            for i in 1..row.len() {
                row[i] = row[i].wrapping_add(row[i - 1]);
            }
        }
        return;
    }

    let mask = if sample_size >= 8 {
        u64::MAX
    } else {
        (1u64 << (sample_size * 8)) - 1
    };

    for row in data.chunks_exact_mut(row_bytes) {
        let mut prev = get_uint(&row[..sample_size], order);
        for i in 1..row_samples {
            let sample = &mut row[i * sample_size..(i + 1) * sample_size];
            let value = get_uint(sample, order).wrapping_add(prev) & mask;
            put_uint(value, sample, order);
            prev = value;
        }
    }
}

fn get_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::LittleEndian => bytes.iter().rev().fold(0, |acc, &b| (acc << 8) | b as u64),
        ByteOrder::BigEndian => bytes.iter().fold(0, |acc, &b| (acc << 8) | b as u64),
    }
}

fn put_uint(mut value: u64, bytes: &mut [u8], order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => {
            for b in bytes.iter_mut() {
                *b = value as u8;
                value >>= 8;
            }
        }
        ByteOrder::BigEndian => {
            for b in bytes.iter_mut().rev() {
                *b = value as u8;
                value >>= 8;
            }
        }
    }
}
