//! Streaming strip writer for single band TIFF files
//!
//! Rows are compressed and appended one strip at a time. The directory is
//! only written by [`TiffWriter::finish`], after which the header is patched
//! to point at it, so a map never has to be held in memory.

use std::collections::BTreeMap;
use std::io::{SeekFrom, Write};
use chrono::Local;
use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::io::{ByteOrder, ByteOrderHandler, SeekableWriter};
use crate::types::DataType;
use super::tags::{self, field_types};
use super::TIFF_MAGIC;

/// Value of one directory entry
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
    Ascii(String),
}

impl TagValue {
    fn field_type(&self) -> u16 {
        match self {
            TagValue::Short(_) => field_types::SHORT,
            TagValue::Long(_) => field_types::LONG,
            TagValue::Double(_) => field_types::DOUBLE,
            TagValue::Ascii(_) => field_types::ASCII,
        }
    }

    fn count(&self) -> usize {
        match self {
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Double(v) => v.len(),
            // NUL terminator
            TagValue::Ascii(s) => s.len() + 1,
        }
    }

    fn encode(&self, handler: &dyn ByteOrderHandler, out: &mut Vec<u8>) -> Result<()> {
        match self {
            TagValue::Short(values) => {
                for &v in values {
                    handler.write_u16(out, v)?;
                }
            }
            TagValue::Long(values) => {
                for &v in values {
                    handler.write_u32(out, v)?;
                }
            }
            TagValue::Double(values) => {
                for &v in values {
                    handler.write_f64(out, v)?;
                }
            }
            TagValue::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
        }
        Ok(())
    }
}

/// A classic TIFF directory under construction
///
/// Entries are kept sorted by tag, which TIFF requires.
#[derive(Debug, Default)]
pub struct Directory {
    entries: BTreeMap<u16, TagValue>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a tag, replacing any earlier value
    pub fn insert(&mut self, tag: u16, value: TagValue) {
        self.entries.insert(tag, value);
    }

    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the directory at the end of `out`, followed by the values
    /// that do not fit in an entry, and returns the directory's offset
    pub fn write<W: SeekableWriter>(&self, out: &mut W, byte_order: ByteOrder) -> Result<u64> {
        let handler = byte_order.handler();

        let mut offset = out.seek(SeekFrom::End(0))?;
        if offset % 2 == 1 {
            out.write_all(&[0])?;
            offset += 1;
        }

        let table_len = 2 + 12 * self.entries.len() as u64 + 4;
        let mut data_offset = offset + table_len;
        let mut table = Vec::with_capacity(table_len as usize);
        let mut data = Vec::new();

        handler.write_u16(&mut table, self.entries.len() as u16)?;

        for (&tag, value) in &self.entries {
            let mut bytes = Vec::new();
            value.encode(&*handler, &mut bytes)?;

            handler.write_u16(&mut table, tag)?;
            handler.write_u16(&mut table, value.field_type())?;
            handler.write_u32(&mut table, to_u32(value.count() as u64)?)?;

            if bytes.len() <= 4 {
                bytes.resize(4, 0);
                table.extend_from_slice(&bytes);
            } else {
                handler.write_u32(&mut table, to_u32(data_offset)?)?;
                data_offset += bytes.len() as u64;
                data.extend_from_slice(&bytes);
                if data.len() % 2 == 1 {
                    data.push(0);
                    data_offset += 1;
                }
            }
        }

        // no further directories
        handler.write_u32(&mut table, 0)?;

        to_u32(data_offset)?;
        out.write_all(&table)?;
        out.write_all(&data)?;

        Ok(offset)
    }
}

fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::Unsupported(format!("offset {} needs BigTIFF, which is not written", value))
    })
}

/// Formats a null sentinel the way the `GDAL_NODATA` tag stores it
pub fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", value)
    }
}

/// Parses a `GDAL_NODATA` tag value
pub fn parse_nodata(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    text.parse().ok()
}

/// Writes a single band striped TIFF one row at a time
pub struct TiffWriter<W: SeekableWriter> {
    out: W,
    byte_order: ByteOrder,
    width: u32,
    height: u32,
    data_type: DataType,
    compression: Compression,
    directory: Directory,
    strip_offsets: Vec<u32>,
    strip_byte_counts: Vec<u32>,
    scratch: Vec<u8>,
}

impl<W: SeekableWriter> TiffWriter<W> {
    /// Starts a new file and writes its header
    ///
    /// # Arguments
    /// * `out` - Destination, positioned at its start
    /// * `width` / `height` - Image size in cells
    /// * `data_type` - Native sample type
    /// * `compression` - Strip codec; must support encoding
    /// * `nodata` - Null sentinel recorded in the `GDAL_NODATA` tag
    pub fn new(
        mut out: W,
        width: u32,
        height: u32,
        data_type: DataType,
        compression: Compression,
        nodata: f64,
        byte_order: ByteOrder,
    ) -> Result<Self> {
        if matches!(compression, Compression::Lzw | Compression::Jpeg) {
            return Err(Error::Unsupported(format!("{} encoding", compression.name())));
        }

        let handler = byte_order.handler();
        out.write_all(&byte_order.tiff_magic())?;
        handler.write_u16(&mut out, TIFF_MAGIC)?;
        // patched by finish()
        handler.write_u32(&mut out, 0)?;

        let mut directory = Directory::new();
        directory.insert(tags::GDAL_NODATA, TagValue::Ascii(format_nodata(nodata)));

        Ok(Self {
            out,
            byte_order,
            width,
            height,
            data_type,
            compression,
            directory,
            strip_offsets: Vec::with_capacity(height as usize),
            strip_byte_counts: Vec::with_capacity(height as usize),
            scratch: Vec::with_capacity(width as usize * data_type.size()),
        })
    }

    /// Adds a tag to the directory written at the end
    pub fn set_tag(&mut self, tag: u16, value: TagValue) {
        self.directory.insert(tag, value);
    }

    pub fn rows_written(&self) -> usize {
        self.strip_offsets.len()
    }

    /// Encodes and appends the next row. Values must already be
    /// representable in the native type.
    pub fn write_row(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.width as usize {
            return Err(Error::RowLength {
                got: values.len(),
                expected: self.width as usize,
            });
        }
        if self.rows_written() >= self.height as usize {
            return Err(Error::OutOfBounds(format!(
                "image has only {} rows",
                self.height
            )));
        }

        self.scratch.clear();
        for &value in values {
            self.data_type.encode_sample(value, self.byte_order, &mut self.scratch);
        }
        let strip = self.compression.compress(&self.scratch)?;

        let offset = self.out.seek(SeekFrom::End(0))?;
        self.strip_offsets.push(to_u32(offset)?);
        self.strip_byte_counts.push(to_u32(strip.len() as u64)?);
        self.out.write_all(&strip)?;

        Ok(())
    }

    /// Writes the directory, points the header at it and hands back the
    /// underlying writer
    pub fn finish(mut self) -> Result<W> {
        if self.rows_written() != self.height as usize {
            return Err(Error::InvalidFormat(format!(
                "{} of {} rows written",
                self.rows_written(),
                self.height
            )));
        }

        let directory = &mut self.directory;
        directory.insert(tags::IMAGE_WIDTH, TagValue::Long(vec![self.width]));
        directory.insert(tags::IMAGE_LENGTH, TagValue::Long(vec![self.height]));
        directory.insert(tags::BITS_PER_SAMPLE, TagValue::Short(vec![self.data_type.bits()]));
        directory.insert(tags::COMPRESSION, TagValue::Short(vec![self.compression.tag()]));
        // BlackIsZero
        directory.insert(tags::PHOTOMETRIC_INTERPRETATION, TagValue::Short(vec![1]));
        directory.insert(tags::STRIP_OFFSETS, TagValue::Long(std::mem::take(&mut self.strip_offsets)));
        directory.insert(tags::SAMPLES_PER_PIXEL, TagValue::Short(vec![1]));
        directory.insert(tags::ROWS_PER_STRIP, TagValue::Long(vec![1]));
        directory.insert(tags::STRIP_BYTE_COUNTS, TagValue::Long(std::mem::take(&mut self.strip_byte_counts)));
        directory.insert(tags::PLANAR_CONFIGURATION, TagValue::Short(vec![1]));
        directory.insert(tags::SAMPLE_FORMAT, TagValue::Short(vec![self.data_type.sample_format()]));
        directory.insert(
            tags::SOFTWARE,
            TagValue::Ascii(format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))),
        );
        directory.insert(
            tags::DATE_TIME,
            TagValue::Ascii(Local::now().format("%Y:%m:%d %H:%M:%S").to_string()),
        );

        let ifd_offset = self.directory.write(&mut self.out, self.byte_order)?;

        let handler = self.byte_order.handler();
        self.out.seek(SeekFrom::Start(4))?;
        handler.write_u32(&mut self.out, to_u32(ifd_offset)?)?;
        self.out.seek(SeekFrom::End(0))?;
        self.out.flush()?;

        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_directory_sorted_and_out_of_line() {
        let mut directory = Directory::new();
        directory.insert(tags::IMAGE_LENGTH, TagValue::Long(vec![3]));
        directory.insert(tags::IMAGE_WIDTH, TagValue::Long(vec![2]));
        directory.insert(tags::MODEL_PIXEL_SCALE, TagValue::Double(vec![1.0, 1.0, 0.0]));

        let mut out = Cursor::new(vec![0u8; 9]);
        let offset = directory.write(&mut out, ByteOrder::LittleEndian).unwrap();
        let bytes = out.into_inner();

        // word aligned after the odd-length prefix
        assert_eq!(offset, 10);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 3);
        // first entry is the lowest tag
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), tags::IMAGE_WIDTH);

        let scale_entry = 12 + 2 * 12;
        let data_at = u32::from_le_bytes([
            bytes[scale_entry + 8],
            bytes[scale_entry + 9],
            bytes[scale_entry + 10],
            bytes[scale_entry + 11],
        ]) as usize;
        assert_eq!(data_at, 10 + 2 + 3 * 12 + 4);
        assert_eq!(&bytes[data_at..data_at + 8], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_ascii_counts_terminator() {
        assert_eq!(TagValue::Ascii("-9".to_string()).count(), 3);
        assert_eq!(TagValue::Short(vec![1, 2]).count(), 2);
    }

    #[test]
    fn test_nodata_text() {
        assert_eq!(format_nodata(-9999.0), "-9999");
        assert_eq!(format_nodata(f64::NAN), "nan");
        assert_eq!(format_nodata(0.5), "0.5");
        assert_eq!(parse_nodata(" -9999 "), Some(-9999.0));
        assert!(parse_nodata("NaN").unwrap().is_nan());
        assert_eq!(parse_nodata("none"), None);
    }

    #[test]
    fn test_header_patched() {
        let mut writer = TiffWriter::new(
            Cursor::new(Vec::new()),
            2,
            1,
            DataType::U8,
            Compression::None,
            255.0,
            ByteOrder::BigEndian,
        )
        .unwrap();
        writer.write_row(&[1.0, 2.0]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(&bytes[0..4], b"MM\x00\x2A");
        // first strip directly follows the header
        assert_eq!(&bytes[8..10], &[1, 2]);
        let ifd = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(ifd, 10);
    }

    #[test]
    fn test_rejects_wrong_row_length_and_extra_rows() {
        let mut writer = TiffWriter::new(
            Cursor::new(Vec::new()),
            2,
            1,
            DataType::I16,
            Compression::Deflate,
            i16::MIN as f64,
            ByteOrder::LittleEndian,
        )
        .unwrap();

        assert!(matches!(
            writer.write_row(&[1.0]),
            Err(Error::RowLength { got: 1, expected: 2 })
        ));
        writer.write_row(&[1.0, 2.0]).unwrap();
        assert!(writer.write_row(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_finish_requires_every_row() {
        let writer = TiffWriter::new(
            Cursor::new(Vec::new()),
            1,
            2,
            DataType::F32,
            Compression::None,
            f64::NAN,
            ByteOrder::LittleEndian,
        )
        .unwrap();
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_lzw_encoding_unsupported() {
        let result = TiffWriter::new(
            Cursor::new(Vec::new()),
            1,
            1,
            DataType::U8,
            Compression::Lzw,
            0.0,
            ByteOrder::LittleEndian,
        );
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
