//! Tag value reading operations

use std::io::{Cursor, Read, SeekFrom};
use crate::error::{Error, Result};
use crate::io::{ByteOrderHandler, SeekableReader};
use crate::formats::tiff::IFDEntry;
use crate::formats::tiff::tags::field_types;

/// Largest out-of-line tag payload the reader will allocate for
const MAX_TAG_BYTES: u64 = 256 * 1024 * 1024;

/// Handles reading tag values from TIFF files
pub struct TagReader<'a> {
    reader: &'a mut dyn SeekableReader,
    handler: &'a dyn ByteOrderHandler,
    is_big_tiff: bool,
}

impl<'a> TagReader<'a> {
    pub fn new(
        reader: &'a mut dyn SeekableReader,
        handler: &'a dyn ByteOrderHandler,
        is_big_tiff: bool,
    ) -> Self {
        Self {
            reader,
            handler,
            is_big_tiff,
        }
    }

    /// Reads DOUBLE or FLOAT tag values as f64
    pub fn read_doubles(&mut self, entry: &IFDEntry) -> Result<Vec<f64>> {
        let mut values = self.values(entry)?;
        let mut out = Vec::with_capacity(entry.count as usize);

        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::DOUBLE => self.handler.read_f64(&mut values)?,
                field_types::FLOAT => self.handler.read_f32(&mut values)? as f64,
                _ => return Err(self.type_mismatch(entry, "DOUBLE or FLOAT")),
            };
            out.push(value);
        }

        Ok(out)
    }

    /// Reads SHORT tag values
    pub fn read_u16s(&mut self, entry: &IFDEntry) -> Result<Vec<u16>> {
        if entry.field_type != field_types::SHORT {
            return Err(self.type_mismatch(entry, "SHORT"));
        }

        let mut values = self.values(entry)?;
        let mut out = Vec::with_capacity(entry.count as usize);

        for _ in 0..entry.count {
            out.push(self.handler.read_u16(&mut values)?);
        }

        Ok(out)
    }

    /// Reads any unsigned integer tag (BYTE, SHORT, LONG, LONG8, IFD8)
    /// widened to u64, as used for strip and tile offsets
    pub fn read_u64s(&mut self, entry: &IFDEntry) -> Result<Vec<u64>> {
        let mut values = self.values(entry)?;
        let mut out = Vec::with_capacity(entry.count as usize);

        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::BYTE => {
                    let mut byte = [0u8; 1];
                    values.read_exact(&mut byte)?;
                    byte[0] as u64
                }
                field_types::SHORT => self.handler.read_u16(&mut values)? as u64,
                field_types::LONG => self.handler.read_u32(&mut values)? as u64,
                field_types::LONG8 | field_types::IFD8 => self.handler.read_u64(&mut values)?,
                _ => return Err(self.type_mismatch(entry, "an unsigned integer type")),
            };
            out.push(value);
        }

        Ok(out)
    }

    /// Reads ASCII string from tag
    pub fn read_ascii(&mut self, entry: &IFDEntry) -> Result<String> {
        let bytes = self.values(entry)?.into_inner();
        let s = String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .to_string();
        Ok(s)
    }

    fn type_mismatch(&self, entry: &IFDEntry, expected: &str) -> Error {
        Error::InvalidFormat(format!(
            "Tag {} expected {}, found type {}",
            entry.tag, expected, entry.field_type
        ))
    }

    /// Gathers the raw bytes of the tag's values, inline or out of line
    fn values(&mut self, entry: &IFDEntry) -> Result<Cursor<Vec<u8>>> {
        let total = entry.field_type_size() as u64 * entry.count;

        if entry.is_inline(self.is_big_tiff) {
            return Ok(Cursor::new(entry.inline[..total as usize].to_vec()));
        }

        if total > MAX_TAG_BYTES {
            return Err(Error::InvalidFormat(format!(
                "Tag {} claims {} bytes of values",
                entry.tag, total
            )));
        }

        let mut bytes = vec![0u8; total as usize];
        self.reader.seek(SeekFrom::Start(entry.value_offset))?;
        self.reader.read_exact(&mut bytes)?;
        Ok(Cursor::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteOrder;

    fn entry_with_inline(tag: u16, field_type: u16, count: u64, raw: [u8; 8]) -> IFDEntry {
        let mut entry = IFDEntry::new(tag, field_type, count, 0);
        entry.inline = raw;
        entry
    }

    #[test]
    fn test_read_u16s_inline() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        let handler = ByteOrder::LittleEndian.handler();

        let entry = IFDEntry::new(256, field_types::SHORT, 2, 0x00020001);
        let mut tag_reader = TagReader::new(&mut reader, &*handler, false);

        assert_eq!(tag_reader.read_u16s(&entry).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_read_u16s_inline_big_endian() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        let handler = ByteOrder::BigEndian.handler();

        let entry = entry_with_inline(256, field_types::SHORT, 2, [0x00, 0x01, 0x00, 0x02, 0, 0, 0, 0]);
        let mut tag_reader = TagReader::new(&mut reader, &*handler, false);

        assert_eq!(tag_reader.read_u16s(&entry).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_read_u64s_widens_longs() {
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&200u32.to_le_bytes());
        data.extend_from_slice(&300u32.to_le_bytes());
        let mut reader = Cursor::new(data);
        let handler = ByteOrder::LittleEndian.handler();

        let entry = IFDEntry::new(273, field_types::LONG, 3, 4);
        let mut tag_reader = TagReader::new(&mut reader, &*handler, false);

        assert_eq!(tag_reader.read_u64s(&entry).unwrap(), vec![100, 200, 300]);
    }

    #[test]
    fn test_read_u64s_rejects_doubles() {
        let mut reader = Cursor::new(vec![0u8; 32]);
        let handler = ByteOrder::LittleEndian.handler();

        let entry = IFDEntry::new(273, field_types::DOUBLE, 2, 0);
        let mut tag_reader = TagReader::new(&mut reader, &*handler, false);

        assert!(tag_reader.read_u64s(&entry).is_err());
    }

    #[test]
    fn test_read_ascii_inline() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        let handler = ByteOrder::LittleEndian.handler();

        let entry = entry_with_inline(42113, field_types::ASCII, 3, [b'-', b'9', 0, 0, 0, 0, 0, 0]);
        let mut tag_reader = TagReader::new(&mut reader, &*handler, false);

        assert_eq!(tag_reader.read_ascii(&entry).unwrap(), "-9");
    }

    #[test]
    fn test_read_doubles_non_inline() {
        let mut data = vec![];
        data.extend_from_slice(&0f64.to_le_bytes());
        data.extend_from_slice(&1f64.to_le_bytes());
        data.extend_from_slice(&2.5f64.to_le_bytes());

        let mut reader = Cursor::new(data);
        let handler = ByteOrder::LittleEndian.handler();

        let entry = IFDEntry::new(33550, field_types::DOUBLE, 3, 0);
        let mut tag_reader = TagReader::new(&mut reader, &*handler, false);

        assert_eq!(tag_reader.read_doubles(&entry).unwrap(), vec![0.0, 1.0, 2.5]);
    }

    #[test]
    fn test_read_double_inline_bigtiff() {
        let mut reader = Cursor::new(Vec::new());
        let handler = ByteOrder::LittleEndian.handler();

        let entry = entry_with_inline(33550, field_types::DOUBLE, 1, 0.5f64.to_le_bytes());
        let mut tag_reader = TagReader::new(&mut reader, &*handler, true);

        assert_eq!(tag_reader.read_doubles(&entry).unwrap(), vec![0.5]);
    }
}
