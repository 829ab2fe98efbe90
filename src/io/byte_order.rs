//! Byte order (endianness) handling
//!
//! Reads and writes the fixed-width values found in TIFF headers and
//! directories. Sample data goes through [`crate::types::DataType`] instead.

use std::io::{self, Result, Write};
use crate::io::SeekableReader;

/// Represents the byte order (endianness) of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (least significant byte first)
    LittleEndian,
    /// Big-endian byte order (most significant byte first)
    BigEndian,
}

impl ByteOrder {
    /// Byte order named by a TIFF header: "II" or "MM"
    pub fn from_tiff_magic(magic: [u8; 2]) -> Option<Self> {
        match &magic {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Reads the first two bytes of a TIFF header
    pub fn detect<R: SeekableReader>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;

        Self::from_tiff_magic(magic).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid byte order magic bytes: {:02X}{:02X}", magic[0], magic[1])
            )
        })
    }

    /// TIFF header marker for this byte order
    pub fn tiff_magic(&self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    /// Creates a handler for this byte order
    pub fn handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndian),
            ByteOrder::BigEndian => Box::new(BigEndian),
        }
    }
}

/// Typed reads and writes in one byte order
pub trait ByteOrderHandler: Send + Sync {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    /// BigTIFF offsets and counts
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32>;

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    fn write_u16(&self, writer: &mut dyn Write, value: u16) -> Result<()>;

    fn write_u32(&self, writer: &mut dyn Write, value: u32) -> Result<()>;

    fn write_f64(&self, writer: &mut dyn Write, value: f64) -> Result<()>;
}

fn read_array<const N: usize>(reader: &mut dyn SeekableReader) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

macro_rules! byte_order_handler {
    ($name:ident, $from:ident, $to:ident) => {
        struct $name;

        impl ByteOrderHandler for $name {
            fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
                Ok(u16::$from(read_array(reader)?))
            }

            fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
                Ok(u32::$from(read_array(reader)?))
            }

            fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
                Ok(u64::$from(read_array(reader)?))
            }

            fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32> {
                Ok(f32::$from(read_array(reader)?))
            }

            fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
                Ok(f64::$from(read_array(reader)?))
            }

            fn write_u16(&self, writer: &mut dyn Write, value: u16) -> Result<()> {
                writer.write_all(&value.$to())
            }

            fn write_u32(&self, writer: &mut dyn Write, value: u32) -> Result<()> {
                writer.write_all(&value.$to())
            }

            fn write_f64(&self, writer: &mut dyn Write, value: f64) -> Result<()> {
                writer.write_all(&value.$to())
            }
        }
    };
}

byte_order_handler!(LittleEndian, from_le_bytes, to_le_bytes);
byte_order_handler!(BigEndian, from_be_bytes, to_be_bytes);
