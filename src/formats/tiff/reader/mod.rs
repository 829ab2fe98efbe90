//! TIFF reader modules

pub mod tags;
pub mod blocks;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use memmap2::Mmap;
use crate::error::{Error, Result};
use crate::io::ByteOrder;
use crate::formats::tiff::{Tiff, IFD, IFDEntry, TIFF_MAGIC, BIGTIFF_MAGIC};

use self::tags::TagReader;

pub use self::blocks::{BlockLayout, RowDecoder};

/// Upper bound on directories followed before the chain is declared corrupt
const MAX_IFDS: usize = 1000;

/// TIFF file reader
pub struct TiffReader {
    reader: BufReader<File>,
    mmap: Option<Mmap>,
    byte_order: ByteOrder,
    is_big_tiff: bool,
}

impl TiffReader {
    /// Opens a TIFF file for reading, memory-mapping it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, true)
    }

    /// Opens a TIFF file with custom options
    ///
    /// # Arguments
    /// * `path` - Path to the TIFF file
    /// * `use_mmap` - Whether to read block data through a memory map
    pub fn open_with_options<P: AsRef<Path>>(path: P, use_mmap: bool) -> Result<Self> {
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        let byte_order = ByteOrder::detect(&mut reader)?;
        let handler = byte_order.handler();

        let magic = handler.read_u16(&mut reader)?;

        let is_big_tiff = match magic {
            TIFF_MAGIC => false,
            BIGTIFF_MAGIC => true,
            _ => return Err(Error::InvalidMagic(magic)),
        };

        if is_big_tiff {
            let offset_size = handler.read_u16(&mut reader)?;
            if offset_size != 8 {
                return Err(Error::InvalidFormat(
                    format!("Invalid BigTIFF offset size: {}", offset_size)
                ));
            }
            let _reserved = handler.read_u16(&mut reader)?;
        }

        let mmap = if use_mmap {
            let file_for_mmap = File::open(&path)?;
            let mmap = unsafe { Mmap::map(&file_for_mmap)? };

            // Rows are consumed top to bottom exactly once.
            #[cfg(unix)]
            unsafe {
                libc::madvise(
                    mmap.as_ptr() as *mut libc::c_void,
                    mmap.len(),
                    libc::MADV_SEQUENTIAL,
                );
            }

            Some(mmap)
        } else {
            None
        };

        Ok(Self {
            reader,
            mmap,
            byte_order,
            is_big_tiff,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Reads the chain of directories
    pub fn read(&mut self) -> Result<Tiff> {
        let mut tiff = Tiff::new(self.is_big_tiff, self.byte_order);
        let mut next_ifd_offset = self.read_first_ifd_offset()?;

        while next_ifd_offset != 0 {
            if tiff.ifd_count() >= MAX_IFDS {
                return Err(Error::InvalidFormat("Too many IFDs".to_string()));
            }

            let (ifd, next) = self.read_ifd(tiff.ifd_count(), next_ifd_offset)?;
            tiff.add_ifd(ifd);
            next_ifd_offset = next;
        }

        Ok(tiff)
    }

    /// Reads the header's pointer to the first directory
    fn read_first_ifd_offset(&mut self) -> Result<u64> {
        let header_len = if self.is_big_tiff { 8 } else { 4 };
        self.reader.seek(SeekFrom::Start(header_len))?;
        self.read_offset()
    }

    fn read_offset(&mut self) -> Result<u64> {
        let handler = self.byte_order.handler();
        if self.is_big_tiff {
            Ok(handler.read_u64(&mut self.reader)?)
        } else {
            Ok(handler.read_u32(&mut self.reader)? as u64)
        }
    }

    /// Reads one directory and the offset of the one after it
    fn read_ifd(&mut self, number: usize, offset: u64) -> Result<(IFD, u64)> {
        let handler = self.byte_order.handler();
        self.reader.seek(SeekFrom::Start(offset))?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(&mut self.reader)?
        } else {
            handler.read_u16(&mut self.reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        let field_len = if self.is_big_tiff { 8 } else { 4 };

        for _ in 0..entry_count {
            let tag = handler.read_u16(&mut self.reader)?;
            let field_type = handler.read_u16(&mut self.reader)?;

            let count = if self.is_big_tiff {
                handler.read_u64(&mut self.reader)?
            } else {
                handler.read_u32(&mut self.reader)? as u64
            };

            let mut raw = [0u8; 8];
            self.reader.read_exact(&mut raw[..field_len])?;

            ifd.add_entry(IFDEntry::parse(
                tag,
                field_type,
                count,
                raw,
                self.is_big_tiff,
                self.byte_order,
            ));
        }

        let next = self.read_offset()?;
        Ok((ifd, next))
    }

    fn tag_reader<'a>(
        reader: &'a mut BufReader<File>,
        handler: &'a dyn crate::io::ByteOrderHandler,
        is_big_tiff: bool,
    ) -> TagReader<'a> {
        TagReader::new(reader, handler, is_big_tiff)
    }

    /// Reads tag values as f64 array
    pub fn read_tag_doubles(&mut self, entry: &IFDEntry) -> Result<Vec<f64>> {
        let handler = self.byte_order.handler();
        Self::tag_reader(&mut self.reader, &*handler, self.is_big_tiff).read_doubles(entry)
    }

    /// Reads tag values as u16 array
    pub fn read_tag_u16s(&mut self, entry: &IFDEntry) -> Result<Vec<u16>> {
        let handler = self.byte_order.handler();
        Self::tag_reader(&mut self.reader, &*handler, self.is_big_tiff).read_u16s(entry)
    }

    /// Reads unsigned integer tag values widened to u64
    pub fn read_tag_u64s(&mut self, entry: &IFDEntry) -> Result<Vec<u64>> {
        let handler = self.byte_order.handler();
        Self::tag_reader(&mut self.reader, &*handler, self.is_big_tiff).read_u64s(entry)
    }

    /// Reads ASCII string from tag
    pub fn read_tag_ascii(&mut self, entry: &IFDEntry) -> Result<String> {
        let handler = self.byte_order.handler();
        Self::tag_reader(&mut self.reader, &*handler, self.is_big_tiff).read_ascii(entry)
    }

    /// Reads the stored (still compressed) bytes of one strip or tile
    pub fn read_block_bytes(&mut self, offset: u64, byte_count: u64) -> Result<Vec<u8>> {
        if let Some(ref mmap) = self.mmap {
            let start = offset as usize;
            let end = start.checked_add(byte_count as usize)
                .filter(|&end| end <= mmap.len())
                .ok_or_else(|| Error::InvalidFormat(format!(
                    "Block at {} with {} bytes runs past end of file ({} bytes)",
                    offset, byte_count, mmap.len()
                )))?;
            return Ok(mmap[start..end].to_vec());
        }

        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
