//! LZW decompression
//!
//! TIFF LZW packs codes most-significant-bit first and widens the code one
//! entry early: 9 bits until the table reaches 511 entries, then 10, 11, 12.

use crate::error::{Error, Result};

const CLEAR_CODE: usize = 256;
const EOI_CODE: usize = 257;
const FIRST_CODE: usize = 258;
const MAX_CODE_BITS: u8 = 12;

/// Decompresses LZW compressed data
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    LzwDecoder::new().decode(data)
}

struct LzwDecoder {
    /// Indexed by code; the clear and end-of-information slots stay empty
    dictionary: Vec<Vec<u8>>,
}

impl LzwDecoder {
    fn new() -> Self {
        let mut dictionary = Vec::with_capacity(1 << MAX_CODE_BITS);
        dictionary.extend((0..=255u8).map(|b| vec![b]));
        dictionary.push(Vec::new());
        dictionary.push(Vec::new());
        Self { dictionary }
    }

    fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() * 2);
        let mut reader = BitReader::new(data);
        let mut code_size = 9;
        let mut previous: Option<usize> = None;

        while let Some(code) = reader.read_bits(code_size) {
            let code = code as usize;

            if code == EOI_CODE {
                break;
            }

            if code == CLEAR_CODE {
                self.dictionary.truncate(FIRST_CODE);
                code_size = 9;
                previous = None;
                continue;
            }

            let entry = self.entry_for(code, previous)?;
            output.extend_from_slice(&entry);

            if let Some(prev) = previous {
                if self.dictionary.len() < (1 << MAX_CODE_BITS) {
                    let mut grown = self.dictionary[prev].clone();
                    grown.push(entry[0]);
                    self.dictionary.push(grown);
                }
            }

            if self.dictionary.len() + 1 >= (1 << code_size) && code_size < MAX_CODE_BITS {
                code_size += 1;
            }

            previous = Some(code);
        }

        Ok(output)
    }

    fn entry_for(&self, code: usize, previous: Option<usize>) -> Result<Vec<u8>> {
        if code < self.dictionary.len() {
            return Ok(self.dictionary[code].clone());
        }

        match previous {
            Some(prev) if code == self.dictionary.len() => {
                let mut entry = self.dictionary[prev].clone();
                entry.push(entry[0]);
                Ok(entry)
            }
            _ => Err(Error::InvalidFormat(format!("Invalid LZW code: {}", code))),
        }
    }
}

/// Reads MSB-first variable-length codes from a byte stream
struct BitReader<'a> {
    data: &'a [u8],
    byte_index: usize,
    buffer: u32,
    buffered_bits: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_index: 0,
            buffer: 0,
            buffered_bits: 0,
        }
    }

    fn read_bits(&mut self, count: u8) -> Option<u16> {
        while self.buffered_bits < count {
            let byte = *self.data.get(self.byte_index)?;
            self.byte_index += 1;
            self.buffer = (self.buffer << 8) | byte as u32;
            self.buffered_bits += 8;
        }

        self.buffered_bits -= count;
        let code = (self.buffer >> self.buffered_bits) & ((1 << count) - 1);
        self.buffer &= (1 << self.buffered_bits) - 1;
        Some(code as u16)
    }
}

/// Encodes `data` the way TIFF writers do, for building compressed
/// fixtures. Inputs stay short enough that the table never fills.
#[cfg(test)]
pub(crate) fn compress(data: &[u8]) -> Vec<u8> {
    use std::collections::HashMap;

    let mut writer = BitWriter::default();
    let mut table: HashMap<(usize, u8), usize> = HashMap::new();
    let mut next_code = FIRST_CODE;
    let mut code_size = 9;

    writer.write(CLEAR_CODE, code_size);
    if let Some((&first, rest)) = data.split_first() {
        let mut current = first as usize;
        for &byte in rest {
            if let Some(&code) = table.get(&(current, byte)) {
                current = code;
                continue;
            }

            writer.write(current, code_size);
            table.insert((current, byte), next_code);
            next_code += 1;
            assert!(next_code < (1 << MAX_CODE_BITS) - 2, "LZW table full");
            if next_code >= (1 << code_size) && code_size < MAX_CODE_BITS {
                code_size += 1;
            }
            current = byte as usize;
        }

        // the decoder adds one more entry after the last code
        writer.write(current, code_size);
        next_code += 1;
        if next_code >= (1 << code_size) && code_size < MAX_CODE_BITS {
            code_size += 1;
        }
    }
    writer.write(EOI_CODE, code_size);
    writer.finish()
}

/// Packs variable-length codes MSB-first
#[cfg(test)]
#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    buffer: u32,
    buffered_bits: u8,
}

#[cfg(test)]
impl BitWriter {
    fn write(&mut self, code: usize, count: u8) {
        self.buffer = (self.buffer << count) | code as u32;
        self.buffered_bits += count;
        while self.buffered_bits >= 8 {
            self.buffered_bits -= 8;
            self.out.push((self.buffer >> self.buffered_bits) as u8);
            self.buffer &= (1 << self.buffered_bits) - 1;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.buffered_bits > 0 {
            self.out.push((self.buffer << (8 - self.buffered_bits)) as u8);
        }
        self.out
    }
}
