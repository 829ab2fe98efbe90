//! JPEG decompression for TIFF blocks
//!
//! Only self-contained JPEG streams are handled; blocks that rely on a
//! shared `JPEGTables` tag fail to decode.

use crate::error::{Error, Result};

/// Decompresses one JPEG compressed block into 8-bit samples
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = jpeg_decoder::Decoder::new(data);

    let pixels = decoder
        .decode()
        .map_err(|e| Error::InvalidFormat(format!("JPEG error: {}", e)))?;

    match decoder.info() {
        Some(info) if info.pixel_format != jpeg_decoder::PixelFormat::L8 => Err(Error::Unsupported(
            format!("JPEG pixel format {:?} in a single band raster", info.pixel_format),
        )),
        _ => Ok(pixels),
    }
}
