//! PackBits codec
//!
//! PackBits is a simple run-length encoding scheme used in TIFF files.

use crate::error::{Error, Result};

/// Decompresses PackBits compressed data
///
/// PackBits encoding:
/// - If header >= 0: copy next (header + 1) literal bytes
/// - If header < 0 and != -128: repeat next byte (1 - header) times
/// - If header == -128: no operation (skip)
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let header = data[pos] as i8;
        pos += 1;

        match header {
            -128 => continue,

            0..=127 => {
                let count = (header as usize) + 1;

                if pos + count > data.len() {
                    return Err(Error::InvalidFormat(
                        "PackBits: Insufficient literal bytes".to_string()
                    ));
                }

                output.extend_from_slice(&data[pos..pos + count]);
                pos += count;
            }

            -127..=-1 => {
                if pos >= data.len() {
                    return Err(Error::InvalidFormat(
                        "PackBits: Missing run byte".to_string()
                    ));
                }

                let count = (1 - header as isize) as usize;
                let byte = data[pos];
                pos += 1;

                output.resize(output.len() + count, byte);
            }
        }
    }

    Ok(output)
}

/// Compresses data with PackBits
///
/// Runs of three or more equal bytes become run packets (up to 128 bytes);
/// everything else is gathered into literal packets of up to 128 bytes.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() + data.len() / 128 + 1);
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < data.len() {
        let run = run_length(&data[pos..]);

        if run >= 3 {
            flush_literals(&mut output, &data[literal_start..pos]);
            output.push((1 - run as i16) as i8 as u8);
            output.push(data[pos]);
            pos += run;
            literal_start = pos;
        } else {
            pos += 1;
            if pos - literal_start == 128 {
                flush_literals(&mut output, &data[literal_start..pos]);
                literal_start = pos;
            }
        }
    }

    flush_literals(&mut output, &data[literal_start..]);
    output
}

fn run_length(data: &[u8]) -> usize {
    let first = data[0];
    data.iter().take(128).take_while(|&&b| b == first).count()
}

fn flush_literals(output: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(128) {
        output.push((chunk.len() - 1) as u8);
        output.extend_from_slice(chunk);
    }
}
