//! Writing new maps row by row

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::formats::tiff::{GeoInfo, TiffWriter};
use crate::io::ByteOrder;
use crate::types::DataType;
use super::{RasterReader, Region};

/// How a new map is created
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Replace an existing map of the same name
    pub overwrite: bool,
    pub compression: Compression,
    pub byte_order: ByteOrder,
    /// Null sentinel to store; the type's default when unset or unusable
    pub nodata: Option<f64>,
    pub geo: Option<GeoInfo>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            compression: Compression::Deflate,
            byte_order: ByteOrder::LittleEndian,
            nodata: None,
            geo: None,
        }
    }
}

impl WriteOptions {
    /// Takes the null sentinel and georeferencing of `reader` where none
    /// were given
    pub fn inherit(mut self, reader: &RasterReader) -> Self {
        if self.nodata.is_none() {
            self.nodata = reader.nodata();
        }
        if self.geo.is_none() {
            self.geo = reader.window_geo_info();
        }
        self
    }
}

/// Picks the sentinel a new map stores for null cells
fn resolve_nodata(data_type: DataType, requested: Option<f64>) -> f64 {
    let Some(value) = requested else {
        return data_type.default_nodata();
    };

    let (min, max) = data_type.range();
    let fits = if data_type.is_float() {
        !value.is_finite() || (min..=max).contains(&value)
    } else {
        value.fract() == 0.0 && (min..=max).contains(&value)
    };

    if fits {
        // the sentinel must compare equal to what is actually stored
        if data_type == DataType::F32 {
            value as f32 as f64
        } else {
            value
        }
    } else {
        let fallback = data_type.default_nodata();
        log::warn!(
            "null value {} cannot be stored as {}, using {}",
            value, data_type, fallback
        );
        fallback
    }
}

/// A map being written. Nothing appears under the map's name until
/// [`RasterWriter::close`] succeeds.
pub struct RasterWriter {
    name: String,
    final_path: PathBuf,
    temp_path: PathBuf,
    tiff: Option<TiffWriter<BufWriter<File>>>,
    data_type: DataType,
    nodata: f64,
    region: Region,
    rows_written: usize,
    /// Values written that equal the null sentinel and so read back as null
    null_collisions: u64,
    native: Vec<f64>,
}

impl RasterWriter {
    pub(crate) fn create(
        name: &str,
        final_path: PathBuf,
        temp_path: PathBuf,
        data_type: DataType,
        region: Region,
        options: &WriteOptions,
    ) -> Result<Self> {
        let nodata = resolve_nodata(data_type, options.nodata);
        let file = File::create(&temp_path)?;

        let created = TiffWriter::new(
            BufWriter::new(file),
            region.cols as u32,
            region.rows as u32,
            data_type,
            options.compression,
            nodata,
            options.byte_order,
        );
        let mut tiff = match created {
            Ok(tiff) => tiff,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        if let Some(ref geo) = options.geo {
            geo.write_tags(&mut tiff);
        }

        log::debug!(
            "creating <{}> as {} {}, {} compression",
            name, region, data_type, options.compression.name()
        );

        Ok(Self {
            name: name.to_string(),
            final_path,
            temp_path,
            tiff: Some(tiff),
            data_type,
            nodata,
            region,
            rows_written: 0,
            null_collisions: 0,
            native: Vec::with_capacity(region.cols),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Non-null cells so far that were stored as the null sentinel
    pub fn null_collisions(&self) -> u64 {
        self.null_collisions
    }

    /// Appends the next row, converting values to the map's type
    pub fn put_row(&mut self, buf: &[Option<f64>]) -> Result<()> {
        if buf.len() != self.region.cols {
            return Err(Error::RowLength {
                got: buf.len(),
                expected: self.region.cols,
            });
        }
        if self.rows_written >= self.region.rows {
            return Err(Error::OutOfBounds(format!(
                "<{}> already has all {} rows",
                self.name, self.region.rows
            )));
        }

        self.native.clear();
        for cell in buf {
            let value = match *cell {
                Some(v) if !v.is_nan() => {
                    let native = self.data_type.to_native(v, self.nodata);
                    if native == self.nodata {
                        self.null_collisions += 1;
                    }
                    native
                }
                _ => self.nodata,
            };
            self.native.push(value);
        }

        let tiff = self
            .tiff
            .as_mut()
            .ok_or_else(|| Error::InvalidFormat(format!("<{}> is closed", self.name)))?;
        tiff.write_row(&self.native)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Finishes the file and moves it into place under the map's name
    pub fn close(mut self) -> Result<()> {
        if self.rows_written < self.region.rows {
            return Err(Error::IncompleteMap {
                name: self.name.clone(),
                written: self.rows_written,
                expected: self.region.rows,
            });
        }

        let tiff = self
            .tiff
            .take()
            .ok_or_else(|| Error::InvalidFormat(format!("<{}> is closed", self.name)))?;
        let mut out = tiff.finish()?;
        out.flush()?;
        drop(out);

        fs::rename(&self.temp_path, &self.final_path)?;
        if self.null_collisions > 0 {
            log::warn!(
                "{} cells of <{}> equal its null value {} and read back as null",
                self.null_collisions, self.name, self.nodata
            );
        }
        log::debug!("wrote <{}> to {}", self.name, self.final_path.display());
        Ok(())
    }
}

impl Drop for RasterWriter {
    fn drop(&mut self) {
        // the file handle goes first so the temporary file can be removed
        self.tiff = None;
        if self.temp_path.exists() && fs::remove_file(&self.temp_path).is_ok() {
            log::debug!("discarded unfinished <{}>", self.name);
        }
    }
}
