//! Computational region

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Row and column window that every map is read and written at
///
/// Offsets are in cells relative to each map's origin and may be
/// negative; cells of the window outside a map read as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub row_offset: i64,
    #[serde(default)]
    pub col_offset: i64,
}

impl Region {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_offset: 0,
            col_offset: 0,
        }
    }

    pub fn with_offset(mut self, row_offset: i64, col_offset: i64) -> Self {
        self.row_offset = row_offset;
        self.col_offset = col_offset;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::InvalidRegion(format!(
                "{} rows by {} columns",
                self.rows, self.cols
            )));
        }
        if self.rows > u32::MAX as usize || self.cols > u32::MAX as usize {
            return Err(Error::InvalidRegion(format!(
                "{} rows by {} columns exceeds the writable size",
                self.rows, self.cols
            )));
        }
        Ok(())
    }

    /// Reads a region file and checks it
    pub fn load(path: &Path) -> Result<Self> {
        let region: Region = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        region.validate()?;
        Ok(region)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    /// Row of a `height`-row map under window row `row`, if there is one
    pub fn map_row(&self, row: usize, height: u64) -> Option<u64> {
        shift(row, self.row_offset, height)
    }

    /// Column of a `width`-column map under window column `col`
    pub fn map_col(&self, col: usize, width: u64) -> Option<u64> {
        shift(col, self.col_offset, width)
    }
}

fn shift(index: usize, offset: i64, extent: u64) -> Option<u64> {
    let shifted = i64::try_from(index).ok()?.checked_add(offset)?;
    u64::try_from(shifted).ok().filter(|&cell| cell < extent)
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows x {} cols at ({}, {})",
            self.rows, self.cols, self.row_offset, self.col_offset
        )
    }
}
