//! Error types for raster-twice

use std::io;
use thiserror::Error;

/// Result type for raster-twice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading, transforming or writing rasters
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid TIFF format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid TIFF magic number
    #[error("Invalid TIFF magic number: {0}")]
    InvalidMagic(u16),

    /// Missing required tag
    #[error("Missing required tag: {0}")]
    MissingTag(u16),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// The named raster map does not exist in the mapset
    #[error("Raster map <{0}> not found")]
    MapNotFound(String),

    /// The named raster map exists and overwriting was not requested
    #[error("Raster map <{0}> already exists")]
    MapExists(String),

    /// The name cannot be used for a raster map
    #[error("<{0}> is an illegal map name")]
    IllegalName(String),

    /// No computational region has been set for the session
    #[error("Computational region is not set")]
    NoRegion,

    /// Region definition is unusable
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// A row buffer does not match the region width
    #[error("Row has {got} cells, expected {expected}")]
    RowLength { got: usize, expected: usize },

    /// An output map was closed before every region row was written
    #[error("Raster map <{name}> is incomplete: {written} of {expected} rows written")]
    IncompleteMap {
        name: String,
        written: usize,
        expected: usize,
    },

    /// Region or history JSON could not be encoded or decoded
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}
