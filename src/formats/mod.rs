//! Raster storage formats

pub mod tiff;
