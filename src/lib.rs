//! raster-twice - multiply every cell of a raster map by two
//!
//! Maps live in a mapset directory as single band GeoTIFF files. The tool
//! reads the input map row by row through the computational region, doubles
//! every non-null cell, writes the result in the input's own storage type
//! and records a history entry for the new map.
//!
//! # Examples
//!
//! ```no_run
//! use raster_twice::raster::{Session, WriteOptions};
//! use raster_twice::twice;
//!
//! let mut session = Session::open("/data/mapset")?;
//! let summary = twice::run(
//!     &mut session,
//!     "elevation",
//!     "elevation_x2",
//!     &WriteOptions::default(),
//!     "raster-twice input=elevation output=elevation_x2",
//! )?;
//! println!("{} rows, {} null cells", summary.rows, summary.null_cells);
//! # Ok::<(), raster_twice::Error>(())
//! ```

pub mod io;
pub mod error;
pub mod types;
pub mod formats;
pub mod compression;
pub mod raster;
pub mod history;
pub mod progress;
pub mod twice;
pub mod cli;

pub use error::{Error, Result};
pub use types::{DataType, Dimensions};
pub use formats::tiff::{
    Tiff, TiffReader, TiffWriter, IFD, IFDEntry, GeoInfo,
    tags, TIFF_MAGIC, BIGTIFF_MAGIC
};
pub use io::{ByteOrder, SeekableReader, SeekableWriter};
pub use raster::{Region, Session, RasterReader, RasterWriter, WriteOptions};
pub use history::History;
pub use twice::{times_two, RunSummary};
