//! Raster maps in a mapset directory
//!
//! A mapset holds maps as single band GeoTIFF files under `cell/`, their
//! history records under `hist/`, an optional computational region in
//! `WIND.json` and an optional `MASK` map. All reads and writes go through
//! the region: a map is read at the region's rows and columns whatever its
//! own extent, and new maps are created at exactly that size.
//!
//! ```no_run
//! use raster_twice::raster::{Session, WriteOptions};
//!
//! let mut session = Session::open("mapset")?;
//! session.use_map_region("elevation")?;
//!
//! let mut input = session.open_old("elevation")?;
//! let mut output = session.open_new("copy", input.data_type(), &WriteOptions::default())?;
//! let mut row = session.allocate_row_buffer()?;
//! for r in 0..session.window_rows()? {
//!     input.get_row(&mut row, r)?;
//!     output.put_row(&row)?;
//! }
//! output.close()?;
//! # Ok::<(), raster_twice::Error>(())
//! ```

mod reader;
mod region;
mod writer;

pub use reader::RasterReader;
pub use region::Region;
pub use writer::{RasterWriter, WriteOptions};

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::error::{Error, Result};
use crate::formats::tiff::TiffReader;
use crate::history::History;
use crate::types::{DataType, Dimensions};

const CELL_DIR: &str = "cell";
const HIST_DIR: &str = "hist";
const REGION_FILE: &str = "WIND.json";
const MAP_EXTENSION: &str = "tif";

/// Name of the map that masks every read
pub const MASK: &str = "MASK";

/// Checks that `name` can be used for a map
pub fn legal_name(name: &str) -> Result<()> {
    let illegal = name.is_empty()
        || name.starts_with('.')
        || name.chars().any(|c| {
            !c.is_ascii_graphic() || matches!(c, '/' | '\\' | '"' | '\'' | '@' | ',' | '=' | '*')
        });

    if illegal {
        return Err(Error::IllegalName(name.to_string()));
    }
    Ok(())
}

/// An open mapset with its computational region
#[derive(Debug)]
pub struct Session {
    mapset: PathBuf,
    region: Option<Region>,
}

impl Session {
    /// Opens a mapset directory, loading its region if one is saved
    pub fn open<P: AsRef<Path>>(mapset: P) -> Result<Self> {
        let mapset = mapset.as_ref().to_path_buf();
        if !mapset.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mapset {} is not a directory", mapset.display()),
            )));
        }

        let region_path = mapset.join(REGION_FILE);
        let region = if region_path.exists() {
            Some(Region::load(&region_path)?)
        } else {
            None
        };

        let session = Self { mapset, region };
        if session.has_mask() {
            log::info!("Raster MASK present");
        }
        Ok(session)
    }

    pub fn mapset(&self) -> &Path {
        &self.mapset
    }

    /// Short name of the mapset, as recorded in history
    pub fn mapset_name(&self) -> String {
        self.mapset
            .canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.mapset.display().to_string())
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn set_region(&mut self, region: Region) -> Result<()> {
        region.validate()?;
        self.region = Some(region);
        Ok(())
    }

    /// Stores the current region as the mapset's default
    pub fn save_region(&self) -> Result<()> {
        let region = self.region.ok_or(Error::NoRegion)?;
        region.save(&self.mapset.join(REGION_FILE))
    }

    pub fn map_path(&self, name: &str) -> PathBuf {
        self.mapset
            .join(CELL_DIR)
            .join(format!("{}.{}", name, MAP_EXTENSION))
    }

    pub fn history_path(&self, name: &str) -> PathBuf {
        self.mapset.join(HIST_DIR).join(format!("{}.json", name))
    }

    pub fn map_exists(&self, name: &str) -> bool {
        legal_name(name).is_ok() && self.map_path(name).is_file()
    }

    pub fn has_mask(&self) -> bool {
        self.map_exists(MASK)
    }

    fn existing_map(&self, name: &str) -> Result<PathBuf> {
        if !self.map_exists(name) {
            return Err(Error::MapNotFound(name.to_string()));
        }
        Ok(self.map_path(name))
    }

    /// Reads the image directory of a map without decoding any cells
    fn map_info(&self, name: &str) -> Result<(DataType, Dimensions)> {
        let path = self.existing_map(name)?;
        let mut reader = TiffReader::open_with_options(&path, false)?;
        let tiff = reader.read()?;
        let ifd = tiff
            .main_ifd()
            .ok_or_else(|| Error::InvalidFormat(format!("<{}> has no image directory", name)))?;

        let data_type = ifd.data_type().ok_or_else(|| {
            Error::Unsupported(format!("sample format of <{}>", name))
        })?;
        let dims = ifd
            .dimensions()
            .ok_or(Error::MissingTag(crate::formats::tiff::tags::IMAGE_WIDTH))?;
        Ok((data_type, dims))
    }

    /// Storage type of a map
    pub fn map_type(&self, name: &str) -> Result<DataType> {
        Ok(self.map_info(name)?.0)
    }

    /// Rows and columns a map was stored with
    pub fn map_dimensions(&self, name: &str) -> Result<Dimensions> {
        Ok(self.map_info(name)?.1)
    }

    /// Makes the region match a map's own extent
    pub fn use_map_region(&mut self, name: &str) -> Result<Region> {
        let dims = self.map_dimensions(name)?;
        let region = Region::new(dims.height as usize, dims.width as usize);
        self.set_region(region)?;
        log::debug!("region set from <{}>: {}", name, region);
        Ok(region)
    }

    fn active_region(&self) -> Result<Region> {
        self.region.ok_or(Error::NoRegion)
    }

    pub fn window_rows(&self) -> Result<usize> {
        Ok(self.active_region()?.rows)
    }

    pub fn window_cols(&self) -> Result<usize> {
        Ok(self.active_region()?.cols)
    }

    /// A row buffer sized for the region, every cell null
    pub fn allocate_row_buffer(&self) -> Result<Vec<Option<f64>>> {
        Ok(vec![None; self.window_cols()?])
    }

    /// Opens an existing map for reading through the region and the mask
    pub fn open_old(&self, name: &str) -> Result<RasterReader> {
        let region = self.active_region()?;
        let path = self.existing_map(name)?;
        let reader = RasterReader::open(name, &path, region)?;

        if name != MASK && self.has_mask() {
            let mask = RasterReader::open(MASK, &self.map_path(MASK), region)?;
            return Ok(reader.with_mask(mask));
        }
        Ok(reader)
    }

    /// Creates a map at the region's size
    pub fn open_new(
        &self,
        name: &str,
        data_type: DataType,
        options: &WriteOptions,
    ) -> Result<RasterWriter> {
        legal_name(name)?;
        let region = self.active_region()?;

        let final_path = self.map_path(name);
        if final_path.exists() {
            if !options.overwrite {
                return Err(Error::MapExists(name.to_string()));
            }
            log::warn!("Raster map <{}> will be overwritten", name);
        }

        let cell_dir = self.mapset.join(CELL_DIR);
        fs::create_dir_all(&cell_dir)?;
        let temp_path = cell_dir.join(format!(".{}.{}.tmp", name, std::process::id()));

        RasterWriter::create(name, final_path, temp_path, data_type, region, options)
    }

    /// Stores the history record of a map
    pub fn write_history(&self, name: &str, history: &History) -> Result<()> {
        self.existing_map(name)?;

        let path = self.history_path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut out = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut out, history)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    /// Loads the history record of a map
    pub fn read_history(&self, name: &str) -> Result<History> {
        self.existing_map(name)?;
        let file = File::open(self.history_path(name))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
