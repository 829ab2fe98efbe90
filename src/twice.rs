//! Doubling every cell of a raster map
//!
//! Rows stream from the input map to the output map one at a time. Null
//! cells stay null; every other cell is multiplied by two and stored in the
//! input's own type.

use crate::error::Result;
use crate::history::History;
use crate::progress::Percent;
use crate::raster::{Session, WriteOptions};
use crate::types::DataType;

/// What the tool does, as shown in help and history
pub const DESCRIPTION: &str = "Multiply values in a raster map by two";

pub const KEYWORDS: [&str; 3] = ["raster", "algebra", "multiplication"];

pub fn times_two(value: f64) -> f64 {
    2.0 * value
}

/// Doubles one row, leaving null cells null
pub fn process_row(input: &[Option<f64>], output: &mut [Option<f64>]) {
    for (out, cell) in output.iter_mut().zip(input) {
        *out = cell.map(times_two);
    }
}

/// Null value for a doubled map that no doubled cell can land on
///
/// Doubled integers are even until they saturate, so an odd sentinel is
/// only reached by saturation, which the writer steps back from. Floats
/// fall back to NaN.
fn doubled_nodata(data_type: DataType, requested: Option<f64>) -> Option<f64> {
    let current = requested.unwrap_or_else(|| data_type.default_nodata());

    let safe = if data_type.is_float() {
        if current.is_nan() {
            return requested;
        }
        f64::NAN
    } else {
        if current.fract() != 0.0 || current % 2.0 != 0.0 {
            return requested;
        }
        let (min, max) = data_type.range();
        if min < 0.0 {
            min + 1.0
        } else {
            max
        }
    };

    if let Some(value) = requested {
        log::warn!(
            "doubled {} cells can equal the null value {}, writing nulls as {}",
            data_type, value, safe
        );
    }
    Some(safe)
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub cols: usize,
    pub null_cells: u64,
    pub data_type: DataType,
}

/// Writes `output` as twice `input` and records its history
///
/// Without a saved region the input's own extent is used.
pub fn run(
    session: &mut Session,
    input: &str,
    output: &str,
    options: &WriteOptions,
    command_line: &str,
) -> Result<RunSummary> {
    if session.region().is_none() {
        session.use_map_region(input)?;
        log::debug!("no region set, using the extent of <{}>", input);
    }

    let mut reader = session.open_old(input)?;
    let data_type = session.map_type(input)?;

    let mut write_options = options.clone().inherit(&reader);
    write_options.nodata = doubled_nodata(data_type, write_options.nodata);
    let mut writer = session.open_new(output, data_type, &write_options)?;

    let mut input_row = session.allocate_row_buffer()?;
    let mut output_row = session.allocate_row_buffer()?;
    let nrows = session.window_rows()?;
    let ncols = session.window_cols()?;

    log::debug!("doubling <{}> into <{}>: {} rows, {} columns", input, output, nrows, ncols);

    let mut progress = Percent::new(nrows, 10);
    let mut null_cells = 0u64;

    for row in 0..nrows {
        progress.update(row);

        reader.get_row(&mut input_row, row)?;
        process_row(&input_row, &mut output_row);
        null_cells += output_row.iter().filter(|cell| cell.is_none()).count() as u64;
        writer.put_row(&output_row)?;
    }
    progress.finish();

    drop(reader);
    writer.close()?;

    let mut history = History::short(session, output, "raster");
    history.add_data_source(&format!("raster map <{}>", input));
    history.set_description(&format!("generated by {}", env!("CARGO_PKG_NAME")));
    history.command(command_line);
    session.write_history(output, &history)?;

    Ok(RunSummary {
        rows: nrows,
        cols: ncols,
        null_cells,
        data_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};
    use crate::error::Error;
    use crate::formats::tiff::geotiff::{GeoInfo, TiePoint};
    use crate::raster::{Region, MASK};

    fn mapset() -> (TempDir, Session) {
        let dir = tempdir().unwrap();
        let session = Session::open(dir.path()).unwrap();
        (dir, session)
    }

    fn write_map(dir: &TempDir, name: &str, data_type: DataType, rows: &[Vec<Option<f64>>], options: WriteOptions) {
        let mut session = Session::open(dir.path()).unwrap();
        session.set_region(Region::new(rows.len(), rows[0].len())).unwrap();

        let mut writer = session.open_new(name, data_type, &options).unwrap();
        for row in rows {
            writer.put_row(row).unwrap();
        }
        writer.close().unwrap();
    }

    fn read_map(dir: &TempDir, name: &str) -> Vec<Vec<Option<f64>>> {
        let mut session = Session::open(dir.path()).unwrap();
        session.use_map_region(name).unwrap();

        let mut reader = session.open_old(name).unwrap();
        let mut buf = session.allocate_row_buffer().unwrap();
        (0..session.window_rows().unwrap())
            .map(|row| {
                reader.get_row(&mut buf, row).unwrap();
                buf.clone()
            })
            .collect()
    }

    fn double(dir: &TempDir, input: &str, output: &str) -> Result<RunSummary> {
        let mut session = Session::open(dir.path())?;
        let command = format!("raster-twice input={} output={}", input, output);
        run(&mut session, input, output, &WriteOptions::default(), &command)
    }

    #[test]
    fn test_times_two() {
        assert_eq!(times_two(0.0), 0.0);
        assert_eq!(times_two(1.5), 3.0);
        for x in [0.25, 3.0, 1e300, f64::MIN_POSITIVE] {
            assert_eq!(times_two(-x), -times_two(x));
        }
    }

    #[test]
    fn test_process_row_keeps_nulls_in_place() {
        let input = [Some(1.0), None, Some(-2.5), None];
        let mut output = [Some(9.0); 4];
        process_row(&input, &mut output);
        assert_eq!(output, [Some(2.0), None, Some(-5.0), None]);
    }

    #[test]
    fn test_two_by_two_with_null() {
        let (dir, _session) = mapset();
        write_map(
            &dir,
            "in",
            DataType::F64,
            &[vec![Some(1.0), None], vec![Some(3.0), Some(4.0)]],
            WriteOptions::default(),
        );

        let summary = double(&dir, "in", "out").unwrap();
        assert_eq!(
            summary,
            RunSummary { rows: 2, cols: 2, null_cells: 1, data_type: DataType::F64 }
        );
        assert_eq!(
            read_map(&dir, "out"),
            vec![vec![Some(2.0), None], vec![Some(6.0), Some(8.0)]]
        );
    }

    #[test]
    fn test_all_null_stays_null() {
        let (dir, session) = mapset();
        write_map(&dir, "empty", DataType::F32, &vec![vec![None; 3]; 2], WriteOptions::default());

        double(&dir, "empty", "still_empty").unwrap();
        assert_eq!(read_map(&dir, "still_empty"), vec![vec![None; 3]; 2]);
        assert_eq!(
            session.map_dimensions("still_empty").unwrap(),
            session.map_dimensions("empty").unwrap()
        );
    }

    #[test]
    fn test_composition_is_not_idempotent() {
        let (dir, _session) = mapset();
        write_map(&dir, "one", DataType::F64, &[vec![Some(1.0)]], WriteOptions::default());

        double(&dir, "one", "two").unwrap();
        double(&dir, "two", "four").unwrap();
        assert_eq!(read_map(&dir, "four"), vec![vec![Some(4.0)]]);
    }

    #[test]
    fn test_type_preserved_and_rounded() {
        let (dir, session) = mapset();
        write_map(
            &dir,
            "bytes",
            DataType::U8,
            &[vec![Some(3.0), Some(100.0), Some(200.0), None]],
            WriteOptions::default(),
        );
        write_map(&dir, "floats", DataType::F32, &[vec![Some(0.1)]], WriteOptions::default());

        let summary = double(&dir, "bytes", "bytes2").unwrap();
        assert_eq!(summary.data_type, DataType::U8);
        assert_eq!(session.map_type("bytes2").unwrap(), DataType::U8);
        // 400 saturates below the null value 255
        assert_eq!(
            read_map(&dir, "bytes2"),
            vec![vec![Some(6.0), Some(200.0), Some(254.0), None]]
        );

        double(&dir, "floats", "floats2").unwrap();
        assert_eq!(session.map_type("floats2").unwrap(), DataType::F32);
        assert_eq!(read_map(&dir, "floats2"), vec![vec![Some((0.1f32 as f64 * 2.0) as f32 as f64)]]);
    }

    #[test]
    fn test_input_null_value_carried_over() {
        let (dir, _session) = mapset();
        let options = WriteOptions {
            nodata: Some(-9999.0),
            ..WriteOptions::default()
        };
        write_map(&dir, "dem", DataType::I16, &[vec![Some(-9998.0), None, Some(12.0)]], options);

        double(&dir, "dem", "dem2").unwrap();

        let mut session = Session::open(dir.path()).unwrap();
        session.use_map_region("dem2").unwrap();
        assert_eq!(session.open_old("dem2").unwrap().nodata(), Some(-9999.0));
        // -19996 is an ordinary value, not null
        assert_eq!(read_map(&dir, "dem2"), vec![vec![Some(-19996.0), None, Some(24.0)]]);
    }

    #[test]
    fn test_doubled_nodata() {
        // odd sentinels are never reached by an unsaturated doubling
        assert_eq!(doubled_nodata(DataType::I16, Some(-9999.0)), Some(-9999.0));
        assert_eq!(doubled_nodata(DataType::U8, None), None);
        assert_eq!(doubled_nodata(DataType::I16, Some(-10000.0)), Some(-32767.0));
        assert_eq!(doubled_nodata(DataType::I32, None), Some(i32::MIN as f64 + 1.0));
        assert_eq!(doubled_nodata(DataType::U16, Some(0.0)), Some(65535.0));
        assert!(doubled_nodata(DataType::F32, Some(-9999.0)).unwrap().is_nan());
        assert_eq!(doubled_nodata(DataType::F64, None), None);
    }

    #[test]
    fn test_even_input_null_value_is_not_hit() {
        let (dir, _session) = mapset();
        let options = WriteOptions {
            nodata: Some(-10000.0),
            ..WriteOptions::default()
        };
        write_map(&dir, "dem", DataType::I16, &[vec![Some(-5000.0), None]], options);

        let summary = double(&dir, "dem", "dem2").unwrap();
        assert_eq!(summary.null_cells, 1);
        assert_eq!(read_map(&dir, "dem2"), vec![vec![Some(-10000.0), None]]);

        let mut session = Session::open(dir.path()).unwrap();
        session.use_map_region("dem2").unwrap();
        assert_eq!(session.open_old("dem2").unwrap().nodata(), Some(-32767.0));
    }

    #[test]
    fn test_signed_minimum_survives_doubling() {
        let (dir, _session) = mapset();
        write_map(&dir, "low", DataType::I8, &[vec![Some(-64.0), Some(-100.0), None]], WriteOptions::default());

        double(&dir, "low", "low2").unwrap();
        assert_eq!(read_map(&dir, "low2"), vec![vec![Some(-128.0), Some(-128.0), None]]);
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let (dir, session) = mapset();

        let result = double(&dir, "absent", "out");
        assert!(matches!(result, Err(Error::MapNotFound(_))));
        assert!(!session.map_exists("out"));
        assert!(!session.history_path("out").exists());
    }

    #[test]
    fn test_existing_output_refused() {
        let (dir, session) = mapset();
        write_map(&dir, "a", DataType::U8, &[vec![Some(1.0)]], WriteOptions::default());
        write_map(&dir, "b", DataType::U8, &[vec![Some(7.0)]], WriteOptions::default());

        assert!(matches!(double(&dir, "a", "b"), Err(Error::MapExists(_))));
        assert_eq!(read_map(&dir, "b"), vec![vec![Some(7.0)]]);

        let mut session = Session::open(session.mapset()).unwrap();
        let options = WriteOptions { overwrite: true, ..WriteOptions::default() };
        run(&mut session, "a", "b", &options, "raster-twice input=a output=b --overwrite").unwrap();
        assert_eq!(read_map(&dir, "b"), vec![vec![Some(2.0)]]);
    }

    #[test]
    fn test_history_records_command() {
        let (dir, session) = mapset();
        write_map(&dir, "src", DataType::I32, &[vec![Some(5.0)]], WriteOptions::default());

        double(&dir, "src", "dst").unwrap();

        let history = session.read_history("dst").unwrap();
        assert_eq!(history.map, "dst");
        assert_eq!(history.map_type, "raster");
        assert_eq!(history.commands, vec!["raster-twice input=src output=dst"]);
        assert_eq!(history.data_source, vec!["raster map <src>"]);
    }

    #[test]
    fn test_region_and_mask_apply() {
        let (dir, _session) = mapset();
        write_map(
            &dir,
            "grid",
            DataType::I32,
            &[vec![Some(1.0), Some(2.0)], vec![Some(3.0), Some(4.0)]],
            WriteOptions::default(),
        );
        write_map(
            &dir,
            MASK,
            DataType::U8,
            &vec![vec![Some(1.0), Some(1.0), Some(0.0)]; 3],
            WriteOptions::default(),
        );

        let mut session = Session::open(dir.path()).unwrap();
        session.set_region(Region::new(3, 3).with_offset(0, 0)).unwrap();
        session.save_region().unwrap();
        double(&dir, "grid", "grid2").unwrap();

        let mut session = Session::open(dir.path()).unwrap();
        std::fs::remove_file(session.map_path(MASK)).unwrap();
        session.use_map_region("grid2").unwrap();
        assert_eq!(session.map_dimensions("grid2").unwrap().height, 3);

        assert_eq!(
            read_map(&dir, "grid2"),
            vec![
                vec![Some(2.0), Some(4.0), None],
                vec![Some(6.0), Some(8.0), None],
                vec![None, None, None],
            ]
        );
    }

    #[test]
    fn test_region_far_beyond_the_map() {
        let (dir, _session) = mapset();
        write_map(&dir, "tiny", DataType::U8, &[vec![Some(1.0), Some(2.0)]], WriteOptions::default());
        std::fs::write(
            dir.path().join("WIND.json"),
            r#"{"rows": 2, "cols": 2, "row_offset": 9223372036854775807, "col_offset": 0}"#,
        )
        .unwrap();

        let summary = double(&dir, "tiny", "nowhere").unwrap();
        assert_eq!(summary.null_cells, 4);
        assert_eq!(read_map(&dir, "nowhere"), vec![vec![None, None]; 2]);
    }

    #[test]
    fn test_georeferencing_follows_region() {
        let (dir, _session) = mapset();
        let geo = GeoInfo {
            pixel_scale: Some(vec![10.0, 10.0, 0.0]),
            tiepoints: vec![TiePoint {
                pixel_x: 0.0,
                pixel_y: 0.0,
                pixel_z: 0.0,
                geo_x: 1000.0,
                geo_y: 2000.0,
                geo_z: 0.0,
            }],
            geo_keys: Some(vec![1, 1, 0, 1, 3072, 0, 1, 32633]),
            ..GeoInfo::default()
        };
        let options = WriteOptions { geo: Some(geo.clone()), ..WriteOptions::default() };
        write_map(&dir, "geo", DataType::U16, &vec![vec![Some(1.0); 3]; 3], options);

        let mut session = Session::open(dir.path()).unwrap();
        session.set_region(Region::new(2, 2).with_offset(1, 1)).unwrap();
        run(&mut session, "geo", "geo2", &WriteOptions::default(), "raster-twice input=geo output=geo2").unwrap();

        let mut session = Session::open(dir.path()).unwrap();
        session.use_map_region("geo2").unwrap();
        let out = session.open_old("geo2").unwrap().window_geo_info().unwrap();
        assert_eq!(out, geo.shifted(1, 1));
        assert_eq!(out.tiepoints[0].pixel_x, -1.0);
        assert_eq!(out.epsg_code(), Some(32633));
    }
}
