//! Command-line interface

use std::ffi::OsString;
use std::path::PathBuf;
use clap::{Parser, ValueEnum};
use crate::compression::Compression;
use crate::error::Result;
use crate::raster::{Session, WriteOptions};
use crate::twice::{self, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "raster-twice")]
#[command(about = twice::DESCRIPTION)]
#[command(after_help = format!("Keywords: {}", twice::KEYWORDS.join(", ")))]
#[command(version)]
pub struct Args {
    /// Name of input raster map
    #[arg(long, value_name = "NAME")]
    pub input: String,

    /// Name for output raster map
    #[arg(long, value_name = "NAME")]
    pub output: String,

    /// Mapset directory holding the maps
    #[arg(long, value_name = "DIR", env = "RASTER_TWICE_MAPSET", default_value = ".")]
    pub mapset: PathBuf,

    /// Allow the output map to replace an existing one
    #[arg(long, alias = "o")]
    pub overwrite: bool,

    /// Compression of the output map
    #[arg(long, value_enum, default_value_t = OutputCompression::Deflate)]
    pub compression: OutputCompression,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputCompression {
    None,
    Deflate,
    Packbits,
}

impl OutputCompression {
    fn name(&self) -> &'static str {
        match self {
            OutputCompression::None => "none",
            OutputCompression::Deflate => "deflate",
            OutputCompression::Packbits => "packbits",
        }
    }
}

impl From<OutputCompression> for Compression {
    fn from(value: OutputCompression) -> Self {
        match value {
            OutputCompression::None => Compression::None,
            OutputCompression::Deflate => Compression::Deflate,
            OutputCompression::Packbits => Compression::PackBits,
        }
    }
}

impl Args {
    /// Default log filter; `RUST_LOG` takes precedence
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            overwrite: self.overwrite,
            compression: self.compression.into(),
            ..WriteOptions::default()
        }
    }

    /// The invocation as stored in the output's history, defaults included
    pub fn command_line(&self) -> String {
        let mut line = format!(
            "raster-twice input={} output={} compression={}",
            self.input,
            self.output,
            self.compression.name()
        );
        if self.overwrite {
            line.push_str(" --overwrite");
        }
        line
    }
}

/// Rewrites `key=value` parameters as `--key=value` options
///
/// The program name is left alone, as is anything that already looks like
/// an option.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();

    for arg in args {
        match arg.to_str() {
            Some(text) if is_parameter(text) => normalized.push(format!("--{}", text).into()),
            _ => normalized.push(arg),
        }
    }

    normalized
}

fn is_parameter(arg: &str) -> bool {
    match arg.split_once('=') {
        Some((key, _)) => {
            !key.is_empty() && key.chars().all(|c| c.is_ascii_lowercase() || c == '_')
        }
        None => false,
    }
}

/// Opens the mapset and doubles the input map
pub fn run(args: &Args) -> Result<RunSummary> {
    let mut session = Session::open(&args.mapset)?;
    twice::run(
        &mut session,
        &args.input,
        &args.output,
        &args.write_options(),
        &args.command_line(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn test_normalize_args() {
        let args = normalize_args(["raster-twice", "input=dem", "output=dem2", "--overwrite", "--mapset=/x=y"]);
        assert_eq!(
            args,
            vec![
                OsString::from("raster-twice"),
                OsString::from("--input=dem"),
                OsString::from("--output=dem2"),
                OsString::from("--overwrite"),
                OsString::from("--mapset=/x=y"),
            ]
        );
    }

    #[test]
    fn test_is_parameter() {
        assert!(is_parameter("input=a"));
        assert!(is_parameter("output="));
        assert!(!is_parameter("=a"));
        assert!(!is_parameter("-v"));
        assert!(!is_parameter("Input=a"));
        assert!(!is_parameter("some/path=odd"));
    }

    #[test]
    fn test_parse_key_value_style() {
        let args = parse(&["raster-twice", "input=dem", "output=dem2", "mapset=/data/m", "--o"]).unwrap();
        assert_eq!(args.input, "dem");
        assert_eq!(args.output, "dem2");
        assert_eq!(args.mapset, PathBuf::from("/data/m"));
        assert!(args.overwrite);
        assert_eq!(args.compression, OutputCompression::Deflate);
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn test_missing_output_rejected() {
        assert!(parse(&["raster-twice", "input=dem"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(parse(&["raster-twice", "input=a", "output=b", "-v", "-q"]).is_err());
        let quiet = parse(&["raster-twice", "input=a", "output=b", "--quiet"]).unwrap();
        assert_eq!(quiet.log_level(), "warn");
    }

    #[test]
    fn test_command_line_and_options() {
        let args = parse(&[
            "raster-twice",
            "input=a",
            "output=b",
            "compression=packbits",
            "--overwrite",
        ])
        .unwrap();

        assert_eq!(
            args.command_line(),
            "raster-twice input=a output=b compression=packbits --overwrite"
        );
        let options = args.write_options();
        assert!(options.overwrite);
        assert_eq!(options.compression, Compression::PackBits);
    }

    #[test]
    fn test_unknown_compression_rejected() {
        assert!(parse(&["raster-twice", "input=a", "output=b", "compression=lzw"]).is_err());
    }
}
