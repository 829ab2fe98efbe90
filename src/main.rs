use clap::Parser;
use env_logger::Env;
use log::{debug, error};

use raster_twice::cli::{self, Args};

fn main() {
    let args = Args::parse_from(cli::normalize_args(std::env::args_os()));

    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level()))
        .format_timestamp(None)
        .init();

    match cli::run(&args) {
        Ok(summary) => debug!(
            "wrote <{}>: {} rows x {} cols of {}, {} null cells",
            args.output, summary.rows, summary.cols, summary.data_type, summary.null_cells
        ),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
