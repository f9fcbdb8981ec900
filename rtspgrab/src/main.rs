use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod pipeline;

fn main() -> ExitCode {
    let args = cli::Args::parse();
    init_logging(args.verbose);
    args.run()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 0)
        .init();

    // FFmpeg writes straight to stderr, keep it quiet unless asked
    let ffmpeg_level = match verbose {
        0 => ffmpeg_next::util::log::Level::Error,
        1 => ffmpeg_next::util::log::Level::Warning,
        _ => ffmpeg_next::util::log::Level::Debug,
    };
    ffmpeg_next::util::log::set_level(ffmpeg_level);
}
