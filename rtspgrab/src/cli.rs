use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser};

use ffmpeg_types::{ErrorTolerance, FrameSkipPolicy, PixelFormat, TransportMode, VsyncPolicy};

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline;

#[derive(Parser, Debug, Default)]
#[command(name = "rtspgrab")]
#[command(about = "Decode a network video stream into still images")]
pub struct Args {
    /// Stream locator, e.g. rtsp://host:554/path (overrides the config file)
    pub url: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Transport for RTSP media: reliable (tcp) or unreliable (udp)
    #[arg(long)]
    pub transport: Option<TransportMode>,

    /// Socket I/O timeout in microseconds, 0 disables it
    #[arg(long)]
    pub io_timeout_micros: Option<u64>,

    /// Timestamp policy: passthrough or vfr
    #[arg(long)]
    pub vsync: Option<VsyncPolicy>,

    /// Decoder error tolerance: strict, careful or aggressive
    #[arg(long)]
    pub error_tolerance: Option<ErrorTolerance>,

    /// Frame skip policy: none, non-key-only or key-only
    #[arg(long)]
    pub frame_skip: Option<FrameSkipPolicy>,

    /// Pictures held back to restore presentation order
    #[arg(long)]
    pub reorder_depth: Option<usize>,

    /// Image file overwritten with every frame
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write numbered images into this directory instead
    #[arg(long, conflicts_with = "output")]
    pub sequence: Option<PathBuf>,

    /// Output pixel format: bgr24 or rgb24
    #[arg(long)]
    pub format: Option<PixelFormat>,

    /// Output width, 0 keeps the decoded width
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height, 0 keeps the decoded height
    #[arg(long)]
    pub height: Option<u32>,

    /// Stop after writing this many frames
    #[arg(short = 'n', long)]
    pub max_frames: Option<u64>,

    /// Print the input format description before decoding
    #[arg(long)]
    pub dump_format: bool,

    /// More logging, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn run(self) -> ExitCode {
        let config = match self.resolve() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{:#}", e);
                return ExitCode::from(1);
            }
        };

        match pipeline::run(&config) {
            Ok(summary) => {
                tracing::info!(
                    frames = summary.frames_written,
                    packets = summary.packets_read,
                    decode_errors = summary.decode_errors,
                    "Stream finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("{}", e);
                if let PipelineError::Transport(transport) = &e
                    && transport.is_network()
                {
                    tracing::info!("The stream looks unreachable, rerunning may succeed");
                }
                ExitCode::from(e.exit_code())
            }
        }
    }

    /**
        Build the run configuration: the config file if one was given, or
        defaults, with every flag that was passed applied on top.
    */
    pub fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }

        let session = &mut config.session;
        if let Some(transport) = self.transport {
            session.transport_mode = transport;
        }
        if let Some(timeout) = self.io_timeout_micros {
            session.io_timeout_micros = timeout;
        }
        if let Some(vsync) = self.vsync {
            session.vsync_policy = vsync;
        }
        if let Some(tolerance) = self.error_tolerance {
            session.error_tolerance = tolerance;
        }
        if let Some(skip) = self.frame_skip {
            session.frame_skip_policy = skip;
        }

        if let Some(depth) = self.reorder_depth {
            config.decoder.reorder_depth = depth;
        }

        let output = &mut config.output;
        if let Some(path) = &self.output {
            output.path = path.clone();
            output.sequence_dir = None;
        }
        if let Some(dir) = &self.sequence {
            output.sequence_dir = Some(dir.clone());
        }
        if let Some(format) = self.format {
            output.format = format;
        }
        if let Some(width) = self.width {
            output.width = width;
        }
        if let Some(height) = self.height {
            output.height = height;
        }

        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        config.dump_format |= self.dump_format;

        config.validate()?;
        Ok(config)
    }
}
