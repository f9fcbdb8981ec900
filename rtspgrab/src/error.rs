/*!
    Pipeline errors and their process exit codes.
*/

use thiserror::Error;

use ffmpeg_decode::{DecodeError, InitError};
use ffmpeg_sink::SinkError;
use ffmpeg_source::{NoVideoStream, TransportError};
use ffmpeg_transform::ConversionError;

/**
    A failure that ended a pipeline run.
*/
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    NoVideo(#[from] NoVideoStream),

    #[error("decoder initialization failed: {0}")]
    Init(#[from] InitError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("frame sink failed: {0}")]
    Sink(#[from] SinkError),
}

impl PipelineError {
    /**
        Process exit status for this error. 1 is left for configuration
        errors raised before the pipeline starts.
    */
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Transport(_) => 2,
            Self::NoVideo(_) => 3,
            Self::Init(_) => 4,
            Self::Conversion(_) => 5,
            Self::Decode(_) => 6,
            Self::Sink(_) => 7,
        }
    }
}
