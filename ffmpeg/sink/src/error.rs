use std::path::PathBuf;

use thiserror::Error;

/**
    Errors from handing a frame to a sink.
*/
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("cannot determine image format of {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
