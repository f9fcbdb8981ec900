use thiserror::Error;

use ffmpeg_types::PixelFormat;

/**
    Errors from converting a decoded picture.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The requested output format is not a 3-byte packed raster format.
    #[error("unsupported target format {0}, expected bgr24 or rgb24")]
    UnsupportedTarget(PixelFormat),

    #[error("cannot convert from {0}")]
    UnsupportedSource(PixelFormat),

    #[error("invalid picture: {0}")]
    InvalidPicture(String),

    #[error("scaler failed: {0}")]
    Scaler(String),
}

impl ConversionError {
    /**
        Returns false for a malformed picture, which only costs that picture.
        The other errors repeat for every picture of the stream.
    */
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidPicture(_))
    }
}
