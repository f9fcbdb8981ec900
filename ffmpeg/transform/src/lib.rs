/*!
    Pixel conversion for the rtspgrab decode pipeline.

    This crate converts decoded pictures, whatever their native layout, into
    packed 3-byte-per-pixel raster frames, scaling them on the way when a
    different output size is requested.
*/

mod error;
mod video;

pub use self::error::ConversionError;
pub use self::video::{PixelConverter, ScalingAlgorithm};
