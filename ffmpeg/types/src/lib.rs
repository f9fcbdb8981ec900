/*!
    Shared types for the rtspgrab decode pipeline.

    This crate defines the vocabulary of the pipeline: the types that cross crate
    boundaries. It has no dependency on FFmpeg, so the stream selector, the
    decoder state machine and the frame sinks can be exercised without it.
*/

mod error;
mod format;
mod options;
mod packet;
mod picture;
mod stream;

pub use self::error::ParseError;
pub use self::format::{PixelFormat, PlaneLayout};
pub use self::options::{
    ErrorTolerance, FrameSkipPolicy, SessionOptions, TransportMode, VsyncPolicy,
};
pub use self::packet::{Packet, Pts, Rational};
pub use self::picture::{DecodedPicture, Plane, RasterFrame};
pub use self::stream::{CodecId, CodecParameters, MediaKind, StreamDescriptor};
