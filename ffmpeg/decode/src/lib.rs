/*!
    Video decoding for the rtspgrab decode pipeline.

    This crate turns compressed packets of one video stream into decoded
    pictures. The [`Decoder`] state machine owns the policies (frame skip,
    error tolerance, reordering and vsync) and delegates the codec work to a
    [`DecodeBackend`], which is FFmpeg in production.
*/

mod backend;
mod config;
mod decoder;
mod error;
mod video;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use self::backend::{BackendError, DecodeBackend, FrameView, SendStatus};
pub use self::config::DecoderOptions;
pub use self::decoder::{Decoder, DecoderState, DecoderStats, Poll, RejectReason, Submit};
pub use self::error::{DecodeError, InitError};
pub use self::video::{FfmpegBackend, VideoDecoder};
