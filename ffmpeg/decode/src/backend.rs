/*!
    The seam between the decoder state machine and a codec implementation.
*/

use thiserror::Error;

use ffmpeg_types::{Packet, PixelFormat, Plane};

/**
    Outcome of handing a packet to a backend.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    Accepted,
    /// The backend holds too many undelivered frames; receive some first.
    Full,
}

/**
    Errors reported by a backend.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The input was malformed. The backend remains usable.
    #[error("corrupt input: {0}")]
    Corrupt(String),
    /// The backend cannot continue.
    #[error("{0}")]
    Fatal(String),
}

/**
    Read access to a frame produced by a backend.
*/
pub trait FrameView {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// `None` if the frame's layout has no [`PixelFormat`] equivalent.
    fn format(&self) -> Option<PixelFormat>;
    /// Backend-specific name of the frame's layout, for diagnostics.
    fn format_name(&self) -> String;
    fn pts(&self) -> Option<i64>;
    fn is_key(&self) -> bool;
    fn planes(&self) -> Vec<Plane<'_>>;
}

/**
    A codec implementation driven by [`Decoder`](crate::Decoder).

    The contract follows the send/receive model: every accepted packet may
    produce zero or more frames, delivered in decode order by repeated calls
    to `receive_frame` until it returns `Ok(None)`. After `send_eof`, the
    remaining frames are delivered the same way and `Ok(None)` means the
    backend is exhausted.
*/
pub trait DecodeBackend {
    type Frame: FrameView;

    fn send_packet(&mut self, packet: &Packet) -> Result<SendStatus, BackendError>;

    fn receive_frame(&mut self) -> Result<Option<Self::Frame>, BackendError>;

    fn send_eof(&mut self) -> Result<(), BackendError>;

    /**
        Release codec resources. Called exactly once, by
        [`Decoder::close`](crate::Decoder::close).
    */
    fn close(&mut self);
}
