/*!
    Transport session and stream selection for the rtspgrab decode pipeline.

    This crate handles the input side of the pipeline. It opens a stream
    locator (RTSP, or anything else FFmpeg can demux), negotiates transport
    options, describes the elementary streams the source advertises and
    produces compressed packets tagged by stream index.
*/

pub mod convert;
mod error;
mod options;
mod probe;
mod select;
mod session;

pub use self::error::{NoVideoStream, TransportError};
pub use self::options::demuxer_options;
pub use self::select::select_video;
pub use self::session::{PacketSource, Session};
