/*!
    Frame sinks for the rtspgrab decode pipeline.

    This crate handles the output side of the pipeline. It takes converted
    raster frames and hands them off: to an image file that is overwritten
    with every frame, to a numbered image sequence, or to an in-memory queue.
*/

mod error;
mod file;
mod sink;

pub use self::error::SinkError;
pub use self::file::{ImageFileSink, ImageSequenceSink};
pub use self::sink::{FrameSink, MemorySink};
