/*!
    Decoder configuration.
*/

use ffmpeg_types::{ErrorTolerance, FrameSkipPolicy, SessionOptions, VsyncPolicy};

/**
    Configuration for a [`Decoder`](crate::Decoder).
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Number of pictures held back to restore presentation order.
    /// 0 emits pictures in the order the backend produces them.
    pub reorder_depth: usize,
    pub error_tolerance: ErrorTolerance,
    pub frame_skip: FrameSkipPolicy,
    pub vsync: VsyncPolicy,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::from(&SessionOptions::default())
    }
}

impl From<&SessionOptions> for DecoderOptions {
    fn from(options: &SessionOptions) -> Self {
        Self {
            reorder_depth: 0,
            error_tolerance: options.error_tolerance,
            frame_skip: options.frame_skip_policy,
            vsync: options.vsync_policy,
        }
    }
}

impl DecoderOptions {
    pub fn with_reorder_depth(mut self, depth: usize) -> Self {
        self.reorder_depth = depth;
        self
    }
}
