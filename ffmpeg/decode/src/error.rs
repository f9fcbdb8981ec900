use thiserror::Error;

/**
    Errors from decoder construction.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("no decoder available for codec {0}")]
    UnsupportedCodec(String),

    #[error("failed to allocate decoder: {0}")]
    AllocationFailed(String),

    #[error("stream #{index} is not a video stream")]
    NotVideo { index: usize },
}

/**
    Errors from submitting packets to or polling a decoder.

    See [`DecodeError::is_fatal`] for which ones end the decoder.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("corrupt packet: {0}")]
    Corrupt(String),

    #[error(
        "resolution changed from {expected_width}x{expected_height} to {found_width}x{found_height}"
    )]
    ResolutionChanged {
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("unsupported decoded pixel format {0}")]
    UnsupportedPixelFormat(String),

    #[error("{count} consecutive corrupt packets exceed the error tolerance")]
    ToleranceExceeded { count: u32 },

    #[error("decoder failed: {0}")]
    Backend(String),

    #[error("decoder is closed")]
    Closed,
}

impl DecodeError {
    /**
        Returns false only for a corrupt packet absorbed within the error
        tolerance. Every other error leaves the decoder closed.
    */
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Corrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_corruption_is_recoverable() {
        assert!(!DecodeError::Corrupt("bad slice".to_string()).is_fatal());
        assert!(DecodeError::ToleranceExceeded { count: 9 }.is_fatal());
        assert!(DecodeError::Closed.is_fatal());
    }

    #[test]
    fn resolution_change_message() {
        let err = DecodeError::ResolutionChanged {
            expected_width: 640,
            expected_height: 480,
            found_width: 320,
            found_height: 240,
        };
        assert_eq!(err.to_string(), "resolution changed from 640x480 to 320x240");
    }
}
