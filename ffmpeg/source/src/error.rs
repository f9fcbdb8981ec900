use thiserror::Error;

/**
    Errors from a transport session.

    All of them are fatal for the session that produced them; reopening is
    the caller's decision.
*/
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid stream locator: {0}")]
    InvalidLocator(String),

    #[error("failed to open {locator}: {reason}")]
    Open { locator: String, reason: String },

    #[error("failed to read stream information: {0}")]
    StreamInfo(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("session is closed")]
    Closed,
}

impl TransportError {
    /**
        Returns true if the error likely came from the network rather than
        from the stream contents, so reopening the session may succeed.
    */
    pub fn is_network(&self) -> bool {
        let reason = match self {
            Self::Open { reason, .. } => reason,
            Self::Read(reason) | Self::StreamInfo(reason) => reason,
            Self::InvalidLocator(_) | Self::Closed => return false,
        };
        let lower = reason.to_lowercase();
        lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("network")
            || lower.contains("resolve")
            || lower.contains("i/o error")
    }
}

/**
    No elementary stream of the session carries video.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no video stream found")]
pub struct NoVideoStream;
