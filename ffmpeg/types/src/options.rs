/*!
    Session options negotiated when a transport session is opened.
*/

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/**
    Transport used for the media streams of a session.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Interleaved over the control connection (RTSP over TCP).
    #[default]
    #[serde(alias = "tcp")]
    Reliable,
    /// Separate datagram flows (RTP over UDP).
    #[serde(alias = "udp")]
    Unreliable,
}

/**
    How decoded picture timestamps are smoothed before they leave the decoder.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VsyncPolicy {
    /// Emit every picture with the timestamp it was decoded with.
    Passthrough,
    /// Emit pictures with their timestamps, dropping any picture whose
    /// timestamp does not advance past the previous one.
    #[default]
    Vfr,
}

/**
    How much bitstream corruption the decoder absorbs before giving up.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTolerance {
    /// Any corrupt packet is fatal.
    Strict,
    /// A short run of corrupt packets is absorbed.
    #[default]
    Careful,
    /// Corrupt packets are never fatal.
    Aggressive,
}

impl ErrorTolerance {
    /**
        Number of consecutive corrupt packets absorbed before the decoder
        closes. `None` means unlimited.
    */
    pub const fn max_consecutive_errors(self) -> Option<u32> {
        match self {
            Self::Strict => Some(0),
            Self::Careful => Some(8),
            Self::Aggressive => None,
        }
    }

    /**
        Value for FFmpeg's `err_detect` codec option.
    */
    pub const fn err_detect(self) -> &'static str {
        match self {
            Self::Strict => "careful+explode",
            Self::Careful => "careful",
            Self::Aggressive => "aggressive",
        }
    }
}

/**
    Which compressed packets reach the decoder.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameSkipPolicy {
    /// Submit every packet.
    None,
    /// Drop non-key packets until the decoder is synchronized on a key
    /// packet, and again after corruption until the next key packet.
    #[default]
    NonKeyOnly,
    /// Submit key packets only.
    KeyOnly,
}

/**
    Options for opening a transport session.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub transport_mode: TransportMode,
    /// Socket I/O timeout in microseconds; 0 disables the timeout.
    pub io_timeout_micros: u64,
    pub vsync_policy: VsyncPolicy,
    pub error_tolerance: ErrorTolerance,
    pub frame_skip_policy: FrameSkipPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            transport_mode: TransportMode::Reliable,
            io_timeout_micros: 10_000_000,
            vsync_policy: VsyncPolicy::Vfr,
            error_tolerance: ErrorTolerance::Careful,
            frame_skip_policy: FrameSkipPolicy::NonKeyOnly,
        }
    }
}

impl SessionOptions {
    pub fn io_timeout(&self) -> Option<Duration> {
        match self.io_timeout_micros {
            0 => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }
}

impl FromStr for TransportMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reliable" | "tcp" => Ok(Self::Reliable),
            "unreliable" | "udp" => Ok(Self::Unreliable),
            _ => Err(ParseError::new(
                "transport mode",
                s,
                "reliable (tcp), unreliable (udp)",
            )),
        }
    }
}

impl FromStr for VsyncPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passthrough" | "0" => Ok(Self::Passthrough),
            "vfr" | "2" => Ok(Self::Vfr),
            _ => Err(ParseError::new("vsync policy", s, "passthrough, vfr")),
        }
    }
}

impl FromStr for ErrorTolerance {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "careful" => Ok(Self::Careful),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(ParseError::new(
                "error tolerance",
                s,
                "strict, careful, aggressive",
            )),
        }
    }
}

impl FromStr for FrameSkipPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "non-key-only" | "nokey" => Ok(Self::NonKeyOnly),
            "key-only" => Ok(Self::KeyOnly),
            _ => Err(ParseError::new(
                "frame skip policy",
                s,
                "none, non-key-only, key-only",
            )),
        }
    }
}
