/*!
    Elementary stream descriptors.
*/

use crate::{PixelFormat, Rational};

/**
    Media kind of an elementary stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Other,
}

/**
    Codec identity of an elementary stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    // Video
    H264,
    H265,
    Vp8,
    Vp9,
    Av1,
    Mpeg4,
    Mpeg2Video,
    Mjpeg,
    RawVideo,
    // Audio
    Aac,
    Opus,
    Mp3,
    PcmMulaw,
    PcmAlaw,
    /// A codec the pipeline has no mapping for. The descriptor's
    /// `codec_name` still carries FFmpeg's name for it.
    Unknown,
}

impl CodecId {
    pub const fn is_video(self) -> bool {
        matches!(
            self,
            Self::H264
                | Self::H265
                | Self::Vp8
                | Self::Vp9
                | Self::Av1
                | Self::Mpeg4
                | Self::Mpeg2Video
                | Self::Mjpeg
                | Self::RawVideo
        )
    }
}

/**
    Codec-specific parameters discovered during negotiation.

    Video fields are zero/`None` for audio streams and vice versa. Dimensions
    are zero when neither the protocol nor probing could determine them.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodecParameters {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format hint (may be absent until the first picture is decoded).
    pub pixel_format: Option<PixelFormat>,
    /// Time base for timestamps.
    pub time_base: Rational,
    /// Frame rate (may be approximate or unavailable).
    pub frame_rate: Option<Rational>,
    /// Codec extradata (SPS/PPS for H.264, VPS/SPS/PPS for H.265, etc.).
    pub extradata: Option<Vec<u8>>,
    /// Bitrate in bits per second (if known).
    pub bit_rate: Option<u64>,
    /// Audio sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Audio channel count.
    pub channels: Option<u16>,
}

/**
    One elementary stream advertised by a transport session.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Logical index, matching `Packet::stream_index`.
    pub index: usize,
    pub kind: MediaKind,
    pub codec: CodecId,
    /// FFmpeg's short name for the codec.
    pub codec_name: String,
    pub params: CodecParameters,
}

impl StreamDescriptor {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /**
        Returns the aspect ratio as a float, if dimensions are known.
    */
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.params.width == 0 || self.params.height == 0 {
            return None;
        }
        Some(self.params.width as f64 / self.params.height as f64)
    }

    /**
        Returns the frame rate as fps, if available.
    */
    pub fn fps(&self) -> Option<f64> {
        self.params.frame_rate.map(|r| r.to_f64())
    }
}

impl std::fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {:?} {}", self.index, self.kind, self.codec_name)?;
        if self.kind == MediaKind::Video && self.params.width > 0 {
            write!(f, " {}x{}", self.params.width, self.params.height)?;
        }
        if let Some(format) = self.params.pixel_format {
            write!(f, " {}", format)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(width: u32, height: u32) -> StreamDescriptor {
        StreamDescriptor {
            index: 0,
            kind: MediaKind::Video,
            codec: CodecId::H264,
            codec_name: "h264".to_string(),
            params: CodecParameters {
                width,
                height,
                pixel_format: Some(PixelFormat::Yuv420p),
                frame_rate: Some(Rational::new(25, 1)),
                time_base: Rational::new(1, 90000),
                ..CodecParameters::default()
            },
        }
    }

    #[test]
    fn descriptor_aspect_ratio() {
        let aspect = video(1920, 1080).aspect_ratio().unwrap();
        assert!((aspect - 16.0 / 9.0).abs() < 0.01);
        assert_eq!(video(0, 0).aspect_ratio(), None);
    }

    #[test]
    fn descriptor_fps() {
        assert_eq!(video(640, 480).fps(), Some(25.0));
    }

    #[test]
    fn descriptor_display() {
        assert_eq!(video(640, 480).to_string(), "#0 Video h264 640x480 yuv420p");
    }

    #[test]
    fn codec_id_is_video() {
        assert!(CodecId::H264.is_video());
        assert!(CodecId::Mjpeg.is_video());
        assert!(!CodecId::Aac.is_video());
        assert!(!CodecId::Unknown.is_video());
    }
}
