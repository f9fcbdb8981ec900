/*!
    Conversion utilities between ffmpeg-next types and ffmpeg-types.
*/

use ffmpeg_next::{codec::Id, format::Pixel, media::Type};

use ffmpeg_types::{CodecId, MediaKind, PixelFormat, Pts, Rational};

/**
    Convert ffmpeg_next::Rational to our Rational.
*/
pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/**
    Convert our Rational to ffmpeg_next::Rational.
*/
pub fn rational_to_ffmpeg(r: Rational) -> ffmpeg_next::Rational {
    ffmpeg_next::Rational::new(r.num, r.den)
}

/**
    Convert ffmpeg_next media type to our MediaKind.
*/
pub fn media_kind_from_ffmpeg(medium: Type) -> MediaKind {
    match medium {
        Type::Video => MediaKind::Video,
        Type::Audio => MediaKind::Audio,
        _ => MediaKind::Other,
    }
}

/**
    Convert ffmpeg_next pixel format to our PixelFormat.
*/
pub fn pixel_format_from_ffmpeg(format: Pixel) -> Option<PixelFormat> {
    match format {
        Pixel::YUV420P => Some(PixelFormat::Yuv420p),
        Pixel::YUVJ420P => Some(PixelFormat::Yuvj420p),
        Pixel::YUV422P => Some(PixelFormat::Yuv422p),
        Pixel::YUVJ422P => Some(PixelFormat::Yuvj422p),
        Pixel::YUV444P => Some(PixelFormat::Yuv444p),
        Pixel::YUVJ444P => Some(PixelFormat::Yuvj444p),
        Pixel::YUV420P10LE => Some(PixelFormat::Yuv420p10),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::P010LE => Some(PixelFormat::P010le),
        Pixel::GRAY8 => Some(PixelFormat::Gray8),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        _ => None,
    }
}

/**
    Convert our PixelFormat to FFmpeg's Pixel format.
*/
pub fn pixel_format_to_ffmpeg(format: PixelFormat) -> Pixel {
    match format {
        PixelFormat::Yuv420p => Pixel::YUV420P,
        PixelFormat::Yuvj420p => Pixel::YUVJ420P,
        PixelFormat::Yuv422p => Pixel::YUV422P,
        PixelFormat::Yuvj422p => Pixel::YUVJ422P,
        PixelFormat::Yuv444p => Pixel::YUV444P,
        PixelFormat::Yuvj444p => Pixel::YUVJ444P,
        PixelFormat::Yuv420p10 => Pixel::YUV420P10LE,
        PixelFormat::Nv12 => Pixel::NV12,
        PixelFormat::P010le => Pixel::P010LE,
        PixelFormat::Gray8 => Pixel::GRAY8,
        PixelFormat::Rgb24 => Pixel::RGB24,
        PixelFormat::Bgr24 => Pixel::BGR24,
        PixelFormat::Rgba => Pixel::RGBA,
        PixelFormat::Bgra => Pixel::BGRA,
    }
}

/**
    Convert ffmpeg_next codec ID to our CodecId.
*/
pub fn codec_id_from_ffmpeg(id: Id) -> CodecId {
    match id {
        // Video
        Id::H264 => CodecId::H264,
        Id::HEVC => CodecId::H265,
        Id::VP8 => CodecId::Vp8,
        Id::VP9 => CodecId::Vp9,
        Id::AV1 => CodecId::Av1,
        Id::MPEG4 => CodecId::Mpeg4,
        Id::MPEG2VIDEO => CodecId::Mpeg2Video,
        Id::MJPEG => CodecId::Mjpeg,
        Id::RAWVIDEO => CodecId::RawVideo,
        // Audio
        Id::AAC => CodecId::Aac,
        Id::OPUS => CodecId::Opus,
        Id::MP3 => CodecId::Mp3,
        Id::PCM_MULAW => CodecId::PcmMulaw,
        Id::PCM_ALAW => CodecId::PcmAlaw,
        _ => CodecId::Unknown,
    }
}

/**
    Convert our CodecId to FFmpeg's codec ID. `Unknown` has no mapping.
*/
pub fn codec_id_to_ffmpeg(codec: CodecId) -> Option<Id> {
    match codec {
        CodecId::H264 => Some(Id::H264),
        CodecId::H265 => Some(Id::HEVC),
        CodecId::Vp8 => Some(Id::VP8),
        CodecId::Vp9 => Some(Id::VP9),
        CodecId::Av1 => Some(Id::AV1),
        CodecId::Mpeg4 => Some(Id::MPEG4),
        CodecId::Mpeg2Video => Some(Id::MPEG2VIDEO),
        CodecId::Mjpeg => Some(Id::MJPEG),
        CodecId::RawVideo => Some(Id::RAWVIDEO),
        CodecId::Aac => Some(Id::AAC),
        CodecId::Opus => Some(Id::OPUS),
        CodecId::Mp3 => Some(Id::MP3),
        CodecId::PcmMulaw => Some(Id::PCM_MULAW),
        CodecId::PcmAlaw => Some(Id::PCM_ALAW),
        CodecId::Unknown => None,
    }
}

/**
    Create a Pts from an optional i64 timestamp.
*/
pub fn pts_from_ffmpeg(pts: Option<i64>) -> Option<Pts> {
    pts.map(Pts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_formats_round_trip() {
        for format in [
            PixelFormat::Yuv420p,
            PixelFormat::Yuvj420p,
            PixelFormat::Nv12,
            PixelFormat::Bgr24,
            PixelFormat::Rgb24,
        ] {
            assert_eq!(
                pixel_format_from_ffmpeg(pixel_format_to_ffmpeg(format)),
                Some(format)
            );
        }
    }

    #[test]
    fn unknown_codec_has_no_ffmpeg_id() {
        assert_eq!(codec_id_to_ffmpeg(CodecId::Unknown), None);
        assert_eq!(codec_id_from_ffmpeg(Id::H264), CodecId::H264);
        assert_eq!(codec_id_from_ffmpeg(Id::MJPEG), CodecId::Mjpeg);
    }

    #[test]
    fn media_kinds() {
        assert_eq!(media_kind_from_ffmpeg(Type::Video), MediaKind::Video);
        assert_eq!(media_kind_from_ffmpeg(Type::Data), MediaKind::Other);
    }
}
