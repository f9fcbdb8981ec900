/*!
    FFmpeg video decoder backend.
*/

use ffmpeg_next::{
    Dictionary,
    codec::{self, decoder::Video as VideoDecoderFFmpeg},
    ffi,
    packet::Flags as PacketFlags,
    util::frame::{Frame, video::Video as VideoFrameFFmpeg},
};

use ffmpeg_source::convert::{
    codec_id_to_ffmpeg, pixel_format_from_ffmpeg, pixel_format_to_ffmpeg, rational_to_ffmpeg,
};
use ffmpeg_types::{
    CodecParameters, ErrorTolerance, Packet, PixelFormat, Plane, StreamDescriptor,
};

use crate::backend::{BackendError, DecodeBackend, FrameView, SendStatus};
use crate::config::DecoderOptions;
use crate::decoder::Decoder;
use crate::error::InitError;

/**
    The production decoder: the state machine over FFmpeg.
*/
pub type VideoDecoder = Decoder<FfmpegBackend>;

impl Decoder<FfmpegBackend> {
    /**
        Open an FFmpeg decoder for `descriptor` and wrap it in the state
        machine.
    */
    pub fn initialize(
        descriptor: &StreamDescriptor,
        options: DecoderOptions,
    ) -> Result<Self, InitError> {
        let backend = FfmpegBackend::open(descriptor, options.error_tolerance)?;
        Self::with_backend(backend, descriptor, options)
    }
}

/**
    Decoding backend over an opened FFmpeg video decoder.
*/
pub struct FfmpegBackend {
    decoder: VideoDecoderFFmpeg,
    codec_name: String,
}

impl FfmpegBackend {
    /**
        Open an FFmpeg decoder for the stream described by `descriptor`.

        The codec is configured from the descriptor's parameters (dimensions,
        pixel format hint, extradata). `tolerance` selects FFmpeg's
        `err_detect` strictness.
    */
    pub fn open(
        descriptor: &StreamDescriptor,
        tolerance: ErrorTolerance,
    ) -> Result<Self, InitError> {
        ffmpeg_next::init().map_err(|e| InitError::AllocationFailed(e.to_string()))?;

        if !descriptor.is_video() {
            return Err(InitError::NotVideo {
                index: descriptor.index,
            });
        }

        let id = codec_id_to_ffmpeg(descriptor.codec)
            .ok_or_else(|| InitError::UnsupportedCodec(descriptor.codec_name.clone()))?;
        let codec = ffmpeg_next::decoder::find(id)
            .ok_or_else(|| InitError::UnsupportedCodec(descriptor.codec_name.clone()))?;

        let parameters = build_parameters(id, &descriptor.params)?;

        let mut decoder_ctx = codec::context::Context::from_parameters(parameters)
            .map_err(|e| InitError::AllocationFailed(e.to_string()))?;

        if !descriptor.params.time_base.is_unset() {
            unsafe {
                (*decoder_ctx.as_mut_ptr()).pkt_timebase =
                    rational_to_ffmpeg(descriptor.params.time_base).into();
            }
        }

        let mut opts = Dictionary::new();
        opts.set("err_detect", tolerance.err_detect());

        let decoder = decoder_ctx
            .decoder()
            .open_as_with(codec, opts)
            .and_then(|opened| opened.video())
            .map_err(|e| InitError::AllocationFailed(e.to_string()))?;

        tracing::debug!(
            codec = %descriptor.codec_name,
            width = decoder.width(),
            height = decoder.height(),
            err_detect = tolerance.err_detect(),
            "opened ffmpeg decoder"
        );

        Ok(Self {
            decoder,
            codec_name: descriptor.codec_name.clone(),
        })
    }
}

impl DecodeBackend for FfmpegBackend {
    type Frame = VideoFrameFFmpeg;

    fn send_packet(&mut self, packet: &Packet) -> Result<SendStatus, BackendError> {
        let mut ffmpeg_pkt = ffmpeg_next::Packet::copy(&packet.data);
        ffmpeg_pkt.set_pts(packet.pts.map(|pts| pts.0));
        ffmpeg_pkt.set_dts(packet.dts.map(|dts| dts.0));
        ffmpeg_pkt.set_duration(packet.duration);
        if packet.is_key {
            ffmpeg_pkt.set_flags(PacketFlags::KEY);
        }

        // EAGAIN means decoder buffer is full - receive frames first then retry
        match self.decoder.send_packet(&ffmpeg_pkt) {
            Ok(()) => Ok(SendStatus::Accepted),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                Ok(SendStatus::Full)
            }
            Err(e) => Err(classify(e)),
        }
    }

    fn receive_frame(&mut self) -> Result<Option<Self::Frame>, BackendError> {
        let mut decoded_frame = VideoFrameFFmpeg::empty();
        match self.decoder.receive_frame(&mut decoded_frame) {
            Ok(()) => Ok(Some(decoded_frame)),
            // Need more input
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => Ok(None),
            // No more frames
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(classify(e)),
        }
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        match self.decoder.send_eof() {
            // Already at EOF, that's fine
            Ok(()) | Err(ffmpeg_next::Error::Eof) => Ok(()),
            Err(e) => Err(BackendError::Fatal(e.to_string())),
        }
    }

    fn close(&mut self) {
        self.decoder.flush();
        tracing::debug!(codec = %self.codec_name, "closed ffmpeg decoder");
    }
}

impl FrameView for VideoFrameFFmpeg {
    fn width(&self) -> u32 {
        VideoFrameFFmpeg::width(self)
    }

    fn height(&self) -> u32 {
        VideoFrameFFmpeg::height(self)
    }

    fn format(&self) -> Option<PixelFormat> {
        pixel_format_from_ffmpeg(VideoFrameFFmpeg::format(self))
    }

    fn format_name(&self) -> String {
        format!("{:?}", VideoFrameFFmpeg::format(self))
    }

    fn pts(&self) -> Option<i64> {
        // Best-effort timestamp first, it survives missing pts on the packets
        Frame::timestamp(self).or_else(|| Frame::pts(self))
    }

    fn is_key(&self) -> bool {
        Frame::is_key(self)
    }

    fn planes(&self) -> Vec<Plane<'_>> {
        (0..VideoFrameFFmpeg::planes(self))
            .map(|index| Plane {
                data: self.data(index),
                stride: self.stride(index),
            })
            .collect()
    }
}

/**
    Map an FFmpeg decode error to a backend error. Bitstream errors leave the
    codec usable, anything else does not.
*/
fn classify(error: ffmpeg_next::Error) -> BackendError {
    match error {
        ffmpeg_next::Error::InvalidData
        | ffmpeg_next::Error::Bug
        | ffmpeg_next::Error::Bug2
        | ffmpeg_next::Error::PatchWelcome => BackendError::Corrupt(error.to_string()),
        _ => BackendError::Fatal(error.to_string()),
    }
}

/**
    Build FFmpeg codec parameters from a stream descriptor.
*/
fn build_parameters(
    id: codec::Id,
    params: &CodecParameters,
) -> Result<codec::Parameters, InitError> {
    let mut parameters = codec::Parameters::new();

    unsafe {
        let ptr = parameters.as_mut_ptr();

        (*ptr).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
        (*ptr).codec_id = id.into();
        (*ptr).width = params.width as i32;
        (*ptr).height = params.height as i32;

        if let Some(format) = params.pixel_format {
            (*ptr).format = ffi::AVPixelFormat::from(pixel_format_to_ffmpeg(format)) as i32;
        }

        // Set extradata if present (contains SPS/PPS for H.264, etc.)
        if let Some(extradata) = params.extradata.as_ref().filter(|e| !e.is_empty()) {
            // Allocate buffer with padding (FFmpeg requires AV_INPUT_BUFFER_PADDING_SIZE)
            let alloc_size = extradata.len() + ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
            let buf = ffi::av_mallocz(alloc_size) as *mut u8;
            if buf.is_null() {
                return Err(InitError::AllocationFailed(
                    "extradata buffer".to_string(),
                ));
            }
            std::ptr::copy_nonoverlapping(extradata.as_ptr(), buf, extradata.len());
            (*ptr).extradata = buf;
            (*ptr).extradata_size = extradata.len() as i32;
        }

        if let Some(bit_rate) = params.bit_rate {
            (*ptr).bit_rate = bit_rate as i64;
        }
    }

    Ok(parameters)
}

impl std::fmt::Debug for FfmpegBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegBackend")
            .field("codec_name", &self.codec_name)
            .finish_non_exhaustive()
    }
}
