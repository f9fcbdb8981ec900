/*!
    Extraction of stream descriptors from an opened input context.
*/

use ffmpeg_next::{format::context::Input as InputContext, format::stream::Stream, media::Type};

use ffmpeg_types::{CodecParameters, MediaKind, StreamDescriptor};

use crate::convert::{
    codec_id_from_ffmpeg, media_kind_from_ffmpeg, pixel_format_from_ffmpeg, rational_from_ffmpeg,
};

/**
    Describe every elementary stream of an input, in index order.
*/
pub(crate) fn describe_streams(input_ctx: &InputContext) -> Vec<StreamDescriptor> {
    input_ctx.streams().map(|stream| describe_stream(&stream)).collect()
}

fn describe_stream(stream: &Stream) -> StreamDescriptor {
    let codec_params = stream.parameters();
    let kind = media_kind_from_ffmpeg(codec_params.medium());
    let id = codec_params.id();

    let mut params = CodecParameters {
        time_base: rational_from_ffmpeg(stream.time_base()),
        ..CodecParameters::default()
    };

    if kind == MediaKind::Video {
        // Create a decoder context to get dimensions and format
        if let Ok(decoder_ctx) =
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            && let Ok(decoder) = decoder_ctx.decoder().video()
        {
            params.width = decoder.width();
            params.height = decoder.height();
            params.pixel_format = pixel_format_from_ffmpeg(decoder.format());
        }

        params.frame_rate = if stream.avg_frame_rate().numerator() != 0 {
            Some(rational_from_ffmpeg(stream.avg_frame_rate()))
        } else if stream.rate().numerator() != 0 {
            Some(rational_from_ffmpeg(stream.rate()))
        } else {
            None
        };
    }

    // SAFETY: We're reading from a valid AVCodecParameters pointer that FFmpeg owns
    unsafe {
        let ptr = codec_params.as_ptr();

        // Extract extradata (SPS/PPS for H.264, etc.)
        if (*ptr).extradata_size > 0 && !(*ptr).extradata.is_null() {
            let slice =
                std::slice::from_raw_parts((*ptr).extradata, (*ptr).extradata_size as usize);
            params.extradata = Some(slice.to_vec());
        }

        if (*ptr).bit_rate > 0 {
            params.bit_rate = Some((*ptr).bit_rate as u64);
        }

        if codec_params.medium() == Type::Audio {
            if (*ptr).sample_rate > 0 {
                params.sample_rate = Some((*ptr).sample_rate as u32);
            }
            if (*ptr).ch_layout.nb_channels > 0 {
                params.channels = Some((*ptr).ch_layout.nb_channels as u16);
            }
        }
    }

    StreamDescriptor {
        index: stream.index(),
        kind,
        codec: codec_id_from_ffmpeg(id),
        codec_name: id.name().to_string(),
        params,
    }
}
