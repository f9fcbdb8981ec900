//! Decodes a clip produced by FFmpeg's own mpeg4 encoder.

use ffmpeg_next::{
    Dictionary, Rational as FFmpegRational, codec, format::Pixel,
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ffmpeg_decode::{DecoderOptions, Poll, Submit, VideoDecoder};
use ffmpeg_types::{
    CodecId, CodecParameters, MediaKind, Packet, PixelFormat, Rational, StreamDescriptor,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const TIME_BASE: Rational = Rational::new(1, 25);

fn descriptor() -> StreamDescriptor {
    StreamDescriptor {
        index: 0,
        kind: MediaKind::Video,
        codec: CodecId::Mpeg4,
        codec_name: "mpeg4".to_string(),
        params: CodecParameters {
            width: WIDTH,
            height: HEIGHT,
            pixel_format: Some(PixelFormat::Yuv420p),
            time_base: TIME_BASE,
            frame_rate: Some(Rational::new(25, 1)),
            ..CodecParameters::default()
        },
    }
}

fn receive_packets(encoder: &mut ffmpeg_next::encoder::Video, packets: &mut Vec<Packet>) {
    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        let data = encoded.data().map(|d| d.to_vec()).unwrap_or_default();
        packets.push(
            Packet::new(data, 0, TIME_BASE)
                .with_timestamps(encoded.pts(), encoded.dts())
                .with_duration(encoded.duration())
                .with_key(encoded.is_key()),
        );
    }
}

/// Encode `count` flat grey frames with a key frame every third frame.
/// Returns `None` when this FFmpeg build has no mpeg4 encoder.
fn encode_clip(count: usize) -> Option<Vec<Packet>> {
    ffmpeg_next::init().ok()?;
    let codec = ffmpeg_next::encoder::find(codec::Id::MPEG4)?;

    let mut encoder = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .ok()?;
    encoder.set_width(WIDTH);
    encoder.set_height(HEIGHT);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(FFmpegRational::new(1, 25));
    encoder.set_frame_rate(Some(FFmpegRational::new(25, 1)));
    encoder.set_gop(3);
    encoder.set_max_b_frames(0);
    let mut encoder = encoder.open_with(Dictionary::new()).ok()?;

    let mut packets = Vec::new();
    for n in 0..count {
        let mut frame = VideoFrameFFmpeg::new(Pixel::YUV420P, WIDTH, HEIGHT);
        frame.data_mut(0).fill(16 + (n as u8) * 16);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        frame.set_pts(Some(n as i64));

        encoder.send_frame(&frame).ok()?;
        receive_packets(&mut encoder, &mut packets);
    }
    encoder.send_eof().ok()?;
    receive_packets(&mut encoder, &mut packets);

    Some(packets)
}

struct Decoded {
    pts: Option<i64>,
    width: u32,
    height: u32,
    format: PixelFormat,
    luma: u8,
}

fn decode_all(packets: &[Packet]) -> Vec<Decoded> {
    let mut decoder =
        VideoDecoder::initialize(&descriptor(), DecoderOptions::default()).expect("mpeg4 decoder");
    let mut decoded = Vec::new();

    let mut collect = |decoder: &mut VideoDecoder| {
        while let Poll::Picture(picture) = decoder.poll().expect("poll") {
            decoded.push(Decoded {
                pts: picture.pts.map(|p| p.0),
                width: picture.width,
                height: picture.height,
                format: picture.format,
                luma: picture.planes[0].data[0],
            });
        }
    };

    for packet in packets {
        if decoder.submit(packet).expect("submit") == Submit::Accepted {
            collect(&mut decoder);
        }
    }
    decoder.drain().expect("drain");
    collect(&mut decoder);
    decoder.close();

    decoded
}

#[test]
fn decodes_encoded_clip() {
    let Some(packets) = encode_clip(10) else {
        eprintln!("mpeg4 encoder unavailable, skipping");
        return;
    };
    assert!(packets[0].is_key);

    let pictures = decode_all(&packets);

    assert!((1..=10).contains(&pictures.len()));
    for picture in &pictures {
        assert_eq!((picture.width, picture.height), (WIDTH, HEIGHT));
        assert_eq!(picture.format, PixelFormat::Yuv420p);
    }
    let pts: Vec<i64> = pictures.iter().filter_map(|p| p.pts).collect();
    assert!(pts.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(pictures[0].luma.abs_diff(16) <= 4);
}

#[test]
fn decoding_starts_at_first_key_packet() {
    let Some(packets) = encode_clip(10) else {
        eprintln!("mpeg4 encoder unavailable, skipping");
        return;
    };
    let first_delta = packets.iter().position(|p| !p.is_key).expect("delta packet");
    let next_key = packets[first_delta..]
        .iter()
        .position(|p| p.is_key)
        .map(|offset| first_delta + offset)
        .expect("second key packet");

    let pictures = decode_all(&packets[first_delta..]);

    assert!(!pictures.is_empty());
    assert_eq!(pictures[0].pts, packets[next_key].pts.map(|p| p.0));
}
