/*!
    A deterministic in-process codec for tests.

    [`SyntheticBackend`] decodes packets built by [`encode_packet`] into
    solid-colour yuv420p frames. It needs no FFmpeg codec, so decoder and
    pipeline behaviour can be tested without media fixtures.

    Packet payload layout: magic byte `0xA5`, width and height as
    little-endian `u16`, then the Y, U and V sample values.
*/

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ffmpeg_types::{
    CodecId, CodecParameters, MediaKind, Packet, PixelFormat, Plane, Rational, StreamDescriptor,
};

use crate::backend::{BackendError, DecodeBackend, FrameView, SendStatus};

pub const MAGIC: u8 = 0xA5;

/// Time base of synthetic packets.
pub const TIME_BASE: Rational = Rational::new(1, 90_000);

/**
    A video descriptor for a synthetic stream at index 0.
*/
pub fn video_descriptor(width: u32, height: u32) -> StreamDescriptor {
    StreamDescriptor {
        index: 0,
        kind: MediaKind::Video,
        codec: CodecId::RawVideo,
        codec_name: "synthetic".to_string(),
        params: CodecParameters {
            width,
            height,
            pixel_format: Some(PixelFormat::Yuv420p),
            time_base: TIME_BASE,
            frame_rate: Some(Rational::new(30, 1)),
            ..CodecParameters::default()
        },
    }
}

/**
    Build a packet for stream 0 that decodes to a grey frame with luma `luma`.
*/
pub fn encode_packet(width: u16, height: u16, luma: u8, pts: i64, key: bool) -> Packet {
    encode_colour_packet(0, width, height, [luma, 128, 128], pts, key)
}

/**
    Build a packet for `stream_index` that decodes to a frame of a single
    YUV colour.
*/
pub fn encode_colour_packet(
    stream_index: usize,
    width: u16,
    height: u16,
    yuv: [u8; 3],
    pts: i64,
    key: bool,
) -> Packet {
    let mut data = vec![MAGIC];
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&yuv);

    Packet::new(data, stream_index, TIME_BASE)
        .with_timestamps(Some(pts), Some(pts))
        .with_duration(3000)
        .with_key(key)
}

/**
    A key packet for stream 0 that the synthetic codec cannot parse.
*/
pub fn corrupt_packet(pts: i64) -> Packet {
    Packet::new(vec![0x00, 0xde, 0xad], 0, TIME_BASE)
        .with_timestamps(Some(pts), Some(pts))
        .with_key(true)
}

/**
    A frame produced by [`SyntheticBackend`].
*/
#[derive(Clone, Debug)]
pub struct SyntheticFrame {
    width: u32,
    height: u32,
    pts: Option<i64>,
    key: bool,
    planes: [Vec<u8>; 3],
}

impl SyntheticFrame {
    fn solid(width: u32, height: u32, yuv: [u8; 3], pts: Option<i64>, key: bool) -> Self {
        let layout = PixelFormat::Yuv420p.plane_layout(width, height);
        let fill = |plane: usize| vec![yuv[plane]; layout[plane].row_bytes * layout[plane].rows];
        Self {
            width,
            height,
            pts,
            key,
            planes: [fill(0), fill(1), fill(2)],
        }
    }
}

impl FrameView for SyntheticFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> Option<PixelFormat> {
        Some(PixelFormat::Yuv420p)
    }

    fn format_name(&self) -> String {
        PixelFormat::Yuv420p.to_string()
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn is_key(&self) -> bool {
        self.key
    }

    fn planes(&self) -> Vec<Plane<'_>> {
        let layout = PixelFormat::Yuv420p.plane_layout(self.width, self.height);
        self.planes
            .iter()
            .zip(layout)
            .map(|(data, geometry)| Plane {
                data,
                stride: geometry.row_bytes,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    submitted: Vec<Packet>,
    eof_sent: bool,
    closes: usize,
}

/**
    Shared view of what a [`SyntheticBackend`] was asked to do, readable
    after the backend has been moved into a decoder.
*/
#[derive(Clone, Debug, Default)]
pub struct Probe(Rc<RefCell<ProbeState>>);

impl Probe {
    /// Packets the backend accepted or found corrupt, in order.
    pub fn submitted(&self) -> Vec<Packet> {
        self.0.borrow().submitted.clone()
    }

    pub fn eof_sent(&self) -> bool {
        self.0.borrow().eof_sent
    }

    pub fn close_count(&self) -> usize {
        self.0.borrow().closes
    }
}

/**
    Synthetic decoding backend. Frames come out in decode order, one per
    valid packet.
*/
#[derive(Debug, Default)]
pub struct SyntheticBackend {
    queue: VecDeque<SyntheticFrame>,
    capacity: Option<usize>,
    seen_key: bool,
    probe: Probe,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        A backend that reports [`SendStatus::Full`] while `capacity` frames
        are waiting to be received.
    */
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }

    fn parse(data: &[u8]) -> Result<(u32, u32, [u8; 3]), BackendError> {
        let [magic, w0, w1, h0, h1, y, u, v] = data else {
            return Err(BackendError::Corrupt(format!(
                "{} byte payload is not a synthetic frame",
                data.len()
            )));
        };
        if *magic != MAGIC {
            return Err(BackendError::Corrupt(format!("bad magic {magic:#04x}")));
        }
        let width = u16::from_le_bytes([*w0, *w1]) as u32;
        let height = u16::from_le_bytes([*h0, *h1]) as u32;
        if width == 0 || height == 0 {
            return Err(BackendError::Corrupt("zero frame dimensions".to_string()));
        }
        Ok((width, height, [*y, *u, *v]))
    }
}

impl DecodeBackend for SyntheticBackend {
    type Frame = SyntheticFrame;

    fn send_packet(&mut self, packet: &Packet) -> Result<SendStatus, BackendError> {
        if self.capacity.is_some_and(|capacity| self.queue.len() >= capacity) {
            return Ok(SendStatus::Full);
        }

        self.probe.0.borrow_mut().submitted.push(packet.clone());

        let (width, height, yuv) = Self::parse(&packet.data)?;
        if !packet.is_key && !self.seen_key {
            return Err(BackendError::Corrupt("missing reference frame".to_string()));
        }
        if packet.is_key {
            self.seen_key = true;
        }

        self.queue.push_back(SyntheticFrame::solid(
            width,
            height,
            yuv,
            packet.pts.map(|pts| pts.0),
            packet.is_key,
        ));
        Ok(SendStatus::Accepted)
    }

    fn receive_frame(&mut self) -> Result<Option<Self::Frame>, BackendError> {
        Ok(self.queue.pop_front())
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.probe.0.borrow_mut().eof_sent = true;
        Ok(())
    }

    fn close(&mut self) {
        self.queue.clear();
        self.probe.0.borrow_mut().closes += 1;
    }
}
