/*!
    The decode pipeline: session, decoder, converter and sink driven in one
    blocking loop.
*/

use ffmpeg_decode::{
    DecodeBackend, DecodeError, Decoder, DecoderOptions, DecoderState, DecoderStats, InitError,
    Poll, RejectReason, Submit, VideoDecoder,
};
use ffmpeg_sink::{FrameSink, ImageFileSink, ImageSequenceSink};
use ffmpeg_source::{PacketSource, Session, select_video};
use ffmpeg_transform::PixelConverter;
use ffmpeg_types::{Packet, PixelFormat, StreamDescriptor};

use crate::config::Config;
use crate::error::PipelineError;

/**
    Open the configured stream and run it to completion against FFmpeg.
*/
pub fn run(config: &Config) -> Result<RunSummary, PipelineError> {
    let settings = PipelineSettings::from(config);
    let locator = config.url.as_deref().unwrap_or_default();

    tracing::info!(
        locator,
        transport = ?config.session.transport_mode,
        "Opening stream"
    );
    let session = Session::open(locator, &config.session)?;
    if config.dump_format {
        session.dump_format()?;
    }

    let output = &config.output;
    let sink: Box<dyn FrameSink> = match &output.sequence_dir {
        Some(dir) => Box::new(ImageSequenceSink::new(
            dir,
            &output.sequence_prefix,
            &output.sequence_extension,
        )?),
        None => Box::new(ImageFileSink::new(&output.path)?),
    };

    let mut pipeline = Pipeline::new(session, sink, settings);
    pipeline.run(VideoDecoder::initialize)
}

/**
    What the pipeline does with decoded pictures.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    pub target_format: PixelFormat,
    /// Output size; 0 keeps the decoded size.
    pub target_width: u32,
    pub target_height: u32,
    pub max_frames: Option<u64>,
    pub decoder: DecoderOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_format: PixelFormat::Bgr24,
            target_width: 0,
            target_height: 0,
            max_frames: None,
            decoder: DecoderOptions::default(),
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            target_format: config.output.format,
            target_width: config.output.width,
            target_height: config.output.height,
            max_frames: config.max_frames,
            decoder: config.decoder_options(),
        }
    }
}

/**
    Counters for one pipeline run.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Packets read from the source, of any stream.
    pub packets_read: u64,
    /// Packets belonging to streams other than the decoded one.
    pub other_stream_packets: u64,
    /// Video packets the decoder accepted.
    pub packets_submitted: u64,
    /// Video packets the decoder turned away (frame skip, full buffer).
    pub packets_skipped: u64,
    pub frames_written: u64,
    /// Corrupt packets or pictures that were absorbed.
    pub decode_errors: u64,
    /// Pictures dropped because they could not be converted.
    pub conversion_errors: u64,
    pub decoder: DecoderStats,
}

/**
    Drives packets from a source through a decoder and converter into a sink.

    Teardown is ordered: the decoder is closed before the source, on success
    and on error alike.
*/
pub struct Pipeline<S: PacketSource, K: FrameSink> {
    source: S,
    sink: K,
    converter: PixelConverter,
    settings: PipelineSettings,
    summary: RunSummary,
}

impl<S: PacketSource, K: FrameSink> Pipeline<S, K> {
    pub fn new(source: S, sink: K, settings: PipelineSettings) -> Self {
        Self {
            source,
            sink,
            converter: PixelConverter::new(),
            settings,
            summary: RunSummary::default(),
        }
    }

    /**
        Run until end of stream, the frame limit or a fatal error.

        `open_decoder` builds the decoder once the video stream is known.
        The source is closed when this returns.
    */
    pub fn run<B, F>(&mut self, open_decoder: F) -> Result<RunSummary, PipelineError>
    where
        B: DecodeBackend,
        F: FnOnce(&StreamDescriptor, DecoderOptions) -> Result<Decoder<B>, InitError>,
    {
        let result = self
            .execute(open_decoder)
            .and_then(|()| self.sink.finish().map_err(PipelineError::from));

        self.source.close();

        let summary = self.summary;
        tracing::debug!(
            packets_read = summary.packets_read,
            other_streams = summary.other_stream_packets,
            submitted = summary.packets_submitted,
            skipped = summary.packets_skipped,
            frames = summary.frames_written,
            decode_errors = summary.decode_errors,
            conversion_errors = summary.conversion_errors,
            "pipeline finished"
        );

        result.map(|()| summary)
    }

    fn execute<B, F>(&mut self, open_decoder: F) -> Result<(), PipelineError>
    where
        B: DecodeBackend,
        F: FnOnce(&StreamDescriptor, DecoderOptions) -> Result<Decoder<B>, InitError>,
    {
        let descriptor = select_video(self.source.discover_streams()?)?.clone();
        tracing::info!("Decoding {}", descriptor);

        let mut decoder = open_decoder(&descriptor, self.settings.decoder)?;
        let result = self.decode(&mut decoder, descriptor.index);

        self.summary.decoder = decoder.stats();
        decoder.close();
        result
    }

    fn decode<B: DecodeBackend>(
        &mut self,
        decoder: &mut Decoder<B>,
        video_index: usize,
    ) -> Result<(), PipelineError> {
        loop {
            if self.limit_reached() {
                tracing::info!(frames = self.summary.frames_written, "Frame limit reached");
                return Ok(());
            }

            let Some(packet) = self.source.read_packet()? else {
                break;
            };
            self.summary.packets_read += 1;

            if packet.stream_index != video_index {
                self.summary.other_stream_packets += 1;
                continue;
            }

            self.submit(decoder, &packet)?;
            self.emit(decoder)?;
        }

        tracing::debug!("end of stream, draining decoder");
        decoder.drain()?;
        self.emit(decoder)
    }

    /**
        Submit one packet. A full codec buffer is emptied and the packet
        offered once more.
    */
    fn submit<B: DecodeBackend>(
        &mut self,
        decoder: &mut Decoder<B>,
        packet: &Packet,
    ) -> Result<(), PipelineError> {
        let mut outcome = decoder.submit(packet);

        if let Ok(Submit::Rejected(RejectReason::BufferFull)) = outcome {
            self.emit(decoder)?;
            if self.limit_reached() {
                return Ok(());
            }
            outcome = decoder.submit(packet);
        }

        match outcome {
            Ok(Submit::Accepted) => self.summary.packets_submitted += 1,
            Ok(Submit::Rejected(reason)) => {
                self.summary.packets_skipped += 1;
                tracing::trace!(?reason, pts = ?packet.pts, "packet skipped");
            }
            Err(e) => self.absorb(e)?,
        }
        Ok(())
    }

    /**
        Hand every picture the decoder has ready to the sink.

        Outside a drain a corrupt picture ends the pass, the next packet
        resumes it. While draining nothing follows, so polling continues
        until the decoder is empty.
    */
    fn emit<B: DecodeBackend>(&mut self, decoder: &mut Decoder<B>) -> Result<(), PipelineError> {
        while !self.limit_reached() {
            let picture = match decoder.poll() {
                Ok(Poll::Picture(picture)) => picture,
                Ok(Poll::NoOutputYet) => return Ok(()),
                Err(e) => {
                    self.absorb(e)?;
                    if decoder.state() == DecoderState::Draining {
                        continue;
                    }
                    return Ok(());
                }
            };

            let frame = match self.converter.convert(
                &picture,
                self.settings.target_format,
                self.settings.target_width,
                self.settings.target_height,
            ) {
                Ok(frame) => frame,
                Err(e) if !e.is_fatal() => {
                    self.summary.conversion_errors += 1;
                    tracing::warn!(pts = ?picture.pts, "Dropping picture: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.summary.frames_written += 1;
            self.sink.write_frame(self.summary.frames_written, &frame)?;
        }
        Ok(())
    }

    fn absorb(&mut self, error: DecodeError) -> Result<(), PipelineError> {
        if error.is_fatal() {
            return Err(error.into());
        }
        self.summary.decode_errors += 1;
        tracing::warn!("Skipping corrupt data: {}", error);
        Ok(())
    }

    fn limit_reached(&self) -> bool {
        self.settings
            .max_frames
            .is_some_and(|max| self.summary.frames_written >= max)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use ffmpeg_decode::testing::{
        SyntheticBackend, SyntheticFrame, corrupt_packet, encode_colour_packet, video_descriptor,
    };
    use ffmpeg_decode::{BackendError, SendStatus};
    use ffmpeg_sink::MemorySink;
    use ffmpeg_source::TransportError;
    use ffmpeg_types::{CodecId, CodecParameters, MediaKind, Rational};

    use super::*;

    const RED: [u8; 3] = [81, 90, 240];

    struct FakeSource {
        streams: Vec<StreamDescriptor>,
        packets: VecDeque<Result<Packet, TransportError>>,
        closes: Rc<Cell<usize>>,
        closed: bool,
    }

    impl FakeSource {
        fn new(streams: Vec<StreamDescriptor>, packets: Vec<Packet>) -> Self {
            Self {
                streams,
                packets: packets.into_iter().map(Ok).collect(),
                closes: Rc::default(),
                closed: false,
            }
        }

        fn fail_with(mut self, error: TransportError) -> Self {
            self.packets.push_back(Err(error));
            self
        }
    }

    impl PacketSource for FakeSource {
        fn discover_streams(&mut self) -> Result<&[StreamDescriptor], TransportError> {
            if self.closed {
                return Err(TransportError::Closed);
            }
            Ok(&self.streams)
        }

        fn read_packet(&mut self) -> Result<Option<Packet>, TransportError> {
            if self.closed {
                return Err(TransportError::Closed);
            }
            self.packets.pop_front().transpose()
        }

        fn close(&mut self) {
            self.closed = true;
            self.closes.set(self.closes.get() + 1);
        }
    }

    /// Holds every picture back until end of input, then fails once after
    /// handing out `fail_after` of them.
    struct DelayedBackend {
        inner: SyntheticBackend,
        eof: bool,
        delivered: usize,
        fail_after: usize,
        failed: bool,
    }

    impl DelayedBackend {
        fn new(fail_after: usize) -> Self {
            Self {
                inner: SyntheticBackend::new(),
                eof: false,
                delivered: 0,
                fail_after,
                failed: false,
            }
        }
    }

    impl DecodeBackend for DelayedBackend {
        type Frame = SyntheticFrame;

        fn send_packet(&mut self, packet: &Packet) -> Result<SendStatus, BackendError> {
            self.inner.send_packet(packet)
        }

        fn receive_frame(&mut self) -> Result<Option<Self::Frame>, BackendError> {
            if !self.eof {
                return Ok(None);
            }
            if self.delivered == self.fail_after && !self.failed {
                self.failed = true;
                return Err(BackendError::Corrupt("damaged reference".to_string()));
            }
            let frame = self.inner.receive_frame()?;
            if frame.is_some() {
                self.delivered += 1;
            }
            Ok(frame)
        }

        fn send_eof(&mut self) -> Result<(), BackendError> {
            self.eof = true;
            self.inner.send_eof()
        }

        fn close(&mut self) {
            self.inner.close();
        }
    }

    fn audio_descriptor(index: usize) -> StreamDescriptor {
        StreamDescriptor {
            index,
            kind: MediaKind::Audio,
            codec: CodecId::Aac,
            codec_name: "aac".to_string(),
            params: CodecParameters {
                time_base: Rational::new(1, 48_000),
                sample_rate: Some(48_000),
                channels: Some(2),
                ..CodecParameters::default()
            },
        }
    }

    fn audio_packet(pts: i64) -> Packet {
        Packet::new(vec![0x21, 0x10, 0x04], 1, Rational::new(1, 48_000))
            .with_timestamps(Some(pts), Some(pts))
            .with_key(true)
    }

    /// `count` 640x480 packets with a key packet every `gop` packets.
    fn clip(count: usize, gop: usize) -> Vec<Packet> {
        (0..count)
            .map(|i| encode_colour_packet(0, 640, 480, RED, i as i64 * 3000, i % gop == 0))
            .collect()
    }

    fn av_streams() -> Vec<StreamDescriptor> {
        vec![video_descriptor(640, 480), audio_descriptor(1)]
    }

    fn pipeline(
        source: FakeSource,
        settings: PipelineSettings,
    ) -> Pipeline<FakeSource, MemorySink> {
        Pipeline::new(source, MemorySink::new(64), settings)
    }

    fn run_synthetic(
        pipeline: &mut Pipeline<FakeSource, MemorySink>,
        backend: SyntheticBackend,
    ) -> Result<RunSummary, PipelineError> {
        pipeline.run(move |descriptor, options| {
            Decoder::with_backend(backend, descriptor, options)
        })
    }

    #[test]
    fn runs_to_end_of_stream() {
        let mut packets = Vec::new();
        for (i, packet) in clip(10, 3).into_iter().enumerate() {
            packets.push(packet);
            if i % 2 == 0 {
                packets.push(audio_packet(i as i64 * 1600));
            }
        }
        let source = FakeSource::new(av_streams(), packets);
        let closes = source.closes.clone();
        let backend = SyntheticBackend::new();
        let probe = backend.probe();

        let mut pipeline = pipeline(source, PipelineSettings::default());
        let summary = run_synthetic(&mut pipeline, backend).unwrap();

        assert_eq!(summary.packets_read, 15);
        assert_eq!(summary.other_stream_packets, 5);
        assert_eq!(summary.packets_submitted, 10);
        assert_eq!(summary.frames_written, 10);
        assert_eq!(summary.decode_errors, 0);
        assert_eq!(summary.decoder.emitted, 10);

        let frames: Vec<_> = pipeline.sink.frames().collect();
        assert_eq!(frames.len(), 10);
        for (expected, (number, frame)) in (1..=10).zip(&frames) {
            assert_eq!(*number, expected);
            assert_eq!((frame.width, frame.height), (640, 480));
            assert_eq!(frame.format, PixelFormat::Bgr24);
            assert_eq!(frame.stride, 640 * 3);
            assert_eq!(frame.data.len(), 640 * 3 * 480);
        }
        assert!(frames.windows(2).all(|pair| pair[0].1.pts < pair[1].1.pts));

        // Only video packets reach the codec
        assert!(probe.submitted().iter().all(|packet| packet.stream_index == 0));
        assert!(probe.eof_sent());
        assert_eq!(probe.close_count(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn waits_for_first_key_packet() {
        let packets: Vec<Packet> = (0..6)
            .map(|i| encode_colour_packet(0, 640, 480, RED, i * 3000, i == 2))
            .collect();
        let backend = SyntheticBackend::new();
        let probe = backend.probe();

        let mut pipeline = pipeline(
            FakeSource::new(av_streams(), packets),
            PipelineSettings::default(),
        );
        let summary = run_synthetic(&mut pipeline, backend).unwrap();

        assert_eq!(summary.packets_skipped, 2);
        assert_eq!(summary.frames_written, 4);
        assert!(probe.submitted()[0].is_key);

        let first = pipeline.sink.frames().next().unwrap();
        assert_eq!(first.1.pts.map(|pts| pts.0), Some(6000));
    }

    #[test]
    fn audio_only_source_has_no_video() {
        let source = FakeSource::new(vec![audio_descriptor(0)], vec![audio_packet(0)]);
        let closes = source.closes.clone();
        let opened = Cell::new(false);

        let mut pipeline = pipeline(source, PipelineSettings::default());
        let result = pipeline.run(|descriptor, options| {
            opened.set(true);
            Decoder::with_backend(SyntheticBackend::new(), descriptor, options)
        });

        let error = result.unwrap_err();
        assert!(matches!(error, PipelineError::NoVideo(_)));
        assert_eq!(error.exit_code(), 3);
        assert!(!opened.get());
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn decoder_init_failure_closes_source() {
        let source = FakeSource::new(av_streams(), clip(3, 3));
        let closes = source.closes.clone();

        let mut pipeline = pipeline(source, PipelineSettings::default());
        let result = pipeline.run(|descriptor, _| -> Result<Decoder<SyntheticBackend>, _> {
            Err(InitError::UnsupportedCodec(descriptor.codec_name.clone()))
        });

        assert_eq!(result.unwrap_err().exit_code(), 4);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn read_failure_tears_down_in_order() {
        let source = FakeSource::new(av_streams(), clip(4, 3))
            .fail_with(TransportError::Read("connection reset by peer".to_string()));
        let closes = source.closes.clone();
        let backend = SyntheticBackend::new();
        let probe = backend.probe();

        let mut pipeline = pipeline(source, PipelineSettings::default());
        let error = run_synthetic(&mut pipeline, backend).unwrap_err();

        assert!(matches!(error, PipelineError::Transport(_)));
        assert_eq!(error.exit_code(), 2);
        assert_eq!(pipeline.sink.len(), 4);
        assert_eq!(pipeline.summary.frames_written, 4);
        // No drain on error, but both ends are released
        assert!(!probe.eof_sent());
        assert_eq!(probe.close_count(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn stops_at_frame_limit() {
        let settings = PipelineSettings {
            max_frames: Some(3),
            ..PipelineSettings::default()
        };
        let backend = SyntheticBackend::new();
        let probe = backend.probe();

        let mut pipeline = pipeline(FakeSource::new(av_streams(), clip(10, 3)), settings);
        let summary = run_synthetic(&mut pipeline, backend).unwrap();

        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.packets_read, 3);
        assert_eq!(pipeline.sink.len(), 3);
        assert_eq!(probe.close_count(), 1);
    }

    #[test]
    fn full_codec_buffer_is_retried_once() {
        let backend = SyntheticBackend::with_capacity(0);
        let probe = backend.probe();

        let mut pipeline = pipeline(
            FakeSource::new(av_streams(), clip(5, 1)),
            PipelineSettings::default(),
        );
        let summary = run_synthetic(&mut pipeline, backend).unwrap();

        assert_eq!(summary.packets_submitted, 0);
        assert_eq!(summary.packets_skipped, 5);
        assert_eq!(summary.decoder.rejected, 10);
        assert!(probe.submitted().is_empty());
    }

    #[test]
    fn corrupt_packet_is_absorbed() {
        let mut packets = clip(6, 2);
        packets[2] = corrupt_packet(6000);
        let backend = SyntheticBackend::new();

        let mut pipeline = pipeline(
            FakeSource::new(av_streams(), packets),
            PipelineSettings::default(),
        );
        let summary = run_synthetic(&mut pipeline, backend).unwrap();

        assert_eq!(summary.decode_errors, 1);
        // The non-key packet after the corrupt key waits for the next key
        assert_eq!(summary.packets_skipped, 1);
        assert_eq!(summary.frames_written, 4);

        let pts: Vec<i64> = pipeline
            .sink
            .frames()
            .filter_map(|(_, frame)| frame.pts.map(|pts| pts.0))
            .collect();
        assert_eq!(pts, vec![0, 3000, 12000, 15000]);
    }

    #[test]
    fn resolution_change_is_fatal() {
        let mut packets = clip(3, 3);
        packets.push(encode_colour_packet(0, 320, 240, RED, 9000, true));
        let source = FakeSource::new(av_streams(), packets);
        let closes = source.closes.clone();
        let backend = SyntheticBackend::new();
        let probe = backend.probe();

        let mut pipeline = pipeline(source, PipelineSettings::default());
        let error = run_synthetic(&mut pipeline, backend).unwrap_err();

        assert!(matches!(
            error,
            PipelineError::Decode(DecodeError::ResolutionChanged { .. })
        ));
        assert_eq!(error.exit_code(), 6);
        assert_eq!(pipeline.sink.len(), 3);
        assert_eq!(probe.close_count(), 1);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn unsupported_target_format_is_fatal() {
        let settings = PipelineSettings {
            target_format: PixelFormat::Rgba,
            ..PipelineSettings::default()
        };

        let mut pipeline = pipeline(FakeSource::new(av_streams(), clip(3, 3)), settings);
        let error = run_synthetic(&mut pipeline, SyntheticBackend::new()).unwrap_err();

        assert!(matches!(error, PipelineError::Conversion(_)));
        assert_eq!(error.exit_code(), 5);
        assert!(pipeline.sink.is_empty());
    }

    #[test]
    fn scales_to_requested_size() {
        let settings = PipelineSettings {
            target_format: PixelFormat::Rgb24,
            target_width: 320,
            target_height: 240,
            ..PipelineSettings::default()
        };

        let mut pipeline = pipeline(FakeSource::new(av_streams(), clip(4, 2)), settings);
        run_synthetic(&mut pipeline, SyntheticBackend::new()).unwrap();

        let frame = pipeline.sink.latest().unwrap();
        assert_eq!((frame.width, frame.height, frame.stride), (320, 240, 960));
        assert_eq!(frame.format, PixelFormat::Rgb24);
        // Mostly red after conversion
        let [r, g, b] = frame.pixel(160, 120).unwrap();
        assert!(r > 200 && g < 60 && b < 60, "got {r},{g},{b}");
    }

    #[test]
    fn corrupt_picture_while_draining_keeps_flushing() {
        let mut pipeline = pipeline(
            FakeSource::new(av_streams(), clip(5, 1)),
            PipelineSettings::default(),
        );
        let summary = pipeline
            .run(|descriptor, options| {
                Decoder::with_backend(DelayedBackend::new(2), descriptor, options)
            })
            .unwrap();

        assert_eq!(summary.packets_submitted, 5);
        assert_eq!(summary.decode_errors, 1);
        assert_eq!(summary.frames_written, 5);

        let pts: Vec<i64> = pipeline
            .sink
            .frames()
            .filter_map(|(_, frame)| frame.pts.map(|pts| pts.0))
            .collect();
        assert_eq!(pts, vec![0, 3000, 6000, 9000, 12000]);
    }

    #[test]
    fn second_run_reports_closed_source() {
        let mut pipeline = pipeline(
            FakeSource::new(av_streams(), clip(2, 1)),
            PipelineSettings::default(),
        );
        run_synthetic(&mut pipeline, SyntheticBackend::new()).unwrap();

        let error = run_synthetic(&mut pipeline, SyntheticBackend::new()).unwrap_err();
        assert!(matches!(
            error,
            PipelineError::Transport(TransportError::Closed)
        ));
        assert_eq!(pipeline.source.closes.get(), 2);
    }
}
