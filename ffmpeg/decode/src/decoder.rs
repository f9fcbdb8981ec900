/*!
    The decoder state machine.
*/

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ffmpeg_types::{
    DecodedPicture, FrameSkipPolicy, Packet, PixelFormat, Pts, Rational, StreamDescriptor,
    VsyncPolicy,
};

use crate::backend::{BackendError, DecodeBackend, FrameView, SendStatus};
use crate::config::DecoderOptions;
use crate::error::{DecodeError, InitError};

/**
    Lifecycle of a [`Decoder`].

    A decoder starts `Ready`, is `Decoding` while submitted packets may still
    produce pictures, returns to `Ready` once a poll finds nothing more,
    enters `Draining` on [`Decoder::drain`] and is `Closed` after a fatal
    error.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    Ready,
    Decoding,
    Draining,
    Closed,
}

/**
    Outcome of [`Decoder::submit`].
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum Submit {
    Accepted,
    Rejected(RejectReason),
}

/**
    Why a packet was not handed to the codec. None of these are errors.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The codec has undelivered pictures. Poll, then submit the packet again.
    BufferFull,
    /// Non-key packet dropped while waiting for a key packet.
    AwaitingKeyFrame,
    /// Non-key packet dropped under [`FrameSkipPolicy::KeyOnly`].
    NotKeyFrame,
    EmptyPacket,
    /// The decoder no longer accepts input.
    Draining,
}

/**
    Outcome of [`Decoder::poll`].
*/
#[derive(Debug)]
#[must_use]
pub enum Poll<'a> {
    Picture(DecodedPicture<'a>),
    NoOutputYet,
}

/**
    Counters kept over the decoder's lifetime.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Packets accepted by the codec.
    pub submitted: u64,
    /// Packets rejected before reaching the codec.
    pub rejected: u64,
    /// Corrupt packets absorbed or escalated.
    pub corrupt: u64,
    /// Pictures handed out by `poll`.
    pub emitted: u64,
    /// Pictures dropped because their timestamp did not advance.
    pub dropped: u64,
}

/// A frame waiting in the reorder buffer, ordered by pts then arrival.
struct Pending<F> {
    pts: Option<i64>,
    sequence: u64,
    frame: F,
}

impl<F> PartialEq for Pending<F> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<F> Eq for Pending<F> {}

impl<F> PartialOrd for Pending<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F> Ord for Pending<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.pts, self.sequence).cmp(&(other.pts, other.sequence))
    }
}

/**
    Stateful video decoder for one elementary stream.

    Packets go in through [`submit`](Self::submit) and pictures come out of
    [`poll`](Self::poll), which must be called until it reports
    [`Poll::NoOutputYet`] after every submit. A picture borrows the decoder,
    so it has to be consumed before the decoder is used again.

    # Example

    ```ignore
    let mut decoder = Decoder::initialize(descriptor, DecoderOptions::default())?;
    decoder.submit(&packet)?;
    while let Poll::Picture(picture) = decoder.poll()? {
        println!("{}x{} at {:?}", picture.width, picture.height, picture.pts);
    }
    ```
*/
pub struct Decoder<B: DecodeBackend> {
    backend: B,
    state: DecoderState,
    options: DecoderOptions,
    stream_index: usize,
    time_base: Rational,
    /// Picture dimensions, fixed by the descriptor or the first picture.
    dimensions: Option<(u32, u32)>,
    /// A key packet has been accepted since start or the last corruption.
    synced: bool,
    consecutive_errors: u32,
    reorder: BinaryHeap<Reverse<Pending<B::Frame>>>,
    sequence: u64,
    last_emitted: Option<i64>,
    /// Set once the backend has delivered everything after `drain`.
    exhausted: bool,
    /// Output slot borrowed by the picture returned from `poll`.
    current: Option<B::Frame>,
    stats: DecoderStats,
}

impl<B: DecodeBackend> Decoder<B> {
    /**
        Build a decoder for the stream described by `descriptor` over an
        already opened backend.
    */
    pub fn with_backend(
        backend: B,
        descriptor: &StreamDescriptor,
        options: DecoderOptions,
    ) -> Result<Self, InitError> {
        if !descriptor.is_video() {
            return Err(InitError::NotVideo {
                index: descriptor.index,
            });
        }

        let params = &descriptor.params;
        let dimensions = (params.width > 0 && params.height > 0)
            .then_some((params.width, params.height));

        tracing::debug!(
            stream = descriptor.index,
            codec = %descriptor.codec_name,
            ?dimensions,
            ?options,
            "decoder ready"
        );

        Ok(Self {
            backend,
            state: DecoderState::Ready,
            options,
            stream_index: descriptor.index,
            time_base: params.time_base,
            dimensions,
            synced: false,
            consecutive_errors: 0,
            reorder: BinaryHeap::new(),
            sequence: 0,
            last_emitted: None,
            exhausted: false,
            current: None,
            stats: DecoderStats::default(),
        })
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /**
        Picture dimensions, once known.
    */
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /**
        Hand a compressed packet to the decoder.

        Returns `Submit::Rejected` when the packet was not passed to the codec
        (frame skip policy, full codec buffer, draining); the caller decides
        whether to resubmit. A corrupt packet is reported as a non-fatal
        [`DecodeError::Corrupt`] unless it exhausts the error tolerance.
    */
    pub fn submit(&mut self, packet: &Packet) -> Result<Submit, DecodeError> {
        match self.state {
            DecoderState::Closed => return Err(DecodeError::Closed),
            DecoderState::Draining => return Ok(self.reject(RejectReason::Draining)),
            DecoderState::Ready | DecoderState::Decoding => {}
        }

        if packet.is_empty() {
            return Ok(self.reject(RejectReason::EmptyPacket));
        }

        match self.options.frame_skip {
            FrameSkipPolicy::KeyOnly if !packet.is_key => {
                return Ok(self.reject(RejectReason::NotKeyFrame));
            }
            FrameSkipPolicy::NonKeyOnly if !self.synced && !packet.is_key => {
                return Ok(self.reject(RejectReason::AwaitingKeyFrame));
            }
            _ => {}
        }

        if self.time_base.is_unset() {
            self.time_base = packet.time_base;
        }

        match self.backend.send_packet(packet) {
            Ok(SendStatus::Accepted) => {
                if packet.is_key {
                    self.synced = true;
                }
                self.stats.submitted += 1;
                self.state = DecoderState::Decoding;
                tracing::trace!(
                    stream = self.stream_index,
                    pts = ?packet.pts,
                    key = packet.is_key,
                    size = packet.len(),
                    "packet submitted"
                );
                Ok(Submit::Accepted)
            }
            Ok(SendStatus::Full) => Ok(self.reject(RejectReason::BufferFull)),
            Err(BackendError::Corrupt(reason)) => Err(self.corrupt(reason)),
            Err(BackendError::Fatal(reason)) => Err(self.fail(DecodeError::Backend(reason))),
        }
    }

    /**
        Take the next decoded picture, if one is ready.

        The returned picture borrows the decoder's output slot until it is
        dropped.
    */
    pub fn poll(&mut self) -> Result<Poll<'_>, DecodeError> {
        if self.state == DecoderState::Closed {
            return Err(DecodeError::Closed);
        }

        // Release the previous picture
        self.current = None;

        let (frame, format) = loop {
            if let Some(frame) = self.pop_reordered() {
                match self.admit(&frame)? {
                    Some(format) => break (frame, format),
                    None => continue,
                }
            }

            if self.exhausted {
                return Ok(Poll::NoOutputYet);
            }

            match self.backend.receive_frame() {
                Ok(Some(frame)) => self.enqueue(frame),
                Ok(None) if self.state == DecoderState::Draining => self.exhausted = true,
                Ok(None) => {
                    self.state = DecoderState::Ready;
                    return Ok(Poll::NoOutputYet);
                }
                Err(BackendError::Corrupt(reason)) => return Err(self.corrupt(reason)),
                Err(BackendError::Fatal(reason)) => {
                    return Err(self.fail(DecodeError::Backend(reason)));
                }
            }
        };

        let time_base = self.time_base;
        let frame: &B::Frame = self.current.insert(frame);

        Ok(Poll::Picture(DecodedPicture {
            width: frame.width(),
            height: frame.height(),
            format,
            pts: frame.pts().map(Pts),
            time_base,
            key_frame: frame.is_key(),
            planes: frame.planes(),
        }))
    }

    /**
        Signal end of input. Later polls flush the pictures the codec and the
        reorder buffer still hold, then report `NoOutputYet`.
    */
    pub fn drain(&mut self) -> Result<(), DecodeError> {
        match self.state {
            DecoderState::Closed => Err(DecodeError::Closed),
            DecoderState::Draining => Ok(()),
            DecoderState::Ready | DecoderState::Decoding => {
                self.state = DecoderState::Draining;
                tracing::debug!(stream = self.stream_index, "draining decoder");
                self.backend
                    .send_eof()
                    .map_err(|e| self.fail(DecodeError::Backend(e.to_string())))
            }
        }
    }

    /**
        Release the decoder and its codec.
    */
    pub fn close(mut self) {
        self.current = None;
        self.reorder.clear();
        self.backend.close();
        tracing::debug!(
            stream = self.stream_index,
            submitted = self.stats.submitted,
            rejected = self.stats.rejected,
            corrupt = self.stats.corrupt,
            emitted = self.stats.emitted,
            dropped = self.stats.dropped,
            "decoder closed"
        );
    }

    fn reject(&mut self, reason: RejectReason) -> Submit {
        self.stats.rejected += 1;
        tracing::trace!(stream = self.stream_index, ?reason, "packet rejected");
        Submit::Rejected(reason)
    }

    fn corrupt(&mut self, reason: String) -> DecodeError {
        self.consecutive_errors += 1;
        self.stats.corrupt += 1;
        self.synced = false;

        if let Some(max) = self.options.error_tolerance.max_consecutive_errors()
            && self.consecutive_errors > max
        {
            return self.fail(DecodeError::ToleranceExceeded {
                count: self.consecutive_errors,
            });
        }

        tracing::warn!(
            stream = self.stream_index,
            consecutive = self.consecutive_errors,
            "corrupt packet: {}",
            reason
        );
        DecodeError::Corrupt(reason)
    }

    fn fail(&mut self, error: DecodeError) -> DecodeError {
        tracing::error!(stream = self.stream_index, "decoder failed: {}", error);
        self.state = DecoderState::Closed;
        self.current = None;
        self.reorder.clear();
        error
    }

    fn enqueue(&mut self, frame: B::Frame) {
        self.sequence += 1;
        self.reorder.push(Reverse(Pending {
            pts: frame.pts(),
            sequence: self.sequence,
            frame,
        }));
    }

    fn pop_reordered(&mut self) -> Option<B::Frame> {
        let ready = self.reorder.len() > self.options.reorder_depth
            || (self.exhausted && !self.reorder.is_empty());
        if !ready {
            return None;
        }
        self.reorder.pop().map(|Reverse(pending)| pending.frame)
    }

    /**
        Check a frame against the stream's fixed geometry and the vsync
        policy. Returns its pixel format if it is to be emitted, `None` if it
        is dropped.
    */
    fn admit(&mut self, frame: &B::Frame) -> Result<Option<PixelFormat>, DecodeError> {
        let Some(format) = frame.format() else {
            return Err(self.fail(DecodeError::UnsupportedPixelFormat(frame.format_name())));
        };

        let found = (frame.width(), frame.height());
        match self.dimensions {
            None => self.dimensions = Some(found),
            Some(expected) if expected != found => {
                return Err(self.fail(DecodeError::ResolutionChanged {
                    expected_width: expected.0,
                    expected_height: expected.1,
                    found_width: found.0,
                    found_height: found.1,
                }));
            }
            Some(_) => {}
        }

        let pts = frame.pts();
        if self.options.vsync == VsyncPolicy::Vfr
            && let (Some(pts), Some(last)) = (pts, self.last_emitted)
            && pts <= last
        {
            self.stats.dropped += 1;
            tracing::debug!(stream = self.stream_index, pts, last, "dropped picture");
            return Ok(None);
        }

        if pts.is_some() {
            self.last_emitted = pts;
        }
        self.consecutive_errors = 0;
        self.stats.emitted += 1;
        Ok(Some(format))
    }
}

impl<B: DecodeBackend> std::fmt::Debug for Decoder<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("state", &self.state)
            .field("stream_index", &self.stream_index)
            .field("dimensions", &self.dimensions)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
