/*!
    Transport session implementation.
*/

use ffmpeg_next::{Dictionary, format::context::Input as InputContext};

use ffmpeg_types::{Packet, Rational, SessionOptions, StreamDescriptor};

use crate::convert::rational_from_ffmpeg;
use crate::error::TransportError;
use crate::options::{demuxer_options, scheme};
use crate::probe::describe_streams;

/**
    A producer of compressed packets with a fixed set of elementary streams.

    [`Session`] is the FFmpeg-backed implementation; the pipeline only
    depends on this trait.
*/
pub trait PacketSource {
    /**
        Describe the elementary streams the source carries, in index order.

        The result is computed once and is the same on every call.
    */
    fn discover_streams(&mut self) -> Result<&[StreamDescriptor], TransportError>;

    /**
        Read the next packet, of any stream.

        Returns `Ok(None)` at end of stream.
    */
    fn read_packet(&mut self) -> Result<Option<Packet>, TransportError>;

    /**
        Release the source. Calling it again is a no-op.
    */
    fn close(&mut self);
}

/**
    An open demuxing session on a stream locator.

    Created by [`Session::open`], which connects, negotiates the options in
    [`SessionOptions`] and reads stream information before returning.
    The session is closed when dropped, if not closed before.
*/
pub struct Session {
    locator: String,
    /// `None` once closed.
    input: Option<InputContext>,
    streams: Vec<StreamDescriptor>,
    time_bases: Vec<Rational>,
    packets_read: u64,
}

impl Session {
    /**
        Open a session on `locator`.

        # Example

        ```ignore
        let mut session = Session::open("rtsp://camera.local/stream", &SessionOptions::default())?;
        let streams = session.discover_streams()?;
        ```
    */
    pub fn open(locator: &str, options: &SessionOptions) -> Result<Self, TransportError> {
        validate_locator(locator)?;

        ffmpeg_next::init().map_err(|e| TransportError::Open {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        ffmpeg_next::format::network::init();

        let mut opts = Dictionary::new();
        for (key, value) in demuxer_options(locator, options) {
            opts.set(key, &value);
        }

        tracing::debug!(
            locator,
            transport = ?options.transport_mode,
            timeout_micros = options.io_timeout_micros,
            "opening session"
        );

        // Opens the input and reads stream information in one step
        let input = ffmpeg_next::format::input_with_dictionary(&locator, opts).map_err(|e| {
            TransportError::Open {
                locator: locator.to_string(),
                reason: e.to_string(),
            }
        })?;

        let streams = describe_streams(&input);
        let time_bases = input
            .streams()
            .map(|stream| rational_from_ffmpeg(stream.time_base()))
            .collect();

        tracing::info!(locator, streams = streams.len(), "session opened");

        Ok(Self {
            locator: locator.to_string(),
            input: Some(input),
            streams,
            time_bases,
            packets_read: 0,
        })
    }

    /**
        Print FFmpeg's description of the input to stderr.
    */
    pub fn dump_format(&self) -> Result<(), TransportError> {
        let input = self.input.as_ref().ok_or(TransportError::Closed)?;
        ffmpeg_next::format::context::input::dump(input, 0, Some(&self.locator));
        Ok(())
    }
}

impl PacketSource for Session {
    fn discover_streams(&mut self) -> Result<&[StreamDescriptor], TransportError> {
        if self.input.is_none() {
            return Err(TransportError::Closed);
        }
        if self.streams.is_empty() {
            return Err(TransportError::StreamInfo(format!(
                "{} advertises no elementary streams",
                self.locator
            )));
        }
        Ok(&self.streams)
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, TransportError> {
        let input = self.input.as_mut().ok_or(TransportError::Closed)?;

        // Packets::next() swallows read errors, so read directly
        let mut ffmpeg_packet = ffmpeg_next::Packet::empty();
        loop {
            match ffmpeg_packet.read(input) {
                Ok(()) => break,
                Err(ffmpeg_next::Error::Eof) => {
                    tracing::debug!(locator = %self.locator, "end of stream");
                    return Ok(None);
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::ffi::EAGAIN => {
                    continue;
                }
                Err(e) => return Err(TransportError::Read(e.to_string())),
            }
        }

        let stream_index = ffmpeg_packet.stream();
        let time_base = self
            .time_bases
            .get(stream_index)
            .copied()
            .unwrap_or_default();
        let data = ffmpeg_packet.data().map(|d| d.to_vec()).unwrap_or_default();

        self.packets_read += 1;

        Ok(Some(
            Packet::new(data, stream_index, time_base)
                .with_timestamps(ffmpeg_packet.pts(), ffmpeg_packet.dts())
                .with_duration(ffmpeg_packet.duration())
                .with_key(ffmpeg_packet.is_key()),
        ))
    }

    fn close(&mut self) {
        if self.input.take().is_some() {
            tracing::debug!(
                locator = %self.locator,
                packets = self.packets_read,
                "session closed"
            );
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/**
    Reject locators that cannot name a stream before handing them to FFmpeg.
*/
fn validate_locator(locator: &str) -> Result<(), TransportError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(TransportError::InvalidLocator("empty locator".to_string()));
    }
    if trimmed.len() != locator.len() {
        return Err(TransportError::InvalidLocator(format!(
            "{:?} has surrounding whitespace",
            locator
        )));
    }
    if let Some(scheme) = scheme(locator) {
        let rest = &locator[scheme.len() + 3..];
        if scheme != "file" && rest.is_empty() {
            return Err(TransportError::InvalidLocator(format!(
                "{} has no host",
                locator
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_locator_is_rejected() {
        let result = Session::open("", &SessionOptions::default());
        assert!(matches!(result, Err(TransportError::InvalidLocator(_))));
    }

    #[test]
    fn locator_without_host_is_rejected() {
        let result = Session::open("rtsp://", &SessionOptions::default());
        assert!(matches!(result, Err(TransportError::InvalidLocator(_))));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = std::env::temp_dir().join("ffmpeg-source-missing");
        let path = dir.join("does-not-exist.mkv");
        let locator = path.to_string_lossy().to_string();

        match Session::open(&locator, &SessionOptions::default()) {
            Err(TransportError::Open { locator: l, .. }) => assert_eq!(l, locator),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a file that does not exist"),
        }
    }
}
