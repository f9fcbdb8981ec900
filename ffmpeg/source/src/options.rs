/*!
    Translation of session options into FFmpeg demuxer and protocol options.
*/

use ffmpeg_types::{SessionOptions, TransportMode};

/**
    Returns the FFmpeg options used to open `locator` with `options`.

    RTSP locators get `rtsp_transport` and the RTSP socket `timeout`; other
    network protocols get the generic `rw_timeout`. Local files get nothing.
    Timestamp smoothing, error tolerance and frame skipping are applied by the
    decoder, not the demuxer.
*/
pub fn demuxer_options(locator: &str, options: &SessionOptions) -> Vec<(&'static str, String)> {
    let mut entries = Vec::new();
    let scheme = scheme(locator);

    match scheme.as_deref() {
        Some("rtsp" | "rtsps") => {
            let transport = match options.transport_mode {
                TransportMode::Reliable => "tcp",
                TransportMode::Unreliable => "udp",
            };
            entries.push(("rtsp_transport", transport.to_string()));
            if options.io_timeout_micros > 0 {
                entries.push(("timeout", options.io_timeout_micros.to_string()));
            }
        }
        Some("file") | None => {}
        Some(_) => {
            if options.io_timeout_micros > 0 {
                entries.push(("rw_timeout", options.io_timeout_micros.to_string()));
            }
        }
    }

    entries
}

/**
    Lowercased URL scheme of `locator`, if it has one.
*/
pub(crate) fn scheme(locator: &str) -> Option<String> {
    let (scheme, _) = locator.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}
