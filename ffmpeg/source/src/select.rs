/*!
    Stream selection.
*/

use ffmpeg_types::StreamDescriptor;

use crate::NoVideoStream;

/**
    Picks the stream to decode: the first descriptor whose media kind is video.
*/
pub fn select_video(descriptors: &[StreamDescriptor]) -> Result<&StreamDescriptor, NoVideoStream> {
    descriptors
        .iter()
        .find(|descriptor| descriptor.is_video())
        .ok_or(NoVideoStream)
}
