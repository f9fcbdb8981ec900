/*!
    Sinks that encode frames as image files.
*/

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};

use ffmpeg_types::RasterFrame;

use crate::error::SinkError;
use crate::sink::FrameSink;

/**
    Encode a raster frame in `format`.
*/
fn encode(frame: &RasterFrame, format: ImageFormat) -> Result<Vec<u8>, SinkError> {
    let expected = frame.stride * frame.height as usize;
    if frame.stride != frame.width as usize * 3 || frame.data.len() != expected {
        return Err(SinkError::InvalidFrame(format!(
            "{}x{} frame with stride {} holds {} bytes",
            frame.width,
            frame.height,
            frame.stride,
            frame.data.len()
        )));
    }

    let image = RgbImage::from_raw(frame.width, frame.height, frame.to_rgb())
        .ok_or_else(|| SinkError::InvalidFrame("buffer does not match dimensions".to_string()))?;

    let mut encoded = Cursor::new(Vec::new());
    image.write_to(&mut encoded, format)?;
    Ok(encoded.into_inner())
}

fn format_for(path: &Path) -> Result<ImageFormat, SinkError> {
    ImageFormat::from_path(path).map_err(|_| SinkError::UnknownFormat(path.to_path_buf()))
}

/**
    Writes every frame to the same image file, replacing the previous one.

    The image format follows the file extension. Each frame is written to a
    sibling temporary file first and renamed over the target, so readers
    never observe a partially written image.
*/
#[derive(Debug)]
pub struct ImageFileSink {
    path: PathBuf,
    partial: PathBuf,
    format: ImageFormat,
}

impl ImageFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let format = format_for(&path)?;

        let mut partial = path.clone().into_os_string();
        partial.push(".part");

        Ok(Self {
            path,
            partial: PathBuf::from(partial),
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for ImageFileSink {
    fn write_frame(&mut self, number: u64, frame: &RasterFrame) -> Result<(), SinkError> {
        let encoded = encode(frame, self.format)?;
        fs::write(&self.partial, encoded)?;
        fs::rename(&self.partial, &self.path)?;

        tracing::info!("Frame {} saved", number);
        Ok(())
    }
}

/**
    Writes each frame to its own numbered image file in a directory.
*/
#[derive(Debug)]
pub struct ImageSequenceSink {
    directory: PathBuf,
    prefix: String,
    extension: String,
    format: ImageFormat,
}

impl ImageSequenceSink {
    /**
        Create a sink writing `<prefix>-<number>.<extension>` files into
        `directory`, creating the directory if needed.
    */
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: &str,
        extension: &str,
    ) -> Result<Self, SinkError> {
        let directory = directory.into();
        let format = ImageFormat::from_extension(extension)
            .ok_or_else(|| SinkError::UnknownFormat(PathBuf::from(format!("*.{extension}"))))?;

        fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            prefix: prefix.to_string(),
            extension: extension.to_string(),
            format,
        })
    }

    /**
        Path of the file frame `number` is written to.
    */
    pub fn frame_path(&self, number: u64) -> PathBuf {
        self.directory
            .join(format!("{}-{:06}.{}", self.prefix, number, self.extension))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, number: u64, frame: &RasterFrame) -> Result<(), SinkError> {
        let path = self.frame_path(number);
        fs::write(&path, encode(frame, self.format)?)?;

        tracing::info!(path = %path.display(), "Frame {} saved", number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ffmpeg_types::{PixelFormat, Rational};

    use super::*;

    fn solid(width: u32, height: u32, bgr: [u8; 3]) -> RasterFrame {
        RasterFrame {
            data: bgr.repeat((width * height) as usize),
            width,
            height,
            stride: width as usize * 3,
            format: PixelFormat::Bgr24,
            pts: None,
            time_base: Rational::default(),
        }
    }

    #[test]
    fn overwrites_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut sink = ImageFileSink::new(&path).unwrap();

        sink.write_frame(1, &solid(8, 4, [255, 0, 0])).unwrap();
        sink.write_frame(2, &solid(8, 4, [0, 0, 255])).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (8, 4));
        // Last frame wins; BGR red is stored as RGB red
        assert_eq!(image.get_pixel(3, 2).0, [255, 0, 0]);

        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn writes_jpeg_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let mut sink = ImageFileSink::new(&path).unwrap();

        sink.write_frame(1, &solid(16, 16, [40, 80, 120])).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let result = ImageFileSink::new("frame.unknown");
        assert!(matches!(result, Err(SinkError::UnknownFormat(_))));
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path().join("frame.png")).unwrap();
        let mut frame = solid(4, 4, [0, 0, 0]);
        frame.data.truncate(10);

        assert!(matches!(
            sink.write_frame(1, &frame),
            Err(SinkError::InvalidFrame(_))
        ));
    }

    #[test]
    fn sequence_numbers_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new(dir.path().join("out"), "frame", "png").unwrap();

        for number in 1..=3 {
            sink.write_frame(number, &solid(4, 4, [0, 255, 0])).unwrap();
        }

        for number in 1..=3 {
            assert!(sink.frame_path(number).exists());
        }
        assert_eq!(
            sink.frame_path(2).file_name().unwrap(),
            "frame-000002.png"
        );
    }
}
