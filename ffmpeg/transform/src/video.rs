/*!
    Conversion of decoded pictures into raster frames.
*/

use ffmpeg_next::{
    software::scaling::{
        context::Context as ScalerContext, flag::Flags as ScalerFlags, support as scaler_support,
    },
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ffmpeg_source::convert::pixel_format_to_ffmpeg;
use ffmpeg_types::{DecodedPicture, PixelFormat, RasterFrame};

use crate::error::ConversionError;

/**
    Scaling algorithm for video resizing.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    /// Nearest neighbor - fastest, lowest quality.
    Nearest,
    /// Bilinear interpolation - fast, acceptable quality.
    #[default]
    Bilinear,
    /// Bicubic interpolation - moderate speed, good quality.
    Bicubic,
    /// Lanczos resampling - slowest, highest quality.
    Lanczos,
}

impl ScalingAlgorithm {
    fn to_ffmpeg_flags(self) -> ScalerFlags {
        match self {
            Self::Nearest => ScalerFlags::POINT,
            Self::Bilinear => ScalerFlags::BILINEAR,
            Self::Bicubic => ScalerFlags::BICUBIC,
            Self::Lanczos => ScalerFlags::LANCZOS,
        }
    }
}

/// Everything a scaler context is specific to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScalerKey {
    src_format: PixelFormat,
    src_width: u32,
    src_height: u32,
    dst_format: PixelFormat,
    dst_width: u32,
    dst_height: u32,
}

struct ScalerState {
    context: ScalerContext,
    key: ScalerKey,
}

/**
    Converts decoded pictures to packed raster frames.

    Handles:
    - Pixel format conversion (YUV to BGR/RGB, etc.)
    - Scaling to a requested output size
    - Stride handling

    The scaler context is created on first use and reused while the source
    layout, source size, target format and target size stay the same. Any
    change rebuilds it.
*/
#[derive(Default)]
pub struct PixelConverter {
    algorithm: ScalingAlgorithm,
    scaler_state: Option<ScalerState>,
    scaler_builds: u64,
}

impl PixelConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(algorithm: ScalingAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn algorithm(&self) -> ScalingAlgorithm {
        self.algorithm
    }

    /**
        Number of scaler contexts created so far.
    */
    pub fn scaler_builds(&self) -> u64 {
        self.scaler_builds
    }

    /**
        Convert `picture` to `target_format` at `target_width` x
        `target_height`.

        A target dimension of 0 keeps the picture's own size. A picture of a
        different size than the target is resampled, never rejected.
    */
    pub fn convert(
        &mut self,
        picture: &DecodedPicture<'_>,
        target_format: PixelFormat,
        target_width: u32,
        target_height: u32,
    ) -> Result<RasterFrame, ConversionError> {
        if !target_format.is_raster() {
            return Err(ConversionError::UnsupportedTarget(target_format));
        }

        picture.validate().map_err(ConversionError::InvalidPicture)?;

        let dst_width = if target_width == 0 {
            picture.width
        } else {
            target_width
        };
        let dst_height = if target_height == 0 {
            picture.height
        } else {
            target_height
        };

        // Already in the target layout: repack rows, no scaler needed
        if picture.format == target_format && (dst_width, dst_height) == (picture.width, picture.height)
        {
            return Ok(copy_raster(picture));
        }

        if !scaler_support::input(pixel_format_to_ffmpeg(picture.format)) {
            return Err(ConversionError::UnsupportedSource(picture.format));
        }

        let key = ScalerKey {
            src_format: picture.format,
            src_width: picture.width,
            src_height: picture.height,
            dst_format: target_format,
            dst_width,
            dst_height,
        };

        let needs_init = self
            .scaler_state
            .as_ref()
            .is_none_or(|state| state.key != key);

        if needs_init {
            self.init_scaler(key)?;
        }

        self.scale_picture(picture)
    }

    /**
        Initialize or reinitialize the scaler for `key`.
    */
    fn init_scaler(&mut self, key: ScalerKey) -> Result<(), ConversionError> {
        let context = ScalerContext::get(
            pixel_format_to_ffmpeg(key.src_format),
            key.src_width,
            key.src_height,
            pixel_format_to_ffmpeg(key.dst_format),
            key.dst_width,
            key.dst_height,
            self.algorithm.to_ffmpeg_flags(),
        )
        .map_err(|e| ConversionError::Scaler(format!("failed to create scaler: {}", e)))?;

        tracing::debug!(
            src = %format_args!("{}x{} {}", key.src_width, key.src_height, key.src_format),
            dst = %format_args!("{}x{} {}", key.dst_width, key.dst_height, key.dst_format),
            algorithm = ?self.algorithm,
            "scaler initialized"
        );

        self.scaler_state = Some(ScalerState { context, key });
        self.scaler_builds += 1;
        Ok(())
    }

    /**
        Scale a picture using the initialized scaler.
    */
    fn scale_picture(
        &mut self,
        picture: &DecodedPicture<'_>,
    ) -> Result<RasterFrame, ConversionError> {
        let state = self
            .scaler_state
            .as_mut()
            .ok_or_else(|| ConversionError::Scaler("scaler not initialized".to_string()))?;
        let key = state.key;

        let mut src_frame = VideoFrameFFmpeg::new(
            pixel_format_to_ffmpeg(key.src_format),
            key.src_width,
            key.src_height,
        );
        copy_planes_to_ffmpeg_frame(&mut src_frame, picture);

        let mut dst_frame = VideoFrameFFmpeg::new(
            pixel_format_to_ffmpeg(key.dst_format),
            key.dst_width,
            key.dst_height,
        );

        state
            .context
            .run(&src_frame, &mut dst_frame)
            .map_err(|e| ConversionError::Scaler(format!("scaling failed: {}", e)))?;

        Ok(RasterFrame {
            data: copy_raster_from_ffmpeg_frame(&dst_frame),
            width: key.dst_width,
            height: key.dst_height,
            stride: key.dst_width as usize * 3,
            format: key.dst_format,
            pts: picture.pts,
            time_base: picture.time_base,
        })
    }
}

/**
    Copy a validated picture's planes into an FFmpeg frame of the same
    layout and size.
*/
fn copy_planes_to_ffmpeg_frame(dst: &mut VideoFrameFFmpeg, picture: &DecodedPicture<'_>) {
    let layout = picture.format.plane_layout(picture.width, picture.height);

    for (index, (plane, geometry)) in picture.planes.iter().zip(&layout).enumerate() {
        let dst_stride = dst.stride(index);
        let dst_data = dst.data_mut(index);

        for y in 0..geometry.rows {
            let src_start = y * plane.stride;
            let dst_start = y * dst_stride;
            dst_data[dst_start..dst_start + geometry.row_bytes]
                .copy_from_slice(&plane.data[src_start..src_start + geometry.row_bytes]);
        }
    }
}

/**
    Copy a packed 3-byte frame from FFmpeg to a contiguous buffer.
*/
fn copy_raster_from_ffmpeg_frame(frame: &VideoFrameFFmpeg) -> Vec<u8> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let row_bytes = width * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut output = Vec::with_capacity(row_bytes * height);
    for y in 0..height {
        let row_start = y * stride;
        output.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    output
}

/**
    Repack a picture that is already in a raster layout, dropping row padding.
*/
fn copy_raster(picture: &DecodedPicture<'_>) -> RasterFrame {
    let row_bytes = picture.width as usize * 3;
    let plane = &picture.planes[0];

    let mut data = Vec::with_capacity(row_bytes * picture.height as usize);
    for y in 0..picture.height as usize {
        let row_start = y * plane.stride;
        data.extend_from_slice(&plane.data[row_start..row_start + row_bytes]);
    }

    RasterFrame {
        data,
        width: picture.width,
        height: picture.height,
        stride: row_bytes,
        format: picture.format,
        pts: picture.pts,
        time_base: picture.time_base,
    }
}

impl std::fmt::Debug for PixelConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelConverter")
            .field("algorithm", &self.algorithm)
            .field("key", &self.scaler_state.as_ref().map(|state| state.key))
            .field("scaler_builds", &self.scaler_builds)
            .finish()
    }
}
