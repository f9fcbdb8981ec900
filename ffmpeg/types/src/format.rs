/*!
    Pixel format types.
*/

use serde::{Deserialize, Serialize};

/**
    Video pixel formats.

    This is the subset of formats decoders commonly hand out for network camera
    streams, plus the packed formats the converter produces. Not all FFmpeg
    pixel formats are represented.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (most common video format)
    Yuv420p,
    /// Planar YUV 4:2:0, full range (MJPEG cameras)
    Yuvj420p,
    /// Planar YUV 4:2:2, 16bpp
    Yuv422p,
    /// Planar YUV 4:2:2, full range
    Yuvj422p,
    /// Planar YUV 4:4:4, 24bpp
    Yuv444p,
    /// Planar YUV 4:4:4, full range
    Yuvj444p,
    /// Planar YUV 4:2:0, 10-bit little-endian
    #[serde(alias = "yuv420p10le")]
    Yuv420p10,
    /// Semi-planar YUV 4:2:0, 12bpp
    Nv12,
    /// Semi-planar YUV 4:2:0, 10-bit little-endian
    P010le,
    /// Single 8-bit luma plane
    #[serde(alias = "gray")]
    Gray8,
    /// Packed RGB, 24bpp
    #[serde(alias = "rgb")]
    Rgb24,
    /// Packed BGR, 24bpp
    #[serde(alias = "bgr")]
    Bgr24,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed BGRA, 32bpp
    Bgra,
}

/**
    Geometry of one plane of a picture: bytes of pixel data per row
    (excluding any stride padding) and number of rows.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    pub row_bytes: usize,
    pub rows: usize,
}

impl PixelFormat {
    /**
        Returns the number of bits per pixel for this format.

        For planar formats, this is the average bits per pixel.
    */
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Gray8 => 8,
            Self::Yuv420p | Self::Yuvj420p | Self::Nv12 => 12,
            Self::Yuv420p10 | Self::P010le => 15, // 10 bits * 1.5 planes average
            Self::Yuv422p | Self::Yuvj422p => 16,
            Self::Rgb24 | Self::Bgr24 | Self::Yuv444p | Self::Yuvj444p => 24,
            Self::Bgra | Self::Rgba => 32,
        }
    }

    /**
        Returns true if this is a planar format.
    */
    pub const fn is_planar(self) -> bool {
        match self {
            Self::Yuv420p
            | Self::Yuvj420p
            | Self::Yuv422p
            | Self::Yuvj422p
            | Self::Yuv444p
            | Self::Yuvj444p
            | Self::Yuv420p10
            | Self::Gray8 => true,
            Self::Nv12 | Self::P010le => true, // semi-planar counts as planar
            Self::Bgra | Self::Rgba | Self::Rgb24 | Self::Bgr24 => false,
        }
    }

    /**
        Returns true for the fixed raster layouts the pipeline emits:
        three interleaved bytes per pixel.
    */
    pub const fn is_raster(self) -> bool {
        matches!(self, Self::Rgb24 | Self::Bgr24)
    }

    /**
        Returns the per-plane geometry of a `width` x `height` picture.

        Chroma dimensions round up, so odd-sized pictures keep their last
        column and row of chroma samples.
    */
    pub fn plane_layout(self, width: u32, height: u32) -> Vec<PlaneLayout> {
        let w = width as usize;
        let h = height as usize;
        let half_w = w.div_ceil(2);
        let half_h = h.div_ceil(2);
        let plane = |row_bytes, rows| PlaneLayout { row_bytes, rows };

        match self {
            Self::Yuv420p | Self::Yuvj420p => {
                vec![plane(w, h), plane(half_w, half_h), plane(half_w, half_h)]
            }
            Self::Yuv420p10 => vec![
                plane(w * 2, h),
                plane(half_w * 2, half_h),
                plane(half_w * 2, half_h),
            ],
            Self::Yuv422p | Self::Yuvj422p => {
                vec![plane(w, h), plane(half_w, h), plane(half_w, h)]
            }
            Self::Yuv444p | Self::Yuvj444p => vec![plane(w, h), plane(w, h), plane(w, h)],
            Self::Nv12 => vec![plane(w, h), plane(half_w * 2, half_h)],
            Self::P010le => vec![plane(w * 2, h), plane(half_w * 4, half_h)],
            Self::Gray8 => vec![plane(w, h)],
            Self::Rgb24 | Self::Bgr24 => vec![plane(w * 3, h)],
            Self::Rgba | Self::Bgra => vec![plane(w * 4, h)],
        }
    }

    /**
        Lowercase name, matching FFmpeg's naming for the same format.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuvj420p => "yuvj420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuvj422p => "yuvj422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuvj444p => "yuvj444p",
            Self::Yuv420p10 => "yuv420p10le",
            Self::Nv12 => "nv12",
            Self::P010le => "p010le",
            Self::Gray8 => "gray",
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = crate::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bgr24" | "bgr" => Ok(Self::Bgr24),
            "rgb24" | "rgb" => Ok(Self::Rgb24),
            "rgba" => Ok(Self::Rgba),
            "bgra" => Ok(Self::Bgra),
            "yuv420p" => Ok(Self::Yuv420p),
            "nv12" => Ok(Self::Nv12),
            "gray" | "gray8" => Ok(Self::Gray8),
            _ => Err(crate::ParseError::new(
                "pixel format",
                s,
                "bgr24, rgb24, rgba, bgra, yuv420p, nv12, gray",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_bits_per_pixel() {
        assert_eq!(PixelFormat::Yuv420p.bits_per_pixel(), 12);
        assert_eq!(PixelFormat::Bgra.bits_per_pixel(), 32);
        assert_eq!(PixelFormat::Bgr24.bits_per_pixel(), 24);
    }

    #[test]
    fn pixel_format_is_planar() {
        assert!(PixelFormat::Yuv420p.is_planar());
        assert!(PixelFormat::Nv12.is_planar());
        assert!(!PixelFormat::Bgra.is_planar());
        assert!(!PixelFormat::Rgb24.is_planar());
    }

    #[test]
    fn only_three_byte_packed_formats_are_raster() {
        assert!(PixelFormat::Bgr24.is_raster());
        assert!(PixelFormat::Rgb24.is_raster());
        assert!(!PixelFormat::Bgra.is_raster());
        assert!(!PixelFormat::Yuv420p.is_raster());
    }

    #[test]
    fn yuv420p_layout_rounds_chroma_up() {
        let planes = PixelFormat::Yuv420p.plane_layout(5, 3);
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[0], PlaneLayout { row_bytes: 5, rows: 3 });
        assert_eq!(planes[1], PlaneLayout { row_bytes: 3, rows: 2 });
        assert_eq!(planes[2], PlaneLayout { row_bytes: 3, rows: 2 });
    }

    #[test]
    fn packed_layout_is_single_plane() {
        let planes = PixelFormat::Bgr24.plane_layout(640, 480);
        assert_eq!(planes, vec![PlaneLayout { row_bytes: 1920, rows: 480 }]);
    }

    #[test]
    fn parse_target_formats() {
        assert_eq!("BGR24".parse::<PixelFormat>(), Ok(PixelFormat::Bgr24));
        assert_eq!("rgb".parse::<PixelFormat>(), Ok(PixelFormat::Rgb24));
        assert!("xyz".parse::<PixelFormat>().is_err());
    }
}
