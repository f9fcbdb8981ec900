/*!
    Decoded pictures and raster frames.
*/

use crate::{PixelFormat, Pts, Rational};

/**
    One plane of a decoded picture: the plane's bytes and the distance in
    bytes between the starts of consecutive rows.
*/
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

/**
    A decoded picture in the decoder's native layout.

    The planes borrow the decoder's output slot. While a `DecodedPicture` is
    alive the decoder cannot be submitted to or polled, so a picture is always
    fully consumed before the decoder may overwrite it.
*/
#[derive(Clone, Debug)]
pub struct DecodedPicture<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
    pub key_frame: bool,
    pub planes: Vec<Plane<'a>>,
}

impl DecodedPicture<'_> {
    /**
        Checks that every plane the format requires is present and large
        enough for the picture's dimensions.
    */
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("picture has zero dimensions".to_string());
        }

        let layout = self.format.plane_layout(self.width, self.height);
        if self.planes.len() < layout.len() {
            return Err(format!(
                "{} picture needs {} planes, got {}",
                self.format,
                layout.len(),
                self.planes.len()
            ));
        }

        for (index, (plane, geometry)) in self.planes.iter().zip(&layout).enumerate() {
            if plane.stride < geometry.row_bytes {
                return Err(format!(
                    "plane {} stride {} is shorter than a row ({} bytes)",
                    index, plane.stride, geometry.row_bytes
                ));
            }
            let needed = plane.stride * (geometry.rows - 1) + geometry.row_bytes;
            if plane.data.len() < needed {
                return Err(format!(
                    "plane {} holds {} bytes, needs {}",
                    index,
                    plane.data.len(),
                    needed
                ));
            }
        }

        Ok(())
    }
}

/**
    A fully decoded, converted frame ready to leave the pipeline.

    Always three interleaved bytes per pixel, row-major, with
    `stride == width * 3` and `data.len() == stride * height`.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
}

impl RasterFrame {
    /**
        Returns the three bytes of the pixel at (`x`, `y`), in the frame's
        channel order.
    */
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * 3;
        let bytes = self.data.get(offset..offset + 3)?;
        Some([bytes[0], bytes[1], bytes[2]])
    }

    /**
        Returns the pixel data in RGB channel order, swapping channels for
        BGR frames.
    */
    pub fn to_rgb(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Bgr24 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            _ => self.data.clone(),
        }
    }
}
