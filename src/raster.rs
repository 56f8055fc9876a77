//! Pixel-side types: the encoder's YUV planes, the decoder's luma frame, and
//! the adapters to the `image` crate at the boundary.

use crate::error::{Result, Robot36Error};
use crate::protocol::{IMAGE_HEIGHT, IMAGE_WIDTH};
use image::imageops::FilterType;
use image::{GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Luma and chroma planes, each `width * height` values in 0..=255.
#[derive(Debug, Clone, PartialEq)]
pub struct YuvPlanes {
    pub width: usize,
    pub height: usize,
    pub y: Vec<f32>,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
}

impl YuvPlanes {
    /// Converts packed 8-bit RGB with fixed BT.601-style coefficients.
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self> {
        if rgb.len() != width * height * 3 {
            return Err(Robot36Error::InvalidRaster(format!(
                "expected {} RGB bytes for {}x{}, got {}",
                width * height * 3,
                width,
                height,
                rgb.len()
            )));
        }

        let pixels = width * height;
        let mut planes = Self {
            width,
            height,
            y: Vec::with_capacity(pixels),
            u: Vec::with_capacity(pixels),
            v: Vec::with_capacity(pixels),
        };

        for px in rgb.chunks_exact(3) {
            let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            let u = (b - y) * 0.492 + 128.0;
            let v = (r - y) * 0.877 + 128.0;

            planes.y.push(y.clamp(0.0, 255.0));
            planes.u.push(u.clamp(0.0, 255.0));
            planes.v.push(v.clamp(0.0, 255.0));
        }

        Ok(planes)
    }

    pub fn from_image(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgb(image.as_raw(), width as usize, height as usize)
            .expect("RgbImage buffer always matches its dimensions")
    }

    fn row<'a>(&self, plane: &'a [f32], y: usize) -> &'a [f32] {
        &plane[y * self.width..(y + 1) * self.width]
    }

    pub fn luma_row(&self, y: usize) -> &[f32] {
        self.row(&self.y, y)
    }

    pub fn u_row(&self, y: usize) -> &[f32] {
        self.row(&self.u, y)
    }

    pub fn v_row(&self, y: usize) -> &[f32] {
        self.row(&self.v, y)
    }
}

/// Halves a chroma row by keeping the even-indexed samples.
pub fn decimate(row: &[f32]) -> Vec<f32> {
    row.chunks_exact(2).map(|pair| pair[0]).collect()
}

/// Decoded single-channel raster, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn robot36() -> Self {
        Self::new(IMAGE_WIDTH, IMAGE_HEIGHT)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width as u32, self.height as u32, self.pixels.clone())
            .expect("frame buffer always matches its dimensions")
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.to_image().write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Decodes any supported picture format, drops alpha, and stretches it to the
/// Robot36 raster.
pub fn load_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let decoded = image::load_from_memory(bytes)?;
    log::debug!("source image {}x{}", decoded.width(), decoded.height());

    let rgb = decoded.to_rgb8();
    if rgb.dimensions() == (IMAGE_WIDTH as u32, IMAGE_HEIGHT as u32) {
        return Ok(rgb);
    }
    Ok(image::imageops::resize(
        &rgb,
        IMAGE_WIDTH as u32,
        IMAGE_HEIGHT as u32,
        FilterType::Lanczos3,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    #[test]
    fn test_yuv_conversion() {
        let planes = YuvPlanes::from_rgb(&[255, 0, 0, 128, 128, 128, 0, 0, 255], 3, 1).unwrap();

        assert_relative_eq!(planes.y[0], 76.245, epsilon = 1e-3);
        assert_relative_eq!(planes.u[0], 128.0 - 76.245 * 0.492, epsilon = 1e-3);
        // red pushes V above the clamp
        assert_relative_eq!(planes.v[0], 255.0);

        assert_relative_eq!(planes.y[1], 128.0, epsilon = 1e-3);
        assert_relative_eq!(planes.u[1], 128.0, epsilon = 1e-3);
        assert_relative_eq!(planes.v[1], 128.0, epsilon = 1e-3);

        assert_relative_eq!(planes.u[2], 128.0 + (255.0 - 29.07) * 0.492, epsilon = 1e-2);
    }

    #[test]
    fn test_yuv_rejects_short_buffer() {
        assert!(matches!(
            YuvPlanes::from_rgb(&[0; 8], 3, 1),
            Err(Robot36Error::InvalidRaster(_))
        ));
    }

    #[test]
    fn test_decimate_keeps_even_samples() {
        let row: Vec<f32> = (0..320).map(|i| i as f32).collect();
        let half = decimate(&row);

        assert_eq!(half.len(), 160);
        for (i, &value) in half.iter().enumerate() {
            assert_eq!(value, (2 * i) as f32);
        }
    }

    #[test]
    fn test_frame_png_roundtrip() {
        let mut frame = Frame::new(4, 2);
        frame.pixels = vec![0, 50, 100, 150, 200, 250, 255, 1];

        let png = frame.to_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (4, 2));
        assert_eq!(decoded.as_raw(), &frame.pixels);
    }

    #[test]
    fn test_load_rgb_resizes_to_raster() {
        let source = RgbImage::from_pixel(64, 48, Rgb([10, 200, 30]));
        let mut png = Cursor::new(Vec::new());
        source.write_to(&mut png, ImageFormat::Png).unwrap();

        let loaded = load_rgb(png.get_ref()).unwrap();
        assert_eq!(loaded.dimensions(), (320, 240));
        assert_eq!(loaded.get_pixel(160, 120), &Rgb([10, 200, 30]));
    }
}
