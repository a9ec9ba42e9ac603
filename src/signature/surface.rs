use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use super::{Point, SignatureError};

/// Pen settings, matching the capture canvas: black, 2 units wide, round caps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub color: [u8; 4],
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 2.0,
            color: [0, 0, 0, 255],
        }
    }
}

/// Drawing backend for the signature pad.
///
/// Kept behind a trait so devices without a raster backend can be modelled;
/// such a surface fails every call with `RenderingUnavailable`.
pub trait RasterSurface: Send + Sync {
    /// Draw `background` (if any) and then every stroke onto a fresh
    /// transparent canvas of `width` x `height`.
    fn rasterize(
        &self,
        width: u32,
        height: u32,
        background: Option<&RgbaImage>,
        strokes: &[Vec<Point>],
        style: &StrokeStyle,
    ) -> Result<RgbaImage, SignatureError>;

    /// Encode a canvas as PNG bytes
    fn encode_png(&self, canvas: &RgbaImage) -> Result<Vec<u8>, SignatureError>;
}

/// Software rasterizer backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageSurface;

impl ImageSurface {
    /// Paint every pixel whose centre lies within `radius` of the segment.
    /// Distance-to-segment painting yields round caps and joins for free.
    fn draw_segment(canvas: &mut RgbaImage, from: Point, to: Point, radius: f32, color: Rgba<u8>) {
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let min_x = (from.x.min(to.x) - radius).floor().max(0.0) as u32;
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0) as u32;
        let max_x = ((from.x.max(to.x) + radius).ceil().max(0.0) as u32).min(width - 1);
        let max_y = ((from.y.max(to.y) + radius).ceil().max(0.0) as u32).min(height - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let length_sq = dx * dx + dy * dy;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;
                let t = if length_sq == 0.0 {
                    0.0
                } else {
                    (((px - from.x) * dx + (py - from.y) * dy) / length_sq).clamp(0.0, 1.0)
                };
                let cx = from.x + t * dx;
                let cy = from.y + t * dy;
                let dist_sq = (px - cx) * (px - cx) + (py - cy) * (py - cy);
                if dist_sq <= radius * radius {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
    }
}

impl RasterSurface for ImageSurface {
    fn rasterize(
        &self,
        width: u32,
        height: u32,
        background: Option<&RgbaImage>,
        strokes: &[Vec<Point>],
        style: &StrokeStyle,
    ) -> Result<RgbaImage, SignatureError> {
        let mut canvas = match background {
            Some(background) if background.dimensions() == (width, height) => background.clone(),
            Some(background) => {
                let mut canvas = RgbaImage::new(width, height);
                image::imageops::overlay(&mut canvas, background, 0, 0);
                canvas
            }
            None => RgbaImage::new(width, height),
        };

        let color = Rgba(style.color);
        let radius = style.width / 2.0;
        for stroke in strokes {
            for segment in stroke.windows(2) {
                Self::draw_segment(&mut canvas, segment[0], segment[1], radius, color);
            }
        }

        Ok(canvas)
    }

    fn encode_png(&self, canvas: &RgbaImage) -> Result<Vec<u8>, SignatureError> {
        let mut cursor = Cursor::new(Vec::new());
        canvas
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|_| SignatureError::RenderingUnavailable)?;
        Ok(cursor.into_inner())
    }
}

/// Surface for environments without any drawing capability
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSurface;

impl RasterSurface for UnavailableSurface {
    fn rasterize(
        &self,
        _width: u32,
        _height: u32,
        _background: Option<&RgbaImage>,
        _strokes: &[Vec<Point>],
        _style: &StrokeStyle,
    ) -> Result<RgbaImage, SignatureError> {
        Err(SignatureError::RenderingUnavailable)
    }

    fn encode_png(&self, _canvas: &RgbaImage) -> Result<Vec<u8>, SignatureError> {
        Err(SignatureError::RenderingUnavailable)
    }
}
