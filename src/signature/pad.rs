use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use super::codec::{decode_data_uri, encode_data_uri};
use super::surface::{ImageSurface, RasterSurface, StrokeStyle};
use super::SignatureError;

/// Capture canvas size. Held constant so stored signatures re-decode without resampling.
pub const CANVAS_WIDTH: u32 = 300;
pub const CANVAS_HEIGHT: u32 = 150;

/// Device-independent canvas coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Freehand signature capture.
///
/// Strokes accumulate until [`SignaturePad::clear`]; every [`SignaturePad::end`]
/// re-renders and re-encodes the whole canvas, not just the latest stroke.
pub struct SignaturePad {
    width: u32,
    height: u32,
    style: StrokeStyle,
    surface: Box<dyn RasterSurface>,
    strokes: Vec<Vec<Point>>,
    stroke_open: bool,
    background: Option<RgbaImage>,
    encoded: String,
}

impl SignaturePad {
    /// Standard 300 x 150 pad drawing with the software rasterizer
    pub fn new() -> Self {
        Self::with_surface(Box::new(ImageSurface))
    }

    pub fn with_surface(surface: Box<dyn RasterSurface>) -> Self {
        Self::with_style(surface, StrokeStyle::default())
    }

    pub fn with_style(surface: Box<dyn RasterSurface>, style: StrokeStyle) -> Self {
        Self::with_canvas(surface, CANVAS_WIDTH, CANVAS_HEIGHT, style)
    }

    fn with_canvas(
        surface: Box<dyn RasterSurface>,
        width: u32,
        height: u32,
        style: StrokeStyle,
    ) -> Self {
        Self {
            width,
            height,
            style,
            surface,
            strokes: Vec::new(),
            stroke_open: false,
            background: None,
            encoded: String::new(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Start a new stroke at `point`; earlier strokes are kept
    pub fn begin(&mut self, point: Point) {
        self.strokes.push(vec![point]);
        self.stroke_open = true;
    }

    /// Extend the open stroke to `point`.
    /// Moves with no open stroke (pointer re-entering the pad) are ignored.
    pub fn extend(&mut self, point: Point) {
        if !self.stroke_open {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// Close the open stroke and encode the whole canvas as a PNG data URI
    pub fn end(&mut self) -> Result<String, SignatureError> {
        self.stroke_open = false;

        let canvas = self.surface.rasterize(
            self.width,
            self.height,
            self.background.as_ref(),
            &self.strokes,
            &self.style,
        )?;
        let png = self.surface.encode_png(&canvas)?;

        self.encoded = encode_data_uri(&png);
        tracing::debug!(
            strokes = self.strokes.len(),
            bytes = png.len(),
            "Signature canvas encoded"
        );
        Ok(self.encoded.clone())
    }

    /// Erase everything. Calling it on an empty pad is a no-op.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.stroke_open = false;
        self.background = None;
        self.encoded.clear();
    }

    /// Show a previously captured signature, replacing the current drawing.
    ///
    /// Images of a different size are resampled to the canvas; in that case the
    /// encoded value stays empty until the next [`SignaturePad::end`].
    pub fn load_existing(&mut self, encoded_image: &str) -> Result<(), SignatureError> {
        let png = decode_data_uri(encoded_image)?;
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| SignatureError::Decode(e.to_string()))?
            .to_rgba8();

        self.clear();
        if decoded.dimensions() == (self.width, self.height) {
            self.background = Some(decoded);
            self.encoded = encoded_image.trim().to_string();
        } else {
            tracing::warn!(
                from = ?decoded.dimensions(),
                to = ?(self.width, self.height),
                "Resampling stored signature to canvas size"
            );
            self.background = Some(image::imageops::resize(
                &decoded,
                self.width,
                self.height,
                FilterType::Triangle,
            ));
        }
        Ok(())
    }

    /// Last value produced by `end` or `load_existing`; empty after `clear`
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// True when nothing visible has been drawn or loaded
    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.strokes.iter().all(|stroke| stroke.len() < 2)
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignaturePad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignaturePad")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("strokes", &self.strokes.len())
            .field("stroke_open", &self.stroke_open)
            .field("has_background", &self.background.is_some())
            .finish()
    }
}
