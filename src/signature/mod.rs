// Signature Capture Module
//
// Pointer input -> fixed-size raster -> base64 PNG data URI stored on the
// delivery record as proof of delivery.

pub mod codec;
pub mod pad;
pub mod surface;

use thiserror::Error;

pub use codec::{decode_data_uri, encode_data_uri, PNG_DATA_URI_PREFIX};
pub use pad::{Point, SignaturePad, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use surface::{ImageSurface, RasterSurface, StrokeStyle, UnavailableSurface};

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature canvas cannot render or encode on this device")]
    RenderingUnavailable,
    #[error("not a base64 PNG data URI")]
    InvalidEncoding,
    #[error("signature image could not be decoded: {0}")]
    Decode(String),
}
