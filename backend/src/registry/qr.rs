//! QR code encoding
//!
//! Turns a lookup URL into a QR code image.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use qrcode::render::svg;
use qrcode::QrCode;
use thiserror::Error;

/// MIME type of the images produced by `SvgQrEncoder`
pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// Errors raised while encoding a QR code
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Nothing to encode
    #[error("Cannot encode empty text")]
    EmptyInput,

    /// The text does not fit in a QR code
    #[error("QR encoding failed: {0}")]
    Encoding(String),
}

/// An encoded QR code image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    /// Image content
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: String,
}

impl QrImage {
    /// Self-contained `data:` URI for the image
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

/// QR encoding port
pub trait QrEncoder: Send + Sync {
    /// Encode `text` as a QR code image
    fn encode(&self, text: &str) -> Result<QrImage, EncodeError>;
}

/// Renders QR codes as SVG documents
#[derive(Debug, Clone)]
pub struct SvgQrEncoder {
    min_dimension: u32,
}

impl SvgQrEncoder {
    /// Create an encoder producing images at least `min_dimension` pixels wide
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }
}

impl Default for SvgQrEncoder {
    fn default() -> Self {
        Self::new(200)
    }
}

impl QrEncoder for SvgQrEncoder {
    fn encode(&self, text: &str) -> Result<QrImage, EncodeError> {
        if text.is_empty() {
            return Err(EncodeError::EmptyInput);
        }

        let code =
            QrCode::new(text.as_bytes()).map_err(|e| EncodeError::Encoding(e.to_string()))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        Ok(QrImage {
            bytes: image.into_bytes(),
            mime_type: SVG_MIME_TYPE.to_string(),
        })
    }
}
