//! Data-URL image payloads
//!
//! Photos travel as `data:<mime>;base64,<payload>` strings. This module
//! decodes them into RGBA buffers and draws detection overlays.

use std::fmt;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::placement::TorsoBoundingBox;

/// Outline colour for detected torso boxes
const OVERLAY_COLOR: Rgba<u8> = Rgba([0, 255, 128, 255]);
/// Outline thickness in pixels
const OVERLAY_THICKNESS: u32 = 3;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("not a data URL")]
    NotADataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// A decoded data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Parse `data:<mime>;base64,<payload>`.
    ///
    /// A bare base64 string is accepted too and gets a generic mime type.
    pub fn parse(input: &str) -> Result<Self, ImagingError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImagingError::NotADataUrl);
        }

        let Some(rest) = input.strip_prefix("data:") else {
            let data = BASE64.decode(input)?;
            return Ok(Self {
                mime_type: "application/octet-stream".to_string(),
                data,
            });
        };

        let (header, payload) = rest.split_once(',').ok_or(ImagingError::NotADataUrl)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(ImagingError::NotADataUrl)?;
        let mime_type = if mime_type.is_empty() { "text/plain" } else { mime_type };

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: BASE64.decode(payload)?,
        })
    }

    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, BASE64.encode(&self.data))
    }
}

/// Base64 part of a data URL, or the whole string if it has no header
pub fn base64_payload(input: &str) -> &str {
    match input.split_once(',') {
        Some((_, payload)) => payload,
        None => input,
    }
}

/// Decode a data URL into an RGBA buffer
pub fn decode_image(url: &DataUrl) -> Result<RgbaImage, ImagingError> {
    let img = image::load_from_memory(&url.data).map_err(ImagingError::Decode)?;
    Ok(img.to_rgba8())
}

/// Encode an RGBA buffer as a PNG data URL
pub fn encode_png_data_url(img: &RgbaImage) -> Result<String, ImagingError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(ImagingError::Encode)?;
    Ok(DataUrl::new("image/png", bytes).to_string())
}

/// Copy of `img` with the torso box and its centre drawn on top
pub fn visualize_torso(img: &RgbaImage, bbox: &TorsoBoundingBox) -> RgbaImage {
    let mut out = img.clone();
    if !bbox.found {
        return out;
    }

    for inset in 0..OVERLAY_THICKNESS {
        let width = (bbox.max_x - bbox.min_x + 1).saturating_sub(inset * 2);
        let height = (bbox.max_y - bbox.min_y + 1).saturating_sub(inset * 2);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((bbox.min_x + inset) as i32, (bbox.min_y + inset) as i32)
            .of_size(width, height);
        draw_hollow_rect_mut(&mut out, rect, OVERLAY_COLOR);
    }

    let (cx, cy) = bbox.center();
    draw_cross_mut(&mut out, OVERLAY_COLOR, cx.round() as i32, cy.round() as i32);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        encode_png_data_url(&img).unwrap()
    }

    #[test]
    fn test_png_round_trip() {
        let url = png_url(4, 3);
        assert!(url.starts_with("data:image/png;base64,"));
        let parsed = DataUrl::parse(&url).unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        let img = decode_image(&parsed).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_rejects_non_base64_data_url() {
        assert!(matches!(
            DataUrl::parse("data:text/plain,hello"),
            Err(ImagingError::NotADataUrl)
        ));
        assert!(matches!(DataUrl::parse(""), Err(ImagingError::NotADataUrl)));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64,@@@"),
            Err(ImagingError::Base64(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_fail_decode() {
        let url = DataUrl::new("image/png", vec![1, 2, 3, 4]);
        assert!(matches!(decode_image(&url), Err(ImagingError::Decode(_))));
    }

    #[test]
    fn test_payload_split() {
        assert_eq!(base64_payload("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(base64_payload("AAAA"), "AAAA");
    }

    #[test]
    fn test_visualize_draws_outline() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        let bbox = TorsoBoundingBox {
            min_x: 5,
            max_x: 14,
            min_y: 4,
            max_y: 15,
            found: true,
        };
        let out = visualize_torso(&img, &bbox);
        assert_eq!(out.get_pixel(5, 4), &OVERLAY_COLOR);
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));

        let missing = TorsoBoundingBox { found: false, ..bbox };
        assert_eq!(visualize_torso(&img, &missing), img);
    }
}
