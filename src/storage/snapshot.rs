//! Canvas snapshots as PNG data URLs

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, RgbaImage};

use super::DecodeError;
use crate::raster::PresentationBuffer;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a buffer as `data:image/png;base64,...`
pub fn encode_data_url(buffer: &PresentationBuffer) -> Result<String, DecodeError> {
    let image = buffer
        .to_image()
        .ok_or_else(|| DecodeError::Invalid("buffer size does not match its pixels".to_string()))?;
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, BASE64.encode(bytes)))
}

/// Decode a PNG data URL. `expected` rejects images of another size.
pub fn decode_data_url(
    value: &str,
    expected: Option<(u32, u32)>,
) -> Result<PresentationBuffer, DecodeError> {
    let raw = value
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or(DecodeError::InvalidDataUrl)?;
    let bytes = BASE64.decode(raw.trim())?;
    let image: RgbaImage = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8();

    if let Some((width, height)) = expected {
        if image.dimensions() != (width, height) {
            return Err(DecodeError::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }
    }
    Ok(PresentationBuffer::from_image(image))
}
