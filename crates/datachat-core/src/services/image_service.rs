use std::io::Cursor;

use image::ImageFormat;
use thiserror::Error;
use tracing::debug;

use super::assistant_service::{AssistantError, AssistantService};
use crate::models::PngImage;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{0}")]
    Fetch(#[from] AssistantError),

    #[error("cannot identify image file: {0}")]
    Decode(image::ImageError),

    #[error("failed to encode PNG: {0}")]
    Encode(image::ImageError),
}

/// Decode an image in any supported format and re-encode it as PNG
pub fn normalize_to_png(data: &[u8]) -> Result<PngImage, ImageError> {
    let decoded = image::load_from_memory(data).map_err(ImageError::Decode)?;

    let mut encoded = Cursor::new(Vec::new());
    decoded
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(ImageError::Encode)?;

    Ok(PngImage {
        bytes: encoded.into_inner(),
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Download a generated image from the file store and normalize it
pub async fn fetch_png(service: &dyn AssistantService, file_id: &str) -> Result<PngImage, ImageError> {
    let data = service.file_content(file_id).await?;
    debug!(file_id = %file_id, bytes = data.len(), "Downloaded image file");
    normalize_to_png(&data)
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 3, image::Rgb([255, 0, 0]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
