//! Image acquisition: base64 / data-URL payloads and raw bytes to rasters.
//!
//! URL fetching lives in the daemon (it owns the HTTP client); everything
//! after the bytes arrive is here so both input modes share one decode path.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

/// Maximum decoded image size (10MB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image data is empty")]
    EmptyData,
    #[error("image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),
    #[error("malformed data URL: expected data:<mime>;base64,<payload>")]
    InvalidDataUrl,
    #[error("invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error("failed to decode image: {0}")]
    DecodeFailed(String),
    #[error("failed to encode image: {0}")]
    EncodeFailed(String),
}

/// Where a request's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote image fetched over HTTP(S).
    Url(String),
    /// Inline base64 payload, with or without a `data:image/...;base64,` prefix.
    Base64(String),
}

impl ImageSource {
    /// Pick a source from a request's optional URL and inline-data fields.
    ///
    /// Blank strings count as missing. Inline data wins when both are set.
    pub fn from_fields(url: Option<&str>, data: Option<&str>) -> Option<Self> {
        let present = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        present(data)
            .map(ImageSource::Base64)
            .or_else(|| present(url).map(ImageSource::Url))
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Url(_) => "url",
            ImageSource::Base64(_) => "base64",
        }
    }
}

/// Strip an optional `data:<mime>;base64,` prefix, returning the payload.
pub fn strip_data_url_prefix(input: &str) -> Result<&str, ImageError> {
    let input = input.trim();
    if !input.starts_with("data:") {
        return Ok(input);
    }
    match input.split_once(',') {
        Some((header, payload)) if header.ends_with(";base64") => Ok(payload),
        _ => Err(ImageError::InvalidDataUrl),
    }
}

/// Decode a base64 payload (optionally a data URL) into raw image bytes.
pub fn decode_base64_payload(input: &str, max_bytes: usize) -> Result<Vec<u8>, ImageError> {
    let payload = strip_data_url_prefix(input)?;
    // Line-wrapped base64 is common when payloads come from shell tools.
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Cheap upper bound before allocating the decoded buffer.
    let estimated = compact.len() / 4 * 3;
    if estimated > max_bytes + 2 {
        return Err(ImageError::TooLarge(estimated, max_bytes));
    }

    let bytes = STANDARD.decode(compact.as_bytes())?;
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }
    Ok(bytes)
}

/// Detect image format from magic bytes.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),
        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Decode raw image bytes into a raster.
pub fn decode_image(bytes: &[u8], max_bytes: usize) -> Result<DynamicImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    let format = detect_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    tracing::debug!(
        format = ?format,
        width = image.width(),
        height = image.height(),
        size_bytes = bytes.len(),
        "decoded image"
    );

    Ok(image)
}

/// Wrap already-encoded image bytes in a data URL, keeping their format.
pub fn data_url_for_bytes(bytes: &[u8]) -> Result<String, ImageError> {
    let format = detect_format(bytes)?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// PNG-encode a raster as a `data:image/png;base64,...` URL.
pub fn encode_data_url(image: &DynamicImage) -> Result<String, ImageError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buf)))
}
