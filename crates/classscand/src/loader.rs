//! Turns an [`ImageSource`] into a decoded RGB raster.

use std::time::Duration;

use classscan_core::image_source::{decode_base64_payload, decode_image};
use classscan_core::{ImageError, ImageSource};
use image::RgbImage;
use reqwest::{StatusCode, Url};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("fetch returned HTTP {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("image decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Fetches or unpacks image bytes and decodes them off the async runtime.
pub struct ImageLoader {
    client: reqwest::Client,
    max_image_bytes: usize,
}

impl ImageLoader {
    pub fn new(fetch_timeout: Duration, max_image_bytes: usize) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .user_agent(concat!("classscand/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_image_bytes })
    }

    pub async fn load(&self, source: &ImageSource) -> Result<RgbImage, LoadError> {
        let bytes = match source {
            ImageSource::Url(url) => self.fetch(url).await?,
            ImageSource::Base64(data) => decode_base64_payload(data, self.max_image_bytes)?,
        };

        let max = self.max_image_bytes;
        let image = tokio::task::spawn_blocking(move || decode_image(&bytes, max).map(|img| img.to_rgb8()))
            .await??;
        Ok(image)
    }

    async fn fetch(&self, raw: &str) -> Result<Vec<u8>, LoadError> {
        let url = Url::parse(raw).map_err(|e| LoadError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoadError::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())));
        }

        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LoadError::Status(response.status()));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_image_bytes as u64 {
                return Err(ImageError::TooLarge(len as usize, self.max_image_bytes).into());
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > self.max_image_bytes {
                return Err(ImageError::TooLarge(bytes.len(), self.max_image_bytes).into());
            }
        }

        tracing::debug!(size_bytes = bytes.len(), "fetched remote image");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, routing::get, Router};
    use classscan_core::image_source::encode_data_url;
    use image::{DynamicImage, Rgb};

    fn loader() -> ImageLoader {
        ImageLoader::new(Duration::from_secs(5), 1024 * 1024).unwrap()
    }

    fn sample() -> RgbImage {
        RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 50, y as u8 * 80, 7]))
    }

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Serve a PNG at /photo.png on an ephemeral port.
    async fn serve_photo(png: Vec<u8>) -> String {
        let app = Router::new().route(
            "/photo.png",
            get(move || {
                let png = png.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], png) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_load_base64_data_url() {
        let original = sample();
        let url = encode_data_url(&DynamicImage::ImageRgb8(original.clone())).unwrap();
        let loaded = loader().load(&ImageSource::Base64(url)).await.unwrap();
        assert_eq!(loaded.as_raw(), original.as_raw());
    }

    #[tokio::test]
    async fn test_load_from_url() {
        let original = sample();
        let base = serve_photo(png_bytes(&original)).await;
        let loaded = loader()
            .load(&ImageSource::Url(format!("{base}/photo.png")))
            .await
            .unwrap();
        assert_eq!(loaded.as_raw(), original.as_raw());
    }

    #[tokio::test]
    async fn test_url_not_found() {
        let base = serve_photo(png_bytes(&sample())).await;
        let err = loader()
            .load(&ImageSource::Url(format!("{base}/missing.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Status(StatusCode::NOT_FOUND)));
    }

    #[tokio::test]
    async fn test_url_size_limit() {
        let base = serve_photo(vec![0x89; 4096]).await;
        let small = ImageLoader::new(Duration::from_secs(5), 1024).unwrap();
        let err = small
            .load(&ImageSource::Url(format!("{base}/photo.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Image(ImageError::TooLarge(_, 1024))));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let err = loader()
            .load(&ImageSource::Url("file:///etc/passwd".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_garbage_payload() {
        let err = loader()
            .load(&ImageSource::Base64("data:image/png;base64,Zm9vYmFy".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Image(ImageError::UnsupportedFormat)));
    }
}
