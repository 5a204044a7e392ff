//! Turning user-picked files into images ready to upload.

use std::io;
use std::path::Path;

use atena_model::Attachment;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use mime::Mime;
use tokio::task::spawn_blocking;

/// A file-like value picked by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// The file name.
    pub name: String,
    /// The declared MIME type.
    pub mime: String,
    /// The file contents.
    pub bytes: Bytes,
}

impl Blob {
    /// Creates a blob.
    #[inline]
    pub fn new<N, M, B>(name: N, mime: M, bytes: B) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        B: Into<Bytes>,
    {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file, guessing its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_owned())
            .unwrap_or_else(|_| mime::APPLICATION_OCTET_STREAM.to_string());
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());
        Ok(Self::new(name, mime, bytes))
    }

    fn is_image(&self) -> bool {
        self.mime
            .parse::<Mime>()
            .is_ok_and(|mime| mime.type_() == mime::IMAGE)
    }
}

/// An accepted image: the bytes to upload plus a local preview.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedAttachment {
    attachment: Attachment,
    preview: String,
}

impl PreparedAttachment {
    fn from_blob(blob: Blob) -> Self {
        let preview = format!(
            "data:{};base64,{}",
            blob.mime,
            BASE64.encode(&blob.bytes)
        );
        Self {
            attachment: Attachment {
                file_name: blob.name,
                mime: blob.mime,
                bytes: blob.bytes,
            },
            preview,
        }
    }

    /// Returns what will be uploaded.
    #[inline]
    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    /// Returns a `data:` URL showing the image locally.
    #[inline]
    pub fn preview(&self) -> &str {
        &self.preview
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (Attachment, String) {
        (self.attachment, self.preview)
    }
}

/// Limits applied by the [`Preprocessor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreprocessorConfig {
    /// Images larger than this many bytes get shrunk.
    pub max_bytes: usize,
    /// Longest side, in pixels, of a shrunk image.
    pub max_dimension: u32,
    /// JPEG quality of a shrunk image, from 1 to 100.
    pub jpeg_quality: u8,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            max_bytes: 4 * 1024 * 1024,
            max_dimension: 1024,
            jpeg_quality: 80,
        }
    }
}

/// Raised when an oversized image cannot be shrunk. Never surfaced to the
/// user: the original image is sent instead.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are not an image the decoder understands.
    #[error("failed to process image: {0}")]
    Image(#[from] image::ImageError),
    /// The worker thread died.
    #[error("image worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Validates and normalizes images before they are attached.
#[derive(Clone, Debug, Default)]
pub struct Preprocessor {
    config: PreprocessorConfig,
}

impl Preprocessor {
    /// Creates a preprocessor with the given limits.
    #[inline]
    pub fn new(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    /// Prepares every image among `blobs`, keeping their order.
    ///
    /// Anything that isn't declared as an image is dropped silently.
    /// Oversized images are shrunk and re-encoded as JPEG on the blocking
    /// pool; if that fails the image is kept as it was.
    pub async fn prepare<I>(&self, blobs: I) -> Vec<PreparedAttachment>
    where
        I: IntoIterator<Item = Blob>,
    {
        let mut prepared = vec![];
        for blob in blobs {
            if !blob.is_image() {
                debug!("ignoring {} of type {}", blob.name, blob.mime);
                continue;
            }
            let blob = if blob.bytes.len() > self.config.max_bytes {
                self.shrink(blob).await
            } else {
                blob
            };
            prepared.push(PreparedAttachment::from_blob(blob));
        }
        prepared
    }

    async fn shrink(&self, blob: Blob) -> Blob {
        let config = self.config;
        let bytes = blob.bytes.clone();
        let result = spawn_blocking(move || shrink_image(&bytes, &config))
            .await
            .map_err(DecodeError::from)
            .and_then(|result| result);
        match result {
            Ok(bytes) => {
                debug!(
                    "shrunk {} from {} to {} bytes",
                    blob.name,
                    blob.bytes.len(),
                    bytes.len()
                );
                Blob {
                    mime: mime::IMAGE_JPEG.to_string(),
                    bytes,
                    ..blob
                }
            }
            Err(err) => {
                warn!("sending {} unmodified: {err}", blob.name);
                blob
            }
        }
    }
}

/// Decodes an image, fits it within `max_dimension` and re-encodes it as
/// JPEG. Images that already fit are re-encoded without scaling.
pub fn shrink_image(
    bytes: &[u8],
    config: &PreprocessorConfig,
) -> Result<Bytes, DecodeError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width().max(img.height()) > config.max_dimension {
        img.resize(config.max_dimension, config.max_dimension, FilterType::Triangle)
    } else {
        img
    };
    // JPEG has no alpha channel.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(
        &mut out,
        config.jpeg_quality,
    ))?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{GenericImageView, RgbImage};

    use super::*;

    fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn large_bmp() -> Vec<u8> {
        let img = RgbImage::from_fn(1500, 1400, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
        });
        encode(img, ImageFormat::Bmp)
    }

    #[tokio::test]
    async fn test_drops_non_images() {
        let prepared = Preprocessor::default()
            .prepare([
                Blob::new("notes.txt", "text/plain", "hello"),
                Blob::new("weird", "not a mime", "hello"),
            ])
            .await;
        assert!(prepared.is_empty());
    }

    #[tokio::test]
    async fn test_small_image_passes_through() {
        let png = encode(RgbImage::new(8, 8), ImageFormat::Png);
        let prepared = Preprocessor::default()
            .prepare([Blob::new("dot.png", "image/png", png.clone())])
            .await;
        assert_eq!(prepared.len(), 1);
        let attachment = prepared[0].attachment();
        assert_eq!(attachment.bytes.as_ref(), png.as_slice());
        assert_eq!(attachment.mime, "image/png");
        assert!(prepared[0].preview().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_large_image_is_shrunk() {
        let bmp = large_bmp();
        assert!(bmp.len() > 6_000_000);
        let prepared = Preprocessor::default()
            .prepare([Blob::new("photo.bmp", "image/bmp", bmp)])
            .await;

        let attachment = prepared[0].attachment();
        assert!(attachment.bytes.len() <= 4 * 1024 * 1024);
        assert_eq!(attachment.mime, "image/jpeg");
        assert_eq!(attachment.file_name, "photo.bmp");
        let decoded = image::load_from_memory(&attachment.bytes).unwrap();
        let (width, height) = decoded.dimensions();
        assert_eq!(width, 1024);
        assert!(height < 1024);
        assert!(prepared[0].preview().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_kept() {
        let garbage = vec![0u8; 5 * 1024 * 1024];
        let prepared = Preprocessor::default()
            .prepare([Blob::new("broken.png", "image/png", garbage.clone())])
            .await;
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].attachment().bytes.len(), garbage.len());
        assert_eq!(prepared[0].attachment().mime, "image/png");
    }

    #[tokio::test]
    async fn test_keeps_order() {
        let png = encode(RgbImage::new(2, 2), ImageFormat::Png);
        let prepared = Preprocessor::default()
            .prepare([
                Blob::new("big.bmp", "image/bmp", large_bmp()),
                Blob::new("skip.pdf", "application/pdf", "%PDF"),
                Blob::new("small.png", "image/png", png),
            ])
            .await;
        let names: Vec<_> = prepared
            .iter()
            .map(|p| p.attachment().file_name.as_str())
            .collect();
        assert_eq!(names, ["big.bmp", "small.png"]);
    }

    #[test]
    fn test_shrink_does_not_upscale() {
        let png = encode(RgbImage::new(300, 200), ImageFormat::Png);
        let jpeg =
            shrink_image(&png, &PreprocessorConfig::default()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (300, 200));
    }

    #[tokio::test]
    async fn test_blob_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.PNG");
        std::fs::write(&path, b"fake").unwrap();
        let blob = Blob::from_path(&path).await.unwrap();
        assert_eq!(blob.name, "cat.PNG");
        assert_eq!(blob.mime, "image/png");

        let path = dir.path().join("notes.md");
        std::fs::write(&path, b"# hi").unwrap();
        let blob = Blob::from_path(&path).await.unwrap();
        assert_eq!(blob.mime, "application/octet-stream");
    }
}
