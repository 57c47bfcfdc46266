//! Image values and the codec seam
//!
//! The tiers store raw encoded bytes. Turning those bytes into something a
//! caller can display happens at the resolver boundary through [`ImageCodec`].
//! The bundled [`SniffingCodec`] only recognises container signatures; hosts
//! that need real pixel decoding plug in their own codec.

use crate::error::{StashError, StashResult};
use bytes::Bytes;
use std::fmt;

/// Encoded image formats recognised by [`SniffingCodec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl ImageFormat {
    /// Identify the format from the leading bytes of an encoded image
    pub fn sniff(data: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

        if data.starts_with(PNG) {
            Some(Self::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else if data.starts_with(b"BM") && data.len() >= 14 {
            Some(Self::Bmp)
        } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
            Some(Self::Tiff)
        } else {
            None
        }
    }

    /// MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        };
        write!(f, "{}", name)
    }
}

/// A decoded, displayable image
///
/// Cloning is cheap: the encoded bytes are reference counted.
#[derive(Debug, Clone)]
pub struct Image {
    format: ImageFormat,
    data: Bytes,
}

impl Image {
    pub fn new(format: ImageFormat, data: Bytes) -> Self {
        Self { format, data }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The encoded bytes this image was decoded from
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Converts between stored bytes and displayable images
pub trait ImageCodec: Send + Sync {
    /// Interpret raw bytes as an image
    fn decode(&self, data: &Bytes) -> StashResult<Image>;

    /// Serialize an image back to bytes for storage
    fn encode(&self, image: &Image) -> StashResult<Bytes>;
}

/// Codec that validates the container signature and keeps the original bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingCodec;

impl ImageCodec for SniffingCodec {
    fn decode(&self, data: &Bytes) -> StashResult<Image> {
        if data.is_empty() {
            return Err(StashError::Decode("no image data".to_string()));
        }

        let format = ImageFormat::sniff(data).ok_or_else(|| {
            StashError::Decode(format!(
                "unrecognised image signature ({} bytes)",
                data.len()
            ))
        })?;

        Ok(Image::new(format, data.clone()))
    }

    fn encode(&self, image: &Image) -> StashResult<Bytes> {
        if image.is_empty() {
            return Err(StashError::Encoding(format!(
                "{} image has no data",
                image.format()
            )));
        }
        Ok(image.data().clone())
    }
}

/// Minimal valid-looking PNG payload for tests
#[cfg(test)]
pub(crate) fn sample_png() -> Bytes {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(b"\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0");
    Bytes::from(data)
}
