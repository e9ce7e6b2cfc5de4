//! Book cover images.

use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageFormat;
use storage::{Cover, CoverId, NewCover, Store};

use crate::error::{DomainError, Result};

/// Accepted cover encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Png,
    Jpg,
    Jpeg,
}

impl ImageEncoding {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
            ImageEncoding::Jpg => "image/jpg",
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageEncoding::Png => ImageFormat::Png,
            ImageEncoding::Jpg | ImageEncoding::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl FromStr for ImageEncoding {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image/png" => Ok(ImageEncoding::Png),
            "image/jpg" => Ok(ImageEncoding::Jpg),
            "image/jpeg" => Ok(ImageEncoding::Jpeg),
            other => Err(DomainError::invalid(format!(
                "unsupported image encoding '{other}'"
            ))),
        }
    }
}

/// A cover upload whose bytes decode as an image of the declared encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    encoding: ImageEncoding,
    content: Vec<u8>,
}

impl CoverImage {
    /// Decodes base64 `content` and checks it is a real image of `encoding`.
    pub fn from_base64(encoding: &str, content: &str) -> Result<Self> {
        let encoding: ImageEncoding = encoding.parse()?;
        let bytes = STANDARD
            .decode(content.trim())
            .map_err(|_| DomainError::invalid("cover content is not valid base64"))?;
        image::load_from_memory_with_format(&bytes, encoding.format()).map_err(|e| {
            DomainError::invalid(format!(
                "cover content is not a valid {} image: {e}",
                encoding.mime()
            ))
        })?;
        Ok(Self {
            encoding,
            content: bytes,
        })
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn into_new_cover(self) -> NewCover {
        NewCover {
            encoding: self.encoding.mime().to_string(),
            content: self.content,
        }
    }
}

/// Service for reading and replacing covers.
pub struct CoverService<S: Store> {
    store: S,
}

impl<S: Store> CoverService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_cover(&self, id: CoverId) -> Result<Cover> {
        self.store
            .get_cover(id)
            .await?
            .ok_or(DomainError::NotFound("cover"))
    }

    /// Replaces the encoding and bytes of an existing cover.
    #[tracing::instrument(skip(self, image))]
    pub async fn update_cover(&self, id: CoverId, image: CoverImage) -> Result<Cover> {
        let existing = self.get_cover(id).await?;
        let new = image.into_new_cover();
        let cover = Cover {
            id: existing.id,
            encoding: new.encoding,
            content: new.content,
        };
        self.store.update_cover(&cover).await?;
        tracing::info!(%id, encoding = %cover.encoding, "cover replaced");
        Ok(cover)
    }
}
