use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    constants::{IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR},
    error::ServiceError,
};

/// Image bytes decoded from a `data:image/<ext>;base64,<data>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn parse(payload: &str) -> Result<Self, ServiceError> {
        let (header, data) = payload
            .trim()
            .split_once(";base64,")
            .ok_or_else(|| ServiceError::validation("image", "expected a base64 data URI"))?;

        let extension = header
            .strip_prefix("data:image/")
            .ok_or_else(|| ServiceError::validation("image", "expected a data:image/ URI"))?
            .to_lowercase();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ServiceError::Validation {
                field: "image",
                message: format!("unsupported image type `{extension}`"),
            });
        }

        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|_| ServiceError::validation("image", "payload is not valid base64"))?;
        if !infer::is_image(&bytes) {
            return Err(ServiceError::validation(
                "image",
                "payload is not a recognized image",
            ));
        }

        Ok(Self { extension, bytes })
    }
}

/// Stores uploaded files below a root directory; references are paths relative to it.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn store_recipe_image(&self, image: &DecodedImage) -> Result<String, ServiceError> {
        let directory = self.root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| ServiceError::Internal(format!("Could not create media directory: {e}")))?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
        tokio::fs::write(directory.join(&file_name), &image.bytes)
            .await
            .map_err(|e| ServiceError::Internal(format!("Could not store image: {e}")))?;

        let reference = format!("{RECIPE_IMAGE_DIR}/{file_name}");
        log::trace!("> Stored image {reference}");
        Ok(reference)
    }

    /// Best-effort removal; a missing file is not an error.
    pub async fn remove(&self, reference: &str) {
        if reference.contains("..") {
            log::warn!("Refusing to remove media outside of root: {reference}");
            return;
        }

        match tokio::fs::remove_file(self.root.join(reference)).await {
            Ok(_) => log::trace!("> Removed image {reference}"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove image {reference}: {e}"),
        }
    }
}
