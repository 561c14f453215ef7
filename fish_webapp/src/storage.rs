use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload is not a base64 data URL")]
    InvalidDataUrl,
    #[error("Failed to decode base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Uploaded file is not a readable image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid upload name: {0}")]
    InvalidName(String),
    #[error("Upload storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Decodes the payload of a `data:image/...;base64,<payload>` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, StorageError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or(StorageError::InvalidDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(StorageError::InvalidDataUrl);
    }
    Ok(STANDARD.decode(payload.trim())?)
}

/// Directory holding uploaded images, re-encoded as RGB PNG under unique names.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decodes `image_data` and stores it as PNG; returns the stored file name.
    pub fn save(&self, image_data: &[u8]) -> Result<String, StorageError> {
        let img = image::load_from_memory(image_data)?.to_rgb8();

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let filename = format!("img_{}_{}.png", timestamp, Uuid::new_v4().simple());

        img.save_with_format(self.dir.join(&filename), ImageFormat::Png)?;
        tracing::debug!("Stored upload {} ({}x{})", filename, img.width(), img.height());
        Ok(filename)
    }

    /// Resolves a stored file name, refusing anything that could leave the directory.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let is_plain = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\'])
            && !filename.contains("..");
        if !is_plain {
            return Err(StorageError::InvalidName(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }

    pub fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        Ok(std::fs::read(self.path_for(filename)?)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgba};
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    /// Store in a fresh directory; the directory goes away with the `TempDir`.
    pub(crate) fn temp_store() -> (UploadStore, TempDir) {
        let dir = tempdir().unwrap();
        (UploadStore::new(dir.path().join("uploads")).unwrap(), dir)
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_decode_data_url() {
        let bytes = png_bytes(4, 4);
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        assert_eq!(decode_data_url(&url).unwrap(), bytes);

        assert!(matches!(
            decode_data_url("no comma here"),
            Err(StorageError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:text/plain,hello"),
            Err(StorageError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(StorageError::Base64(_))
        ));
    }

    #[test]
    fn test_save_reencodes_as_rgb_png() {
        let (store, _dir) = temp_store();
        let filename = store.save(&png_bytes(30, 20)).unwrap();

        assert!(filename.starts_with("img_") && filename.ends_with(".png"));
        let stored = image::open(store.path_for(&filename).unwrap()).unwrap();
        assert_eq!(stored.color(), image::ColorType::Rgb8);
        assert_eq!((stored.width(), stored.height()), (30, 20));
    }

    #[test]
    fn test_save_names_are_unique() {
        let (store, _dir) = temp_store();
        let bytes = png_bytes(2, 2);
        assert_ne!(store.save(&bytes).unwrap(), store.save(&bytes).unwrap());
    }

    #[test]
    fn test_save_rejects_non_images() {
        let (store, _dir) = temp_store();
        assert!(matches!(
            store.save(b"plain text"),
            Err(StorageError::Image(_))
        ));
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let (store, _dir) = temp_store();
        for name in ["../secret", "a/b.png", "..", ".hidden", "", "a\\b.png"] {
            assert!(store.path_for(name).is_err(), "accepted {:?}", name);
        }
        assert_eq!(
            store.path_for("img_1.png").unwrap(),
            store.dir().join("img_1.png")
        );
    }
}
