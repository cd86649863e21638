use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::StorageClient;

/// A file part pulled out of a multipart request, not yet stored anywhere.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl UploadItem {
    pub fn is_image(&self) -> bool {
        is_image_content_type(&self.content_type)
    }
}

pub fn is_image_content_type(ct: &str) -> bool {
    ct.trim().to_ascii_lowercase().starts_with("image/")
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

fn ext_from_file_name(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    let ok = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}

fn object_key(item: &UploadItem) -> String {
    let ext = item
        .file_name
        .as_deref()
        .and_then(ext_from_file_name)
        .or_else(|| ext_from_mime(&item.content_type).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{}", Uuid::new_v4(), ext)
}

/// Persists an uploaded image and returns the key recorded on the event.
/// The content type has already been checked by event validation.
pub async fn store_image(storage: &dyn StorageClient, item: UploadItem) -> AppResult<String> {
    debug_assert!(item.is_image(), "store_image called with {}", item.content_type);

    let key = object_key(&item);
    storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))
        .map_err(AppError::WriteFailed)?;
    debug!(%key, "image stored");
    Ok(key)
}

/// Removes an image that no event points to any more. Failures are only logged.
pub async fn discard_image(storage: &dyn StorageClient, key: &str) {
    if let Err(e) = storage.delete_object(key).await {
        warn!(error = %e, %key, "failed to delete orphaned image");
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn upload(ct: &str, name: Option<&str>) -> UploadItem {
        UploadItem {
            body: Bytes::from_static(b"\x89PNG"),
            content_type: ct.to_string(),
            file_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn key_prefers_the_uploaded_file_extension() {
        let key = object_key(&upload("image/png", Some("Party Photo.JPEG")));
        assert!(key.ends_with(".jpeg"), "{key}");

        let key = object_key(&upload("image/png", Some("no-extension")));
        assert!(key.ends_with(".png"), "{key}");

        let key = object_key(&upload("image/x-unknown", None));
        assert!(key.ends_with(".bin"), "{key}");
    }

    #[test]
    fn keys_are_unique() {
        let item = upload("image/png", Some("a.png"));
        assert_ne!(object_key(&item), object_key(&item));
    }

    #[tokio::test]
    async fn store_image_puts_the_object() {
        let storage = MemoryStorage::default();
        let key = store_image(&storage, upload("image/png", Some("a.png")))
            .await
            .unwrap();
        assert!(storage.contains(&key));

        discard_image(&storage, &key).await;
        assert_eq!(storage.len(), 0);
    }
}
