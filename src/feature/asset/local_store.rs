//! Assets kept in a local directory and served statically.

use super::{
    asset_store::{AssetError, AssetRef, AssetStore, Upload},
    image_transform::ImageTransform,
};
use crate::infra::config::UploadConfig;
use bytes::Bytes;
use chrono::Utc;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Extensions accepted as-is when images are not transformed. Static serving
/// derives the content type from these, so nothing else is stored.
const RAW_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// An [`AssetStore`] writing into a directory served under a URL prefix.
#[derive(Debug)]
pub struct LocalAssetStore {
    root: PathBuf,
    public_prefix: String,
    transform: Option<ImageTransform>,
}

impl LocalAssetStore {
    /// Opens the store, creating its directory if needed.
    pub async fn open(config: &UploadConfig) -> Result<Self, AssetError> {
        tokio::fs::create_dir_all(&config.dir).await?;
        let transform = config
            .resize
            .then(|| ImageTransform::new(config.max_width, config.quality));
        tracing::info!(dir = %config.dir.display(), resize = config.resize, "Opened asset store");
        Ok(Self {
            root: config.dir.clone(),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            transform,
        })
    }

    /// Maps a reference to its file, if it names a file in this store.
    fn resolve(&self, asset: &AssetRef) -> Option<PathBuf> {
        let name = asset
            .as_str()
            .strip_prefix(&self.public_prefix)?
            .strip_prefix('/')?;
        is_asset_name(name).then(|| self.root.join(name))
    }

    async fn prepare(&self, upload: Upload) -> Result<(Bytes, String), AssetError> {
        match self.transform {
            Some(transform) => {
                let data = upload.data;
                let out = tokio::task::spawn_blocking(move || transform.apply(&data)).await??;
                Ok((Bytes::from(out), format!(".{}", ImageTransform::EXTENSION)))
            }
            None => {
                let extension = extension_of(&upload.file_name);
                if !RAW_EXTENSIONS.contains(&extension.trim_start_matches('.')) {
                    return Err(AssetError::Unsupported(upload.file_name));
                }
                Ok((upload.data, extension))
            }
        }
    }
}

#[async_trait::async_trait]
impl AssetStore for LocalAssetStore {
    #[instrument(skip_all, fields(file_name = %upload.file_name, size = upload.data.len()))]
    async fn store(&self, upload: Upload) -> Result<AssetRef, AssetError> {
        let (data, extension) = self.prepare(upload).await?;
        let name = asset_name(&extension);
        let path = self.root.join(&name);
        let partial = self.root.join(format!(".{name}.part"));

        if let Err(e) = write_then_rename(&partial, &path, &data).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %partial.display(), "Failed to remove partial asset: {}", cleanup);
                }
            }
            return Err(e.into());
        }

        let asset = AssetRef::new(format!("{}/{}", self.public_prefix, name));
        tracing::info!(%asset, bytes = data.len(), "Stored asset");
        Ok(asset)
    }

    #[instrument(skip(self))]
    async fn remove(&self, asset: &AssetRef) -> Result<(), AssetError> {
        let Some(path) = self.resolve(asset) else {
            tracing::warn!("Not an asset of this store, nothing removed");
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Removed asset");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Asset already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, asset: &AssetRef) -> bool {
        match self.resolve(asset) {
            Some(path) => tokio::fs::metadata(path)
                .await
                .is_ok_and(|meta| meta.is_file()),
            None => false,
        }
    }
}

/// Writes `data` next to its destination, then moves it into place, so a
/// half-written file is never visible under the final name.
async fn write_then_rename(partial: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(partial).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(partial, path).await
}

/// A fresh name: millisecond timestamp plus 128 random bits, so concurrent
/// uploads within the same millisecond still get distinct names.
fn asset_name(extension: &str) -> String {
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}

/// The lower-cased extension of an uploaded file name, with its dot,
/// or nothing if it is missing or suspicious.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Names this store generates: no separators, no hidden files.
fn is_asset_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::asset::image_transform::tests::png;
    use image::GenericImageView;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn config(dir: &Path, resize: bool) -> UploadConfig {
        UploadConfig {
            dir: dir.to_path_buf(),
            public_prefix: "/uploads".to_string(),
            resize,
            max_width: 300,
            quality: 60,
            max_upload_bytes: 1024 * 1024,
        }
    }

    fn upload(file_name: &str, data: Vec<u8>) -> Upload {
        Upload {
            file_name: file_name.to_string(),
            content_type: None,
            data: Bytes::from(data),
        }
    }

    fn files_in(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn stores_raw_bytes_with_the_uploaded_extension() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::open(&config(dir.path(), false)).await.unwrap();
        let data = png(20, 10);

        let asset = store
            .store(upload("Photo.PNG", data.clone()))
            .await
            .unwrap();

        assert!(asset.as_str().starts_with("/uploads/"));
        assert!(asset.as_str().ends_with(".png"));
        assert!(store.exists(&asset).await);
        let name = asset.as_str().trim_start_matches("/uploads/");
        assert_eq!(data, std::fs::read(dir.path().join(name)).unwrap());
    }

    #[tokio::test]
    async fn raw_store_only_accepts_image_extensions() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::open(&config(dir.path(), false)).await.unwrap();

        for file_name in ["page.html", "Report.PDF", "script.svg", "no-extension", ""] {
            let result = store.store(upload(file_name, b"<script></script>".to_vec())).await;
            assert!(
                matches!(result, Err(AssetError::Unsupported(_))),
                "{file_name}"
            );
        }
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn resizes_images_to_jpeg() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::open(&config(dir.path(), true)).await.unwrap();

        let asset = store.store(upload("cat.png", png(900, 300))).await.unwrap();

        assert!(asset.as_str().ends_with(".jpg"));
        let name = asset.as_str().trim_start_matches("/uploads/");
        let stored = image::open(dir.path().join(name)).unwrap();
        assert_eq!((300, 100), stored.dimensions());
    }

    #[tokio::test]
    async fn failed_transform_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::open(&config(dir.path(), true)).await.unwrap();

        let result = store.store(upload("cat.png", b"not a png".to_vec())).await;

        assert!(matches!(result, Err(AssetError::Transform(_))));
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn unwritable_store_fails_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::open(&config(&dir.path().join("gone"), false))
            .await
            .unwrap();
        std::fs::remove_dir(dir.path().join("gone")).unwrap();

        let result = store.store(upload("a.png", b"hello".to_vec())).await;

        assert!(matches!(result, Err(AssetError::Io(_))));
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::open(&config(dir.path(), false)).await.unwrap();
        let asset = store.store(upload("a.png", b"hello".to_vec())).await.unwrap();

        store.remove(&asset).await.unwrap();
        assert!(!store.exists(&asset).await);
        store.remove(&asset).await.unwrap();
    }

    #[tokio::test]
    async fn foreign_references_are_never_touched() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"keep me").unwrap();
        let store = LocalAssetStore::open(&config(&dir.path().join("uploads"), false))
            .await
            .unwrap();

        for reference in [
            "/uploads/../secret.txt",
            "/elsewhere/secret.txt",
            "/uploads/",
            "/uploads/.hidden",
            "https://example.com/uploads/a.jpg",
        ] {
            let asset = AssetRef::new(reference);
            assert!(!store.exists(&asset).await, "{reference}");
            store.remove(&asset).await.unwrap();
        }
        assert!(dir.path().join("secret.txt").exists());
    }

    #[tokio::test]
    async fn concurrent_uploads_get_distinct_names() {
        let dir = TempDir::new().unwrap();
        let store =
            std::sync::Arc::new(LocalAssetStore::open(&config(dir.path(), false)).await.unwrap());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .store(upload("same.jpg", format!("{i}").into_bytes()))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut names = HashSet::new();
        for task in tasks {
            names.insert(task.await.unwrap());
        }

        assert_eq!(32, names.len());
        assert_eq!(32, files_in(dir.path()).len());
    }

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(".jpg", extension_of("photo.JPG"));
        assert_eq!("", extension_of("no-extension"));
        assert_eq!("", extension_of("evil.p/hp"));
        assert_eq!("", extension_of("weird.j pg"));
        assert_eq!("", extension_of(""));
    }
}
