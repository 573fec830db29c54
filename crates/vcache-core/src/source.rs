//! Remote object source.
//!
//! The refresh loop only needs two calls from remote storage: `stat` for
//! change detection and `fetch` for content. [`ObjectStoreSource`] provides
//! them over any `object_store` backend (S3-compatible in production,
//! in-memory in tests).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::path::Path;
use object_store::{GetOptions, ObjectMeta, ObjectStore};

use crate::config::RemoteSettings;
use crate::error::{CacheError, CacheResult};

/// Metadata returned by the remote store on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMeta {
    pub e_tag: Option<String>,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl From<&ObjectMeta> for RemoteMeta {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            e_tag: meta.e_tag.clone(),
            size: meta.size as u64,
            last_modified: meta.last_modified,
        }
    }
}

/// Object content plus the metadata it was served with.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    pub bytes: Bytes,
    pub meta: RemoteMeta,
}

/// Read access to named objects in remote storage.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch metadata without the body.
    async fn stat(&self, key: &str) -> CacheResult<RemoteMeta>;

    /// Fetch the full object.
    async fn fetch(&self, key: &str) -> CacheResult<RemoteObject>;
}

/// Document source backed by `object_store`.
#[derive(Debug, Clone)]
pub struct ObjectStoreSource {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreSource {
    /// Build an S3 client from settings. Fails on unusable settings.
    pub fn from_settings(settings: &RemoteSettings) -> CacheResult<Self> {
        let store = object_store::aws::AmazonS3Builder::from_env()
            .with_endpoint(settings.endpoint_url())
            .with_access_key_id(&settings.access_key_id)
            .with_secret_access_key(&settings.secret_access_key)
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region)
            .with_allow_http(settings.allow_http())
            .build()
            .map_err(|e| CacheError::Config {
                message: format!("failed to create S3 client: {}", e),
            })?;

        Ok(Self::with_store(Arc::new(store)))
    }

    /// Wrap an existing store.
    pub fn with_store(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Create an in-memory source for testing.
    pub fn memory() -> Self {
        Self::with_store(Arc::new(object_store::memory::InMemory::new()))
    }

    /// The underlying store, used by tests to seed objects.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.inner
    }
}

#[async_trait]
impl DocumentSource for ObjectStoreSource {
    async fn stat(&self, key: &str) -> CacheResult<RemoteMeta> {
        let opts = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .inner
            .get_opts(&Path::from(key), opts)
            .await
            .map_err(|e| CacheError::from_object_store(e, key))?;
        Ok(RemoteMeta::from(&result.meta))
    }

    async fn fetch(&self, key: &str) -> CacheResult<RemoteObject> {
        let result = self
            .inner
            .get_opts(&Path::from(key), GetOptions::default())
            .await
            .map_err(|e| CacheError::from_object_store(e, key))?;

        let meta = RemoteMeta::from(&result.meta);
        let bytes = result.bytes().await.map_err(|e| CacheError::Remote {
            key: key.to_string(),
            message: format!("failed to read object bytes: {}", e),
        })?;

        Ok(RemoteObject { bytes, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::{PutOptions, PutPayload};

    async fn seed(source: &ObjectStoreSource, key: &str, body: &'static str) {
        source
            .store()
            .put_opts(
                &Path::from(key),
                PutPayload::from_static(body.as_bytes()),
                PutOptions::default(),
            )
            .await
            .expect("seed failed");
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_meta() {
        let source = ObjectStoreSource::memory();
        seed(&source, "vehicles.json", r#"{"features":[]}"#).await;

        let object = source.fetch("vehicles.json").await.unwrap();
        assert_eq!(object.bytes, Bytes::from_static(br#"{"features":[]}"#));
        assert_eq!(object.meta.size, 15);
        assert!(object.meta.e_tag.is_some());
    }

    #[tokio::test]
    async fn test_stat_matches_fetch_meta() {
        let source = ObjectStoreSource::memory();
        seed(&source, "alerts.json", "[]").await;

        let stat = source.stat("alerts.json").await.unwrap();
        let object = source.fetch("alerts.json").await.unwrap();
        assert_eq!(stat, object.meta);
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let source = ObjectStoreSource::memory();
        let err = source.fetch("shapes.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rewrite_changes_etag() {
        let source = ObjectStoreSource::memory();
        seed(&source, "vehicles.json", "{}").await;
        let first = source.stat("vehicles.json").await.unwrap();
        seed(&source, "vehicles.json", "{\"a\":1}").await;
        let second = source.stat("vehicles.json").await.unwrap();
        assert_ne!(first.e_tag, second.e_tag);
        assert_ne!(first.size, second.size);
    }
}
