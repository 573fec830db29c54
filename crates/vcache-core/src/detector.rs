//! Change detection against local materialized copies.
//!
//! Each track owns one [`ChangeDetector`] and one directory of local copies:
//!
//! ```text
//! {data_dir}/shapes.json        # primary track
//! {data_dir}/dev_vehicles.json  # preview track
//! ```
//!
//! A remote object counts as unchanged when ANY of entity tag, modification
//! time or size matches the local copy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{CacheError, CacheResult};
use crate::source::{DocumentSource, RemoteMeta, RemoteObject};

/// Result of checking one document against remote storage.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Remote matches the local copy; nothing was touched.
    Unchanged,
    /// Local copy was replaced; carries the new content.
    Changed(Bytes),
    /// Fetch or local replacement failed; treated as "no update this cycle".
    FetchFailed(CacheError),
}

impl RefreshOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Size and modification time of a local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMeta {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Decide whether `remote` differs from the last materialized copy.
pub fn is_changed(
    local: Option<&LocalMeta>,
    cached_e_tag: Option<&str>,
    remote: &RemoteMeta,
) -> bool {
    let Some(local) = local else {
        return true;
    };

    let tag_matches = matches!(
        (cached_e_tag, remote.e_tag.as_deref()),
        (Some(cached), Some(current)) if cached == current
    );
    let mtime_matches = local.modified == Some(remote.last_modified);
    let size_matches = local.size == remote.size;

    !(tag_matches || mtime_matches || size_matches)
}

/// Per-track change detector owning the local copies and cached entity tags.
#[derive(Debug)]
pub struct ChangeDetector {
    dir: PathBuf,
    e_tags: HashMap<String, String>,
}

impl ChangeDetector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            e_tags: HashMap::new(),
        }
    }

    /// Path of the local copy for `key`.
    pub fn local_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Metadata of the local copy, `None` if there is none.
    pub async fn local_meta(&self, key: &str) -> CacheResult<Option<LocalMeta>> {
        let path = self.local_path(key);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(LocalMeta {
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::local_io(&path, e)),
        }
    }

    /// Stat the remote object and download it only if it changed.
    pub async fn check(&mut self, source: &dyn DocumentSource, key: &str) -> RefreshOutcome {
        match self.try_check(source, key).await {
            Ok(Some(bytes)) => RefreshOutcome::Changed(bytes),
            Ok(None) => RefreshOutcome::Unchanged,
            Err(e) => RefreshOutcome::FetchFailed(e),
        }
    }

    /// Download `key` unconditionally and replace the local copy.
    pub async fn materialize(
        &mut self,
        source: &dyn DocumentSource,
        key: &str,
    ) -> CacheResult<Bytes> {
        let object = source.fetch(key).await?;
        self.replace_local_copy(key, &object).await?;

        if let Some(tag) = &object.meta.e_tag {
            self.e_tags.insert(key.to_string(), tag.clone());
        } else {
            self.e_tags.remove(key);
        }

        info!(key, bytes = object.bytes.len(), "downloaded");
        Ok(object.bytes)
    }

    async fn try_check(
        &mut self,
        source: &dyn DocumentSource,
        key: &str,
    ) -> CacheResult<Option<Bytes>> {
        let remote = source.stat(key).await?;
        let local = self.local_meta(key).await?;
        let cached = self.e_tags.get(key).map(String::as_str);

        if !is_changed(local.as_ref(), cached, &remote) {
            debug!(key, "unchanged");
            return Ok(None);
        }

        self.materialize(source, key).await.map(Some)
    }

    /// Write to `{key}.tmp`, stamp it with the remote mtime, then rename over the copy.
    async fn replace_local_copy(&self, key: &str, object: &RemoteObject) -> CacheResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::local_io(&self.dir, e))?;

        let path = self.local_path(key);
        let temp_path = self.dir.join(format!("{}.tmp", key));

        fs::write(&temp_path, &object.bytes)
            .await
            .map_err(|e| CacheError::local_io(&temp_path, e))?;

        let file = fs::OpenOptions::new()
            .write(true)
            .open(&temp_path)
            .await
            .map_err(|e| CacheError::local_io(&temp_path, e))?;
        file.into_std()
            .await
            .set_modified(SystemTime::from(object.meta.last_modified))
            .map_err(|e| CacheError::local_io(&temp_path, e))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| CacheError::local_io(&path, e))?;

        Ok(())
    }
}

/// Remove local copies left over from a previous run.
///
/// Creates `dir` if needed and deletes every `*.json` and `*.tmp` file in it.
/// Returns the number of files removed.
pub async fn purge_local_copies(dir: &Path) -> CacheResult<usize> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| CacheError::local_io(dir, e))?;

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| CacheError::local_io(dir, e))?;

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CacheError::local_io(dir, e))?
    {
        let path = entry.path();
        let is_copy = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("json") | Some("tmp")
        );
        if is_copy && path.is_file() {
            fs::remove_file(&path)
                .await
                .map_err(|e| CacheError::local_io(&path, e))?;
            removed += 1;
        }
    }

    debug!(dir = %dir.display(), removed, "purged local copies");
    Ok(removed)
}
