//! Freshness-tracking cache for a small fixed set of remote JSON documents.
//!
//! A [`RefreshLoop`] per track polls an S3-compatible bucket, detects real
//! changes with a [`ChangeDetector`], and publishes new content into a shared
//! [`SnapshotStore`]. The HTTP [`router`] resolves request paths to snapshot
//! keys and serves the stored bytes with a SHA-256 `ETag`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vcache_core::{
//!     router, AppState, CacheConfig, Metrics, ObjectStoreSource, RefreshLoop,
//!     RefreshSettings, SnapshotStore, Track,
//! };
//!
//! # async fn example() -> vcache_core::CacheResult<()> {
//! let config = CacheConfig::from_env()?;
//! config.validate()?;
//!
//! let registry = prometheus::Registry::new();
//! let metrics = Metrics::new(&registry)?;
//! let store = SnapshotStore::new();
//! let source = Arc::new(ObjectStoreSource::from_settings(&config.remote)?);
//!
//! let mut refresh = RefreshLoop::new(
//!     Track::Primary,
//!     source,
//!     store.clone(),
//!     metrics.clone(),
//!     &config.data_dir,
//!     RefreshSettings::from_config(&config),
//! );
//! refresh.bootstrap().await?;
//! tokio::spawn(refresh.run());
//!
//! let app = router(AppState::new(store.reader(), metrics, registry));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod detector;
pub mod document;
pub mod error;
pub mod http;
pub mod metrics;
pub mod refresh;
pub mod resolver;
pub mod source;
pub mod store;

pub use config::{CacheConfig, RemoteSettings};
pub use detector::{is_changed, purge_local_copies, ChangeDetector, LocalMeta, RefreshOutcome};
pub use document::{Document, Track, EMPTY_FEATURE_COLLECTION};
pub use error::{CacheError, CacheResult};
pub use http::{content_tag, router, AppState};
pub use metrics::{encode_text, Metrics};
pub use refresh::{LoopState, PassReport, RefreshLoop, RefreshSettings};
pub use resolver::{resolve, Resolved};
pub use source::{DocumentSource, ObjectStoreSource, RemoteMeta, RemoteObject};
pub use store::{SnapshotReader, SnapshotStore};
