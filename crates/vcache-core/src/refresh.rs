//! Per-track refresh loop.
//!
//! ```text
//! Bootstrapping --shapes ok--> Polling --stale passes >= threshold--> StaleFallback
//!       |                        ^                                        |
//!   shapes failed                +------------- after backoff ------------+
//!       v
//!   fatal error
//! ```
//!
//! The loop is the only writer for its track's keys in the snapshot store.
//! Fetch failures are logged and counted as "no update this pass"; they never
//! stop the loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::detector::{ChangeDetector, RefreshOutcome};
use crate::document::{Document, Track, EMPTY_FEATURE_COLLECTION};
use crate::error::CacheResult;
use crate::metrics::Metrics;
use crate::source::DocumentSource;
use crate::store::SnapshotStore;

/// Current state of a refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Bootstrapping,
    Polling,
    StaleFallback,
}

/// Timing knobs for a refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Sleep between full passes.
    pub poll_interval: Duration,
    /// Consecutive passes without any document change before `vehicles` falls back.
    pub stale_threshold: u32,
    /// Backoff per stale pass once in fallback.
    pub backoff_unit: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            stale_threshold: 60,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RefreshSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            stale_threshold: config.stale_threshold,
            ..Self::default()
        }
    }
}

/// Summary of a single polling pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub changed: Vec<Document>,
    pub failed: Vec<Document>,
    /// Staleness counter after this pass.
    pub stale_passes: u32,
    /// Extra sleep requested by the stale fallback.
    pub backoff: Option<Duration>,
}

/// Refresh loop for one track.
pub struct RefreshLoop {
    track: Track,
    source: Arc<dyn DocumentSource>,
    detector: ChangeDetector,
    store: SnapshotStore,
    metrics: Metrics,
    settings: RefreshSettings,
    state: LoopState,
    stale_passes: u32,
}

impl RefreshLoop {
    pub fn new(
        track: Track,
        source: Arc<dyn DocumentSource>,
        store: SnapshotStore,
        metrics: Metrics,
        data_dir: &Path,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            track,
            source,
            detector: ChangeDetector::new(data_dir),
            store,
            metrics,
            settings,
            state: LoopState::Bootstrapping,
            stale_passes: 0,
        }
    }

    pub fn track(&self) -> Track {
        self.track
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stale_passes(&self) -> u32 {
        self.stale_passes
    }

    /// Load `shapes` synchronously and publish it. Failure is fatal for the process.
    pub async fn bootstrap(&mut self) -> CacheResult<()> {
        let key = self.track.key(Document::Shapes);
        let content = match self.detector.materialize(self.source.as_ref(), &key).await {
            Ok(content) => content,
            Err(e) => {
                error!(track = %self.track, key = %key, error = %e, "bootstrap failed");
                return Err(e);
            }
        };

        self.publish(&key, content);
        self.metrics.record_refresh(&key);
        self.state = LoopState::Polling;
        info!(track = %self.track, "bootstrapped");
        Ok(())
    }

    /// Check every polled document once and apply the staleness policy.
    pub async fn poll_once(&mut self) -> PassReport {
        let mut report = PassReport::default();

        for doc in Document::POLLED {
            let key = self.track.key(doc);
            match self.detector.check(self.source.as_ref(), &key).await {
                RefreshOutcome::Changed(content) => {
                    self.publish(&key, content);
                    self.metrics.record_refresh(&key);
                    report.changed.push(doc);
                }
                RefreshOutcome::Unchanged => {}
                RefreshOutcome::FetchFailed(e) => {
                    warn!(track = %self.track, key = %key, error = %e, "refresh failed");
                    self.metrics.record_refresh_failure(&key);
                    report.failed.push(doc);
                }
            }
        }

        if !report.changed.is_empty() {
            self.stale_passes = 0;
        } else {
            self.stale_passes = self.stale_passes.saturating_add(1);
        }
        report.stale_passes = self.stale_passes;

        if self.stale_passes >= self.settings.stale_threshold {
            self.enter_stale_fallback();
            report.backoff = Some(self.settings.backoff_unit * self.stale_passes);
        } else {
            self.state = LoopState::Polling;
        }

        report
    }

    /// Run forever. Bootstraps first if that has not happened yet.
    pub async fn run(mut self) -> CacheResult<()> {
        if self.state == LoopState::Bootstrapping {
            self.bootstrap().await?;
        }

        loop {
            let report = self.poll_once().await;
            if !report.changed.is_empty() {
                debug!(track = %self.track, changed = ?report.changed, "pass complete");
            }
            if let Some(backoff) = report.backoff {
                tokio::time::sleep(backoff).await;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    fn enter_stale_fallback(&mut self) {
        if self.state != LoopState::StaleFallback {
            warn!(
                track = %self.track,
                stale_passes = self.stale_passes,
                "vehicles stale, publishing empty collection"
            );
        }
        let key = self.track.key(Document::Vehicles);
        self.publish(&key, Bytes::from_static(EMPTY_FEATURE_COLLECTION.as_bytes()));
        self.metrics.record_stale_fallback(self.track.label());
        self.state = LoopState::StaleFallback;
    }

    fn publish(&self, key: &str, content: Bytes) {
        debug!(track = %self.track, key, bytes = content.len(), "publish");
        self.store.publish(key, content);
    }
}
