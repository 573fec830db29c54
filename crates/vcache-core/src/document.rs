//! Well-known documents and the tracks they are published on.
//!
//! # Key Schema
//!
//! ```text
//! {track_prefix}{document}.json     # remote object key, local copy name, snapshot key
//! ```
//!
//! The primary track has an empty prefix, the preview track uses `dev_`.
//! The same string names the object in the bucket, the file on disk and the
//! entry in the snapshot store, so tracks never collide.

use std::fmt;

/// Canonical empty-collection document published when `vehicles` goes stale.
pub const EMPTY_FEATURE_COLLECTION: &str = r#"{"type": "FeatureCollection", "features": []}"#;

/// A logical document served by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Shapes,
    Alerts,
    Vehicles,
}

impl Document {
    /// All documents, `shapes` first.
    pub const ALL: [Document; 3] = [Document::Shapes, Document::Alerts, Document::Vehicles];

    /// Documents refreshed on every polling pass. `shapes` is loaded once at bootstrap.
    pub const POLLED: [Document; 2] = [Document::Alerts, Document::Vehicles];

    /// Logical name.
    pub fn name(self) -> &'static str {
        match self {
            Document::Shapes => "shapes",
            Document::Alerts => "alerts",
            Document::Vehicles => "vehicles",
        }
    }

    /// Object key on the primary track.
    pub fn object_name(self) -> &'static str {
        match self {
            Document::Shapes => "shapes.json",
            Document::Alerts => "alerts.json",
            Document::Vehicles => "vehicles.json",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An isolated instance of the whole pipeline, distinguished by a key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    /// Production data, no prefix.
    Primary,
    /// Preview data served under `/dev`.
    Preview,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::Primary, Track::Preview];

    /// Prefix applied to remote keys, local copies and snapshot keys.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Track::Primary => "",
            Track::Preview => "dev_",
        }
    }

    /// URL path prefix the HTTP responder strips before routing.
    pub fn path_prefix(self) -> Option<&'static str> {
        match self {
            Track::Primary => None,
            Track::Preview => Some("/dev"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Track::Primary => "primary",
            Track::Preview => "preview",
        }
    }

    /// Key for `doc` on this track.
    ///
    /// Returns: `{prefix}{document}.json`
    pub fn key(self, doc: Document) -> String {
        format!("{}{}", self.key_prefix(), doc.object_name())
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
