//! Maps request paths to `(track, document)` pairs.
//!
//! | Path | Resolves to |
//! |------|-------------|
//! | `/`, `/vehicles` | primary vehicles |
//! | `/shapes` | primary shapes |
//! | `/alerts` | primary alerts |
//! | `/dev`, `/dev/`, `/dev/vehicles` | preview vehicles |
//! | `/dev/shapes`, `/dev/alerts` | preview shapes, alerts |
//!
//! Anything else resolves to `None`.

use crate::document::{Document, Track};

const ROUTES: [(&str, Document); 4] = [
    ("/alerts", Document::Alerts),
    ("/shapes", Document::Shapes),
    ("/", Document::Vehicles),
    ("/vehicles", Document::Vehicles),
];

/// A resolved request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub track: Track,
    pub document: Document,
}

impl Resolved {
    /// Snapshot store key for this target.
    pub fn key(&self) -> String {
        self.track.key(self.document)
    }
}

/// Resolve a request path, or `None` for unknown paths.
pub fn resolve(path: &str) -> Option<Resolved> {
    let (track, rest) = strip_track(path);
    let rest = if rest.is_empty() { "/vehicles" } else { rest };

    ROUTES
        .iter()
        .find(|(route, _)| *route == rest)
        .map(|(_, document)| Resolved {
            track,
            document: *document,
        })
}

/// Split off a track prefix. Prefixes only match on a segment boundary,
/// so `/devices` stays on the primary track.
fn strip_track(path: &str) -> (Track, &str) {
    for track in Track::ALL {
        let Some(prefix) = track.path_prefix() else {
            continue;
        };
        if let Some(rest) = path.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with('/') {
                return (track, rest);
            }
        }
    }
    (Track::Primary, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(track: Track, document: Document) -> Option<Resolved> {
        Some(Resolved { track, document })
    }

    #[test]
    fn test_primary_routes() {
        assert_eq!(resolve("/"), resolved(Track::Primary, Document::Vehicles));
        assert_eq!(resolve("/vehicles"), resolved(Track::Primary, Document::Vehicles));
        assert_eq!(resolve("/shapes"), resolved(Track::Primary, Document::Shapes));
        assert_eq!(resolve("/alerts"), resolved(Track::Primary, Document::Alerts));
    }

    #[test]
    fn test_preview_routes() {
        assert_eq!(resolve("/dev"), resolved(Track::Preview, Document::Vehicles));
        assert_eq!(resolve("/dev/"), resolved(Track::Preview, Document::Vehicles));
        assert_eq!(resolve("/dev/vehicles"), resolved(Track::Preview, Document::Vehicles));
        assert_eq!(resolve("/dev/shapes"), resolved(Track::Preview, Document::Shapes));
        assert_eq!(resolve("/dev/alerts"), resolved(Track::Preview, Document::Alerts));
    }

    #[test]
    fn test_unknown_paths_do_not_resolve() {
        assert_eq!(resolve("/unknown"), None);
        assert_eq!(resolve("/dev/unknown"), None);
        assert_eq!(resolve("/devices"), None);
        assert_eq!(resolve("/vehicles/1"), None);
        assert_eq!(resolve(""), resolved(Track::Primary, Document::Vehicles));
    }

    #[test]
    fn test_resolved_key_is_track_prefixed() {
        assert_eq!(resolve("/dev/shapes").unwrap().key(), "dev_shapes.json");
        assert_eq!(resolve("/").unwrap().key(), "vehicles.json");
    }
}
