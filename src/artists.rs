//!
//! src/artists.rs  Oct 18th, 2026
//!
//! Tracked artist list and the credit string filter
//!

use std::{collections::HashSet, fs, path::Path};

use tracing::{info, warn};

/// Lowercased, trimmed artist names. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ArtistSet {
    names: HashSet<String>,
}

impl ArtistSet {
    /// Reads one name per line. A missing or unreadable file yields an
    /// empty set and a warning; the scan still runs.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                let set = Self::parse(&text);
                info!(path = %path.display(), artists = set.len(), "artists.load");
                set
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "artists.load.failed");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let names = text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when any comma separated name in `credit` is tracked
    pub fn matches(&self, credit: &str) -> bool {
        credit.split(',')
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .any(|name| self.names.contains(&name))
    }
}

impl<S: AsRef<str>> FromIterator<S> for ArtistSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let names = iter.into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { names }
    }
}
